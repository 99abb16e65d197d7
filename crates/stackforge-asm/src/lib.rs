//! Two-pass assembler: symbolic target assembly → 16-bit binary machine
//! words (§4.6).

mod encode;
mod symtab;

use stackforge_core::{AsmLine, AsmParseError};
use symtab::SymbolTable;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("line {line}: {source}")]
    Malformed { line: u32, source: AsmParseError },
    #[error("line {line}: label '{name}' is already defined")]
    DuplicateLabel { line: u32, name: String },
    #[error("unknown comp mnemonic '{0}'")]
    UnknownComp(String),
    #[error("unknown dest mnemonic '{0}'")]
    UnknownDest(String),
    #[error("unknown jump mnemonic '{0}'")]
    UnknownJump(String),
}

/// Strips a trailing `//` comment and surrounding whitespace, the same
/// convention the VM text format and the translator's emitted `.asm`
/// comments both use.
fn strip_comment(raw: &str) -> &str {
    match raw.find("//") {
        Some(i) => raw[..i].trim(),
        None => raw.trim(),
    }
}

/// Assembles `.asm` source text into one 16-character binary string per
/// target instruction, in program order.
pub fn assemble(source: &str) -> Result<Vec<String>, AssembleError> {
    let mut lines = Vec::new();
    for (offset, raw) in source.lines().enumerate() {
        let line = offset as u32 + 1;
        let code = strip_comment(raw);
        if code.is_empty() {
            continue;
        }
        let parsed: AsmLine = code
            .parse()
            .map_err(|source| AssembleError::Malformed { line, source })?;
        lines.push((line, parsed));
    }

    // Pass 1: bind labels to the address of the next instruction, without
    // occupying an address themselves.
    let mut table = SymbolTable::new();
    let mut instructions = Vec::new();
    let mut address: u16 = 0;
    for (line, parsed) in &lines {
        match parsed {
            AsmLine::Label(name) => {
                table
                    .bind_label(name, address)
                    .map_err(|()| AssembleError::DuplicateLabel { line: *line, name: name.clone() })?;
            }
            _ => {
                instructions.push(parsed.clone());
                address += 1;
            }
        }
    }

    // Pass 2: resolve every `@symbol` and encode.
    let mut words = Vec::with_capacity(instructions.len());
    for instruction in &instructions {
        let word = match instruction {
            AsmLine::AInstruction(value) => {
                let address = match value {
                    stackforge_core::AValue::Number(n) => *n,
                    stackforge_core::AValue::Symbol(name) => table.resolve(name),
                };
                encode::a_instruction(address)
            }
            AsmLine::CInstruction { dest, comp, jump } => {
                let dest = dest.as_deref().unwrap_or("");
                let jump = jump.as_deref().unwrap_or("");
                format!("111{}", encode::c_instruction(dest, comp, jump)?)
            }
            AsmLine::Label(_) => unreachable!("labels were filtered out of `instructions` above"),
        };
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn assembles_a_loop_with_a_label_and_a_variable() {
        let source = indoc! {"
            @5
            D=A
            @R3
            M=D
            (LOOP)
            @LOOP
            0;JMP
        "};
        let words = assemble(source).unwrap();
        assert_eq!(
            words,
            vec![
                "0000000000000101",
                "1110110000010000",
                "0000000000000011",
                "1110001100001000",
                "0000000000000100",
                "1110101010000111",
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let source = "// header\n\n@16384\nD=M // trailing\n";
        let words = assemble(source).unwrap();
        assert_eq!(words, vec!["0100000000000000", "1111110000010000"]);
    }

    #[test]
    fn duplicate_label_definitions_are_fatal() {
        let source = "(LOOP)\n@0\n(LOOP)\n@0\n";
        let err = assemble(source).unwrap_err();
        assert!(matches!(err, AssembleError::DuplicateLabel { name, .. } if name == "LOOP"));
    }

    #[test]
    fn unknown_comp_mnemonic_is_fatal() {
        let err = assemble("D=Q\n").unwrap_err();
        assert!(matches!(err, AssembleError::UnknownComp(_)));
    }

    #[test]
    fn variables_are_allocated_starting_at_sixteen() {
        let words = assemble("@foo\n@bar\n@foo\n").unwrap();
        assert_eq!(words[0], "0000000000010000");
        assert_eq!(words[1], "0000000000010001");
        assert_eq!(words[2], "0000000000010000");
    }
}
