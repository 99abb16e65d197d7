//! The `.vm` text format: one command per line, `//` line comments,
//! blank lines ignored (§6).

use crate::command::{ArithmeticOp, VmCommand};
use crate::segment::Segment;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum VmParseError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: u32, command: String },
    #[error("line {line}: '{command}' expects {expected} argument(s), got {got}")]
    WrongArity {
        line: u32,
        command: String,
        expected: usize,
        got: usize,
    },
    #[error("line {line}: {source}")]
    BadSegment { line: u32, source: crate::segment::UnknownSegment },
    #[error("line {line}: invalid index '{value}'")]
    BadIndex { line: u32, value: String },
}

/// Strips a trailing `//` comment and surrounding whitespace.
fn strip_comment(raw: &str) -> &str {
    match raw.find("//") {
        Some(i) => raw[..i].trim(),
        None => raw.trim(),
    }
}

/// Parses the full text of a `.vm` file into its commands, skipping
/// blank and comment-only lines. The returned line numbers are 1-based
/// and refer to the original file, for error reporting downstream.
pub fn parse_program(text: &str) -> Result<Vec<(u32, VmCommand)>, VmParseError> {
    let mut commands = Vec::new();
    for (offset, raw) in text.lines().enumerate() {
        let line = offset as u32 + 1;
        let code = strip_comment(raw);
        if code.is_empty() {
            continue;
        }
        commands.push((line, parse_line(line, code)?));
    }
    Ok(commands)
}

fn parse_index(line: u32, value: &str) -> Result<u16, VmParseError> {
    value.parse::<u16>().map_err(|_| VmParseError::BadIndex {
        line,
        value: value.to_owned(),
    })
}

fn parse_line(line: u32, code: &str) -> Result<VmCommand, VmParseError> {
    let parts: Vec<&str> = code.split_whitespace().collect();
    let head = parts[0];

    if let Some(op) = arithmetic_op(head) {
        if parts.len() != 1 {
            return Err(VmParseError::WrongArity {
                line,
                command: head.to_owned(),
                expected: 0,
                got: parts.len() - 1,
            });
        }
        return Ok(VmCommand::Arithmetic(op));
    }

    match head {
        "push" | "pop" => {
            if parts.len() != 3 {
                return Err(VmParseError::WrongArity {
                    line,
                    command: head.to_owned(),
                    expected: 2,
                    got: parts.len() - 1,
                });
            }
            let segment: Segment = parts[1]
                .parse()
                .map_err(|source| VmParseError::BadSegment { line, source })?;
            let index = parse_index(line, parts[2])?;
            Ok(if head == "push" {
                VmCommand::Push { segment, index }
            } else {
                VmCommand::Pop { segment, index }
            })
        }
        "label" | "goto" | "if-goto" => {
            if parts.len() != 2 {
                return Err(VmParseError::WrongArity {
                    line,
                    command: head.to_owned(),
                    expected: 1,
                    got: parts.len() - 1,
                });
            }
            let name = parts[1].to_owned();
            Ok(match head {
                "label" => VmCommand::Label(name),
                "goto" => VmCommand::Goto(name),
                _ => VmCommand::IfGoto(name),
            })
        }
        "function" | "call" => {
            if parts.len() != 3 {
                return Err(VmParseError::WrongArity {
                    line,
                    command: head.to_owned(),
                    expected: 2,
                    got: parts.len() - 1,
                });
            }
            let name = parts[1].to_owned();
            let n = parse_index(line, parts[2])?;
            Ok(if head == "function" {
                VmCommand::Function { name, n_locals: n }
            } else {
                VmCommand::Call { name, n_args: n }
            })
        }
        "return" => {
            if parts.len() != 1 {
                return Err(VmParseError::WrongArity {
                    line,
                    command: head.to_owned(),
                    expected: 0,
                    got: parts.len() - 1,
                });
            }
            Ok(VmCommand::Return)
        }
        other => Err(VmParseError::UnknownCommand {
            line,
            command: other.to_owned(),
        }),
    }
}

fn arithmetic_op(word: &str) -> Option<ArithmeticOp> {
    Some(match word {
        "add" => ArithmeticOp::Add,
        "sub" => ArithmeticOp::Sub,
        "neg" => ArithmeticOp::Neg,
        "eq" => ArithmeticOp::Eq,
        "gt" => ArithmeticOp::Gt,
        "lt" => ArithmeticOp::Lt,
        "and" => ArithmeticOp::And,
        "or" => ArithmeticOp::Or,
        "not" => ArithmeticOp::Not,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_and_arithmetic() {
        let program = "push constant 7\npush constant 8\nadd\n";
        let commands = parse_program(program).unwrap();
        assert_eq!(
            commands,
            vec![
                (1, VmCommand::Push { segment: Segment::Constant, index: 7 }),
                (2, VmCommand::Push { segment: Segment::Constant, index: 8 }),
                (3, VmCommand::Arithmetic(ArithmeticOp::Add)),
            ]
        );
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let program = "// header comment\n\npush constant 1 // trailing\n";
        let commands = parse_program(program).unwrap();
        assert_eq!(commands, vec![(3, VmCommand::Push { segment: Segment::Constant, index: 1 })]);
    }

    #[test]
    fn rejects_unknown_command() {
        let err = parse_program("frobnicate").unwrap_err();
        assert_eq!(
            err,
            VmParseError::UnknownCommand { line: 1, command: "frobnicate".to_owned() }
        );
    }

    #[test]
    fn rejects_bad_segment() {
        let err = parse_program("push nowhere 0").unwrap_err();
        assert!(matches!(err, VmParseError::BadSegment { line: 1, .. }));
    }
}
