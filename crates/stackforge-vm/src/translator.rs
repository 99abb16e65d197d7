//! The VM translator (§4.5): one VM file's commands → target assembly.

use std::io;

use stackforge_bytecode::{ArithmeticOp, Segment, VmCommand};
use stackforge_core::{AsmLine, LineSink};

use crate::codebuilder::{num, sym, Builder};

#[derive(Debug, thiserror::Error)]
pub enum VmTranslateError {
    #[error("cannot pop into the constant segment")]
    PopToConstant,
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

/// Per-file translation state: the file's namespace (used for static
/// variables and to make generated labels globally unique) and a
/// monotonic command counter.
pub struct Translator {
    namespace: String,
    count: u32,
}

impl Translator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), count: 0 }
    }

    /// Lowers one VM command to its target assembly lines.
    pub fn translate_command(&mut self, cmd: &VmCommand) -> Result<Vec<AsmLine>, VmTranslateError> {
        let lines = match cmd {
            VmCommand::Push { segment, index } => self.push(*segment, *index)?,
            VmCommand::Pop { segment, index } => self.pop(*segment, *index)?,
            VmCommand::Arithmetic(op) => self.arithmetic(*op),
            VmCommand::Label(name) => vec![AsmLine::label(self.prefixed(name))],
            VmCommand::Goto(name) => self.goto(name),
            VmCommand::IfGoto(name) => self.if_goto(name),
            VmCommand::Function { name, n_locals } => self.function(name, *n_locals),
            VmCommand::Call { name, n_args } => self.call(name, *n_args),
            VmCommand::Return => self.ret(),
        };
        self.count += 1;
        Ok(lines)
    }

    fn prefixed(&self, label: &str) -> String {
        format!("{}.{label}", self.namespace)
    }

    fn push(&mut self, segment: Segment, index: u16) -> Result<Vec<AsmLine>, VmTranslateError> {
        let mut b = Builder::new();
        match segment {
            Segment::Constant => {
                b.mov_pi(sym("SP"), index);
                b.inc(sym("SP"));
            }
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let ptr = segment.base_symbol().unwrap();
                b.add_mi(sym(ptr), index);
                b.mov_pp(sym("SP"), sym(ptr));
                b.inc(sym("SP"));
                b.sub_mi(sym(ptr), index);
            }
            Segment::Temp => {
                b.mov_pm(sym("SP"), num(5 + index));
                b.inc(sym("SP"));
            }
            Segment::Pointer => {
                let ptr = if index == 0 { "THIS" } else { "THAT" };
                b.mov_pm(sym("SP"), sym(ptr));
                b.inc(sym("SP"));
            }
            Segment::Static => {
                b.mov_pm(sym("SP"), sym(format!("{}.{index}", self.namespace)));
                b.inc(sym("SP"));
            }
        }
        Ok(b.into_lines())
    }

    fn pop(&mut self, segment: Segment, index: u16) -> Result<Vec<AsmLine>, VmTranslateError> {
        if segment == Segment::Constant {
            return Err(VmTranslateError::PopToConstant);
        }
        let mut b = Builder::new();
        match segment {
            Segment::Local | Segment::Argument | Segment::This | Segment::That => {
                let ptr = segment.base_symbol().unwrap();
                b.add_mi(sym(ptr), index);
                b.dec(sym("SP"));
                b.mov_pp(sym(ptr), sym("SP"));
                b.sub_mi(sym(ptr), index);
            }
            Segment::Temp => {
                b.dec(sym("SP"));
                b.mov_mp(num(5 + index), sym("SP"));
            }
            Segment::Pointer => {
                let ptr = if index == 0 { "THIS" } else { "THAT" };
                b.dec(sym("SP"));
                b.mov_mp(sym(ptr), sym("SP"));
            }
            Segment::Static => {
                b.dec(sym("SP"));
                b.mov_mp(sym(format!("{}.{index}", self.namespace)), sym("SP"));
            }
            Segment::Constant => unreachable!("checked above"),
        }
        Ok(b.into_lines())
    }

    fn arithmetic(&mut self, op: ArithmeticOp) -> Vec<AsmLine> {
        match op {
            ArithmeticOp::Neg => self.simple_unary("-D"),
            ArithmeticOp::Not => self.simple_unary("!D"),
            ArithmeticOp::Add => self.simple_binary("A+D"),
            ArithmeticOp::Sub => self.simple_binary("A-D"),
            ArithmeticOp::And => self.simple_binary("A&D"),
            ArithmeticOp::Or => self.simple_binary("A|D"),
            ArithmeticOp::Eq | ArithmeticOp::Gt | ArithmeticOp::Lt => self.comparison(op),
        }
    }

    fn simple_binary(&mut self, comp: &str) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.dec(sym("SP"));
        b.mov_rp("D", sym("SP"));
        b.dec(sym("SP"));
        b.mov_rp("A", sym("SP"));
        b.compute("D", comp);
        b.store_d_at(sym("SP"));
        b.inc(sym("SP"));
        b.into_lines()
    }

    fn simple_unary(&mut self, comp: &str) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.dec(sym("SP"));
        b.mov_rp("D", sym("SP"));
        b.compute("D", comp);
        b.store_d_at(sym("SP"));
        b.inc(sym("SP"));
        b.into_lines()
    }

    /// Pops `x` then `y` (`y` was pushed last), computes `x - y`, and
    /// pushes `-1`/`0` depending on whether the comparison holds.
    /// Labels are namespaced and counted to stay unique VM-file-wide.
    fn comparison(&mut self, op: ArithmeticOp) -> Vec<AsmLine> {
        let (tag, not_jump) = match op {
            ArithmeticOp::Eq => ("EQ", "JNE"),
            ArithmeticOp::Gt => ("GT", "JLE"),
            ArithmeticOp::Lt => ("LT", "JGE"),
            _ => unreachable!("only comparison ops reach here"),
        };
        let prefix = format!("{}.{}.{tag}", self.namespace, self.count);
        let else_label = format!("{prefix}.ELSE");
        let end_label = format!("{prefix}.END");

        let mut b = Builder::new();
        b.dec(sym("SP"));
        b.mov_rp("D", sym("SP"));
        b.dec(sym("SP"));
        b.mov_rp("A", sym("SP"));
        b.compute("D", "A-D");
        b.goto_if("D", not_jump, sym(else_label.clone()));
        b.compute("D", "-1");
        b.goto(sym(end_label.clone()));
        b.label(else_label);
        b.compute("D", "0");
        b.label(end_label);
        b.store_d_at(sym("SP"));
        b.inc(sym("SP"));
        b.into_lines()
    }

    fn goto(&mut self, label: &str) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.goto(sym(self.prefixed(label)));
        b.into_lines()
    }

    fn if_goto(&mut self, label: &str) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.dec(sym("SP"));
        b.mov_rp("D", sym("SP"));
        b.goto_if("D", "JNE", sym(self.prefixed(label)));
        b.into_lines()
    }

    fn function(&mut self, name: &str, n_locals: u16) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.label(name.to_owned());
        for _ in 0..n_locals {
            b.mov_pi(sym("SP"), 0);
            b.inc(sym("SP"));
        }
        b.into_lines()
    }

    fn call(&mut self, name: &str, n_args: u16) -> Vec<AsmLine> {
        let return_label = format!("{}.{name}.{}", self.namespace, self.count);

        let mut b = Builder::new();
        b.mov_pi_addr_of(sym("SP"), sym(return_label.clone()));
        b.inc(sym("SP"));
        for saved in ["LCL", "ARG", "THIS", "THAT"] {
            b.mov_pm(sym("SP"), sym(saved));
            b.inc(sym("SP"));
        }
        b.mov_mm(sym("ARG"), sym("SP"));
        b.sub_mi(sym("ARG"), 5 + n_args);
        b.mov_mm(sym("LCL"), sym("SP"));
        b.goto(sym(name.to_owned()));
        b.label(return_label);
        b.into_lines()
    }

    /// `FRAME` lives in `R13`, the saved return address in `R14` —
    /// `R13`..`R15` are the scratch registers the temp segment doesn't
    /// use. The return address is read out of the frame before the
    /// frame's own memory is overwritten by the restore, so a 0-arg call
    /// (where `ARG` can alias the frame) still returns correctly.
    fn ret(&mut self) -> Vec<AsmLine> {
        let mut b = Builder::new();
        b.mov_mm(sym("R13"), sym("LCL"));
        b.sub_mi(sym("R13"), 5);
        b.mov_mp(sym("R14"), sym("R13"));
        b.add_mi(sym("R13"), 5);

        b.dec(sym("SP"));
        b.mov_pp(sym("ARG"), sym("SP"));
        b.mov_mm(sym("SP"), sym("ARG"));
        b.add_mi(sym("SP"), 1);

        for restored in ["THAT", "THIS", "ARG", "LCL"] {
            b.sub_mi(sym("R13"), 1);
            b.mov_mp(sym(restored), sym("R13"));
        }
        b.goto_indirect(sym("R14"));
        b.into_lines()
    }
}

/// Writes the `SP = 256; call Sys.init 0` prologue prepended once per
/// directory-scope translation (§4.5).
pub fn write_bootstrap(sink: &mut impl LineSink) -> Result<(), VmTranslateError> {
    let mut b = Builder::new();
    b.mov_mi(sym("SP"), 256);

    let mut translator = Translator::new("Bootstrap");
    let mut lines = b.into_lines();
    lines.extend(translator.call("Sys.init", 0));

    for line in lines {
        sink.write_line(&line.to_string())?;
    }
    Ok(())
}

/// Translates one VM file's commands into assembly text, writing a
/// `// <command>` header before each command's emitted lines.
pub fn translate_file(
    commands: &[(u32, VmCommand)],
    namespace: &str,
    sink: &mut impl LineSink,
) -> Result<(), VmTranslateError> {
    let mut translator = Translator::new(namespace);
    for (_, cmd) in commands {
        sink.write_line(&format!("// {cmd}"))?;
        for line in translator.translate_command(cmd)? {
            sink.write_line(&line.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackforge_bytecode::parse_program;

    fn lines_for(source: &str, namespace: &str) -> Vec<String> {
        let commands = parse_program(source).unwrap();
        let mut sink = Vec::new();
        translate_file(&commands, namespace, &mut sink).unwrap();
        sink
    }

    #[test]
    fn push_constant_then_add_touches_stack_pointer_twice() {
        let lines = lines_for("push constant 7\npush constant 8\nadd\n", "Main");
        let at_lines: Vec<&String> = lines.iter().filter(|l| l.starts_with('@')).collect();
        assert!(at_lines.iter().any(|l| l.as_str() == "@SP"));
        assert!(lines.iter().any(|l| l == "D=A+D"));
    }

    #[test]
    fn goto_and_label_are_namespaced() {
        let lines = lines_for("label LOOP\ngoto LOOP\n", "Main");
        assert!(lines.contains(&"(Main.LOOP)".to_string()));
        assert!(lines.contains(&"@Main.LOOP".to_string()));
    }

    #[test]
    fn function_emits_bare_label_and_zeroed_locals() {
        let lines = lines_for("function Foo.bar 2\n", "Foo");
        assert!(lines.contains(&"(Foo.bar)".to_string()));
        let zero_pushes = lines.iter().filter(|l| l.as_str() == "@0").count();
        assert_eq!(zero_pushes, 2);
    }

    #[test]
    fn bootstrap_sets_sp_then_calls_sys_init() {
        let mut sink = Vec::new();
        write_bootstrap(&mut sink).unwrap();
        assert_eq!(sink[0], "@256");
        assert_eq!(sink[1], "D=A");
        assert!(sink.iter().any(|l| l == "@SP"));
        assert!(sink.iter().any(|l| l.contains("Bootstrap.Sys.init")));
    }

    #[test]
    fn pop_to_constant_is_rejected() {
        use stackforge_bytecode::Segment;
        let mut t = Translator::new("Main");
        let err = t.translate_command(&VmCommand::Pop { segment: Segment::Constant, index: 0 });
        assert!(matches!(err, Err(VmTranslateError::PopToConstant)));
    }
}
