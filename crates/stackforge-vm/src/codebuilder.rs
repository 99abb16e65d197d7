//! Low-level assembly-line helpers mirroring the target ISA's addressing
//! idioms (§4.5, §9). Private to this crate: the translator is the only
//! caller, and nothing outside needs to know how a `push local 3` gets
//! its address arithmetic done.

use stackforge_core::{AValue, AsmLine};

pub(crate) fn sym(s: impl Into<String>) -> AValue {
    AValue::Symbol(s.into())
}

pub(crate) fn num(n: u16) -> AValue {
    AValue::Number(n)
}

pub(crate) struct Builder {
    lines: Vec<AsmLine>,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub(crate) fn into_lines(self) -> Vec<AsmLine> {
        self.lines
    }

    fn a(&mut self, value: AValue) {
        self.lines.push(AsmLine::AInstruction(value));
    }

    fn c(&mut self, dest: &str, comp: &str) {
        self.lines.push(AsmLine::c(Some(dest), comp, None));
    }

    pub(crate) fn label(&mut self, name: impl Into<String>) {
        self.lines.push(AsmLine::label(name));
    }

    /// MEM[a]++
    pub(crate) fn inc(&mut self, a: AValue) {
        self.a(a);
        self.c("M", "M+1");
    }

    /// MEM[a]--
    pub(crate) fn dec(&mut self, a: AValue) {
        self.a(a);
        self.c("M", "M-1");
    }

    /// MEM[a] += i, in place (used to turn a segment pointer into the
    /// effective address `segment + index` without a spare register).
    pub(crate) fn add_mi(&mut self, a: AValue, i: u16) {
        self.a(a.clone());
        self.c("D", "M");
        self.a(num(i));
        self.c("D", "D+A");
        self.a(a);
        self.c("M", "D");
    }

    /// MEM[a] -= i (undoes [`Self::add_mi`]).
    pub(crate) fn sub_mi(&mut self, a: AValue, i: u16) {
        self.a(a.clone());
        self.c("D", "M");
        self.a(num(i));
        self.c("D", "D-A");
        self.a(a);
        self.c("M", "D");
    }

    /// *MEM[l] = *MEM[r]
    pub(crate) fn mov_pp(&mut self, l: AValue, r: AValue) {
        self.a(r);
        self.c("A", "M");
        self.c("D", "M");
        self.a(l);
        self.c("A", "M");
        self.c("M", "D");
    }

    /// *MEM[l] = MEM[r]
    pub(crate) fn mov_pm(&mut self, l: AValue, r: AValue) {
        self.mov_rm("D", r);
        self.a(l);
        self.c("A", "M");
        self.c("M", "D");
    }

    /// MEM[l] = *MEM[r]
    pub(crate) fn mov_mp(&mut self, l: AValue, r: AValue) {
        self.mov_rp("D", r);
        self.a(l);
        self.c("M", "D");
    }

    /// MEM[l] = i
    pub(crate) fn mov_mi(&mut self, l: AValue, i: u16) {
        self.a(num(i));
        self.c("D", "A");
        self.a(l);
        self.c("M", "D");
    }

    /// *MEM[l] = i
    pub(crate) fn mov_pi(&mut self, l: AValue, i: u16) {
        self.a(num(i));
        self.c("D", "A");
        self.a(l);
        self.c("A", "M");
        self.c("M", "D");
    }

    /// *MEM[l] = &sym (the address a symbol resolves to, not its value —
    /// used to push a freshly generated return-address label).
    pub(crate) fn mov_pi_addr_of(&mut self, l: AValue, target: AValue) {
        self.a(target);
        self.c("D", "A");
        self.a(l);
        self.c("A", "M");
        self.c("M", "D");
    }

    /// reg (D or A) = *MEM[r]
    pub(crate) fn mov_rp(&mut self, reg: &str, r: AValue) {
        self.a(r);
        self.c("A", "M");
        self.c(reg, "M");
    }

    /// reg = MEM[r]
    pub(crate) fn mov_rm(&mut self, reg: &str, r: AValue) {
        self.a(r);
        self.c(reg, "M");
    }

    /// MEM[l] = MEM[r]
    pub(crate) fn mov_mm(&mut self, l: AValue, r: AValue) {
        self.a(r);
        self.c("D", "M");
        self.a(l);
        self.c("M", "D");
    }

    pub(crate) fn goto(&mut self, label: AValue) {
        self.a(label);
        self.lines.push(AsmLine::c(None, "0", Some("JMP")));
    }

    /// unconditional jump to the address held *in* `addr` (used to
    /// return via a dynamically computed address).
    pub(crate) fn goto_indirect(&mut self, addr: AValue) {
        self.a(addr);
        self.c("A", "M");
        self.lines.push(AsmLine::c(None, "0", Some("JMP")));
    }

    pub(crate) fn goto_if(&mut self, reg: &str, jump: &str, label: AValue) {
        self.a(label);
        self.lines.push(AsmLine::c(None, reg, Some(jump)));
    }

    /// `dest=comp`, for compositions this module doesn't already name
    /// (arithmetic results, comparison sentinels).
    pub(crate) fn compute(&mut self, dest: &str, comp: &str) {
        self.c(dest, comp);
    }

    /// *MEM[l] = D
    pub(crate) fn store_d_at(&mut self, l: AValue) {
        self.a(l);
        self.c("A", "M");
        self.c("M", "D");
    }
}
