//! TAC instruction model.
//!
//! An [`Instr`] has an opcode, an optional destination, and up to two
//! sources. Operand conventions per opcode:
//!
//! | opcode | dst | src1 | src2 |
//! |---|---|---|---|
//! | `MOV` | target | value | |
//! | arithmetic / relational / logical | target | left | right |
//! | `NOT` | target | operand | |
//! | `LABEL` | | label | |
//! | `JMP` | | label | |
//! | `JMP_IF_FALSE` | | condition | label |
//! | `PARAM` | | value | |
//! | `CALL` | result | callee | arity |
//! | `RETURN` | | value? | |
//! | `PRINT` | | value | |
//! | `READ_INT` | target | | |
//! | `ALLOCA` | array | element count | |
//! | `ALOAD` | target | array | index |
//! | `ASTORE` | array | index | value |
//!
//! The constructors below are the only way the rest of the crate builds
//! instructions, which keeps these conventions in one place.

use nanoc_par::ast::Type;
use nanoc_util::Symbol;

/// TAC opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Neq,
    And,
    Or,
    Not,
    Lshift,
    Rshift,
    Label,
    Jmp,
    JmpIfFalse,
    Param,
    Call,
    Return,
    Print,
    ReadInt,
    Alloca,
    Aload,
    Astore,
}

impl Opcode {
    /// Pure value computations: foldable and removable when dead.
    pub fn is_pure(self) -> bool {
        matches!(
            self,
            Opcode::Mov
                | Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Lt
                | Opcode::Gt
                | Opcode::Le
                | Opcode::Ge
                | Opcode::Eq
                | Opcode::Neq
                | Opcode::And
                | Opcode::Or
                | Opcode::Not
                | Opcode::Lshift
                | Opcode::Rshift
                | Opcode::Aload
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Le => "LE",
            Opcode::Ge => "GE",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Lshift => "LSHIFT",
            Opcode::Rshift => "RSHIFT",
            Opcode::Label => "LABEL",
            Opcode::Jmp => "JMP",
            Opcode::JmpIfFalse => "JMP_IF_FALSE",
            Opcode::Param => "PARAM",
            Opcode::Call => "CALL",
            Opcode::Return => "RETURN",
            Opcode::Print => "PRINT",
            Opcode::ReadInt => "READ_INT",
            Opcode::Alloca => "ALLOCA",
            Opcode::Aload => "ALOAD",
            Opcode::Astore => "ASTORE",
        };
        f.write_str(text)
    }
}

/// An instruction operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Compiler temporary `tN`. Assigned exactly once by the generator.
    Temp(u32),
    /// Named local (versioned on shadowing, e.g. `x_2`).
    Var(Symbol),
    /// Module-level variable, stored outside any frame.
    Global(Symbol),
    /// Integer literal.
    Const(i64),
    /// Jump target `LK`.
    Label(u32),
    /// Call target.
    Func(Symbol),
}

impl Operand {
    pub fn is_temp(self) -> bool {
        matches!(self, Operand::Temp(_))
    }

    /// Named storage: a local or a global.
    pub fn is_named(self) -> bool {
        matches!(self, Operand::Var(_) | Operand::Global(_))
    }

    pub fn as_const(self) -> Option<i64> {
        match self {
            Operand::Const(value) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Temp(n) => write!(f, "t{n}"),
            Operand::Var(name) | Operand::Global(name) | Operand::Func(name) => {
                f.write_str(name.as_str())
            }
            Operand::Const(value) => write!(f, "{value}"),
            Operand::Label(n) => write!(f, "L{n}"),
        }
    }
}

/// A three-address instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instr {
    pub op: Opcode,
    pub dst: Option<Operand>,
    pub src1: Option<Operand>,
    pub src2: Option<Operand>,
}

impl Instr {
    fn new(op: Opcode, dst: Option<Operand>, src1: Option<Operand>, src2: Option<Operand>) -> Self {
        Self {
            op,
            dst,
            src1,
            src2,
        }
    }

    pub fn mov(dst: Operand, src: Operand) -> Self {
        Self::new(Opcode::Mov, Some(dst), Some(src), None)
    }

    pub fn binary(op: Opcode, dst: Operand, left: Operand, right: Operand) -> Self {
        Self::new(op, Some(dst), Some(left), Some(right))
    }

    pub fn not(dst: Operand, src: Operand) -> Self {
        Self::new(Opcode::Not, Some(dst), Some(src), None)
    }

    pub fn label(label: u32) -> Self {
        Self::new(Opcode::Label, None, Some(Operand::Label(label)), None)
    }

    pub fn jmp(label: u32) -> Self {
        Self::new(Opcode::Jmp, None, Some(Operand::Label(label)), None)
    }

    pub fn jmp_if_false(cond: Operand, label: u32) -> Self {
        Self::new(
            Opcode::JmpIfFalse,
            None,
            Some(cond),
            Some(Operand::Label(label)),
        )
    }

    pub fn param(value: Operand) -> Self {
        Self::new(Opcode::Param, None, Some(value), None)
    }

    pub fn call(dst: Operand, callee: Symbol, arity: usize) -> Self {
        Self::new(
            Opcode::Call,
            Some(dst),
            Some(Operand::Func(callee)),
            Some(Operand::Const(arity as i64)),
        )
    }

    pub fn ret(value: Option<Operand>) -> Self {
        Self::new(Opcode::Return, None, value, None)
    }

    pub fn print(value: Operand) -> Self {
        Self::new(Opcode::Print, None, Some(value), None)
    }

    pub fn read_int(dst: Operand) -> Self {
        Self::new(Opcode::ReadInt, Some(dst), None, None)
    }

    pub fn alloca(array: Operand, size: usize) -> Self {
        Self::new(
            Opcode::Alloca,
            Some(array),
            Some(Operand::Const(size as i64)),
            None,
        )
    }

    pub fn aload(dst: Operand, array: Operand, index: Operand) -> Self {
        Self::new(Opcode::Aload, Some(dst), Some(array), Some(index))
    }

    pub fn astore(array: Operand, index: Operand, value: Operand) -> Self {
        Self::new(Opcode::Astore, Some(array), Some(index), Some(value))
    }

    /// Block boundary: starts or ends a basic block and is immutable to the
    /// optimizer.
    pub fn is_boundary(&self) -> bool {
        matches!(self.op, Opcode::Label | Opcode::Jmp | Opcode::JmpIfFalse)
    }

    /// Observable effect beyond writing `dst`; never removed.
    pub fn is_side_effecting(&self) -> bool {
        matches!(
            self.op,
            Opcode::Param
                | Opcode::Call
                | Opcode::Return
                | Opcode::Print
                | Opcode::ReadInt
                | Opcode::Alloca
                | Opcode::Astore
        )
    }

    /// The operand this instruction writes, if any.
    ///
    /// `ASTORE` writes through the array, not to an operand slot, and
    /// `ALLOCA` only reserves storage; neither defines a value.
    pub fn def(&self) -> Option<Operand> {
        match self.op {
            Opcode::Astore | Opcode::Alloca => None,
            _ => self.dst,
        }
    }

    /// Every operand this instruction reads as a value.
    pub fn sources(&self) -> impl Iterator<Item = Operand> {
        let (a, b) = match self.op {
            // Labels are not values.
            Opcode::Label | Opcode::Jmp => (None, None),
            Opcode::JmpIfFalse => (self.src1, None),
            // The callee and arity are not data operands.
            Opcode::Call => (None, None),
            // ASTORE reads its index and value, and addresses dst.
            Opcode::Astore => (self.src1, self.src2),
            // ALLOCA's size is a shape, not a value read.
            Opcode::Alloca => (None, None),
            _ => (self.src1, self.src2),
        };
        // ALOAD addresses the array through src1; ASTORE through dst. Both
        // count as reads of the array operand so liveness sees them.
        let addr = match self.op {
            Opcode::Aload => self.src1,
            Opcode::Astore => self.dst,
            _ => None,
        };
        let value_a = if self.op == Opcode::Aload { None } else { a };
        [value_a, b, addr].into_iter().flatten()
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.op {
            Opcode::Label | Opcode::Jmp | Opcode::Param | Opcode::Print => {
                write!(f, "{} {}", self.op, self.src1.expect("operand"))
            }
            Opcode::JmpIfFalse => write!(
                f,
                "{} {}, {}",
                self.op,
                self.src1.expect("condition"),
                self.src2.expect("target")
            ),
            Opcode::Return => match self.src1 {
                Some(value) => write!(f, "{} {}", self.op, value),
                None => write!(f, "{}", self.op),
            },
            Opcode::ReadInt => write!(f, "{} {}", self.op, self.dst.expect("target")),
            Opcode::Mov | Opcode::Not | Opcode::Alloca => write!(
                f,
                "{} {}, {}",
                self.op,
                self.dst.expect("target"),
                self.src1.expect("operand")
            ),
            Opcode::Astore => write!(
                f,
                "{} {}, {}, {}",
                self.op,
                self.src2.expect("value"),
                self.dst.expect("array"),
                self.src1.expect("index")
            ),
            _ => write!(
                f,
                "{} {}, {}, {}",
                self.op,
                self.dst.expect("target"),
                self.src1.expect("left"),
                self.src2.expect("right")
            ),
        }
    }
}

/// One lowered function.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: Symbol,
    /// Parameter slot names, leftmost first.
    pub params: Vec<Symbol>,
    pub ret_ty: Type,
    pub body: Vec<Instr>,
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "func {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        writeln!(f, "):")?;
        for instr in &self.body {
            writeln!(f, "  {instr}")?;
        }
        Ok(())
    }
}

/// A module-level storage slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalDef {
    pub name: Symbol,
    /// Element count; 1 for scalars.
    pub size: usize,
    pub is_array: bool,
}

/// A whole lowered program.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub globals: Vec<GlobalDef>,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name.as_str() == name)
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for global in &self.globals {
            if global.is_array {
                writeln!(f, "global {}[{}]", global.name, global.size)?;
            } else {
                writeln!(f, "global {}", global.name)?;
            }
        }
        for func in &self.functions {
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        Symbol::intern(name)
    }

    #[test]
    fn display_matches_textual_ir() {
        assert_eq!(
            Instr::mov(Operand::Var(sym("x")), Operand::Const(12)).to_string(),
            "MOV x, 12"
        );
        assert_eq!(
            Instr::binary(
                Opcode::Lshift,
                Operand::Temp(3),
                Operand::Var(sym("i")),
                Operand::Const(2)
            )
            .to_string(),
            "LSHIFT t3, i, 2"
        );
        assert_eq!(
            Instr::jmp_if_false(Operand::Temp(0), 4).to_string(),
            "JMP_IF_FALSE t0, L4"
        );
        assert_eq!(
            Instr::astore(Operand::Var(sym("a")), Operand::Temp(1), Operand::Const(7))
                .to_string(),
            "ASTORE 7, a, t1"
        );
        assert_eq!(Instr::ret(None).to_string(), "RETURN");
    }

    #[test]
    fn classification() {
        assert!(Instr::label(0).is_boundary());
        assert!(Instr::jmp_if_false(Operand::Temp(0), 1).is_boundary());
        assert!(Instr::print(Operand::Temp(0)).is_side_effecting());
        assert!(!Instr::mov(Operand::Temp(0), Operand::Const(1)).is_side_effecting());
        assert!(Opcode::Aload.is_pure());
        assert!(!Opcode::Call.is_pure());
    }

    #[test]
    fn sources_and_defs() {
        let add = Instr::binary(
            Opcode::Add,
            Operand::Temp(2),
            Operand::Temp(0),
            Operand::Temp(1),
        );
        assert_eq!(add.def(), Some(Operand::Temp(2)));
        let sources: Vec<_> = add.sources().collect();
        assert_eq!(sources, vec![Operand::Temp(0), Operand::Temp(1)]);

        // A store defines nothing but reads index, value, and the array.
        let store = Instr::astore(Operand::Var(sym("a")), Operand::Temp(0), Operand::Temp(1));
        assert_eq!(store.def(), None);
        let sources: Vec<_> = store.sources().collect();
        assert!(sources.contains(&Operand::Temp(0)));
        assert!(sources.contains(&Operand::Temp(1)));
        assert!(sources.contains(&Operand::Var(sym("a"))));

        // A load's array operand is a read, its label-free index too.
        let load = Instr::aload(Operand::Temp(5), Operand::Var(sym("a")), Operand::Temp(4));
        let sources: Vec<_> = load.sources().collect();
        assert!(sources.contains(&Operand::Temp(4)));
        assert!(sources.contains(&Operand::Var(sym("a"))));

        // Jump targets are not value reads.
        let jmp = Instr::jmp(3);
        assert_eq!(jmp.sources().count(), 0);
    }
}
