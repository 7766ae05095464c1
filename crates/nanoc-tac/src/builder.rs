//! Instruction emission with per-function counter pools.
//!
//! The builder threads the `next_temp` / `next_label` counters through
//! lowering as explicit state. Both reset at every function boundary, so
//! temporary and label numbering is function-local.

use nanoc_par::ast::Type;
use nanoc_util::Symbol;

use crate::tac::{Function, Instr, Operand};

/// Accumulates one function's instruction list.
pub struct FuncBuilder {
    name: Symbol,
    params: Vec<Symbol>,
    ret_ty: Type,
    body: Vec<Instr>,
    next_temp: u32,
    next_label: u32,
}

impl FuncBuilder {
    pub fn new(name: Symbol, ret_ty: Type) -> Self {
        Self {
            name,
            params: Vec::new(),
            ret_ty,
            body: Vec::new(),
            next_temp: 0,
            next_label: 0,
        }
    }

    /// Register a parameter slot name, leftmost first.
    pub fn add_param(&mut self, name: Symbol) {
        self.params.push(name);
    }

    /// Allocate a fresh temporary. Each is written exactly once.
    pub fn fresh_temp(&mut self) -> Operand {
        let temp = Operand::Temp(self.next_temp);
        self.next_temp += 1;
        temp
    }

    /// Allocate a fresh label number, unique within this function.
    pub fn fresh_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    pub fn emit(&mut self, instr: Instr) {
        self.body.push(instr);
    }

    /// The last emitted instruction, if any.
    pub fn last(&self) -> Option<&Instr> {
        self.body.last()
    }

    pub fn finish(self) -> Function {
        Function {
            name: self.name,
            params: self.params,
            ret_ty: self.ret_ty,
            body: self.body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::Opcode;

    #[test]
    fn counters_are_monotonic_and_function_local() {
        let mut builder = FuncBuilder::new(Symbol::intern("f"), Type::Void);
        assert_eq!(builder.fresh_temp(), Operand::Temp(0));
        assert_eq!(builder.fresh_temp(), Operand::Temp(1));
        assert_eq!(builder.fresh_label(), 0);
        assert_eq!(builder.fresh_label(), 1);

        // A new builder starts both pools over.
        let mut other = FuncBuilder::new(Symbol::intern("g"), Type::Void);
        assert_eq!(other.fresh_temp(), Operand::Temp(0));
        assert_eq!(other.fresh_label(), 0);
    }

    #[test]
    fn finish_carries_everything() {
        let mut builder = FuncBuilder::new(Symbol::intern("f"), Type::Int);
        builder.add_param(Symbol::intern("n"));
        builder.emit(Instr::ret(Some(Operand::Const(0))));
        let func = builder.finish();
        assert_eq!(func.name.as_str(), "f");
        assert_eq!(func.params.len(), 1);
        assert_eq!(func.body.len(), 1);
        assert_eq!(func.body[0].op, Opcode::Return);
    }
}
