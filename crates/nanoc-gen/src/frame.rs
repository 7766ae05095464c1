//! Stack frame layout.
//!
//! One preliminary walk over a function's TAC collects every operand that
//! needs storage and assigns it an offset relative to `rbp`:
//!
//! - locals and temporaries get 8-byte slots at descending negative
//!   offsets (`[rbp - 8]`, `[rbp - 16]`, …);
//! - arrays reserve `size * 8` contiguous bytes, addressed from their
//!   lowest slot upward;
//! - parameters resolve above the saved frame pointer: with stack-passed
//!   arguments pushed right-to-left, the leftmost parameter sits at
//!   `[rbp + 16]`, the next at `[rbp + 24]`, and so on.
//!
//! The frame is rounded to 8 bytes only. 16-byte call-site alignment is a
//! known limitation of the internal convention.

use indexmap::IndexMap;
use nanoc_tac::{Function, Opcode, Operand};

use crate::error::CodeGenError;

/// Byte offset of the first stack-passed parameter from `rbp`
/// (past the saved `rbp` and the return address).
const PARAM_BASE: i32 = 16;

/// Resolved stack layout for one function.
#[derive(Debug)]
pub struct FrameLayout {
    /// Operand → offset such that the slot address is `rbp + offset`.
    slots: IndexMap<Operand, i32>,
    /// Total bytes to subtract from `rsp` in the prologue.
    frame_size: u32,
}

impl FrameLayout {
    /// Walk the function and assign every storage operand a slot.
    pub fn compute(func: &Function) -> Self {
        let mut slots = IndexMap::new();
        let mut used: u32 = 0;

        for (i, &param) in func.params.iter().enumerate() {
            slots.insert(Operand::Var(param), PARAM_BASE + 8 * i as i32);
        }

        for instr in &func.body {
            if instr.op == Opcode::Alloca {
                let (Some(array), Some(Operand::Const(size))) = (instr.dst, instr.src1) else {
                    continue;
                };
                if !slots.contains_key(&array) {
                    used += 8 * size.max(1) as u32;
                    // Offset of element 0: the region's lowest address.
                    slots.insert(array, -(used as i32));
                }
                continue;
            }
            for operand in [instr.dst, instr.src1, instr.src2].into_iter().flatten() {
                if matches!(operand, Operand::Temp(_) | Operand::Var(_))
                    && !slots.contains_key(&operand)
                {
                    used += 8;
                    slots.insert(operand, -(used as i32));
                }
            }
        }

        Self {
            slots,
            frame_size: (used + 7) & !7,
        }
    }

    /// Bytes reserved below `rbp`.
    pub fn frame_size(&self) -> u32 {
        self.frame_size
    }

    /// The `rbp`-relative offset of an operand's slot.
    pub fn offset(&self, operand: Operand) -> Result<i32, CodeGenError> {
        self.slots
            .get(&operand)
            .copied()
            .ok_or_else(|| CodeGenError::UnknownOperandSlot(operand.to_string()))
    }

    /// `[rbp+off]` / `[rbp-off]` address text for an operand's slot.
    pub fn address(&self, operand: Operand) -> Result<String, CodeGenError> {
        let offset = self.offset(operand)?;
        if offset >= 0 {
            Ok(format!("[rbp + {offset}]"))
        } else {
            Ok(format!("[rbp - {}]", -offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_par::ast::Type;
    use nanoc_tac::Instr;
    use nanoc_util::Symbol;

    fn sym(name: &str) -> Symbol {
        Symbol::intern(name)
    }

    #[test]
    fn params_live_above_the_frame() {
        let func = Function {
            name: sym("f"),
            params: vec![sym("a"), sym("b")],
            ret_ty: Type::Int,
            body: vec![Instr::ret(Some(Operand::Var(sym("a"))))],
        };
        let frame = FrameLayout::compute(&func);
        assert_eq!(frame.offset(Operand::Var(sym("a"))).unwrap(), 16);
        assert_eq!(frame.offset(Operand::Var(sym("b"))).unwrap(), 24);
        assert_eq!(frame.frame_size(), 0);
    }

    #[test]
    fn locals_and_temps_descend() {
        let x = Operand::Var(sym("x"));
        let t0 = Operand::Temp(0);
        let func = Function {
            name: sym("f"),
            params: vec![],
            ret_ty: Type::Void,
            body: vec![
                Instr::mov(x, Operand::Const(1)),
                Instr::binary(Opcode::Add, t0, x, Operand::Const(2)),
                Instr::print(t0),
                Instr::ret(None),
            ],
        };
        let frame = FrameLayout::compute(&func);
        assert_eq!(frame.offset(x).unwrap(), -8);
        assert_eq!(frame.offset(t0).unwrap(), -16);
        assert_eq!(frame.frame_size(), 16);
        assert_eq!(frame.address(x).unwrap(), "[rbp - 8]");
    }

    #[test]
    fn arrays_reserve_contiguous_slots() {
        let a = Operand::Var(sym("a"));
        let t0 = Operand::Temp(0);
        let func = Function {
            name: sym("f"),
            params: vec![],
            ret_ty: Type::Void,
            body: vec![
                Instr::alloca(a, 5),
                Instr::aload(t0, a, Operand::Const(3)),
                Instr::print(t0),
                Instr::ret(None),
            ],
        };
        let frame = FrameLayout::compute(&func);
        // 5 slots for the array, then one for the temp.
        assert_eq!(frame.offset(a).unwrap(), -40);
        assert_eq!(frame.offset(t0).unwrap(), -48);
        assert_eq!(frame.frame_size(), 48);
    }

    #[test]
    fn unknown_operand_is_an_error() {
        let func = Function {
            name: sym("f"),
            params: vec![],
            ret_ty: Type::Void,
            body: vec![Instr::ret(None)],
        };
        let frame = FrameLayout::compute(&func);
        assert!(matches!(
            frame.offset(Operand::Temp(9)),
            Err(CodeGenError::UnknownOperandSlot(_))
        ));
    }

    #[test]
    fn read_before_write_still_gets_a_slot() {
        // An uninitialized local read must still resolve to a frame slot.
        let x = Operand::Var(sym("x"));
        let func = Function {
            name: sym("f"),
            params: vec![],
            ret_ty: Type::Void,
            body: vec![Instr::print(x), Instr::ret(None)],
        };
        let frame = FrameLayout::compute(&func);
        assert_eq!(frame.offset(x).unwrap(), -8);
    }
}
