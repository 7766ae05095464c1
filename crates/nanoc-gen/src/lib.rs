//! nanoc-gen - Assembly backend for NanoC.
//!
//! Lowers optimized TAC to NASM-syntax x86-64 text. Every value lives in a
//! stack slot ([`frame`]); each TAC opcode expands to a fixed instruction
//! template ([`asm`]). There is no register allocation beyond the scratch
//! registers the templates use.
//!
//! The emitted module exports `main` and expects `printf` and `scanf` from
//! the C runtime. The internal calling convention passes arguments on the
//! stack right-to-left with caller cleanup, which deviates from System V
//! deliberately; see `asm.rs`.

pub mod asm;
pub mod error;
pub mod frame;

pub use asm::AsmEmitter;
pub use error::CodeGenError;
pub use frame::FrameLayout;

use nanoc_tac::Program;

/// Assembly flavor to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Target {
    /// NASM syntax, Unix-style externs.
    #[default]
    X86_64,
    /// GNU-syntax RISC-V. Declared but not yet implemented.
    RiscV,
}

/// Generate assembly text for a whole program.
pub fn generate(program: &Program, target: Target) -> Result<String, CodeGenError> {
    match target {
        Target::X86_64 => AsmEmitter::new().emit_program(program),
        Target::RiscV => Err(CodeGenError::UnsupportedTarget("riscv")),
    }
}
