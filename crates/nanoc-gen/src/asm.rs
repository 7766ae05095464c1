//! NASM text emission.
//!
//! Each TAC instruction expands to a fixed template over `rax`/`rbx` (and
//! `rcx`/`rdx` where division or indexing needs them), with every value
//! loaded from and stored back to its frame slot. Label numbers are emitted
//! as NASM-local labels (`.L0`, `.L1`, …), so per-function numbering cannot
//! collide across functions; `.Lexit` is each function's epilogue.
//!
//! Calling convention: arguments are pushed right-to-left, the caller pops
//! them after the call (`add rsp, n*8`), return value in `rax`. Stack
//! alignment before the `printf`/`scanf` externs is best-effort only.

use nanoc_tac::{Function, GlobalDef, Instr, Opcode, Operand, Program};
use nanoc_util::Symbol;

use crate::error::CodeGenError;
use crate::frame::FrameLayout;

/// Builds the output assembly text.
pub struct AsmEmitter {
    out: String,
}

impl AsmEmitter {
    pub fn new() -> Self {
        Self { out: String::new() }
    }

    /// Emit a complete module: data, bss, and one text block per function.
    pub fn emit_program(mut self, program: &Program) -> Result<String, CodeGenError> {
        self.raw("section .data");
        self.line("fmt_int db \"%d\", 10, 0");
        self.line("fmt_in  db \"%d\", 0");
        self.raw("");

        if !program.globals.is_empty() {
            self.raw("section .bss");
            for global in &program.globals {
                self.emit_global(global);
            }
            self.raw("");
        }

        self.raw("section .text");
        self.line("extern printf");
        self.line("extern scanf");
        self.line("global main");
        self.raw("");

        for func in &program.functions {
            self.emit_function(func)?;
            self.raw("");
        }

        Ok(self.out)
    }

    fn emit_global(&mut self, global: &GlobalDef) {
        self.line(&format!("g_{}: resq {}", global.name, global.size));
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), CodeGenError> {
        let frame = FrameLayout::compute(func);

        self.raw(&format!("{}:", func.name));
        self.line("push rbp");
        self.line("mov rbp, rsp");
        if frame.frame_size() > 0 {
            self.line(&format!("sub rsp, {}", frame.frame_size()));
        }

        for instr in &func.body {
            self.emit_instr(instr, &frame)?;
        }

        self.raw(".Lexit:");
        self.line("mov rsp, rbp");
        self.line("pop rbp");
        self.line("ret");
        Ok(())
    }

    fn emit_instr(&mut self, instr: &Instr, frame: &FrameLayout) -> Result<(), CodeGenError> {
        self.line(&format!("; {instr}"));
        match instr.op {
            Opcode::Mov => {
                self.load("rax", src1(instr)?, frame)?;
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::And | Opcode::Or => {
                self.load("rax", src1(instr)?, frame)?;
                self.load("rbx", src2(instr)?, frame)?;
                let mnemonic = match instr.op {
                    Opcode::Add => "add",
                    Opcode::Sub => "sub",
                    Opcode::Mul => "imul",
                    Opcode::And => "and",
                    Opcode::Or => "or",
                    _ => unreachable!(),
                };
                self.line(&format!("{mnemonic} rax, rbx"));
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Div | Opcode::Mod => {
                self.load("rax", src1(instr)?, frame)?;
                self.load("rcx", src2(instr)?, frame)?;
                self.line("cqo");
                self.line("idiv rcx");
                let result = if instr.op == Opcode::Div { "rax" } else { "rdx" };
                self.store(dst(instr)?, result, frame)
            }
            Opcode::Lshift | Opcode::Rshift => {
                let amount = src2(instr)?
                    .as_const()
                    .ok_or(CodeGenError::NonImmediateShift)?;
                self.load("rax", src1(instr)?, frame)?;
                let mnemonic = if instr.op == Opcode::Lshift { "shl" } else { "sar" };
                self.line(&format!("{mnemonic} rax, {amount}"));
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Lt | Opcode::Gt | Opcode::Le | Opcode::Ge | Opcode::Eq | Opcode::Neq => {
                self.load("rax", src1(instr)?, frame)?;
                self.load("rbx", src2(instr)?, frame)?;
                self.line("cmp rax, rbx");
                let set = match instr.op {
                    Opcode::Lt => "setl",
                    Opcode::Gt => "setg",
                    Opcode::Le => "setle",
                    Opcode::Ge => "setge",
                    Opcode::Eq => "sete",
                    Opcode::Neq => "setne",
                    _ => unreachable!(),
                };
                self.line(&format!("{set} al"));
                self.line("movzx rax, al");
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Not => {
                self.load("rax", src1(instr)?, frame)?;
                self.line("cmp rax, 0");
                self.line("sete al");
                self.line("movzx rax, al");
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Label => {
                let label = label_of(src1(instr)?)?;
                self.raw(&format!(".L{label}:"));
                Ok(())
            }
            Opcode::Jmp => {
                let label = label_of(src1(instr)?)?;
                self.line(&format!("jmp .L{label}"));
                Ok(())
            }
            Opcode::JmpIfFalse => {
                self.load("rax", src1(instr)?, frame)?;
                self.line("cmp rax, 0");
                let label = label_of(src2(instr)?)?;
                self.line(&format!("je .L{label}"));
                Ok(())
            }
            Opcode::Param => {
                self.load("rax", src1(instr)?, frame)?;
                self.line("push rax");
                Ok(())
            }
            Opcode::Call => {
                let callee = func_of(src1(instr)?)?;
                let arity = src2(instr)?
                    .as_const()
                    .ok_or(CodeGenError::MissingOperand("call arity"))?;
                self.line(&format!("call {callee}"));
                if arity > 0 {
                    self.line(&format!("add rsp, {}", arity * 8));
                }
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Return => {
                match instr.src1 {
                    Some(value) => self.load("rax", value, frame)?,
                    None => self.line("xor rax, rax"),
                }
                self.line("jmp .Lexit");
                Ok(())
            }
            Opcode::Print => {
                self.load("rsi", src1(instr)?, frame)?;
                self.line("lea rdi, [rel fmt_int]");
                self.line("xor rax, rax");
                self.line("call printf");
                Ok(())
            }
            Opcode::ReadInt => {
                self.line("lea rdi, [rel fmt_in]");
                let target = self.slot_address(dst(instr)?, frame)?;
                self.line(&format!("lea rsi, {target}"));
                self.line("xor rax, rax");
                self.line("call scanf");
                Ok(())
            }
            Opcode::Alloca => {
                // Storage was reserved by the frame pass; nothing to do.
                Ok(())
            }
            Opcode::Aload => {
                self.load("rcx", src2(instr)?, frame)?;
                self.lea_array_base("rdx", src1(instr)?, frame)?;
                self.line("mov rax, qword [rdx + rcx*8]");
                self.store(dst(instr)?, "rax", frame)
            }
            Opcode::Astore => {
                self.load("rcx", src1(instr)?, frame)?;
                self.load("rax", src2(instr)?, frame)?;
                self.lea_array_base("rdx", dst(instr)?, frame)?;
                self.line("mov qword [rdx + rcx*8], rax");
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------
    // Operand plumbing
    // -------------------------------------------------------------------

    /// Load a value operand into a register.
    fn load(
        &mut self,
        reg: &str,
        operand: Operand,
        frame: &FrameLayout,
    ) -> Result<(), CodeGenError> {
        match operand {
            Operand::Const(value) => {
                self.line(&format!("mov {reg}, {value}"));
                Ok(())
            }
            Operand::Temp(_) | Operand::Var(_) => {
                let addr = frame.address(operand)?;
                self.line(&format!("mov {reg}, qword {addr}"));
                Ok(())
            }
            Operand::Global(name) => {
                self.line(&format!("mov {reg}, qword [rel g_{name}]"));
                Ok(())
            }
            Operand::Label(_) | Operand::Func(_) => {
                Err(CodeGenError::BadOperand(operand.to_string(), "a value"))
            }
        }
    }

    /// Store a register into a storage operand's slot.
    fn store(
        &mut self,
        operand: Operand,
        reg: &str,
        frame: &FrameLayout,
    ) -> Result<(), CodeGenError> {
        match operand {
            Operand::Temp(_) | Operand::Var(_) => {
                let addr = frame.address(operand)?;
                self.line(&format!("mov qword {addr}, {reg}"));
                Ok(())
            }
            Operand::Global(name) => {
                self.line(&format!("mov qword [rel g_{name}], {reg}"));
                Ok(())
            }
            _ => Err(CodeGenError::BadOperand(
                operand.to_string(),
                "a store target",
            )),
        }
    }

    /// Bare `[...]` address of a storage operand, for `lea`.
    fn slot_address(
        &mut self,
        operand: Operand,
        frame: &FrameLayout,
    ) -> Result<String, CodeGenError> {
        match operand {
            Operand::Temp(_) | Operand::Var(_) => frame.address(operand),
            Operand::Global(name) => Ok(format!("[rel g_{name}]")),
            _ => Err(CodeGenError::BadOperand(
                operand.to_string(),
                "an address",
            )),
        }
    }

    /// Point `reg` at element 0 of an array operand.
    fn lea_array_base(
        &mut self,
        reg: &str,
        operand: Operand,
        frame: &FrameLayout,
    ) -> Result<(), CodeGenError> {
        let addr = match operand {
            Operand::Var(_) => frame.address(operand)?,
            Operand::Global(name) => format!("[rel g_{name}]"),
            _ => {
                return Err(CodeGenError::BadOperand(
                    operand.to_string(),
                    "an array base",
                ))
            }
        };
        self.line(&format!("lea {reg}, {addr}"));
        Ok(())
    }

    /// An indented instruction line.
    fn line(&mut self, text: &str) {
        self.out.push_str("    ");
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// An unindented line (labels, section headers).
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl Default for AsmEmitter {
    fn default() -> Self {
        Self::new()
    }
}

fn dst(instr: &Instr) -> Result<Operand, CodeGenError> {
    instr.dst.ok_or(CodeGenError::MissingOperand("destination"))
}

fn src1(instr: &Instr) -> Result<Operand, CodeGenError> {
    instr.src1.ok_or(CodeGenError::MissingOperand("first source"))
}

fn src2(instr: &Instr) -> Result<Operand, CodeGenError> {
    instr
        .src2
        .ok_or(CodeGenError::MissingOperand("second source"))
}

fn label_of(operand: Operand) -> Result<u32, CodeGenError> {
    match operand {
        Operand::Label(n) => Ok(n),
        _ => Err(CodeGenError::BadOperand(operand.to_string(), "a label")),
    }
}

fn func_of(operand: Operand) -> Result<Symbol, CodeGenError> {
    match operand {
        Operand::Func(name) => Ok(name),
        _ => Err(CodeGenError::BadOperand(
            operand.to_string(),
            "a call target",
        )),
    }
}
