//! AST to TAC lowering.
//!
//! Walks the type-checked AST function by function, threading a
//! [`FuncBuilder`] for counter state, a scope stack for name resolution, and
//! a loop-context stack for `break`/`continue` targets.
//!
//! Name versioning: the first introduction of a name in a function keeps the
//! bare name; each later introduction (a shadowing declaration, or a sibling
//! scope reusing the name) gets a `_2`, `_3`, … suffix. IR names stay
//! human-readable and never collide.
//!
//! `const` bindings are aliased to their initializer value (a literal or the
//! temporary holding it) rather than given a named slot, so no `MOV` to a
//! const symbol ever appears in the IR.

use nanoc_par::ast::{self, BinOp, Expr, IncDecOp, Stmt, Type, UnOp};
use nanoc_util::{CompileError, Symbol};
use rustc_hash::FxHashMap;

use crate::builder::FuncBuilder;
use crate::tac::{Function, GlobalDef, Instr, Opcode, Operand, Program};

/// Lower a checked program to TAC.
pub fn lower(program: &ast::Program) -> Result<Program, CompileError> {
    let mut globals = FxHashMap::default();
    let mut global_defs = Vec::new();
    let mut global_inits = Vec::new();

    for decl in &program.decls {
        let ast::Decl::Global(var) = decl else {
            continue;
        };
        if var.is_const {
            // Const globals have no storage: every use reads the literal.
            let value = const_literal_value(var.init.as_ref())?;
            globals.insert(var.name, GlobalBinding::ConstValue(value));
        } else if let Some(size) = var.array_size {
            global_defs.push(GlobalDef {
                name: var.name,
                size,
                is_array: true,
            });
            globals.insert(var.name, GlobalBinding::Slot { is_array: true });
        } else {
            global_defs.push(GlobalDef {
                name: var.name,
                size: 1,
                is_array: false,
            });
            globals.insert(var.name, GlobalBinding::Slot { is_array: false });
            if var.init.is_some() {
                let value = const_literal_value(var.init.as_ref())?;
                global_inits.push((var.name, value));
            }
        }
    }

    let mut functions = Vec::new();
    for decl in &program.decls {
        if let ast::Decl::Func(func) = decl {
            let inits: &[(Symbol, i64)] = if func.name.as_str() == "main" {
                &global_inits
            } else {
                &[]
            };
            functions.push(FnLowerer::new(func, &globals).lower(func, inits)?);
        }
    }

    Ok(Program {
        globals: global_defs,
        functions,
    })
}

#[derive(Clone, Copy)]
enum GlobalBinding {
    Slot { is_array: bool },
    ConstValue(i64),
}

/// What a resolved name denotes during lowering.
#[derive(Clone, Copy)]
struct Binding {
    operand: Operand,
    is_array: bool,
}

struct LoopCtx {
    break_label: u32,
    continue_label: u32,
}

/// Per-function lowering state.
struct FnLowerer<'a> {
    builder: FuncBuilder,
    scopes: Vec<FxHashMap<Symbol, Binding>>,
    /// Introduction counters for name versioning.
    versions: FxHashMap<Symbol, u32>,
    loops: Vec<LoopCtx>,
    globals: &'a FxHashMap<Symbol, GlobalBinding>,
    /// Counter for short-circuit merge slots (`and.K` / `or.K`).
    merges: u32,
}

impl<'a> FnLowerer<'a> {
    fn new(func: &ast::FuncDecl, globals: &'a FxHashMap<Symbol, GlobalBinding>) -> Self {
        Self {
            builder: FuncBuilder::new(func.name, func.ret_ty),
            scopes: Vec::new(),
            versions: FxHashMap::default(),
            loops: Vec::new(),
            globals,
            merges: 0,
        }
    }

    fn lower(
        mut self,
        func: &ast::FuncDecl,
        global_inits: &[(Symbol, i64)],
    ) -> Result<Function, CompileError> {
        self.scopes.push(FxHashMap::default());
        for param in &func.params {
            let versioned = self.declare(param.name);
            self.builder.add_param(versioned);
            self.bind(
                param.name,
                Binding {
                    operand: Operand::Var(versioned),
                    is_array: false,
                },
            );
        }

        // Module-level initializers run before main's first statement.
        for &(name, value) in global_inits {
            self.builder
                .emit(Instr::mov(Operand::Global(name), Operand::Const(value)));
        }

        for stmt in &func.body.stmts {
            self.lower_stmt(stmt)?;
        }
        self.scopes.pop();

        // Void functions may fall off the end; main additionally gets the
        // implicit zero return.
        let terminated = matches!(self.builder.last(), Some(i) if i.op == Opcode::Return);
        if !terminated && (func.ret_ty == Type::Void || func.name.as_str() == "main") {
            self.builder.emit(Instr::ret(None));
        }
        Ok(self.builder.finish())
    }

    // -------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------

    /// Allocate the versioned IR name for a new declaration of `name`.
    fn declare(&mut self, name: Symbol) -> Symbol {
        let count = self.versions.entry(name).or_insert(0);
        *count += 1;
        if *count == 1 {
            name
        } else {
            Symbol::intern(&format!("{}_{}", name, *count))
        }
    }

    fn bind(&mut self, name: Symbol, binding: Binding) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .insert(name, binding);
    }

    fn resolve(&self, name: Symbol) -> Result<Binding, CompileError> {
        for frame in self.scopes.iter().rev() {
            if let Some(binding) = frame.get(&name) {
                return Ok(*binding);
            }
        }
        match self.globals.get(&name) {
            Some(GlobalBinding::Slot { is_array }) => Ok(Binding {
                operand: Operand::Global(name),
                is_array: *is_array,
            }),
            Some(GlobalBinding::ConstValue(value)) => Ok(Binding {
                operand: Operand::Const(*value),
                is_array: false,
            }),
            None => Err(CompileError::internal(format!(
                "unresolved name '{name}' reached lowering"
            ))),
        }
    }

    // -------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl(var) => self.lower_var_decl(var),
            Stmt::Block(block) => {
                self.scopes.push(FxHashMap::default());
                for stmt in &block.stmts {
                    self.lower_stmt(stmt)?;
                }
                self.scopes.pop();
                Ok(())
            }
            Stmt::If(if_stmt) => self.lower_if(if_stmt),
            Stmt::While(while_stmt) => self.lower_while(while_stmt),
            Stmt::For(for_stmt) => self.lower_for(for_stmt),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => Some(self.lower_expr(expr)?),
                    None => None,
                };
                self.builder.emit(Instr::ret(value));
                Ok(())
            }
            Stmt::Break(_) => {
                let target = self.loop_ctx("break")?.break_label;
                self.builder.emit(Instr::jmp(target));
                Ok(())
            }
            Stmt::Continue(_) => {
                let target = self.loop_ctx("continue")?.continue_label;
                self.builder.emit(Instr::jmp(target));
                Ok(())
            }
            Stmt::Expr(expr) => self.lower_expr(expr).map(|_| ()),
            Stmt::Print(print) => {
                let value = self.lower_expr(&print.expr)?;
                self.builder.emit(Instr::print(value));
                Ok(())
            }
            Stmt::Assign(assign) => {
                let value = self.lower_expr(&assign.value)?;
                let binding = self.resolve(assign.name)?;
                if !binding.operand.is_named() {
                    return Err(CompileError::internal(format!(
                        "assignment to non-storage binding '{}'",
                        assign.name
                    )));
                }
                self.builder.emit(Instr::mov(binding.operand, value));
                Ok(())
            }
            Stmt::ArrayStore(store) => {
                let index = self.lower_expr(&store.index)?;
                let value = self.lower_expr(&store.value)?;
                let array = self.resolve(store.name)?;
                if !array.is_array {
                    return Err(CompileError::internal(format!(
                        "indexed store to non-array '{}'",
                        store.name
                    )));
                }
                self.builder
                    .emit(Instr::astore(array.operand, index, value));
                Ok(())
            }
        }
    }

    fn lower_var_decl(&mut self, var: &ast::VarDecl) -> Result<(), CompileError> {
        if let Some(size) = var.array_size {
            let versioned = self.declare(var.name);
            self.bind(
                var.name,
                Binding {
                    operand: Operand::Var(versioned),
                    is_array: true,
                },
            );
            self.builder.emit(Instr::alloca(Operand::Var(versioned), size));
            return Ok(());
        }

        // Initializers are lowered before the name is bound, so
        // `int x = x + 1;` reads the outer `x`.
        let init = match &var.init {
            Some(expr) => Some(self.lower_expr(expr)?),
            None => None,
        };

        if var.is_const {
            let value = init.ok_or_else(|| {
                CompileError::internal(format!("const '{}' without initializer", var.name))
            })?;
            // Literals and temporaries are stable; anything else is copied
            // into a temporary so later writes to the source cannot leak in.
            let alias = match value {
                Operand::Const(_) | Operand::Temp(_) => value,
                _ => {
                    let temp = self.builder.fresh_temp();
                    self.builder.emit(Instr::mov(temp, value));
                    temp
                }
            };
            self.bind(
                var.name,
                Binding {
                    operand: alias,
                    is_array: false,
                },
            );
            return Ok(());
        }

        let versioned = self.declare(var.name);
        self.bind(
            var.name,
            Binding {
                operand: Operand::Var(versioned),
                is_array: false,
            },
        );
        if let Some(value) = init {
            self.builder.emit(Instr::mov(Operand::Var(versioned), value));
        }
        Ok(())
    }

    fn lower_if(&mut self, if_stmt: &ast::IfStmt) -> Result<(), CompileError> {
        let cond = self.lower_expr(&if_stmt.cond)?;
        if let Some(else_branch) = &if_stmt.else_branch {
            let l_else = self.builder.fresh_label();
            let l_end = self.builder.fresh_label();
            self.builder.emit(Instr::jmp_if_false(cond, l_else));
            self.lower_stmt(&if_stmt.then_branch)?;
            self.builder.emit(Instr::jmp(l_end));
            self.builder.emit(Instr::label(l_else));
            self.lower_stmt(else_branch)?;
            self.builder.emit(Instr::label(l_end));
        } else {
            let l_end = self.builder.fresh_label();
            self.builder.emit(Instr::jmp_if_false(cond, l_end));
            self.lower_stmt(&if_stmt.then_branch)?;
            self.builder.emit(Instr::label(l_end));
        }
        Ok(())
    }

    fn lower_while(&mut self, while_stmt: &ast::WhileStmt) -> Result<(), CompileError> {
        let l_head = self.builder.fresh_label();
        let l_end = self.builder.fresh_label();

        self.builder.emit(Instr::label(l_head));
        let cond = self.lower_expr(&while_stmt.cond)?;
        self.builder.emit(Instr::jmp_if_false(cond, l_end));

        self.loops.push(LoopCtx {
            break_label: l_end,
            continue_label: l_head,
        });
        let result = self.lower_stmt(&while_stmt.body);
        self.loops.pop();
        result?;

        self.builder.emit(Instr::jmp(l_head));
        self.builder.emit(Instr::label(l_end));
        Ok(())
    }

    fn lower_for(&mut self, for_stmt: &ast::ForStmt) -> Result<(), CompileError> {
        // The init declaration scopes over the whole loop.
        self.scopes.push(FxHashMap::default());

        if let Some(init) = &for_stmt.init {
            self.lower_stmt(init)?;
        }

        let l_head = self.builder.fresh_label();
        let l_cont = self.builder.fresh_label();
        let l_end = self.builder.fresh_label();

        self.builder.emit(Instr::label(l_head));
        if let Some(cond) = &for_stmt.cond {
            let cond = self.lower_expr(cond)?;
            self.builder.emit(Instr::jmp_if_false(cond, l_end));
        }

        self.loops.push(LoopCtx {
            break_label: l_end,
            continue_label: l_cont,
        });
        let result = self.lower_stmt(&for_stmt.body);
        self.loops.pop();
        result?;

        self.builder.emit(Instr::label(l_cont));
        if let Some(update) = &for_stmt.update {
            self.lower_stmt(update)?;
        }
        self.builder.emit(Instr::jmp(l_head));
        self.builder.emit(Instr::label(l_end));

        self.scopes.pop();
        Ok(())
    }

    fn loop_ctx(&self, keyword: &str) -> Result<&LoopCtx, CompileError> {
        self.loops.last().ok_or_else(|| {
            CompileError::internal(format!("'{keyword}' outside a loop reached lowering"))
        })
    }

    // -------------------------------------------------------------------
    // Expressions
    // -------------------------------------------------------------------

    /// Lower an expression, returning the operand that holds its value.
    ///
    /// Literals lower to themselves; no instruction is emitted for them.
    fn lower_expr(&mut self, expr: &Expr) -> Result<Operand, CompileError> {
        match expr {
            Expr::IntLit(value, _) => Ok(Operand::Const(*value)),
            Expr::BoolLit(value, _) => Ok(Operand::Const(*value as i64)),
            Expr::FloatLit(value, _) => Err(CompileError::internal(format!(
                "floating-point literal {value} is never lowered"
            ))),
            Expr::Ident(name, _) => Ok(self.resolve(*name)?.operand),
            Expr::ReadInt(_) => {
                let dst = self.builder.fresh_temp();
                self.builder.emit(Instr::read_int(dst));
                Ok(dst)
            }
            Expr::ArrayLoad(load) => {
                let index = self.lower_expr(&load.index)?;
                let array = self.resolve(load.name)?;
                if !array.is_array {
                    return Err(CompileError::internal(format!(
                        "indexed load from non-array '{}'",
                        load.name
                    )));
                }
                let dst = self.builder.fresh_temp();
                self.builder.emit(Instr::aload(dst, array.operand, index));
                Ok(dst)
            }
            Expr::Unary(unary) => {
                let operand = self.lower_expr(&unary.operand)?;
                let dst = self.builder.fresh_temp();
                match unary.op {
                    // There is no NEG opcode; negation is a subtraction
                    // from zero.
                    UnOp::Neg => self.builder.emit(Instr::binary(
                        Opcode::Sub,
                        dst,
                        Operand::Const(0),
                        operand,
                    )),
                    UnOp::Not => self.builder.emit(Instr::not(dst, operand)),
                }
                Ok(dst)
            }
            Expr::Binary(binary) if binary.op.is_logical() => {
                self.lower_logical(binary.op, &binary.left, &binary.right)
            }
            Expr::Binary(binary) => {
                let left = self.lower_expr(&binary.left)?;
                let right = self.lower_expr(&binary.right)?;
                let dst = self.builder.fresh_temp();
                self.builder
                    .emit(Instr::binary(binop_opcode(binary.op), dst, left, right));
                Ok(dst)
            }
            Expr::Call(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for arg in &call.args {
                    args.push(self.lower_expr(arg)?);
                }
                // Arguments are pushed right-to-left.
                for &arg in args.iter().rev() {
                    self.builder.emit(Instr::param(arg));
                }
                let dst = self.builder.fresh_temp();
                self.builder
                    .emit(Instr::call(dst, call.name, call.args.len()));
                Ok(dst)
            }
            Expr::IncDec(incdec) => self.lower_incdec(incdec),
        }
    }

    /// `&&`/`||` short-circuit through a synthetic named merge slot so
    /// every temporary keeps its single assignment.
    fn lower_logical(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Operand, CompileError> {
        let prefix = if op == BinOp::And { "and" } else { "or" };
        let merge = Operand::Var(Symbol::intern(&format!("{prefix}.{}", self.merges)));
        self.merges += 1;

        let left = self.lower_expr(left)?;
        match op {
            BinOp::And => {
                let l_short = self.builder.fresh_label();
                let l_end = self.builder.fresh_label();
                self.builder.emit(Instr::jmp_if_false(left, l_short));
                let right = self.lower_expr(right)?;
                self.builder.emit(Instr::mov(merge, right));
                self.builder.emit(Instr::jmp(l_end));
                self.builder.emit(Instr::label(l_short));
                self.builder.emit(Instr::mov(merge, Operand::Const(0)));
                self.builder.emit(Instr::label(l_end));
            }
            BinOp::Or => {
                let l_rhs = self.builder.fresh_label();
                let l_end = self.builder.fresh_label();
                self.builder.emit(Instr::jmp_if_false(left, l_rhs));
                self.builder.emit(Instr::mov(merge, Operand::Const(1)));
                self.builder.emit(Instr::jmp(l_end));
                self.builder.emit(Instr::label(l_rhs));
                let right = self.lower_expr(right)?;
                self.builder.emit(Instr::mov(merge, right));
                self.builder.emit(Instr::label(l_end));
            }
            _ => unreachable!("only logical operators take this path"),
        }
        Ok(merge)
    }

    fn lower_incdec(&mut self, incdec: &ast::IncDecExpr) -> Result<Operand, CompileError> {
        let target = self.resolve(incdec.name)?.operand;
        if !target.is_named() {
            return Err(CompileError::internal(format!(
                "increment of non-storage binding '{}'",
                incdec.name
            )));
        }
        let op = match incdec.op {
            IncDecOp::Inc => Opcode::Add,
            IncDecOp::Dec => Opcode::Sub,
        };

        if incdec.prefix {
            // ++x: bump, result is the variable itself.
            let bumped = self.builder.fresh_temp();
            self.builder
                .emit(Instr::binary(op, bumped, target, Operand::Const(1)));
            self.builder.emit(Instr::mov(target, bumped));
            Ok(target)
        } else {
            // x++: capture the old value, then bump.
            let old = self.builder.fresh_temp();
            self.builder.emit(Instr::mov(old, target));
            let bumped = self.builder.fresh_temp();
            self.builder
                .emit(Instr::binary(op, bumped, target, Operand::Const(1)));
            self.builder.emit(Instr::mov(target, bumped));
            Ok(old)
        }
    }
}

fn binop_opcode(op: BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Rem => Opcode::Mod,
        BinOp::Lt => Opcode::Lt,
        BinOp::Le => Opcode::Le,
        BinOp::Gt => Opcode::Gt,
        BinOp::Ge => Opcode::Ge,
        BinOp::Eq => Opcode::Eq,
        BinOp::Ne => Opcode::Neq,
        BinOp::And | BinOp::Or => unreachable!("logical operators are short-circuited"),
    }
}

fn const_literal_value(init: Option<&Expr>) -> Result<i64, CompileError> {
    match init {
        Some(Expr::IntLit(value, _)) => Ok(*value),
        Some(Expr::BoolLit(value, _)) => Ok(*value as i64),
        Some(Expr::Unary(unary)) => match (&unary.op, &unary.operand) {
            (UnOp::Neg, Expr::IntLit(value, _)) => Ok(-value),
            _ => Err(CompileError::internal(
                "non-literal global initializer reached lowering",
            )),
        },
        _ => Err(CompileError::internal(
            "non-literal global initializer reached lowering",
        )),
    }
}
