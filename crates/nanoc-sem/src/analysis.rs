//! The semantic analyzer.
//!
//! Walks the AST twice: signature collection (hoisting), then body checking.
//! All checks are fail-fast; the first violation is returned as the
//! compilation's error.

use nanoc_par::ast::*;
use nanoc_util::{CompileError, Span, Symbol};

use crate::scope::{ScopeStack, SymbolInfo, SymbolKind};

/// Validate a program. This is the crate's entry point.
pub fn check(program: &Program) -> Result<(), CompileError> {
    SemanticAnalyzer::new().check(program)
}

/// AST validator: scope resolution, type checking, const enforcement.
pub struct SemanticAnalyzer {
    scopes: ScopeStack,
    /// Nesting depth of enclosing loops; `break`/`continue` need > 0.
    loop_depth: usize,
    /// Return type of the function currently being walked.
    current_ret: Type,
    /// Name of the function currently being walked.
    current_fn: Option<Symbol>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
            loop_depth: 0,
            current_ret: Type::Void,
            current_fn: None,
        }
    }

    /// Run both sub-passes over the program.
    pub fn check(&mut self, program: &Program) -> Result<(), CompileError> {
        // Pass 1: hoist function signatures so forward references resolve.
        for decl in &program.decls {
            if let Decl::Func(func) = decl {
                let params = func.params.iter().map(|p| p.ty).collect();
                self.scopes
                    .declare(SymbolInfo::func(func.name, func.ret_ty, params, func.span))?;
            }
        }

        self.check_main()?;

        // Globals are processed in source order before any body, so every
        // function sees the full set; a global's own initializer sees only
        // the globals above it.
        for decl in &program.decls {
            if let Decl::Global(var) = decl {
                self.check_global_decl(var)?;
            }
        }

        // Pass 2: walk every function body.
        for decl in &program.decls {
            if let Decl::Func(func) = decl {
                self.check_function(func)?;
            }
        }

        Ok(())
    }

    /// `main` must exist as `void main()` or `int main()`.
    fn check_main(&self) -> Result<(), CompileError> {
        let main = Symbol::intern("main");
        let info = self
            .scopes
            .lookup_global(main)
            .ok_or_else(|| CompileError::Name {
                message: "function 'main' is not defined".into(),
                line: 1,
                col: 1,
            })?;
        if info.kind != SymbolKind::Func {
            return Err(CompileError::Name {
                message: "'main' must be a function".into(),
                line: info.span.line,
                col: info.span.column,
            });
        }
        if !info.params.as_deref().unwrap_or_default().is_empty() {
            return Err(CompileError::Type {
                message: "main takes no parameters".into(),
                line: info.span.line,
                col: info.span.column,
            });
        }
        if !matches!(info.ty, Type::Void | Type::Int) {
            return Err(CompileError::Type {
                message: format!("main must return void or int, not {}", info.ty),
                line: info.span.line,
                col: info.span.column,
            });
        }
        Ok(())
    }

    fn check_function(&mut self, func: &FuncDecl) -> Result<(), CompileError> {
        self.current_ret = func.ret_ty;
        self.current_fn = Some(func.name);

        // Parameters share the body's outermost frame, so a local
        // redeclaring a parameter is an error while nested blocks may still
        // shadow it.
        self.scopes.push();
        for param in &func.params {
            if param.ty == Type::Void {
                return Err(CompileError::Type {
                    message: format!("parameter '{}' cannot have type void", param.name),
                    line: param.span.line,
                    col: param.span.column,
                });
            }
            self.scopes
                .declare(SymbolInfo::var(param.name, param.ty, false, param.span))?;
        }
        for stmt in &func.body.stmts {
            self.check_stmt(stmt)?;
        }
        self.scopes.pop();

        // `main` gets the C-style implicit `return 0`.
        if func.ret_ty != Type::Void
            && func.name.as_str() != "main"
            && !block_returns(&func.body)
        {
            return Err(CompileError::MissingReturn {
                function: func.name.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl(var) => self.check_var_decl(var),
            Stmt::Block(block) => {
                self.scopes.push();
                for stmt in &block.stmts {
                    self.check_stmt(stmt)?;
                }
                self.scopes.pop();
                Ok(())
            }
            Stmt::If(if_stmt) => {
                self.check_cond(&if_stmt.cond)?;
                self.check_stmt(&if_stmt.then_branch)?;
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.check_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While(while_stmt) => {
                self.check_cond(&while_stmt.cond)?;
                self.loop_depth += 1;
                let result = self.check_stmt(&while_stmt.body);
                self.loop_depth -= 1;
                result
            }
            Stmt::For(for_stmt) => {
                // The init declaration scopes over the whole loop.
                self.scopes.push();
                let result = self.check_for(for_stmt);
                self.scopes.pop();
                result
            }
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::Break(span) => self.check_loop_ctrl("break", *span),
            Stmt::Continue(span) => self.check_loop_ctrl("continue", *span),
            Stmt::Expr(expr) => self.infer_expr(expr).map(|_| ()),
            Stmt::Print(print) => {
                let ty = self.infer_expr(&print.expr)?;
                if ty != Type::Int {
                    return Err(CompileError::Type {
                        message: format!("print expects an int argument, got {ty}"),
                        line: print.span.line,
                        col: print.span.column,
                    });
                }
                Ok(())
            }
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::ArrayStore(store) => self.check_array_store(store),
        }
    }

    fn check_for(&mut self, for_stmt: &ForStmt) -> Result<(), CompileError> {
        if let Some(init) = &for_stmt.init {
            self.check_stmt(init)?;
        }
        if let Some(cond) = &for_stmt.cond {
            self.check_cond(cond)?;
        }
        if let Some(update) = &for_stmt.update {
            self.check_stmt(update)?;
        }
        self.loop_depth += 1;
        let result = self.check_stmt(&for_stmt.body);
        self.loop_depth -= 1;
        result
    }

    /// Globals get the shared checks plus a C-like restriction: their
    /// initializers must be constant literals, because they live in `.bss`
    /// and are materialized before `main`'s first statement.
    fn check_global_decl(&mut self, var: &VarDecl) -> Result<(), CompileError> {
        if let Some(init) = &var.init {
            if !is_const_literal(init) {
                return Err(CompileError::Type {
                    message: format!(
                        "global '{}' initializer must be a constant literal",
                        var.name
                    ),
                    line: var.span.line,
                    col: var.span.column,
                });
            }
        }
        self.check_var_decl(var)
    }

    fn check_var_decl(&mut self, var: &VarDecl) -> Result<(), CompileError> {
        if var.ty == Type::Void {
            return Err(CompileError::Type {
                message: format!("cannot declare variable '{}' of type void", var.name),
                line: var.span.line,
                col: var.span.column,
            });
        }

        if let Some(size) = var.array_size {
            if size == 0 {
                return Err(CompileError::Type {
                    message: format!("array '{}' size must be a positive integer literal", var.name),
                    line: var.span.line,
                    col: var.span.column,
                });
            }
            if var.is_const {
                return Err(CompileError::Type {
                    message: format!("array '{}' cannot be declared const", var.name),
                    line: var.span.line,
                    col: var.span.column,
                });
            }
            if var.init.is_some() {
                return Err(CompileError::Type {
                    message: format!("array '{}' cannot have an initializer", var.name),
                    line: var.span.line,
                    col: var.span.column,
                });
            }
            return self
                .scopes
                .declare(SymbolInfo::array(var.name, var.ty, size, var.span));
        }

        if var.is_const && var.init.is_none() {
            return Err(CompileError::Type {
                message: format!("const '{}' requires an initializer", var.name),
                line: var.span.line,
                col: var.span.column,
            });
        }

        if let Some(init) = &var.init {
            let init_ty = self.infer_expr(init)?;
            if init_ty != var.ty {
                return Err(CompileError::Type {
                    message: format!(
                        "cannot initialize {} '{}' with {init_ty}",
                        var.ty, var.name
                    ),
                    line: var.span.line,
                    col: var.span.column,
                });
            }
        }

        self.scopes
            .declare(SymbolInfo::var(var.name, var.ty, var.is_const, var.span))
    }

    fn check_assign(&mut self, assign: &AssignStmt) -> Result<(), CompileError> {
        let value_ty = self.infer_expr(&assign.value)?;
        let info = self.resolve_var(assign.name, assign.span)?;
        match info.kind {
            SymbolKind::Const => {
                return Err(CompileError::Name {
                    message: format!("cannot assign to const {}", assign.name),
                    line: assign.span.line,
                    col: assign.span.column,
                })
            }
            SymbolKind::Func => {
                return Err(CompileError::Type {
                    message: format!("cannot assign to function '{}'", assign.name),
                    line: assign.span.line,
                    col: assign.span.column,
                })
            }
            SymbolKind::Array => {
                return Err(CompileError::Type {
                    message: format!("array '{}' requires an index to assign", assign.name),
                    line: assign.span.line,
                    col: assign.span.column,
                })
            }
            SymbolKind::Var => {}
        }
        let target_ty = info.ty;
        if value_ty != target_ty {
            return Err(CompileError::Type {
                message: format!("cannot assign {value_ty} to {target_ty} '{}'", assign.name),
                line: assign.span.line,
                col: assign.span.column,
            });
        }
        Ok(())
    }

    fn check_array_store(&mut self, store: &ArrayStoreStmt) -> Result<(), CompileError> {
        let index_ty = self.infer_expr(&store.index)?;
        let value_ty = self.infer_expr(&store.value)?;
        let info = self.resolve_var(store.name, store.span)?;
        if info.kind != SymbolKind::Array {
            return Err(CompileError::Type {
                message: format!("'{}' is not an array", store.name),
                line: store.span.line,
                col: store.span.column,
            });
        }
        let elem_ty = info.ty;
        if index_ty != Type::Int {
            return Err(CompileError::Type {
                message: format!("array index must be int, got {index_ty}"),
                line: store.span.line,
                col: store.span.column,
            });
        }
        if value_ty != elem_ty {
            return Err(CompileError::Type {
                message: format!("cannot store {value_ty} into {elem_ty} array '{}'", store.name),
                line: store.span.line,
                col: store.span.column,
            });
        }
        Ok(())
    }

    fn check_return(&mut self, ret: &ReturnStmt) -> Result<(), CompileError> {
        let fn_name = self.current_fn.map(|s| s.as_str()).unwrap_or("?");
        match (&ret.value, self.current_ret) {
            (None, Type::Void) => Ok(()),
            (None, ret_ty) => Err(CompileError::Type {
                message: format!("function '{fn_name}' must return {ret_ty}"),
                line: ret.span.line,
                col: ret.span.column,
            }),
            (Some(value), ret_ty) => {
                let value_ty = self.infer_expr(value)?;
                if ret_ty == Type::Void {
                    return Err(CompileError::Type {
                        message: format!("void function '{fn_name}' cannot return a value"),
                        line: ret.span.line,
                        col: ret.span.column,
                    });
                }
                if value_ty != ret_ty {
                    return Err(CompileError::Type {
                        message: format!("return type mismatch: expected {ret_ty}, got {value_ty}"),
                        line: ret.span.line,
                        col: ret.span.column,
                    });
                }
                Ok(())
            }
        }
    }

    fn check_loop_ctrl(&self, keyword: &'static str, span: Span) -> Result<(), CompileError> {
        if self.loop_depth == 0 {
            return Err(CompileError::ControlFlow {
                keyword,
                line: span.line,
                col: span.column,
            });
        }
        Ok(())
    }

    fn check_cond(&mut self, cond: &Expr) -> Result<(), CompileError> {
        let ty = self.infer_expr(cond)?;
        if ty != Type::Bool {
            let span = cond.span();
            return Err(CompileError::Type {
                message: format!("condition must be bool, got {ty}"),
                line: span.line,
                col: span.column,
            });
        }
        Ok(())
    }

    /// Infer and validate an expression's type.
    fn infer_expr(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        match expr {
            Expr::IntLit(..) => Ok(Type::Int),
            Expr::FloatLit(..) => Ok(Type::Float),
            Expr::BoolLit(..) => Ok(Type::Bool),
            Expr::ReadInt(_) => Ok(Type::Int),
            Expr::Ident(name, span) => {
                let info = self.resolve_var(*name, *span)?;
                match info.kind {
                    SymbolKind::Func => Err(CompileError::Type {
                        message: format!("'{name}' is a function, not a value"),
                        line: span.line,
                        col: span.column,
                    }),
                    SymbolKind::Array => Err(CompileError::Type {
                        message: format!("array '{name}' used without an index"),
                        line: span.line,
                        col: span.column,
                    }),
                    SymbolKind::Var | SymbolKind::Const => Ok(info.ty),
                }
            }
            Expr::ArrayLoad(load) => {
                let index_ty = self.infer_expr(&load.index)?;
                let info = self.resolve_var(load.name, load.span)?;
                if info.kind != SymbolKind::Array {
                    return Err(CompileError::Type {
                        message: format!("'{}' is not an array", load.name),
                        line: load.span.line,
                        col: load.span.column,
                    });
                }
                let elem_ty = info.ty;
                if index_ty != Type::Int {
                    return Err(CompileError::Type {
                        message: format!("array index must be int, got {index_ty}"),
                        line: load.span.line,
                        col: load.span.column,
                    });
                }
                Ok(elem_ty)
            }
            Expr::Binary(binary) => self.infer_binary(binary),
            Expr::Unary(unary) => self.infer_unary(unary),
            Expr::Call(call) => self.infer_call(call),
            Expr::IncDec(incdec) => self.infer_incdec(incdec),
        }
    }

    fn infer_binary(&mut self, binary: &BinaryExpr) -> Result<Type, CompileError> {
        let left = self.infer_expr(&binary.left)?;
        let right = self.infer_expr(&binary.right)?;
        let (operand_ty, result_ty) = if binary.op.is_logical() {
            (Type::Bool, Type::Bool)
        } else if binary.op.is_comparison() {
            (Type::Int, Type::Bool)
        } else {
            (Type::Int, Type::Int)
        };
        if left != operand_ty || right != operand_ty {
            return Err(CompileError::Type {
                message: format!(
                    "operator '{}' requires {operand_ty} operands, got {left} and {right}",
                    binary.op
                ),
                line: binary.span.line,
                col: binary.span.column,
            });
        }
        Ok(result_ty)
    }

    fn infer_unary(&mut self, unary: &UnaryExpr) -> Result<Type, CompileError> {
        let operand = self.infer_expr(&unary.operand)?;
        let expected = match unary.op {
            UnOp::Neg => Type::Int,
            UnOp::Not => Type::Bool,
        };
        if operand != expected {
            return Err(CompileError::Type {
                message: format!(
                    "operator '{}' requires a {expected} operand, got {operand}",
                    unary.op
                ),
                line: unary.span.line,
                col: unary.span.column,
            });
        }
        Ok(expected)
    }

    fn infer_call(&mut self, call: &CallExpr) -> Result<Type, CompileError> {
        let info = match self.scopes.lookup(call.name) {
            Some(info) => info.clone(),
            None => {
                return Err(CompileError::Name {
                    message: format!("call to undefined function '{}'", call.name),
                    line: call.span.line,
                    col: call.span.column,
                })
            }
        };
        if info.kind != SymbolKind::Func {
            return Err(CompileError::Type {
                message: format!("'{}' is not a function", call.name),
                line: call.span.line,
                col: call.span.column,
            });
        }
        let params = info.params.as_deref().unwrap_or_default();
        if params.len() != call.args.len() {
            return Err(CompileError::Arity {
                name: call.name.as_str().to_string(),
                expected: params.len(),
                got: call.args.len(),
                line: call.span.line,
                col: call.span.column,
            });
        }
        for (i, (arg, &param_ty)) in call.args.iter().zip(params).enumerate() {
            let arg_ty = self.infer_expr(arg)?;
            if arg_ty != param_ty {
                let span = arg.span();
                return Err(CompileError::Type {
                    message: format!(
                        "argument {} of '{}' expects {param_ty}, got {arg_ty}",
                        i + 1,
                        call.name
                    ),
                    line: span.line,
                    col: span.column,
                });
            }
        }
        Ok(info.ty)
    }

    fn infer_incdec(&mut self, incdec: &IncDecExpr) -> Result<Type, CompileError> {
        let op_text = match incdec.op {
            IncDecOp::Inc => "++",
            IncDecOp::Dec => "--",
        };
        let info = self.resolve_var(incdec.name, incdec.span)?;
        match info.kind {
            SymbolKind::Const => Err(CompileError::Name {
                message: format!("cannot assign to const {}", incdec.name),
                line: incdec.span.line,
                col: incdec.span.column,
            }),
            SymbolKind::Var if info.ty == Type::Int => Ok(Type::Int),
            _ => Err(CompileError::Type {
                message: format!("'{op_text}' target must be an int variable"),
                line: incdec.span.line,
                col: incdec.span.column,
            }),
        }
    }

    fn resolve_var(&self, name: Symbol, span: Span) -> Result<SymbolInfo, CompileError> {
        self.scopes
            .lookup(name)
            .cloned()
            .ok_or_else(|| CompileError::Name {
                message: format!("use of undeclared variable '{name}'"),
                line: span.line,
                col: span.column,
            })
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer, boolean, or negated-integer literal.
fn is_const_literal(expr: &Expr) -> bool {
    match expr {
        Expr::IntLit(..) | Expr::BoolLit(..) => true,
        Expr::Unary(unary) => {
            unary.op == UnOp::Neg && matches!(unary.operand, Expr::IntLit(..))
        }
        _ => false,
    }
}

/// Structural return-path analysis.
///
/// A block terminates if any of its statements definitely returns
/// (statements after a `return` are simply dead). An `if` terminates only
/// when both arms do. Loops never count: their bodies may not execute.
fn block_returns(block: &Block) -> bool {
    block.stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(block) => block_returns(block),
        Stmt::If(if_stmt) => match &if_stmt.else_branch {
            Some(else_branch) => stmt_returns(&if_stmt.then_branch) && stmt_returns(else_branch),
            None => false,
        },
        _ => false,
    }
}
