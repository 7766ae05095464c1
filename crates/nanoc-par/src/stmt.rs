//! Statement parsing.

use nanoc_lex::TokenKind;
use nanoc_util::CompileError;

use crate::ast::{
    ArrayStoreStmt, AssignStmt, Expr, ForStmt, IfStmt, PrintStmt, ReturnStmt, Stmt, WhileStmt,
};
use crate::parser::Parser;

impl Parser {
    /// `stmt := var_decl | block | if | while | for | return | break ';'
    ///        | continue ';' | print_stmt | expr_stmt`
    pub(crate) fn parse_stmt(&mut self) -> Result<Stmt, CompileError> {
        if self.at_decl_start() {
            return self.parse_local_decl();
        }
        match self.peek_kind() {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                let span = self.advance().span();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Stmt::Break(span))
            }
            TokenKind::Continue => {
                let span = self.advance().span();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Stmt::Continue(span))
            }
            TokenKind::Print => self.parse_print(),
            _ => self.parse_simple_stmt(true),
        }
    }

    fn parse_local_decl(&mut self) -> Result<Stmt, CompileError> {
        let start = self.peek().span();
        let is_const = self.eat(&TokenKind::Const);
        let ty = self.parse_type()?;
        let (name, _) = self.expect_ident()?;
        Ok(Stmt::VarDecl(self.parse_var_tail(
            ty, name, is_const, start,
        )?))
    }

    /// `if := 'if' '(' expr ')' stmt ('else' stmt)?`
    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        let span = self.expect(&TokenKind::If)?.span();
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If(IfStmt {
            cond,
            then_branch,
            else_branch,
            span,
        }))
    }

    /// `while := 'while' '(' expr ')' stmt`
    fn parse_while(&mut self) -> Result<Stmt, CompileError> {
        let span = self.expect(&TokenKind::While)?.span();
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(WhileStmt { cond, body, span }))
    }

    /// `for := 'for' '(' (var_decl | expr_stmt | ';') expr? ';' expr? ')' stmt`
    ///
    /// The init and update slots accept assignment statements as well as
    /// bare expressions.
    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        let span = self.expect(&TokenKind::For)?.span();
        self.expect(&TokenKind::LParen)?;

        let init = if self.eat(&TokenKind::Semicolon) {
            None
        } else if self.at_decl_start() {
            // parse_local_decl consumes the trailing ';'.
            Some(Box::new(self.parse_local_decl()?))
        } else {
            Some(Box::new(self.parse_simple_stmt(true)?))
        };

        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt(false)?))
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::For(ForStmt {
            init,
            cond,
            update,
            body,
            span,
        }))
    }

    /// `return := 'return' expr? ';'`
    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let span = self.expect(&TokenKind::Return)?.span();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `print_stmt := 'print' '(' expr ')' ';'`
    fn parse_print(&mut self) -> Result<Stmt, CompileError> {
        let span = self.expect(&TokenKind::Print)?.span();
        self.expect(&TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Semicolon)?;
        Ok(Stmt::Print(PrintStmt { expr, span }))
    }

    /// Expression statement or assignment.
    ///
    /// Assignment is a statement, not an expression: after parsing an
    /// expression, a following `=` turns an identifier target into
    /// [`AssignStmt`] and an index target into [`ArrayStoreStmt`].
    pub(crate) fn parse_simple_stmt(
        &mut self,
        require_semicolon: bool,
    ) -> Result<Stmt, CompileError> {
        let target = self.parse_expr()?;

        let stmt = if self.check(&TokenKind::Assign) {
            let assign_tok = self.advance();
            let value = self.parse_expr()?;
            match target {
                Expr::Ident(name, span) => Stmt::Assign(AssignStmt { name, value, span }),
                Expr::ArrayLoad(load) => Stmt::ArrayStore(ArrayStoreStmt {
                    name: load.name,
                    index: load.index,
                    value,
                    span: load.span,
                }),
                _ => {
                    return Err(CompileError::Parse {
                        expected: "assignable target".into(),
                        found: "'='".into(),
                        line: assign_tok.line,
                        col: assign_tok.col,
                    })
                }
            }
        } else {
            Stmt::Expr(target)
        };

        if require_semicolon {
            self.expect(&TokenKind::Semicolon)?;
        }
        Ok(stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Decl};
    use crate::parse;
    use nanoc_lex::tokenize;

    fn body_of(source: &str) -> Block {
        let program = parse(tokenize(source).unwrap()).unwrap();
        match program.decls.into_iter().next().unwrap() {
            Decl::Func(func) => func.body,
            Decl::Global(_) => panic!("expected function"),
        }
    }

    #[test]
    fn dangling_else_binds_inner() {
        let body = body_of("void f() { if (a) if (b) print(1); else print(2); }");
        let Stmt::If(outer) = &body.stmts[0] else {
            panic!("expected if");
        };
        assert!(outer.else_branch.is_none());
        let Stmt::If(inner) = outer.then_branch.as_ref() else {
            panic!("expected nested if");
        };
        assert!(inner.else_branch.is_some());
    }

    #[test]
    fn for_with_all_clauses() {
        let body = body_of("void f() { for (int i = 0; i < 10; ++i) print(i); }");
        let Stmt::For(for_stmt) = &body.stmts[0] else {
            panic!("expected for");
        };
        assert!(matches!(for_stmt.init.as_deref(), Some(Stmt::VarDecl(_))));
        assert!(for_stmt.cond.is_some());
        assert!(matches!(for_stmt.update.as_deref(), Some(Stmt::Expr(_))));
    }

    #[test]
    fn for_with_empty_clauses() {
        let body = body_of("void f() { for (;;) break; }");
        let Stmt::For(for_stmt) = &body.stmts[0] else {
            panic!("expected for");
        };
        assert!(for_stmt.init.is_none());
        assert!(for_stmt.cond.is_none());
        assert!(for_stmt.update.is_none());
    }

    #[test]
    fn assignment_forms() {
        let body = body_of("void f() { x = 1; a[2] = 3; }");
        assert!(matches!(&body.stmts[0], Stmt::Assign(a) if a.name.as_str() == "x"));
        assert!(matches!(&body.stmts[1], Stmt::ArrayStore(s) if s.name.as_str() == "a"));
    }

    #[test]
    fn assignment_needs_assignable_target() {
        let err = parse(tokenize("void f() { 1 = 2; }").unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { expected, .. } if expected == "assignable target"));
    }

    #[test]
    fn assignment_update_in_for() {
        let body = body_of("void f() { for (i = 0; i < 3; i = i + 1) print(i); }");
        let Stmt::For(for_stmt) = &body.stmts[0] else {
            panic!("expected for");
        };
        assert!(matches!(for_stmt.init.as_deref(), Some(Stmt::Assign(_))));
        assert!(matches!(for_stmt.update.as_deref(), Some(Stmt::Assign(_))));
    }
}
