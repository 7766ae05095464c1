//! Declaration parsing: functions, globals, and variable declarations.

use nanoc_lex::TokenKind;
use nanoc_util::{CompileError, Span, Symbol};

use crate::ast::{Block, Decl, FuncDecl, Param, Type, VarDecl};
use crate::parser::Parser;

impl Parser {
    /// `decl := func_decl | global_var_decl`
    ///
    /// Both start with `['const'] type IDENT`; a following `(` makes it a
    /// function definition (which cannot be `const`).
    pub(crate) fn parse_decl(&mut self) -> Result<Decl, CompileError> {
        let start = self.peek().span();
        let is_const = self.eat(&TokenKind::Const);
        let ty = self.parse_type()?;
        let (name, _) = self.expect_ident()?;

        if !is_const && self.check(&TokenKind::LParen) {
            Ok(Decl::Func(self.parse_func_tail(ty, name, start)?))
        } else {
            Ok(Decl::Global(self.parse_var_tail(ty, name, is_const, start)?))
        }
    }

    /// `type := 'int' | 'bool' | 'void'`
    pub(crate) fn parse_type(&mut self) -> Result<Type, CompileError> {
        let ty = match self.peek_kind() {
            TokenKind::Int => Type::Int,
            TokenKind::Bool => Type::Bool,
            TokenKind::Void => Type::Void,
            _ => return Err(self.error_expected("type")),
        };
        self.advance();
        Ok(ty)
    }

    /// True if the current token can begin a variable declaration.
    pub(crate) fn at_decl_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Const | TokenKind::Int | TokenKind::Bool | TokenKind::Void
        )
    }

    /// Rest of `func_decl` after `type IDENT`.
    fn parse_func_tail(
        &mut self,
        ret_ty: Type,
        name: Symbol,
        start: Span,
    ) -> Result<FuncDecl, CompileError> {
        self.expect(&TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_block()?;
        Ok(FuncDecl {
            ret_ty,
            name,
            params,
            body,
            span: start,
        })
    }

    /// `params := param (',' param)*`, or empty if the next token is `)`.
    fn parse_params(&mut self) -> Result<Vec<Param>, CompileError> {
        let mut params = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let span = self.peek().span();
            let ty = self.parse_type()?;
            let (name, _) = self.expect_ident()?;
            params.push(Param { ty, name, span });
            if !self.eat(&TokenKind::Comma) {
                return Ok(params);
            }
        }
    }

    /// Rest of `var_decl` after `['const'] type IDENT`:
    /// `('[' INT ']')? ('=' expr)? ';'`
    pub(crate) fn parse_var_tail(
        &mut self,
        ty: Type,
        name: Symbol,
        is_const: bool,
        start: Span,
    ) -> Result<VarDecl, CompileError> {
        let array_size = if self.eat(&TokenKind::LBracket) {
            let size = match self.peek_kind() {
                TokenKind::IntLit(n) => {
                    let n = *n;
                    self.advance();
                    n as usize
                }
                _ => return Err(self.error_expected("integer literal array size")),
            };
            self.expect(&TokenKind::RBracket)?;
            Some(size)
        } else {
            None
        };

        let init = if self.eat(&TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(&TokenKind::Semicolon)?;
        Ok(VarDecl {
            ty,
            name,
            is_const,
            array_size,
            init,
            span: start,
        })
    }

    /// `block := '{' stmt* '}'`
    pub(crate) fn parse_block(&mut self) -> Result<Block, CompileError> {
        let span = self.expect(&TokenKind::LBrace)?.span();
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.peek().is_eof() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Block { stmts, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use nanoc_lex::tokenize;

    fn parse_one(source: &str) -> Decl {
        let mut program = parse(tokenize(source).unwrap()).unwrap();
        assert_eq!(program.decls.len(), 1);
        program.decls.remove(0)
    }

    #[test]
    fn function_with_params() {
        let decl = parse_one("int max(int a, int b) { return a; }");
        let Decl::Func(func) = decl else {
            panic!("expected function");
        };
        assert_eq!(func.ret_ty, Type::Int);
        assert_eq!(func.name.as_str(), "max");
        assert_eq!(func.params.len(), 2);
        assert_eq!(func.params[1].name.as_str(), "b");
    }

    #[test]
    fn const_global() {
        let decl = parse_one("const int M = 5;");
        let Decl::Global(var) = decl else {
            panic!("expected global");
        };
        assert!(var.is_const);
        assert_eq!(var.ty, Type::Int);
        assert!(var.init.is_some());
        assert!(var.array_size.is_none());
    }

    #[test]
    fn array_declaration() {
        let decl = parse_one("int a[5];");
        let Decl::Global(var) = decl else {
            panic!("expected global");
        };
        assert_eq!(var.array_size, Some(5));
        assert!(var.init.is_none());
    }

    #[test]
    fn array_size_must_be_literal() {
        let err = parse(tokenize("int a[n];").unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn const_function_is_rejected() {
        // `const` can only head a variable declaration, so the `(` after the
        // name is a parse error.
        let err = parse(tokenize("const int f() { }").unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }
}
