//! Parser core: token stream plumbing.
//!
//! The [`Parser`] owns the token vector and a cursor into it, and exposes
//! the lookahead/expect primitives the grammar modules build on. The
//! grammar itself lives in [`crate::items`] (declarations),
//! [`crate::stmt`] (statements), and [`crate::expr`] (expressions).

use nanoc_lex::{Token, TokenKind};
use nanoc_util::CompileError;

use crate::ast::Program;

/// Parse a full token stream into a [`Program`].
///
/// The stream must be `Eof`-terminated, as produced by
/// [`nanoc_lex::tokenize`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, CompileError> {
    Parser::new(tokens).parse_program()
}

/// Recursive-descent parser with one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(
            tokens.last().map(Token::is_eof).unwrap_or(false),
            "token stream must end with Eof"
        );
        Self { tokens, pos: 0 }
    }

    /// Parse the whole program: a flat declaration list.
    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut decls = Vec::new();
        while !self.peek().is_eof() {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    // -------------------------------------------------------------------
    // Stream primitives
    // -------------------------------------------------------------------

    /// The current token.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// The current token's kind.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Consume and return the current token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// True if the current token has exactly this kind.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Consume the current token if it has this kind.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or fail with a `ParseError`.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&kind.describe()))
        }
    }

    /// Consume an identifier token, returning its symbol.
    pub(crate) fn expect_ident(&mut self) -> Result<(nanoc_util::Symbol, Token), CompileError> {
        match self.peek_kind() {
            TokenKind::Ident(name) => {
                let name = *name;
                Ok((name, self.advance()))
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    /// Build a `ParseError` at the current token.
    pub(crate) fn error_expected(&self, expected: &str) -> CompileError {
        let found = self.peek();
        CompileError::Parse {
            expected: expected.to_string(),
            found: found.kind.describe(),
            line: found.line,
            col: found.col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;
    use nanoc_lex::tokenize;

    fn parse_source(source: &str) -> Result<Program, CompileError> {
        parse(tokenize(source).unwrap())
    }

    #[test]
    fn empty_program() {
        let program = parse_source("").unwrap();
        assert!(program.decls.is_empty());
    }

    #[test]
    fn function_and_global_in_any_order() {
        let program = parse_source(
            "void main() { f(); }\n\
             int g = 3;\n\
             void f() { }",
        )
        .unwrap();
        assert_eq!(program.decls.len(), 3);
        assert!(matches!(program.decls[0], Decl::Func(_)));
        assert!(matches!(program.decls[1], Decl::Global(_)));
        assert!(matches!(program.decls[2], Decl::Func(_)));
    }

    #[test]
    fn first_error_aborts() {
        let err = parse_source("void main() { int ; }").unwrap_err();
        match err {
            CompileError::Parse { expected, found, .. } => {
                assert_eq!(expected, "identifier");
                assert_eq!(found, "';'");
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn error_carries_position() {
        let err = parse_source("void main() {\n  return 1 +; }").unwrap_err();
        match err {
            CompileError::Parse { line, col, .. } => {
                assert_eq!(line, 2);
                assert_eq!(col, 13);
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }
}
