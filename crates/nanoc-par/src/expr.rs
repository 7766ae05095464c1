//! Expression parsing with Pratt-style precedence climbing.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `\|\|` | Left |
//! | 2 | `&&` | Left |
//! | 3 | `==`, `!=` | Left |
//! | 4 | `<`, `<=`, `>`, `>=` | Left |
//! | 5 | `+`, `-` | Left |
//! | 6 | `*`, `/`, `%` | Left |
//!
//! Unary (`! - ++ --`) binds tighter than any binary operator; postfix
//! (`++ --`, call, index) tighter still. All binary operators are
//! left-associative, so every right binding power is `left + 1`.

use nanoc_lex::TokenKind;
use nanoc_util::CompileError;

use crate::ast::{
    ArrayLoadExpr, BinOp, BinaryExpr, CallExpr, Expr, IncDecExpr, IncDecOp, UnOp, UnaryExpr,
};
use crate::parser::Parser;

/// Binding power levels. Higher numbers bind tighter.
pub mod bp {
    /// Start of an expression.
    pub const MIN: u8 = 0;
    /// `||`
    pub const LOGICAL_OR: u8 = 2;
    /// `&&`
    pub const LOGICAL_AND: u8 = 4;
    /// `==`, `!=`
    pub const EQUALITY: u8 = 6;
    /// `<`, `<=`, `>`, `>=`
    pub const RELATIONAL: u8 = 8;
    /// `+`, `-`
    pub const ADDITIVE: u8 = 10;
    /// `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 12;
}

impl Parser {
    /// Parse a complete expression.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, CompileError> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Pratt core: parse an expression consuming only operators whose left
    /// binding power is at least `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, CompileError> {
        let mut lhs = self.parse_unary()?;

        while let Some((l_bp, op)) = infix_binding_power(self.peek_kind()) {
            if l_bp < min_bp {
                break;
            }
            self.advance();
            // Left-associative: the right side excludes operators at the
            // same level.
            let rhs = self.parse_expr_bp(l_bp + 1)?;
            let span = lhs.span();
            lhs = Expr::Binary(Box::new(BinaryExpr {
                op,
                left: lhs,
                right: rhs,
                span,
            }));
        }

        Ok(lhs)
    }

    /// Prefix operators: `!`, unary `-`, `++`, `--`.
    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.peek_kind() {
            TokenKind::Not => {
                let span = self.advance().span();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(Box::new(UnaryExpr {
                    op: UnOp::Not,
                    operand,
                    span,
                })))
            }
            TokenKind::Minus => {
                let span = self.advance().span();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(Box::new(UnaryExpr {
                    op: UnOp::Neg,
                    operand,
                    span,
                })))
            }
            TokenKind::PlusPlus => self.parse_prefix_incdec(IncDecOp::Inc),
            TokenKind::MinusMinus => self.parse_prefix_incdec(IncDecOp::Dec),
            _ => self.parse_postfix(),
        }
    }

    fn parse_prefix_incdec(&mut self, op: IncDecOp) -> Result<Expr, CompileError> {
        let op_tok = self.advance();
        let operand = self.parse_unary()?;
        match operand {
            Expr::Ident(name, _) => Ok(Expr::IncDec(Box::new(IncDecExpr {
                op,
                prefix: true,
                name,
                span: op_tok.span(),
            }))),
            _ => Err(CompileError::Parse {
                expected: "variable after prefix increment/decrement".into(),
                found: op_tok.kind.describe(),
                line: op_tok.line,
                col: op_tok.col,
            }),
        }
    }

    /// Postfix `++`/`--` after a primary expression.
    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::PlusPlus => IncDecOp::Inc,
                TokenKind::MinusMinus => IncDecOp::Dec,
                _ => return Ok(expr),
            };
            let op_tok = self.advance();
            expr = match expr {
                Expr::Ident(name, span) => Expr::IncDec(Box::new(IncDecExpr {
                    op,
                    prefix: false,
                    name,
                    span,
                })),
                _ => {
                    return Err(CompileError::Parse {
                        expected: "variable before postfix increment/decrement".into(),
                        found: op_tok.kind.describe(),
                        line: op_tok.line,
                        col: op_tok.col,
                    })
                }
            };
        }
    }

    /// Atoms: literals, identifiers (with call/index suffix), `readInt()`,
    /// parenthesized expressions.
    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.peek_kind().clone() {
            TokenKind::IntLit(value) => {
                let span = self.advance().span();
                Ok(Expr::IntLit(value, span))
            }
            TokenKind::FloatLit(value) => {
                let span = self.advance().span();
                Ok(Expr::FloatLit(value, span))
            }
            TokenKind::True => {
                let span = self.advance().span();
                Ok(Expr::BoolLit(true, span))
            }
            TokenKind::False => {
                let span = self.advance().span();
                Ok(Expr::BoolLit(false, span))
            }
            TokenKind::ReadInt => {
                let span = self.advance().span();
                self.expect(&TokenKind::LParen)?;
                self.expect(&TokenKind::RParen)?;
                Ok(Expr::ReadInt(span))
            }
            TokenKind::Ident(name) => {
                let span = self.advance().span();
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    self.expect(&TokenKind::RParen)?;
                    Ok(Expr::Call(Box::new(CallExpr { name, args, span })))
                } else if self.eat(&TokenKind::LBracket) {
                    let index = self.parse_expr()?;
                    self.expect(&TokenKind::RBracket)?;
                    Ok(Expr::ArrayLoad(Box::new(ArrayLoadExpr {
                        name,
                        index,
                        span,
                    })))
                } else {
                    Ok(Expr::Ident(name, span))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error_expected("expression")),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                return Ok(args);
            }
        }
    }
}

/// Left binding power and operator for an infix token.
fn infix_binding_power(kind: &TokenKind) -> Option<(u8, BinOp)> {
    let entry = match kind {
        TokenKind::OrOr => (bp::LOGICAL_OR, BinOp::Or),
        TokenKind::AndAnd => (bp::LOGICAL_AND, BinOp::And),
        TokenKind::EqEq => (bp::EQUALITY, BinOp::Eq),
        TokenKind::NotEq => (bp::EQUALITY, BinOp::Ne),
        TokenKind::Lt => (bp::RELATIONAL, BinOp::Lt),
        TokenKind::LtEq => (bp::RELATIONAL, BinOp::Le),
        TokenKind::Gt => (bp::RELATIONAL, BinOp::Gt),
        TokenKind::GtEq => (bp::RELATIONAL, BinOp::Ge),
        TokenKind::Plus => (bp::ADDITIVE, BinOp::Add),
        TokenKind::Minus => (bp::ADDITIVE, BinOp::Sub),
        TokenKind::Star => (bp::MULTIPLICATIVE, BinOp::Mul),
        TokenKind::Slash => (bp::MULTIPLICATIVE, BinOp::Div),
        TokenKind::Percent => (bp::MULTIPLICATIVE, BinOp::Rem),
        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_lex::tokenize;
    use nanoc_util::Symbol;

    /// Parse a single expression by wrapping it in a print statement.
    fn parse_expr_source(source: &str) -> Expr {
        let wrapped = format!("void f() {{ print({source}); }}");
        let program = crate::parse(tokenize(&wrapped).unwrap()).unwrap();
        let crate::ast::Decl::Func(func) = program.decls.into_iter().next().unwrap() else {
            panic!("expected function");
        };
        match func.body.stmts.into_iter().next().unwrap() {
            crate::ast::Stmt::Print(p) => p.expr,
            other => panic!("expected print statement, got {other:?}"),
        }
    }

    fn assert_binary(expr: &Expr, op: BinOp) -> (&Expr, &Expr) {
        match expr {
            Expr::Binary(b) => {
                assert_eq!(b.op, op, "expected operator {op:?}");
                (&b.left, &b.right)
            }
            _ => panic!("expected binary expression, got {expr:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        // a + b * c  =>  a + (b * c)
        let expr = parse_expr_source("a + b * c");
        let (_, right) = assert_binary(&expr, BinOp::Add);
        assert_binary(right, BinOp::Mul);
    }

    #[test]
    fn left_associativity() {
        // a - b - c  =>  (a - b) - c
        let expr = parse_expr_source("a - b - c");
        let (left, _) = assert_binary(&expr, BinOp::Sub);
        assert_binary(left, BinOp::Sub);
    }

    #[test]
    fn logical_below_comparison() {
        // a && b == c || d  =>  (a && (b == c)) || d
        let expr = parse_expr_source("a && b == c || d");
        let (left, _) = assert_binary(&expr, BinOp::Or);
        let (_, and_right) = assert_binary(left, BinOp::And);
        assert_binary(and_right, BinOp::Eq);
    }

    #[test]
    fn parentheses_override() {
        // (a + b) * c
        let expr = parse_expr_source("(a + b) * c");
        let (left, _) = assert_binary(&expr, BinOp::Mul);
        assert_binary(left, BinOp::Add);
    }

    #[test]
    fn unary_chains() {
        let expr = parse_expr_source("!-x");
        let Expr::Unary(not) = &expr else {
            panic!("expected unary");
        };
        assert_eq!(not.op, UnOp::Not);
        let Expr::Unary(neg) = &not.operand else {
            panic!("expected nested unary");
        };
        assert_eq!(neg.op, UnOp::Neg);
    }

    #[test]
    fn prefix_and_postfix_incdec() {
        let pre = parse_expr_source("++i");
        assert!(
            matches!(&pre, Expr::IncDec(e) if e.prefix && e.op == IncDecOp::Inc && e.name.as_str() == "i")
        );
        let post = parse_expr_source("i--");
        assert!(
            matches!(&post, Expr::IncDec(e) if !e.prefix && e.op == IncDecOp::Dec && e.name.as_str() == "i")
        );
    }

    #[test]
    fn prefix_incdec_requires_variable() {
        let wrapped = "void f() { print(++3); }";
        let err = crate::parse(tokenize(wrapped).unwrap()).unwrap_err();
        assert!(matches!(err, CompileError::Parse { .. }));
    }

    #[test]
    fn call_and_index() {
        let call = parse_expr_source("f(1, g(2), x)");
        let Expr::Call(call) = &call else {
            panic!("expected call");
        };
        assert_eq!(call.name.as_str(), "f");
        assert_eq!(call.args.len(), 3);
        assert!(matches!(&call.args[1], Expr::Call(_)));

        let load = parse_expr_source("a[i + 1]");
        let Expr::ArrayLoad(load) = &load else {
            panic!("expected array load");
        };
        assert_eq!(load.name, Symbol::intern("a"));
        assert!(matches!(&load.index, Expr::Binary(_)));
    }

    #[test]
    fn readint_is_nullary() {
        let expr = parse_expr_source("readInt()");
        assert!(matches!(expr, Expr::ReadInt(_)));
    }

    #[test]
    fn incdec_in_larger_expression() {
        // i++ * 2  =>  (i++) * 2
        let expr = parse_expr_source("i++ * 2");
        let (left, _) = assert_binary(&expr, BinOp::Mul);
        assert!(matches!(left, Expr::IncDec(_)));
    }
}
