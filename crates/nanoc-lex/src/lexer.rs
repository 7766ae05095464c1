//! The NanoC scanner.
//!
//! Direct-coded lexer: `next_token` skips insignificant characters, records
//! the token start, then dispatches on the first character to a `lex_*`
//! helper. Two-character operators are matched before their one-character
//! prefixes (longest match).

use nanoc_util::{CompileError, Symbol};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenKind};

/// Scan an entire source string into a token vector terminated by `Eof`.
///
/// # Example
///
/// ```
/// use nanoc_lex::{tokenize, TokenKind};
///
/// let tokens = tokenize("int x = 42;").unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Int);
/// assert_eq!(tokens[3].kind, TokenKind::IntLit(42));
/// assert!(tokens.last().unwrap().is_eof());
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.is_eof();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// The lexer state machine.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    /// Byte offset where the current token starts.
    token_start: usize,
    /// Line of the current token's first character.
    token_line: u32,
    /// Column of the current token's first character.
    token_col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
            token_line: 1,
            token_col: 1,
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace_and_comments();

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();
        self.token_col = self.cursor.column();

        if self.cursor.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, "", self.token_line, self.token_col));
        }

        match self.cursor.current_char() {
            ';' => Ok(self.single(TokenKind::Semicolon)),
            ',' => Ok(self.single(TokenKind::Comma)),
            '(' => Ok(self.single(TokenKind::LParen)),
            ')' => Ok(self.single(TokenKind::RParen)),
            '{' => Ok(self.single(TokenKind::LBrace)),
            '}' => Ok(self.single(TokenKind::RBrace)),
            '[' => Ok(self.single(TokenKind::LBracket)),
            ']' => Ok(self.single(TokenKind::RBracket)),
            '*' => Ok(self.single(TokenKind::Star)),
            '/' => Ok(self.single(TokenKind::Slash)),
            '%' => Ok(self.single(TokenKind::Percent)),

            '+' => Ok(self.one_or_two('+', TokenKind::PlusPlus, TokenKind::Plus)),
            '-' => Ok(self.one_or_two('-', TokenKind::MinusMinus, TokenKind::Minus)),
            '=' => Ok(self.one_or_two('=', TokenKind::EqEq, TokenKind::Assign)),
            '!' => Ok(self.one_or_two('=', TokenKind::NotEq, TokenKind::Not)),
            '<' => Ok(self.one_or_two('=', TokenKind::LtEq, TokenKind::Lt)),
            '>' => Ok(self.one_or_two('=', TokenKind::GtEq, TokenKind::Gt)),

            '&' => self.pair_only('&', TokenKind::AndAnd),
            '|' => self.pair_only('|', TokenKind::OrOr),

            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.lex_identifier()),

            c => Err(CompileError::Lex {
                ch: c,
                line: self.token_line,
                col: self.token_col,
            }),
        }
    }

    /// Emit a one-character token.
    fn single(&mut self, kind: TokenKind) -> Token {
        self.cursor.advance();
        self.finish(kind)
    }

    /// Emit a two-character token if `second` follows, else the one-character
    /// fallback.
    fn one_or_two(&mut self, second: char, double: TokenKind, fallback: TokenKind) -> Token {
        self.cursor.advance();
        if self.cursor.eat(second) {
            self.finish(double)
        } else {
            self.finish(fallback)
        }
    }

    /// `&` and `|` only exist doubled; a lone one is a lex error.
    fn pair_only(&mut self, second: char, kind: TokenKind) -> Result<Token, CompileError> {
        let first = self.cursor.current_char();
        self.cursor.advance();
        if self.cursor.eat(second) {
            Ok(self.finish(kind))
        } else {
            Err(CompileError::Lex {
                ch: first,
                line: self.token_line,
                col: self.token_col,
            })
        }
    }

    /// Identifier or keyword: `[A-Za-z_][A-Za-z0-9_]*`.
    fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);
        let kind =
            keyword_from_ident(text).unwrap_or_else(|| TokenKind::Ident(Symbol::intern(text)));
        self.finish(kind)
    }

    /// Integer or float literal.
    ///
    /// Base-10 only; leading zeros are permitted and do not mean octal.
    /// `digits '.' digits` scans as a float (floats are parsed but never
    /// lowered). A literal too large for i64 is rejected where it starts.
    fn lex_number(&mut self) -> Result<Token, CompileError> {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        if self.cursor.current_char() == '.' && self.cursor.peek_char(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
            let text = self.cursor.slice_from(self.token_start);
            let value = text.parse::<f64>().map_err(|_| CompileError::Lex {
                ch: text.chars().next().unwrap_or('0'),
                line: self.token_line,
                col: self.token_col,
            })?;
            return Ok(self.finish(TokenKind::FloatLit(value)));
        }

        let text = self.cursor.slice_from(self.token_start);
        // Oversized literals surface as a lex failure at their first digit.
        let value = text.parse::<i64>().map_err(|_| CompileError::Lex {
            ch: text.chars().next().unwrap_or('0'),
            line: self.token_line,
            col: self.token_col,
        })?;
        Ok(self.finish(TokenKind::IntLit(value)))
    }

    /// Skip whitespace and `//` line comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.cursor.current_char();
            if c.is_whitespace() {
                self.cursor.advance();
            } else if c == '/' && self.cursor.peek_char(1) == '/' {
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
            } else {
                return;
            }
        }
    }

    fn finish(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            self.cursor.slice_from(self.token_start),
            self.token_line,
            self.token_col,
        )
    }
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            kinds("int x = 42;"),
            vec![
                TokenKind::Int,
                TokenKind::Ident(Symbol::intern("x")),
                TokenKind::Assign,
                TokenKind::IntLit(42),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn longest_match_wins() {
        assert_eq!(
            kinds("<= < == = ++ + -- -"),
            vec![
                TokenKind::LtEq,
                TokenKind::Lt,
                TokenKind::EqEq,
                TokenKind::Assign,
                TokenKind::PlusPlus,
                TokenKind::Plus,
                TokenKind::MinusMinus,
                TokenKind::Minus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn adjacent_operators_without_spaces() {
        // `x<=y` must not scan as `x`, `<`, `=`, `y`.
        assert_eq!(
            kinds("x<=y"),
            vec![
                TokenKind::Ident(Symbol::intern("x")),
                TokenKind::LtEq,
                TokenKind::Ident(Symbol::intern("y")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comments_vanish() {
        assert_eq!(
            kinds("a // the rest is noise ;;;\nb"),
            vec![
                TokenKind::Ident(Symbol::intern("a")),
                TokenKind::Ident(Symbol::intern("b")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn leading_zeros_are_decimal() {
        assert_eq!(kinds("007"), vec![TokenKind::IntLit(7), TokenKind::Eof]);
    }

    #[test]
    fn float_literal_scans() {
        assert_eq!(
            kinds("3.14"),
            vec![TokenKind::FloatLit(3.14), TokenKind::Eof]
        );
        // A dot not followed by a digit is not part of the number, and NanoC
        // has no '.' token, so this must fail on the dot itself.
        let err = tokenize("3.").unwrap_err();
        assert_eq!(
            err,
            CompileError::Lex {
                ch: '.',
                line: 1,
                col: 2
            }
        );
    }

    #[test]
    fn positions_are_tracked() {
        let tokens = tokenize("int\n  x").unwrap();
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (2, 3));
    }

    #[test]
    fn unknown_character_fails() {
        let err = tokenize("int $x;").unwrap_err();
        assert_eq!(
            err,
            CompileError::Lex {
                ch: '$',
                line: 1,
                col: 5
            }
        );
        assert_eq!(
            err.to_string(),
            "LexError: unexpected character '$' at line 1, col 5"
        );
    }

    #[test]
    fn lone_ampersand_fails() {
        let err = tokenize("a & b").unwrap_err();
        assert_eq!(
            err,
            CompileError::Lex {
                ch: '&',
                line: 1,
                col: 3
            }
        );
    }

    #[test]
    fn lexeme_fidelity() {
        // Re-concatenating lexemes with the original whitespace stripped
        // reproduces the source without whitespace.
        let source = "void main() { print(1+2); }";
        let tokens = tokenize(source).unwrap();
        let rebuilt: String = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        let stripped: String = source.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(rebuilt, stripped);
    }

    #[test]
    fn oversized_literal_is_rejected() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert!(matches!(err, CompileError::Lex { ch: '9', .. }));
    }
}
