//! nanoc-lex - Lexical analysis for NanoC.
//!
//! Transforms UTF-8 source text into a stream of [`Token`]s. The scanner is
//! a single-pass, direct-coded state machine: one character of lookahead for
//! classification, two for the double-character operators (`==`, `&&`, `++`,
//! …). The first unrecognized character aborts lexing with a `LexError`.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, Token, TokenKind};
