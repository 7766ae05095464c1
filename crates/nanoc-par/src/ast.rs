//! AST node definitions.
//!
//! The tree is a closed tagged sum: one enum per syntactic category, one
//! struct per node kind, pattern-matched exhaustively by every later pass.
//! Every node carries a [`Span`] so diagnostics in any pass can point back
//! at source.

use nanoc_util::{Span, Symbol};

/// A NanoC type.
///
/// `Float` exists only because float literals are scanned and parsed; no
/// declaration syntax produces it and no backend lowers it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Void,
    Float,
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("bool"),
            Type::Void => f.write_str("void"),
            Type::Float => f.write_str("float"),
        }
    }
}

/// AST root: a flat list of top-level declarations.
///
/// No ordering constraint exists between function definitions; the semantic
/// analyzer hoists all signatures before walking any body.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

/// Top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Decl {
    Func(FuncDecl),
    Global(VarDecl),
}

/// Function definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FuncDecl {
    pub ret_ty: Type,
    pub name: Symbol,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// Function parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: Type,
    pub name: Symbol,
    pub span: Span,
}

/// Variable declaration, local or global.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    pub ty: Type,
    pub name: Symbol,
    pub is_const: bool,
    /// `Some(n)` for `int a[n];`.
    pub array_size: Option<usize>,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Brace-delimited statement list.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// Statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    VarDecl(VarDecl),
    Block(Block),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Break(Span),
    Continue(Span),
    Expr(Expr),
    Print(PrintStmt),
    Assign(AssignStmt),
    ArrayStore(ArrayStoreStmt),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

/// `for` header clauses are all optional; the init and update slots accept
/// the simple-statement forms (expression or assignment).
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub update: Option<Box<Stmt>>,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrintStmt {
    pub expr: Expr,
    pub span: Span,
}

/// `name = value;`
#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt {
    pub name: Symbol,
    pub value: Expr,
    pub span: Span,
}

/// `name[index] = value;`
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayStoreStmt {
    pub name: Symbol,
    pub index: Expr,
    pub value: Expr,
    pub span: Span,
}

/// Expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    IntLit(i64, Span),
    FloatLit(f64, Span),
    BoolLit(bool, Span),
    Ident(Symbol, Span),
    ArrayLoad(Box<ArrayLoadExpr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Call(Box<CallExpr>),
    ReadInt(Span),
    IncDec(Box<IncDecExpr>),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit(_, span)
            | Expr::FloatLit(_, span)
            | Expr::BoolLit(_, span)
            | Expr::Ident(_, span)
            | Expr::ReadInt(span) => *span,
            Expr::ArrayLoad(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::IncDec(e) => e.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayLoadExpr {
    pub name: Symbol,
    pub index: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub left: Expr,
    pub right: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallExpr {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// `++x`, `--x`, `x++`, `x--`. The target is restricted to a plain variable.
#[derive(Clone, Debug, PartialEq)]
pub struct IncDecExpr {
    pub op: IncDecOp,
    pub prefix: bool,
    pub name: Symbol,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}

/// Binary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Arithmetic operators take and produce `int`.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    /// Comparison operators take `int` and produce `bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Logical operators take and produce `bool`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(text)
    }
}

/// Unary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => f.write_str("-"),
            UnOp::Not => f.write_str("!"),
        }
    }
}
