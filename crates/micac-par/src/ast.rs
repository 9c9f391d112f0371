//! AST node definitions.
//!
//! The semantic analyzer writes the `ty`, `storage`, and `scope_id`
//! annotation slots exactly once; downstream phases read them and treat a
//! missing annotation as an internal error.

use std::fmt;

use micac_util::{Span, Symbol};

/// A type in the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ty {
    /// 32-bit signed integer
    Int,
    /// Byte-sized boolean, 0 or 1
    Bool,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => f.write_str("int"),
            Ty::Bool => f.write_str("bool"),
        }
    }
}

/// Where an identifier's home location lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// A `.data` section symbol
    Global,
    /// A stack slot in the enclosing frame
    Local,
    /// A caller-provided argument slot
    Param,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Storage::Global => f.write_str("global"),
            Storage::Local => f.write_str("local"),
            Storage::Param => f.write_str("param"),
        }
    }
}

/// AST root.
#[derive(Debug, Clone)]
pub struct Program {
    pub declarations: Vec<Decl>,
}

/// Top-level declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    Function(FunctionDef),
    Stmt(Stmt),
}

/// Function definition.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub return_ty: Ty,
    pub name: Symbol,
    pub params: Vec<ParamDecl>,
    pub body: Scope,
    pub span: Span,
}

/// A single `TYPE IDENT` parameter.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub ty: Ty,
    pub name: Symbol,
    pub span: Span,
    pub scope_id: Option<u32>,
}

/// Braced statement list.
#[derive(Debug, Clone)]
pub struct Scope {
    pub statements: Vec<Stmt>,
}

/// Statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    Definer(Definer),
    Equalize(Equalize),
    If(IfStmt),
    While(WhileStmt),
    Print(PrintStmt),
    Scope(Scope),
    Return(ReturnStmt),
    Call(CallExpr),
}

/// `var TYPE name [= expr];`
#[derive(Debug, Clone)]
pub struct Definer {
    pub name: Symbol,
    pub ty: Ty,
    pub value: Option<Expr>,
    pub span: Span,
    pub storage: Option<Storage>,
    pub scope_id: Option<u32>,
}

/// `name = expr;`
#[derive(Debug, Clone)]
pub struct Equalize {
    pub name: Symbol,
    pub value: Expr,
    pub span: Span,
    pub ty: Option<Ty>,
    pub storage: Option<Storage>,
    pub scope_id: Option<u32>,
}

/// `if condition do { ... }`
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub scope: Scope,
}

/// `while condition do { ... }`
#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub scope: Scope,
}

/// `print(expr);`
#[derive(Debug, Clone)]
pub struct PrintStmt {
    pub expression: Expr,
}

/// `return expr;`
#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub expression: Expr,
    pub span: Span,
}

/// Expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Binary(Box<BinaryExpr>),
    Condition(Box<ConditionExpr>),
    Factor(Factor),
    Call(CallExpr),
}

impl Expr {
    /// Inferred type, available after semantic analysis.
    pub fn ty(&self) -> Option<Ty> {
        match self {
            Expr::Binary(b) => b.ty,
            Expr::Condition(c) => c.ty,
            Expr::Factor(f) => f.ty,
            Expr::Call(c) => c.ty,
        }
    }
}

/// Arithmetic operator of an expression or term production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        };
        f.write_str(s)
    }
}

/// Comparison or logical operator of a condition production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl CondOp {
    /// True for `&` and `|`.
    pub fn is_logical(self) -> bool {
        matches!(self, CondOp::And | CondOp::Or)
    }
}

impl fmt::Display for CondOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CondOp::Lt => "<",
            CondOp::Gt => ">",
            CondOp::Le => "<=",
            CondOp::Ge => ">=",
            CondOp::Eq => "==",
            CondOp::Ne => "!=",
            CondOp::And => "&",
            CondOp::Or => "|",
        };
        f.write_str(s)
    }
}

/// `left (+|-|*|/) right`; always `int` after semantic analysis.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Expr,
    pub op: ArithOp,
    pub right: Expr,
    pub span: Span,
    pub ty: Option<Ty>,
}

/// `left (cond_op|logic_op) right`; always `bool` after semantic analysis.
#[derive(Debug, Clone)]
pub struct ConditionExpr {
    pub left: Expr,
    pub op: CondOp,
    pub right: Expr,
    pub span: Span,
    pub ty: Option<Ty>,
}

/// `name(arg, ...)` either as an expression or a statement.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
    pub ty: Option<Ty>,
}

/// Leaf: identifier, integer literal, or boolean literal.
#[derive(Debug, Clone)]
pub struct Factor {
    pub kind: FactorKind,
    pub span: Span,
    pub ty: Option<Ty>,
    pub storage: Option<Storage>,
    pub scope_id: Option<u32>,
}

/// What a factor leaf holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactorKind {
    /// Identifier reference
    Var(Symbol),
    /// Integer literal, kept as source text until TAC generation
    /// range-checks it
    Int(String),
    /// Boolean literal
    Bool(bool),
}

impl Factor {
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, FactorKind::Var(_))
    }
}
