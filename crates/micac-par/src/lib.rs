//! micac-par - AST and Recursive-Descent Parser
//!
//! Consumes the token stream from `micac-lex` and produces the AST. No
//! backtracking: every production commits after at most one token of
//! lookahead. Syntax errors carry the row/column of the offending token.

pub mod ast;
pub mod cursor;
pub mod dump;
pub mod error;
pub mod parser;

pub use ast::{
    ArithOp, BinaryExpr, CallExpr, CondOp, ConditionExpr, Decl, Definer, Equalize, Expr, Factor,
    FactorKind, FunctionDef, IfStmt, ParamDecl, PrintStmt, Program, ReturnStmt, Scope, Stmt,
    Storage, Ty, WhileStmt,
};
pub use dump::dump_program;
pub use error::ParseError;
pub use parser::{parse, Parser};
