//! Three-address code.
//!
//! Operands are small `Copy` values; `Var` identity is the full
//! `(name, ty, storage, scope_id)` tuple so identically named locals in
//! sibling scopes stay distinct, and `Temp` identity is `(id, ty)`.
//! Instructions are one variant per opcode; `Display` renders the
//! classic `(op, arg1, arg2, result)` tuple form for `--print-tac`.

use std::fmt;

use indexmap::IndexMap;
use micac_par::{Storage, Ty};
use micac_util::Symbol;

/// Jump label, unique across one program.
pub type Label = String;

/// Compile-time constant operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Const {
    pub value: i32,
    pub ty: Ty,
}

/// Named variable operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: Symbol,
    pub ty: Ty,
    pub storage: Storage,
    pub scope_id: u32,
}

/// Single-assignment temporary operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp {
    pub id: u32,
    pub ty: Ty,
}

/// TAC operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Const(Const),
    Var(Var),
    Temp(Temp),
}

impl Operand {
    pub fn ty(&self) -> Ty {
        match self {
            Operand::Const(c) => c.ty,
            Operand::Var(v) => v.ty,
            Operand::Temp(t) => t.ty,
        }
    }

    pub fn as_const(&self) -> Option<Const> {
        match self {
            Operand::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// True for operands with a storage location (`Var` or `Temp`).
    pub fn is_place(&self) -> bool {
        matches!(self, Operand::Var(_) | Operand::Temp(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Const(c) => write!(f, "{} ({})", c.value, c.ty),
            Operand::Var(v) => match v.storage {
                Storage::Global => write!(f, "{} ({}, {})", v.name, v.ty, v.storage),
                _ => write!(f, "{}_s{} ({}, {})", v.name, v.scope_id, v.ty, v.storage),
            },
            Operand::Temp(t) => write!(f, "t{} ({})", t.id, t.ty),
        }
    }
}

/// Binary opcode: arithmetic, comparison, or logical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    /// True for opcodes whose result is a boolean.
    pub fn produces_bool(self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    /// True for the six relational opcodes.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        };
        f.write_str(s)
    }
}

/// TAC instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// Declare a variable, optionally with a constant initializer
    Def { var: Var, init: Option<Const> },
    /// Copy `src` into `dst`
    Assign { src: Operand, dst: Var },
    /// `dst = lhs op rhs`
    Bin {
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
        dst: Temp,
    },
    /// Jump target
    Label(Label),
    /// Unconditional jump
    Goto(Label),
    /// Jump to `target` when `cond` is nonzero
    If { cond: Operand, target: Label },
    /// Start of a function's instruction stream
    FuncStart(Symbol),
    /// End of a function's instruction stream
    FuncEnd(Symbol),
    /// Declare the next formal parameter of the enclosing function
    Param { var: Var },
    /// Push one argument for an upcoming call (emitted right-to-left)
    Arg { value: Operand },
    /// Call `func` with `argc` pushed arguments; result in `dst`
    Call {
        func: Symbol,
        argc: usize,
        dst: Temp,
    },
    /// Return `value` from the enclosing function
    Ret { value: Operand },
    /// Print `value` followed by a newline
    Print { value: Operand },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Def { var, init: Some(c) } => {
                write!(f, "def {} {}", Operand::Const(*c), Operand::Var(*var))
            }
            Instr::Def { var, init: None } => write!(f, "def {}", Operand::Var(*var)),
            Instr::Assign { src, dst } => write!(f, "eq {} {}", src, Operand::Var(*dst)),
            Instr::Bin { op, lhs, rhs, dst } => {
                write!(f, "{} {} {} {}", op, lhs, rhs, Operand::Temp(*dst))
            }
            Instr::Label(label) => write!(f, "label {}", label),
            Instr::Goto(label) => write!(f, "goto {}", label),
            Instr::If { cond, target } => write!(f, "if {} {}", cond, target),
            Instr::FuncStart(name) => write!(f, "func_start {}", name),
            Instr::FuncEnd(name) => write!(f, "func_end {}", name),
            Instr::Param { var } => write!(f, "param {}", Operand::Var(*var)),
            Instr::Arg { value } => write!(f, "arg {}", value),
            Instr::Call { func, argc, dst } => {
                write!(f, "call {} {} {}", func, argc, Operand::Temp(*dst))
            }
            Instr::Ret { value } => write!(f, "ret {}", value),
            Instr::Print { value } => write!(f, "print {}", value),
        }
    }
}

/// A TAC program split into its streams.
///
/// `globals` holds the `def` instructions for `.data`; `top_level` is the
/// statement stream executed from `_start`; `functions` maps each
/// function name to its body in definition order.
#[derive(Debug, Clone, Default)]
pub struct TacProgram {
    pub globals: Vec<Instr>,
    pub top_level: Vec<Instr>,
    pub functions: IndexMap<Symbol, Vec<Instr>>,
}

impl TacProgram {
    /// Render the whole program for `--print-tac`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for instr in &self.globals {
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        for instr in &self.top_level {
            out.push_str(&instr.to_string());
            out.push('\n');
        }
        for (name, body) in &self.functions {
            out.push_str(&format!("func_start {}\n", name));
            for instr in body {
                out.push_str(&instr.to_string());
                out.push('\n');
            }
            out.push_str(&format!("func_end {}\n", name));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, storage: Storage, scope_id: u32) -> Var {
        Var {
            name: Symbol::intern(name),
            ty: Ty::Int,
            storage,
            scope_id,
        }
    }

    #[test]
    fn test_var_identity_includes_scope() {
        let a = var("x", Storage::Local, 1);
        let b = var("x", Storage::Local, 2);
        assert_ne!(Operand::Var(a), Operand::Var(b));
        assert_eq!(Operand::Var(a), Operand::Var(var("x", Storage::Local, 1)));
    }

    #[test]
    fn test_temp_identity() {
        let a = Temp { id: 0, ty: Ty::Int };
        let b = Temp { id: 0, ty: Ty::Int };
        assert_eq!(Operand::Temp(a), Operand::Temp(b));
    }

    #[test]
    fn test_display_tuple_form() {
        let instr = Instr::Bin {
            op: BinOp::Add,
            lhs: Operand::Var(var("x", Storage::Global, 0)),
            rhs: Operand::Const(Const {
                value: 4,
                ty: Ty::Int,
            }),
            dst: Temp { id: 0, ty: Ty::Int },
        };
        assert_eq!(instr.to_string(), "+ x (int, global) 4 (int) t0 (int)");
    }

    #[test]
    fn test_local_display_carries_scope_suffix() {
        let instr = Instr::Def {
            var: var("x", Storage::Local, 3),
            init: None,
        };
        assert_eq!(instr.to_string(), "def x_s3 (int, local)");
    }

    #[test]
    fn test_produces_bool() {
        assert!(BinOp::Lt.produces_bool());
        assert!(BinOp::And.produces_bool());
        assert!(!BinOp::Add.produces_bool());
    }
}
