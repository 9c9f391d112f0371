//! AST to TAC lowering.
//!
//! One downward walk. Temporaries are minted per expression node and
//! labels per control construct, both from counters that live in the
//! generator, so identical input always yields identical TAC. After the
//! walk the flat instruction list is split into global `def`s, the
//! top-level stream, and per-function streams.

use indexmap::IndexMap;
use micac_par::ast::{self, Decl, Expr, FactorKind, Program, Stmt};
use micac_par::{ArithOp, CondOp, Storage, Ty};
use micac_util::Symbol;

use crate::error::{Result, TacError};
use crate::tac::{BinOp, Const, Instr, Label, Operand, TacProgram, Temp, Var};

/// Lower an annotated program to TAC.
pub fn generate(program: &Program) -> Result<TacProgram> {
    let mut generator = TacGenerator::new();
    generator.visit_program(program)?;
    Ok(split_into_streams(generator.instructions))
}

pub struct TacGenerator {
    instructions: Vec<Instr>,
    temp_count: u32,
    label_count: u32,
}

impl TacGenerator {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            temp_count: 0,
            label_count: 0,
        }
    }

    fn new_temp(&mut self, ty: Ty) -> Temp {
        let temp = Temp {
            id: self.temp_count,
            ty,
        };
        self.temp_count += 1;
        temp
    }

    fn new_label(&mut self) -> Label {
        let label = format!("L{}", self.label_count);
        self.label_count += 1;
        label
    }

    fn emit(&mut self, instr: Instr) {
        self.instructions.push(instr);
    }

    fn visit_program(&mut self, program: &Program) -> Result<()> {
        for decl in &program.declarations {
            match decl {
                Decl::Function(func) => self.visit_function(func)?,
                Decl::Stmt(stmt) => self.visit_stmt(stmt)?,
            }
        }
        Ok(())
    }

    fn visit_function(&mut self, func: &ast::FunctionDef) -> Result<()> {
        self.emit(Instr::FuncStart(func.name));
        for param in &func.params {
            let scope_id = param.scope_id.ok_or_else(|| {
                TacError::Internal(format!("parameter '{}' has no scope id", param.name))
            })?;
            self.emit(Instr::Param {
                var: Var {
                    name: param.name,
                    ty: param.ty,
                    storage: Storage::Param,
                    scope_id,
                },
            });
        }
        self.visit_scope(&func.body)?;
        self.emit(Instr::FuncEnd(func.name));
        Ok(())
    }

    fn visit_scope(&mut self, scope: &ast::Scope) -> Result<()> {
        for stmt in &scope.statements {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Definer(def) => self.visit_definer(def),
            Stmt::Equalize(assign) => {
                let src = self.visit_expr(&assign.value)?;
                let dst = annotated_var(assign.name, assign.ty, assign.storage, assign.scope_id)?;
                self.emit(Instr::Assign { src, dst });
                Ok(())
            }
            Stmt::If(if_stmt) => {
                let cond = self.visit_expr(&if_stmt.condition)?;
                let then_label = self.new_label();
                self.emit(Instr::If {
                    cond,
                    target: then_label.clone(),
                });
                let end_label = self.new_label();
                self.emit(Instr::Goto(end_label.clone()));
                self.emit(Instr::Label(then_label));
                self.visit_scope(&if_stmt.scope)?;
                self.emit(Instr::Label(end_label));
                Ok(())
            }
            Stmt::While(while_stmt) => {
                let start_label = self.new_label();
                self.emit(Instr::Label(start_label.clone()));
                let cond = self.visit_expr(&while_stmt.condition)?;
                let body_label = self.new_label();
                let end_label = self.new_label();
                self.emit(Instr::If {
                    cond,
                    target: body_label.clone(),
                });
                self.emit(Instr::Goto(end_label.clone()));
                self.emit(Instr::Label(body_label));
                self.visit_scope(&while_stmt.scope)?;
                self.emit(Instr::Goto(start_label));
                self.emit(Instr::Label(end_label));
                Ok(())
            }
            Stmt::Print(print) => {
                let value = self.visit_expr(&print.expression)?;
                self.emit(Instr::Print { value });
                Ok(())
            }
            Stmt::Scope(scope) => self.visit_scope(scope),
            Stmt::Return(ret) => {
                let value = self.visit_expr(&ret.expression)?;
                self.emit(Instr::Ret { value });
                Ok(())
            }
            Stmt::Call(call) => {
                self.visit_call(call)?;
                Ok(())
            }
        }
    }

    fn visit_definer(&mut self, def: &ast::Definer) -> Result<()> {
        let var = annotated_var(def.name, Some(def.ty), def.storage, def.scope_id)?;
        match &def.value {
            Some(value) => {
                let operand = self.visit_expr(value)?;
                match operand {
                    Operand::Const(c) => self.emit(Instr::Def { var, init: Some(c) }),
                    src => {
                        self.emit(Instr::Def { var, init: None });
                        self.emit(Instr::Assign { src, dst: var });
                    }
                }
            }
            None => self.emit(Instr::Def { var, init: None }),
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &Expr) -> Result<Operand> {
        match expr {
            Expr::Binary(binary) => {
                let lhs = self.visit_expr(&binary.left)?;
                let rhs = self.visit_expr(&binary.right)?;
                let ty = binary
                    .ty
                    .ok_or_else(|| TacError::Internal("untyped expression node".to_string()))?;
                let dst = self.new_temp(ty);
                self.emit(Instr::Bin {
                    op: arith_op(binary.op),
                    lhs,
                    rhs,
                    dst,
                });
                Ok(Operand::Temp(dst))
            }
            Expr::Condition(cond) => {
                let lhs = self.visit_expr(&cond.left)?;
                let rhs = self.visit_expr(&cond.right)?;
                let ty = cond
                    .ty
                    .ok_or_else(|| TacError::Internal("untyped condition node".to_string()))?;
                let dst = self.new_temp(ty);
                self.emit(Instr::Bin {
                    op: cond_op(cond.op),
                    lhs,
                    rhs,
                    dst,
                });
                Ok(Operand::Temp(dst))
            }
            Expr::Factor(factor) => self.visit_factor(factor),
            Expr::Call(call) => self.visit_call(call),
        }
    }

    fn visit_factor(&mut self, factor: &ast::Factor) -> Result<Operand> {
        match &factor.kind {
            FactorKind::Var(name) => {
                let var = annotated_var(*name, factor.ty, factor.storage, factor.scope_id)?;
                Ok(Operand::Var(var))
            }
            FactorKind::Int(text) => {
                let value: i64 = text.parse().map_err(|_| TacError::IntegerOverflow {
                    text: text.clone(),
                    span: factor.span,
                })?;
                if value < i32::MIN as i64 || value > i32::MAX as i64 {
                    return Err(TacError::IntegerOverflow {
                        text: text.clone(),
                        span: factor.span,
                    });
                }
                Ok(Operand::Const(Const {
                    value: value as i32,
                    ty: Ty::Int,
                }))
            }
            FactorKind::Bool(value) => Ok(Operand::Const(Const {
                value: i32::from(*value),
                ty: Ty::Bool,
            })),
        }
    }

    fn visit_call(&mut self, call: &ast::CallExpr) -> Result<Operand> {
        // Arguments are pushed right-to-left, so the first argument ends
        // up nearest the callee's frame base.
        for arg in call.args.iter().rev() {
            let value = self.visit_expr(arg)?;
            self.emit(Instr::Arg { value });
        }
        let ty = call
            .ty
            .ok_or_else(|| TacError::Internal("untyped call node".to_string()))?;
        let dst = self.new_temp(ty);
        self.emit(Instr::Call {
            func: call.name,
            argc: call.args.len(),
            dst,
        });
        Ok(Operand::Temp(dst))
    }
}

impl Default for TacGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn annotated_var(
    name: Symbol,
    ty: Option<Ty>,
    storage: Option<Storage>,
    scope_id: Option<u32>,
) -> Result<Var> {
    match (ty, storage, scope_id) {
        (Some(ty), Some(storage), Some(scope_id)) => Ok(Var {
            name,
            ty,
            storage,
            scope_id,
        }),
        _ => Err(TacError::Internal(format!(
            "variable '{name}' reached lowering without annotations"
        ))),
    }
}

fn arith_op(op: ArithOp) -> BinOp {
    match op {
        ArithOp::Add => BinOp::Add,
        ArithOp::Sub => BinOp::Sub,
        ArithOp::Mul => BinOp::Mul,
        ArithOp::Div => BinOp::Div,
    }
}

fn cond_op(op: CondOp) -> BinOp {
    match op {
        CondOp::Lt => BinOp::Lt,
        CondOp::Gt => BinOp::Gt,
        CondOp::Le => BinOp::Le,
        CondOp::Ge => BinOp::Ge,
        CondOp::Eq => BinOp::Eq,
        CondOp::Ne => BinOp::Ne,
        CondOp::And => BinOp::And,
        CondOp::Or => BinOp::Or,
    }
}

/// Partition the flat instruction list into global `def`s, the top-level
/// stream, and per-function streams.
fn split_into_streams(instructions: Vec<Instr>) -> TacProgram {
    let mut globals = Vec::new();
    let mut top_level = Vec::new();
    let mut functions: IndexMap<Symbol, Vec<Instr>> = IndexMap::new();
    let mut current: Option<Symbol> = None;

    for instr in instructions {
        match instr {
            Instr::FuncStart(name) => {
                functions.entry(name).or_default();
                current = Some(name);
            }
            Instr::FuncEnd(_) => {
                current = None;
            }
            Instr::Def { var, .. } if var.storage == Storage::Global => {
                globals.push(instr);
            }
            _ => match current {
                Some(name) => functions[&name].push(instr),
                None => top_level.push(instr),
            },
        }
    }

    TacProgram {
        globals,
        top_level,
        functions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micac_lex::language_tokenizer;
    use micac_par::parse;
    use rustc_hash::{FxHashMap, FxHashSet};

    fn lower(source: &str) -> TacProgram {
        let tokens = language_tokenizer().unwrap().tokenize(source).unwrap();
        let mut program = parse(tokens).unwrap();
        micac_sem::analyze(&mut program).unwrap();
        generate(&program).unwrap()
    }

    fn lower_err(source: &str) -> TacError {
        let tokens = language_tokenizer().unwrap().tokenize(source).unwrap();
        let mut program = parse(tokens).unwrap();
        micac_sem::analyze(&mut program).unwrap();
        generate(&program).unwrap_err()
    }

    #[test]
    fn test_const_definer_folds_into_def() {
        let tac = lower("var int x = 3;");
        assert_eq!(tac.globals.len(), 1);
        assert!(tac.top_level.is_empty());
        match &tac.globals[0] {
            Instr::Def { var, init: Some(c) } => {
                assert_eq!(var.name.as_str(), "x");
                assert_eq!(c.value, 3);
            }
            other => panic!("expected def with init, got {:?}", other),
        }
    }

    #[test]
    fn test_computed_definer_emits_def_then_eq() {
        let tac = lower("var int x = 1 + 2;");
        // t0 = 1 + 2 ; def x ; eq t0 x  (def is hoisted to globals)
        assert_eq!(tac.globals.len(), 1);
        assert!(matches!(tac.globals[0], Instr::Def { init: None, .. }));
        assert!(matches!(tac.top_level[0], Instr::Bin { op: BinOp::Add, .. }));
        assert!(matches!(
            tac.top_level[1],
            Instr::Assign {
                src: Operand::Temp(_),
                ..
            }
        ));
    }

    #[test]
    fn test_if_shape() {
        let tac = lower("var int a = 6; var int b = 4; if a > b do { print(a - b); }");
        let ops: Vec<String> = tac.top_level.iter().map(|i| i.to_string()).collect();
        assert_eq!(ops[0], "> a (int, global) b (int, global) t0 (bool)");
        assert_eq!(ops[1], "if t0 (bool) L0");
        assert_eq!(ops[2], "goto L1");
        assert_eq!(ops[3], "label L0");
        assert_eq!(ops[4], "- a (int, global) b (int, global) t1 (int)");
        assert_eq!(ops[5], "print t1 (int)");
        assert_eq!(ops[6], "label L1");
    }

    #[test]
    fn test_while_shape() {
        let tac = lower("var int x = 10; while x > 0 do { x = x - 1; }");
        let ops: Vec<String> = tac.top_level.iter().map(|i| i.to_string()).collect();
        assert_eq!(ops[0], "label L0");
        assert_eq!(ops[1], "> x (int, global) 0 (int) t0 (bool)");
        assert_eq!(ops[2], "if t0 (bool) L1");
        assert_eq!(ops[3], "goto L2");
        assert_eq!(ops[4], "label L1");
        assert_eq!(ops[5], "- x (int, global) 1 (int) t1 (int)");
        assert_eq!(ops[6], "eq t1 (int) x (int, global)");
        assert_eq!(ops[7], "goto L0");
        assert_eq!(ops[8], "label L2");
    }

    #[test]
    fn test_boolean_literals_lower_to_0_1() {
        let tac = lower("var bool t = true; var bool f = false;");
        match (&tac.globals[0], &tac.globals[1]) {
            (Instr::Def { init: Some(t), .. }, Instr::Def { init: Some(f), .. }) => {
                assert_eq!(t.value, 1);
                assert_eq!(f.value, 0);
                assert_eq!(t.ty, Ty::Bool);
            }
            other => panic!("expected two defs, got {:?}", other),
        }
    }

    #[test]
    fn test_function_split_and_call_shape() {
        let tac = lower(
            "int add(int a, int b) { return a + b; } int main() { print(add(2, 40)); return 0; }",
        );
        assert_eq!(tac.functions.len(), 2);
        let add = &tac.functions[&Symbol::intern("add")];
        assert!(matches!(add[0], Instr::Param { .. }));
        assert!(matches!(add[1], Instr::Param { .. }));
        assert!(matches!(add[2], Instr::Bin { op: BinOp::Add, .. }));
        assert!(matches!(add[3], Instr::Ret { .. }));

        let main = &tac.functions[&Symbol::intern("main")];
        // Two args pushed right-to-left: 40 first, then 2.
        match (&main[0], &main[1]) {
            (Instr::Arg { value: a40 }, Instr::Arg { value: a2 }) => {
                assert_eq!(a40.as_const().unwrap().value, 40);
                assert_eq!(a2.as_const().unwrap().value, 2);
            }
            other => panic!("expected two args, got {:?}", other),
        }
        assert!(matches!(main[2], Instr::Call { argc: 2, .. }));
        assert!(matches!(main[3], Instr::Print { .. }));
    }

    #[test]
    fn test_int_min_accepted_int_min_minus_one_rejected() {
        let tac = lower("var int x = -2147483648;");
        match &tac.globals[0] {
            Instr::Def { init: Some(c), .. } => assert_eq!(c.value, i32::MIN),
            other => panic!("expected def, got {:?}", other),
        }
        assert!(matches!(
            lower_err("var int x = -2147483649;"),
            TacError::IntegerOverflow { .. }
        ));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            lower_err("var int x = 2147483648;"),
            TacError::IntegerOverflow { .. }
        ));
    }

    #[test]
    fn test_temps_single_assignment_and_def_before_use() {
        let tac = lower(
            "var int x = 1; var int y = x * 2 + 3; print(y); if y > x do { print(y - x); }",
        );
        let mut defined: FxHashSet<u32> = FxHashSet::default();
        for instr in &tac.top_level {
            for used in instr_uses(instr) {
                if let Operand::Temp(t) = used {
                    assert!(defined.contains(&t.id), "t{} used before definition", t.id);
                }
            }
            if let Instr::Bin { dst, .. } | Instr::Call { dst, .. } = instr {
                assert!(defined.insert(dst.id), "t{} defined twice", dst.id);
            }
        }
    }

    #[test]
    fn test_labels_unique_and_targets_exist() {
        let tac = lower("var int x = 5; while x > 0 do { if x > 2 do { print(x); } x = x - 1; }");
        let mut labels: FxHashMap<&str, usize> = FxHashMap::default();
        for instr in &tac.top_level {
            if let Instr::Label(l) = instr {
                *labels.entry(l.as_str()).or_default() += 1;
            }
        }
        for count in labels.values() {
            assert_eq!(*count, 1);
        }
        for instr in &tac.top_level {
            match instr {
                Instr::Goto(l) | Instr::If { target: l, .. } => {
                    assert!(labels.contains_key(l.as_str()), "missing label {l}");
                }
                _ => {}
            }
        }
    }

    fn instr_uses(instr: &Instr) -> Vec<Operand> {
        match instr {
            Instr::Bin { lhs, rhs, .. } => vec![*lhs, *rhs],
            Instr::Assign { src, .. } => vec![*src],
            Instr::If { cond, .. } => vec![*cond],
            Instr::Print { value } | Instr::Arg { value } | Instr::Ret { value } => vec![*value],
            _ => Vec::new(),
        }
    }
}
