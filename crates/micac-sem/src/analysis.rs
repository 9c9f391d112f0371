//! Semantic analysis.
//!
//! A single walk over the AST that builds the scope tree, checks types,
//! and writes the `ty`/`storage`/`scope_id` annotations every downstream
//! phase depends on. Function signatures are hoisted first so calls may
//! reference functions defined later in the file.

use micac_par::ast::*;
use micac_util::{Span, Symbol};

use crate::error::{Result, SemError};
use crate::scope::{ParamSig, ScopeTree, SymbolKind};

/// Analyze and annotate a program in place.
pub fn analyze(program: &mut Program) -> Result<()> {
    SemanticAnalyzer::new().analyze(program)
}

struct FunctionContext {
    name: Symbol,
    return_ty: Ty,
}

pub struct SemanticAnalyzer {
    scopes: ScopeTree,
    current_function: Option<FunctionContext>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            scopes: ScopeTree::new(),
            current_function: None,
        }
    }

    pub fn analyze(&mut self, program: &mut Program) -> Result<()> {
        // Hoist function signatures so forward and mutual calls resolve.
        for decl in &program.declarations {
            if let Decl::Function(func) = decl {
                self.declare_function(func)?;
            }
        }
        for decl in &mut program.declarations {
            match decl {
                Decl::Function(func) => self.visit_function(func)?,
                Decl::Stmt(stmt) => self.visit_stmt(stmt)?,
            }
        }
        Ok(())
    }

    fn declare_function(&mut self, func: &FunctionDef) -> Result<()> {
        let params = func
            .params
            .iter()
            .map(|p| ParamSig {
                ty: p.ty,
                name: p.name,
            })
            .collect();
        let bound = self.scopes.bind(
            func.name,
            SymbolKind::Function {
                return_ty: func.return_ty,
                params,
            },
        );
        if !bound {
            return Err(SemError::Redefined {
                name: func.name.as_str().to_string(),
                span: func.span,
            });
        }
        Ok(())
    }

    fn visit_function(&mut self, func: &mut FunctionDef) -> Result<()> {
        if self.current_function.is_some() || !self.scopes.at_global_scope() {
            return Err(SemError::NestedFunction {
                name: func.name.as_str().to_string(),
                span: func.span,
            });
        }
        self.current_function = Some(FunctionContext {
            name: func.name,
            return_ty: func.return_ty,
        });

        let scope_id = self.scopes.enter();
        for param in &mut func.params {
            param.scope_id = Some(scope_id.0);
            let bound = self.scopes.bind(
                param.name,
                SymbolKind::Variable {
                    ty: param.ty,
                    storage: Storage::Param,
                    scope_id: scope_id.0,
                },
            );
            if !bound {
                return Err(SemError::Redefined {
                    name: param.name.as_str().to_string(),
                    span: param.span,
                });
            }
        }
        self.visit_scope(&mut func.body)?;
        self.scopes.exit();

        self.current_function = None;
        Ok(())
    }

    fn visit_scope(&mut self, scope: &mut Scope) -> Result<()> {
        self.scopes.enter();
        for stmt in &mut scope.statements {
            self.visit_stmt(stmt)?;
        }
        self.scopes.exit();
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> Result<()> {
        match stmt {
            Stmt::Definer(def) => self.visit_definer(def),
            Stmt::Equalize(assign) => self.visit_equalize(assign),
            Stmt::If(if_stmt) => {
                let cond_ty = self.visit_expr(&mut if_stmt.condition)?;
                if cond_ty != Ty::Bool {
                    return Err(type_mismatch(
                        format!("if condition must be of type 'bool', got '{cond_ty}'"),
                        expr_span(&if_stmt.condition),
                    ));
                }
                self.visit_scope(&mut if_stmt.scope)
            }
            Stmt::While(while_stmt) => {
                let cond_ty = self.visit_expr(&mut while_stmt.condition)?;
                if cond_ty != Ty::Bool {
                    return Err(type_mismatch(
                        format!("while condition must be of type 'bool', got '{cond_ty}'"),
                        expr_span(&while_stmt.condition),
                    ));
                }
                self.visit_scope(&mut while_stmt.scope)
            }
            Stmt::Print(print) => {
                self.visit_expr(&mut print.expression)?;
                Ok(())
            }
            Stmt::Scope(scope) => self.visit_scope(scope),
            Stmt::Return(ret) => self.visit_return(ret),
            Stmt::Call(call) => {
                self.visit_call(call)?;
                Ok(())
            }
        }
    }

    fn visit_definer(&mut self, def: &mut Definer) -> Result<()> {
        let storage = self.scopes.current_storage();
        let scope_id = self.scopes.current_id().0;
        let bound = self.scopes.bind(
            def.name,
            SymbolKind::Variable {
                ty: def.ty,
                storage,
                scope_id,
            },
        );
        if !bound {
            return Err(SemError::Redefined {
                name: def.name.as_str().to_string(),
                span: def.span,
            });
        }
        def.storage = Some(storage);
        def.scope_id = Some(scope_id);

        if let Some(value) = &mut def.value {
            let value_ty = self.visit_expr(value)?;
            if value_ty != def.ty {
                return Err(type_mismatch(
                    format!(
                        "cannot assign value of type '{value_ty}' to variable '{}' of type '{}'",
                        def.name, def.ty
                    ),
                    def.span,
                ));
            }
        }
        Ok(())
    }

    fn visit_equalize(&mut self, assign: &mut Equalize) -> Result<()> {
        let (var_ty, storage, scope_id) =
            self.scopes
                .resolve_variable(assign.name)
                .ok_or_else(|| SemError::Undefined {
                    name: assign.name.as_str().to_string(),
                    span: assign.span,
                })?;
        assign.ty = Some(var_ty);
        assign.storage = Some(storage);
        assign.scope_id = Some(scope_id);

        let value_ty = self.visit_expr(&mut assign.value)?;
        if value_ty != var_ty {
            return Err(type_mismatch(
                format!(
                    "cannot assign value of type '{value_ty}' to variable '{}' of type '{var_ty}'",
                    assign.name
                ),
                assign.span,
            ));
        }
        Ok(())
    }

    fn visit_return(&mut self, ret: &mut ReturnStmt) -> Result<()> {
        let context = self
            .current_function
            .as_ref()
            .ok_or(SemError::ReturnOutsideFunction { span: ret.span })?;
        let expected = context.return_ty;
        let name = context.name;
        let actual = self.visit_expr(&mut ret.expression)?;
        if actual != expected {
            return Err(type_mismatch(
                format!("function '{name}' expects return type '{expected}', got '{actual}'"),
                ret.span,
            ));
        }
        Ok(())
    }

    fn visit_expr(&mut self, expr: &mut Expr) -> Result<Ty> {
        match expr {
            Expr::Binary(binary) => {
                let left = self.visit_expr(&mut binary.left)?;
                let right = self.visit_expr(&mut binary.right)?;
                if left != Ty::Int || right != Ty::Int {
                    return Err(type_mismatch(
                        format!(
                            "cannot perform '{}' on types '{left}' and '{right}'",
                            binary.op
                        ),
                        binary.span,
                    ));
                }
                binary.ty = Some(Ty::Int);
                Ok(Ty::Int)
            }
            Expr::Condition(cond) => {
                let left = self.visit_expr(&mut cond.left)?;
                let right = self.visit_expr(&mut cond.right)?;
                match cond.op {
                    CondOp::Lt | CondOp::Gt | CondOp::Le | CondOp::Ge | CondOp::Ne => {
                        if left != right || left == Ty::Bool || right == Ty::Bool {
                            return Err(type_mismatch(
                                format!("cannot compare values of type '{left}' and '{right}'"),
                                cond.span,
                            ));
                        }
                    }
                    CondOp::Eq => {
                        if left != right {
                            return Err(type_mismatch(
                                format!("cannot compare values of type '{left}' and '{right}'"),
                                cond.span,
                            ));
                        }
                    }
                    CondOp::And | CondOp::Or => {
                        if left != Ty::Bool || right != Ty::Bool {
                            return Err(type_mismatch(
                                format!(
                                    "logical operations require boolean operands, got '{left}' and '{right}'"
                                ),
                                cond.span,
                            ));
                        }
                    }
                }
                cond.ty = Some(Ty::Bool);
                Ok(Ty::Bool)
            }
            Expr::Factor(factor) => self.visit_factor(factor),
            Expr::Call(call) => self.visit_call(call),
        }
    }

    fn visit_factor(&mut self, factor: &mut Factor) -> Result<Ty> {
        match &factor.kind {
            FactorKind::Var(name) => {
                let (ty, storage, scope_id) =
                    self.scopes
                        .resolve_variable(*name)
                        .ok_or_else(|| SemError::Undefined {
                            name: name.as_str().to_string(),
                            span: factor.span,
                        })?;
                factor.ty = Some(ty);
                factor.storage = Some(storage);
                factor.scope_id = Some(scope_id);
                Ok(ty)
            }
            FactorKind::Int(_) => {
                factor.ty = Some(Ty::Int);
                Ok(Ty::Int)
            }
            FactorKind::Bool(_) => {
                factor.ty = Some(Ty::Bool);
                Ok(Ty::Bool)
            }
        }
    }

    fn visit_call(&mut self, call: &mut CallExpr) -> Result<Ty> {
        let (return_ty, params) =
            self.scopes
                .resolve_function(call.name)
                .ok_or_else(|| SemError::Undefined {
                    name: call.name.as_str().to_string(),
                    span: call.span,
                })?;
        let params: Vec<ParamSig> = params.to_vec();
        if call.args.len() != params.len() {
            return Err(SemError::ArityMismatch {
                name: call.name.as_str().to_string(),
                expected: params.len(),
                found: call.args.len(),
                span: call.span,
            });
        }
        for (arg, param) in call.args.iter_mut().zip(&params) {
            let arg_ty = self.visit_expr(arg)?;
            if arg_ty != param.ty {
                return Err(type_mismatch(
                    format!(
                        "argument for parameter '{}' expects type '{}', got '{arg_ty}'",
                        param.name, param.ty
                    ),
                    expr_span(arg),
                ));
            }
        }
        call.ty = Some(return_ty);
        Ok(return_ty)
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn type_mismatch(detail: String, span: Span) -> SemError {
    SemError::TypeMismatch { detail, span }
}

fn expr_span(expr: &Expr) -> Span {
    match expr {
        Expr::Binary(b) => b.span,
        Expr::Condition(c) => c.span,
        Expr::Factor(f) => f.span,
        Expr::Call(c) => c.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micac_lex::language_tokenizer;
    use micac_par::parse;

    fn analyze_source(source: &str) -> Result<Program> {
        let tokens = language_tokenizer().unwrap().tokenize(source).unwrap();
        let mut program = parse(tokens).unwrap();
        analyze(&mut program)?;
        Ok(program)
    }

    #[test]
    fn test_annotations_written() {
        let program = analyze_source("var int x = 3; print(x + 1);").unwrap();
        let Decl::Stmt(Stmt::Definer(def)) = &program.declarations[0] else {
            panic!("expected definer");
        };
        assert_eq!(def.storage, Some(Storage::Global));
        assert_eq!(def.scope_id, Some(0));

        let Decl::Stmt(Stmt::Print(print)) = &program.declarations[1] else {
            panic!("expected print");
        };
        assert_eq!(print.expression.ty(), Some(Ty::Int));
        let Expr::Binary(add) = &print.expression else {
            panic!("expected binary");
        };
        let Expr::Factor(x) = &add.left else {
            panic!("expected factor");
        };
        assert_eq!(x.storage, Some(Storage::Global));
    }

    #[test]
    fn test_redefinition_same_scope_rejected() {
        let err = analyze_source("var int x; var bool x;").unwrap_err();
        assert!(matches!(err, SemError::Redefined { .. }));
    }

    #[test]
    fn test_shadowing_in_nested_scope_allowed() {
        let program = analyze_source(
            "var int x = 1; int main() { var int x = 2; print(x); return 0; }",
        )
        .unwrap();
        let Decl::Function(main) = &program.declarations[1] else {
            panic!("expected function");
        };
        let Stmt::Definer(inner) = &main.body.statements[0] else {
            panic!("expected definer");
        };
        assert_eq!(inner.storage, Some(Storage::Local));
        assert_ne!(inner.scope_id, Some(0));
    }

    #[test]
    fn test_undefined_variable() {
        let err = analyze_source("x = 1;").unwrap_err();
        assert!(matches!(err, SemError::Undefined { .. }));
    }

    #[test]
    fn test_assign_bool_to_int_rejected() {
        let err = analyze_source("var int x = false;").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_arith_requires_int() {
        let err = analyze_source("var bool t = true; print(t + 1);").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_comparison_rejects_bool_operands() {
        let err = analyze_source("var bool t = true; if t < t do { print(1); }").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_equality_on_bools_allowed() {
        analyze_source("var bool t = true; var bool f = false; if t == f do { print(1); }")
            .unwrap();
    }

    #[test]
    fn test_logical_requires_bools() {
        let err = analyze_source("var int x = 1; if (x > 0) & (x) do { print(x); }").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_if_condition_must_be_bool() {
        let err = analyze_source("var int x = 1; if x do { print(x); }").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_forward_call_resolves() {
        analyze_source(
            "int main() { print(later(1)); return 0; } int later(int x) { return x; }",
        )
        .unwrap();
    }

    #[test]
    fn test_call_arity_checked() {
        let err = analyze_source(
            "int add(int a, int b) { return a + b; } int main() { print(add(1)); return 0; }",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SemError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_call_argument_types_checked() {
        let err = analyze_source(
            "int neg(int a) { return 0 - a; } int main() { print(neg(true)); return 0; }",
        )
        .unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_call_type_is_return_type() {
        let program = analyze_source(
            "bool is_odd(int a) { return a == 1; } int main() { print(is_odd(3)); return 0; }",
        )
        .unwrap();
        let Decl::Function(main) = &program.declarations[1] else {
            panic!("expected function");
        };
        let Stmt::Print(print) = &main.body.statements[0] else {
            panic!("expected print");
        };
        assert_eq!(print.expression.ty(), Some(Ty::Bool));
    }

    #[test]
    fn test_return_outside_function() {
        let err = analyze_source("return 1;").unwrap_err();
        assert!(matches!(err, SemError::ReturnOutsideFunction { .. }));
    }

    #[test]
    fn test_return_type_checked() {
        let err =
            analyze_source("int main() { return true; }").unwrap_err();
        assert!(matches!(err, SemError::TypeMismatch { .. }));
    }

    #[test]
    fn test_params_have_param_storage() {
        let program =
            analyze_source("int id(int a) { return a; } int main() { print(id(1)); return 0; }")
                .unwrap();
        let Decl::Function(id) = &program.declarations[0] else {
            panic!("expected function");
        };
        assert!(id.params[0].scope_id.is_some());
        let Stmt::Return(ret) = &id.body.statements[0] else {
            panic!("expected return");
        };
        let Expr::Factor(a) = &ret.expression else {
            panic!("expected factor");
        };
        assert_eq!(a.storage, Some(Storage::Param));
        assert_eq!(a.scope_id, id.params[0].scope_id);
    }

    #[test]
    fn test_function_and_variable_collide() {
        let err = analyze_source("var int f = 1; int f() { return 1; }").unwrap_err();
        assert!(matches!(err, SemError::Redefined { .. }));
    }
}
