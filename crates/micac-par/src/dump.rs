//! Indented AST dump for `--print-ast`.

use std::fmt::Write;

use crate::ast::*;

/// Render the whole program as an indented tree.
pub fn dump_program(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("Program:\n");
    for decl in &program.declarations {
        match decl {
            Decl::Function(f) => dump_function(&mut out, f, 1),
            Decl::Stmt(s) => dump_stmt(&mut out, s, 1),
        }
    }
    out
}

fn indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn dump_function(out: &mut String, f: &FunctionDef, level: usize) {
    indent(out, level);
    let _ = writeln!(out, "FunctionDef: {} {}(", f.return_ty, f.name);
    for (i, param) in f.params.iter().enumerate() {
        indent(out, level + 1);
        let _ = writeln!(out, "Param {}: {} {}", i, param.ty, param.name);
    }
    indent(out, level);
    out.push_str(") Body:\n");
    dump_scope(out, &f.body, level + 1);
}

fn dump_scope(out: &mut String, scope: &Scope, level: usize) {
    indent(out, level);
    out.push_str("Scope:\n");
    for stmt in &scope.statements {
        dump_stmt(out, stmt, level + 1);
    }
}

fn dump_stmt(out: &mut String, stmt: &Stmt, level: usize) {
    match stmt {
        Stmt::Definer(d) => {
            indent(out, level);
            let _ = write!(out, "Definer: var {} {}", d.ty, d.name);
            if let Some(value) = &d.value {
                out.push_str(" =\n");
                dump_expr(out, value, level + 1);
            } else {
                out.push('\n');
            }
        }
        Stmt::Equalize(e) => {
            indent(out, level);
            let _ = writeln!(out, "Equalize: {} =", e.name);
            dump_expr(out, &e.value, level + 1);
        }
        Stmt::If(i) => {
            indent(out, level);
            out.push_str("If:\n");
            dump_expr(out, &i.condition, level + 1);
            dump_scope(out, &i.scope, level + 1);
        }
        Stmt::While(w) => {
            indent(out, level);
            out.push_str("While:\n");
            dump_expr(out, &w.condition, level + 1);
            dump_scope(out, &w.scope, level + 1);
        }
        Stmt::Print(p) => {
            indent(out, level);
            out.push_str("Print:\n");
            dump_expr(out, &p.expression, level + 1);
        }
        Stmt::Scope(s) => dump_scope(out, s, level),
        Stmt::Return(r) => {
            indent(out, level);
            out.push_str("Return:\n");
            dump_expr(out, &r.expression, level + 1);
        }
        Stmt::Call(c) => dump_call(out, c, level),
    }
}

fn dump_call(out: &mut String, call: &CallExpr, level: usize) {
    indent(out, level);
    let _ = writeln!(out, "FunctionCall: {}(", call.name);
    for (i, arg) in call.args.iter().enumerate() {
        indent(out, level + 1);
        let _ = writeln!(out, "Arg {}:", i);
        dump_expr(out, arg, level + 2);
    }
    indent(out, level);
    out.push_str(")\n");
}

fn dump_expr(out: &mut String, expr: &Expr, level: usize) {
    match expr {
        Expr::Binary(b) => {
            indent(out, level);
            let _ = writeln!(out, "Expression: {}", b.op);
            dump_expr(out, &b.left, level + 1);
            dump_expr(out, &b.right, level + 1);
        }
        Expr::Condition(c) => {
            indent(out, level);
            let _ = writeln!(out, "Condition: {}", c.op);
            dump_expr(out, &c.left, level + 1);
            dump_expr(out, &c.right, level + 1);
        }
        Expr::Factor(f) => {
            indent(out, level);
            match &f.kind {
                FactorKind::Var(name) => {
                    let _ = writeln!(out, "Var: {}", name);
                }
                FactorKind::Int(text) => {
                    let _ = writeln!(out, "Num: {}", text);
                }
                FactorKind::Bool(value) => {
                    let _ = writeln!(out, "Bool: {}", value);
                }
            }
        }
        Expr::Call(c) => dump_call(out, c, level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use micac_lex::language_tokenizer;

    #[test]
    fn test_dump_shape() {
        let tokens = language_tokenizer()
            .unwrap()
            .tokenize("var int x = 1 + 2; print(x);")
            .unwrap();
        let program = parse(tokens).unwrap();
        let dump = dump_program(&program);
        assert!(dump.starts_with("Program:\n"));
        assert!(dump.contains("Definer: var int x =\n"));
        assert!(dump.contains("Expression: +"));
        assert!(dump.contains("Print:"));
        assert!(dump.contains("Var: x"));
    }
}
