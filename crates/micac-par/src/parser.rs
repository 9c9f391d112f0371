//! Recursive-descent parser.
//!
//! One production per method, mirroring the grammar. The only ambiguity
//! in the language is an identifier at statement or factor position,
//! resolved by peeking one token ahead for `(`.

use micac_lex::{Token, TokenKind};
use micac_util::Symbol;

use crate::ast::*;
use crate::cursor::TokenCursor;
use crate::error::{ParseError, Result};

/// Parse a token stream into a [`Program`].
pub fn parse(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}

pub struct Parser {
    tokens: TokenCursor,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: TokenCursor::new(tokens),
        }
    }

    /// program := declaration+
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut declarations = Vec::new();
        while !self.tokens.at_end() {
            declarations.push(self.parse_declaration()?);
        }
        Ok(Program { declarations })
    }

    /// declaration := function_def | statement
    ///
    /// A declaration starting with a TYPE token can only be a function
    /// definition; everything else is a top-level statement.
    fn parse_declaration(&mut self) -> Result<Decl> {
        match self.tokens.peek(0) {
            Some(t) if t.kind == TokenKind::Type => {
                Ok(Decl::Function(self.parse_function_def()?))
            }
            _ => Ok(Decl::Stmt(self.parse_statement()?)),
        }
    }

    /// function_def := TYPE IDENT "(" param_list? ")" scope
    fn parse_function_def(&mut self) -> Result<FunctionDef> {
        let return_ty = self.parse_ty()?;
        let name_token = self.tokens.consume_kind(TokenKind::Identifier)?;
        self.tokens.consume_value("(")?;
        let params = self.parse_param_list()?;
        self.tokens.consume_value(")")?;
        let body = self.parse_scope()?;
        Ok(FunctionDef {
            return_ty,
            name: Symbol::intern(&name_token.lexeme),
            params,
            body,
            span: name_token.span(),
        })
    }

    /// param_list := param ("," param)*
    fn parse_param_list(&mut self) -> Result<Vec<ParamDecl>> {
        let mut params = Vec::new();
        if self.tokens.peek_lexeme() != ")" {
            params.push(self.parse_param()?);
            while self.tokens.peek_lexeme() == "," {
                self.tokens.consume_value(",")?;
                params.push(self.parse_param()?);
            }
        }
        Ok(params)
    }

    /// param := TYPE IDENT
    fn parse_param(&mut self) -> Result<ParamDecl> {
        let ty = self.parse_ty()?;
        let name_token = self.tokens.consume_kind(TokenKind::Identifier)?;
        Ok(ParamDecl {
            ty,
            name: Symbol::intern(&name_token.lexeme),
            span: name_token.span(),
            scope_id: None,
        })
    }

    /// call := IDENT "(" (expression ("," expression)*)? ")"
    fn parse_function_call(&mut self) -> Result<CallExpr> {
        let name_token = self.tokens.consume_kind(TokenKind::Identifier)?;
        self.tokens.consume_value("(")?;
        let args = self.parse_arg_list()?;
        self.tokens.consume_value(")")?;
        Ok(CallExpr {
            name: Symbol::intern(&name_token.lexeme),
            args,
            span: name_token.span(),
            ty: None,
        })
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.tokens.peek_lexeme() != ")" {
            args.push(self.parse_expression()?);
            while self.tokens.peek_lexeme() == "," {
                self.tokens.consume_value(",")?;
                args.push(self.parse_expression()?);
            }
        }
        Ok(args)
    }

    /// scope := "{" statement* "}"
    fn parse_scope(&mut self) -> Result<Scope> {
        self.tokens.consume_value("{")?;
        let mut statements = Vec::new();
        while !self.tokens.at_end() && self.tokens.peek_lexeme() != "}" {
            statements.push(self.parse_statement()?);
        }
        self.tokens.consume_value("}")?;
        Ok(Scope { statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let token = self.tokens.peek(0).ok_or_else(|| ParseError::UnexpectedEof {
            expected: "statement".to_string(),
        })?;
        match token.lexeme.as_str() {
            "var" => Ok(Stmt::Definer(self.parse_definer()?)),
            "if" => Ok(Stmt::If(self.parse_if_structure()?)),
            "while" => Ok(Stmt::While(self.parse_while_structure()?)),
            "print" => Ok(Stmt::Print(self.parse_print()?)),
            "{" => Ok(Stmt::Scope(self.parse_scope()?)),
            "return" => Ok(Stmt::Return(self.parse_return_statement()?)),
            _ => {
                let is_call = token.kind == TokenKind::Identifier
                    && self.tokens.peek(1).is_some_and(|t| t.lexeme == "(");
                if is_call {
                    let call = self.parse_function_call()?;
                    self.tokens.consume_value(";")?;
                    Ok(Stmt::Call(call))
                } else {
                    Ok(Stmt::Equalize(self.parse_equalize()?))
                }
            }
        }
    }

    /// definer := "var" TYPE IDENT ("=" expression)? ";"
    fn parse_definer(&mut self) -> Result<Definer> {
        self.tokens.consume_value("var")?;
        let ty = self.parse_ty()?;
        let name_token = self.tokens.consume_kind(TokenKind::Identifier)?;
        let value = if self.tokens.peek_lexeme() == "=" {
            self.tokens.consume_value("=")?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.tokens.consume_value(";")?;
        Ok(Definer {
            name: Symbol::intern(&name_token.lexeme),
            ty,
            value,
            span: name_token.span(),
            storage: None,
            scope_id: None,
        })
    }

    /// equalize := IDENT "=" expression ";"
    fn parse_equalize(&mut self) -> Result<Equalize> {
        let name_token = self.tokens.consume_kind(TokenKind::Identifier)?;
        self.tokens.consume_value("=")?;
        let value = self.parse_expression()?;
        self.tokens.consume_value(";")?;
        Ok(Equalize {
            name: Symbol::intern(&name_token.lexeme),
            value,
            span: name_token.span(),
            ty: None,
            storage: None,
            scope_id: None,
        })
    }

    /// if := "if" condition "do" scope
    fn parse_if_structure(&mut self) -> Result<IfStmt> {
        self.tokens.consume_value("if")?;
        let condition = self.parse_condition()?;
        self.tokens.consume_value("do")?;
        let scope = self.parse_scope()?;
        Ok(IfStmt { condition, scope })
    }

    /// while := "while" condition "do" scope
    fn parse_while_structure(&mut self) -> Result<WhileStmt> {
        self.tokens.consume_value("while")?;
        let condition = self.parse_condition()?;
        self.tokens.consume_value("do")?;
        let scope = self.parse_scope()?;
        Ok(WhileStmt { condition, scope })
    }

    /// print := "print" "(" expression ")" ";"
    fn parse_print(&mut self) -> Result<PrintStmt> {
        self.tokens.consume_value("print")?;
        self.tokens.consume_value("(")?;
        let expression = self.parse_expression()?;
        self.tokens.consume_value(")")?;
        self.tokens.consume_value(";")?;
        Ok(PrintStmt { expression })
    }

    /// return := "return" expression ";"
    fn parse_return_statement(&mut self) -> Result<ReturnStmt> {
        let return_token = self.tokens.consume_value("return")?;
        let expression = self.parse_expression()?;
        self.tokens.consume_value(";")?;
        Ok(ReturnStmt {
            expression,
            span: return_token.span(),
        })
    }

    /// condition := expression
    ///            | expression COND_OP expression
    ///            | "(" condition ")" LOGIC_OP "(" condition ")"
    fn parse_condition(&mut self) -> Result<Expr> {
        if self.tokens.peek_lexeme() == "(" {
            self.tokens.consume_value("(")?;
            let mut node = self.parse_condition()?;
            self.tokens.consume_value(")")?;
            while self
                .tokens
                .peek(0)
                .is_some_and(|t| t.kind == TokenKind::LogicalOperator)
            {
                let op_token = self.tokens.consume_kind(TokenKind::LogicalOperator)?;
                let op = cond_op(&op_token)?;
                self.tokens.consume_value("(")?;
                let right = self.parse_condition()?;
                self.tokens.consume_value(")")?;
                node = Expr::Condition(Box::new(ConditionExpr {
                    left: node,
                    op,
                    right,
                    span: op_token.span(),
                    ty: None,
                }));
            }
            Ok(node)
        } else {
            let left = self.parse_expression()?;
            if !self
                .tokens
                .peek(0)
                .is_some_and(|t| t.kind == TokenKind::ConditionalOperator)
            {
                return Ok(left);
            }
            let op_token = self.tokens.consume_kind(TokenKind::ConditionalOperator)?;
            let op = cond_op(&op_token)?;
            let right = self.parse_expression()?;
            Ok(Expr::Condition(Box::new(ConditionExpr {
                left,
                op,
                right,
                span: op_token.span(),
                ty: None,
            })))
        }
    }

    /// expression := term (("+"|"-") term)*
    fn parse_expression(&mut self) -> Result<Expr> {
        let mut node = self.parse_term()?;
        while matches!(self.tokens.peek_lexeme(), "+" | "-") {
            let op_token = self.tokens.consume_kind(TokenKind::Operator)?;
            let op = if op_token.lexeme == "+" {
                ArithOp::Add
            } else {
                ArithOp::Sub
            };
            let right = self.parse_term()?;
            node = Expr::Binary(Box::new(BinaryExpr {
                left: node,
                op,
                right,
                span: op_token.span(),
                ty: None,
            }));
        }
        Ok(node)
    }

    /// term := factor (("*"|"/") factor)*
    fn parse_term(&mut self) -> Result<Expr> {
        let mut node = self.parse_factor()?;
        while matches!(self.tokens.peek_lexeme(), "*" | "/") {
            let op_token = self.tokens.consume_kind(TokenKind::Operator)?;
            let op = if op_token.lexeme == "*" {
                ArithOp::Mul
            } else {
                ArithOp::Div
            };
            let right = self.parse_factor()?;
            node = Expr::Binary(Box::new(BinaryExpr {
                left: node,
                op,
                right,
                span: op_token.span(),
                ty: None,
            }));
        }
        Ok(node)
    }

    /// factor := IDENT | NUMBER | SIGNED_NUMBER | BOOLEAN
    ///         | "(" expression ")" | call
    fn parse_factor(&mut self) -> Result<Expr> {
        let token = self.tokens.peek(0).ok_or_else(|| ParseError::UnexpectedEof {
            expected: "'(', IDENTIFIER, NUMBER, SIGNED_NUMBER, or BOOLEAN".to_string(),
        })?;
        if token.lexeme == "(" {
            self.tokens.consume_value("(")?;
            let node = self.parse_expression()?;
            self.tokens.consume_value(")")?;
            return Ok(node);
        }
        match token.kind {
            TokenKind::Identifier => {
                if self.tokens.peek(1).is_some_and(|t| t.lexeme == "(") {
                    return Ok(Expr::Call(self.parse_function_call()?));
                }
                let token = self.tokens.consume_kind(TokenKind::Identifier)?;
                Ok(Expr::Factor(Factor {
                    kind: FactorKind::Var(Symbol::intern(&token.lexeme)),
                    span: token.span(),
                    ty: None,
                    storage: None,
                    scope_id: None,
                }))
            }
            TokenKind::Number | TokenKind::SignedNumber => {
                let token = self.tokens.consume(&token.kind.to_string())?;
                Ok(Expr::Factor(Factor {
                    kind: FactorKind::Int(token.lexeme.clone()),
                    span: token.span(),
                    ty: None,
                    storage: None,
                    scope_id: None,
                }))
            }
            TokenKind::Boolean => {
                let token = self.tokens.consume_kind(TokenKind::Boolean)?;
                Ok(Expr::Factor(Factor {
                    kind: FactorKind::Bool(token.lexeme == "true"),
                    span: token.span(),
                    ty: None,
                    storage: None,
                    scope_id: None,
                }))
            }
            _ => Err(ParseError::SyntaxError {
                expected: "'(', IDENTIFIER, NUMBER, SIGNED_NUMBER, or BOOLEAN".to_string(),
                found: token.lexeme.clone(),
                line: token.line,
                column: token.column,
            }),
        }
    }

    fn parse_ty(&mut self) -> Result<Ty> {
        let token = self.tokens.consume_kind(TokenKind::Type)?;
        match token.lexeme.as_str() {
            "int" => Ok(Ty::Int),
            "bool" => Ok(Ty::Bool),
            _ => Err(ParseError::SyntaxError {
                expected: "TYPE".to_string(),
                found: token.lexeme.clone(),
                line: token.line,
                column: token.column,
            }),
        }
    }
}

fn cond_op(token: &Token) -> Result<CondOp> {
    let op = match token.lexeme.as_str() {
        "<" => CondOp::Lt,
        ">" => CondOp::Gt,
        "<=" => CondOp::Le,
        ">=" => CondOp::Ge,
        "==" => CondOp::Eq,
        "!=" => CondOp::Ne,
        "&" => CondOp::And,
        "|" => CondOp::Or,
        _ => {
            return Err(ParseError::SyntaxError {
                expected: "comparison or logical operator".to_string(),
                found: token.lexeme.clone(),
                line: token.line,
                column: token.column,
            })
        }
    };
    Ok(op)
}
