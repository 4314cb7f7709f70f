//! Semantic pre-checks run before LIR generation.
//!
//! Scope-stack driven: `break`/`continue` must sit inside a loop scope, and
//! `return` statements must agree with the enclosing function's return type
//! on whether a value is present. Diagnostics are collected, not fatal; the
//! pipeline proceeds past them.

use crate::ast::{Compound, Stmt, TransUnit, Type};
use crate::symbols::ScopeStack;

/// Check a whole translation unit, returning the collected diagnostics.
pub fn check_unit(unit: &TransUnit) -> Vec<String> {
    let mut errors = Vec::new();
    let mut scopes = ScopeStack::new();
    scopes.enter_block();
    for decl in unit.decls() {
        scopes.define(decl.name(), decl.span);
    }
    for func in unit.functions() {
        scopes.enter_method(func.return_type.clone());
        for param in &func.params {
            scopes.define(param.name.name.clone(), param.span);
        }
        check_compound(&func.body, &mut scopes, &mut errors);
        scopes.leave();
    }
    scopes.leave();
    errors
}

fn check_compound(block: &Compound, scopes: &mut ScopeStack, errors: &mut Vec<String>) {
    scopes.enter_block();
    for stmt in &block.stmts {
        check_stmt(stmt, scopes, errors);
    }
    scopes.leave();
}

fn check_stmt(stmt: &Stmt, scopes: &mut ScopeStack, errors: &mut Vec<String>) {
    match stmt {
        Stmt::Break { span } => {
            if !scopes.in_loop() {
                errors.push(format!(
                    "Break statement cannot be used outside of a for or while loop, line: {} col: {}",
                    span.line, span.col
                ));
            }
        }
        Stmt::Continue { span } => {
            if !scopes.in_loop() {
                errors.push(format!(
                    "Continue statement cannot be used outside of a for or while loop, line: {} col: {}",
                    span.line, span.col
                ));
            }
        }
        Stmt::Return { value, span } => {
            let returns_unit = matches!(
                scopes.return_type(),
                Some(Type::Unit) | Some(Type::Void) | None
            );
            match value {
                Some(_) if returns_unit => errors.push(format!(
                    "Return with a value in a function returning unit, line: {} col: {}",
                    span.line, span.col
                )),
                None if !returns_unit => errors.push(format!(
                    "Return without a value in a function returning a value, line: {} col: {}",
                    span.line, span.col
                )),
                _ => {}
            }
        }
        Stmt::Decl(decl) => {
            scopes.define(decl.name(), decl.span);
        }
        Stmt::Compound(block) => check_compound(block, scopes, errors),
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            check_compound(then_branch, scopes, errors);
            if let Some(alt) = else_branch {
                check_stmt(alt, scopes, errors);
            }
        }
        Stmt::While { body, .. } | Stmt::For { body, .. } | Stmt::DoWhile { body, .. } => {
            scopes.enter_loop();
            check_compound(body, scopes, errors);
            scopes.leave();
        }
        Stmt::ExprStmt { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, FunctionDef, Ident, Item, Span};

    fn span_at(line: usize, col: usize) -> Span {
        Span::new(0, 0, line, col)
    }

    fn function(return_type: Type, stmts: Vec<Stmt>) -> FunctionDef {
        let mut body = Compound::new(Span::default());
        for stmt in stmts.into_iter().rev() {
            body.add_stmt_front(stmt);
        }
        FunctionDef {
            name: Ident::new("f", Span::default()),
            params: vec![],
            return_type,
            body,
            span: Span::default(),
        }
    }

    fn unit_with(func: FunctionDef) -> TransUnit {
        let mut unit = TransUnit::new(Span::default());
        unit.add_item(Item::Function(func));
        unit
    }

    #[test]
    fn test_break_outside_loop_is_reported_with_position() {
        let unit = unit_with(function(
            Type::Unit,
            vec![Stmt::Break {
                span: span_at(3, 4),
            }],
        ));
        let errors = check_unit(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Break statement"));
        assert!(errors[0].contains("line: 3 col: 4"));
    }

    #[test]
    fn test_break_inside_loop_is_fine() {
        let mut body = Compound::new(Span::default());
        body.add_stmt_front(Stmt::Break {
            span: Span::default(),
        });
        let unit = unit_with(function(
            Type::Unit,
            vec![Stmt::While {
                cond: Expr::BoolLit {
                    value: true,
                    span: Span::default(),
                },
                body,
                span: Span::default(),
            }],
        ));
        assert!(check_unit(&unit).is_empty());
    }

    #[test]
    fn test_continue_outside_loop_is_reported() {
        let unit = unit_with(function(
            Type::Unit,
            vec![Stmt::Continue {
                span: span_at(1, 0),
            }],
        ));
        let errors = check_unit(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Continue statement"));
    }

    #[test]
    fn test_return_value_in_unit_function() {
        let unit = unit_with(function(
            Type::Unit,
            vec![Stmt::Return {
                value: Some(Expr::IntLit {
                    value: 1,
                    span: Span::default(),
                }),
                span: span_at(2, 8),
            }],
        ));
        let errors = check_unit(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("returning unit"));
    }

    #[test]
    fn test_bare_return_in_value_function() {
        let unit = unit_with(function(
            Type::Int,
            vec![Stmt::Return {
                value: None,
                span: span_at(5, 2),
            }],
        ));
        let errors = check_unit(&unit);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("without a value"));
    }

    #[test]
    fn test_matching_returns_are_fine() {
        let unit = unit_with(function(
            Type::Int,
            vec![Stmt::Return {
                value: Some(Expr::IntLit {
                    value: 0,
                    span: Span::default(),
                }),
                span: Span::default(),
            }],
        ));
        assert!(check_unit(&unit).is_empty());
    }
}
