//! LIR generation: syntax-directed translation from the AST to labeled
//! three-address code.
//!
//! Expressions lower to an optional [`LlComponent`] holding their result
//! (literals materialize directly, with no statement emitted); statements
//! and declarations lower to `None`. A handler that cannot proceed writes a
//! diagnostic to stderr and produces a partial result, so one run can
//! surface multiple problems per file.

mod control_flow;

use std::rc::Rc;

use crate::ast::{
    Compound, Decl, Expr, FunctionDef, Ident, PointerOp, Stmt, TransUnit, Type,
};
use crate::lir::{LlBuilder, LlBuildersList, LlComponent, LlLocation, LlStmt};
use crate::symbols::SymbolTable;

/// Per-function code generator, driving one [`LlBuilder`] and one
/// [`SymbolTable`].
pub struct LirGen<'a> {
    builder: &'a mut LlBuilder,
    symbols: &'a mut SymbolTable,
}

impl<'a> LirGen<'a> {
    pub fn new(builder: &'a mut LlBuilder, symbols: &'a mut SymbolTable) -> Self {
        LirGen { builder, symbols }
    }

    /// Lower a function definition: a labeled empty statement at the
    /// function's name, then the body.
    pub fn gen_function(&mut self, func: &FunctionDef) {
        let name = func.name.name.clone();
        self.builder.append_labeled(&name, LlStmt::Empty);
        self.symbols.define_type(&name, func.return_type.clone());
        for param in &func.params {
            self.symbols.define_var(
                &param.name.name,
                LlComponent::Location(LlLocation::Var(param.name.name.clone())),
            );
            self.symbols.define_type(&param.name.name, param.ty.clone());
        }
        self.gen_compound(&func.body);
    }

    pub fn gen_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Return { value, .. } => {
                let value = value.as_ref().and_then(|e| self.gen_expr(e));
                self.builder.append(LlStmt::Return { value });
            }
            Stmt::ExprStmt { expr, .. } => {
                self.gen_expr(expr);
            }
            Stmt::Compound(block) => self.gen_compound(block),
            Stmt::Decl(decl) => self.gen_decl(decl),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => self.gen_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body, .. } => self.gen_while(cond, body),
            Stmt::DoWhile { body, cond, .. } => self.gen_do_while(body, cond),
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => self.gen_for(init.as_ref(), cond.as_ref(), update.as_ref(), body),
            Stmt::Break { span } => self.gen_break(*span),
            Stmt::Continue { span } => self.gen_continue(*span),
        }
    }

    pub fn gen_compound(&mut self, block: &Compound) {
        for stmt in &block.stmts {
            self.gen_stmt(stmt);
        }
        if let Some(expr) = &block.trailing {
            self.gen_expr(expr);
        }
    }

    fn gen_decl(&mut self, decl: &Decl) {
        let name = decl.name().to_string();
        self.symbols
            .define_var(&name, LlComponent::Location(LlLocation::Var(name.clone())));
        if let Some(ty) = &decl.ty {
            self.symbols.define_type(&name, ty.clone());
        }
        if let Some(init) = &decl.init
            && let Some(value) = self.gen_expr(init)
        {
            self.builder.append(LlStmt::AssignRegular {
                dst: LlLocation::Var(name),
                src: value,
            });
        }
    }

    /// Lower an expression, returning the component holding its result.
    pub fn gen_expr(&mut self, expr: &Expr) -> Option<LlComponent> {
        match expr {
            Expr::Ident(id) => Some(match self.symbols.var(&id.name) {
                Some(component) => component.clone(),
                None => LlComponent::var(id.name.clone()),
            }),
            Expr::IntLit { value, .. } => Some(LlComponent::int(*value)),
            Expr::BoolLit { value, .. } => {
                Some(LlComponent::Literal(crate::lir::LlLiteral::Bool(*value)))
            }
            Expr::CharLit { value, .. } => {
                Some(LlComponent::Literal(crate::lir::LlLiteral::Char(*value)))
            }
            Expr::StrLit { value, .. } => {
                // Strings are the one literal shared through a temp.
                let dst = self.builder.generate_str_temp();
                self.builder.append(LlStmt::AssignRegular {
                    dst: dst.clone(),
                    src: LlComponent::Literal(crate::lir::LlLiteral::Str(value.clone())),
                });
                Some(LlComponent::Location(dst))
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let left = self.gen_expr(lhs)?;
                let right = self.gen_expr(rhs)?;
                let dst = self.builder.generate_temp();
                self.builder.append(LlStmt::AssignBinary {
                    dst: dst.clone(),
                    lhs: left,
                    op: op.clone(),
                    rhs: right,
                });
                Some(LlComponent::Location(dst))
            }
            Expr::Unary { op, operand, .. } => {
                let value = self.gen_expr(operand)?;
                let dst = self.builder.generate_temp();
                self.builder.append(LlStmt::AssignUnary {
                    dst: dst.clone(),
                    op: op.clone(),
                    operand: value,
                });
                Some(LlComponent::Location(dst))
            }
            Expr::Paren { inner, .. } => self.gen_expr(inner),
            Expr::Call { callee, args, .. } => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    if let Some(component) = self.gen_expr(arg) {
                        lowered.push(component);
                    }
                }
                let ret = self.builder.generate_temp();
                self.builder.append(LlStmt::MethodCall {
                    name: callee.name.clone(),
                    args: lowered,
                    ret: ret.clone(),
                });
                Some(LlComponent::Location(ret))
            }
            Expr::Field { base, field, .. } => {
                self.gen_field(base, field).map(LlComponent::Location)
            }
            Expr::Pointer {
                op: PointerOp::AddressOf,
                operand,
                ..
            } => {
                let src = self.gen_lvalue(operand)?;
                let dst = self.builder.generate_temp();
                self.builder.append(LlStmt::AssignAddr {
                    dst: dst.clone(),
                    src,
                });
                Some(LlComponent::Location(dst))
            }
            Expr::Pointer {
                op: PointerOp::Deref,
                operand,
                ..
            } => {
                let base = self.gen_lvalue(operand)?;
                Some(LlComponent::Location(LlLocation::Deref(Box::new(base))))
            }
            Expr::Subscript { .. } => self.gen_subscript(expr).map(LlComponent::Location),
            Expr::Assign { lhs, op, rhs, .. } => self.gen_assign(lhs, op, rhs),
            // `++`/`--` fold to an in-place step by one; the prefix and
            // postfix forms both yield the operand location.
            Expr::Update { op, operand, .. } => {
                let dst = self.gen_lvalue(operand)?;
                let step = if op.starts_with('-') { "-" } else { "+" };
                self.builder.append(LlStmt::AssignBinary {
                    dst: dst.clone(),
                    lhs: LlComponent::Location(dst.clone()),
                    op: step.into(),
                    rhs: LlComponent::int(1),
                });
                Some(LlComponent::Location(dst))
            }
        }
    }

    /// Lower an expression in l-value position to a location.
    pub fn gen_lvalue(&mut self, expr: &Expr) -> Option<LlLocation> {
        match expr {
            Expr::Ident(id) => Some(match self.symbols.var(&id.name) {
                Some(LlComponent::Location(loc)) => loc.clone(),
                _ => LlLocation::Var(id.name.clone()),
            }),
            Expr::Subscript { .. } => self.gen_subscript(expr),
            Expr::Pointer {
                op: PointerOp::Deref,
                operand,
                ..
            } => {
                let base = self.gen_lvalue(operand)?;
                Some(LlLocation::Deref(Box::new(base)))
            }
            Expr::Field { base, field, .. } => self.gen_field(base, field),
            Expr::Paren { inner, .. } => self.gen_lvalue(inner),
            _ => {
                let span = expr.span();
                eprintln!(
                    "Error: expression is not an l-value, line: {} col: {}",
                    span.line, span.col
                );
                None
            }
        }
    }

    fn gen_assign(&mut self, lhs: &Expr, op: &str, rhs: &Expr) -> Option<LlComponent> {
        let dst = self.gen_lvalue(lhs)?;
        let value = self.gen_expr(rhs)?;
        if op == "=" {
            if matches!(dst, LlLocation::Deref(_)) {
                self.builder.append(LlStmt::AssignDeref {
                    dst: dst.clone(),
                    src: value,
                });
            } else {
                self.builder.append(LlStmt::AssignRegular {
                    dst: dst.clone(),
                    src: value,
                });
            }
        } else {
            // `lhs op= rhs` folds into a single binary assignment.
            let stripped = op.trim_end_matches('=').to_string();
            self.builder.append(LlStmt::AssignBinary {
                dst: dst.clone(),
                lhs: LlComponent::Location(dst.clone()),
                op: stripped,
                rhs: value,
            });
        }
        Some(LlComponent::Location(dst))
    }

    fn gen_field(&mut self, base: &Expr, field: &Ident) -> Option<LlLocation> {
        let base_loc = self.gen_lvalue(base)?;
        let offset = self.field_offset(base, &field.name);
        Some(LlLocation::Struct {
            base: Box::new(base_loc),
            field: field.name.clone(),
            offset,
        })
    }

    /// Byte offset of `field` inside the struct type of `base`: the sum of
    /// the widths of the preceding fields. Unknown types resolve to zero
    /// with a diagnostic (best-effort partial LIR).
    fn field_offset(&mut self, base: &Expr, field: &str) -> i64 {
        let Some(base_name) = base.name() else {
            return 0;
        };
        let Some(ty) = self.symbols.type_of(base_name).cloned() else {
            eprintln!("Error: unknown struct base {base_name}");
            return 0;
        };
        let resolved = self.symbols.resolve_type(&ty).clone();
        let resolved = match resolved {
            Type::Pointer { target, .. } | Type::Reference { target, .. } => {
                self.symbols.resolve_type(&target).clone()
            }
            other => other,
        };
        let Type::Struct { fields, .. } = resolved else {
            eprintln!("Error: {base_name} is not a struct");
            return 0;
        };
        let mut offset = 0;
        for f in &fields {
            if f.name.name == field {
                return offset;
            }
            offset += f.ty.width();
        }
        eprintln!("Error: no field {field} on struct {base_name}");
        0
    }

    /// Lower a possibly nested subscript chain to an array location whose
    /// index is the row-major offset polynomial.
    ///
    /// The dimension list is ordered outermost-first in the type; the walk
    /// here goes innermost-to-outermost (starting at the deepest subscript
    /// node and climbing through the bases), so the cumulative multiplier
    /// starts at the element width and picks up dimension sizes from the
    /// back of the list.
    fn gen_subscript(&mut self, expr: &Expr) -> Option<LlLocation> {
        let Some(base_name) = expr.name().map(str::to_string) else {
            let span = expr.span();
            eprintln!(
                "Error: subscript base has no name, line: {} col: {}",
                span.line, span.col
            );
            return None;
        };
        let Some(ty) = self.symbols.type_of(&base_name).cloned() else {
            eprintln!("Error: {base_name} is not an array.");
            return None;
        };
        let Type::Array { elem, dims } = self.symbols.resolve_type(&ty).clone() else {
            eprintln!("Error: {base_name} is not an array.");
            return None;
        };

        let mut sizes = Vec::with_capacity(dims.len());
        for dim in &dims {
            match dim {
                Expr::IntLit { value, .. } => sizes.push(*value),
                _ => {
                    eprintln!("Error: non-constant dimension for array {base_name}");
                    return None;
                }
            }
        }

        let mut multiplier = elem.width();
        let mut level = sizes.len();
        let mut offset: Option<LlLocation> = None;
        let mut current = expr;

        while let Expr::Subscript { base, index, .. } = current {
            if level == 0 {
                eprintln!("Error: too many subscripts for array {base_name}");
                return None;
            }
            let dim_size = sizes[level - 1];

            let idx = self.gen_expr(index)?;
            let mul = self.builder.generate_temp();
            self.builder.append(LlStmt::AssignBinary {
                dst: mul.clone(),
                lhs: idx,
                op: "*".into(),
                rhs: LlComponent::int(multiplier),
            });

            offset = Some(match offset.take() {
                None => mul,
                Some(prev) => {
                    let add = self.builder.generate_temp();
                    self.builder.append(LlStmt::AssignBinary {
                        dst: add.clone(),
                        lhs: LlComponent::Location(prev),
                        op: "+".into(),
                        rhs: LlComponent::Location(mul),
                    });
                    add
                }
            });

            multiplier *= dim_size;
            level -= 1;
            current = base;
        }

        let index = offset?;
        Some(LlLocation::Array {
            name: base_name,
            index: Box::new(LlComponent::Location(index)),
        })
    }
}

/// Lower a translation unit: globals and typedefs registered first, then
/// one builder and one symbol table per function definition.
pub fn build_lir(unit: &TransUnit) -> LlBuildersList {
    let mut list = LlBuildersList::new();

    let mut globals = SymbolTable::new("global");
    for decl in unit.decls() {
        let name = decl.name().to_string();
        globals.define_var(&name, LlComponent::Location(LlLocation::Var(name.clone())));
        if let Some(ty) = &decl.ty {
            globals.define_type(&name, ty.clone());
        }
        list.add_global(LlLocation::Var(name));
    }
    for ty in unit.typedefs() {
        match ty {
            Type::Typedef { aliased, alias } => {
                globals.define_type(&alias.name, (**aliased).clone());
            }
            Type::Struct {
                name: Some(name), ..
            } => {
                globals.define_type(&name.name, ty.clone());
            }
            _ => {}
        }
    }
    let globals = Rc::new(globals);

    for func in unit.functions() {
        let mut builder = LlBuilder::new(&func.name.name);
        for param in &func.params {
            builder.add_param(LlLocation::Var(param.name.name.clone()));
        }
        let mut table = SymbolTable::with_parent(&func.name.name, Rc::clone(&globals));
        LirGen::new(&mut builder, &mut table).gen_function(func);
        list.add_builder(builder);
        list.add_symbol_table(table);
    }

    list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn ident(name: &str) -> Ident {
        Ident::new(name, Span::default())
    }

    fn var(name: &str) -> Expr {
        Expr::Ident(ident(name))
    }

    fn int(value: i64) -> Expr {
        Expr::IntLit {
            value,
            span: Span::default(),
        }
    }

    fn rendered(builder: &LlBuilder) -> Vec<String> {
        builder
            .statements()
            .values()
            .map(|s| s.to_string())
            .collect()
    }

    fn table_with_vars(names: &[&str]) -> SymbolTable {
        let mut table = SymbolTable::new("test");
        for name in names {
            table.define_var(*name, LlComponent::var(*name));
        }
        table
    }

    #[test]
    fn test_binary_expr_is_left_before_right() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["a", "b", "c"]);
        let expr = Expr::Binary {
            op: "+".into(),
            lhs: Box::new(Expr::Binary {
                op: "*".into(),
                lhs: Box::new(var("a")),
                rhs: Box::new(var("b")),
                span: Span::default(),
            }),
            rhs: Box::new(var("c")),
            span: Span::default(),
        };
        let result = LirGen::new(&mut builder, &mut table).gen_expr(&expr);
        assert_eq!(result, Some(LlComponent::var("#_t1")));
        assert_eq!(rendered(&builder), vec!["#_t0 = a * b", "#_t1 = #_t0 + c"]);
    }

    #[test]
    fn test_multi_dim_subscript_offset_polynomial() {
        // a: int[3][4], access a[i][j] with element width 8.
        // Expected offset: ((i * 4) + j) * 8 emitted as
        //   t0 = j * 8; t1 = i * 32; t2 = t0 + t1; result a[t2].
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["a", "i", "j"]);
        table.define_type(
            "a",
            Type::Array {
                elem: Box::new(Type::Int),
                dims: vec![int(3), int(4)],
            },
        );
        let access = Expr::Subscript {
            base: Box::new(Expr::Subscript {
                base: Box::new(var("a")),
                index: Box::new(var("i")),
                span: Span::default(),
            }),
            index: Box::new(var("j")),
            span: Span::default(),
        };
        let loc = LirGen::new(&mut builder, &mut table)
            .gen_lvalue(&access)
            .unwrap();
        assert_eq!(
            rendered(&builder),
            vec!["#_t0 = j * 8", "#_t1 = i * 32", "#_t2 = #_t0 + #_t1"]
        );
        assert_eq!(loc.to_string(), "a[#_t2]");
    }

    #[test]
    fn test_subscript_on_non_array_yields_none() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["x", "i"]);
        table.define_type("x", Type::Int);
        let access = Expr::Subscript {
            base: Box::new(var("x")),
            index: Box::new(var("i")),
            span: Span::default(),
        };
        let loc = LirGen::new(&mut builder, &mut table).gen_lvalue(&access);
        assert!(loc.is_none());
        assert!(builder.statements().is_empty());
    }

    #[test]
    fn test_too_many_subscripts_diagnosed() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["a", "i", "j"]);
        table.define_type(
            "a",
            Type::Array {
                elem: Box::new(Type::Int),
                dims: vec![int(3)],
            },
        );
        let access = Expr::Subscript {
            base: Box::new(Expr::Subscript {
                base: Box::new(var("a")),
                index: Box::new(var("i")),
                span: Span::default(),
            }),
            index: Box::new(var("j")),
            span: Span::default(),
        };
        assert!(
            LirGen::new(&mut builder, &mut table)
                .gen_lvalue(&access)
                .is_none()
        );
    }

    #[test]
    fn test_plain_assignment() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["y"]);
        let assign = Expr::Assign {
            lhs: Box::new(var("y")),
            op: "=".into(),
            rhs: Box::new(int(1)),
            span: Span::default(),
        };
        let result = LirGen::new(&mut builder, &mut table).gen_expr(&assign);
        assert_eq!(result, Some(LlComponent::var("y")));
        assert_eq!(rendered(&builder), vec!["y = 1"]);
    }

    #[test]
    fn test_compound_assignment_folds_to_binary() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["x"]);
        let assign = Expr::Assign {
            lhs: Box::new(var("x")),
            op: "<<=".into(),
            rhs: Box::new(int(2)),
            span: Span::default(),
        };
        LirGen::new(&mut builder, &mut table).gen_expr(&assign);
        assert_eq!(rendered(&builder), vec!["x = x << 2"]);
    }

    #[test]
    fn test_assignment_through_deref_stores() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["p"]);
        let assign = Expr::Assign {
            lhs: Box::new(Expr::Pointer {
                op: PointerOp::Deref,
                operand: Box::new(var("p")),
                span: Span::default(),
            }),
            op: "=".into(),
            rhs: Box::new(int(7)),
            span: Span::default(),
        };
        LirGen::new(&mut builder, &mut table).gen_expr(&assign);
        assert_eq!(rendered(&builder), vec!["*p = 7"]);
    }

    #[test]
    fn test_address_of_emits_assign_addr() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["x"]);
        let expr = Expr::Pointer {
            op: PointerOp::AddressOf,
            operand: Box::new(var("x")),
            span: Span::default(),
        };
        let result = LirGen::new(&mut builder, &mut table).gen_expr(&expr);
        assert_eq!(result, Some(LlComponent::var("#_t0")));
        assert_eq!(rendered(&builder), vec!["#_t0 = &x"]);
    }

    #[test]
    fn test_call_lowers_args_in_source_order() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["a"]);
        let call = Expr::Call {
            callee: ident("use"),
            args: vec![var("a"), int(3)],
            span: Span::default(),
        };
        let result = LirGen::new(&mut builder, &mut table).gen_expr(&call);
        assert_eq!(result, Some(LlComponent::var("#_t0")));
        assert_eq!(rendered(&builder), vec!["#_t0 = use(a,3,)"]);
    }

    #[test]
    fn test_string_literal_goes_through_str_temp() {
        let mut builder = LlBuilder::new("f");
        let mut table = SymbolTable::new("f");
        let result = LirGen::new(&mut builder, &mut table).gen_expr(&Expr::StrLit {
            value: "hi".into(),
            span: Span::default(),
        });
        assert_eq!(result, Some(LlComponent::var("#str_t0")));
        assert_eq!(rendered(&builder), vec!["#str_t0 = hi"]);
    }

    #[test]
    fn test_field_access_offset() {
        let mut builder = LlBuilder::new("f");
        let mut table = table_with_vars(&["pt"]);
        table.define_type(
            "pt",
            Type::Struct {
                name: Some(ident("Point")),
                fields: vec![
                    crate::ast::FieldDecl {
                        name: ident("x"),
                        ty: Type::Int,
                        span: Span::default(),
                    },
                    crate::ast::FieldDecl {
                        name: ident("y"),
                        ty: Type::Int,
                        span: Span::default(),
                    },
                ],
            },
        );
        let access = Expr::Field {
            base: Box::new(var("pt")),
            field: ident("y"),
            arrow: false,
            span: Span::default(),
        };
        let loc = LirGen::new(&mut builder, &mut table)
            .gen_lvalue(&access)
            .unwrap();
        match loc {
            LlLocation::Struct { field, offset, .. } => {
                assert_eq!(field, "y");
                assert_eq!(offset, 8);
            }
            other => panic!("expected struct location, got {other:?}"),
        }
    }

    #[test]
    fn test_declaration_with_initializer() {
        let mut builder = LlBuilder::new("f");
        let mut table = SymbolTable::new("f");
        let decl = Decl {
            mutable: true,
            declarator: crate::ast::Declarator::Ident(ident("x")),
            ty: Some(Type::Int),
            init: Some(int(5)),
            span: Span::default(),
        };
        LirGen::new(&mut builder, &mut table).gen_stmt(&Stmt::Decl(decl));
        assert_eq!(rendered(&builder), vec!["x = 5"]);
        assert!(table.var("x").is_some());
        assert_eq!(table.type_of("x"), Some(&Type::Int));
    }

    #[test]
    fn test_declaration_without_initializer_emits_nothing() {
        let mut builder = LlBuilder::new("f");
        let mut table = SymbolTable::new("f");
        let decl = Decl {
            mutable: false,
            declarator: crate::ast::Declarator::Ident(ident("x")),
            ty: Some(Type::Bool),
            init: None,
            span: Span::default(),
        };
        LirGen::new(&mut builder, &mut table).gen_stmt(&Stmt::Decl(decl));
        assert!(builder.statements().is_empty());
        assert!(table.var("x").is_some());
    }

    #[test]
    fn test_function_definition_emits_name_label() {
        let mut builder = LlBuilder::new("main");
        let mut table = SymbolTable::new("main");
        let func = FunctionDef {
            name: ident("main"),
            params: vec![crate::ast::ParamDecl {
                name: ident("n"),
                ty: Type::Int,
                mutable: false,
                span: Span::default(),
            }],
            return_type: Type::Int,
            body: {
                let mut body = Compound::new(Span::default());
                body.add_stmt_front(Stmt::Return {
                    value: Some(var("n")),
                    span: Span::default(),
                });
                body
            },
            span: Span::default(),
        };
        LirGen::new(&mut builder, &mut table).gen_function(&func);
        let labels: Vec<&str> = builder.statements().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["main", "L0"]);
        assert_eq!(builder.statements()["main"], LlStmt::Empty);
        assert_eq!(builder.statements()["L0"].to_string(), "return n");
        assert_eq!(table.type_of("main"), Some(&Type::Int));
    }

    #[test]
    fn test_build_lir_registers_globals_and_typedefs() {
        let mut unit = TransUnit::new(Span::default());
        unit.add_item(crate::ast::Item::Decl(Decl {
            mutable: false,
            declarator: crate::ast::Declarator::Ident(ident("g")),
            ty: Some(Type::Int),
            init: None,
            span: Span::default(),
        }));
        unit.add_item(crate::ast::Item::Typedef(Type::Typedef {
            aliased: Box::new(Type::Int),
            alias: ident("Row"),
        }));
        unit.add_item(crate::ast::Item::Function(FunctionDef {
            name: ident("main"),
            params: vec![],
            return_type: Type::Unit,
            body: Compound::new(Span::default()),
            span: Span::default(),
        }));

        let list = build_lir(&unit);
        assert_eq!(list.global_vars, vec![LlLocation::Var("g".into())]);
        assert_eq!(list.builders.len(), 1);
        assert_eq!(list.symbol_tables.len(), 1);
        assert_eq!(list.symbol_tables[0].type_of("Row"), Some(&Type::Int));
        assert!(list.symbol_tables[0].var("g").is_some());
    }
}
