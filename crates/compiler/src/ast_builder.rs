//! AST builder: stack-based CST lowering.
//!
//! A single post-order traversal over the CST's named nodes drives exit
//! handlers dispatched on the grammar-symbol id of the C grammar. At the
//! moment a parent's exit handler runs, its children's AST nodes sit on top
//! of the working stack in reverse source order; the handler pops what it
//! needs, checks the variants, and pushes the parent node.
//!
//! Optional children are detected by peeking the stack top and attempting a
//! downcast (or by a CST field query) before consuming. A handler that
//! cannot proceed writes one diagnostic line to stderr and produces no
//! node; the parent then sees a missing child and reports in turn.
//! Construction always continues so one run can surface several errors.

use std::collections::HashMap;

use tree_sitter::{Language, Node};

use crate::ast::{
    Compound, Decl, Declarator, Expr, FieldDecl, FunctionDef, Ident, Include, Item, MacroDef,
    ParamDecl, PointerOp, Span, Stmt, TransUnit, Type,
};

/// Grammar symbols the builder handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymKind {
    Identifier,
    FieldIdentifier,
    TypeIdentifier,
    PrimitiveType,
    SizedTypeSpecifier,
    StructSpecifier,
    FieldDeclarationList,
    FieldDeclaration,
    TypeDefinition,
    TypeQualifier,
    StorageClassSpecifier,
    ParameterList,
    ParameterDeclaration,
    Declaration,
    InitDeclarator,
    PointerDeclarator,
    ArrayDeclarator,
    AbstractPointerDeclarator,
    FunctionDeclarator,
    FunctionDefinition,
    BinaryExpression,
    UnaryExpression,
    PointerExpression,
    UpdateExpression,
    ParenthesizedExpression,
    AssignmentExpression,
    CallExpression,
    ArgumentList,
    FieldExpression,
    SubscriptExpression,
    NumberLiteral,
    TrueLiteral,
    FalseLiteral,
    CharLiteral,
    StringLiteral,
    ReturnStatement,
    ExpressionStatement,
    CompoundStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    BreakStatement,
    ContinueStatement,
    PreprocInclude,
    PreprocDef,
    PreprocFunctionDef,
    TranslationUnit,
    Comment,
}

const KIND_NAMES: &[(&str, SymKind)] = &[
    ("identifier", SymKind::Identifier),
    ("field_identifier", SymKind::FieldIdentifier),
    ("type_identifier", SymKind::TypeIdentifier),
    ("primitive_type", SymKind::PrimitiveType),
    ("sized_type_specifier", SymKind::SizedTypeSpecifier),
    ("struct_specifier", SymKind::StructSpecifier),
    ("field_declaration_list", SymKind::FieldDeclarationList),
    ("field_declaration", SymKind::FieldDeclaration),
    ("type_definition", SymKind::TypeDefinition),
    ("type_qualifier", SymKind::TypeQualifier),
    ("storage_class_specifier", SymKind::StorageClassSpecifier),
    ("parameter_list", SymKind::ParameterList),
    ("parameter_declaration", SymKind::ParameterDeclaration),
    ("declaration", SymKind::Declaration),
    ("init_declarator", SymKind::InitDeclarator),
    ("pointer_declarator", SymKind::PointerDeclarator),
    ("array_declarator", SymKind::ArrayDeclarator),
    ("abstract_pointer_declarator", SymKind::AbstractPointerDeclarator),
    ("function_declarator", SymKind::FunctionDeclarator),
    ("function_definition", SymKind::FunctionDefinition),
    ("binary_expression", SymKind::BinaryExpression),
    ("unary_expression", SymKind::UnaryExpression),
    ("pointer_expression", SymKind::PointerExpression),
    ("update_expression", SymKind::UpdateExpression),
    ("parenthesized_expression", SymKind::ParenthesizedExpression),
    ("assignment_expression", SymKind::AssignmentExpression),
    ("call_expression", SymKind::CallExpression),
    ("argument_list", SymKind::ArgumentList),
    ("field_expression", SymKind::FieldExpression),
    ("subscript_expression", SymKind::SubscriptExpression),
    ("number_literal", SymKind::NumberLiteral),
    ("true", SymKind::TrueLiteral),
    ("false", SymKind::FalseLiteral),
    ("char_literal", SymKind::CharLiteral),
    ("string_literal", SymKind::StringLiteral),
    ("return_statement", SymKind::ReturnStatement),
    ("expression_statement", SymKind::ExpressionStatement),
    ("compound_statement", SymKind::CompoundStatement),
    ("if_statement", SymKind::IfStatement),
    ("else_clause", SymKind::ElseClause),
    ("while_statement", SymKind::WhileStatement),
    ("do_statement", SymKind::DoStatement),
    ("for_statement", SymKind::ForStatement),
    ("break_statement", SymKind::BreakStatement),
    ("continue_statement", SymKind::ContinueStatement),
    ("preproc_include", SymKind::PreprocInclude),
    ("preproc_def", SymKind::PreprocDef),
    ("preproc_function_def", SymKind::PreprocFunctionDef),
    ("translation_unit", SymKind::TranslationUnit),
    ("comment", SymKind::Comment),
];

/// Symbol-id dispatch table, resolved once from kind names so no grammar
/// integer is hard-coded.
struct DispatchTable {
    map: HashMap<u16, SymKind>,
}

impl DispatchTable {
    fn new(language: &Language) -> Self {
        let mut map = HashMap::new();
        for &(name, kind) in KIND_NAMES {
            let id = language.id_for_node_kind(name, true);
            if id != 0 {
                map.insert(id, kind);
            }
        }
        DispatchTable { map }
    }

    fn get(&self, id: u16) -> Option<SymKind> {
        self.map.get(&id).copied()
    }
}

/// Partially built AST nodes living on the working stack.
#[derive(Debug)]
enum StackItem {
    Expr(Expr),
    Stmt(Stmt),
    Type(Type),
    Declarator(Declarator),
    InitDecl(Declarator, Expr),
    Param(ParamDecl),
    Params(Vec<ParamDecl>),
    Args(Vec<Expr>),
    Field(FieldDecl),
    FieldList(Vec<FieldDecl>),
    Else(Box<Stmt>),
    /// `const` qualifier marker.
    Qualifier(Span),
    Func(FunctionDef),
    Item(Item),
    Unit(TransUnit),
}

/// One builder per file; the working stack is builder state, not global.
pub struct AstBuilder<'s> {
    source: &'s str,
    stack: Vec<StackItem>,
    kinds: DispatchTable,
    verbose: bool,
}

impl<'s> AstBuilder<'s> {
    pub fn new(source: &'s str, language: &Language, verbose: bool) -> Self {
        AstBuilder {
            source,
            stack: Vec::new(),
            kinds: DispatchTable::new(language),
            verbose,
        }
    }

    /// Lower the CST rooted at `root` to a translation unit.
    pub fn build(&mut self, root: Node) -> Option<TransUnit> {
        self.traverse(root);
        match self.stack.pop() {
            Some(StackItem::Unit(unit)) => Some(unit),
            _ => {
                eprintln!("Error: CST lowering did not produce a translation unit");
                None
            }
        }
    }

    fn traverse(&mut self, node: Node) {
        let kind = self.kinds.get(node.kind_id());
        if matches!(kind, Some(SymKind::Comment)) {
            return;
        }
        // Preprocessor directives and quoted literals are consumed as raw
        // text; descending into them would only litter the stack.
        let opaque = matches!(
            kind,
            Some(
                SymKind::PreprocInclude
                    | SymKind::PreprocDef
                    | SymKind::PreprocFunctionDef
                    | SymKind::StringLiteral
                    | SymKind::CharLiteral
            )
        );
        if !opaque {
            for i in 0..node.named_child_count() {
                if let Some(child) = node.named_child(i) {
                    self.traverse(child);
                }
            }
        }
        self.exit_node(node);
    }

    fn exit_node(&mut self, node: Node) {
        if self.verbose {
            let named = if node.is_named() { "Named" } else { "Not Named" };
            println!(
                "Exiting CST node: {named}, {}, symbol id: {}",
                node.kind(),
                node.kind_id()
            );
        }
        match self.kinds.get(node.kind_id()) {
            Some(SymKind::Identifier) | Some(SymKind::FieldIdentifier) => {
                self.exit_identifier(node)
            }
            Some(SymKind::TypeIdentifier) => self.exit_type_identifier(node),
            Some(SymKind::PrimitiveType) => self.exit_primitive_type(node),
            Some(SymKind::SizedTypeSpecifier) => self.exit_sized_type(node),
            Some(SymKind::StructSpecifier) => self.exit_struct_specifier(node),
            Some(SymKind::FieldDeclarationList) => self.exit_field_declaration_list(node),
            Some(SymKind::FieldDeclaration) => self.exit_field_declaration(node),
            Some(SymKind::TypeDefinition) => self.exit_type_definition(node),
            Some(SymKind::TypeQualifier) => {
                if self.text(&node) == "const" {
                    let span = self.span(&node);
                    self.stack.push(StackItem::Qualifier(span));
                }
            }
            // Storage classes (static, extern) carry no lowering weight.
            Some(SymKind::StorageClassSpecifier) => {}
            Some(SymKind::ParameterList) => self.exit_param_list(node),
            Some(SymKind::ParameterDeclaration) => self.exit_parameter(node),
            Some(SymKind::Declaration) => self.exit_declaration(node),
            Some(SymKind::InitDeclarator) => self.exit_init_declarator(node),
            Some(SymKind::PointerDeclarator) => self.exit_pointer_declarator(node),
            Some(SymKind::ArrayDeclarator) => self.exit_array_declarator(node),
            Some(SymKind::AbstractPointerDeclarator) => {
                self.stack
                    .push(StackItem::Declarator(Declarator::AbstractPointer));
            }
            // Function definitions consume the identifier and parameter
            // list directly; no function-declarator AST node is built.
            Some(SymKind::FunctionDeclarator) => {}
            Some(SymKind::FunctionDefinition) => self.exit_function_definition(node),
            Some(SymKind::BinaryExpression) => self.exit_binary_expr(node),
            Some(SymKind::UnaryExpression) => self.exit_unary_expr(node),
            Some(SymKind::PointerExpression) => self.exit_pointer_expr(node),
            Some(SymKind::UpdateExpression) => self.exit_update_expr(node),
            Some(SymKind::ParenthesizedExpression) => self.exit_paren_expr(node),
            Some(SymKind::AssignmentExpression) => self.exit_assign_expr(node),
            Some(SymKind::CallExpression) => self.exit_call_expr(node),
            Some(SymKind::ArgumentList) => self.exit_arg_list(node),
            Some(SymKind::FieldExpression) => self.exit_field_expr(node),
            Some(SymKind::SubscriptExpression) => self.exit_subscript_expr(node),
            Some(SymKind::NumberLiteral) => self.exit_literal_number(node),
            Some(SymKind::TrueLiteral) | Some(SymKind::FalseLiteral) => {
                let value = self.text(&node) == "true";
                let span = self.span(&node);
                self.stack.push(StackItem::Expr(Expr::BoolLit { value, span }));
            }
            Some(SymKind::CharLiteral) => self.exit_literal_char(node),
            Some(SymKind::StringLiteral) => self.exit_literal_string(node),
            Some(SymKind::ReturnStatement) => self.exit_return_statement(node),
            Some(SymKind::ExpressionStatement) => self.exit_expr_statement(node),
            Some(SymKind::CompoundStatement) => self.exit_compound_statement(node),
            Some(SymKind::IfStatement) => self.exit_if_statement(node),
            Some(SymKind::ElseClause) => self.exit_else_clause(node),
            Some(SymKind::WhileStatement) => self.exit_while_statement(node),
            Some(SymKind::DoStatement) => self.exit_do_statement(node),
            Some(SymKind::ForStatement) => self.exit_for_statement(node),
            Some(SymKind::BreakStatement) => {
                let span = self.span(&node);
                self.stack.push(StackItem::Stmt(Stmt::Break { span }));
            }
            Some(SymKind::ContinueStatement) => {
                let span = self.span(&node);
                self.stack.push(StackItem::Stmt(Stmt::Continue { span }));
            }
            Some(SymKind::PreprocInclude) => self.exit_preproc_include(node),
            Some(SymKind::PreprocDef) | Some(SymKind::PreprocFunctionDef) => {
                self.exit_preproc_def(node)
            }
            Some(SymKind::TranslationUnit) => self.exit_trans_unit(node),
            Some(SymKind::Comment) => {}
            None => {
                eprintln!(
                    "Error: unknown CST node kind '{}' (symbol id {})",
                    node.kind(),
                    node.kind_id()
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Stack helpers
    // ------------------------------------------------------------------

    fn push_type(&mut self, ty: Type) {
        self.stack.push(StackItem::Type(ty));
    }

    fn pop_expr(&mut self) -> Option<Expr> {
        if matches!(self.stack.last(), Some(StackItem::Expr(_)))
            && let Some(StackItem::Expr(expr)) = self.stack.pop()
        {
            return Some(expr);
        }
        None
    }

    fn pop_stmt(&mut self) -> Option<Stmt> {
        if matches!(self.stack.last(), Some(StackItem::Stmt(_)))
            && let Some(StackItem::Stmt(stmt)) = self.stack.pop()
        {
            return Some(stmt);
        }
        None
    }

    fn pop_type(&mut self) -> Option<Type> {
        if matches!(self.stack.last(), Some(StackItem::Type(_)))
            && let Some(StackItem::Type(ty)) = self.stack.pop()
        {
            return Some(ty);
        }
        None
    }

    fn pop_ident(&mut self) -> Option<Ident> {
        if matches!(self.stack.last(), Some(StackItem::Expr(Expr::Ident(_))))
            && let Some(StackItem::Expr(Expr::Ident(id))) = self.stack.pop()
        {
            return Some(id);
        }
        None
    }

    /// Pop a declarator: an explicit declarator node, or a bare identifier
    /// acting as the trivial declarator.
    fn pop_declarator(&mut self) -> Option<Declarator> {
        if matches!(self.stack.last(), Some(StackItem::Declarator(_)))
            && let Some(StackItem::Declarator(declarator)) = self.stack.pop()
        {
            return Some(declarator);
        }
        self.pop_ident().map(Declarator::Ident)
    }

    fn pop_params(&mut self) -> Option<Vec<ParamDecl>> {
        if matches!(self.stack.last(), Some(StackItem::Params(_)))
            && let Some(StackItem::Params(params)) = self.stack.pop()
        {
            return Some(params);
        }
        None
    }

    fn pop_args(&mut self) -> Option<Vec<Expr>> {
        if matches!(self.stack.last(), Some(StackItem::Args(_)))
            && let Some(StackItem::Args(args)) = self.stack.pop()
        {
            return Some(args);
        }
        None
    }

    fn pop_qualifier(&mut self) -> bool {
        if matches!(self.stack.last(), Some(StackItem::Qualifier(_))) {
            self.stack.pop();
            return true;
        }
        false
    }

    fn pop_else(&mut self) -> Option<Box<Stmt>> {
        if matches!(self.stack.last(), Some(StackItem::Else(_)))
            && let Some(StackItem::Else(stmt)) = self.stack.pop()
        {
            return Some(stmt);
        }
        None
    }

    /// Pop a block body, tolerating a bare statement where a compound was
    /// expected (`while (c) x = 1;`).
    fn pop_compound(&mut self) -> Option<Compound> {
        match self.pop_stmt()? {
            Stmt::Compound(block) => Some(block),
            other => {
                let mut block = Compound::new(other.span());
                block.add_stmt_front(other);
                Some(block)
            }
        }
    }

    // ------------------------------------------------------------------
    // Node helpers
    // ------------------------------------------------------------------

    fn text(&self, node: &Node) -> &str {
        &self.source[node.byte_range()]
    }

    fn span(&self, node: &Node) -> Span {
        let start = node.start_position();
        Span::new(node.start_byte(), node.end_byte(), start.row, start.column)
    }

    fn named_non_comment_count(&self, node: &Node) -> usize {
        (0..node.named_child_count())
            .filter_map(|i| node.named_child(i))
            .filter(|child| !matches!(self.kinds.get(child.kind_id()), Some(SymKind::Comment)))
            .count()
    }

    // ------------------------------------------------------------------
    // Exit handlers
    // ------------------------------------------------------------------

    fn exit_identifier(&mut self, node: Node) {
        let span = self.span(&node);
        let name = self.text(&node).to_string();
        self.stack.push(StackItem::Expr(Expr::Ident(Ident::new(name, span))));
    }

    fn exit_type_identifier(&mut self, node: Node) {
        let span = self.span(&node);
        let name = self.text(&node).to_string();
        self.push_type(Type::Named(Ident::new(name, span)));
    }

    fn exit_primitive_type(&mut self, node: Node) {
        let text = self.text(&node);
        let ty = match text {
            "int" | "short" | "long" | "ssize_t" | "ptrdiff_t" | "intptr_t" => Type::Int,
            "char" => Type::Char,
            "float" | "double" => Type::Float,
            "void" => Type::Void,
            "bool" | "_Bool" => Type::Bool,
            "size_t" | "uintptr_t" => Type::UInt,
            t if t.starts_with("int") => Type::Int,
            t if t.starts_with("uint") => Type::UInt,
            other => {
                eprintln!("Error: Unknown primitive type '{other}'");
                return;
            }
        };
        self.push_type(ty);
    }

    /// `unsigned int`, `long long`, `unsigned char`, ...
    fn exit_sized_type(&mut self, node: Node) {
        let ty = if self.text(&node).contains("unsigned") {
            Type::UInt
        } else {
            Type::Int
        };
        self.push_type(ty);
    }

    fn exit_struct_specifier(&mut self, node: Node) {
        let fields = if node.child_by_field_name("body").is_some() {
            match self.stack.pop() {
                Some(StackItem::FieldList(fields)) => Some(fields),
                Some(other) => {
                    self.stack.push(other);
                    eprintln!("Error: invalid struct body");
                    Some(Vec::new())
                }
                None => Some(Vec::new()),
            }
        } else {
            None
        };
        let name = if node.child_by_field_name("name").is_some() {
            match self.pop_type() {
                Some(Type::Named(id)) => Some(id),
                Some(other) => {
                    self.push_type(other);
                    None
                }
                None => None,
            }
        } else {
            None
        };
        match fields {
            // Definition: full struct type.
            Some(fields) => self.push_type(Type::Struct { name, fields }),
            // Reference (`struct S x;`): a named type resolved through the
            // symbol table.
            None => match name {
                Some(id) => self.push_type(Type::Named(id)),
                None => eprintln!("Error: struct reference without a name"),
            },
        }
    }

    fn exit_field_declaration_list(&mut self, _node: Node) {
        let mut fields = Vec::new();
        while matches!(self.stack.last(), Some(StackItem::Field(_))) {
            if let Some(StackItem::Field(field)) = self.stack.pop() {
                fields.push(field);
            }
        }
        fields.reverse();
        self.stack.push(StackItem::FieldList(fields));
    }

    fn exit_field_declaration(&mut self, node: Node) {
        let Some(declarator) = self.pop_declarator() else {
            eprintln!("Error: invalid struct field declarator");
            return;
        };
        let Some(base) = self.pop_type() else {
            eprintln!("Error: invalid struct field type");
            return;
        };
        let span = self.span(&node);
        let Some(name) = declarator.ident().cloned() else {
            eprintln!("Error: invalid struct field name");
            return;
        };
        let ty = declarator.declared_type(base);
        self.stack.push(StackItem::Field(FieldDecl { name, ty, span }));
    }

    fn exit_type_definition(&mut self, _node: Node) {
        let alias = match self.pop_type() {
            Some(Type::Named(id)) => id,
            _ => {
                eprintln!("Error: invalid typedef alias");
                return;
            }
        };
        let Some(aliased) = self.pop_type() else {
            eprintln!("Error: invalid typedef target");
            return;
        };
        self.push_type(Type::Typedef {
            aliased: Box::new(aliased),
            alias,
        });
    }

    fn exit_param_list(&mut self, _node: Node) {
        let mut params = Vec::new();
        while matches!(self.stack.last(), Some(StackItem::Param(_))) {
            if let Some(StackItem::Param(param)) = self.stack.pop() {
                params.push(param);
            }
        }
        params.reverse();
        self.stack.push(StackItem::Params(params));
    }

    fn exit_parameter(&mut self, node: Node) {
        let span = self.span(&node);
        let declarator = if node.child_by_field_name("declarator").is_some() {
            self.pop_declarator()
        } else {
            None
        };
        let Some(base) = self.pop_type() else {
            eprintln!("Error: Not enough elements on the stack for parameter declaration");
            return;
        };
        let mutable = !self.pop_qualifier();
        let (name, ty) = match declarator {
            Some(declarator) => {
                let name = declarator
                    .ident()
                    .cloned()
                    .unwrap_or_else(|| Ident::new("", span));
                let ty = declarator.declared_type(base);
                (name, ty)
            }
            None => (Ident::new("", span), base),
        };
        self.stack.push(StackItem::Param(ParamDecl {
            name,
            ty,
            mutable,
            span,
        }));
    }

    fn exit_init_declarator(&mut self, _node: Node) {
        let Some(value) = self.pop_expr() else {
            eprintln!("Error: invalid declaration initializer");
            return;
        };
        let Some(declarator) = self.pop_declarator() else {
            eprintln!("Error: invalid init declarator");
            return;
        };
        self.stack.push(StackItem::InitDecl(declarator, value));
    }

    fn exit_pointer_declarator(&mut self, _node: Node) {
        let Some(base) = self.pop_declarator() else {
            eprintln!("Error: invalid pointer declarator");
            return;
        };
        self.stack
            .push(StackItem::Declarator(Declarator::Pointer(Box::new(base))));
    }

    fn exit_array_declarator(&mut self, node: Node) {
        let size = if node.child_by_field_name("size").is_some() {
            match self.pop_expr() {
                Some(size) => size,
                None => {
                    eprintln!("Error: invalid array declarator size");
                    return;
                }
            }
        } else {
            eprintln!("Error: array declarator without a size");
            Expr::IntLit {
                value: 0,
                span: self.span(&node),
            }
        };
        let Some(base) = self.pop_declarator() else {
            eprintln!("Error: invalid array declarator");
            return;
        };
        self.stack.push(StackItem::Declarator(Declarator::Array {
            base: Box::new(base),
            size,
        }));
    }

    /// `int a, b = 1;` — one `Decl` per declarator, folded into a single
    /// compound statement when the declaration carries several so the
    /// statement count seen by the enclosing block stays one-to-one with
    /// the CST.
    fn exit_declaration(&mut self, node: Node) {
        let mut entries: Vec<(Declarator, Option<Expr>)> = Vec::new();
        loop {
            match self.stack.last() {
                Some(StackItem::InitDecl(..)) => {
                    if let Some(StackItem::InitDecl(declarator, value)) = self.stack.pop() {
                        entries.push((declarator, Some(value)));
                    }
                }
                Some(StackItem::Declarator(_)) => {
                    if let Some(StackItem::Declarator(declarator)) = self.stack.pop() {
                        entries.push((declarator, None));
                    }
                }
                Some(StackItem::Expr(Expr::Ident(_))) => {
                    if let Some(id) = self.pop_ident() {
                        entries.push((Declarator::Ident(id), None));
                    }
                }
                _ => break,
            }
        }
        entries.reverse();

        if entries.is_empty() {
            // Function prototypes leave an identifier and parameter list
            // behind (the function declarator builds no node); clear them.
            if matches!(self.stack.last(), Some(StackItem::Params(_))) {
                self.pop_params();
                self.pop_ident();
                self.pop_type();
                self.pop_qualifier();
                eprintln!("Error: function prototypes are not lowered");
                return;
            }
            eprintln!("Error: Invalid declaration name/pattern");
            return;
        }

        let Some(base) = self.pop_type() else {
            eprintln!("Error: Invalid declaration type");
            return;
        };
        let mutable = !self.pop_qualifier();
        let span = self.span(&node);

        let mut decls: Vec<Stmt> = entries
            .into_iter()
            .map(|(declarator, init)| {
                let ty = declarator.declared_type(base.clone());
                Stmt::Decl(Decl {
                    mutable,
                    declarator,
                    ty: Some(ty),
                    init,
                    span,
                })
            })
            .collect();

        if decls.len() == 1 {
            self.stack.push(StackItem::Stmt(decls.remove(0)));
        } else {
            let mut block = Compound::new(span);
            for decl in decls.into_iter().rev() {
                block.add_stmt_front(decl);
            }
            self.stack.push(StackItem::Stmt(Stmt::Compound(block)));
        }
    }

    fn exit_function_definition(&mut self, node: Node) {
        let Some(body) = self.pop_compound() else {
            eprintln!("Error: Not enough elements on the stack for function definition");
            return;
        };
        let Some(params) = self.pop_params() else {
            eprintln!("Error: Invalid function definition");
            return;
        };
        let Some(name) = self.pop_ident() else {
            eprintln!("Error: Invalid function definition");
            return;
        };
        // Missing return type defaults to unit.
        let return_type = self.pop_type().unwrap_or(Type::Unit);
        self.pop_qualifier();
        let span = self.span(&node);
        self.stack.push(StackItem::Func(FunctionDef {
            name,
            params,
            return_type,
            body,
            span,
        }));
    }

    fn exit_binary_expr(&mut self, node: Node) {
        let Some(rhs) = self.pop_expr() else {
            eprintln!("Error: Not enough elements on the stack for binary expression");
            return;
        };
        let Some(lhs) = self.pop_expr() else {
            eprintln!("Error: Invalid binary expression");
            return;
        };
        let op = node
            .child_by_field_name("operator")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_default();
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
        }));
    }

    fn exit_unary_expr(&mut self, node: Node) {
        let Some(operand) = self.pop_expr() else {
            eprintln!("Error: Invalid unary expression");
            return;
        };
        let op = node
            .child_by_field_name("operator")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_default();
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        }));
    }

    /// `&e` / `*e`.
    fn exit_pointer_expr(&mut self, node: Node) {
        let Some(operand) = self.pop_expr() else {
            eprintln!("Error: invalid pointer expression");
            return;
        };
        let op = match node.child_by_field_name("operator").map(|n| self.text(&n)) {
            Some("&") => PointerOp::AddressOf,
            Some("*") => PointerOp::Deref,
            other => {
                eprintln!("Error: unknown pointer operator {other:?}");
                return;
            }
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Pointer {
            op,
            operand: Box::new(operand),
            span,
        }));
    }

    fn exit_update_expr(&mut self, node: Node) {
        let Some(operand) = self.pop_expr() else {
            eprintln!("Error: invalid update expression");
            return;
        };
        let op = node
            .child_by_field_name("operator")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_default();
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Update {
            op,
            operand: Box::new(operand),
            span,
        }));
    }

    fn exit_paren_expr(&mut self, node: Node) {
        let Some(inner) = self.pop_expr() else {
            eprintln!("Error: invalid parenthesized expression");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Paren {
            inner: Box::new(inner),
            span,
        }));
    }

    /// Covers `=` and every compound form; the operator comes from the CST
    /// field.
    fn exit_assign_expr(&mut self, node: Node) {
        let Some(rhs) = self.pop_expr() else {
            eprintln!("Error: Not enough elements on the stack for assign expression");
            return;
        };
        let Some(lhs) = self.pop_expr() else {
            eprintln!("Error: Invalid assign expression");
            return;
        };
        let op = node
            .child_by_field_name("operator")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_else(|| "=".to_string());
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Assign {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
            span,
        }));
    }

    fn exit_call_expr(&mut self, node: Node) {
        let Some(args) = self.pop_args() else {
            eprintln!("Error: Not enough elements on the stack for call expression");
            return;
        };
        let Some(callee) = self.pop_ident() else {
            eprintln!("Error: Invalid call expression");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Call {
            callee,
            args,
            span,
        }));
    }

    fn exit_arg_list(&mut self, node: Node) {
        let count = self.named_non_comment_count(&node);
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            match self.pop_expr() {
                Some(arg) => args.push(arg),
                None => {
                    eprintln!("Error: invalid call argument");
                    break;
                }
            }
        }
        args.reverse();
        self.stack.push(StackItem::Args(args));
    }

    fn exit_field_expr(&mut self, node: Node) {
        let Some(field) = self.pop_ident() else {
            eprintln!("Error: invalid field expression");
            return;
        };
        let Some(base) = self.pop_expr() else {
            eprintln!("Error: invalid field expression base");
            return;
        };
        let arrow = node
            .child_by_field_name("operator")
            .is_some_and(|n| self.text(&n) == "->");
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Field {
            base: Box::new(base),
            field,
            arrow,
            span,
        }));
    }

    fn exit_subscript_expr(&mut self, node: Node) {
        let Some(index) = self.pop_expr() else {
            eprintln!("Error: invalid subscript index");
            return;
        };
        let Some(base) = self.pop_expr() else {
            eprintln!("Error: invalid subscript base");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::Subscript {
            base: Box::new(base),
            index: Box::new(index),
            span,
        }));
    }

    fn exit_literal_number(&mut self, node: Node) {
        let text = self.text(&node);
        let digits: String = text
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        match digits.parse::<i64>() {
            Ok(value) => {
                let span = self.span(&node);
                self.stack.push(StackItem::Expr(Expr::IntLit { value, span }));
            }
            Err(_) => eprintln!("Error: invalid integer literal '{text}'"),
        }
    }

    fn exit_literal_char(&mut self, node: Node) {
        let text = self.text(&node);
        match unescape_char(text) {
            Some(value) => {
                let span = self.span(&node);
                self.stack.push(StackItem::Expr(Expr::CharLit { value, span }));
            }
            None => eprintln!("Error: invalid char literal {text}"),
        }
    }

    fn exit_literal_string(&mut self, node: Node) {
        let text = self.text(&node);
        let value = unescape_string(text);
        let span = self.span(&node);
        self.stack.push(StackItem::Expr(Expr::StrLit { value, span }));
    }

    fn exit_return_statement(&mut self, node: Node) {
        let span = self.span(&node);
        if let Some(value) = self.pop_expr() {
            self.stack.push(StackItem::Stmt(Stmt::Return {
                value: Some(value),
                span,
            }));
        } else if self.named_non_comment_count(&node) == 0 {
            self.stack.push(StackItem::Stmt(Stmt::Return { value: None, span }));
        } else {
            eprintln!("Error: Invalid return statement");
        }
    }

    fn exit_expr_statement(&mut self, node: Node) {
        let span = self.span(&node);
        // The empty statement `;` still has to count as one statement for
        // the enclosing block's child arithmetic.
        if self.named_non_comment_count(&node) == 0 {
            self.stack
                .push(StackItem::Stmt(Stmt::Compound(Compound::new(span))));
            return;
        }
        match self.pop_expr() {
            Some(expr) => {
                self.stack.push(StackItem::Stmt(Stmt::ExprStmt { expr, span }));
            }
            None => eprintln!("Error: Invalid expression statement"),
        }
    }

    fn exit_compound_statement(&mut self, node: Node) {
        let count = self.named_non_comment_count(&node);
        let mut block = Compound::new(self.span(&node));
        for i in 0..count {
            match self.stack.last() {
                Some(StackItem::Expr(_)) if i == 0 => {
                    // Optional trailing expression.
                    if let Some(expr) = self.pop_expr() {
                        block.trailing = Some(Box::new(expr));
                    }
                }
                Some(StackItem::Expr(_)) => {
                    if let Some(expr) = self.pop_expr() {
                        let span = expr.span();
                        block.add_stmt_front(Stmt::ExprStmt { expr, span });
                    }
                }
                Some(StackItem::Stmt(_)) => {
                    if let Some(stmt) = self.pop_stmt() {
                        block.add_stmt_front(stmt);
                    }
                }
                _ => break,
            }
        }
        self.stack.push(StackItem::Stmt(Stmt::Compound(block)));
    }

    fn exit_if_statement(&mut self, node: Node) {
        let else_branch = if node.child_by_field_name("alternative").is_some() {
            let alt = self.pop_else();
            if alt.is_none() {
                eprintln!("Error: invalid else clause");
            }
            alt
        } else {
            None
        };
        let Some(then_branch) = self.pop_compound() else {
            eprintln!("Error: Invalid thenBlock");
            return;
        };
        let Some(cond) = self.pop_expr() else {
            eprintln!("Error: Invalid condition");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Stmt(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span,
        }));
    }

    fn exit_else_clause(&mut self, _node: Node) {
        match self.stack.pop() {
            Some(StackItem::Stmt(stmt)) => self.stack.push(StackItem::Else(Box::new(stmt))),
            Some(StackItem::Expr(expr)) => {
                let span = expr.span();
                self.stack
                    .push(StackItem::Else(Box::new(Stmt::ExprStmt { expr, span })));
            }
            Some(other) => {
                self.stack.push(other);
                eprintln!("Error: Invalid else clause");
            }
            None => eprintln!("Error: Not enough elements on the stack for else clause"),
        }
    }

    fn exit_while_statement(&mut self, node: Node) {
        let Some(body) = self.pop_compound() else {
            eprintln!("Error: Not enough elements on the stack for while statement");
            return;
        };
        let Some(cond) = self.pop_expr() else {
            eprintln!("Error: invalid while condition");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Stmt(Stmt::While { cond, body, span }));
    }

    fn exit_do_statement(&mut self, node: Node) {
        let Some(cond) = self.pop_expr() else {
            eprintln!("Error: invalid do-while condition");
            return;
        };
        let Some(body) = self.pop_compound() else {
            eprintln!("Error: Not enough elements on the stack for do statement");
            return;
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Stmt(Stmt::DoWhile { body, cond, span }));
    }

    /// Three-clause `for (init; cond; update) S`; every clause may be
    /// empty. A declaration initializer collapses to the assignment of its
    /// initial value.
    fn exit_for_statement(&mut self, node: Node) {
        let Some(body) = self.pop_compound() else {
            eprintln!("Error: Not enough elements on the stack for for statement");
            return;
        };
        let update = if node.child_by_field_name("update").is_some() {
            let update = self.pop_expr();
            if update.is_none() {
                eprintln!("Error: invalid for update clause");
            }
            update
        } else {
            None
        };
        let cond = if node.child_by_field_name("condition").is_some() {
            let cond = self.pop_expr();
            if cond.is_none() {
                eprintln!("Error: invalid for condition clause");
            }
            cond
        } else {
            None
        };
        let init = if node.child_by_field_name("initializer").is_some() {
            match self.stack.last() {
                Some(StackItem::Expr(_)) => self.pop_expr(),
                Some(StackItem::Stmt(Stmt::Decl(_))) => match self.pop_stmt() {
                    Some(Stmt::Decl(decl)) => {
                        let name = Ident::new(decl.name().to_string(), decl.span);
                        decl.init.map(|value| Expr::Assign {
                            lhs: Box::new(Expr::Ident(name)),
                            op: "=".into(),
                            rhs: Box::new(value),
                            span: decl.span,
                        })
                    }
                    _ => None,
                },
                _ => {
                    eprintln!("Error: invalid for initializer clause");
                    None
                }
            }
        } else {
            None
        };
        let span = self.span(&node);
        self.stack.push(StackItem::Stmt(Stmt::For {
            init,
            cond,
            update,
            body,
            span,
        }));
    }

    fn exit_preproc_include(&mut self, node: Node) {
        let path = node
            .child_by_field_name("path")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_else(|| self.text(&node).trim().to_string());
        let span = self.span(&node);
        self.stack
            .push(StackItem::Item(Item::Include(Include { path, span })));
    }

    fn exit_preproc_def(&mut self, node: Node) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(&n).to_string())
            .unwrap_or_default();
        let span = self.span(&node);
        self.stack
            .push(StackItem::Item(Item::MacroDef(MacroDef { name, span })));
    }

    fn exit_trans_unit(&mut self, node: Node) {
        let count = self.named_non_comment_count(&node);
        let mut collected = Vec::with_capacity(count);
        for _ in 0..count {
            match self.stack.pop() {
                Some(item) => collected.push(item),
                None => break,
            }
        }
        collected.reverse();

        let mut unit = TransUnit::new(self.span(&node));
        for item in collected {
            match item {
                StackItem::Func(func) => unit.add_item(Item::Function(func)),
                StackItem::Stmt(Stmt::Decl(decl)) => unit.add_item(Item::Decl(decl)),
                StackItem::Stmt(stmt) => unit.add_item(Item::Stmt(stmt)),
                StackItem::Type(ty @ (Type::Typedef { .. } | Type::Struct { .. })) => {
                    unit.add_item(Item::Typedef(ty));
                }
                StackItem::Item(item) => unit.add_item(item),
                StackItem::Expr(expr) => {
                    let span = expr.span();
                    unit.add_item(Item::Stmt(Stmt::ExprStmt { expr, span }));
                }
                _ => eprintln!("Error: Invalid child in translation unit"),
            }
        }
        self.stack.push(StackItem::Unit(unit));
    }
}

fn unescape_char(text: &str) -> Option<char> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    match (chars.next()?, chars.next()) {
        ('\\', Some(escaped)) => Some(match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other => other,
        }),
        (c, None) => Some(c),
        _ => None,
    }
}

fn unescape_string(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
