//! Abstract Syntax Tree
//!
//! Typed tree lifted from the concrete syntax tree by the AST builder.
//! Node kinds are sum types with a shared `Span` carrier; cross-cutting
//! capabilities (carries-a-name, is-an-lvalue) are plain methods on the
//! enums.

use std::collections::VecDeque;

/// Source region of the originating CST node.
///
/// The CST handle itself is not retained; the byte range and start position
/// are enough for diagnostics and for the position invariant checked in
/// tests (an AST node reports exactly the CST node's start row/column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    /// Start row, 0-indexed.
    pub line: usize,
    /// Start column, 0-indexed.
    pub col: usize,
}

impl Span {
    pub fn new(start_byte: usize, end_byte: usize, line: usize, col: usize) -> Self {
        Span {
            start_byte,
            end_byte,
            line,
            col,
        }
    }
}

/// An identifier with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

/// Prefix pointer operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOp {
    /// `&e`
    AddressOf,
    /// `*e`
    Deref,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    IntLit {
        value: i64,
        span: Span,
    },
    BoolLit {
        value: bool,
        span: Span,
    },
    CharLit {
        value: char,
        span: Span,
    },
    StrLit {
        value: String,
        span: Span,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
        span: Span,
    },
    /// Field access; `arrow` distinguishes `->` from `.`.
    Field {
        base: Box<Expr>,
        field: Ident,
        arrow: bool,
        span: Span,
    },
    Pointer {
        op: PointerOp,
        operand: Box<Expr>,
        span: Span,
    },
    /// `base[index]`; nests for multi-dimensional access.
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// `lhs op rhs` where op is `=` or a compound form (`+=`, `<<=`, ...).
    Assign {
        lhs: Box<Expr>,
        op: String,
        rhs: Box<Expr>,
        span: Span,
    },
    /// `++e` / `e++` / `--e` / `e--`. The prefix/postfix distinction is not
    /// tracked; both forms lower to an in-place increment whose result is
    /// the operand location.
    Update {
        op: String,
        operand: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(id) => id.span,
            Expr::IntLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::CharLit { span, .. }
            | Expr::StrLit { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Paren { span, .. }
            | Expr::Call { span, .. }
            | Expr::Field { span, .. }
            | Expr::Pointer { span, .. }
            | Expr::Subscript { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Update { span, .. } => *span,
        }
    }

    /// The name this expression resolves to, recursing through wrappers.
    /// Subscript chains report the base array's name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Expr::Ident(id) => Some(&id.name),
            Expr::Subscript { base, .. } => base.name(),
            Expr::Paren { inner, .. } => inner.name(),
            Expr::Pointer { operand, .. } => operand.name(),
            Expr::Field { base, .. } => base.name(),
            Expr::Call { callee, .. } => Some(&callee.name),
            _ => None,
        }
    }

    /// L-value forms: identifier, field access, subscript, dereference.
    pub fn is_lvalue(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::Field { .. } | Expr::Subscript { .. } => true,
            Expr::Pointer { op, .. } => *op == PointerOp::Deref,
            Expr::Paren { inner, .. } => inner.is_lvalue(),
            _ => false,
        }
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let deepest = add_indent(indent, 2);
        match self {
            Expr::Ident(id) => format!("{indent}|--id: {}\n", id.name),
            Expr::IntLit { value, .. } => {
                format!("{indent}|--NumberLiteral\n{deeper}|--value: {value}\n")
            }
            Expr::BoolLit { value, .. } => {
                format!("{indent}|--boolLiteral\n{deeper}|--value: {value}\n")
            }
            Expr::CharLit { value, .. } => {
                format!("{indent}|--charLiteral\n{deeper}|--value: {value}\n")
            }
            Expr::StrLit { value, .. } => {
                format!("{indent}|--StringLiteral\n{deeper}|--value: {value}\n")
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let mut s = format!("{indent}|--binaryExpr\n");
                s += &format!("{deeper}|--lhs\n{}", lhs.pretty_print(&deepest));
                s += &format!("{deeper}|--op: {op}\n");
                s += &format!("{deeper}|--rhs\n{}", rhs.pretty_print(&deepest));
                s
            }
            Expr::Unary { op, operand, .. } => {
                format!(
                    "{indent}|--unaryExpr\n{deeper}|--op: {op}\n{}",
                    operand.pretty_print(&deeper)
                )
            }
            Expr::Paren { inner, .. } => {
                format!("{indent}|--parenthesizedExpr\n{}", inner.pretty_print(&deeper))
            }
            Expr::Call { callee, args, .. } => {
                let mut s = format!("{indent}|--callExpr\n");
                s += &format!("{deeper}|--functionName: {}\n", callee.name);
                s += &format!("{deeper}|--argList:\n");
                for arg in args {
                    s += &arg.pretty_print(&deepest);
                }
                s
            }
            Expr::Field {
                base, field, arrow, ..
            } => {
                let op = if *arrow { "->" } else { "." };
                let mut s = format!("{indent}|--field_expression\n");
                s += &base.pretty_print(&deeper);
                s += &format!("{deeper}|--op: {op}\n");
                s += &format!("{deeper}|--field: {}\n", field.name);
                s
            }
            Expr::Pointer { op, operand, .. } => {
                let op = match op {
                    PointerOp::AddressOf => "&",
                    PointerOp::Deref => "*",
                };
                format!(
                    "{indent}|--pointer_expression\n{deeper}|--op: {op}\n{}",
                    operand.pretty_print(&deeper)
                )
            }
            Expr::Subscript { base, index, .. } => {
                let mut s = format!("{indent}|--subscript_expression\n");
                s += &base.pretty_print(&deeper);
                s += &format!("{deeper}|--index\n{}", index.pretty_print(&deepest));
                s
            }
            Expr::Assign { lhs, op, rhs, .. } => {
                let mut s = format!("{indent}|--assignExpr\n");
                s += &format!("{deeper}|--lhs\n{}", lhs.pretty_print(&deepest));
                s += &format!("{deeper}|--op: {op}\n");
                s += &format!("{deeper}|--rhs\n{}", rhs.pretty_print(&deepest));
                s
            }
            Expr::Update { op, operand, .. } => {
                format!(
                    "{indent}|--updateExpr\n{deeper}|--op: {op}\n{}",
                    operand.pretty_print(&deeper)
                )
            }
        }
    }
}

/// Declarator forms, polymorphic over "carries a name".
///
/// The function-declarator variant of the source grammar is not represented:
/// function definitions consume an identifier and a parameter list directly.
#[derive(Debug, Clone, PartialEq)]
pub enum Declarator {
    Ident(Ident),
    Pointer(Box<Declarator>),
    Array { base: Box<Declarator>, size: Expr },
    AbstractPointer,
}

impl Declarator {
    /// Nested declarators recurse to their base name.
    pub fn name(&self) -> &str {
        match self {
            Declarator::Ident(id) => &id.name,
            Declarator::Pointer(base) => base.name(),
            Declarator::Array { base, .. } => base.name(),
            Declarator::AbstractPointer => "",
        }
    }

    /// The named identifier at the base of the declarator chain.
    pub fn ident(&self) -> Option<&Ident> {
        match self {
            Declarator::Ident(id) => Some(id),
            Declarator::Pointer(base) => base.ident(),
            Declarator::Array { base, .. } => base.ident(),
            Declarator::AbstractPointer => None,
        }
    }

    /// Fold this declarator around a base type, yielding the declared
    /// type: `*x` wraps a pointer, `x[3][4]` collects an array whose
    /// dimension list is ordered outermost-first (`x[3]` parses as the
    /// inner declarator, so sizes gathered outside-in are reversed).
    pub fn declared_type(&self, base: Type) -> Type {
        match self {
            Declarator::Ident(_) => base,
            Declarator::AbstractPointer => Type::Pointer {
                target: Box::new(base),
                mutable: true,
            },
            Declarator::Pointer(inner) => inner.declared_type(Type::Pointer {
                target: Box::new(base),
                mutable: true,
            }),
            Declarator::Array { .. } => {
                let mut dims = Vec::new();
                let mut current = self;
                while let Declarator::Array { base: inner, size } = current {
                    dims.push(size.clone());
                    current = inner;
                }
                dims.reverse();
                Type::Array {
                    elem: Box::new(current.declared_type(base)),
                    dims,
                }
            }
        }
    }
}

/// A `let` declaration (top-level or statement position).
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub mutable: bool,
    pub declarator: Declarator,
    pub ty: Option<Type>,
    pub init: Option<Expr>,
    pub span: Span,
}

impl Decl {
    pub fn name(&self) -> &str {
        self.declarator.name()
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let mut s = format!("{indent}|--letDecl:\n");
        s += &format!("{deeper}|--mutable: {}\n", self.mutable);
        s += &format!("{deeper}|--name: {}\n", self.name());
        match &self.ty {
            Some(ty) => s += &ty.pretty_print(&deeper),
            None => s += &format!("{deeper}|--type: inferred\n"),
        }
        match &self.init {
            Some(init) => s += &init.pretty_print(&deeper),
            None => s += &format!("{deeper}|--expr: none\n"),
        }
        s
    }
}

/// Compound statement: a front-insertable deque of statements plus an
/// optional trailing expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub stmts: VecDeque<Stmt>,
    pub trailing: Option<Box<Expr>>,
    pub span: Span,
}

impl Compound {
    pub fn new(span: Span) -> Self {
        Compound {
            stmts: VecDeque::new(),
            trailing: None,
            span,
        }
    }

    pub fn add_stmt_front(&mut self, stmt: Stmt) {
        self.stmts.push_front(stmt);
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let mut s = format!("{indent}|--compoundStmt:\n");
        for stmt in &self.stmts {
            s += &stmt.pretty_print(&deeper);
        }
        if let Some(expr) = &self.trailing {
            s += &expr.pretty_print(&deeper);
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Return {
        value: Option<Expr>,
        span: Span,
    },
    ExprStmt {
        expr: Expr,
        span: Span,
    },
    Compound(Compound),
    If {
        cond: Expr,
        then_branch: Compound,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },
    /// Three-clause loop; each clause may be empty in the source.
    For {
        init: Option<Expr>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Compound,
        span: Span,
    },
    While {
        cond: Expr,
        body: Compound,
        span: Span,
    },
    DoWhile {
        body: Compound,
        cond: Expr,
        span: Span,
    },
    Break {
        span: Span,
    },
    Continue {
        span: Span,
    },
    Decl(Decl),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Return { span, .. }
            | Stmt::ExprStmt { span, .. }
            | Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span } => *span,
            Stmt::Compound(c) => c.span,
            Stmt::Decl(d) => d.span,
        }
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let deepest = add_indent(indent, 2);
        match self {
            Stmt::Return { value: Some(v), .. } => {
                format!("{indent}|--returnExpr\n{}", v.pretty_print(&deeper))
            }
            Stmt::Return { value: None, .. } => format!("{indent}|--returnVoid\n"),
            Stmt::ExprStmt { expr, .. } => {
                format!("{indent}|--exprStmt\n{}", expr.pretty_print(&deeper))
            }
            Stmt::Compound(c) => c.pretty_print(indent),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let mut s = format!("{indent}|--ifStmt\n");
                s += &format!("{deeper}|--condition\n{}", cond.pretty_print(&deepest));
                s += &format!("{deeper}|--consequence\n{}", then_branch.pretty_print(&deepest));
                if let Some(alt) = else_branch {
                    s += &format!("{deeper}|--else\n{}", alt.pretty_print(&deepest));
                }
                s
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                let mut s = format!("{indent}|--forStmt\n");
                if let Some(init) = init {
                    s += &format!("{deeper}|--initializer\n{}", init.pretty_print(&deepest));
                }
                if let Some(cond) = cond {
                    s += &format!("{deeper}|--condition\n{}", cond.pretty_print(&deepest));
                }
                if let Some(update) = update {
                    s += &format!("{deeper}|--update\n{}", update.pretty_print(&deepest));
                }
                s += &format!("{deeper}|--body\n{}", body.pretty_print(&deepest));
                s
            }
            Stmt::While { cond, body, .. } => {
                let mut s = format!("{indent}|--whileStmt\n");
                s += &format!("{deeper}|--condition\n{}", cond.pretty_print(&deepest));
                s += &format!("{deeper}|--body\n{}", body.pretty_print(&deepest));
                s
            }
            Stmt::DoWhile { body, cond, .. } => {
                let mut s = format!("{indent}|--doWhileStmt\n");
                s += &format!("{deeper}|--body\n{}", body.pretty_print(&deepest));
                s += &format!("{deeper}|--condition\n{}", cond.pretty_print(&deepest));
                s
            }
            Stmt::Break { .. } => format!("{indent}|--breakStmt\n"),
            Stmt::Continue { .. } => format!("{indent}|--continueStmt\n"),
            Stmt::Decl(d) => d.pretty_print(indent),
        }
    }
}

/// A struct field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Bool,
    Void,
    Int,
    UInt,
    Float,
    Char,
    Str,
    Unit,
    Pointer {
        target: Box<Type>,
        mutable: bool,
    },
    Reference {
        target: Box<Type>,
        mutable: bool,
    },
    /// Dimensions are ordered outermost-first; multi-dimensional array
    /// declarators fold into a single node (see
    /// [`Declarator::declared_type`]).
    Array {
        elem: Box<Type>,
        dims: Vec<Expr>,
    },
    Struct {
        name: Option<Ident>,
        fields: Vec<FieldDecl>,
    },
    Typedef {
        aliased: Box<Type>,
        alias: Ident,
    },
    Named(Ident),
}

impl Type {
    /// Element width in bytes, used by subscript address arithmetic.
    pub fn width(&self) -> i64 {
        match self {
            Type::Bool | Type::Char => 1,
            _ => 8,
        }
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        match self {
            Type::Bool => format!("{indent}|--type: bool\n"),
            Type::Void => format!("{indent}|--type: void\n"),
            Type::Int => format!("{indent}|--type: int\n"),
            Type::UInt => format!("{indent}|--type: uint\n"),
            Type::Float => format!("{indent}|--type: float\n"),
            Type::Char => format!("{indent}|--type: char\n"),
            Type::Str => format!("{indent}|--type: string\n"),
            Type::Unit => format!("{indent}|--type: unit\n"),
            Type::Pointer { target, mutable } => {
                let mut s = format!("{indent}|--pointerType:\n");
                s += &target.pretty_print(&deeper);
                if *mutable {
                    s += &format!("{deeper}|--mutable: true\n");
                }
                s
            }
            Type::Reference { target, mutable } => {
                let mut s = format!("{indent}|--referenceType:\n");
                s += &target.pretty_print(&deeper);
                if *mutable {
                    s += &format!("{deeper}|--mutable: true\n");
                }
                s
            }
            Type::Array { elem, dims } => {
                let mut s = format!("{indent}|--arrayType:\n");
                s += &elem.pretty_print(&deeper);
                for dim in dims {
                    s += &format!("{deeper}|--length\n");
                    s += &dim.pretty_print(&add_indent(indent, 2));
                }
                s
            }
            Type::Struct { name, fields } => {
                let mut s = format!("{indent}|--type: struct\n");
                if let Some(name) = name {
                    s += &format!("{deeper}|--name: {}\n", name.name);
                }
                for field in fields {
                    s += &format!("{deeper}|--field: {}\n", field.name.name);
                    s += &field.ty.pretty_print(&add_indent(indent, 2));
                }
                s
            }
            Type::Typedef { aliased, alias } => {
                let mut s = format!("{indent}|--typedef:\n");
                s += &aliased.pretty_print(&deeper);
                s += &format!("{deeper}|--alias: {}\n", alias.name);
                s
            }
            Type::Named(id) => format!("{indent}|--typeId: {}\n", id.name),
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: Ident,
    pub ty: Type,
    pub mutable: bool,
    pub span: Span,
}

impl ParamDecl {
    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let mut s = format!("{indent}|--param\n");
        s += &format!("{deeper}|--name: {}\n", self.name.name);
        s += &self.ty.pretty_print(&deeper);
        s
    }
}

/// A function definition: name, parameters, return type, compound body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: Vec<ParamDecl>,
    pub return_type: Type,
    pub body: Compound,
    pub span: Span,
}

impl FunctionDef {
    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let deepest = add_indent(indent, 2);
        let mut s = format!("{indent}|--functionItem\n");
        s += &format!("{deeper}|--name: {}\n", self.name.name);
        s += &format!("{deeper}|--paramList\n");
        for param in &self.params {
            s += &param.pretty_print(&deepest);
        }
        s += &format!("{deeper}|--returnType\n");
        s += &self.return_type.pretty_print(&deepest);
        s += &self.body.pretty_print(&deeper);
        s
    }
}

/// A preprocessor `#include` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub span: Span,
}

/// A preprocessor `#define` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDef {
    pub name: String,
    pub span: Span,
}

/// Top-level item of a translation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Function(FunctionDef),
    Decl(Decl),
    Include(Include),
    Typedef(Type),
    MacroDef(MacroDef),
    Stmt(Stmt),
}

/// The sole AST root: an ordered item list plus categorical index lists
/// populated on insertion, giving downstream passes O(1) per-category
/// iteration. Every item lands in exactly one category.
#[derive(Debug, Clone, Default)]
pub struct TransUnit {
    pub items: Vec<Item>,
    decl_idx: Vec<usize>,
    function_idx: Vec<usize>,
    include_idx: Vec<usize>,
    typedef_idx: Vec<usize>,
    macro_def_idx: Vec<usize>,
    stmt_idx: Vec<usize>,
    pub span: Span,
}

impl TransUnit {
    pub fn new(span: Span) -> Self {
        TransUnit {
            span,
            ..TransUnit::default()
        }
    }

    pub fn add_item(&mut self, item: Item) {
        let idx = self.items.len();
        match &item {
            Item::Function(_) => self.function_idx.push(idx),
            Item::Decl(_) => self.decl_idx.push(idx),
            Item::Include(_) => self.include_idx.push(idx),
            Item::Typedef(_) => self.typedef_idx.push(idx),
            Item::MacroDef(_) => self.macro_def_idx.push(idx),
            Item::Stmt(_) => self.stmt_idx.push(idx),
        }
        self.items.push(item);
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.function_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.decl_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::Decl(d) => Some(d),
            _ => None,
        })
    }

    pub fn includes(&self) -> impl Iterator<Item = &Include> {
        self.include_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::Include(inc) => Some(inc),
            _ => None,
        })
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &Type> {
        self.typedef_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::Typedef(t) => Some(t),
            _ => None,
        })
    }

    pub fn macro_defs(&self) -> impl Iterator<Item = &MacroDef> {
        self.macro_def_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::MacroDef(m) => Some(m),
            _ => None,
        })
    }

    pub fn stmts(&self) -> impl Iterator<Item = &Stmt> {
        self.stmt_idx.iter().filter_map(|&i| match &self.items[i] {
            Item::Stmt(s) => Some(s),
            _ => None,
        })
    }

    /// Total count across the categorical lists; equals `items.len()` when
    /// the partition invariant holds.
    pub fn categorized_count(&self) -> usize {
        self.decl_idx.len()
            + self.function_idx.len()
            + self.include_idx.len()
            + self.typedef_idx.len()
            + self.macro_def_idx.len()
            + self.stmt_idx.len()
    }

    pub fn pretty_print(&self, indent: &str) -> String {
        let deeper = add_indent(indent, 1);
        let mut s = format!("{indent}|--transUnit:\n");
        for item in &self.items {
            match item {
                Item::Function(f) => s += &f.pretty_print(&deeper),
                Item::Decl(d) => s += &d.pretty_print(&deeper),
                Item::Include(inc) => s += &format!("{deeper}|--include: {}\n", inc.path),
                Item::Typedef(t) => s += &t.pretty_print(&deeper),
                Item::MacroDef(m) => s += &format!("{deeper}|--macroDef: {}\n", m.name),
                Item::Stmt(stmt) => s += &stmt.pretty_print(&deeper),
            }
        }
        s
    }
}

/// Two spaces per indent level, matching the pretty-printer's tree style.
pub(crate) fn add_indent(base: &str, level: usize) -> String {
    format!("{base}{}", " ".repeat(level * 2))
}
