//! Low-level linear IR: labeled, quadruple-style three-address code.
//!
//! Statements live in a per-function builder keyed by label, in insertion
//! order. Conditional jumps use **ifZ** semantics throughout: the branch
//! fires when the condition evaluates to zero. Emission sites are phrased
//! against that convention; changing the polarity means revisiting every
//! one of them.

use std::fmt;

use indexmap::IndexMap;

use crate::symbols::SymbolTable;

#[derive(Debug, Clone, PartialEq)]
pub enum LlLiteral {
    Int(i64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl fmt::Display for LlLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlLiteral::Int(v) => write!(f, "{v}"),
            LlLiteral::Bool(v) => write!(f, "{v}"),
            LlLiteral::Char(v) => write!(f, "{v}"),
            LlLiteral::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A storable/addressable place.
#[derive(Debug, Clone, PartialEq)]
pub enum LlLocation {
    Var(String),
    Array {
        name: String,
        index: Box<LlComponent>,
    },
    Deref(Box<LlLocation>),
    Struct {
        base: Box<LlLocation>,
        field: String,
        offset: i64,
    },
    /// Reserved: registered nowhere and consumed nowhere. Typedefs route
    /// through the symbol table's type bindings until a concrete consumer
    /// appears.
    TypeAlias(String),
}

impl LlLocation {
    /// Scalar variable name, if this location is a plain variable.
    pub fn var_name(&self) -> Option<&str> {
        match self {
            LlLocation::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Variables read when this location is evaluated as a source.
    fn collect_uses(&self, out: &mut Vec<String>) {
        match self {
            LlLocation::Var(name) => out.push(name.clone()),
            LlLocation::Array { index, .. } => index.collect_uses(out),
            LlLocation::Deref(base) => base.collect_uses(out),
            LlLocation::Struct { base, .. } => base.collect_uses(out),
            LlLocation::TypeAlias(_) => {}
        }
    }

    /// Variables read when this location is a store destination: the
    /// destination scalar itself is a definition, but index and base
    /// computations are still uses.
    fn collect_dst_uses(&self, out: &mut Vec<String>) {
        match self {
            LlLocation::Var(_) | LlLocation::TypeAlias(_) => {}
            LlLocation::Array { index, .. } => index.collect_uses(out),
            LlLocation::Deref(base) => base.collect_uses(out),
            LlLocation::Struct { base, .. } => base.collect_uses(out),
        }
    }

    fn rename_uses(&mut self, old: &str, new: &str) {
        match self {
            LlLocation::Var(name) => {
                if name == old {
                    *name = new.to_string();
                }
            }
            LlLocation::Array { index, .. } => index.rename_uses(old, new),
            LlLocation::Deref(base) => base.rename_uses(old, new),
            LlLocation::Struct { base, .. } => base.rename_uses(old, new),
            LlLocation::TypeAlias(_) => {}
        }
    }

    fn rename_dst_uses(&mut self, old: &str, new: &str) {
        match self {
            LlLocation::Var(_) | LlLocation::TypeAlias(_) => {}
            LlLocation::Array { index, .. } => index.rename_uses(old, new),
            LlLocation::Deref(base) => base.rename_uses(old, new),
            LlLocation::Struct { base, .. } => base.rename_uses(old, new),
        }
    }

    fn rename_def(&mut self, old: &str, new: &str) {
        if let LlLocation::Var(name) = self
            && name == old
        {
            *name = new.to_string();
        }
    }
}

impl fmt::Display for LlLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlLocation::Var(name) => write!(f, "{name}"),
            LlLocation::Array { name, index } => write!(f, "{name}[{index}]"),
            LlLocation::Deref(base) => write!(f, "*{base}"),
            LlLocation::Struct { base, field, .. } => write!(f, "{base}->{field}"),
            LlLocation::TypeAlias(name) => write!(f, "TypeAlias: {name}"),
        }
    }
}

/// An operand: a literal or a location.
#[derive(Debug, Clone, PartialEq)]
pub enum LlComponent {
    Literal(LlLiteral),
    Location(LlLocation),
}

impl LlComponent {
    pub fn var(name: impl Into<String>) -> Self {
        LlComponent::Location(LlLocation::Var(name.into()))
    }

    pub fn int(value: i64) -> Self {
        LlComponent::Literal(LlLiteral::Int(value))
    }

    fn collect_uses(&self, out: &mut Vec<String>) {
        if let LlComponent::Location(loc) = self {
            loc.collect_uses(out);
        }
    }

    fn rename_uses(&mut self, old: &str, new: &str) {
        if let LlComponent::Location(loc) = self {
            loc.rename_uses(old, new);
        }
    }
}

impl fmt::Display for LlComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlComponent::Literal(lit) => write!(f, "{lit}"),
            LlComponent::Location(loc) => write!(f, "{loc}"),
        }
    }
}

/// One three-address statement.
#[derive(Debug, Clone, PartialEq)]
pub enum LlStmt {
    /// Labeled marker used as a branch target.
    Empty,
    AssignRegular {
        dst: LlLocation,
        src: LlComponent,
    },
    AssignBinary {
        dst: LlLocation,
        lhs: LlComponent,
        op: String,
        rhs: LlComponent,
    },
    AssignUnary {
        dst: LlLocation,
        op: String,
        operand: LlComponent,
    },
    /// `dst = &src`
    AssignAddr {
        dst: LlLocation,
        src: LlLocation,
    },
    /// Store through a dereferenced destination, `*p = src`.
    AssignDeref {
        dst: LlLocation,
        src: LlComponent,
    },
    /// The conditional form branches when the condition is zero (ifZ).
    Jump {
        target: String,
        conditional: bool,
        condition: Option<LlComponent>,
    },
    MethodCall {
        name: String,
        args: Vec<LlComponent>,
        ret: LlLocation,
    },
    Return {
        value: Option<LlComponent>,
    },
    /// Introduced only by the SSA pass. `var` is the base variable; `dst`
    /// the current SSA name; incoming pairs are (value, predecessor label).
    Phi {
        var: String,
        dst: String,
        incoming: Vec<(String, String)>,
    },
}

impl LlStmt {
    pub fn is_jump(&self) -> bool {
        matches!(self, LlStmt::Jump { .. })
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(
            self,
            LlStmt::Jump {
                conditional: true,
                ..
            }
        )
    }

    pub fn jump_target(&self) -> Option<&str> {
        match self {
            LlStmt::Jump { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The scalar variable this statement defines, if any. Stores through
    /// array, deref, or struct destinations are memory effects, not scalar
    /// definitions.
    pub fn defined_var(&self) -> Option<&str> {
        match self {
            LlStmt::AssignRegular { dst, .. }
            | LlStmt::AssignBinary { dst, .. }
            | LlStmt::AssignUnary { dst, .. }
            | LlStmt::AssignAddr { dst, .. }
            | LlStmt::AssignDeref { dst, .. }
            | LlStmt::MethodCall { ret: dst, .. } => dst.var_name(),
            LlStmt::Phi { dst, .. } => Some(dst),
            _ => None,
        }
    }

    /// Scalar variables read by this statement. ϕ incomings are reported
    /// but are renamed by the SSA pass through predecessor visits, never
    /// through [`LlStmt::rename_use`].
    pub fn used_vars(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self {
            LlStmt::Empty => {}
            LlStmt::AssignRegular { dst, src } => {
                src.collect_uses(&mut out);
                dst.collect_dst_uses(&mut out);
            }
            LlStmt::AssignBinary { dst, lhs, rhs, .. } => {
                lhs.collect_uses(&mut out);
                rhs.collect_uses(&mut out);
                dst.collect_dst_uses(&mut out);
            }
            LlStmt::AssignUnary { dst, operand, .. } => {
                operand.collect_uses(&mut out);
                dst.collect_dst_uses(&mut out);
            }
            LlStmt::AssignAddr { dst, src } => {
                src.collect_uses(&mut out);
                dst.collect_dst_uses(&mut out);
            }
            LlStmt::AssignDeref { dst, src } => {
                src.collect_uses(&mut out);
                dst.collect_dst_uses(&mut out);
            }
            LlStmt::Jump { condition, .. } => {
                if let Some(cond) = condition {
                    cond.collect_uses(&mut out);
                }
            }
            LlStmt::MethodCall { args, ret, .. } => {
                for arg in args {
                    arg.collect_uses(&mut out);
                }
                ret.collect_dst_uses(&mut out);
            }
            LlStmt::Return { value } => {
                if let Some(v) = value {
                    v.collect_uses(&mut out);
                }
            }
            LlStmt::Phi { incoming, .. } => {
                for (v, _) in incoming {
                    out.push(v.clone());
                }
            }
        }
        out
    }

    /// Rewrite every use of `old` to `new`. ϕ statements are left alone;
    /// their incomings are set explicitly during renaming.
    pub fn rename_use(&mut self, old: &str, new: &str) {
        match self {
            LlStmt::Empty | LlStmt::Phi { .. } => {}
            LlStmt::AssignRegular { dst, src } => {
                src.rename_uses(old, new);
                dst.rename_dst_uses(old, new);
            }
            LlStmt::AssignBinary { dst, lhs, rhs, .. } => {
                lhs.rename_uses(old, new);
                rhs.rename_uses(old, new);
                dst.rename_dst_uses(old, new);
            }
            LlStmt::AssignUnary { dst, operand, .. } => {
                operand.rename_uses(old, new);
                dst.rename_dst_uses(old, new);
            }
            LlStmt::AssignAddr { dst, src } => {
                src.rename_uses(old, new);
                dst.rename_dst_uses(old, new);
            }
            LlStmt::AssignDeref { dst, src } => {
                src.rename_uses(old, new);
                dst.rename_dst_uses(old, new);
            }
            LlStmt::Jump { condition, .. } => {
                if let Some(cond) = condition {
                    cond.rename_uses(old, new);
                }
            }
            LlStmt::MethodCall { args, ret, .. } => {
                for arg in args {
                    arg.rename_uses(old, new);
                }
                ret.rename_dst_uses(old, new);
            }
            LlStmt::Return { value } => {
                if let Some(v) = value {
                    v.rename_uses(old, new);
                }
            }
        }
    }

    /// Rewrite the defined variable from `old` to `new`.
    pub fn rename_def(&mut self, old: &str, new: &str) {
        match self {
            LlStmt::AssignRegular { dst, .. }
            | LlStmt::AssignBinary { dst, .. }
            | LlStmt::AssignUnary { dst, .. }
            | LlStmt::AssignAddr { dst, .. }
            | LlStmt::AssignDeref { dst, .. }
            | LlStmt::MethodCall { ret: dst, .. } => dst.rename_def(old, new),
            LlStmt::Phi { dst, .. } => {
                if dst == old {
                    *dst = new.to_string();
                }
            }
            _ => {}
        }
    }
}

impl fmt::Display for LlStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlStmt::Empty => write!(f, "EMPTY_STATEMENT"),
            LlStmt::AssignRegular { dst, src } => write!(f, "{dst} = {src}"),
            LlStmt::AssignBinary { dst, lhs, op, rhs } => {
                write!(f, "{dst} = {lhs} {op} {rhs}")
            }
            LlStmt::AssignUnary { dst, op, operand } => write!(f, "{dst} = {op} {operand}"),
            LlStmt::AssignAddr { dst, src } => write!(f, "{dst} = &{src}"),
            LlStmt::AssignDeref { dst, src } => write!(f, "{dst} = {src}"),
            LlStmt::Jump {
                target,
                conditional,
                condition,
            } => {
                if *conditional {
                    match condition {
                        Some(cond) => write!(f, "ifZ {cond} goto {target}"),
                        None => write!(f, "ifZ ? goto {target}"),
                    }
                } else {
                    write!(f, "goto {target}")
                }
            }
            LlStmt::MethodCall { name, args, ret } => {
                write!(f, "{ret} = {name}(")?;
                for arg in args {
                    write!(f, "{arg},")?;
                }
                write!(f, ")")
            }
            LlStmt::Return { value } => match value {
                Some(v) => write!(f, "return {v}"),
                None => write!(f, "return "),
            },
            LlStmt::Phi { dst, incoming, .. } => {
                write!(f, "{dst} = phi [")?;
                for (i, (v, block)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v} from {block}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Per-function statement table with fresh-label and fresh-temp generation.
///
/// Labels are flat and unique within a function; insertion order is the
/// canonical linear order consumed by CFG construction.
#[derive(Debug, Clone, Default)]
pub struct LlBuilder {
    name: String,
    statements: IndexMap<String, LlStmt>,
    label_counter: usize,
    temp_counter: usize,
    params: Vec<LlLocation>,
    /// End labels of the enclosing loops; `break` targets the top.
    block_labels: Vec<String>,
    /// Condition-entry labels of the enclosing loops; `continue` targets
    /// the top. A stack so that leaving an inner loop restores the outer
    /// loop's target.
    loop_conditions: Vec<String>,
}

impl LlBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        LlBuilder {
            name: name.into(),
            ..LlBuilder::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append under a fresh anonymous label.
    pub fn append(&mut self, stmt: LlStmt) {
        let label = self.generate_label();
        self.statements.insert(label, stmt);
    }

    /// Append under the given label. A duplicate label is a diagnostic and
    /// the new statement is dropped, never overwriting the old one.
    pub fn append_labeled(&mut self, label: &str, stmt: LlStmt) {
        if self.statements.contains_key(label) {
            eprintln!("Duplicate label key, use the label generator!");
            eprintln!("Key: {label}");
            eprintln!("Statement: {stmt}");
            return;
        }
        self.statements.insert(label.to_string(), stmt);
    }

    pub fn generate_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        label
    }

    pub fn generate_temp(&mut self) -> LlLocation {
        let temp = LlLocation::Var(format!("#_t{}", self.temp_counter));
        self.temp_counter += 1;
        temp
    }

    pub fn generate_str_temp(&mut self) -> LlLocation {
        let temp = LlLocation::Var(format!("#str_t{}", self.temp_counter));
        self.temp_counter += 1;
        temp
    }

    pub fn add_param(&mut self, param: LlLocation) {
        self.params.push(param);
    }

    pub fn params(&self) -> &[LlLocation] {
        &self.params
    }

    pub fn enter_loop(&mut self, end_label: String, cond_label: String) {
        self.block_labels.push(end_label);
        self.loop_conditions.push(cond_label);
    }

    pub fn exit_loop(&mut self) {
        self.block_labels.pop();
        self.loop_conditions.pop();
    }

    /// End label of the innermost enclosing loop (`break` target).
    pub fn current_block(&self) -> Option<&str> {
        self.block_labels.last().map(String::as_str)
    }

    /// Condition label of the innermost enclosing loop (`continue` target).
    pub fn current_loop_condition(&self) -> Option<&str> {
        self.loop_conditions.last().map(String::as_str)
    }

    pub fn statements(&self) -> &IndexMap<String, LlStmt> {
        &self.statements
    }
}

impl fmt::Display for LlBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, stmt) in &self.statements {
            writeln!(f, "{label} : {stmt}")?;
        }
        Ok(())
    }
}

/// Product of lowering a translation unit: global variable locations plus
/// one builder and one symbol table per function definition.
#[derive(Debug, Default)]
pub struct LlBuildersList {
    pub global_vars: Vec<LlLocation>,
    pub builders: Vec<LlBuilder>,
    pub symbol_tables: Vec<SymbolTable>,
}

impl LlBuildersList {
    pub fn new() -> Self {
        LlBuildersList::default()
    }

    pub fn add_global(&mut self, var: LlLocation) {
        self.global_vars.push(var);
    }

    pub fn add_builder(&mut self, builder: LlBuilder) {
        self.builders.push(builder);
    }

    pub fn add_symbol_table(&mut self, table: SymbolTable) {
        self.symbol_tables.push(table);
    }
}

impl fmt::Display for LlBuildersList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for builder in &self.builders {
            writeln!(f, "{}:", builder.name())?;
            write!(f, "{builder}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_forms() {
        let t = LlLocation::Var("#_t0".into());
        assert_eq!(
            LlStmt::AssignBinary {
                dst: t.clone(),
                lhs: LlComponent::var("a"),
                op: "+".into(),
                rhs: LlComponent::int(2),
            }
            .to_string(),
            "#_t0 = a + 2"
        );
        assert_eq!(
            LlStmt::AssignUnary {
                dst: t.clone(),
                op: "-".into(),
                operand: LlComponent::var("x"),
            }
            .to_string(),
            "#_t0 = - x"
        );
        assert_eq!(
            LlStmt::AssignAddr {
                dst: t.clone(),
                src: LlLocation::Var("x".into()),
            }
            .to_string(),
            "#_t0 = &x"
        );
        assert_eq!(
            LlStmt::AssignDeref {
                dst: LlLocation::Deref(Box::new(LlLocation::Var("p".into()))),
                src: LlComponent::int(1),
            }
            .to_string(),
            "*p = 1"
        );
        assert_eq!(
            LlStmt::Jump {
                target: "if.end.L3".into(),
                conditional: true,
                condition: Some(LlComponent::var("#_t1")),
            }
            .to_string(),
            "ifZ #_t1 goto if.end.L3"
        );
        assert_eq!(
            LlStmt::Jump {
                target: "L0".into(),
                conditional: false,
                condition: None,
            }
            .to_string(),
            "goto L0"
        );
        assert_eq!(LlStmt::Return { value: None }.to_string(), "return ");
        assert_eq!(
            LlStmt::Return {
                value: Some(LlComponent::var("x")),
            }
            .to_string(),
            "return x"
        );
    }

    #[test]
    fn test_method_call_keeps_trailing_comma() {
        let call = LlStmt::MethodCall {
            name: "f".into(),
            args: vec![LlComponent::var("a"), LlComponent::int(3)],
            ret: LlLocation::Var("#_t2".into()),
        };
        assert_eq!(call.to_string(), "#_t2 = f(a,3,)");
    }

    #[test]
    fn test_phi_rendering() {
        let phi = LlStmt::Phi {
            var: "x".into(),
            dst: "x_2".into(),
            incoming: vec![
                ("x_0".into(), "BB_then".into()),
                ("x_1".into(), "BB_else".into()),
            ],
        };
        assert_eq!(phi.to_string(), "x_2 = phi [x_0 from BB_then, x_1 from BB_else]");
    }

    #[test]
    fn test_array_location_rendering() {
        let loc = LlLocation::Array {
            name: "a".into(),
            index: Box::new(LlComponent::var("#_t3")),
        };
        assert_eq!(loc.to_string(), "a[#_t3]");
    }

    #[test]
    fn test_label_and_temp_freshness() {
        let mut builder = LlBuilder::new("main");
        assert_eq!(builder.generate_label(), "L0");
        assert_eq!(builder.generate_label(), "L1");
        assert_eq!(builder.generate_temp().to_string(), "#_t0");
        assert_eq!(builder.generate_str_temp().to_string(), "#str_t1");
        assert_eq!(builder.generate_temp().to_string(), "#_t2");
    }

    #[test]
    fn test_duplicate_label_is_dropped() {
        let mut builder = LlBuilder::new("main");
        builder.append_labeled("main", LlStmt::Empty);
        builder.append_labeled(
            "main",
            LlStmt::Return {
                value: Some(LlComponent::int(1)),
            },
        );
        assert_eq!(builder.statements().len(), 1);
        assert_eq!(builder.statements()["main"], LlStmt::Empty);
    }

    #[test]
    fn test_statement_table_preserves_insertion_order() {
        let mut builder = LlBuilder::new("main");
        builder.append_labeled("start", LlStmt::Empty);
        builder.append(LlStmt::Return { value: None });
        builder.append_labeled("end", LlStmt::Empty);
        let labels: Vec<&str> = builder.statements().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["start", "L0", "end"]);
    }

    #[test]
    fn test_loop_stacks_restore_outer_targets() {
        let mut builder = LlBuilder::new("main");
        builder.enter_loop("while.end.L0".into(), "while.cond.L0".into());
        builder.enter_loop("for.end.L4".into(), "for.cond.L4".into());
        assert_eq!(builder.current_block(), Some("for.end.L4"));
        assert_eq!(builder.current_loop_condition(), Some("for.cond.L4"));
        builder.exit_loop();
        assert_eq!(builder.current_block(), Some("while.end.L0"));
        assert_eq!(builder.current_loop_condition(), Some("while.cond.L0"));
        builder.exit_loop();
        assert_eq!(builder.current_block(), None);
    }

    #[test]
    fn test_defined_and_used_vars() {
        let stmt = LlStmt::AssignBinary {
            dst: LlLocation::Var("t".into()),
            lhs: LlComponent::var("a"),
            op: "*".into(),
            rhs: LlComponent::var("b"),
        };
        assert_eq!(stmt.defined_var(), Some("t"));
        assert_eq!(stmt.used_vars(), vec!["a".to_string(), "b".to_string()]);

        // A store through an array destination defines no scalar, but its
        // index is a use.
        let store = LlStmt::AssignRegular {
            dst: LlLocation::Array {
                name: "a".into(),
                index: Box::new(LlComponent::var("i")),
            },
            src: LlComponent::var("v"),
        };
        assert_eq!(store.defined_var(), None);
        assert_eq!(store.used_vars(), vec!["v".to_string(), "i".to_string()]);
    }

    #[test]
    fn test_rename_use_and_def() {
        let mut stmt = LlStmt::AssignBinary {
            dst: LlLocation::Var("x".into()),
            lhs: LlComponent::var("x"),
            op: "+".into(),
            rhs: LlComponent::int(1),
        };
        stmt.rename_use("x", "x_0");
        stmt.rename_def("x", "x_1");
        assert_eq!(stmt.to_string(), "x_1 = x_0 + 1");
    }
}
