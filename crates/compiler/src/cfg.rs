//! Control-flow graph construction over the linear IR.
//!
//! Blocks refer to each other by index into the graph's insertion-ordered
//! block vector; each block owns its statements, so the SSA pass can rewrite
//! them in place without aliasing the builder's statement table.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::lir::{LlBuilder, LlStmt};

/// A maximal straight-line statement sequence with one entry (the leader).
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    /// (statement-table label, statement) pairs in linear order.
    pub stmts: Vec<(String, LlStmt)>,
    pub predecessors: BTreeSet<usize>,
    pub successors: BTreeSet<usize>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        BasicBlock {
            label: label.into(),
            stmts: Vec::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
        }
    }

    pub fn last_stmt(&self) -> Option<&LlStmt> {
        self.stmts.last().map(|(_, stmt)| stmt)
    }
}

/// Control-flow graph: insertion-ordered blocks, label lookup, entry/exit.
#[derive(Debug, Clone, Default)]
pub struct Cfg {
    blocks: Vec<BasicBlock>,
    by_label: HashMap<String, usize>,
    entry: Option<usize>,
    exit: Option<usize>,
}

impl Cfg {
    pub fn new() -> Self {
        Cfg::default()
    }

    pub fn add_block(&mut self, label: impl Into<String>) -> usize {
        let label = label.into();
        let idx = self.blocks.len();
        self.by_label.insert(label.clone(), idx);
        self.blocks.push(BasicBlock::new(label));
        idx
    }

    /// Insert a directed edge, keeping predecessor/successor sets symmetric.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.blocks[from].successors.insert(to);
        self.blocks[to].predecessors.insert(from);
    }

    pub fn block_index(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    pub fn block(&self, idx: usize) -> &BasicBlock {
        &self.blocks[idx]
    }

    pub fn block_mut(&mut self, idx: usize) -> &mut BasicBlock {
        &mut self.blocks[idx]
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn set_entry(&mut self, idx: usize) {
        self.entry = Some(idx);
    }

    pub fn entry(&self) -> Option<usize> {
        self.entry
    }

    pub fn set_exit(&mut self, idx: usize) {
        self.exit = Some(idx);
    }

    pub fn exit(&self) -> Option<usize> {
        self.exit
    }

    /// Dot rendering: one node per block listing its statements, one edge
    /// per successor.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph CFG {\n  node [shape=box];\n");
        for block in &self.blocks {
            let mut body = format!("{}:\\l", block.label);
            for (_, stmt) in &block.stmts {
                body.push_str(&stmt.to_string().replace('"', "\\\""));
                body.push_str("\\l");
            }
            out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", block.label, body));
        }
        for block in &self.blocks {
            for &succ in &block.successors {
                out.push_str(&format!(
                    "  \"{}\" -> \"{}\";\n",
                    block.label, self.blocks[succ].label
                ));
            }
        }
        out.push_str("}\n");
        out
    }
}

impl fmt::Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Control Flow Graph:")?;
        for block in &self.blocks {
            writeln!(f, "-----------------------------------")?;
            writeln!(f, "Block {}:", block.label)?;
            writeln!(f, "  Instructions:")?;
            for (label, stmt) in &block.stmts {
                writeln!(f, "  {label} : {stmt}")?;
            }
            write!(f, "  Predecessors: ")?;
            for &pred in &block.predecessors {
                write!(f, "{} ", self.blocks[pred].label)?;
            }
            writeln!(f)?;
            write!(f, "  Successors: ")?;
            for &succ in &block.successors {
                write!(f, "{} ", self.blocks[succ].label)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Partitions a builder's statement table into basic blocks and links them.
pub struct CfgBuilder;

impl CfgBuilder {
    /// A statement is a leader if it is the first statement, the target of
    /// a jump, or immediately follows a jump.
    fn identify_leaders(builder: &LlBuilder) -> BTreeSet<String> {
        let mut leaders = BTreeSet::new();
        let table = builder.statements();

        if let Some((first, _)) = table.first() {
            leaders.insert(first.clone());
        }
        for (i, (_, stmt)) in table.iter().enumerate() {
            if stmt.is_jump() {
                if let Some(target) = stmt.jump_target() {
                    leaders.insert(target.to_string());
                }
                if let Some((next, _)) = table.get_index(i + 1) {
                    leaders.insert(next.clone());
                }
            }
        }
        leaders
    }

    /// Build the CFG for one function. The first real block is the entry
    /// (the synthetic entry is elided); a synthetic empty exit block is
    /// appended, so the "next block in insertion order" of the last real
    /// block is always defined.
    pub fn build(builder: &LlBuilder) -> Cfg {
        let mut cfg = Cfg::new();
        let leaders = Self::identify_leaders(builder);

        let mut current: Option<usize> = None;
        for (label, stmt) in builder.statements() {
            if leaders.contains(label) {
                current = Some(cfg.add_block(format!("BB_{label}")));
            }
            if let Some(idx) = current {
                cfg.block_mut(idx)
                    .stmts
                    .push((label.clone(), stmt.clone()));
            }
        }

        let real_blocks = cfg.len();
        let exit = cfg.add_block("BB_exit");
        cfg.set_exit(exit);
        if real_blocks > 0 {
            cfg.set_entry(0);
        }

        for i in 0..real_blocks {
            let last = cfg.block(i).last_stmt().cloned();
            match last {
                Some(stmt) if stmt.is_jump() => {
                    let target = stmt.jump_target().unwrap_or_default().to_string();
                    match cfg.block_index(&format!("BB_{target}")) {
                        Some(t) => cfg.add_edge(i, t),
                        None => eprintln!("Error: jump to unknown label {target}"),
                    }
                    if stmt.is_conditional_jump() {
                        cfg.add_edge(i, i + 1);
                    }
                }
                _ => {
                    // Fall through to the next block, or to exit if last.
                    cfg.add_edge(i, i + 1);
                }
            }
        }

        cfg
    }
}
