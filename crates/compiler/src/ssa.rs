//! SSA conversion: dominators, dominance frontiers, ϕ insertion, renaming.
//!
//! Dominators use the iterative Cooper–Harvey–Kennedy scheme over a
//! reverse-postorder numbering; frontiers follow Cytron et al. The renaming
//! pass walks the dominator tree with one name stack per variable and
//! rewrites the LIR in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::cfg::Cfg;
use crate::lir::LlStmt;

#[derive(Debug, Default)]
pub struct SsaGenerator {
    idoms: HashMap<usize, usize>,
    frontier: HashMap<usize, BTreeSet<usize>>,
    counters: HashMap<String, usize>,
    stacks: HashMap<String, Vec<String>>,
}

impl SsaGenerator {
    pub fn new() -> Self {
        SsaGenerator::default()
    }

    /// Full pipeline: dominators, frontiers, ϕ placement, renaming.
    pub fn convert_to_ssa(&mut self, cfg: &mut Cfg) {
        self.compute_dominators(cfg);
        self.compute_dominance_frontier(cfg);
        self.insert_phi_functions(cfg);
        self.rename_variables(cfg);
    }

    /// Immediate dominators of the reachable blocks; `idom(entry) = entry`.
    pub fn idoms(&self) -> &HashMap<usize, usize> {
        &self.idoms
    }

    pub fn dominance_frontier(&self) -> &HashMap<usize, BTreeSet<usize>> {
        &self.frontier
    }

    fn postorder_visit(cfg: &Cfg, node: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        visited[node] = true;
        for &succ in &cfg.block(node).successors {
            if !visited[succ] {
                Self::postorder_visit(cfg, succ, visited, order);
            }
        }
        order.push(node);
    }

    pub fn compute_dominators(&mut self, cfg: &Cfg) {
        self.idoms.clear();
        let Some(entry) = cfg.entry() else {
            return;
        };

        let mut visited = vec![false; cfg.len()];
        let mut order = Vec::new();
        Self::postorder_visit(cfg, entry, &mut visited, &mut order);
        let postnum: HashMap<usize, usize> =
            order.iter().enumerate().map(|(i, &b)| (b, i)).collect();
        let rpo: Vec<usize> = order.iter().rev().copied().collect();

        self.idoms.insert(entry, entry);
        let mut changed = true;
        while changed {
            changed = false;
            for &b in &rpo {
                if b == entry {
                    continue;
                }
                let mut new_idom: Option<usize> = None;
                for &p in &cfg.block(b).predecessors {
                    if !self.idoms.contains_key(&p) {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(current) => self.intersect(p, current, &postnum),
                    });
                }
                if let Some(idom) = new_idom
                    && self.idoms.get(&b) != Some(&idom)
                {
                    self.idoms.insert(b, idom);
                    changed = true;
                }
            }
        }
    }

    /// Walk both candidates up the partial idom tree, comparing postorder
    /// numbers, until they meet.
    fn intersect(&self, a: usize, b: usize, postnum: &HashMap<usize, usize>) -> usize {
        let mut finger_a = a;
        let mut finger_b = b;
        while finger_a != finger_b {
            while postnum[&finger_a] < postnum[&finger_b] {
                finger_a = self.idoms[&finger_a];
            }
            while postnum[&finger_b] < postnum[&finger_a] {
                finger_b = self.idoms[&finger_b];
            }
        }
        finger_a
    }

    /// For each join block, walk each predecessor up the idom tree until
    /// the join's idom, adding the join to the frontier of every block
    /// visited.
    pub fn compute_dominance_frontier(&mut self, cfg: &Cfg) {
        self.frontier.clear();
        for &b in self.idoms.keys() {
            self.frontier.entry(b).or_default();
        }
        for b in 0..cfg.len() {
            if cfg.block(b).predecessors.len() < 2 {
                continue;
            }
            let Some(&idom_b) = self.idoms.get(&b) else {
                continue;
            };
            for &pred in &cfg.block(b).predecessors {
                if !self.idoms.contains_key(&pred) {
                    continue;
                }
                let mut runner = pred;
                while runner != idom_b {
                    self.frontier.entry(runner).or_default().insert(b);
                    runner = self.idoms[&runner];
                }
            }
        }
    }

    /// Worklist insertion of ϕ statements over the iterated dominance
    /// frontier of each variable's definition set.
    pub fn insert_phi_functions(&mut self, cfg: &mut Cfg) {
        let mut defs: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for (i, block) in cfg.blocks().iter().enumerate() {
            for (_, stmt) in &block.stmts {
                if let Some(v) = stmt.defined_var() {
                    defs.entry(v.to_string()).or_default().insert(i);
                }
            }
        }

        for (var, def_blocks) in &defs {
            let mut has_phi: BTreeSet<usize> = BTreeSet::new();
            let mut work: Vec<usize> = def_blocks.iter().copied().collect();
            while let Some(b) = work.pop() {
                let frontier = self.frontier.get(&b).cloned().unwrap_or_default();
                for join in frontier {
                    if has_phi.insert(join) {
                        let label = format!("phi.{var}.{}", cfg.block(join).label);
                        cfg.block_mut(join).stmts.insert(
                            0,
                            (
                                label,
                                LlStmt::Phi {
                                    var: var.clone(),
                                    dst: var.clone(),
                                    incoming: Vec::new(),
                                },
                            ),
                        );
                        if !def_blocks.contains(&join) {
                            work.push(join);
                        }
                    }
                }
            }
        }
    }

    /// Dominator-tree DFS renaming with per-variable name stacks.
    pub fn rename_variables(&mut self, cfg: &mut Cfg) {
        let Some(entry) = cfg.entry() else {
            return;
        };
        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for b in 0..cfg.len() {
            if let Some(&idom) = self.idoms.get(&b)
                && idom != b
            {
                children.entry(idom).or_default().push(b);
            }
        }
        self.counters.clear();
        self.stacks.clear();
        self.rename_block(cfg, entry, &children);
    }

    fn fresh_name(&mut self, var: &str) -> String {
        let counter = self.counters.entry(var.to_string()).or_insert(0);
        let name = format!("{var}_{counter}");
        *counter += 1;
        self.stacks
            .entry(var.to_string())
            .or_default()
            .push(name.clone());
        name
    }

    fn top_name(&self, var: &str) -> Option<String> {
        self.stacks.get(var).and_then(|s| s.last()).cloned()
    }

    fn rename_block(&mut self, cfg: &mut Cfg, b: usize, children: &HashMap<usize, Vec<usize>>) {
        let mut pushed: Vec<String> = Vec::new();

        let stmt_count = cfg.block(b).stmts.len();
        for i in 0..stmt_count {
            if let LlStmt::Phi { var, .. } = &cfg.block(b).stmts[i].1 {
                let var = var.clone();
                let fresh = self.fresh_name(&var);
                if let LlStmt::Phi { dst, .. } = &mut cfg.block_mut(b).stmts[i].1 {
                    *dst = fresh;
                }
                pushed.push(var);
                continue;
            }

            for used in cfg.block(b).stmts[i].1.used_vars() {
                if let Some(top) = self.top_name(&used) {
                    cfg.block_mut(b).stmts[i].1.rename_use(&used, &top);
                }
            }
            let defined = cfg.block(b).stmts[i].1.defined_var().map(String::from);
            if let Some(var) = defined {
                let fresh = self.fresh_name(&var);
                cfg.block_mut(b).stmts[i].1.rename_def(&var, &fresh);
                pushed.push(var);
            }
        }

        let successors: Vec<usize> = cfg.block(b).successors.iter().copied().collect();
        let pred_label = cfg.block(b).label.clone();
        for succ in successors {
            let succ_count = cfg.block(succ).stmts.len();
            for i in 0..succ_count {
                if let LlStmt::Phi { var, .. } = &cfg.block(succ).stmts[i].1 {
                    let name = self.top_name(var).unwrap_or_else(|| var.clone());
                    if let LlStmt::Phi { incoming, .. } = &mut cfg.block_mut(succ).stmts[i].1 {
                        incoming.push((name, pred_label.clone()));
                    }
                }
            }
        }

        if let Some(kids) = children.get(&b) {
            for &child in kids {
                self.rename_block(cfg, child, children);
            }
        }

        for var in pushed {
            if let Some(stack) = self.stacks.get_mut(&var) {
                stack.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lir::{LlComponent, LlLocation};

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    /// Diamond:
    ///   A -> B, A -> C, B -> D, C -> D, D -> E
    fn diamond_cfg() -> Cfg {
        let mut cfg = Cfg::new();
        let a = cfg.add_block("A");
        let b = cfg.add_block("B");
        let c = cfg.add_block("C");
        let d = cfg.add_block("D");
        let e = cfg.add_block("E");
        cfg.set_entry(a);
        cfg.add_edge(a, b);
        cfg.add_edge(a, c);
        cfg.add_edge(b, d);
        cfg.add_edge(c, d);
        cfg.add_edge(d, e);
        cfg
    }

    #[test]
    fn test_dominators_diamond() {
        let cfg = diamond_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);

        let idx = |label: &str| cfg.block_index(label).unwrap();
        let idoms = ssa_gen.idoms();
        assert_eq!(idoms[&idx("A")], idx("A"));
        assert_eq!(idoms[&idx("B")], idx("A"));
        assert_eq!(idoms[&idx("C")], idx("A"));
        assert_eq!(idoms[&idx("D")], idx("A"));
        assert_eq!(idoms[&idx("E")], idx("D"));
    }

    /// Nested loop:
    ///   0 -> 1; 1 -> 2, 5; 2 -> 3; 3 -> 4, 1; 5 -> 6, 8; 6 -> 7;
    ///   8 -> 7; 7 -> 3
    fn loop_cfg() -> Cfg {
        let mut cfg = Cfg::new();
        for i in 0..9 {
            cfg.add_block(format!("{i}"));
        }
        cfg.set_entry(0);
        cfg.add_edge(0, 1);
        cfg.add_edge(1, 2);
        cfg.add_edge(2, 3);
        cfg.add_edge(3, 4);
        cfg.add_edge(3, 1);
        cfg.add_edge(1, 5);
        cfg.add_edge(5, 6);
        cfg.add_edge(5, 8);
        cfg.add_edge(6, 7);
        cfg.add_edge(8, 7);
        cfg.add_edge(7, 3);
        cfg
    }

    #[test]
    fn test_dominators_nested_loop() {
        let cfg = loop_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);
        let idoms = ssa_gen.idoms();
        assert_eq!(idoms[&0], 0);
        assert_eq!(idoms[&1], 0);
        assert_eq!(idoms[&2], 1);
        assert_eq!(idoms[&3], 1);
        assert_eq!(idoms[&4], 3);
        assert_eq!(idoms[&5], 1);
        assert_eq!(idoms[&6], 5);
        assert_eq!(idoms[&7], 5);
        assert_eq!(idoms[&8], 5);
    }

    /// Cross edges:
    ///   6 -> 5, 4; 5 -> 1; 4 -> 2, 3; 1 -> 2; 2 -> 1, 3; 3 -> 2
    #[test]
    fn test_dominators_cross_edges() {
        let mut cfg = Cfg::new();
        // Insertion order mirrors the fixture: 6, 5, 4, 3, 2, 1.
        let b6 = cfg.add_block("6");
        let b5 = cfg.add_block("5");
        let b4 = cfg.add_block("4");
        let b3 = cfg.add_block("3");
        let b2 = cfg.add_block("2");
        let b1 = cfg.add_block("1");
        cfg.set_entry(b6);
        cfg.add_edge(b6, b5);
        cfg.add_edge(b6, b4);
        cfg.add_edge(b5, b1);
        cfg.add_edge(b4, b2);
        cfg.add_edge(b4, b3);
        cfg.add_edge(b2, b3);
        cfg.add_edge(b3, b2);
        cfg.add_edge(b2, b1);
        cfg.add_edge(b1, b2);

        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);
        let idoms = ssa_gen.idoms();
        assert_eq!(idoms[&b6], b6);
        assert_eq!(idoms[&b5], b6);
        assert_eq!(idoms[&b4], b6);
        assert_eq!(idoms[&b3], b6);
        assert_eq!(idoms[&b2], b6);
        assert_eq!(idoms[&b1], b6);
    }

    /// Simple loop with exit:
    ///   0 -> 1; 1 -> 2, 3; 2 -> 1; 3 -> 4
    #[test]
    fn test_dominators_simple_loop() {
        let mut cfg = Cfg::new();
        for i in 0..5 {
            cfg.add_block(format!("{i}"));
        }
        cfg.set_entry(0);
        cfg.add_edge(0, 1);
        cfg.add_edge(1, 2);
        cfg.add_edge(2, 1);
        cfg.add_edge(1, 3);
        cfg.add_edge(3, 4);

        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);
        let idoms = ssa_gen.idoms();
        assert_eq!(idoms[&0], 0);
        assert_eq!(idoms[&1], 0);
        assert_eq!(idoms[&2], 1);
        assert_eq!(idoms[&3], 1);
        assert_eq!(idoms[&4], 3);
    }

    /// The reference 12-block loop nest:
    ///   entry -> 1, 2; 1 -> 5; 2 -> 3, 4; 3 -> 6; 4 -> 6; 5 -> 1, 7;
    ///   6 -> 2, 7; 7 -> 8, 9; 8 -> 10, 8; 9 -> 10; 10 -> exit, 7
    fn loop_nest_cfg() -> Cfg {
        let mut cfg = Cfg::new();
        let entry = cfg.add_block("entry");
        for i in 1..=10 {
            cfg.add_block(format!("{i}"));
        }
        let exit = cfg.add_block("exit");
        cfg.set_entry(entry);
        cfg.set_exit(exit);

        let idx = |label: &str, cfg: &Cfg| cfg.block_index(label).unwrap();
        let edges = [
            ("entry", "1"),
            ("entry", "2"),
            ("1", "5"),
            ("2", "3"),
            ("2", "4"),
            ("3", "6"),
            ("4", "6"),
            ("5", "1"),
            ("5", "7"),
            ("6", "2"),
            ("6", "7"),
            ("7", "8"),
            ("7", "9"),
            ("8", "10"),
            ("8", "8"),
            ("9", "10"),
            ("10", "exit"),
            ("10", "7"),
        ];
        for (from, to) in edges {
            let (f, t) = (idx(from, &cfg), idx(to, &cfg));
            cfg.add_edge(f, t);
        }
        cfg
    }

    #[test]
    fn test_dominators_loop_nest() {
        let cfg = loop_nest_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);

        let idx = |label: &str| cfg.block_index(label).unwrap();
        let idoms = ssa_gen.idoms();
        assert_eq!(idoms[&idx("entry")], idx("entry"));
        assert_eq!(idoms[&idx("1")], idx("entry"));
        assert_eq!(idoms[&idx("2")], idx("entry"));
        assert_eq!(idoms[&idx("3")], idx("2"));
        assert_eq!(idoms[&idx("4")], idx("2"));
        assert_eq!(idoms[&idx("5")], idx("1"));
        assert_eq!(idoms[&idx("6")], idx("2"));
        assert_eq!(idoms[&idx("7")], idx("entry"));
        assert_eq!(idoms[&idx("8")], idx("7"));
        assert_eq!(idoms[&idx("9")], idx("7"));
        assert_eq!(idoms[&idx("10")], idx("7"));
        assert_eq!(idoms[&idx("exit")], idx("10"));
    }

    #[test]
    fn test_dominance_frontier_loop_nest() {
        let cfg = loop_nest_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);
        ssa_gen.compute_dominance_frontier(&cfg);

        let idx = |label: &str| cfg.block_index(label).unwrap();
        let df = ssa_gen.dominance_frontier();
        assert_eq!(df[&idx("entry")], set(&[]));
        assert_eq!(df[&idx("1")], set(&[idx("1"), idx("7")]));
        assert_eq!(df[&idx("2")], set(&[idx("2"), idx("7")]));
        assert_eq!(df[&idx("3")], set(&[idx("6")]));
        assert_eq!(df[&idx("4")], set(&[idx("6")]));
        assert_eq!(df[&idx("5")], set(&[idx("1"), idx("7")]));
        assert_eq!(df[&idx("6")], set(&[idx("2"), idx("7")]));
        assert_eq!(df[&idx("7")], set(&[idx("7")]));
        assert_eq!(df[&idx("8")], set(&[idx("8"), idx("10")]));
        assert_eq!(df[&idx("9")], set(&[idx("10")]));
        assert_eq!(df[&idx("10")], set(&[idx("7")]));
        assert_eq!(df[&idx("exit")], set(&[]));
    }

    #[test]
    fn test_dominator_computation_is_idempotent() {
        let cfg = loop_nest_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.compute_dominators(&cfg);
        let first = ssa_gen.idoms().clone();
        ssa_gen.compute_dominators(&cfg);
        assert_eq!(&first, ssa_gen.idoms());
    }

    /// if (c) x = 1 else x = 2; use(x)
    fn branchy_cfg() -> Cfg {
        let mut cfg = Cfg::new();
        let cond = cfg.add_block("BB_f");
        let then = cfg.add_block("BB_then");
        let els = cfg.add_block("BB_else");
        let join = cfg.add_block("BB_end");
        cfg.set_entry(cond);
        cfg.add_edge(cond, then);
        cfg.add_edge(cond, els);
        cfg.add_edge(then, join);
        cfg.add_edge(els, join);

        cfg.block_mut(cond).stmts.push((
            "L0".into(),
            LlStmt::Jump {
                target: "if.else.L0".into(),
                conditional: true,
                condition: Some(LlComponent::var("c")),
            },
        ));
        cfg.block_mut(then).stmts.push((
            "L1".into(),
            LlStmt::AssignRegular {
                dst: LlLocation::Var("x".into()),
                src: LlComponent::int(1),
            },
        ));
        cfg.block_mut(els).stmts.push((
            "L2".into(),
            LlStmt::AssignRegular {
                dst: LlLocation::Var("x".into()),
                src: LlComponent::int(2),
            },
        ));
        cfg.block_mut(join).stmts.push((
            "L3".into(),
            LlStmt::MethodCall {
                name: "use".into(),
                args: vec![LlComponent::var("x")],
                ret: LlLocation::Var("#_t0".into()),
            },
        ));
        cfg
    }

    #[test]
    fn test_phi_insertion_and_renaming_at_join() {
        let mut cfg = branchy_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.convert_to_ssa(&mut cfg);

        let join = cfg.block_index("BB_end").unwrap();
        let (_, phi) = &cfg.block(join).stmts[0];
        match phi {
            LlStmt::Phi { var, dst, incoming } => {
                assert_eq!(var, "x");
                assert_eq!(dst, "x_2");
                assert_eq!(
                    incoming,
                    &vec![
                        ("x_0".to_string(), "BB_then".to_string()),
                        ("x_1".to_string(), "BB_else".to_string()),
                    ]
                );
            }
            other => panic!("expected phi at join, got {other}"),
        }

        // Branch definitions renamed.
        let then = cfg.block_index("BB_then").unwrap();
        assert_eq!(cfg.block(then).stmts[0].1.to_string(), "x_0 = 1");
        let els = cfg.block_index("BB_else").unwrap();
        assert_eq!(cfg.block(els).stmts[0].1.to_string(), "x_1 = 2");

        // The use is rewritten to the phi's result.
        let (_, call) = &cfg.block(join).stmts[1];
        assert_eq!(call.to_string(), "#_t0_0 = use(x_2,)");
    }

    #[test]
    fn test_ssa_single_assignment_property() {
        let mut cfg = branchy_cfg();
        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.convert_to_ssa(&mut cfg);

        let mut defined = BTreeSet::new();
        for block in cfg.blocks() {
            for (_, stmt) in &block.stmts {
                if let Some(v) = stmt.defined_var() {
                    assert!(defined.insert(v.to_string()), "{v} defined twice");
                }
            }
        }
    }

    #[test]
    fn test_no_phi_without_join() {
        // Straight line: x = 1; x = 2.
        let mut cfg = Cfg::new();
        let a = cfg.add_block("A");
        let b = cfg.add_block("B");
        cfg.set_entry(a);
        cfg.add_edge(a, b);
        cfg.block_mut(a).stmts.push((
            "L0".into(),
            LlStmt::AssignRegular {
                dst: LlLocation::Var("x".into()),
                src: LlComponent::int(1),
            },
        ));
        cfg.block_mut(b).stmts.push((
            "L1".into(),
            LlStmt::AssignRegular {
                dst: LlLocation::Var("x".into()),
                src: LlComponent::int(2),
            },
        ));

        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.convert_to_ssa(&mut cfg);
        for block in cfg.blocks() {
            for (_, stmt) in &block.stmts {
                assert!(!matches!(stmt, LlStmt::Phi { .. }));
            }
        }
        // Sequential definitions still get distinct names.
        assert_eq!(cfg.block(a).stmts[0].1.to_string(), "x_0 = 1");
        assert_eq!(cfg.block(b).stmts[0].1.to_string(), "x_1 = 2");
    }

    #[test]
    fn test_loop_phi_for_induction_variable() {
        // entry: i = 0 -> cond (join of entry and body) -> body: i = i + 1
        // -> cond; cond -> end.
        let mut cfg = Cfg::new();
        let entry = cfg.add_block("BB_entry0");
        let cond = cfg.add_block("BB_cond");
        let body = cfg.add_block("BB_body");
        let end = cfg.add_block("BB_end");
        cfg.set_entry(entry);
        cfg.add_edge(entry, cond);
        cfg.add_edge(cond, body);
        cfg.add_edge(cond, end);
        cfg.add_edge(body, cond);

        cfg.block_mut(entry).stmts.push((
            "L0".into(),
            LlStmt::AssignRegular {
                dst: LlLocation::Var("i".into()),
                src: LlComponent::int(0),
            },
        ));
        cfg.block_mut(cond).stmts.push((
            "L1".into(),
            LlStmt::Jump {
                target: "end".into(),
                conditional: true,
                condition: Some(LlComponent::var("i")),
            },
        ));
        cfg.block_mut(body).stmts.push((
            "L2".into(),
            LlStmt::AssignBinary {
                dst: LlLocation::Var("i".into()),
                lhs: LlComponent::var("i"),
                op: "+".into(),
                rhs: LlComponent::int(1),
            },
        ));
        cfg.block_mut(end).stmts.push((
            "L3".into(),
            LlStmt::Return {
                value: Some(LlComponent::var("i")),
            },
        ));

        let mut ssa_gen = SsaGenerator::new();
        ssa_gen.convert_to_ssa(&mut cfg);

        // The loop header holds the phi merging the initial and the
        // incremented value.
        let (_, phi) = &cfg.block(cond).stmts[0];
        match phi {
            LlStmt::Phi { var, incoming, .. } => {
                assert_eq!(var, "i");
                let values: BTreeSet<&str> =
                    incoming.iter().map(|(v, _)| v.as_str()).collect();
                assert_eq!(values, BTreeSet::from(["i_0", "i_2"]));
            }
            other => panic!("expected phi in loop header, got {other}"),
        }
    }
}
