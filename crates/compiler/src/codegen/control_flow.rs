//! Control-flow lowering: if/else, while, do-while, for, break, continue.
//!
//! Conditional jumps branch when the condition is **zero** (ifZ), so every
//! emission here orders its branches against that polarity. Each construct
//! draws one fresh base label `Lk` and derives its named labels from it
//! (`if.then.Lk`, `for.cond.Lk`, ...), which keeps the per-function label
//! namespace flat and unique.

use super::LirGen;
use crate::ast::{Compound, Expr, Span, Stmt};
use crate::lir::LlStmt;

impl LirGen<'_> {
    /// `if (c) S1 else S2`
    ///
    /// Emits `ifZ c goto else` (or straight to `end` with no else), the
    /// then-branch, a jump over the else-branch, and empty statements at
    /// the `else`/`end` labels.
    pub(super) fn gen_if(
        &mut self,
        cond: &Expr,
        then_branch: &Compound,
        else_branch: Option<&Stmt>,
    ) {
        let base = self.builder.generate_label();
        let else_label = format!("if.else.{base}");
        let end_label = format!("if.end.{base}");

        let Some(cond_value) = self.gen_expr(cond) else {
            return;
        };

        match else_branch {
            Some(alt) => {
                self.builder.append(LlStmt::Jump {
                    target: else_label.clone(),
                    conditional: true,
                    condition: Some(cond_value),
                });
                self.gen_compound(then_branch);
                self.builder.append(LlStmt::Jump {
                    target: end_label.clone(),
                    conditional: false,
                    condition: None,
                });
                self.builder.append_labeled(&else_label, LlStmt::Empty);
                self.gen_stmt(alt);
            }
            None => {
                self.builder.append(LlStmt::Jump {
                    target: end_label.clone(),
                    conditional: true,
                    condition: Some(cond_value),
                });
                self.gen_compound(then_branch);
            }
        }
        self.builder.append_labeled(&end_label, LlStmt::Empty);
    }

    /// `while (c) S`
    ///
    /// cond: evaluate `c`; `ifZ c goto end`; body; `goto cond`; end.
    pub(super) fn gen_while(&mut self, cond: &Expr, body: &Compound) {
        let base = self.builder.generate_label();
        let cond_label = format!("while.cond.{base}");
        let end_label = format!("while.end.{base}");

        self.builder.append_labeled(&cond_label, LlStmt::Empty);
        let Some(cond_value) = self.gen_expr(cond) else {
            return;
        };
        self.builder.append(LlStmt::Jump {
            target: end_label.clone(),
            conditional: true,
            condition: Some(cond_value),
        });

        self.builder
            .enter_loop(end_label.clone(), cond_label.clone());
        self.gen_compound(body);
        self.builder.exit_loop();

        self.builder.append(LlStmt::Jump {
            target: cond_label,
            conditional: false,
            condition: None,
        });
        self.builder.append_labeled(&end_label, LlStmt::Empty);
    }

    /// `for (init; cond; update) S`, each clause possibly empty.
    ///
    /// The condition exit is an asymmetric pair: a conditional jump to the
    /// body followed by an unconditional jump to the end. An empty
    /// condition loops unconditionally into the body.
    pub(super) fn gen_for(
        &mut self,
        init: Option<&Expr>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &Compound,
    ) {
        if let Some(init) = init {
            self.gen_expr(init);
        }

        let base = self.builder.generate_label();
        let cond_label = format!("for.cond.{base}");
        let body_label = format!("for.body.{base}");
        let inc_label = format!("for.inc.{base}");
        let end_label = format!("for.end.{base}");

        self.builder.append_labeled(&cond_label, LlStmt::Empty);
        match cond {
            Some(cond) => {
                let Some(cond_value) = self.gen_expr(cond) else {
                    return;
                };
                self.builder.append(LlStmt::Jump {
                    target: body_label.clone(),
                    conditional: true,
                    condition: Some(cond_value),
                });
                self.builder.append(LlStmt::Jump {
                    target: end_label.clone(),
                    conditional: false,
                    condition: None,
                });
            }
            None => {
                self.builder.append(LlStmt::Jump {
                    target: body_label.clone(),
                    conditional: false,
                    condition: None,
                });
            }
        }

        self.builder.append_labeled(&body_label, LlStmt::Empty);
        self.builder
            .enter_loop(end_label.clone(), cond_label.clone());
        self.gen_compound(body);
        self.builder.exit_loop();

        self.builder.append_labeled(&inc_label, LlStmt::Empty);
        if let Some(update) = update {
            self.gen_expr(update);
        }
        self.builder.append(LlStmt::Jump {
            target: cond_label,
            conditional: false,
            condition: None,
        });
        self.builder.append_labeled(&end_label, LlStmt::Empty);
    }

    /// `do S while (c)`: body runs first, the condition exit follows it.
    pub(super) fn gen_do_while(&mut self, body: &Compound, cond: &Expr) {
        let base = self.builder.generate_label();
        let body_label = format!("do.body.{base}");
        let cond_label = format!("do.cond.{base}");
        let end_label = format!("do.end.{base}");

        self.builder.append_labeled(&body_label, LlStmt::Empty);
        self.builder
            .enter_loop(end_label.clone(), cond_label.clone());
        self.gen_compound(body);
        self.builder.exit_loop();

        self.builder.append_labeled(&cond_label, LlStmt::Empty);
        let Some(cond_value) = self.gen_expr(cond) else {
            return;
        };
        self.builder.append(LlStmt::Jump {
            target: end_label.clone(),
            conditional: true,
            condition: Some(cond_value),
        });
        self.builder.append(LlStmt::Jump {
            target: body_label,
            conditional: false,
            condition: None,
        });
        self.builder.append_labeled(&end_label, LlStmt::Empty);
    }

    /// `break`: unconditional jump to the innermost loop's end label.
    pub(super) fn gen_break(&mut self, span: Span) {
        match self.builder.current_block() {
            Some(end) => {
                let target = end.to_string();
                self.builder.append(LlStmt::Jump {
                    target,
                    conditional: false,
                    condition: None,
                });
            }
            None => eprintln!(
                "Error: break outside of a loop, line: {} col: {}",
                span.line, span.col
            ),
        }
    }

    /// `continue`: unconditional jump to the innermost loop's condition
    /// entry.
    pub(super) fn gen_continue(&mut self, span: Span) {
        match self.builder.current_loop_condition() {
            Some(cond) => {
                let target = cond.to_string();
                self.builder.append(LlStmt::Jump {
                    target,
                    conditional: false,
                    condition: None,
                });
            }
            None => eprintln!(
                "Error: continue outside of a loop, line: {} col: {}",
                span.line, span.col
            ),
        }
    }
}
