//! Highest-scoring valid child wins; ties keep the earlier candidate. Unlike
//! `Selector`, a losing winner is not retried against the runner-up — the
//! scored choice is final for this pass.

use std::rc::Rc;

use super::{decompose as decompose_task, is_valid, DecomposeResult, DecomposeStatus};
use crate::context::Context;
use crate::task::{CompoundTask, Task};
use crate::trace::TraceEvent;

pub(crate) fn decompose(task: &Rc<CompoundTask>, ctx: &mut Context, start_index: usize) -> DecomposeResult {
    let mut best: Option<(f64, usize)> = None;

    for (i, child) in task.children.iter().enumerate().skip(start_index) {
        if !is_valid(child, ctx) {
            continue;
        }
        let score = score_of(child, ctx);
        match best {
            Some((best_score, _)) if score == best_score => {
                ctx.emit_trace(TraceEvent::new("utility.tie").with_a(i as i64));
            }
            // Strict improvement replaces the incumbent; a tie keeps the
            // earlier (lower-index) candidate.
            Some((best_score, _)) if score <= best_score => {}
            _ => best = Some((score, i)),
        }
    }

    let Some((_, winner_index)) = best else {
        return DecomposeResult::failed();
    };

    let winner = &task.children[winner_index];
    ctx.push_mtr_index(winner_index as i32, winner.name());
    match winner {
        Task::Primitive(p) => {
            p.apply_effects(ctx);
            DecomposeResult::succeeded(vec![Rc::clone(p)])
        }
        Task::Compound(_) | Task::Slot(_) => {
            let result = decompose_task(winner, ctx, 0);
            if result.status == DecomposeStatus::Failed {
                ctx.pop_mtr();
            }
            result
        }
        Task::PausePlan(_) => {
            ctx.pop_mtr();
            DecomposeResult::failed()
        }
    }
}

fn score_of(task: &Task, ctx: &Context) -> f64 {
    match task {
        Task::Primitive(p) => p.utility_score(ctx),
        Task::Compound(c) => c.utility_score(ctx),
        Task::Slot(slot) => slot.borrow().subtask().map(|s| score_of(s, ctx)).unwrap_or(f64::MIN),
        Task::PausePlan(_) => f64::MIN,
    }
}
