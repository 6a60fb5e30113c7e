//! First-valid-child wins, with MTR-guided priority over re-decomposition.

use std::rc::Rc;

use super::{decompose as decompose_task, is_valid, DecomposeResult, DecomposeStatus};
use crate::context::Context;
use crate::task::{CompoundTask, Task};

pub(super) fn decompose_selector(task: &Rc<CompoundTask>, ctx: &mut Context, start_index: usize) -> DecomposeResult {
    for (i, child) in task.children.iter().enumerate().skip(start_index) {
        let index = i as i32;
        if !is_valid(child, ctx) {
            continue;
        }
        match child {
            Task::Primitive(p) => {
                if !p.is_valid(ctx) {
                    continue;
                }
                p.apply_effects(ctx);
                ctx.push_mtr_index(index, child.name());
                return DecomposeResult::succeeded(vec![Rc::clone(p)]);
            }
            Task::Compound(_) | Task::Slot(_) => {
                ctx.push_mtr_index(index, child.name());
                let result = decompose_task(child, ctx, 0);
                match result.status {
                    DecomposeStatus::Rejected => return result,
                    DecomposeStatus::Failed => {
                        ctx.pop_mtr();
                        continue;
                    }
                    DecomposeStatus::Succeeded | DecomposeStatus::Partial => return result,
                }
            }
            Task::PausePlan(_) => continue,
        }
    }
    DecomposeResult::failed()
}

pub(crate) fn decompose(task: &Rc<CompoundTask>, ctx: &mut Context, start_index: usize) -> DecomposeResult {
    decompose_selector(task, ctx, start_index)
}
