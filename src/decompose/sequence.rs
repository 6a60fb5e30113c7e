//! All children must succeed, in order; a `PausePlan` child suspends instead
//! of failing, recording a resume bookmark.

use std::rc::Rc;

use super::{decompose as decompose_task, is_valid, DecomposeResult, DecomposeStatus};
use crate::context::{Context, PartialPlanEntry};
use crate::task::{CompoundTask, PrimitiveTask, Task};

pub(crate) fn decompose(task: &Rc<CompoundTask>, ctx: &mut Context, start_index: usize) -> DecomposeResult {
    let old_depth = ctx.get_change_depth();
    let mut plan: Vec<Rc<PrimitiveTask>> = Vec::new();

    for (i, child) in task.children.iter().enumerate().skip(start_index) {
        match child {
            Task::PausePlan(_) => {
                ctx.set_has_paused_partial_plan(true);
                ctx.push_partial_plan(PartialPlanEntry { task: Rc::clone(task), resume_index: i + 1 });
                return DecomposeResult::partial(plan);
            }
            _ if !is_valid(child, ctx) => {
                ctx.trim_to_depth(&old_depth);
                return DecomposeResult::failed();
            }
            Task::Primitive(p) => {
                p.apply_effects(ctx);
                plan.push(Rc::clone(p));
            }
            Task::Compound(_) | Task::Slot(_) => {
                let result = decompose_task(child, ctx, 0);
                match result.status {
                    DecomposeStatus::Rejected | DecomposeStatus::Failed => {
                        ctx.trim_to_depth(&old_depth);
                        return result;
                    }
                    DecomposeStatus::Succeeded => plan.extend(result.plan),
                    DecomposeStatus::Partial => {
                        plan.extend(result.plan);
                        let more_siblings_remain = i + 1 < task.children.len();
                        if more_siblings_remain {
                            ctx.push_partial_plan(PartialPlanEntry { task: Rc::clone(task), resume_index: i + 1 });
                        }
                        return DecomposeResult::partial(plan);
                    }
                }
            }
        }
    }

    DecomposeResult::succeeded(plan)
}
