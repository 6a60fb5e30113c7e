//! Dispatch table for the four compound-task decomposition strategies.

mod goap;
mod selector;
mod sequence;
mod utility;

use std::rc::Rc;

use crate::context::Context;
use crate::task::{CompoundTag, CompoundTask, PrimitiveTask, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecomposeStatus {
    Succeeded,
    Failed,
    Rejected,
    Partial,
}

#[derive(Clone)]
pub struct DecomposeResult {
    pub status: DecomposeStatus,
    pub plan: Vec<Rc<PrimitiveTask>>,
}

impl DecomposeResult {
    pub fn failed() -> Self {
        Self { status: DecomposeStatus::Failed, plan: Vec::new() }
    }

    pub fn rejected() -> Self {
        Self { status: DecomposeStatus::Rejected, plan: Vec::new() }
    }

    pub fn succeeded(plan: Vec<Rc<PrimitiveTask>>) -> Self {
        Self { status: DecomposeStatus::Succeeded, plan }
    }

    pub fn partial(plan: Vec<Rc<PrimitiveTask>>) -> Self {
        Self { status: DecomposeStatus::Partial, plan }
    }
}

/// `task.isValid(ctx)` across every task kind. `PausePlan` is always valid; a
/// bound `Slot` defers to its bound subtask, an unbound one is invalid.
pub(crate) fn is_valid(task: &Task, ctx: &Context) -> bool {
    match task {
        Task::Primitive(p) => p.is_valid(ctx),
        Task::Compound(c) => c.is_valid(),
        Task::PausePlan(_) => true,
        Task::Slot(slot) => {
            let slot = slot.borrow();
            match slot.subtask() {
                Some(sub) => is_valid(sub, ctx),
                None => false,
            }
        }
    }
}

/// Entry point for decomposing any task, starting at `start_index` for
/// compound tasks resumed from a partial-plan bookmark (fresh decompositions
/// always pass 0).
pub(crate) fn decompose(task: &Task, ctx: &mut Context, start_index: usize) -> DecomposeResult {
    match task {
        Task::Primitive(p) => {
            if !p.is_valid(ctx) {
                return DecomposeResult::failed();
            }
            p.apply_effects(ctx);
            DecomposeResult::succeeded(vec![Rc::clone(p)])
        }
        Task::PausePlan(_) => DecomposeResult::failed(),
        Task::Slot(slot) => {
            let sub = slot.borrow().subtask().cloned();
            match sub {
                Some(sub) => decompose(&sub, ctx, start_index),
                None => DecomposeResult::failed(),
            }
        }
        Task::Compound(c) => {
            if !c.is_valid() {
                return DecomposeResult::failed();
            }
            match c.tag {
                CompoundTag::Selector => selector::decompose(c, ctx, start_index),
                CompoundTag::Sequence => sequence::decompose(c, ctx, start_index),
                CompoundTag::UtilitySelector => utility::decompose(c, ctx, start_index),
                CompoundTag::GoapSequence => goap::decompose(c, ctx),
            }
        }
    }
}

/// Resume a paused `Sequence` at its bookmarked child index. Used only by
/// `Domain::find_plan` when adopting a queued partial-plan entry.
pub(crate) fn resume_sequence(task: &Rc<CompoundTask>, ctx: &mut Context, resume_index: usize) -> DecomposeResult {
    sequence::decompose(task, ctx, resume_index)
}
