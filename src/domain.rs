//! A fixed task tree plus its late-bound slots, and the top-level
//! `find_plan` orchestration: planning transaction bracketing, MTR-guard
//! enforcement, and change-stack commit/rollback.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::Context;
use crate::decompose::{decompose, DecomposeResult, DecomposeStatus};
use crate::error::SlotBindError;
use crate::task::{CompoundTask, SlotTask, Task};

pub type PlanStatus = DecomposeStatus;

#[derive(Clone)]
pub struct PlanResult {
    pub status: PlanStatus,
    pub plan: Vec<Rc<crate::task::PrimitiveTask>>,
}

/// An immutable task tree (the root is always a `Selector`/`Sequence`-style
/// compound, per convention) plus its registered `Slot`s, administered by id.
pub struct Domain {
    root: Task,
    slots: BTreeMap<u32, Rc<RefCell<SlotTask>>>,
}

impl Domain {
    pub fn new(root: Rc<CompoundTask>) -> Self {
        Self { root: Task::Compound(root), slots: BTreeMap::new() }
    }

    pub fn root(&self) -> &Task {
        &self.root
    }

    pub fn register_slot(&mut self, slot: Rc<RefCell<SlotTask>>) {
        let id = slot.borrow().id;
        self.slots.insert(id, slot);
    }

    pub fn slot(&self, id: u32) -> Option<&Rc<RefCell<SlotTask>>> {
        self.slots.get(&id)
    }

    /// Bind `subtask` into slot `id`. Rejects an unknown slot, a slot that is
    /// already bound, and a subtask that (transitively) re-binds the same
    /// slot to itself — the one cycle a single bind call can introduce,
    /// since slots may only be bound once and never rebound.
    pub fn try_set_slot_domain(&mut self, id: u32, subtask: Task) -> Result<(), SlotBindError> {
        let slot = self.slots.get(&id).ok_or(SlotBindError::UnknownSlot(id))?;

        if contains_slot(&subtask, id) {
            return Err(SlotBindError::SelfCycle(id));
        }

        slot.borrow_mut().set_subtask(subtask)
    }

    pub fn clear_slot(&mut self, id: u32) -> Result<(), SlotBindError> {
        let slot = self.slots.get(&id).ok_or(SlotBindError::UnknownSlot(id))?;
        slot.borrow_mut().clear();
        Ok(())
    }

    /// Run one full planning pass: resumes a paused partial plan if one is
    /// pending and no fresher MTR has been recorded, otherwise decomposes
    /// fresh from the root. Brackets the whole thing in `Planning` state and
    /// either commits surviving `Permanent` changes or rolls everything back.
    ///
    /// Does **not** commit the freshly produced `MTR` into `LastMTR` —
    /// `shiftMTR` is the caller's responsibility (spec §4.9 step 1, owned by
    /// `Planner::tick`), since only the caller knows whether the plan
    /// returned here is actually being adopted. `find_plan` only ever reads
    /// `LastMTR`, to decide whether to resume a partial plan and to guard
    /// against a same-or-worse replan.
    pub fn find_plan(&self, ctx: &mut Context) -> PlanResult {
        assert!(ctx.is_initialized(), "Context used before init()");

        ctx.begin_planning();

        let result = if ctx.has_paused_partial_plan() && ctx.last_mtr().is_empty() {
            self.resume_partial_plan(ctx)
        } else {
            self.fresh_plan(ctx)
        };
        // The guard only ever has teeth against the fresh-decomposition path:
        // resuming a partial plan is gated on `LastMTR` already being empty,
        // so there is nothing for it to beat there. A freshly decomposed plan
        // can still tie or lose to a `LastMTR` left over from the plan it is
        // trying to replace.
        let result = self.apply_mtr_guard(ctx, result);

        self.commit_or_rollback(ctx, &result);

        ctx.end_planning();

        PlanResult { status: result.status, plan: result.plan }
    }

    fn fresh_plan(&self, ctx: &mut Context) -> DecomposeResult {
        ctx.clear_mtr();
        let stashed_queue = ctx.snapshot_partial_plan_queue();
        let result = decompose(&self.root, ctx, 0);
        if result.status == DecomposeStatus::Failed || result.status == DecomposeStatus::Rejected {
            ctx.restore_partial_plan_queue(stashed_queue);
        }
        result
    }

    fn resume_partial_plan(&self, ctx: &mut Context) -> DecomposeResult {
        let Some(entry) = ctx.pop_partial_plan() else {
            return self.fresh_plan(ctx);
        };
        if ctx.partial_plan_queue_is_empty() {
            ctx.set_has_paused_partial_plan(false);
        }
        crate::decompose::resume_sequence(&entry.task, ctx, entry.resume_index)
    }

    /// `Domain::findPlan`'s final safeguard (invariant 4): even a
    /// `Succeeded`/`Partial` result is downgraded to `Rejected` if the
    /// freshly produced MTR is lexicographically `>=` `LastMTR`.
    ///
    /// `[i32]`'s `Ord` already implements true lexicographic order — an
    /// equal-valued shared prefix falls back to comparing lengths, with the
    /// shorter sequence (a decision taken at a shallower depth, with nothing
    /// left to lose further down) ranking lower/better. That covers not just
    /// the equal-length case but e.g. `last=[0]` vs. a longer `mtr=[0, 0]`
    /// (the old branch still wins: its shorter MTR needed no later decision
    /// to beat this one) and `last=[0]` vs. `mtr=[1, 0]` (rejected outright:
    /// `mtr`'s first entry alone already loses to `last`'s).
    fn apply_mtr_guard(&self, ctx: &Context, result: DecomposeResult) -> DecomposeResult {
        if result.status != DecomposeStatus::Succeeded && result.status != DecomposeStatus::Partial {
            return result;
        }
        let last = ctx.last_mtr();
        if last.is_empty() {
            return result;
        }
        if ctx.mtr() >= last {
            return DecomposeResult::rejected();
        }
        result
    }

    fn commit_or_rollback(&self, ctx: &mut Context, result: &DecomposeResult) {
        match result.status {
            DecomposeStatus::Succeeded | DecomposeStatus::Partial => {
                ctx.trim_for_execution();
                ctx.commit_permanent_changes();
            }
            DecomposeStatus::Failed | DecomposeStatus::Rejected => {
                ctx.clear_all_changes();
            }
        }
    }
}

fn contains_slot(task: &Task, id: u32) -> bool {
    match task {
        Task::Slot(s) => s.borrow().id == id || s.borrow().subtask().is_some_and(|t| contains_slot(t, id)),
        Task::Compound(c) => c.children.iter().any(|child| contains_slot(child, id)),
        Task::Primitive(_) | Task::PausePlan(_) => false,
    }
}
