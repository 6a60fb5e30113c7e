//! The tick loop: drives one primitive at a time out of the current plan,
//! replanning through a `Domain` when the plan runs dry, is invalidated, or
//! the world goes dirty mid-execution.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::context::Context;
use crate::decompose::DecomposeStatus;
use crate::domain::Domain;
use crate::task::{OperatorResult, PrimitiveTask};
use crate::world_state::Scope;

/// Hooks fired at each notable point in a tick, mirroring `ai_core::Policy`'s
/// observer-style callback surface. All default to doing nothing, so a
/// caller only overrides what it cares about.
#[allow(unused_variables)]
pub trait PlannerCallbacks {
    fn on_new_plan(&mut self, plan: &VecDeque<Rc<PrimitiveTask>>) {}
    fn on_replace_plan(&mut self, old_plan: &[Rc<PrimitiveTask>], new_plan: &VecDeque<Rc<PrimitiveTask>>) {}
    fn on_new_task(&mut self, task: &PrimitiveTask) {}
    fn on_new_task_condition_failed(&mut self, task: &PrimitiveTask) {}
    fn on_stop_current_task(&mut self, task: &PrimitiveTask) {}
    fn on_current_task_completed_successfully(&mut self, task: &PrimitiveTask) {}
    fn on_apply_effect(&mut self, task: &PrimitiveTask, effect_name: &'static str) {}
    fn on_current_task_failed(&mut self, task: &PrimitiveTask) {}
    fn on_current_task_continues(&mut self, task: &PrimitiveTask) {}
    fn on_current_task_executing_condition_failed(&mut self, task: &PrimitiveTask) {}
}

pub struct NullCallbacks;
impl PlannerCallbacks for NullCallbacks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastStatus {
    None,
    Success,
    Failure,
    Running,
}

/// One agent's plan cursor plus the callback sink watching it.
pub struct Planner<C: PlannerCallbacks = NullCallbacks> {
    current_task: Option<Rc<PrimitiveTask>>,
    plan: VecDeque<Rc<PrimitiveTask>>,
    last_status: LastStatus,
    last_plan_status: Option<DecomposeStatus>,
    pub callbacks: C,
}

impl Default for Planner<NullCallbacks> {
    fn default() -> Self {
        Self::new(NullCallbacks)
    }
}

impl<C: PlannerCallbacks> Planner<C> {
    pub fn new(callbacks: C) -> Self {
        Self {
            current_task: None,
            plan: VecDeque::new(),
            last_status: LastStatus::None,
            last_plan_status: None,
            callbacks,
        }
    }

    pub fn last_status(&self) -> LastStatus {
        self.last_status
    }

    pub fn current_task(&self) -> Option<&Rc<PrimitiveTask>> {
        self.current_task.as_ref()
    }

    pub fn plan(&self) -> &VecDeque<Rc<PrimitiveTask>> {
        &self.plan
    }

    /// Drop all in-flight state: current task, queued plan, and MTR/partial
    /// plan bookkeeping on `ctx`. Does not touch `WorldState`.
    pub fn reset(&mut self, ctx: &mut Context) {
        self.stop_current_task(ctx);
        self.plan.clear();
        self.last_status = LastStatus::None;
        self.last_plan_status = None;
        ctx.clear_mtr();
        ctx.clear_last_mtr();
        ctx.clear_partial_plan_queue();
        ctx.is_dirty = false;
    }

    /// Advance the agent by one logical step. `allow_immediate_replan` governs
    /// whether a plan exhausted or invalidated mid-tick may immediately pull a
    /// fresh plan and keep executing within the same tick, or whether it
    /// should instead surface as an empty tick for the caller to retry next
    /// frame.
    pub fn tick(&mut self, domain: &Domain, ctx: &mut Context, allow_immediate_replan: bool) {
        let mut replanned_this_tick = false;

        if self.should_replan(ctx) {
            self.replan(domain, ctx);
            replanned_this_tick = true;
        }

        if self.current_task.is_none() {
            if !self.dequeue_next(ctx) {
                self.finish_tick_with_no_progress(replanned_this_tick);
                return;
            }
        }

        self.advance_current(domain, ctx, allow_immediate_replan, replanned_this_tick);
    }

    fn should_replan(&self, ctx: &Context) -> bool {
        self.plan.is_empty() && self.current_task.is_none() || ctx.is_dirty
    }

    fn replan(&mut self, domain: &Domain, ctx: &mut Context) {
        let stashed = ctx.is_dirty && ctx.has_paused_partial_plan();
        if stashed {
            ctx.shift_mtr();
        }

        let old_plan: Vec<Rc<PrimitiveTask>> = self.plan.iter().cloned().collect();
        let result = domain.find_plan(ctx);
        self.last_plan_status = Some(result.status);

        match result.status {
            DecomposeStatus::Succeeded | DecomposeStatus::Partial => {
                // A plan was "running" if there was a queued plan or a task
                // already in flight — captured before `stop_current_task`
                // clears the latter.
                let plan_was_running = !old_plan.is_empty() || self.current_task.is_some();
                self.plan = result.plan.into_iter().collect();
                // A fresh plan supersedes whatever was running: the old
                // current task is stopped (not aborted — it didn't fail,
                // it was superseded) before the next dequeue picks the new
                // plan's first task.
                self.stop_current_task(ctx);
                // `find_plan` only reads `LastMTR`; committing the freshly
                // produced MTR into it is this call's responsibility alone,
                // per spec §4.9 step 1 — `find_plan` must not also shift, or
                // `LastMTR` would be overwritten with the now-empty `MTR`.
                ctx.shift_mtr();
                ctx.is_dirty = false;
                if plan_was_running {
                    self.callbacks.on_replace_plan(&old_plan, &self.plan);
                } else {
                    self.callbacks.on_new_plan(&self.plan);
                }
            }
            DecomposeStatus::Failed | DecomposeStatus::Rejected => {
                if stashed {
                    ctx.restore_mtr();
                }
            }
        }
    }

    /// Pop the next primitive and re-check its preconditions; a task whose
    /// preconditions no longer hold by the time it is dequeued aborts the
    /// whole remaining plan rather than silently skipping ahead.
    fn dequeue_next(&mut self, ctx: &mut Context) -> bool {
        let Some(task) = self.plan.pop_front() else { return false };
        self.callbacks.on_new_task(&task);

        if !task.is_valid(ctx) {
            self.callbacks.on_new_task_condition_failed(&task);
            self.abort_plan(ctx);
            return false;
        }

        self.current_task = Some(task);
        true
    }

    fn abort_plan(&mut self, ctx: &mut Context) {
        self.plan.clear();
        ctx.clear_mtr();
        ctx.clear_last_mtr();
        ctx.clear_partial_plan_queue();
        ctx.is_dirty = false;
    }

    fn advance_current(&mut self, domain: &Domain, ctx: &mut Context, allow_immediate_replan: bool, replanned_this_tick: bool) {
        let Some(task) = self.current_task.clone() else {
            self.finish_tick_with_no_progress(replanned_this_tick);
            return;
        };

        if !task.executing_conditions_hold(ctx) {
            self.callbacks.on_current_task_executing_condition_failed(&task);
            self.abort_current_task(ctx, &task);
            if allow_immediate_replan {
                self.tick(domain, ctx, false);
            } else {
                self.last_status = LastStatus::Failure;
            }
            return;
        }

        let Some(operator) = task.operator.as_ref() else {
            self.last_status = LastStatus::Running;
            return;
        };

        match operator(ctx) {
            OperatorResult::Success => {
                for effect in &task.effects {
                    if effect.scope == Scope::PlanAndExecute {
                        let value = (effect.compute)(ctx);
                        ctx.set(effect.key, value, false, effect.scope);
                        self.callbacks.on_apply_effect(&task, effect.name);
                    }
                }
                self.callbacks.on_current_task_completed_successfully(&task);
                self.current_task = None;
                self.last_status = LastStatus::Success;
                if self.plan.is_empty() {
                    ctx.clear_last_mtr();
                    ctx.is_dirty = false;
                }
                if allow_immediate_replan {
                    self.tick(domain, ctx, false);
                }
            }
            OperatorResult::Failure => {
                self.callbacks.on_current_task_failed(&task);
                self.abort_current_task(ctx, &task);
                if allow_immediate_replan {
                    self.tick(domain, ctx, false);
                } else {
                    self.last_status = LastStatus::Failure;
                }
            }
            OperatorResult::Continue => {
                self.callbacks.on_current_task_continues(&task);
                self.last_status = LastStatus::Running;
            }
        }
    }

    /// Invoked only when a running task is superseded by a freshly adopted
    /// plan (not a failure of its own). Fires `stop`, not `abort`.
    fn stop_current_task(&mut self, ctx: &mut Context) {
        if let Some(task) = self.current_task.take() {
            if let Some(stop) = task.stop.as_ref() {
                stop(ctx);
            }
            self.callbacks.on_stop_current_task(&task);
        }
    }

    /// Invoked when a running task's own executing-conditions or operator
    /// fail. Fires `abort`, not `stop` — the task is being cut short, not
    /// cleanly handed off to a replacement plan.
    fn abort_current_task(&mut self, ctx: &mut Context, task: &Rc<PrimitiveTask>) {
        if let Some(abort) = task.abort.as_ref() {
            abort(ctx);
        }
        self.current_task = None;
        self.abort_plan(ctx);
    }

    fn finish_tick_with_no_progress(&mut self, replanned_this_tick: bool) {
        if !replanned_this_tick {
            if matches!(self.last_plan_status, Some(DecomposeStatus::Failed) | Some(DecomposeStatus::Rejected)) {
                self.last_status = LastStatus::Failure;
                return;
            }
        }
        self.last_status = LastStatus::None;
    }
}
