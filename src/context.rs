//! World-state snapshot, speculative change-stack, MTR bookkeeping, and the
//! partial-plan queue that together let decomposition be paused and resumed.

use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::task::CompoundTask;
use crate::trace::{NullTraceSink, TraceEvent, TraceSink};
use crate::value::{Key, Value};
use crate::world_state::{ChangeStack, Scope, WorldState, WorldStateChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Executing,
    Planning,
}

/// `(task, resumeIndex)` bookmark left by a `PausePlan` leaf inside a
/// `Sequence`. `task` is always the paused `Sequence`.
#[derive(Clone)]
pub struct PartialPlanEntry {
    pub task: Rc<CompoundTask>,
    pub resume_index: usize,
}

pub type PartialPlanQueue = VecDeque<PartialPlanEntry>;

/// Mutable, single-writer planning/execution context owned by one agent.
pub struct Context {
    world: WorldState,
    changes: ChangeStack,
    state: ContextState,
    initialized: bool,
    pub is_dirty: bool,
    mtr: Vec<i32>,
    last_mtr: Vec<i32>,
    debug_mtr_enabled: bool,
    debug_mtr: Vec<&'static str>,
    debug_last_mtr: Vec<&'static str>,
    log_decomposition_enabled: bool,
    decomposition_log: Vec<String>,
    partial_plan_queue: PartialPlanQueue,
    has_paused_partial_plan: bool,
    trace: Box<dyn TraceSink>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            world: WorldState::new(),
            changes: ChangeStack::default(),
            state: ContextState::Executing,
            initialized: false,
            is_dirty: false,
            mtr: Vec::new(),
            last_mtr: Vec::new(),
            debug_mtr_enabled: false,
            debug_mtr: Vec::new(),
            debug_last_mtr: Vec::new(),
            log_decomposition_enabled: false,
            decomposition_log: Vec::new(),
            partial_plan_queue: VecDeque::new(),
            has_paused_partial_plan: false,
            trace: Box::new(NullTraceSink),
        }
    }

    pub fn with_debug_mtr(mut self, enabled: bool) -> Self {
        self.debug_mtr_enabled = enabled;
        self
    }

    pub fn with_log_decomposition(mut self, enabled: bool) -> Self {
        self.log_decomposition_enabled = enabled;
        self
    }

    pub fn with_trace_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.trace = sink;
        self
    }

    /// Declare a world-state key and its starting value. Must be called
    /// before `init()`; the key set is fixed for the context's lifetime.
    pub fn declare(&mut self, key: Key, initial: Value) -> &mut Self {
        assert!(!self.initialized, "Context::declare called after init()");
        self.world.declare(key, initial);
        self
    }

    /// Allocate the change-stack for every declared key and transition to
    /// `Executing`.
    pub fn init(&mut self) {
        self.changes.init_for_keys(self.world.keys());
        self.state = ContextState::Executing;
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub(crate) fn begin_planning(&mut self) {
        assert!(self.initialized, "Context used before init()");
        self.state = ContextState::Planning;
    }

    pub(crate) fn end_planning(&mut self) {
        self.state = ContextState::Executing;
    }

    /// Reads: `Executing` returns the committed value; `Planning` returns the
    /// bottom (earliest-pushed) speculative value if present, else the
    /// committed value.
    pub fn get(&self, key: Key) -> Value {
        match self.state {
            ContextState::Executing => self.require(self.world.get(key), key),
            ContextState::Planning => match self.changes.bottom(key) {
                Some(change) => change.value,
                None => self.require(self.world.get(key), key),
            },
        }
    }

    fn require(&self, value: Option<Value>, key: Key) -> Value {
        value.unwrap_or_else(|| panic!("unknown world-state key: {key}"))
    }

    /// Writes: `Executing` writes straight to `WorldState` (and flags dirty
    /// when the value actually changes); `Planning` pushes a speculative
    /// change, never touching `WorldState`.
    pub fn set(&mut self, key: Key, value: Value, dirty: bool, scope: Scope) {
        match self.state {
            ContextState::Executing => {
                if self.world.get(key) != Some(value) {
                    self.world.set(key, value);
                    self.is_dirty = dirty;
                }
            }
            ContextState::Planning => {
                self.changes.push(key, WorldStateChange { scope, value });
            }
        }
    }

    pub fn get_change_depth(&self) -> BTreeMap<Key, usize> {
        self.changes.depths()
    }

    pub fn trim_to_depth(&mut self, depths: &BTreeMap<Key, usize>) {
        assert_eq!(self.state, ContextState::Planning, "trim_to_depth called while Executing");
        self.changes.trim_to_depth(depths);
    }

    pub fn trim_for_execution(&mut self) {
        assert_eq!(self.state, ContextState::Planning, "trim_for_execution called while Executing");
        self.changes.retain_permanent_only();
    }

    /// Pop the remaining top (Permanent) change per key into `WorldState`,
    /// clearing that key's stack. Called by `Domain::find_plan` after
    /// `trim_for_execution`, still while `Planning`.
    pub(crate) fn commit_permanent_changes(&mut self) {
        let keys: Vec<Key> = self.world.keys().collect();
        for key in keys {
            if let Some(change) = self.changes.take_top(key) {
                self.world.set(key, change.value);
            }
            self.changes.clear_key(key);
        }
    }

    pub(crate) fn clear_all_changes(&mut self) {
        self.changes.clear();
    }

    // --- MTR -----------------------------------------------------------

    pub fn mtr(&self) -> &[i32] {
        &self.mtr
    }

    pub fn last_mtr(&self) -> &[i32] {
        &self.last_mtr
    }

    pub fn debug_mtr(&self) -> &[&'static str] {
        &self.debug_mtr
    }

    pub fn debug_last_mtr(&self) -> &[&'static str] {
        &self.debug_last_mtr
    }

    pub fn clear_mtr(&mut self) {
        self.mtr.clear();
        self.debug_mtr.clear();
    }

    pub fn clear_last_mtr(&mut self) {
        self.last_mtr.clear();
        self.debug_last_mtr.clear();
    }

    /// `LastMTR <- MTR`.
    pub fn shift_mtr(&mut self) {
        self.last_mtr = std::mem::take(&mut self.mtr);
        self.debug_last_mtr = std::mem::take(&mut self.debug_mtr);
    }

    /// `MTR <- LastMTR`, then clear `LastMTR`.
    pub fn restore_mtr(&mut self) {
        self.mtr = std::mem::take(&mut self.last_mtr);
        self.debug_mtr = std::mem::take(&mut self.debug_last_mtr);
    }

    pub(crate) fn push_mtr_index(&mut self, index: i32, debug_name: &'static str) {
        self.mtr.push(index);
        if self.debug_mtr_enabled {
            self.debug_mtr.push(debug_name);
        }
    }

    pub(crate) fn pop_mtr(&mut self) {
        self.mtr.pop();
        if self.debug_mtr_enabled {
            self.debug_mtr.pop();
        }
    }

    // --- Partial-plan queue ---------------------------------------------

    pub fn has_paused_partial_plan(&self) -> bool {
        self.has_paused_partial_plan
    }

    pub(crate) fn set_has_paused_partial_plan(&mut self, value: bool) {
        self.has_paused_partial_plan = value;
    }

    pub(crate) fn push_partial_plan(&mut self, entry: PartialPlanEntry) {
        self.partial_plan_queue.push_back(entry);
        self.has_paused_partial_plan = true;
    }

    pub(crate) fn pop_partial_plan(&mut self) -> Option<PartialPlanEntry> {
        self.partial_plan_queue.pop_front()
    }

    pub(crate) fn partial_plan_queue_is_empty(&self) -> bool {
        self.partial_plan_queue.is_empty()
    }

    pub fn clear_partial_plan_queue(&mut self) {
        self.partial_plan_queue.clear();
        self.has_paused_partial_plan = false;
    }

    pub(crate) fn take_partial_plan_queue(&mut self) -> PartialPlanQueue {
        std::mem::take(&mut self.partial_plan_queue)
    }

    pub(crate) fn snapshot_partial_plan_queue(&self) -> PartialPlanQueue {
        self.partial_plan_queue.clone()
    }

    pub(crate) fn restore_partial_plan_queue(&mut self, queue: PartialPlanQueue) {
        self.partial_plan_queue = queue;
    }

    // --- Decomposition log / trace ---------------------------------------

    pub(crate) fn log_decomposition(&mut self, msg: impl Into<String>) {
        if self.log_decomposition_enabled {
            self.decomposition_log.push(msg.into());
        }
    }

    pub fn decomposition_log(&self) -> &[String] {
        &self.decomposition_log
    }

    pub fn emit_trace(&mut self, event: TraceEvent) {
        self.trace.emit(event);
    }

    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.trace = sink;
    }

    // --- GOAP support ------------------------------------------------------

    pub(crate) fn world_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.world.keys()
    }

    pub(crate) fn changes_top(&self, key: Key) -> Option<WorldStateChange> {
        self.changes.top(key)
    }

    pub(crate) fn world_get_raw(&self, key: Key) -> Option<Value> {
        self.world.get(key)
    }

    /// Build an isolated virtual context seeded from a GOAP snapshot: fresh
    /// `WorldState`, empty change-stack, `Planning` mode, no MTR/partial-plan
    /// state, and a no-op trace sink (the speculative search visits many
    /// snapshots per real planning pass; none of that churn is worth tracing).
    pub(crate) fn from_snapshot(base: &Context, snapshot: &BTreeMap<Key, Value>) -> Context {
        let mut world = WorldState::new();
        for (key, value) in snapshot {
            world.declare(key, *value);
        }
        let mut changes = ChangeStack::default();
        changes.init_for_keys(world.keys());
        Context {
            world,
            changes,
            state: ContextState::Planning,
            initialized: true,
            is_dirty: false,
            mtr: Vec::new(),
            last_mtr: Vec::new(),
            debug_mtr_enabled: false,
            debug_mtr: Vec::new(),
            debug_last_mtr: Vec::new(),
            log_decomposition_enabled: base.log_decomposition_enabled,
            decomposition_log: Vec::new(),
            partial_plan_queue: VecDeque::new(),
            has_paused_partial_plan: false,
            trace: Box::new(NullTraceSink),
        }
    }
}

/// Resolve the "effective" value of every declared key: the top of its
/// change-stack if present, else the committed world value. Used to build
/// GOAP snapshots, which must see speculative writes made earlier in the same
/// search branch.
pub(crate) fn resolve_effective_state(ctx: &Context) -> BTreeMap<Key, Value> {
    ctx.world_keys()
        .map(|key| {
            let value = ctx
                .changes_top(key)
                .map(|c| c.value)
                .or_else(|| ctx.world_get_raw(key))
                .unwrap_or_else(|| panic!("unknown world-state key: {key}"));
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_then_restore_is_a_no_op_when_last_mtr_was_empty() {
        let mut ctx = Context::new();
        ctx.init();
        ctx.push_mtr_index(0, "a");
        ctx.push_mtr_index(2, "b");
        let mtr_before = ctx.mtr().to_vec();

        ctx.shift_mtr();
        ctx.restore_mtr();

        assert_eq!(ctx.mtr(), mtr_before.as_slice());
        assert!(ctx.last_mtr().is_empty());
    }

    #[test]
    fn get_reads_bottom_of_stack_during_planning() {
        let mut ctx = Context::new();
        ctx.declare("k", Value::Int(0));
        ctx.init();
        ctx.begin_planning();
        ctx.set("k", Value::Int(1), true, Scope::PlanOnly);
        ctx.set("k", Value::Int(2), true, Scope::PlanOnly);

        assert_eq!(ctx.get("k"), Value::Int(1));
    }

    #[test]
    fn set_during_executing_writes_straight_through() {
        let mut ctx = Context::new();
        ctx.declare("k", Value::Int(0));
        ctx.init();
        ctx.set("k", Value::Int(5), true, Scope::Permanent);

        assert_eq!(ctx.get("k"), Value::Int(5));
        assert!(ctx.is_dirty);
    }
}
