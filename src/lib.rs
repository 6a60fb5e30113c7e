//! A deterministic hierarchical task network (HTN) decomposition engine and
//! planner tick loop for autonomous agents, with an embedded GOAP A* search
//! available as one compound-task decomposition strategy alongside Selector,
//! Sequence and UtilitySelector.
//!
//! The task tree is a plain [`task::Task`] tagged union rather than a
//! virtual-dispatch hierarchy; planning is speculative (writes during a
//! `Planning` pass go to a per-key [`world_state::ChangeStack`] instead of
//! [`world_state::WorldState`] directly) and governed by a Method Traversal
//! Record so replanning prefers paths at least as good as the one already
//! executing.

#![forbid(unsafe_code)]

pub mod context;
pub mod decompose;
pub mod domain;
pub mod error;
pub mod planner;
pub mod task;
pub mod trace;
pub mod value;
pub mod world_state;

pub use context::{Context, ContextState, PartialPlanEntry};
pub use decompose::{DecomposeResult, DecomposeStatus};
pub use domain::{Domain, PlanResult, PlanStatus};
pub use error::SlotBindError;
pub use planner::{LastStatus, NullCallbacks, Planner, PlannerCallbacks};
pub use task::{
    CompoundTag, CompoundTask, Condition, DynamicGenerator, Effect, GoapCostFn, HeuristicFn, OperatorFn,
    OperatorResult, PausePlanTask, PrimitiveTask, SlotTask, Task, UtilityFn,
};
pub use trace::{NullTraceSink, TraceEvent, TraceSink, VecTraceSink};
pub use value::{Key, Value};
pub use world_state::{Scope, WorldState, WorldStateChange};
