use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::Task;
use crate::context::Context;
use crate::value::{Key, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundTag {
    Selector,
    Sequence,
    UtilitySelector,
    GoapSequence,
}

pub type UtilityFn = Box<dyn Fn(&Context) -> f64>;
pub type GoapCostFn = Box<dyn Fn(&Context) -> u32>;
pub type HeuristicFn = Box<dyn Fn(&BTreeMap<Key, Value>, &BTreeMap<Key, Value>) -> f64>;

/// A dynamic-generator callback (GoapSequence only): produces extra candidate
/// children from the current context. `Err` models the source's "generator
/// raised an exception" case — its contribution is skipped and the failure is
/// logged to `Context`'s decomposition log, planning otherwise continues.
pub type DynamicGenerator = Box<dyn Fn(&Context) -> Result<Vec<Task>, String>>;

/// A non-leaf task: a decomposition strategy over an ordered set of children.
pub struct CompoundTask {
    pub name: &'static str,
    pub tag: CompoundTag,
    pub children: Vec<Task>,
    /// `GoapSequence` only: the key/value pairs that must hold in the
    /// resulting snapshot for the search to terminate successfully.
    pub goal: Option<BTreeMap<Key, Value>>,
    pub dynamic_generators: Vec<DynamicGenerator>,
    pub utility_score: Option<UtilityFn>,
    pub goap_cost: Option<GoapCostFn>,
    pub heuristic: Option<HeuristicFn>,
    /// Weighted-A* weight (>= 1.0); 1.0 is plain A*.
    pub heuristic_weight: f64,
    pub max_goap_expansions: usize,
    pub(crate) parent: RefCell<Weak<CompoundTask>>,
}

pub(crate) const DEFAULT_MAX_GOAP_EXPANSIONS: usize = 4096;

impl CompoundTask {
    pub fn new(name: &'static str, tag: CompoundTag) -> Self {
        Self {
            name,
            tag,
            children: Vec::new(),
            goal: None,
            dynamic_generators: Vec::new(),
            utility_score: None,
            goap_cost: None,
            heuristic: None,
            heuristic_weight: 1.0,
            max_goap_expansions: DEFAULT_MAX_GOAP_EXPANSIONS,
            parent: RefCell::new(Weak::new()),
        }
    }

    pub fn selector(name: &'static str) -> Self {
        Self::new(name, CompoundTag::Selector)
    }

    pub fn sequence(name: &'static str) -> Self {
        Self::new(name, CompoundTag::Sequence)
    }

    pub fn utility_selector(name: &'static str) -> Self {
        Self::new(name, CompoundTag::UtilitySelector)
    }

    pub fn goap_sequence(name: &'static str, goal: BTreeMap<Key, Value>) -> Self {
        let mut task = Self::new(name, CompoundTag::GoapSequence);
        task.goal = Some(goal);
        task
    }

    /// Boundary case: a Selector/Sequence/UtilitySelector with zero children
    /// is invalid. A GoapSequence is valid regardless of its child count
    /// because an empty-children goal check can still succeed trivially (the
    /// goal may already be satisfied).
    pub fn is_valid(&self) -> bool {
        match self.tag {
            CompoundTag::GoapSequence => true,
            _ => !self.children.is_empty(),
        }
    }

    pub fn utility_score(&self, ctx: &Context) -> f64 {
        self.utility_score.as_ref().map(|f| f(ctx)).unwrap_or(0.0)
    }

    pub fn goap_cost(&self, ctx: &Context) -> u32 {
        self.goap_cost.as_ref().map(|f| f(ctx)).unwrap_or(0)
    }

    /// Weak back-pointer for debugging/introspection only — never load-bearing
    /// for ownership or traversal.
    pub fn parent(&self) -> Option<Rc<CompoundTask>> {
        self.parent.borrow().upgrade()
    }

    pub(crate) fn set_parent(self: &Rc<Self>, child: &Task) {
        if let Task::Compound(c) = child {
            *c.parent.borrow_mut() = Rc::downgrade(self);
        }
    }
}
