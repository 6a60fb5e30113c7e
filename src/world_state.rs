//! World state and the speculative change-stack used during planning.
//!
//! `ChangeStack` is the per-key speculative-write buffer described in
//! spec §3/§4.1. It is kept as a `BTreeMap<Key, Vec<WorldStateChange>>`
//! rather than a bespoke arena: the design notes call out an arena as an
//! optimization opportunity, not a requirement, and `BTreeMap` matches the
//! deterministic-iteration style `ai_core`/`ai_goap` use elsewhere in this
//! family of crates (`g_score: BTreeMap<GoapState, u32>` in `ai-goap`).

use std::collections::BTreeMap;

use crate::value::{Key, Value};

/// Lifetime of a speculative write. Only `Permanent` survives a planning pass;
/// `PlanAndExecute` is additionally re-applied when the owning primitive
/// actually executes; `PlanOnly` exists only for the duration of planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    PlanOnly,
    PlanAndExecute,
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldStateChange {
    pub scope: Scope,
    pub value: Value,
}

/// Committed world state: a mapping from declared key to current value.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    values: BTreeMap<Key, Value>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, key: Key, initial: Value) {
        self.values.insert(key, initial);
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        self.values.get(key).copied()
    }

    pub fn set(&mut self, key: Key, value: Value) {
        self.values.insert(key, value);
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The per-key speculative-write stack. Index 0 is the bottom (first pushed,
/// read by `Context::get` during planning); the last element is the top (most
/// recent, read by execution-time effect commit).
#[derive(Debug, Clone, Default)]
pub struct ChangeStack {
    stacks: BTreeMap<Key, Vec<WorldStateChange>>,
}

impl ChangeStack {
    pub fn init_for_keys(&mut self, keys: impl Iterator<Item = Key>) {
        self.stacks.clear();
        for key in keys {
            self.stacks.entry(key).or_default();
        }
    }

    pub fn push(&mut self, key: Key, change: WorldStateChange) {
        self.stacks.entry(key).or_default().push(change);
    }

    pub fn bottom(&self, key: Key) -> Option<WorldStateChange> {
        self.stacks.get(key).and_then(|s| s.first().copied())
    }

    pub fn top(&self, key: Key) -> Option<WorldStateChange> {
        self.stacks.get(key).and_then(|s| s.last().copied())
    }

    pub fn depth(&self, key: Key) -> usize {
        self.stacks.get(key).map(|s| s.len()).unwrap_or(0)
    }

    /// `Context::getChangeDepth` — a constant-time-per-key snapshot of stack
    /// lengths, used to roll back to via `trim_to_depth`.
    pub fn depths(&self) -> BTreeMap<Key, usize> {
        self.stacks.iter().map(|(k, v)| (*k, v.len())).collect()
    }

    pub fn trim_to_depth(&mut self, depths: &BTreeMap<Key, usize>) {
        for (key, stack) in self.stacks.iter_mut() {
            let target = depths.get(key).copied().unwrap_or(0);
            if stack.len() > target {
                stack.truncate(target);
            }
        }
    }

    /// `Context::trimForExecution` — drop every non-`Permanent` entry, in
    /// place, preserving the relative order of whatever `Permanent` entries
    /// remain so the last-remaining one is still the correct "top".
    pub fn retain_permanent_only(&mut self) {
        for stack in self.stacks.values_mut() {
            stack.retain(|c| matches!(c.scope, Scope::Permanent));
        }
    }

    pub fn clear_key(&mut self, key: Key) {
        if let Some(stack) = self.stacks.get_mut(key) {
            stack.clear();
        }
    }

    pub fn clear(&mut self) {
        for stack in self.stacks.values_mut() {
            stack.clear();
        }
    }

    pub fn is_empty_at(&self, key: Key) -> bool {
        self.depth(key) == 0
    }

    pub fn take_top(&mut self, key: Key) -> Option<WorldStateChange> {
        self.stacks.get_mut(key).and_then(|s| s.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_depth_round_trips_to_a_no_op() {
        let mut stack = ChangeStack::default();
        stack.init_for_keys(["a", "b"].into_iter());
        stack.push("a", WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(1) });
        stack.push("a", WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(2) });

        let depths = stack.depths();
        stack.push("a", WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(3) });
        stack.push("b", WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(9) });
        stack.trim_to_depth(&depths);

        assert_eq!(stack.depth("a"), 2);
        assert_eq!(stack.depth("b"), 0);
        assert_eq!(stack.top("a"), Some(WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(2) }));
    }

    #[test]
    fn retain_permanent_only_drops_speculative_entries() {
        let mut stack = ChangeStack::default();
        stack.init_for_keys(["a"].into_iter());
        stack.push("a", WorldStateChange { scope: Scope::PlanOnly, value: Value::Int(1) });
        stack.push("a", WorldStateChange { scope: Scope::Permanent, value: Value::Int(2) });
        stack.push("a", WorldStateChange { scope: Scope::PlanAndExecute, value: Value::Int(3) });

        stack.retain_permanent_only();

        assert_eq!(stack.depth("a"), 1);
        assert_eq!(stack.top("a").unwrap().value, Value::Int(2));
    }
}
