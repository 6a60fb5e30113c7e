use crate::context::Context;
use crate::value::{Key, Value};
use crate::world_state::Scope;

/// A named precondition/executing-condition predicate.
///
/// The source language's "malformed condition" failure mode (a non-callable
/// stored where a predicate was expected) has no Rust equivalent: `predicate`
/// is a `Fn(&Context) -> bool`, so the type system guarantees it is callable.
/// That dynamic check is therefore a static one here, not a behavior that
/// needs modeling at runtime.
pub struct Condition {
    pub name: &'static str,
    pub predicate: Box<dyn Fn(&Context) -> bool>,
}

impl Condition {
    pub fn new(name: &'static str, predicate: impl Fn(&Context) -> bool + 'static) -> Self {
        Self { name, predicate: Box::new(predicate) }
    }
}

/// A named, scoped world-state mutation applied on a primitive's success
/// (execution time) or as part of speculative decomposition (plan time).
pub struct Effect {
    pub name: &'static str,
    pub key: Key,
    pub scope: Scope,
    pub compute: Box<dyn Fn(&Context) -> Value>,
}

impl Effect {
    pub fn new(name: &'static str, key: Key, scope: Scope, compute: impl Fn(&Context) -> Value + 'static) -> Self {
        Self { name, key, scope, compute: Box::new(compute) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorResult {
    Success,
    Failure,
    Continue,
}

pub type OperatorFn = Box<dyn Fn(&mut Context) -> OperatorResult>;

/// A leaf action: preconditions gate whether it may be selected during
/// decomposition, executing-conditions are re-checked every tick while it
/// runs, and `operator` drives its actual execution.
pub struct PrimitiveTask {
    pub name: &'static str,
    pub preconditions: Vec<Condition>,
    pub executing_conditions: Vec<Condition>,
    pub operator: Option<OperatorFn>,
    pub stop: Option<Box<dyn Fn(&mut Context)>>,
    pub abort: Option<Box<dyn Fn(&mut Context)>>,
    pub effects: Vec<Effect>,
    pub goap_cost: Option<Box<dyn Fn(&Context) -> u32>>,
    pub utility_score: Option<Box<dyn Fn(&Context) -> f64>>,
}

impl PrimitiveTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            preconditions: Vec::new(),
            executing_conditions: Vec::new(),
            operator: None,
            stop: None,
            abort: None,
            effects: Vec::new(),
            goap_cost: None,
            utility_score: None,
        }
    }

    /// `isValid` — every precondition must hold.
    pub fn is_valid(&self, ctx: &Context) -> bool {
        self.preconditions.iter().all(|c| (c.predicate)(ctx))
    }

    pub fn executing_conditions_hold(&self, ctx: &Context) -> bool {
        self.executing_conditions.iter().all(|c| (c.predicate)(ctx))
    }

    /// Apply every effect, in declaration order, against the context's
    /// current mode (speculative push during planning, direct write during
    /// execution — see `Context::set`).
    pub fn apply_effects(&self, ctx: &mut Context) {
        for effect in &self.effects {
            let value = (effect.compute)(ctx);
            ctx.set(effect.key, value, true, effect.scope);
        }
    }

    pub fn goap_cost(&self, ctx: &Context) -> u32 {
        self.goap_cost.as_ref().map(|f| f(ctx)).unwrap_or(0)
    }

    pub fn utility_score(&self, ctx: &Context) -> f64 {
        self.utility_score.as_ref().map(|f| f(ctx)).unwrap_or(0.0)
    }
}
