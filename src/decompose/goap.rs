//! `GoapSequence`: a weighted-A* search over world-state snapshots, embedded
//! as one compound-task decomposition strategy rather than a separate
//! planner (mirrors `ai-goap::planner` but operates on `Context` snapshots
//! instead of a dedicated `GoapState`).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::rc::Rc;

use super::{decompose as decompose_task, DecomposeResult, DecomposeStatus};
use crate::context::{resolve_effective_state, Context};
use crate::task::{CompoundTask, PrimitiveTask, Task};
use crate::value::{Key, Value};

/// Orderable, hashable stand-in for a world-state snapshot: `Value` is not
/// `Eq`/`Hash` (it carries an `f64`), so the closed-set/g-score maps key on
/// each value's canonical bit pattern instead.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SnapshotKey(Vec<(Key, u64)>);

fn snapshot_key(snapshot: &BTreeMap<Key, Value>) -> SnapshotKey {
    SnapshotKey(snapshot.iter().map(|(k, v)| (*k, v.bits())).collect())
}

struct OpenNode {
    f_bits: u64,
    counter: u64,
    g: u32,
    snapshot: BTreeMap<Key, Value>,
    plan: Vec<Rc<PrimitiveTask>>,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.f_bits == other.f_bits && self.counter == other.counter
    }
}
impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the lowest `f`, breaking
        // ties FIFO by insertion order.
        (other.f_bits, other.counter).cmp(&(self.f_bits, self.counter))
    }
}

fn goal_satisfied(snapshot: &BTreeMap<Key, Value>, goal: &BTreeMap<Key, Value>) -> bool {
    goal.iter().all(|(k, v)| snapshot.get(k) == Some(v))
}

/// Non-finite or negative heuristic values are treated as zero: a bad
/// heuristic degrades the search to uniform-cost, it never corrupts it.
fn sanitized_h(h: f64) -> f64 {
    if h.is_finite() && h >= 0.0 {
        h
    } else {
        0.0
    }
}

/// Static children first, then each dynamic generator's output sorted by
/// name, deduplicated against names already seen (static children win ties).
/// A generator's `Err` is logged and its contribution skipped.
fn ordered_children(task: &CompoundTask, ctx: &mut Context, snapshot: &BTreeMap<Key, Value>) -> Vec<Task> {
    let mut seen: BTreeSet<&'static str> = BTreeSet::new();
    let mut ordered: Vec<Task> = Vec::new();

    for child in &task.children {
        seen.insert(child.name());
        ordered.push(child.clone());
    }

    let mut generated: Vec<Task> = Vec::new();
    for generator in &task.dynamic_generators {
        let vctx = Context::from_snapshot(ctx, snapshot);
        match generator(&vctx) {
            Ok(tasks) => generated.extend(tasks),
            Err(msg) => ctx.log_decomposition(format!("goap dynamic generator failed: {msg}")),
        }
    }
    generated.sort_by_key(|t| t.name());
    for task in generated {
        if seen.insert(task.name()) {
            ordered.push(task);
        }
    }

    ordered
}

/// Sum of each primitive's `goap_cost`, evaluated against the running
/// context as its effects are replayed in order — not a flat count, since
/// cost functions may read state mutated by earlier primitives in the block.
fn stepping_cost(base: &Context, snapshot: &BTreeMap<Key, Value>, plan: &[Rc<PrimitiveTask>]) -> u32 {
    let mut vctx = Context::from_snapshot(base, snapshot);
    let mut cost = 0u32;
    for p in plan {
        cost += p.goap_cost(&vctx);
        p.apply_effects(&mut vctx);
    }
    cost
}

/// A GOAP compound child's own `goap_cost`, evaluated at the pre-block
/// snapshot; 0 for a primitive or unbound slot (its cost is already counted
/// via `stepping_cost`/the primitive branch).
fn compound_cost(task: &Task, ctx: &Context) -> u32 {
    match task {
        Task::Compound(c) => c.goap_cost(ctx),
        Task::Slot(slot) => slot.borrow().subtask().map(|s| compound_cost(s, ctx)).unwrap_or(0),
        Task::Primitive(_) | Task::PausePlan(_) => 0,
    }
}

pub(crate) fn decompose(task: &Rc<CompoundTask>, ctx: &mut Context) -> DecomposeResult {
    let goal = task.goal.as_ref().expect("GoapSequence without a goal");
    let start_snapshot = resolve_effective_state(ctx);

    if goal_satisfied(&start_snapshot, goal) {
        ctx.push_mtr_index(0, task.name);
        return DecomposeResult::succeeded(Vec::new());
    }

    let mut open: BinaryHeap<OpenNode> = BinaryHeap::new();
    let mut g_score: BTreeMap<SnapshotKey, u32> = BTreeMap::new();
    let mut counter: u64 = 0;

    let start_key = snapshot_key(&start_snapshot);
    g_score.insert(start_key, 0);
    open.push(OpenNode { f_bits: 0, counter, g: 0, snapshot: start_snapshot, plan: Vec::new() });

    let mut expansions = 0usize;

    while let Some(node) = open.pop() {
        if expansions >= task.max_goap_expansions {
            ctx.log_decomposition(format!("goap search for {} exceeded expansion budget", task.name));
            return DecomposeResult::failed();
        }
        expansions += 1;

        if goal_satisfied(&node.snapshot, goal) {
            ctx.push_mtr_index(0, task.name);
            return DecomposeResult::succeeded(node.plan);
        }

        let node_key = snapshot_key(&node.snapshot);
        if let Some(&best_g) = g_score.get(&node_key) {
            if best_g < node.g {
                continue;
            }
        }

        for child in ordered_children(task, ctx, &node.snapshot) {
            let mut vctx = Context::from_snapshot(ctx, &node.snapshot);

            let (cost, next_snapshot, extra_plan) = match &child {
                Task::Primitive(p) => {
                    if !p.is_valid(&vctx) {
                        continue;
                    }
                    let cost = p.goap_cost(&vctx);
                    p.apply_effects(&mut vctx);
                    (cost, resolve_effective_state(&vctx), vec![Rc::clone(p)])
                }
                Task::Compound(_) | Task::Slot(_) => {
                    let result = decompose_task(&child, &mut vctx, 0);
                    match result.status {
                        DecomposeStatus::Rejected => return result,
                        DecomposeStatus::Failed | DecomposeStatus::Partial => continue,
                        DecomposeStatus::Succeeded if result.plan.is_empty() => continue,
                        DecomposeStatus::Succeeded => {
                            let pre_block_ctx = Context::from_snapshot(ctx, &node.snapshot);
                            let cost = compound_cost(&child, &pre_block_ctx)
                                + stepping_cost(ctx, &node.snapshot, &result.plan);
                            (cost, resolve_effective_state(&vctx), result.plan)
                        }
                    }
                }
                Task::PausePlan(_) => continue,
            };

            let new_g = node.g + cost;
            let next_key = snapshot_key(&next_snapshot);
            if let Some(&existing_g) = g_score.get(&next_key) {
                if existing_g <= new_g {
                    continue;
                }
            }
            g_score.insert(next_key, new_g);

            let h = task
                .heuristic
                .as_ref()
                .map(|f| sanitized_h(f(&next_snapshot, goal)))
                .unwrap_or(0.0);
            let weight = task.heuristic_weight.max(1.0);
            let f = new_g as f64 + weight * h;

            let mut plan = node.plan.clone();
            plan.extend(extra_plan);

            counter += 1;
            open.push(OpenNode { f_bits: f.to_bits(), counter, g: new_g, snapshot: next_snapshot, plan });
        }
    }

    DecomposeResult::failed()
}
