use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use htn_planner::{
    CompoundTask, Condition, Context, DecomposeStatus, Domain, Effect, LastStatus, NullCallbacks, OperatorResult,
    Planner, PrimitiveTask, Scope, Task, Value,
};

fn prim(name: &'static str) -> PrimitiveTask {
    let mut p = PrimitiveTask::new(name);
    p.operator = Some(Box::new(|_ctx| OperatorResult::Success));
    p
}

fn prim_rc(p: PrimitiveTask) -> Task {
    Task::Primitive(Rc::new(p))
}

fn compound_rc(c: CompoundTask) -> Task {
    Task::Compound(Rc::new(c))
}

// S1 — basic sequence: Root -> Selector -> Seq("AB") -> [A (HasA=1, Permanent), B].
#[test]
fn basic_sequence_produces_plan_and_commits_effects() {
    let mut a = prim("A");
    a.effects.push(Effect::new("set_has_a", "HasA", Scope::Permanent, |_| Value::Int(1)));
    let b = prim("B");

    let mut seq = CompoundTask::sequence("AB");
    seq.children.push(prim_rc(a));
    seq.children.push(prim_rc(b));

    let mut root = CompoundTask::selector("Root");
    root.children.push(compound_rc(seq));

    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.declare("HasA", Value::Int(0));
    ctx.init();

    let result = domain.find_plan(&mut ctx);

    assert_eq!(result.status, DecomposeStatus::Succeeded);
    assert_eq!(result.plan.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(ctx.get("HasA"), Value::Int(1));
}

// S2 — pause/resume: Seq -> [P1, PausePlan, P2].
#[test]
fn pause_plan_splits_decomposition_across_two_planning_passes() {
    let mut seq = CompoundTask::sequence("Seq");
    seq.children.push(prim_rc(prim("P1")));
    seq.children.push(Task::PausePlan(Rc::new(htn_planner::PausePlanTask)));
    seq.children.push(prim_rc(prim("P2")));

    let mut root = CompoundTask::selector("Root");
    root.children.push(compound_rc(seq));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.init();

    let first = domain.find_plan(&mut ctx);
    assert_eq!(first.status, DecomposeStatus::Partial);
    assert_eq!(first.plan.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["P1"]);
    assert!(ctx.has_paused_partial_plan());

    let second = domain.find_plan(&mut ctx);
    assert_eq!(second.status, DecomposeStatus::Succeeded);
    assert_eq!(second.plan.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["P2"]);
    assert!(!ctx.has_paused_partial_plan());
}

// S3 — MTR priority: Root(Selector) -> [Seq1(cond=Done)->[A], Selector2 ->
// [B1(cond=Done), B2]]. With Done=false, Seq1 is unreachable (A's
// precondition fails) so the plan falls through to Selector2's default B2,
// recording MTR=[1,1]. Flipping Done=true makes Seq1 valid; its root-level
// index (0) is strictly less than the running plan's root-level index (1),
// so it preempts regardless of the running plan's deeper MTR entries.
#[test]
fn mtr_discipline_lets_a_strictly_higher_priority_branch_preempt() {
    let mut a = prim("A");
    a.preconditions.push(Condition::new("done", |ctx| ctx.get("Done") == Value::Bool(true)));
    let mut seq1 = CompoundTask::sequence("Seq1");
    seq1.children.push(prim_rc(a));

    let mut b1 = prim("B1");
    b1.preconditions.push(Condition::new("done", |ctx| ctx.get("Done") == Value::Bool(true)));
    let b2 = prim("B2");
    let mut selector2 = CompoundTask::selector("Selector2");
    selector2.children.push(prim_rc(b1));
    selector2.children.push(prim_rc(b2));

    let mut root = CompoundTask::selector("Root");
    root.children.push(compound_rc(seq1));
    root.children.push(compound_rc(selector2));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.declare("Done", Value::Bool(false));
    ctx.init();

    let first = domain.find_plan(&mut ctx);
    assert_eq!(first.status, DecomposeStatus::Succeeded);
    assert_eq!(first.plan[0].name, "B2");
    assert_eq!(ctx.mtr(), &[1, 1]);
    // `find_plan` never writes `LastMTR` itself; only the caller adopting the
    // plan (the `Planner`, per spec §4.9 step 1) commits it via `shift_mtr`.
    ctx.shift_mtr();
    assert_eq!(ctx.last_mtr(), &[1, 1]);

    ctx.set("Done", Value::Bool(true), true, Scope::Permanent);
    let second = domain.find_plan(&mut ctx);
    assert_eq!(second.status, DecomposeStatus::Succeeded);
    assert_eq!(second.plan[0].name, "A");
    // Seq1's only child is a Sequence step, not a branching decision, so it
    // contributes no MTR entry of its own — the full record is just the
    // root's choice of index 0, shorter than (and unambiguously better than)
    // the previous [1, 1].
    assert_eq!(ctx.mtr(), &[0]);
    ctx.shift_mtr();
    assert_eq!(ctx.last_mtr(), &[0]);
}

// A same-length, same-or-worse MTR must never preempt a running plan: with
// the root's previous choice recorded at index 0, a later candidate landing
// on index 1 is rejected outright even though the old branch's own
// precondition no longer holds (that recovery path runs through the
// `Planner`'s own abort handling, which clears `LastMTR`, not through a bare
// `find_plan` call with a stale `LastMTR` still in force).
#[test]
fn mtr_discipline_rejects_a_same_length_worse_candidate() {
    let mut branch_a = prim("FromA");
    branch_a.preconditions.push(Condition::new("not_done", |ctx| ctx.get("Done") == Value::Bool(false)));
    let mut branch_b = prim("FromB");
    branch_b.preconditions.push(Condition::new("done", |ctx| ctx.get("Done") == Value::Bool(true)));

    let mut root = CompoundTask::selector("Root");
    root.children.push(prim_rc(branch_a));
    root.children.push(prim_rc(branch_b));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.declare("Done", Value::Bool(false));
    ctx.init();

    let first = domain.find_plan(&mut ctx);
    assert_eq!(first.status, DecomposeStatus::Succeeded);
    assert_eq!(first.plan[0].name, "FromA");
    assert_eq!(ctx.mtr(), &[0]);
    // Simulate the `Planner` adopting this plan: it alone commits `MTR` into
    // `LastMTR`, never `find_plan` itself.
    ctx.shift_mtr();
    assert_eq!(ctx.last_mtr(), &[0]);

    ctx.set("Done", Value::Bool(true), true, Scope::Permanent);
    let second = domain.find_plan(&mut ctx);
    assert_eq!(second.status, DecomposeStatus::Rejected);
    assert!(second.plan.is_empty());
    assert_eq!(ctx.last_mtr(), &[0]);
}

// S4 — GOAP optimal path: GetA cost 1, GetB cost 10, GetC cost 1 (pre=HasA),
// goal HasC == 1. Expect the cheaper chain GetA -> GetC, total cost 2.
#[test]
fn goap_sequence_finds_the_optimal_path_to_the_goal() {
    let mut get_a = prim("GetA");
    get_a.goap_cost = Some(Box::new(|_| 1));
    get_a.effects.push(Effect::new("set_has_a", "HasA", Scope::Permanent, |_| Value::Int(1)));

    let mut get_b = prim("GetB");
    get_b.goap_cost = Some(Box::new(|_| 10));
    get_b.effects.push(Effect::new("set_has_c_from_b", "HasC", Scope::Permanent, |_| Value::Int(1)));

    let mut get_c = prim("GetC");
    get_c.goap_cost = Some(Box::new(|_| 1));
    get_c.preconditions.push(Condition::new("has_a", |ctx| ctx.get("HasA") == Value::Int(1)));
    get_c.effects.push(Effect::new("set_has_c", "HasC", Scope::Permanent, |_| Value::Int(1)));

    let mut goal = BTreeMap::new();
    goal.insert("HasC", Value::Int(1));
    let mut goap = CompoundTask::goap_sequence("Acquire", goal);
    goap.children.push(prim_rc(get_a));
    goap.children.push(prim_rc(get_b));
    goap.children.push(prim_rc(get_c));

    let mut root = CompoundTask::selector("Root");
    root.children.push(compound_rc(goap));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.declare("HasA", Value::Int(0));
    ctx.declare("HasC", Value::Int(0));
    ctx.init();

    let result = domain.find_plan(&mut ctx);

    assert_eq!(result.status, DecomposeStatus::Succeeded);
    assert_eq!(result.plan.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["GetA", "GetC"]);
}

// S5 — executing-condition abort: a Continue-returning primitive whose
// executing condition fails immediately should abort via the tick loop.
struct RecordingCallbacks {
    exec_condition_failed: Cell<bool>,
}

impl htn_planner::PlannerCallbacks for RecordingCallbacks {
    fn on_current_task_executing_condition_failed(&mut self, _task: &PrimitiveTask) {
        self.exec_condition_failed.set(true);
    }
}

#[test]
fn executing_condition_failure_aborts_the_current_task() {
    let mut p = prim("Running");
    p.operator = Some(Box::new(|_ctx| OperatorResult::Continue));
    p.executing_conditions.push(Condition::new("never", |_ctx| false));

    let mut root = CompoundTask::selector("Root");
    root.children.push(prim_rc(p));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.init();

    let mut planner = Planner::new(RecordingCallbacks { exec_condition_failed: Cell::new(false) });
    planner.tick(&domain, &mut ctx, false);

    assert!(planner.callbacks.exec_condition_failed.get());
    assert_eq!(planner.last_status(), LastStatus::Failure);
}

// S6 — dirty-state replan: a higher-priority branch gated on HasA sits ahead
// of a fallback; becoming dirty once HasA flips makes it newly reachable,
// which is strictly better (lower-index) than the fallback's recorded MTR,
// so the guard in `Domain::find_plan` lets the replace through.
#[test]
fn dirty_world_state_triggers_a_replan_on_the_next_tick() {
    let mut from_a = PrimitiveTask::new("HasA");
    from_a.operator = Some(Box::new(|_ctx| OperatorResult::Continue));
    from_a.preconditions.push(Condition::new("has_a", |ctx| ctx.get("HasA") == Value::Int(1)));
    let mut fallback = PrimitiveTask::new("Fallback");
    fallback.operator = Some(Box::new(|_ctx| OperatorResult::Continue));

    let mut root = CompoundTask::selector("Root");
    root.children.push(prim_rc(from_a));
    root.children.push(prim_rc(fallback));
    let domain = Domain::new(Rc::new(root));

    let mut ctx = Context::new();
    ctx.declare("HasA", Value::Int(0));
    ctx.init();

    let mut planner = Planner::new(NullCallbacks);
    planner.tick(&domain, &mut ctx, false);
    assert_eq!(planner.current_task().unwrap().name, "Fallback");

    ctx.set("HasA", Value::Int(1), true, Scope::Permanent);
    planner.tick(&domain, &mut ctx, false);
    assert_eq!(planner.current_task().unwrap().name, "HasA");
}
