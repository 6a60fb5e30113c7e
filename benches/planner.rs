use std::collections::BTreeMap;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use htn_planner::{CompoundTask, Context, Domain, Effect, OperatorResult, PrimitiveTask, Scope, Task, Value};

fn leaf(name: &'static str) -> Task {
    let mut p = PrimitiveTask::new(name);
    p.operator = Some(Box::new(|_ctx| OperatorResult::Success));
    Task::Primitive(Rc::new(p))
}

/// A Selector -> Sequence(N primitives) domain, matching `ai-htn`'s
/// many-steps benchmark shape.
fn build_sequence_domain(steps: usize) -> Domain {
    let mut seq = CompoundTask::sequence("steps");
    for i in 0..steps {
        let name: &'static str = Box::leak(format!("step_{i}").into_boxed_str());
        seq.children.push(leaf(name));
    }
    let mut root = CompoundTask::selector("root");
    root.children.push(Task::Compound(Rc::new(seq)));
    Domain::new(Rc::new(root))
}

fn bench_sequence_decomposition(c: &mut Criterion) {
    let domain = build_sequence_domain(256);

    c.bench_function("htn-planner/sequence.decompose(steps=256)", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            ctx.init();
            let result = domain.find_plan(&mut ctx);
            black_box(result.plan.len());
        })
    });
}

/// A GoapSequence over a chain of `bits` independent flag-setting actions,
/// matching `ai-goap`'s bit-chain benchmark shape: cost 1 per action, goal is
/// every flag set, so the optimal plan visits all `bits` actions exactly once
/// regardless of search order.
fn build_goap_chain_domain(bits: u32) -> (Domain, Vec<&'static str>) {
    let keys: Vec<&'static str> = (0..bits).map(|i| Box::leak(format!("flag_{i}").into_boxed_str()) as &'static str).collect();

    let mut goal = BTreeMap::new();
    for key in &keys {
        goal.insert(*key, Value::Int(1));
    }

    let mut goap = CompoundTask::goap_sequence("acquire_all", goal);
    for &key in &keys {
        let mut p = PrimitiveTask::new(key);
        p.goap_cost = Some(Box::new(|_ctx| 1));
        p.effects.push(Effect::new("set_flag", key, Scope::Permanent, |_ctx| Value::Int(1)));
        goap.children.push(Task::Primitive(Rc::new(p)));
    }

    let mut root = CompoundTask::selector("root");
    root.children.push(Task::Compound(Rc::new(goap)));
    (Domain::new(Rc::new(root)), keys)
}

fn bench_goap_chain(c: &mut Criterion) {
    let (domain, keys) = build_goap_chain_domain(12);

    c.bench_function("htn-planner/goap.decompose(bits=12)", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            for &key in &keys {
                ctx.declare(key, Value::Int(0));
            }
            ctx.init();
            let result = domain.find_plan(&mut ctx);
            black_box(result.plan.len());
        })
    });
}

criterion_group!(benches, bench_sequence_decomposition, bench_goap_chain);
criterion_main!(benches);
