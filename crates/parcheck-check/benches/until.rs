//! Criterion benchmarks for the reachability operators.
//!
//! Run with: cargo bench -p parcheck-check

use criterion::{criterion_group, criterion_main, Criterion};
use parcheck_check::{CheckConfig, Checker, Formula, Transport};
use parcheck_model::{Atom, CmpOp, DirectionLabel, ExplicitModel, FloatProposition, PartitionStrategy};
use parcheck_params::{ExplicitSolver, Solver};
use std::sync::Arc;

/// `side x side` grid with right moves for half of the colors and down
/// moves for all of them. The goal is the bottom-right corner.
fn grid(side: usize, colors: usize) -> (Arc<ExplicitSolver>, Arc<ExplicitModel<ExplicitSolver>>) {
    let solver = Arc::new(ExplicitSolver::new(colors));
    let half = solver.range(0..colors / 2);
    let mut builder = ExplicitModel::builder(solver.clone(), side * side);
    for row in 0..side {
        for col in 0..side {
            let s = row * side + col;
            if col + 1 < side {
                builder = builder.edge(s, s + 1, DirectionLabel::up("x"), half.clone());
            }
            if row + 1 < side {
                builder = builder.edge(s, s + side, DirectionLabel::up("y"), solver.tt());
            }
        }
    }
    let mut goal = vec![0.0; side * side];
    goal[side * side - 1] = 1.0;
    let model = builder.variable("goal", goal).build().unwrap();
    (solver, Arc::new(model))
}

fn bench_formula(c: &mut Criterion, name: &str, formula: &Formula, config: CheckConfig) {
    let (solver, model) = grid(40, 16);
    let checker = Checker::new(solver, model, config);
    c.bench_function(name, |b| {
        b.iter(|| {
            checker.verify(formula).unwrap();
        })
    });
}

fn benchmarks(c: &mut Criterion) {
    let goal = Formula::atom(Atom::Float(FloatProposition {
        variable: "goal".into(),
        cmp: CmpOp::Gt,
        threshold: 0.5,
    }));
    let ef = Formula::ef(goal.clone());
    let af = Formula::af(goal);

    let single = CheckConfig::default();
    let shared = CheckConfig {
        partitions: 4,
        strategy: PartitionStrategy::Uniform,
        ..CheckConfig::default()
    };
    let serialized = CheckConfig {
        transport: Transport::Serialized,
        ..shared.clone()
    };
    let hashed = CheckConfig {
        strategy: PartitionStrategy::Hash,
        ..shared.clone()
    };

    bench_formula(c, "ef_grid40_single", &ef, single.clone());
    bench_formula(c, "af_grid40_single", &af, single);
    bench_formula(c, "ef_grid40_uniform4", &ef, shared.clone());
    bench_formula(c, "af_grid40_uniform4", &af, shared);
    bench_formula(c, "af_grid40_serialized4", &af, serialized);
    // Hashing scatters neighbours, so almost every edge crosses partitions.
    bench_formula(c, "af_grid40_hash4", &af, hashed);
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
