#![no_main]
use libfuzzer_sys::fuzz_target;
use parcheck_check::{CheckConfig, Checker, Formula, Transport};
use parcheck_map::maps_equal;
use parcheck_model::{Atom, CmpOp, DirectionLabel, ExplicitModel, FloatProposition, PartitionStrategy};
use parcheck_params::ExplicitSolver;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let n = 1 + data[0] as usize % 8;
    let count = 2 + data[1] as usize % 3;
    let solver = Arc::new(ExplicitSolver::new(3));

    let mut builder = ExplicitModel::builder(solver.clone(), n)
        .variable("q", (0..n).map(|s| (data[2] >> (s % 8) & 1) as f64).collect());
    for edge in data[3..].chunks_exact(2) {
        let (from, to) = (edge[0] as usize % n, edge[1] as usize % n);
        let colors: Vec<usize> = (0..3).filter(|c| edge[1] >> (4 + c) & 1 == 1).collect();
        builder = builder.edge(from, to, DirectionLabel::Loop, solver.colors(&colors));
    }
    let model = Arc::new(builder.build().unwrap());

    let q = Formula::atom(Atom::Float(FloatProposition {
        variable: "q".into(),
        cmp: CmpOp::Gt,
        threshold: 0.5,
    }));
    let formula = Formula::or(Formula::au(Formula::True, q.clone()), Formula::ax(q));

    let sequential = Checker::new(solver.clone(), model.clone(), CheckConfig::default())
        .verify_merged(&formula)
        .unwrap();
    let config = CheckConfig {
        partitions: count,
        strategy: PartitionStrategy::Hash,
        transport: if data[1] & 0x80 != 0 { Transport::Serialized } else { Transport::SharedMemory },
        ..CheckConfig::default()
    };
    let distributed = Checker::new(solver.clone(), model, config)
        .verify_merged(&formula)
        .unwrap();
    assert!(maps_equal(solver.as_ref(), &sequential, &distributed));
});
