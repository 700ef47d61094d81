mod common;

use common::*;
use parcheck_check::{CheckConfig, DirFormula, Formula, Quantifier, Transport};
use parcheck_model::{Atom, DirectionLabel, ExplicitModel, Facet, Flow, PartitionStrategy, TransitionProposition};

/// Every first-order test runs sequentially and spread over three workers.
fn configs() -> Vec<CheckConfig> {
    vec![
        CheckConfig::default(),
        CheckConfig {
            partitions: 3,
            strategy: PartitionStrategy::Hash,
            ..CheckConfig::default()
        },
        CheckConfig {
            partitions: 3,
            strategy: PartitionStrategy::Uniform,
            transport: Transport::Serialized,
            ..CheckConfig::default()
        },
    ]
}

#[test]
fn test_exists_over_bound() {
    let solver = solver();
    let chain = || {
        graph(&solver, 3, &[(0, 1), (1, 2)], &[("q", vec![0.0, 0.0, 1.0])])
            .build()
            .unwrap()
    };
    for config in configs() {
        let checker = checker(&solver, chain(), config);

        let reach_q = Formula::exists("x", prop("q"), Formula::ef(Formula::reference("x")));
        assert_eq!(sorted(&checker.verify_merged(&reach_q).unwrap()), full(&[0, 1, 2]));

        let at = Formula::exists("x", prop("q"), Formula::at("x", prop("q")));
        assert_eq!(sorted(&checker.verify_merged(&at).unwrap()), full(&[0, 1, 2]));
    }
}

#[test]
fn test_for_all_over_bound() {
    let solver = solver();
    for config in configs() {
        let chain = graph(&solver, 3, &[(0, 1), (1, 2)], &[]).build().unwrap();
        let checker = checker(&solver, chain, config.clone());

        // Only the source of the chain reaches every state.
        let reach_all = Formula::for_all("x", Formula::True, Formula::ef(Formula::reference("x")));
        assert_eq!(sorted(&checker.verify_merged(&reach_all).unwrap()), full(&[0]));

        let no_deadlock = Formula::for_all("x", Formula::True, Formula::at("x", Formula::ex(Formula::True)));
        assert!(sorted(&checker.verify_merged(&no_deadlock).unwrap()).is_empty());

        let cycle = graph(&solver, 3, &[(0, 1), (1, 2), (2, 0)], &[]).build().unwrap();
        let checker = common::checker(&solver, cycle, config);
        assert_eq!(sorted(&checker.verify_merged(&no_deadlock).unwrap()), full(&[0, 1, 2]));
    }
}

#[test]
fn test_bind_finds_returning_states() {
    let solver = solver();
    for config in configs() {
        let cycle = graph(&solver, 4, &[(0, 1), (1, 2), (2, 0), (3, 0)], &[])
            .build()
            .unwrap();
        let checker = checker(&solver, cycle, config);

        let back_in_three = Formula::bind(
            "x",
            Formula::ex(Formula::ex(Formula::ex(Formula::reference("x")))),
        );
        assert_eq!(sorted(&checker.verify_merged(&back_in_three).unwrap()), full(&[0, 1, 2]));

        let self_loop = Formula::bind("x", Formula::ex(Formula::reference("x")));
        assert!(sorted(&checker.verify_merged(&self_loop).unwrap()).is_empty());
    }
}

#[test]
fn test_quantifier_respects_bound_colors() {
    // 0 -> 1 exists for colors {0, 1} only, 1 -> 2 always.
    let solver = solver();
    let out_up = Formula::atom(Atom::Transition(TransitionProposition {
        name: "x".into(),
        flow: Flow::Out,
        facet: Facet::Up,
    }));
    for config in configs() {
        let model = ExplicitModel::builder(solver.clone(), 3)
            .edge(0, 1, DirectionLabel::up("x"), solver.colors(&[0, 1]))
            .full_edge(1, 2, DirectionLabel::up("x"))
            .build()
            .unwrap();
        let checker = checker(&solver, model, config);

        let legal = Formula::exists("v", out_up.clone(), Formula::reference("v"));
        assert_eq!(
            sorted(&checker.verify_merged(&legal).unwrap()),
            vec![(0, vec![0, 1]), (1, all_colors())]
        );

        let reach_every = Formula::for_all("v", out_up.clone(), Formula::ef(Formula::reference("v")));
        assert_eq!(
            sorted(&checker.verify_merged(&reach_every).unwrap()),
            vec![(0, vec![0, 1]), (1, vec![2, 3])]
        );
    }
}

#[test]
fn test_lookalike_subformulas_stay_distinct() {
    let solver = solver();
    for config in configs() {
        let model = ExplicitModel::builder(solver.clone(), 3)
            .full_edge(0, 0, DirectionLabel::Loop)
            .full_edge(1, 2, DirectionLabel::up("loop"))
            .variable("q", vec![0.0, 1.0, 0.0])
            .build()
            .unwrap();
        let checker = checker(&solver, model, config);

        // A variable called `true` is not the constant.
        let shadowed = Formula::exists(
            "true",
            prop("q"),
            Formula::equal(Formula::True, Formula::reference("true")),
        );
        assert_eq!(sorted(&checker.verify_merged(&shadowed).unwrap()), full(&[1]));

        // Self loops against moves along a dimension named `loop`.
        let along = |direction| Formula::next(Quantifier::Exists, direction, true, Formula::True);
        let named = DirFormula::Atom {
            name: "loop".into(),
            facet: None,
        };
        let same = Formula::equal(along(DirFormula::Loop), along(named));
        assert_eq!(sorted(&checker.verify_merged(&same).unwrap()), full(&[2]));
    }
}
