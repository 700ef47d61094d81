//! Algebraic laws every solver must satisfy, checked on the explicit domain.

use parcheck_params::{BoolSolver, ColorSet, ExplicitSolver, Solver};
use proptest::prelude::*;

const SIZE: usize = 96;

fn color_set(solver: &ExplicitSolver) -> impl Strategy<Value = ColorSet> + '_ {
    proptest::collection::vec(0..SIZE, 0..24).prop_map(move |cs| solver.colors(&cs))
}

fn solver() -> &'static ExplicitSolver {
    static SOLVER: std::sync::OnceLock<ExplicitSolver> = std::sync::OnceLock::new();
    SOLVER.get_or_init(|| ExplicitSolver::new(SIZE))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn idempotence_and_identities(p in color_set(solver())) {
        let s = solver();
        prop_assert!(s.equal(&s.or(&p, &p), &p));
        prop_assert!(s.equal(&s.and(&p, &p), &p));
        prop_assert!(s.equal(&s.and(&p, &s.tt()), &p));
        prop_assert!(s.equal(&s.or(&p, &s.ff()), &p));
        prop_assert!(s.equal(&s.not(&s.not(&p)), &p));
    }

    #[test]
    fn commutativity_and_associativity(
        a in color_set(solver()),
        b in color_set(solver()),
        c in color_set(solver()),
    ) {
        let s = solver();
        prop_assert!(s.equal(&s.and(&a, &b), &s.and(&b, &a)));
        prop_assert!(s.equal(&s.or(&a, &b), &s.or(&b, &a)));
        prop_assert!(s.equal(&s.and(&s.and(&a, &b), &c), &s.and(&a, &s.and(&b, &c))));
        prop_assert!(s.equal(&s.or(&s.or(&a, &b), &c), &s.or(&a, &s.or(&b, &c))));
    }

    #[test]
    fn approximations_are_consistent(p in color_set(solver())) {
        let s = solver();
        prop_assert!(s.can_sat(&p) || s.is_not_sat(&p));
        prop_assert!(s.can_not_sat(&p) || s.is_sat(&p));
    }

    #[test]
    fn complement_is_set_difference(a in color_set(solver()), b in color_set(solver())) {
        let s = solver();
        let diff = s.complement(&a, &b);
        prop_assert!(s.is_not_sat(&s.and(&diff, &a)));
        prop_assert!(s.equal(&s.or(&diff, &s.and(&a, &b)), &b));
    }

    #[test]
    fn serialization_roundtrip(p in color_set(solver())) {
        let s = solver();
        let mut buf = Vec::new();
        s.put_colors(&mut buf, &p);
        prop_assert_eq!(buf.len(), s.byte_size(&p));
        let mut cursor = buf.as_slice();
        let decoded = s.get_colors(&mut cursor).unwrap();
        prop_assert!(cursor.is_empty());
        prop_assert!(s.equal(&decoded, &p));
    }

    #[test]
    fn try_or_grows_exactly_when_union_changes(a in color_set(solver()), b in color_set(solver())) {
        let s = solver();
        let union = s.or(&a, &b);
        match s.try_or(Some(&a), &b) {
            Some(grown) => {
                prop_assert!(s.equal(&grown, &union));
                prop_assert!(!s.equal(&union, &a));
            }
            None => prop_assert!(s.equal(&union, &a)),
        }
    }
}

#[test]
fn bool_solver_laws() {
    let s = BoolSolver::new();
    for p in [true, false] {
        assert!(s.equal(&s.or(&p, &p), &p));
        assert!(s.equal(&s.and(&p, &p), &p));
        assert!(s.equal(&s.and(&p, &s.tt()), &p));
        assert!(s.equal(&s.or(&p, &s.ff()), &p));
        assert!(s.equal(&s.not(&s.not(&p)), &p));
    }
}
