use causeway_core::CausalOrder;
use proptest::prelude::*;

use generators::*;

fn inverse(order: CausalOrder) -> CausalOrder {
    match order {
        CausalOrder::Before => CausalOrder::After,
        CausalOrder::After => CausalOrder::Before,
        other => other,
    }
}

proptest! {
    // 10,000 cases is fine locally; CI can dial this down via PROPTEST_CASES.
    #![proptest_config(proptest::test_runner::Config::with_cases(10000))]

    // Comparison laws
    #[test]
    fn compare_swapped_is_inverse(a in arb_timestamp(), b in arb_timestamp()) {
        prop_assert_eq!(b.causal_order(&a), inverse(a.causal_order(&b)));
    }

    #[test]
    fn compare_self_is_equal(a in arb_timestamp()) {
        prop_assert_eq!(a.causal_order(&a), CausalOrder::Equal);
    }

    #[test]
    fn equal_order_coincides_with_equality(a in arb_timestamp(), b in arb_timestamp()) {
        prop_assert_eq!(a.causal_order(&b) == CausalOrder::Equal, a == b);
    }

    #[test]
    fn happened_before_is_asymmetric(a in arb_timestamp(), b in arb_timestamp()) {
        prop_assert!(!(a.happened_before(&b) && b.happened_before(&a)));
    }

    // Merge laws (pointwise max is a join semilattice)
    #[test]
    fn merge_commutative(a in arb_timestamp(), b in arb_timestamp()) {
        prop_assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn merge_associative(a in arb_timestamp(), b in arb_timestamp(), c in arb_timestamp()) {
        prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn merge_idempotent(a in arb_timestamp()) {
        prop_assert_eq!(a.merge(&a), a);
    }

    #[test]
    fn merge_dominates_both_inputs(a in arb_timestamp(), b in arb_timestamp()) {
        let merged = a.merge(&b);
        prop_assert!(matches!(
            a.causal_order(&merged),
            CausalOrder::Before | CausalOrder::Equal
        ));
        prop_assert!(matches!(
            b.causal_order(&merged),
            CausalOrder::Before | CausalOrder::Equal
        ));
    }

    #[test]
    fn merge_is_below_every_upper_bound(a in arb_timestamp(), b in arb_timestamp(), c in arb_timestamp()) {
        // force c into the set of upper bounds of {a, b}
        let upper = c.merge(&a).merge(&b);
        let merged = a.merge(&b);
        prop_assert!(matches!(
            merged.causal_order(&upper),
            CausalOrder::Before | CausalOrder::Equal
        ));
    }

    #[test]
    fn merge_preserves_owner(a in arb_timestamp(), b in arb_timestamp()) {
        let merged = a.merge(&b);
        prop_assert_eq!(merged.owner(), a.owner());
    }
}
