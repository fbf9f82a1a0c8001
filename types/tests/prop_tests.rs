use proptest::prelude::*;

use qnode_types::{canonical_float, Address, Amount, Timestamp};

proptest! {
    /// The canonical form always parses back to the same value.
    #[test]
    fn canonical_float_roundtrips(v in -1e12f64..1e12f64) {
        let s = canonical_float(v);
        let back: f64 = s.parse().unwrap();
        prop_assert_eq!(back, v);
    }

    /// Integral values always carry a fractional part in canonical form.
    #[test]
    fn canonical_integers_have_point(v in -1_000_000i64..1_000_000i64) {
        let s = canonical_float(v as f64);
        prop_assert!(s.ends_with(".0"), "{}", s);
    }

    /// Adding then subtracting the same amount returns (approximately) the start.
    #[test]
    fn amount_add_sub_inverse(a in 0.0f64..1e9, b in 0.0f64..1e9) {
        let x = Amount::new(a) + Amount::new(b) - Amount::new(b);
        prop_assert!(x.approx_eq(Amount::new(a), 1e-4));
    }

    /// A timestamp is never older than any age relative to itself.
    #[test]
    fn timestamp_not_older_than_itself(t in 0.0f64..4e9, age in 0u64..100_000) {
        let ts = Timestamp::new(t);
        prop_assert!(!ts.is_older_than(age, ts));
    }

    /// Only exactly "SYSTEM" is the minting authority.
    #[test]
    fn only_literal_system_is_system(s in "[A-Za-z]{1,10}") {
        prop_assert_eq!(Address::new(s.clone()).is_system(), s == "SYSTEM");
    }
}
