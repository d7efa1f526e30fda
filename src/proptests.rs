//! Property-based tests for fraction arithmetic.

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use num_traits::{One, Signed, Zero};
    use proptest::prelude::*;

    use crate::error::Error;
    use crate::evaluator::Session;
    use crate::expansion::Expansion;
    use crate::fraction::Fraction;
    use crate::integer::{div_rem_floor, div_rem_trunc, gcd};

    // Strategy for generating small integers
    fn small_int() -> impl Strategy<Value = i64> {
        -1000i64..1000i64
    }

    // Strategy for generating non-zero integers
    fn non_zero_int() -> impl Strategy<Value = i64> {
        prop_oneof![(-1000i64..=-1i64), (1i64..=1000i64)]
    }

    // Strategy for generating fractions with up to ~40 digit parts
    fn fraction() -> impl Strategy<Value = Fraction> {
        (any::<i128>(), any::<i64>().prop_filter("non-zero", |d| *d != 0))
            .prop_map(|(n, d)| Fraction::new(BigInt::from(n), BigInt::from(d)).unwrap())
    }

    fn non_zero_fraction() -> impl Strategy<Value = Fraction> {
        fraction().prop_filter("non-zero", |f| !f.is_zero())
    }

    proptest! {
        #[test]
        fn always_reduced_with_positive_denominator(f in fraction()) {
            prop_assert!(f.denom().is_positive());
            prop_assert!(gcd(f.numer(), f.denom()).is_one());
            if f.is_zero() {
                prop_assert!(f.denom().is_one());
            }
        }

        #[test]
        fn construct_from_canonical_parts_is_identity(f in fraction(), k in non_zero_int()) {
            let (n, d) = f.clone().into_parts();
            prop_assert_eq!(Fraction::new(n.clone(), d.clone()).unwrap(), f.clone());
            // scaling both parts by any non-zero factor reduces back
            let k = BigInt::from(k);
            prop_assert_eq!(Fraction::new(n * &k, d * &k).unwrap(), f);
        }

        #[test]
        fn parse_inverts_to_string(f in fraction()) {
            prop_assert_eq!(Fraction::parse(&f.to_string()).unwrap(), f);
        }

        #[test]
        fn add_commutative(a in fraction(), b in fraction()) {
            prop_assert_eq!(&a + &b, &b + &a);
        }

        #[test]
        fn mul_commutative(a in fraction(), b in fraction()) {
            prop_assert_eq!(&a * &b, &b * &a);
        }

        #[test]
        fn add_associative(a in fraction(), b in fraction(), c in fraction()) {
            prop_assert_eq!(&(&a + &b) + &c, &a + &(&b + &c));
        }

        #[test]
        fn distributive(a in fraction(), b in fraction(), c in fraction()) {
            prop_assert_eq!(&a * &(&b + &c), &(&a * &b) + &(&a * &c));
        }

        #[test]
        fn sub_is_add_neg(a in fraction(), b in fraction()) {
            prop_assert_eq!(&a - &b, &a + &(-&b));
        }

        #[test]
        fn div_inverts_mul(a in fraction(), b in non_zero_fraction()) {
            prop_assert_eq!((&a * &b).div(&b).unwrap(), a);
        }

        #[test]
        fn div_by_zero_fails(a in fraction()) {
            prop_assert_eq!(a.div(&Fraction::zero()), Err(Error::DivisionByZero));
        }

        #[test]
        fn compare_matches_difference_sign(a in fraction(), b in fraction()) {
            let diff = &a - &b;
            prop_assert_eq!(a.compare(&b), diff.numer().sign().cmp(&num_bigint::Sign::NoSign));
        }

        #[test]
        fn floor_div_modulo_identity(a in fraction(), b in non_zero_fraction()) {
            let q = a.floor_div(&b).unwrap();
            let r = a.modulo(&b).unwrap();
            prop_assert!(q.is_integer());
            prop_assert_eq!(&(&b * &q) + &r, a);
            // remainder is zero or has the sign of the divisor, and |r| < |b|
            prop_assert!(r.is_zero() || r.is_negative() == b.is_negative());
            prop_assert!(r.abs() < b.abs());
        }

        #[test]
        fn rounding_brackets_value(f in fraction()) {
            let floor = f.floor();
            let ceil = f.ceil();
            prop_assert!(floor <= f && f <= ceil);
            prop_assert!(&ceil - &floor <= Fraction::one());
            let round = f.round();
            prop_assert!((&round - &f).abs() <= Fraction::ratio(1, 2).unwrap());
        }

        #[test]
        fn pow_adds_exponents(a in non_zero_int(), i in -6i64..6, j in -6i64..6) {
            let a = Fraction::ratio(a, 7).unwrap();
            prop_assert_eq!(a.pow(i + j).unwrap(), &a.pow(i).unwrap() * &a.pow(j).unwrap());
        }

        #[test]
        fn gcd_divides_both(a in small_int(), b in small_int()) {
            let (a, b) = (BigInt::from(a), BigInt::from(b));
            let g = gcd(&a, &b);
            prop_assert!(!g.is_negative());
            if !g.is_zero() {
                prop_assert!((&a % &g).is_zero());
                prop_assert!((&b % &g).is_zero());
            } else {
                prop_assert!(a.is_zero() && b.is_zero());
            }
        }

        #[test]
        fn div_rem_identities(a in small_int(), b in non_zero_int()) {
            let (a, b) = (BigInt::from(a), BigInt::from(b));

            let (q, r) = div_rem_trunc(&a, &b).unwrap();
            prop_assert_eq!(&q * &b + &r, a.clone());
            prop_assert!(r.is_zero() || r.is_negative() == a.is_negative());

            let (q, r) = div_rem_floor(&a, &b).unwrap();
            prop_assert_eq!(&q * &b + &r, a.clone());
            prop_assert!(r.is_zero() || r.is_negative() == b.is_negative());
            prop_assert!(r.abs() < b.abs());
        }

        #[test]
        fn expansion_period_is_shorter_than_denominator(n in small_int(), d in 1i64..200) {
            // every base-10 expansion terminates or repeats with period < d
            let f = Fraction::ratio(n, d).unwrap();
            let e = Expansion::new(&f, 10, 0, 4096).unwrap();
            prop_assert!(!e.is_truncated());
            prop_assert!(e.period() < d as usize);
        }

        #[test]
        fn session_matches_direct_arithmetic(a in small_int(), b in non_zero_int(), c in small_int()) {
            let mut session = Session::new();
            let line = format!("x = {} / {} + {}", a, b, c);
            let out = session.run(&line).unwrap();
            let expected = &Fraction::ratio(a, b).unwrap() + &Fraction::from(c);
            prop_assert_eq!(out, expected.to_string());
        }
    }
}
