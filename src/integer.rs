//! Integer helpers on top of `num_bigint::BigInt`
//!
//! The fraction engine only ever divides exactly by a GCD while normalizing,
//! so the choice of division convention does not affect canonical forms.
//! Both conventions are provided: truncating (remainder takes the sign of the
//! dividend) and floor (remainder takes the sign of the divisor). Every
//! rounding operation on fractions uses the floor convention.

use crate::error::{Error, Result};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};

/// Greatest common divisor by the Euclidean algorithm. Always non-negative.
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut x = a.abs();
    let mut y = b.abs();
    while !y.is_zero() {
        let r = &x % &y;
        x = y;
        y = r;
    }
    x
}

/// Quotient truncated toward zero; `a == q * b + r`, `r` has the sign of `a`.
pub fn div_rem_trunc(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt)> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    Ok(a.div_rem(b))
}

/// Quotient rounded toward negative infinity; `r` has the sign of `b`.
pub fn div_rem_floor(a: &BigInt, b: &BigInt) -> Result<(BigInt, BigInt)> {
    if b.is_zero() {
        return Err(Error::DivisionByZero);
    }
    Ok(a.div_mod_floor(b))
}

/// Strict decimal integer: optional sign followed by ASCII digits only.
///
/// `BigInt::from_str` is more lenient (it accepts `_` separators), so the
/// text is validated here first.
pub fn parse_integer(text: &str) -> Option<BigInt> {
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigInt::parse_bytes(text.as_bytes(), 10)
}

/// Magnitude of an exponent as the `u32` that `num_bigint` powers take.
pub fn exponent_to_u32(exp: i64) -> Result<u32> {
    u32::try_from(exp.unsigned_abs()).map_err(|_| Error::ExponentTooLarge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(&big(12), &big(18)), big(6));
        assert_eq!(gcd(&big(-12), &big(18)), big(6));
        assert_eq!(gcd(&big(12), &big(-18)), big(6));
        assert_eq!(gcd(&big(0), &big(-7)), big(7));
        assert_eq!(gcd(&big(-7), &big(0)), big(7));
        assert_eq!(gcd(&big(0), &big(0)), big(0));
        assert_eq!(gcd(&big(17), &big(5)), big(1));
    }

    #[test]
    fn test_gcd_large() {
        let a: BigInt = "123456789012345678901234567890".parse().unwrap();
        let b = &a * big(97);
        let c = &a * big(89);
        assert_eq!(gcd(&b, &c), a);
    }

    #[test]
    fn test_div_rem_conventions() {
        assert_eq!(div_rem_trunc(&big(-7), &big(2)).unwrap(), (big(-3), big(-1)));
        assert_eq!(div_rem_floor(&big(-7), &big(2)).unwrap(), (big(-4), big(1)));
        assert_eq!(div_rem_trunc(&big(7), &big(-2)).unwrap(), (big(-3), big(1)));
        assert_eq!(div_rem_floor(&big(7), &big(-2)).unwrap(), (big(-4), big(-1)));
        assert_eq!(div_rem_floor(&big(6), &big(3)).unwrap(), (big(2), big(0)));
    }

    #[test]
    fn test_div_rem_by_zero() {
        assert_eq!(div_rem_trunc(&big(1), &big(0)), Err(Error::DivisionByZero));
        assert_eq!(div_rem_floor(&big(1), &big(0)), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(big(42)));
        assert_eq!(parse_integer("-42"), Some(big(-42)));
        assert_eq!(parse_integer("+0"), Some(big(0)));
        assert_eq!(parse_integer(""), None);
        assert_eq!(parse_integer("-"), None);
        assert_eq!(parse_integer("1_000"), None);
        assert_eq!(parse_integer(" 1"), None);
        assert_eq!(parse_integer("--1"), None);
        assert_eq!(parse_integer("1.5"), None);
    }

    #[test]
    fn test_exponent_to_u32() {
        assert_eq!(exponent_to_u32(-5), Ok(5));
        assert_eq!(exponent_to_u32(i64::from(u32::MAX)), Ok(u32::MAX));
        assert_eq!(exponent_to_u32(i64::from(u32::MAX) + 1), Err(Error::ExponentTooLarge));
    }
}
