//! Positional expansion of fractions with a repeating block
//!
//! `1/6` in base 10 is `0.1(6)`: a pre-period `1` followed by the period `6`.
//! The mantissa is scaled by a power of the base so that, outside of the
//! `min_exp` window, the integer part has a single digit and an exponent
//! suffix is printed (`3.(3)e-1` for `1/3` with `min_exp = 0`).
//!
//! Digits come from long division on the remainder sequence
//! `r -> (r * base) mod q`. Floyd's cycle detection finds where that sequence
//! starts repeating without storing the remainders, so memory is bounded by
//! the emitted digits, which are in turn bounded by `max_digits`.

use crate::error::{Error, Result};
use crate::fraction::Fraction;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use std::fmt;
use std::fmt::Write;
use tracing::trace;

const DIGIT_CHARS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Expansion of a fraction in a given base
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expansion {
    negative: bool,
    integer: BigUint,
    digits: Vec<u8>,
    repeat_start: usize,
    exponent: i64,
    base: u32,
    truncated: bool,
}

impl Expansion {
    /// Expand `value` in `base` (2..=36).
    ///
    /// The exponent is forced to zero when its magnitude is below `min_exp`.
    /// At most `max_digits` fractional digits are produced; longer expansions
    /// are cut and flagged as truncated.
    pub fn new(value: &Fraction, base: u32, min_exp: usize, max_digits: usize) -> Result<Expansion> {
        Expansion::from_parts(
            value.is_negative(),
            value.numer().magnitude().clone(),
            value.denom().magnitude().clone(),
            base,
            min_exp,
            max_digits,
        )
    }

    /// Expand `±p/q` from magnitudes; `p/q` does not have to be reduced.
    pub fn from_parts(
        negative: bool,
        p: BigUint,
        q: BigUint,
        base: u32,
        min_exp: usize,
        max_digits: usize,
    ) -> Result<Expansion> {
        if !(2..=36).contains(&base) {
            return Err(Error::InvalidBase(base));
        }
        if q.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if p.is_zero() {
            return Ok(Expansion {
                negative: false,
                integer: BigUint::zero(),
                digits: Vec::new(),
                repeat_start: 0,
                exponent: 0,
                base,
                truncated: false,
            });
        }

        let b = BigUint::from(base);
        let mut exponent = floor_log(&p, &q, &b);
        if exponent.unsigned_abs() < min_exp as u64 {
            exponent = 0;
        }
        let magnitude = u32::try_from(exponent.unsigned_abs()).map_err(|_| Error::ExponentTooLarge)?;
        let scale = b.pow(magnitude);
        let (num, den) = if exponent >= 0 { (p, q * scale) } else { (p * scale, q) };
        let (integer, rem) = num.div_rem(&den);

        let (digits, repeat_start, truncated) = fractional_digits(rem, &b, &den, max_digits)?;
        trace!(base, exponent, digits = digits.len(), repeat_start, truncated, "expanded fraction");

        Ok(Expansion {
            negative,
            integer,
            digits,
            repeat_start,
            exponent,
            base,
            truncated,
        })
    }

    pub fn integer_part(&self) -> &BigUint {
        &self.integer
    }

    /// Fractional digits, pre-period followed by one copy of the period
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    /// Index in [`digits`](Self::digits) where the period starts; equals the
    /// digit count for terminating (or truncated) expansions
    pub fn repeat_start(&self) -> usize {
        self.repeat_start
    }

    pub fn period(&self) -> usize {
        self.digits.len() - self.repeat_start
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_char('-')?;
        }
        f.write_str(&self.integer.to_str_radix(self.base))?;
        if !self.digits.is_empty() {
            f.write_char('.')?;
            for &d in &self.digits[..self.repeat_start] {
                f.write_char(DIGIT_CHARS[d as usize] as char)?;
            }
            if self.repeat_start < self.digits.len() {
                f.write_char('(')?;
                for &d in &self.digits[self.repeat_start..] {
                    f.write_char(DIGIT_CHARS[d as usize] as char)?;
                }
                f.write_char(')')?;
            }
        }
        if self.truncated {
            f.write_str("...")?;
        }
        if self.exponent != 0 {
            if self.base == 10 {
                write!(f, "e{}", self.exponent)?;
            } else {
                write!(f, "*{}^{}", self.base, self.exponent)?;
            }
        }
        Ok(())
    }
}

/// Largest `k` with `base^k <= n`, together with `base^k`. Requires `n >= 1`.
fn int_floor_log(n: &BigUint, base: &BigUint) -> (u64, BigUint) {
    // powers[i] = base^(2^i), all <= n
    let mut powers = Vec::new();
    let mut p = base.clone();
    while &p <= n {
        let squared = &p * &p;
        powers.push(p);
        p = squared;
    }
    let mut k = 0u64;
    let mut acc = BigUint::one();
    for (i, power) in powers.iter().enumerate().rev() {
        let candidate = &acc * power;
        if &candidate <= n {
            acc = candidate;
            k += 1 << i;
        }
    }
    (k, acc)
}

/// `floor(log_base(p / q))` for positive `p`, `q`.
fn floor_log(p: &BigUint, q: &BigUint, base: &BigUint) -> i64 {
    if p >= q {
        let (k, _) = int_floor_log(&(p / q), base);
        k as i64
    } else {
        let (n, r) = q.div_rem(p);
        let (k, power) = int_floor_log(&n, base);
        if r.is_zero() && power == n {
            // p/q is exactly base^-k
            -(k as i64)
        } else {
            -(k as i64) - 1
        }
    }
}

/// Long division of `rem / den`; stops early once the remainder is zero.
fn long_division(mut rem: BigUint, base: &BigUint, den: &BigUint, count: usize) -> Result<(Vec<u8>, BigUint)> {
    let mut digits = Vec::new();
    digits.try_reserve_exact(count)?;
    for _ in 0..count {
        if rem.is_zero() {
            break;
        }
        let (d, r) = (rem * base).div_rem(den);
        // d < base <= 36
        digits.push(d.to_u8().unwrap_or(0));
        rem = r;
    }
    Ok((digits, rem))
}

/// Fractional digits of `rem / den` as `(digits, repeat_start, truncated)`.
fn fractional_digits(rem: BigUint, base: &BigUint, den: &BigUint, max_digits: usize) -> Result<(Vec<u8>, usize, bool)> {
    let next = |x: &BigUint| (x * base) % den;

    let truncate = |rem: BigUint| -> Result<(Vec<u8>, usize, bool)> {
        let (digits, last) = long_division(rem, base, den, max_digits)?;
        let len = digits.len();
        Ok((digits, len, !last.is_zero()))
    };

    // Phase 1: tortoise and hare meet inside the cycle after at most
    // mu + lambda steps
    let mut tortoise = next(&rem);
    let mut hare = next(&tortoise);
    let mut steps = 1usize;
    while tortoise != hare {
        if steps > max_digits {
            return truncate(rem);
        }
        tortoise = next(&tortoise);
        hare = next(&next(&hare));
        steps += 1;
    }

    // Phase 2: pre-period length mu
    let mut mu = 0usize;
    let mut start = rem.clone();
    while start != hare {
        start = next(&start);
        hare = next(&hare);
        mu += 1;
    }

    // Phase 3: period length lambda
    let mut lambda = 1usize;
    let mut probe = next(&start);
    while probe != start {
        probe = next(&probe);
        lambda += 1;
    }

    if start.is_zero() {
        // Terminating: the cycle is the fixed point 0
        if mu > max_digits {
            return truncate(rem);
        }
        let (digits, _) = long_division(rem, base, den, mu)?;
        let len = digits.len();
        return Ok((digits, len, false));
    }

    if mu + lambda > max_digits {
        return truncate(rem);
    }
    let (digits, _) = long_division(rem, base, den, mu + lambda)?;
    Ok((digits, mu, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(s: &str, base: u32, min_exp: usize) -> String {
        let f = Fraction::parse(s).unwrap();
        Expansion::new(&f, base, min_exp, 4096).unwrap().to_string()
    }

    fn my_int_floor_log(n: u32, base: u32) -> u64 {
        let (k, power) = int_floor_log(&BigUint::from(n), &BigUint::from(base));
        assert_eq!(BigUint::from(base).pow(k as u32), power);
        k
    }

    #[test]
    fn test_int_floor_log() {
        assert_eq!(my_int_floor_log(1, 10), 0);
        assert_eq!(my_int_floor_log(9, 10), 0);
        assert_eq!(my_int_floor_log(10, 10), 1);
        assert_eq!(my_int_floor_log(99, 10), 1);
        assert_eq!(my_int_floor_log(100, 10), 2);
        assert_eq!(my_int_floor_log(1 << 20, 2), 20);
        assert_eq!(my_int_floor_log((1 << 20) - 1, 2), 19);
    }

    #[test]
    fn test_floor_log_fraction() {
        let ten = BigUint::from(10u32);
        let four_pow = BigUint::from(4u32).pow(100);
        let three_pow = BigUint::from(3u32).pow(100);
        assert_eq!(floor_log(&four_pow, &three_pow, &ten), 12);
        assert_eq!(floor_log(&three_pow, &four_pow, &ten), -13);
        assert_eq!(floor_log(&BigUint::from(1u32), &BigUint::from(100u32), &ten), -2);
        assert_eq!(floor_log(&BigUint::from(1u32), &BigUint::from(101u32), &ten), -3);
    }

    #[test]
    fn test_scientific_form() {
        let f = Fraction::parse("1/3").unwrap();
        let e = Expansion::new(&f, 10, 0, 4096).unwrap();
        assert_eq!(e.digits(), &[3]);
        assert_eq!(e.repeat_start(), 0);
        assert_eq!(e.exponent(), -1);
        assert_eq!(e.to_string(), "3.(3)e-1");

        assert_eq!(expand("12345", 10, 2), "1.2345e4");
        assert_eq!(expand("1/1000", 10, 0), "1e-3");
    }

    #[test]
    fn test_positional_form() {
        let f = Fraction::parse("3/4").unwrap();
        let e = Expansion::new(&f, 10, 5, 4096).unwrap();
        assert_eq!(e.digits(), &[7, 5]);
        assert_eq!(e.repeat_start(), 2);
        assert_eq!(e.exponent(), 0);
        assert_eq!(e.to_string(), "0.75");

        assert_eq!(expand("1/7", 10, 8), "0.(142857)");
        assert_eq!(expand("1/6", 10, 8), "0.1(6)");
        assert_eq!(expand("22/7", 10, 8), "3.(142857)");
        assert_eq!(expand("-1/4", 10, 8), "-0.25");
        assert_eq!(expand("42", 10, 8), "42");
        assert_eq!(expand("0", 10, 0), "0");
    }

    #[test]
    fn test_other_bases() {
        assert_eq!(expand("1/2", 2, 8), "0.1");
        assert_eq!(expand("1/3", 2, 8), "0.(01)");
        assert_eq!(expand("255", 16, 8), "ff");
        assert_eq!(expand("1/3", 3, 8), "0.1");
        assert_eq!(expand("1/8", 2, 0), "1*2^-3");
    }

    #[test]
    fn test_period_and_pre_period() {
        let f = Fraction::parse("7/12").unwrap();
        let e = Expansion::new(&f, 10, 8, 4096).unwrap();
        // 0.58(3)
        assert_eq!(e.repeat_start(), 2);
        assert_eq!(e.period(), 1);
        assert_eq!(e.to_string(), "0.58(3)");
    }

    #[test]
    fn test_truncation() {
        let f = Fraction::parse("1/7").unwrap();
        let e = Expansion::new(&f, 10, 8, 3).unwrap();
        assert!(e.is_truncated());
        assert_eq!(e.to_string(), "0.142...");

        // exactly max_digits terminating digits is not a truncation
        let f = Fraction::parse("1/8").unwrap();
        let e = Expansion::new(&f, 10, 8, 3).unwrap();
        assert!(!e.is_truncated());
        assert_eq!(e.to_string(), "0.125");
    }

    #[test]
    fn test_invalid_input() {
        let f = Fraction::parse("1/3").unwrap();
        assert_eq!(Expansion::new(&f, 1, 0, 10), Err(Error::InvalidBase(1)));
        assert_eq!(Expansion::new(&f, 37, 0, 10), Err(Error::InvalidBase(37)));
        assert_eq!(
            Expansion::from_parts(false, BigUint::one(), BigUint::zero(), 10, 0, 10),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn test_unreduced_parts() {
        let e = Expansion::from_parts(false, BigUint::from(2u32), BigUint::from(6u32), 10, 8, 100).unwrap();
        assert_eq!(e.to_string(), "0.(3)");
    }
}
