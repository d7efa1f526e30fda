//! Arbitrary-precision rational number arithmetic
//!
//! A [`Fraction`] is always kept in canonical form: positive denominator,
//! numerator and denominator coprime, zero stored as `0/1`. Because of that,
//! derived equality and hashing agree with numeric equality.
//!
//! Arithmetic cancels common factors before multiplying (Knuth, TAOCP 4.5.1)
//! so intermediate products stay as small as the result allows. Long chains
//! of operations in a shell session would otherwise grow numerators and
//! denominators multiplicatively.

use crate::error::{Error, Result};
use crate::expansion::Expansion;
use crate::integer::{self, gcd};
use crate::options;
use crate::to_js_error;
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;
use wasm_bindgen::prelude::*;

/// Exact rational number with unbounded numerator and denominator.
#[wasm_bindgen]
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FractionRepr", into = "FractionRepr")]
pub struct Fraction {
    numer: BigInt,
    denom: BigInt,
}

/// Serialized form; strings keep big magnitudes intact through JSON
#[derive(Serialize, Deserialize)]
struct FractionRepr {
    n: String, // signed numerator
    d: String, // positive denominator
}

impl From<Fraction> for FractionRepr {
    fn from(f: Fraction) -> Self {
        FractionRepr {
            n: f.numer.to_string(),
            d: f.denom.to_string(),
        }
    }
}

impl TryFrom<FractionRepr> for Fraction {
    type Error = Error;

    fn try_from(repr: FractionRepr) -> Result<Fraction> {
        let numer = integer::parse_integer(&repr.n)
            .ok_or_else(|| Error::malformed(&repr.n, "numerator is not an integer"))?;
        let denom = integer::parse_integer(&repr.d)
            .ok_or_else(|| Error::malformed(&repr.d, "denominator is not an integer"))?;
        Fraction::new(numer, denom)
    }
}

impl Fraction {
    /// Build a fraction from any numerator and denominator.
    ///
    /// The sign moves to the numerator and both parts are divided by their
    /// GCD. Fails with [`Error::DivisionByZero`] for a zero denominator.
    pub fn new(numer: BigInt, denom: BigInt) -> Result<Fraction> {
        if denom.is_zero() {
            return Err(Error::DivisionByZero);
        }
        Ok(Fraction::reduce(numer, denom))
    }

    /// Convenience constructor for machine integers
    pub fn ratio(numer: i64, denom: i64) -> Result<Fraction> {
        Fraction::new(BigInt::from(numer), BigInt::from(denom))
    }

    pub fn from_integer(n: BigInt) -> Fraction {
        Fraction {
            numer: n,
            denom: BigInt::one(),
        }
    }

    pub fn zero() -> Fraction {
        Fraction::from_integer(BigInt::zero())
    }

    pub fn one() -> Fraction {
        Fraction::from_integer(BigInt::one())
    }

    /// Create from a num-rational value (which may have been built unreduced)
    pub fn from_big_rational(r: BigRational) -> Result<Fraction> {
        let (numer, denom) = r.into_raw();
        Fraction::new(numer, denom)
    }

    /// Lossless conversion to num-rational
    pub fn to_big_rational(&self) -> BigRational {
        BigRational::new_raw(self.numer.clone(), self.denom.clone())
    }

    // denom must be nonzero
    fn reduce(mut numer: BigInt, mut denom: BigInt) -> Fraction {
        if denom.is_negative() {
            numer = -numer;
            denom = -denom;
        }
        let g = gcd(&numer, &denom);
        if !g.is_one() {
            numer /= &g;
            denom /= &g;
        }
        Fraction { numer, denom }
    }

    // Parts already canonical
    fn from_canonical(numer: BigInt, denom: BigInt) -> Fraction {
        debug_assert!(denom.is_positive());
        debug_assert!(gcd(&numer, &denom).is_one());
        Fraction { numer, denom }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }

    pub fn into_parts(self) -> (BigInt, BigInt) {
        (self.numer, self.denom)
    }

    pub fn is_zero(&self) -> bool {
        self.numer.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.numer.is_one() && self.denom.is_one()
    }

    pub fn is_integer(&self) -> bool {
        self.denom.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.numer.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.numer.is_positive()
    }

    /// -1, 0 or 1
    pub fn signum(&self) -> i32 {
        match self.numer.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        }
    }

    /// Sum, reduced against `gcd(b, d)` only.
    pub fn add(&self, other: &Fraction) -> Fraction {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let g = gcd(&self.denom, &other.denom);
        if g.is_one() {
            let numer = &self.numer * &other.denom + &other.numer * &self.denom;
            let denom = &self.denom * &other.denom;
            return Fraction::from_canonical(numer, denom);
        }
        let b_over_g = &self.denom / &g;
        let d_over_g = &other.denom / &g;
        let t = &self.numer * &d_over_g + &other.numer * &b_over_g;
        if t.is_zero() {
            return Fraction::zero();
        }
        let g2 = gcd(&t, &g);
        let numer = t / &g2;
        let denom = b_over_g * (&other.denom / &g2);
        Fraction::from_canonical(numer, denom)
    }

    pub fn sub(&self, other: &Fraction) -> Fraction {
        self.add(&other.neg())
    }

    /// Product with cross-cancellation before multiplying.
    pub fn mul(&self, other: &Fraction) -> Fraction {
        if self.is_zero() || other.is_zero() {
            return Fraction::zero();
        }
        let g1 = gcd(&self.numer, &other.denom);
        let g2 = gcd(&other.numer, &self.denom);
        let numer = (&self.numer / &g1) * (&other.numer / &g2);
        let denom = (&self.denom / &g2) * (&other.denom / &g1);
        Fraction::from_canonical(numer, denom)
    }

    /// Quotient; fails with [`Error::DivisionByZero`] when `other` is zero.
    pub fn div(&self, other: &Fraction) -> Result<Fraction> {
        Ok(self.mul(&other.recip()?))
    }

    pub fn neg(&self) -> Fraction {
        Fraction {
            numer: -&self.numer,
            denom: self.denom.clone(),
        }
    }

    pub fn abs(&self) -> Fraction {
        Fraction {
            numer: self.numer.abs(),
            denom: self.denom.clone(),
        }
    }

    /// Reciprocal (1/x)
    pub fn recip(&self) -> Result<Fraction> {
        if self.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let (numer, denom) = if self.numer.is_negative() {
            (-&self.denom, -&self.numer)
        } else {
            (self.denom.clone(), self.numer.clone())
        };
        Ok(Fraction::from_canonical(numer, denom))
    }

    /// Exact comparison by cross multiplication.
    pub fn compare(&self, other: &Fraction) -> Ordering {
        let (sa, sb) = (self.numer.sign(), other.numer.sign());
        if sa != sb {
            return sa.cmp(&sb);
        }
        if self.denom == other.denom {
            return self.numer.cmp(&other.numer);
        }
        (&self.numer * &other.denom).cmp(&(&other.numer * &self.denom))
    }

    /// Integer power. Negative exponents take the reciprocal first.
    pub fn pow(&self, exp: i64) -> Result<Fraction> {
        // bases whose powers stay small never hit the exponent limit
        if exp == 0 {
            return Ok(Fraction::one());
        }
        if self.is_zero() {
            return if exp < 0 { Err(Error::DivisionByZero) } else { Ok(Fraction::zero()) };
        }
        if self.denom.is_one() && self.numer.abs().is_one() {
            return Ok(if self.is_negative() && exp % 2 != 0 { self.clone() } else { Fraction::one() });
        }
        let k = integer::exponent_to_u32(exp)?;
        let base = if exp < 0 { self.recip()? } else { self.clone() };
        // coprime parts stay coprime when raised to a power
        Ok(Fraction::from_canonical(base.numer.pow(k), base.denom.pow(k)))
    }

    // Canonical denominators are positive, so `divide` cannot fail here
    fn integer_part(&self, divide: fn(&BigInt, &BigInt) -> Result<(BigInt, BigInt)>) -> Fraction {
        let q = divide(&self.numer, &self.denom).map(|(q, _)| q).unwrap_or_default();
        Fraction::from_integer(q)
    }

    /// Largest integer not greater than the value
    pub fn floor(&self) -> Fraction {
        self.integer_part(integer::div_rem_floor)
    }

    pub fn ceil(&self) -> Fraction {
        self.neg().floor().neg()
    }

    pub fn trunc(&self) -> Fraction {
        self.integer_part(integer::div_rem_trunc)
    }

    /// Nearest integer, halves rounded away from zero
    pub fn round(&self) -> Fraction {
        let half = Fraction::from_canonical(BigInt::one(), BigInt::from(2));
        let magnitude = Fraction::add(&self.abs(), &half).floor();
        if self.is_negative() {
            magnitude.neg()
        } else {
            magnitude
        }
    }

    // a/b over c/d is the integer division of a*d by b*c; the remainder
    // is then scaled back by b*d
    fn div_rem_floor(&self, other: &Fraction) -> Result<(BigInt, BigInt)> {
        integer::div_rem_floor(&(&self.numer * &other.denom), &(&self.denom * &other.numer))
    }

    /// `floor(self / other)`, the `//` of the shell
    pub fn floor_div(&self, other: &Fraction) -> Result<Fraction> {
        let (q, _) = self.div_rem_floor(other)?;
        Ok(Fraction::from_integer(q))
    }

    /// `self - other * floor(self / other)`; the result has the sign of `other`
    pub fn modulo(&self, other: &Fraction) -> Result<Fraction> {
        let (_, r) = self.div_rem_floor(other)?;
        Fraction::new(r, &self.denom * &other.denom)
    }

    /// Nearest f64; huge values saturate to infinity
    pub fn to_f64(&self) -> f64 {
        let fallback = if self.is_negative() { f64::NEG_INFINITY } else { f64::INFINITY };
        self.to_big_rational().to_f64().unwrap_or(fallback)
    }

    /// Strict text form: `[+-]digits` with an optional `/digits` suffix.
    pub fn parse(text: &str) -> Result<Fraction> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::malformed(text, "empty input"));
        }
        let (num_str, den_str) = match trimmed.split_once('/') {
            Some((n, d)) => (n.trim_end(), Some(d.trim_start())),
            None => (trimmed, None),
        };
        let numer = integer::parse_integer(num_str)
            .ok_or_else(|| Error::malformed(text, "numerator is not an integer"))?;
        let denom = match den_str {
            Some(d) if d.starts_with(&['+', '-'][..]) => {
                return Err(Error::malformed(text, "denominator must be unsigned"));
            }
            Some(d) => integer::parse_integer(d)
                .ok_or_else(|| Error::malformed(text, "denominator is not an integer"))?,
            None => BigInt::one(),
        };
        Fraction::new(numer, denom)
    }

    /// Exact value of a decimal literal such as `-12.375` or `1.5e-3`.
    pub fn parse_decimal(text: &str) -> Result<Fraction> {
        let trimmed = text.trim();
        let (mantissa, exp) = match trimmed.split_once(&['e', 'E'][..]) {
            Some((m, e)) => {
                let e = integer::parse_integer(e)
                    .ok_or_else(|| Error::malformed(text, "exponent is not an integer"))?;
                (m, e.to_i64().ok_or(Error::ExponentTooLarge)?)
            }
            None => (trimmed, 0),
        };
        let (negative, body) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(Error::malformed(text, "not a decimal number"));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut numer = BigInt::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| Error::malformed(text, "not a decimal number"))?;
        if negative {
            numer = -numer;
        }
        let frac_len = i64::try_from(frac_part.len()).map_err(|_| Error::ExponentTooLarge)?;
        let scale = exp.checked_sub(frac_len).ok_or(Error::ExponentTooLarge)?;
        let ten_pow = BigInt::from(10u32).pow(integer::exponent_to_u32(scale)?);
        if scale >= 0 {
            Ok(Fraction::from_integer(numer * ten_pow))
        } else {
            Fraction::new(numer, ten_pow)
        }
    }

    /// Canonical text: `"n"` for integers, otherwise `"n/d"`
    pub fn to_string_repr(&self) -> String {
        if self.denom.is_one() {
            self.numer.to_string()
        } else {
            format!("{}/{}", self.numer, self.denom)
        }
    }
}

#[wasm_bindgen]
impl Fraction {
    /// Create a Fraction from decimal integer strings
    #[wasm_bindgen(constructor)]
    pub fn js_new(numer: &str, denom: &str) -> std::result::Result<Fraction, JsValue> {
        let numer_int = integer::parse_integer(numer.trim())
            .ok_or_else(|| to_js_error(Error::malformed(numer, "numerator is not an integer")))?;
        let denom_int = integer::parse_integer(denom.trim())
            .ok_or_else(|| to_js_error(Error::malformed(denom, "denominator is not an integer")))?;
        Fraction::new(numer_int, denom_int).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = fromInt)]
    pub fn from_int(n: i32) -> Fraction {
        Fraction::from(n)
    }

    /// Parse "n", "-n" or "n/d"
    #[wasm_bindgen(js_name = fromString)]
    pub fn from_string(s: &str) -> std::result::Result<Fraction, JsValue> {
        Fraction::parse(s).map_err(to_js_error)
    }

    /// Exact value of a decimal literal like "1.25"
    #[wasm_bindgen(js_name = fromDecimal)]
    pub fn from_decimal(s: &str) -> std::result::Result<Fraction, JsValue> {
        Fraction::parse_decimal(s).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = add)]
    pub fn js_add(&self, other: &Fraction) -> Fraction {
        Fraction::add(self, other)
    }

    #[wasm_bindgen(js_name = sub)]
    pub fn js_sub(&self, other: &Fraction) -> Fraction {
        Fraction::sub(self, other)
    }

    #[wasm_bindgen(js_name = mul)]
    pub fn js_mul(&self, other: &Fraction) -> Fraction {
        Fraction::mul(self, other)
    }

    #[wasm_bindgen(js_name = div)]
    pub fn js_div(&self, other: &Fraction) -> std::result::Result<Fraction, JsValue> {
        Fraction::div(self, other).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = neg)]
    pub fn js_neg(&self) -> Fraction {
        Fraction::neg(self)
    }

    #[wasm_bindgen(js_name = abs)]
    pub fn js_abs(&self) -> Fraction {
        Fraction::abs(self)
    }

    #[wasm_bindgen(js_name = inverse)]
    pub fn js_inverse(&self) -> std::result::Result<Fraction, JsValue> {
        self.recip().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = pow)]
    pub fn js_pow(&self, exp: i32) -> std::result::Result<Fraction, JsValue> {
        self.pow(i64::from(exp)).map_err(to_js_error)
    }

    pub fn equals(&self, other: &Fraction) -> bool {
        self == other
    }

    /// Returns -1 if self < other, 0 if equal, 1 if self > other
    #[wasm_bindgen(js_name = compare)]
    pub fn js_compare(&self, other: &Fraction) -> i32 {
        match Fraction::compare(self, other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    #[wasm_bindgen(js_name = toF64)]
    pub fn js_to_f64(&self) -> f64 {
        self.to_f64()
    }

    #[wasm_bindgen(getter)]
    pub fn s(&self) -> i32 {
        self.signum()
    }

    #[wasm_bindgen(js_name = numeratorStr)]
    pub fn numerator_str(&self) -> String {
        self.numer.to_string()
    }

    #[wasm_bindgen(js_name = denominatorStr)]
    pub fn denominator_str(&self) -> String {
        self.denom.to_string()
    }

    #[wasm_bindgen(js_name = toString)]
    pub fn js_to_string(&self) -> String {
        self.to_string_repr()
    }

    /// Positional expansion, e.g. "0.1(6)" for 1/6
    #[wasm_bindgen(js_name = toExpansion)]
    pub fn to_expansion(&self, base: u32, min_exp: usize, max_digits: usize) -> std::result::Result<String, JsValue> {
        options::check_max_digits(max_digits)
            .and_then(|_| Expansion::new(self, base, min_exp, max_digits))
            .map(|e| e.to_string())
            .map_err(to_js_error)
    }

    /// Plain object `{ n, d }` with string parts
    #[wasm_bindgen(js_name = toObject)]
    pub fn to_object(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = isZero)]
    pub fn js_is_zero(&self) -> bool {
        self.is_zero()
    }

    #[wasm_bindgen(js_name = isInteger)]
    pub fn js_is_integer(&self) -> bool {
        self.is_integer()
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::zero()
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({})", self.to_string_repr())
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom.is_one() {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

impl FromStr for Fraction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Fraction> {
        Fraction::parse(s)
    }
}

impl Add for Fraction {
    type Output = Fraction;

    fn add(self, rhs: Fraction) -> Fraction {
        Fraction::add(&self, &rhs)
    }
}

impl<'a> Add<&'a Fraction> for &'a Fraction {
    type Output = Fraction;

    fn add(self, rhs: &'a Fraction) -> Fraction {
        Fraction::add(self, rhs)
    }
}

impl Sub for Fraction {
    type Output = Fraction;

    fn sub(self, rhs: Fraction) -> Fraction {
        Fraction::sub(&self, &rhs)
    }
}

impl<'a> Sub<&'a Fraction> for &'a Fraction {
    type Output = Fraction;

    fn sub(self, rhs: &'a Fraction) -> Fraction {
        Fraction::sub(self, rhs)
    }
}

impl Mul for Fraction {
    type Output = Fraction;

    fn mul(self, rhs: Fraction) -> Fraction {
        Fraction::mul(&self, &rhs)
    }
}

impl<'a> Mul<&'a Fraction> for &'a Fraction {
    type Output = Fraction;

    fn mul(self, rhs: &'a Fraction) -> Fraction {
        Fraction::mul(self, rhs)
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction {
            numer: -self.numer,
            denom: self.denom,
        }
    }
}

impl Neg for &Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction::neg(self)
    }
}

impl From<i32> for Fraction {
    fn from(n: i32) -> Self {
        Fraction::from_integer(BigInt::from(n))
    }
}

impl From<i64> for Fraction {
    fn from(n: i64) -> Self {
        Fraction::from_integer(BigInt::from(n))
    }
}

impl From<BigInt> for Fraction {
    fn from(n: BigInt) -> Self {
        Fraction::from_integer(n)
    }
}
