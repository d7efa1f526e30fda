//! C ABI
//!
//! Fractions cross the boundary as NUL-terminated text (`"n/d"` or `"n"`).
//! Strings returned by these functions belong to the caller and are released
//! with [`pyfrac_free`]; error messages with [`pyfrac_err_clear`].

use crate::bridge::{self, byte_slice, c_str, c_str_or_empty, into_c_string, PyfracError};
use crate::error::{Error, Result};
use crate::evaluator::evaluate_str;
use crate::expansion::Expansion;
use crate::fraction::Fraction;
use crate::integer::parse_integer;
use crate::options::{FormatOptions, DEFAULT_MAX_DIGITS};
use num_bigint::BigUint;
use std::cmp::Ordering;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_longlong};
use tracing_subscriber::EnvFilter;

/// Bumped on any incompatible change to the exported functions.
pub const ABI_VERSION: u32 = 1;

/// Environment variable holding the log filter used by [`pyfrac_init`]
pub const LOG_ENV: &str = "PYFRAC_LOG";

/// Install the panic hook and the stderr log subscriber. Safe to call twice.
#[no_mangle]
pub extern "C" fn pyfrac_init() {
    bridge::set_panic_hook();
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // fails when the host already installed a global subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Release a string returned by this library. Null is ignored.
#[no_mangle]
pub unsafe extern "C" fn pyfrac_free(buf: *mut c_char) {
    if !buf.is_null() {
        drop(CString::from_raw(buf));
    }
}

/// Release the message of an error struct and reset it.
#[no_mangle]
pub unsafe extern "C" fn pyfrac_err_clear(err: *mut PyfracError) {
    bridge::clear_error(err);
}

#[no_mangle]
pub extern "C" fn pyfrac_abi_version() -> u32 {
    ABI_VERSION
}

/// Static version string; do not free.
#[no_mangle]
pub extern "C" fn pyfrac_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

unsafe fn fraction_arg(ptr: *const c_char, what: &'static str) -> Result<Fraction> {
    Fraction::parse(c_str(ptr, what)?)
}

fn fraction_result(value: Fraction) -> Result<*mut c_char> {
    into_c_string(value.to_string())
}

unsafe fn binary<F>(a: *const c_char, b: *const c_char, op: F) -> Result<*mut c_char>
where
    F: FnOnce(&Fraction, &Fraction) -> Result<Fraction>,
{
    let a = fraction_arg(a, "a")?;
    let b = fraction_arg(b, "b")?;
    fraction_result(op(&a, &b)?)
}

unsafe fn unary<F>(a: *const c_char, op: F) -> Result<*mut c_char>
where
    F: FnOnce(&Fraction) -> Result<Fraction>,
{
    let a = fraction_arg(a, "a")?;
    fraction_result(op(&a)?)
}

export!(
    /// Build `num/den` from two decimal integers and return its canonical text.
    pyfrac_construct(num: *const c_char, den: *const c_char) -> Result<*mut c_char> {
        let num_text = c_str(num, "num")?;
        let den_text = c_str(den, "den")?;
        let numer = parse_integer(num_text.trim())
            .ok_or_else(|| Error::malformed(num_text, "numerator is not an integer"))?;
        let denom = parse_integer(den_text.trim())
            .ok_or_else(|| Error::malformed(den_text, "denominator is not an integer"))?;
        fraction_result(Fraction::new(numer, denom)?)
    }
);

export!(
    /// Canonical text of `"n/d"`, `"n"` or a decimal literal.
    pyfrac_parse(text: *const c_char) -> Result<*mut c_char> {
        let text = c_str(text, "text")?;
        let value = Fraction::parse(text).or_else(|e| Fraction::parse_decimal(text).map_err(|_| e))?;
        fraction_result(value)
    }
);

export!(pyfrac_add(a: *const c_char, b: *const c_char) -> Result<*mut c_char> {
    binary(a, b, |a, b| Ok(Fraction::add(a, b)))
});

export!(pyfrac_sub(a: *const c_char, b: *const c_char) -> Result<*mut c_char> {
    binary(a, b, |a, b| Ok(Fraction::sub(a, b)))
});

export!(pyfrac_mul(a: *const c_char, b: *const c_char) -> Result<*mut c_char> {
    binary(a, b, |a, b| Ok(Fraction::mul(a, b)))
});

export!(pyfrac_div(a: *const c_char, b: *const c_char) -> Result<*mut c_char> {
    binary(a, b, Fraction::div)
});

export!(pyfrac_neg(a: *const c_char) -> Result<*mut c_char> {
    unary(a, |a| Ok(Fraction::neg(a)))
});

export!(pyfrac_abs(a: *const c_char) -> Result<*mut c_char> {
    unary(a, |a| Ok(a.abs()))
});

export!(pyfrac_reciprocal(a: *const c_char) -> Result<*mut c_char> {
    unary(a, Fraction::recip)
});

export!(pyfrac_pow(a: *const c_char, exp: c_longlong) -> Result<*mut c_char> {
    unary(a, |a| a.pow(exp))
});

export!(
    /// -1, 0 or 1. On failure 0 is returned and `err->failed` is set.
    pyfrac_compare(a: *const c_char, b: *const c_char) -> Result<c_int> {
        let a = fraction_arg(a, "a")?;
        let b = fraction_arg(b, "b")?;
        Ok(match a.compare(&b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    }
);

export!(
    /// Render a fraction. `options_json` may be null for the defaults.
    pyfrac_format(a: *const c_char, options_json: *const c_char) -> Result<*mut c_char> {
        let value = fraction_arg(a, "a")?;
        let options = FormatOptions::from_json(c_str_or_empty(options_json, "options_json")?)?;
        into_c_string(options.format(&value)?)
    }
);

export!(
    /// Evaluate a single expression without bindings and format the result.
    pyfrac_eval(expr: *const c_char, options_json: *const c_char) -> Result<*mut c_char> {
        let expr = c_str(expr, "expr")?;
        let options = FormatOptions::from_json(c_str_or_empty(options_json, "options_json")?)?;
        into_c_string(evaluate_str(expr, &options)?)
    }
);

export!(
    /// Repeating expansion of `num/den`, both given as big-endian unsigned
    /// magnitudes.
    pyfrac_repeated(
        num: *const u8,
        num_len: usize,
        den: *const u8,
        den_len: usize,
        base: usize,
        min_exp: usize
    ) -> Result<*mut c_char> {
        let num = BigUint::from_bytes_be(byte_slice(num, num_len, "num")?);
        let den = BigUint::from_bytes_be(byte_slice(den, den_len, "den")?);
        let base = u32::try_from(base).map_err(|_| Error::InvalidBase(u32::MAX))?;
        let expansion = Expansion::from_parts(false, num, den, base, min_exp, DEFAULT_MAX_DIGITS)?;
        into_c_string(expansion.to_string())
    }
);
