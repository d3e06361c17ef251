//! Value-level conversion functions between the scalar types carried by blocks.
//!
//! Text renderings are canonical: integers in plain decimal, doubles in their
//! shortest round-trip form (always with a fractional part or an exponent),
//! booleans as `true`/`false`. Parsing text accepts surrounding whitespace.
//!
//! A value that cannot be represented in the target type is an error; it is
//! never silently mapped to null.

use strata_common::{Result, error::Error};

pub fn long_to_text(value: i64) -> String {
    value.to_string()
}

pub fn int_to_text(value: i32) -> String {
    value.to_string()
}

pub fn double_to_text(value: f64) -> String {
    let mut buf = dtoa::Buffer::new();
    buf.format(value).to_string()
}

pub fn boolean_to_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

pub fn text_to_long(text: &[u8]) -> Result<i64> {
    let s = as_trimmed_str(text, "long")?;
    if let Ok(value) = s.parse::<i64>() {
        return Ok(value);
    }
    let value = s
        .parse::<f64>()
        .map_err(|_| Error::value_conversion(s, "long"))?;
    integral_double(value, I64_RANGE)
        .map(|v| v as i64)
        .ok_or_else(|| Error::value_conversion(s, "long"))
}

pub fn text_to_int(text: &[u8]) -> Result<i32> {
    let s = as_trimmed_str(text, "int")?;
    if let Ok(value) = s.parse::<i64>() {
        return i32::try_from(value).map_err(|_| Error::value_conversion(s, "int"));
    }
    let value = s
        .parse::<f64>()
        .map_err(|_| Error::value_conversion(s, "int"))?;
    integral_double(value, I32_RANGE)
        .map(|v| v as i32)
        .ok_or_else(|| Error::value_conversion(s, "int"))
}

pub fn text_to_double(text: &[u8]) -> Result<f64> {
    let s = as_trimmed_str(text, "double")?;
    s.parse::<f64>()
        .map_err(|_| Error::value_conversion(s, "double"))
}

pub fn text_to_boolean(text: &[u8]) -> Result<bool> {
    let s = as_trimmed_str(text, "boolean")?;
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(Error::value_conversion(s, "boolean"))
    }
}

#[inline]
pub fn int_to_long(value: i32) -> i64 {
    value as i64
}

#[inline]
pub fn int_to_double(value: i32) -> f64 {
    value as f64
}

#[inline]
pub fn long_to_double(value: i64) -> f64 {
    value as f64
}

fn as_trimmed_str<'a>(text: &'a [u8], target: &str) -> Result<&'a str> {
    std::str::from_utf8(text)
        .map(str::trim)
        .map_err(|_| Error::value_conversion(String::from_utf8_lossy(text), target))
}

/// `[-2^63, 2^63)`. `i64::MAX as f64` rounds up to 2^63, so the upper bound
/// must be exclusive.
const I64_RANGE: (f64, f64) = (-9223372036854775808.0, 9223372036854775808.0);

/// `[-2^31, 2^31)`.
const I32_RANGE: (f64, f64) = (-2147483648.0, 2147483648.0);

/// Returns `value` when it has no fractional part and lies within the
/// half-open `range`.
fn integral_double(value: f64, (min, max): (f64, f64)) -> Option<f64> {
    (value.is_finite() && value.fract() == 0.0 && value >= min && value < max).then_some(value)
}
