//! Canonical number text and numeric format strings.
//!
//! Wire numbers are plain decimal text: no exponent, no padding, and no
//! trailing zeros beyond what the source value carries. Numeric formats
//! (`F2`, `D8`) produce sortable string renderings instead.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// A numeric format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericFormat {
    /// `F<n>`: exactly `n` fraction digits, midpoint rounded away from zero.
    Fixed(u32),
    /// `D<n>`: integer zero-padded to at least `n` digits.
    Padded(usize),
}

impl NumericFormat {
    /// Parse `F<n>` / `D<n>` (case-insensitive). Returns `None` for anything else.
    pub(crate) fn parse(format: &str) -> Option<Self> {
        let mut chars = format.chars();
        let tag = chars.next()?.to_ascii_uppercase();
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match tag {
            'F' => digits
                .parse::<u32>()
                .ok()
                .filter(|n| *n <= 28)
                .map(Self::Fixed),
            'D' => digits.parse::<usize>().ok().filter(|n| *n <= 64).map(Self::Padded),
            _ => None,
        }
    }

    /// Render `value` with this format.
    pub(crate) fn render(self, value: Decimal) -> Result<String, String> {
        match self {
            Self::Fixed(scale) => {
                let mut rounded =
                    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
                rounded.rescale(scale);
                Ok(rounded.to_string())
            }
            Self::Padded(width) => {
                if !value.fract().is_zero() {
                    return Err(format!("D{width} requires an integral value, got {value}"));
                }
                let digits = value.trunc().abs().normalize().to_string();
                let sign = if value.is_sign_negative() && !value.is_zero() {
                    "-"
                } else {
                    ""
                };
                Ok(format!("{sign}{digits:0>width$}"))
            }
        }
    }
}

/// Canonical text for a float, or `None` when it is NaN or infinite.
///
/// `f64`'s `Display` emits the shortest text that parses back to the same
/// value and never uses an exponent.
pub(crate) fn canonical_float(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some("0".to_owned());
    }
    Some(value.to_string())
}

/// Parse wire number text, accepting scientific notation written by other clients.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Parse wire number text as an `i64`.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(n);
    }
    let decimal = parse_decimal(text)?;
    if !decimal.fract().is_zero() {
        return None;
    }
    rust_decimal::prelude::ToPrimitive::to_i64(&decimal)
}
