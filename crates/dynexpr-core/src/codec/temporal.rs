//! Date and timestamp rendering.
//!
//! Formats are chrono strftime patterns and therefore culture-invariant.
//! Two pseudo-formats store instants as wire numbers: `epoch` (seconds) and
//! `epoch_millis`.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use dynexpr_model::AttributeValue;

const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemporalFormat<'a> {
    Iso,
    Epoch,
    EpochMillis,
    Pattern(&'a str),
}

impl<'a> TemporalFormat<'a> {
    fn classify(format: Option<&'a str>) -> Self {
        match format {
            None => Self::Iso,
            Some(f) if f.eq_ignore_ascii_case("epoch") => Self::Epoch,
            Some(f) if f.eq_ignore_ascii_case("epoch_millis") => Self::EpochMillis,
            Some(f) => Self::Pattern(f),
        }
    }
}

/// Compile a strftime pattern, rejecting unknown specifiers up front so that
/// rendering can never fail halfway.
fn compile(pattern: &str) -> Result<Vec<Item<'_>>, String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid date format '{pattern}'"));
    }
    Ok(items)
}

fn render_naive(value: &NaiveDateTime, pattern: &str) -> Result<String, String> {
    let items = compile(pattern)?;
    let mut out = String::new();
    write!(out, "{}", value.format_with_items(items.iter()))
        .map_err(|_| format!("format '{pattern}' needs fields a {value} cannot supply"))?;
    Ok(out)
}

/// Render a timestamp for the wire.
pub(crate) fn timestamp_to_wire(
    value: &DateTime<Utc>,
    format: Option<&str>,
) -> Result<AttributeValue, String> {
    match TemporalFormat::classify(format) {
        TemporalFormat::Iso => Ok(AttributeValue::S(
            value.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )),
        TemporalFormat::Epoch => Ok(AttributeValue::N(value.timestamp().to_string())),
        TemporalFormat::EpochMillis => {
            Ok(AttributeValue::N(value.timestamp_millis().to_string()))
        }
        TemporalFormat::Pattern(pattern) => {
            render_naive(&value.naive_utc(), pattern).map(AttributeValue::S)
        }
    }
}

/// Render a calendar date for the wire.
pub(crate) fn date_to_wire(value: NaiveDate, format: Option<&str>) -> Result<AttributeValue, String> {
    let midnight = value.and_time(chrono::NaiveTime::MIN);
    match TemporalFormat::classify(format) {
        TemporalFormat::Iso => render_naive(&midnight, ISO_DATE).map(AttributeValue::S),
        TemporalFormat::Epoch => Ok(AttributeValue::N(
            midnight.and_utc().timestamp().to_string(),
        )),
        TemporalFormat::EpochMillis => Ok(AttributeValue::N(
            midnight.and_utc().timestamp_millis().to_string(),
        )),
        TemporalFormat::Pattern(pattern) => render_naive(&midnight, pattern).map(AttributeValue::S),
    }
}

fn wire_text<'v>(wire: &'v AttributeValue, expected: &str) -> Result<&'v str, String> {
    match wire {
        AttributeValue::S(s) | AttributeValue::N(s) => Ok(s),
        other => Err(format!(
            "expected {expected} text, found {}",
            other.type_descriptor()
        )),
    }
}

fn epoch_number(wire: &AttributeValue) -> Result<i64, String> {
    let text = wire_text(wire, "epoch")?;
    text.parse::<i64>()
        .map_err(|_| format!("'{text}' is not an epoch number"))
}

/// Decode a timestamp written by [`timestamp_to_wire`].
pub(crate) fn timestamp_from_wire(
    wire: &AttributeValue,
    format: Option<&str>,
) -> Result<DateTime<Utc>, String> {
    match TemporalFormat::classify(format) {
        TemporalFormat::Iso => {
            let text = wire_text(wire, "timestamp")?;
            DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("'{text}' is not an ISO-8601 timestamp: {e}"))
        }
        TemporalFormat::Epoch => {
            let secs = epoch_number(wire)?;
            DateTime::from_timestamp(secs, 0).ok_or_else(|| format!("epoch {secs} out of range"))
        }
        TemporalFormat::EpochMillis => {
            let millis = epoch_number(wire)?;
            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| format!("epoch millis {millis} out of range"))
        }
        TemporalFormat::Pattern(pattern) => {
            compile(pattern)?;
            let text = wire_text(wire, "timestamp")?;
            if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                return Ok(naive.and_utc());
            }
            NaiveDate::parse_from_str(text, pattern)
                .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
                .map_err(|e| format!("'{text}' does not match '{pattern}': {e}"))
        }
    }
}

/// Decode a date written by [`date_to_wire`].
pub(crate) fn date_from_wire(wire: &AttributeValue, format: Option<&str>) -> Result<NaiveDate, String> {
    match TemporalFormat::classify(format) {
        TemporalFormat::Iso => {
            let text = wire_text(wire, "date")?;
            NaiveDate::parse_from_str(text, ISO_DATE)
                .map_err(|e| format!("'{text}' is not an ISO-8601 date: {e}"))
        }
        TemporalFormat::Epoch | TemporalFormat::EpochMillis => {
            timestamp_from_wire(wire, format).map(|dt| dt.date_naive())
        }
        TemporalFormat::Pattern(pattern) => {
            compile(pattern)?;
            let text = wire_text(wire, "date")?;
            NaiveDate::parse_from_str(text, pattern)
                .or_else(|_| NaiveDateTime::parse_from_str(text, pattern).map(|dt| dt.date()))
                .map_err(|e| format!("'{text}' does not match '{pattern}': {e}"))
        }
    }
}
