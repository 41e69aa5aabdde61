//! Conversion of raw request values into typed parameters.

use crate::catalog::LogicalType;
use crate::error::Error;
use chrono::{DateTime, NaiveDate};
use ontoql_proto::Value;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

/// Literal accepted as SQL NULL in place of a missing value.
pub const NULL_LITERAL: &str = "null";

/// Convert a raw value to the parameter type of `logical_type`.
///
/// Missing values and the literal `null` become a [`Value::TypedNull`] of the
/// type's [`LogicalType::value_kind`]. Textual and unknown types are bound
/// verbatim.
pub fn convert(raw: Option<&str>, logical_type: &LogicalType) -> Result<Value, Error> {
    let raw = match raw {
        None | Some(NULL_LITERAL) => return Ok(Value::TypedNull(logical_type.value_kind())),
        Some(raw) => raw,
    };

    let invalid = || Error::InvalidValueForType {
        value: raw.to_string(),
        logical_type: logical_type.to_string(),
        field: None,
    };

    match logical_type {
        LogicalType::Boolean => parse_bool(raw).map(Value::Bool).ok_or_else(invalid),
        LogicalType::Decimal | LogicalType::Numeric => {
            parse_decimal(raw.trim()).map(Value::Decimal).ok_or_else(invalid)
        }
        LogicalType::Integer => raw.trim().parse::<i32>().map(Value::Int32).map_err(|_| invalid()),
        LogicalType::Long => raw.trim().parse::<i64>().map(Value::Int64).map_err(|_| invalid()),
        LogicalType::Uuid => Uuid::parse_str(raw.trim()).map(Value::Uuid).map_err(|_| invalid()),
        LogicalType::Date => parse_date(raw.trim()).ok_or_else(invalid),
        LogicalType::String | LogicalType::Text | LogicalType::Other(_) => {
            Ok(Value::String(raw.to_string()))
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Offset timestamp (RFC 3339, optionally followed by `[Zone/Id]`) or a
/// plain calendar date.
fn parse_date(raw: &str) -> Option<Value> {
    let timestamp = match raw.find('[') {
        Some(idx) if raw.ends_with(']') => &raw[..idx],
        _ => raw,
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(Value::Timestamp(ts));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(Value::Date)
}
