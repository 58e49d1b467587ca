//! Lenient field lookup over untyped channel JSON.
//!
//! Channels are inconsistent about field names and about whether numbers
//! arrive as numbers or strings, so every lookup takes a list of candidate
//! names tried in priority order.

use chrono::NaiveDate;
use serde_json::Value;

/// Renders a scalar as a string; numbers keep their literal form.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The first non-empty scalar under any of `keys`.
pub(crate) fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find_map(scalar_string)
}

/// The first value under any of `keys` that reads as a non-negative integer.
pub(crate) fn first_u32(obj: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().filter_map(|key| obj.get(*key)).find_map(|v| match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// The first value under any of `keys` that reads as a decimal number.
pub(crate) fn first_decimal(obj: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|key| obj.get(*key)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Outcome of looking up a date field.
pub(crate) enum DateField {
    Found(NaiveDate),
    Invalid(String),
    Absent,
}

/// The first present value under any of `keys`, parsed as a date.
///
/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
pub(crate) fn first_date(obj: &Value, keys: &[&str]) -> DateField {
    match first_string(obj, keys) {
        None => DateField::Absent,
        Some(raw) => {
            let date_part = raw.get(..10).unwrap_or(&raw);
            match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
                Ok(date) => DateField::Found(date),
                Err(_) => DateField::Invalid(raw),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_first_string_respects_priority_and_skips_blanks() {
        let obj = json!({"bookId": "", "id": 4512, "bookingId": "X"});
        assert_eq!(
            first_string(&obj, &["bookId", "id", "bookingId"]).as_deref(),
            Some("4512")
        );
    }

    #[test]
    fn test_numbers_accept_strings() {
        let obj = json!({"numAdult": "2", "price": "199.90"});
        assert_eq!(first_u32(&obj, &["numAdult"]), Some(2));
        assert_eq!(first_decimal(&obj, &["price"]), Some(199.9));
        assert_eq!(first_u32(&obj, &["numChild"]), None);
    }

    #[test]
    fn test_dates_with_time_part() {
        let obj = json!({"arrival": "2026-06-01T14:00:00Z", "bad": "June 1st"});
        assert!(matches!(first_date(&obj, &["arrival"]), DateField::Found(_)));
        assert!(matches!(first_date(&obj, &["bad"]), DateField::Invalid(_)));
        assert!(matches!(first_date(&obj, &["departure"]), DateField::Absent));
    }
}
