//! `date` coercer: ISO-8601 strings and epoch milliseconds to UTC datetimes.

use crate::model::value::{format_iso8601, Value};
use crate::types::{Coercer, CoercionError, CoercionResult};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_FALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d\d)-(\d\d)(?:[tT ]([\d:.]*))?([zZ]|([+\-])(\d\d):(\d\d))?$")
        .expect("valid iso fallback regex")
});

/// Coercer for the `date` tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl Coercer for DateType {
    fn load(&self, raw: &Value, _attribute: &str) -> CoercionResult<Value> {
        match raw {
            Value::String(text) => parse_iso8601(text).map(Value::Date),
            Value::Number(millis) => from_epoch_millis(*millis).map(Value::Date),
            Value::Date(_) => Ok(raw.clone()),
            other => Err(CoercionError::invalid_input(other.type_name(), "Date")),
        }
    }

    fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
        match value {
            Value::Date(date) => Ok(Value::String(format_iso8601(date))),
            other => Err(CoercionError::invalid_input(other.type_name(), "ISO-8601")),
        }
    }
}

/// Parses an ISO-8601 timestamp and normalizes it to UTC.
///
/// RFC 3339 input is handled by chrono; the fallback accepts date-only and
/// partial-time forms such as `2011-06-02`, `2011-06-02 09:34` or
/// `2011-06-02T09:34:29.5+02:00`. A missing offset means UTC.
pub fn parse_iso8601(text: &str) -> CoercionResult<DateTime<Utc>> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let invalid = || CoercionError::InvalidDate(text.to_string());
    let caps = ISO_FALLBACK_RE.captures(trimmed).ok_or_else(invalid)?;

    let year: i32 = caps[1].parse().map_err(|_| invalid())?;
    let month: u32 = caps[2].parse().map_err(|_| invalid())?;
    let day: u32 = caps[3].parse().map_err(|_| invalid())?;
    let (hour, minute, second, millis) = match caps.get(4) {
        Some(time) => parse_time_of_day(time.as_str()).ok_or_else(invalid)?,
        None => (0, 0, 0, 0),
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_milli_opt(hour, minute, second, millis))
        .ok_or_else(invalid)?;
    let mut utc = Utc.from_utc_datetime(&naive);

    if let (Some(sign), Some(hours), Some(minutes)) = (caps.get(6), caps.get(7), caps.get(8)) {
        let hours: i64 = hours.as_str().parse().map_err(|_| invalid())?;
        let minutes: i64 = minutes.as_str().parse().map_err(|_| invalid())?;
        let offset = Duration::minutes(hours * 60 + minutes);
        utc = if sign.as_str() == "+" {
            utc - offset
        } else {
            utc + offset
        };
    }

    Ok(utc)
}

fn parse_time_of_day(time: &str) -> Option<(u32, u32, u32, u32)> {
    if time.is_empty() {
        return Some((0, 0, 0, 0));
    }

    let mut parts = time.splitn(3, ':');
    let hour = parse_component(parts.next())?;
    let minute = parse_component(parts.next())?;
    let (second, millis) = match parts.next() {
        Some(rest) => match rest.split_once('.') {
            Some((seconds, fraction)) => (parse_component(Some(seconds))?, fraction_to_millis(fraction)?),
            None => (parse_component(Some(rest))?, 0),
        },
        None => (0, 0),
    };
    Some((hour, minute, second, millis))
}

fn parse_component(part: Option<&str>) -> Option<u32> {
    match part {
        None | Some("") => Some(0),
        Some(value) => value.parse().ok(),
    }
}

fn fraction_to_millis(fraction: &str) -> Option<u32> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits: String = fraction.chars().take(3).collect();
    while digits.len() < 3 {
        digits.push('0');
    }
    digits.parse().ok()
}

fn from_epoch_millis(millis: f64) -> CoercionResult<DateTime<Utc>> {
    if !millis.is_finite() {
        return Err(CoercionError::InvalidDate(millis.to_string()));
    }
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .ok_or_else(|| CoercionError::InvalidDate(millis.to_string()))
}
