//! JSON codec adapted to the Sequoia API type extensions.
//!
//! Sequoia payloads are plain JSON extended with two scalar conventions:
//! date-times serialized as UTC ISO-8601 with millisecond precision and a
//! literal `Z` suffix, and durations serialized in ISO-8601 duration format
//! (e.g., `P1DT1H`). This module provides [`Value`], a JSON value with typed
//! [`Value::DateTime`] and [`Value::Duration`] leaves, along with the encoder
//! (the [`serde::Serialize`] impl) and the heuristic decoder
//! ([`Value::decode`]).
//!
//! # Decoding heuristic
//!
//! [`Value::decode`] walks the parsed JSON tree and, for every string leaf,
//! tries a date-time parse, then a duration parse, keeping the original string
//! when both fail. Strings that happen to parse but are not semantically
//! date-times or durations are silently converted. This mirrors the wire
//! convention and is pinned by tests; use [`Value::from_json`] when the
//! structural conversion without the heuristic is wanted.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::ser::{Serialize, Serializer};

/// An ISO-8601 duration, kept in its calendar components.
///
/// Components are not normalized against each other (a year is not 365 days),
/// so a parsed duration formats back to the same text. Weeks are accepted on
/// parse and folded into days.
///
/// # Example
///
/// ```rust
/// use sequoia::Duration;
///
/// let duration = Duration::parse("P1DT1H").unwrap();
/// assert_eq!(duration.days, 1);
/// assert_eq!(duration.hours, 1);
/// assert_eq!(duration.to_string(), "P1DT1H");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Duration {
    /// Whether the duration is negative (leading `-`).
    pub negative: bool,
    /// Number of years (`Y`).
    pub years: u64,
    /// Number of months (`M` before `T`).
    pub months: u64,
    /// Number of days (`D`), including folded weeks.
    pub days: u64,
    /// Number of hours (`H`).
    pub hours: u64,
    /// Number of minutes (`M` after `T`).
    pub minutes: u64,
    /// Number of seconds (`S`), possibly fractional.
    pub seconds: f64,
}

impl Duration {
    /// Parses an ISO-8601 duration string.
    ///
    /// Returns `None` if the text is not a duration. At least one component
    /// must be present; a fractional value is only accepted for seconds.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut rest = text;
        let negative = match rest.strip_prefix('-') {
            Some(stripped) => {
                rest = stripped;
                true
            }
            None => false,
        };
        rest = rest.strip_prefix('P')?;

        let mut duration = Self {
            negative,
            ..Self::default()
        };
        let mut in_time = false;
        let mut seen_component = false;

        while !rest.is_empty() {
            if !in_time {
                if let Some(stripped) = rest.strip_prefix('T') {
                    if stripped.is_empty() {
                        return None;
                    }
                    in_time = true;
                    rest = stripped;
                    continue;
                }
            }

            let split = rest.find(|c: char| !c.is_ascii_digit() && c != '.')?;
            let (number, remainder) = rest.split_at(split);
            if number.is_empty() {
                return None;
            }
            let designator = remainder.chars().next()?;
            rest = &remainder[designator.len_utf8()..];

            match (in_time, designator) {
                (false, 'Y') => duration.years = number.parse().ok()?,
                (false, 'M') => duration.months = number.parse().ok()?,
                (false, 'W') => duration.days += number.parse::<u64>().ok()? * 7,
                (false, 'D') => duration.days += number.parse::<u64>().ok()?,
                (true, 'H') => duration.hours = number.parse().ok()?,
                (true, 'M') => duration.minutes = number.parse().ok()?,
                (true, 'S') => duration.seconds = number.parse().ok()?,
                _ => return None,
            }
            seen_component = true;
        }

        seen_component.then_some(duration)
    }

    /// Returns `true` if all components are zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds == 0.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "PT0S");
        }
        if self.negative {
            write!(f, "-")?;
        }
        write!(f, "P")?;
        if self.years > 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months > 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days > 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours > 0 || self.minutes > 0 || self.seconds > 0.0 {
            write!(f, "T")?;
            if self.hours > 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes > 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if self.seconds > 0.0 {
                if self.seconds.fract() == 0.0 {
                    // Avoid the float "1" vs "1.0" ambiguity for whole seconds.
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let whole = self.seconds as u64;
                    write!(f, "{whole}S")?;
                } else {
                    write!(f, "{}S", self.seconds)?;
                }
            }
        }
        Ok(())
    }
}

/// Formats a date-time the way Sequoia expects it on the wire: UTC ISO-8601
/// with millisecond precision and a literal `Z` suffix.
#[must_use]
pub fn format_datetime(datetime: &DateTime<Utc>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a date-time accepting RFC 3339 text or a naive ISO-8601 date-time,
/// which is treated as UTC.
#[must_use]
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// A JSON value extended with typed date-time and duration leaves.
///
/// This is the payload type flowing through the client: request bodies are
/// `Value`s encoded through the [`Serialize`] impl, response bodies are
/// `Value`s produced by [`Value::decode`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number.
    Number(serde_json::Number),
    /// JSON string that is neither a date-time nor a duration.
    String(String),
    /// An ISO-8601 date-time scalar.
    DateTime(DateTime<Utc>),
    /// An ISO-8601 duration scalar.
    Duration(Duration),
    /// JSON array.
    Array(Vec<Value>),
    /// JSON object, with keys in sorted order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Decodes a parsed JSON tree, applying the date-time/duration heuristic
    /// to every string leaf.
    #[must_use]
    pub fn decode(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => Self::decode_scalar(text),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::decode).collect())
            }
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Self::decode(item)))
                    .collect(),
            ),
            other => Self::from_json(other),
        }
    }

    fn decode_scalar(text: String) -> Self {
        if let Some(datetime) = parse_datetime(&text) {
            return Self::DateTime(datetime);
        }
        if let Some(duration) = Duration::parse(&text) {
            return Self::Duration(duration);
        }
        Self::String(text)
    }

    /// Converts a `serde_json::Value` structurally, without the decoding
    /// heuristic. Strings stay strings.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(value) => Self::Bool(value),
            serde_json::Value::Number(number) => Self::Number(number),
            serde_json::Value::String(text) => Self::String(text),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(entries) => Self::Object(
                entries
                    .into_iter()
                    .map(|(key, item)| (key, Self::from_json(item)))
                    .collect(),
            ),
        }
    }

    /// Encodes this value to a plain `serde_json::Value`, rendering date-times
    /// and durations as their wire strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(value) => serde_json::Value::Bool(*value),
            Self::Number(number) => serde_json::Value::Number(number.clone()),
            Self::String(text) => serde_json::Value::String(text.clone()),
            Self::DateTime(datetime) => serde_json::Value::String(format_datetime(datetime)),
            Self::Duration(duration) => serde_json::Value::String(duration.to_string()),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, item)| (key.clone(), item.to_json()))
                    .collect(),
            ),
        }
    }

    /// Returns the value under `key` if this is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Returns the string content if this is a plain string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the items if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is an object.
    #[must_use]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Number(number) => number.serialize(serializer),
            Self::String(text) => serializer.serialize_str(text),
            Self::DateTime(datetime) => serializer.serialize_str(&format_datetime(datetime)),
            Self::Duration(duration) => serializer.collect_str(duration),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Object(entries) => serializer.collect_map(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_datetime_encodes_with_millisecond_z_suffix() {
        let datetime = Utc.with_ymd_and_hms(2020, 3, 2, 14, 0, 0).unwrap();
        assert_eq!(format_datetime(&datetime), "2020-03-02T14:00:00.000Z");
    }

    #[test]
    fn test_datetime_round_trip() {
        let datetime = Utc.with_ymd_and_hms(2020, 3, 2, 14, 0, 0).unwrap()
            + chrono::Duration::milliseconds(123);
        let encoded = format_datetime(&datetime);
        assert_eq!(parse_datetime(&encoded), Some(datetime));
    }

    #[test]
    fn test_offset_datetimes_are_normalized_to_utc() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let datetime = offset.with_ymd_and_hms(2020, 3, 2, 16, 0, 0).unwrap();
        let encoded = format_datetime(&datetime.with_timezone(&Utc));
        assert_eq!(encoded, "2020-03-02T14:00:00.000Z");
    }

    #[test]
    fn test_naive_datetime_parses_as_utc() {
        let parsed = parse_datetime("2020-03-02T14:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2020, 3, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_parse_and_format() {
        let duration = Duration::parse("P1DT1H").unwrap();
        assert_eq!(duration.days, 1);
        assert_eq!(duration.hours, 1);
        assert_eq!(duration.to_string(), "P1DT1H");
    }

    #[test]
    fn test_duration_round_trips() {
        for text in ["P1DT1H", "P2Y3M4D", "PT15M", "PT1.5S", "P1DT2H3M4S"] {
            let duration = Duration::parse(text).unwrap();
            assert_eq!(duration.to_string(), text, "round trip of {text}");
        }
    }

    #[test]
    fn test_duration_weeks_fold_into_days() {
        let duration = Duration::parse("P2W").unwrap();
        assert_eq!(duration.days, 14);
        assert_eq!(duration.to_string(), "P14D");
    }

    #[test]
    fn test_zero_duration_formats_as_pt0s() {
        assert_eq!(Duration::default().to_string(), "PT0S");
        assert_eq!(Duration::parse("PT0S").unwrap().to_string(), "PT0S");
    }

    #[test]
    fn test_negative_duration() {
        let duration = Duration::parse("-P1D").unwrap();
        assert!(duration.negative);
        assert_eq!(duration.to_string(), "-P1D");
    }

    #[test]
    fn test_duration_rejects_non_durations() {
        for text in ["", "P", "PT", "1D", "Price", "P1X", "PT1Y", "bar"] {
            assert!(Duration::parse(text).is_none(), "{text} should not parse");
        }
    }

    #[test]
    fn test_decode_converts_datetime_strings() {
        let decoded = Value::decode(json!({"createdAt": "2020-03-02T14:00:00.000Z"}));
        let expected = Value::DateTime(Utc.with_ymd_and_hms(2020, 3, 2, 14, 0, 0).unwrap());
        assert_eq!(decoded.get("createdAt"), Some(&expected));
    }

    #[test]
    fn test_decode_converts_duration_strings() {
        let decoded = Value::decode(json!("P1DT1H"));
        assert_eq!(decoded, Value::Duration(Duration::parse("P1DT1H").unwrap()));
    }

    #[test]
    fn test_decode_leaves_other_scalars_unchanged() {
        assert_eq!(Value::decode(json!(false)), Value::Bool(false));
        assert_eq!(Value::decode(json!("bar")), Value::String("bar".into()));
        assert_eq!(Value::decode(json!(42)), Value::Number(42.into()));
        assert_eq!(Value::decode(json!(null)), Value::Null);
    }

    #[test]
    fn test_decode_recurses_into_arrays_and_objects() {
        let decoded = Value::decode(json!({
            "items": [{"at": "2020-03-02T14:00:00.000Z"}, "bar"]
        }));
        let items = decoded.get("items").and_then(Value::as_array).unwrap();
        assert!(matches!(items[0].get("at"), Some(Value::DateTime(_))));
        assert_eq!(items[1], Value::String("bar".into()));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let datetime = Utc.with_ymd_and_hms(2020, 3, 2, 14, 0, 0).unwrap();
        let mut entries = BTreeMap::new();
        entries.insert("at".to_string(), Value::DateTime(datetime));
        entries.insert(
            "every".to_string(),
            Value::Duration(Duration::parse("P1DT1H").unwrap()),
        );
        let value = Value::Object(entries);

        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(
            encoded,
            json!({"at": "2020-03-02T14:00:00.000Z", "every": "P1DT1H"})
        );
        assert_eq!(Value::decode(encoded), value);
    }

    #[test]
    fn test_to_json_matches_serialize() {
        let value = Value::decode(json!({"at": "2020-03-02T14:00:00.000Z", "n": 1}));
        assert_eq!(value.to_json(), serde_json::to_value(&value).unwrap());
    }

    #[test]
    fn test_from_json_keeps_strings_structural() {
        let value = Value::from_json(json!({"at": "2020-03-02T14:00:00.000Z"}));
        assert_eq!(
            value.get("at"),
            Some(&Value::String("2020-03-02T14:00:00.000Z".into()))
        );
    }
}
