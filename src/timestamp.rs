//! Instant normalization and human formatting.
//!
//! Stored records carry their instants in one of two shapes: an ISO-8601
//! string, or a storage-native object with `seconds`/`nanoseconds` fields
//! (also accepted with leading underscores). Everything is normalized to
//! `DateTime<Utc>` before comparison or arithmetic. Nothing here fails:
//! unreadable input becomes an absent instant.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::PLACEHOLDER;

pub const NEVER: &str = "Never";

/// Instant as it arrives on the wire, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Iso(String),
    Native {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

pub trait ToInstant {
    fn to_instant(&self) -> Option<DateTime<Utc>>;
}

impl ToInstant for DateTime<Utc> {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl ToInstant for RawTimestamp {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Iso(value) => parse_instant(value),
            RawTimestamp::Native {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(*seconds, *nanoseconds),
        }
    }
}

impl ToInstant for str {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(self)
    }
}

impl ToInstant for String {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        parse_instant(self)
    }
}

impl<T: ToInstant> ToInstant for Option<T> {
    fn to_instant(&self) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(ToInstant::to_instant)
    }
}

/// Parses RFC 3339, offset-less date-times (read as UTC) and bare dates
/// (UTC midnight).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for optional instants that accepts either wire shape and
/// degrades anything else to `None`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Raw(RawTimestamp),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Raw(raw)) => raw.to_instant(),
        Some(Lenient::Other(_)) | None => None,
    })
}

pub fn time_ago<T: ToInstant + ?Sized>(value: &T) -> String {
    time_ago_at(value, Utc::now())
}

/// Relative age of `value` as seen from `now`.
pub fn time_ago_at<T: ToInstant + ?Sized>(value: &T, now: DateTime<Utc>) -> String {
    let Some(instant) = value.to_instant() else {
        return NEVER.to_string();
    };

    let diff_sec = (now - instant).num_milliseconds().div_euclid(1000);
    let diff_min = diff_sec.div_euclid(60);
    let diff_hr = diff_min.div_euclid(60);
    let diff_day = diff_hr.div_euclid(24);

    if diff_sec < 30 {
        "Just now".to_string()
    } else if diff_sec < 60 {
        format!("{diff_sec}s ago")
    } else if diff_min < 60 {
        format!("{diff_min}m ago")
    } else if diff_hr < 24 {
        format!("{diff_hr}h ago")
    } else if diff_day < 7 {
        format!("{diff_day}d ago")
    } else {
        short_date(instant)
    }
}

/// Day, abbreviated month and year, e.g. `5 Mar 2026`.
pub fn short_date(instant: DateTime<Utc>) -> String {
    instant.format("%-d %b %Y").to_string()
}

/// Fixed day/month/year + hour:minute rendering in UTC, e.g.
/// `05 Mar 2026, 14:07`.
pub fn format_timestamp<T: ToInstant + ?Sized>(value: &T) -> String {
    match value.to_instant() {
        Some(instant) => instant.format("%d %b %Y, %H:%M").to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_time_follows_thresholds() {
        let now = now();
        assert_eq!(time_ago_at(&(now - Duration::seconds(10)), now), "Just now");
        assert_eq!(time_ago_at(&(now - Duration::seconds(45)), now), "45s ago");
        assert_eq!(time_ago_at(&(now - Duration::seconds(90)), now), "1m ago");
        assert_eq!(time_ago_at(&(now - Duration::minutes(59)), now), "59m ago");
        assert_eq!(time_ago_at(&(now - Duration::hours(5)), now), "5h ago");
        assert_eq!(time_ago_at(&(now - Duration::hours(25)), now), "1d ago");
        assert_eq!(time_ago_at(&(now - Duration::days(10)), now), "4 Mar 2026");
    }

    #[test]
    fn future_instants_read_as_just_now() {
        let now = now();
        assert_eq!(time_ago_at(&(now + Duration::minutes(3)), now), "Just now");
    }

    #[test]
    fn missing_or_garbage_reads_as_never() {
        assert_eq!(time_ago_at(&None::<DateTime<Utc>>, now()), "Never");
        assert_eq!(time_ago_at("not a date", now()), "Never");
        assert_eq!(time_ago_at("", now()), "Never");
    }

    #[test]
    fn both_wire_shapes_normalize_to_the_same_instant() {
        let iso = RawTimestamp::Iso("2026-03-14T11:00:00.000Z".to_string());
        let native = RawTimestamp::Native {
            seconds: now().timestamp() - 3600,
            nanoseconds: 0,
        };
        assert_eq!(iso.to_instant(), native.to_instant());
        assert_eq!(time_ago_at(&iso, now()), "1h ago");
    }

    #[test]
    fn lenient_deserialization_accepts_underscored_native_objects() {
        #[derive(Deserialize)]
        struct Doc {
            #[serde(default, deserialize_with = "deserialize_lenient")]
            at: Option<DateTime<Utc>>,
        }

        let doc: Doc =
            serde_json::from_str(r#"{"at": {"_seconds": 1773489600, "_nanoseconds": 0}}"#).unwrap();
        assert_eq!(doc.at, Some(now()));

        let doc: Doc = serde_json::from_str(r#"{"at": 42}"#).unwrap();
        assert_eq!(doc.at, None);

        let doc: Doc = serde_json::from_str(r#"{"at": "yesterday"}"#).unwrap();
        assert_eq!(doc.at, None);

        let doc: Doc = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(doc.at, None);
    }

    #[test]
    fn offsetless_and_date_only_strings_are_utc() {
        assert_eq!(parse_instant("2026-03-14T12:00:00"), Some(now()));
        assert_eq!(
            parse_instant("2026-03-14"),
            Some(Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn absolute_format_is_fixed() {
        let at = Utc.with_ymd_and_hms(2026, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(format_timestamp(&at), "05 Mar 2026, 14:07");
        assert_eq!(format_timestamp(&None::<DateTime<Utc>>), "—");
    }
}
