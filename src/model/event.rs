// File: ./src/model/event.rs
//! Event records: raw occurrences as read from a feed, and the normalized,
//! zone-resolved rows the renderer consumes.
use crate::config::CalendarSource;
use crate::model::windows_zones;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::cmp::Ordering;

/// Formatted time of a midnight boundary; both ends equal to it marks a whole-day event.
pub const MIDNIGHT_MARKER: &str = "00:00";

/// A DTSTART/DTEND value, keeping the kind of time the feed used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// Bare calendar date (VALUE=DATE).
    Date(NaiveDate),
    /// Wall-clock time without zone information.
    Floating(NaiveDateTime),
    Utc(DateTime<Utc>),
    /// Wall-clock time in the zone named by a TZID parameter.
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve into `tz`. Dates become local midnight, floating times are taken
    /// as already expressed in `tz`.
    pub fn resolve(&self, tz: &Tz) -> DateTime<Tz> {
        match self {
            EventTime::Date(d) => localize(tz, d.and_time(chrono::NaiveTime::MIN)),
            EventTime::Floating(dt) => localize(tz, *dt),
            EventTime::Utc(dt) => dt.with_timezone(tz),
            EventTime::Zoned { datetime, tzid } => match parse_tzid(tzid) {
                Some(source_tz) => localize(&source_tz, *datetime).with_timezone(tz),
                None => {
                    log::warn!(
                        "Unknown TZID '{}', treating {} as {} time",
                        tzid,
                        datetime,
                        tz.name()
                    );
                    localize(tz, *datetime)
                }
            },
        }
    }

    /// Shift by `delta`, keeping the variant. Dates move by whole days.
    pub fn shifted(&self, delta: Duration) -> EventTime {
        match self {
            EventTime::Date(d) => EventTime::Date(*d + Duration::days(delta.num_days())),
            EventTime::Floating(dt) => EventTime::Floating(*dt + delta),
            EventTime::Utc(dt) => EventTime::Utc(*dt + delta),
            EventTime::Zoned { datetime, tzid } => EventTime::Zoned {
                datetime: *datetime + delta,
                tzid: tzid.clone(),
            },
        }
    }
}

/// Attach `tz` to a wall-clock time. Ambiguous times take the earlier instant;
/// times inside a DST gap are pushed forward by an hour.
pub fn localize(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            tz.from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// TZIDs are usually IANA names, sometimes prefixed with a vendor path
/// ("/mozilla.org/20050126_1/Europe/Berlin") or quoted. Outlook writes
/// Windows names ("W. Europe Standard Time").
pub fn parse_tzid(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim().trim_matches('"');
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }
    let parts: Vec<&str> = tzid.rsplitn(3, '/').collect();
    if parts.len() >= 2 {
        let candidate = format!("{}/{}", parts[1], parts[0]);
        if let Ok(tz) = candidate.parse::<Tz>() {
            return Some(tz);
        }
    }
    windows_zones::lookup(tzid)
}

/// One occurrence active on the target date, as expanded from a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOccurrence {
    pub title: String,
    pub start: EventTime,
    pub end: EventTime,
}

/// Canonical event row. All instants are in the configured zone.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub calendar: String,
    pub text_color: String,
    pub title: String,
    pub start_time: DateTime<Tz>,
    pub end_time: DateTime<Tz>,
    pub start_str: String,
    pub end_str: String,
    pub time_display: String,
    pub is_all_day: bool,
}

impl NormalizedEvent {
    pub fn from_occurrence(
        source: &CalendarSource,
        occurrence: &RawOccurrence,
        tz: &Tz,
        title_prefixes: &[String],
        max_title_length: usize,
    ) -> Self {
        let start_time = occurrence.start.resolve(tz);
        let end_time = occurrence.end.resolve(tz);
        let start_str = start_time.format("%H:%M").to_string();
        let end_str = end_time.format("%H:%M").to_string();
        let time_display = format!("{}-{}", start_str, end_str);
        let is_all_day = start_str == MIDNIGHT_MARKER && end_str == MIDNIGHT_MARKER;

        let title = truncate_title(
            clean_title(&occurrence.title, title_prefixes),
            max_title_length,
        );

        Self {
            calendar: source.name.clone(),
            text_color: source.text_color.clone(),
            title,
            start_time,
            end_time,
            start_str,
            end_str,
            time_display,
            is_all_day,
        }
    }

    /// Canonical order: start instant, then calendar name, then title.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.start_time
            .cmp(&other.start_time)
            .then_with(|| self.calendar.cmp(&other.calendar))
            .then_with(|| self.title.cmp(&other.title))
    }
}

/// Strip known leading markers, each at most once, in the configured order.
pub fn clean_title<'a>(title: &'a str, prefixes: &[String]) -> &'a str {
    let mut cleaned = title;
    for prefix in prefixes {
        if let Some(rest) = cleaned.strip_prefix(prefix.as_str()) {
            cleaned = rest;
        }
    }
    cleaned
}

/// Cap `title` at `max_len` characters, the last three being "...".
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if title.chars().count() <= max_len {
        return title.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = title.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Today's events in canonical order. Empty is a valid schedule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    events: Vec<NormalizedEvent>,
}

impl Schedule {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sorts into canonical order. The sort is stable, so identical keys keep input order.
    pub fn from_events(mut events: Vec<NormalizedEvent>) -> Self {
        events.sort_by(|a, b| a.canonical_cmp(b));
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[NormalizedEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedEvent> {
        self.events.iter()
    }

    /// Whole-day events in schedule order, then timed events by start instant.
    pub fn partition(&self) -> (Vec<&NormalizedEvent>, Vec<&NormalizedEvent>) {
        let (all_day, mut timed): (Vec<_>, Vec<_>) =
            self.events.iter().partition(|e| e.is_all_day);
        timed.sort_by_key(|e| e.start_time);
        (all_day, timed)
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a NormalizedEvent;
    type IntoIter = std::slice::Iter<'a, NormalizedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["S: ".to_string(), "D: ".to_string()]
    }

    #[test]
    fn test_clean_title_exact_prefix_only() {
        assert_eq!(clean_title("S: Team Sync", &prefixes()), "Team Sync");
        assert_eq!(clean_title("D: Dentist", &prefixes()), "Dentist");
        assert_eq!(clean_title("S: D: Both", &prefixes()), "Both");
        // Not at the start, or without the space: untouched.
        assert_eq!(clean_title("Re S: thing", &prefixes()), "Re S: thing");
        assert_eq!(clean_title("S:Tight", &prefixes()), "S:Tight");
        assert_eq!(clean_title("  S: Padded", &prefixes()), "  S: Padded");
    }

    #[test]
    fn test_truncate_title_hits_max_exactly() {
        let long = "Very Long Event Title That Should Be Truncated";
        let t = truncate_title(long, 20);
        assert_eq!(t.chars().count(), 20);
        assert!(t.ends_with("..."));
        assert_eq!(t, "Very Long Event T...");
        assert_eq!(truncate_title("Short", 20), "Short");
        assert_eq!(truncate_title(&t, 20), t);
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let t = truncate_title("Café déjeuner très long", 10);
        assert_eq!(t, "Café dé...");
    }

    #[test]
    fn test_date_resolves_to_local_midnight() {
        let tz: Tz = "Australia/Brisbane".parse().unwrap();
        let d = NaiveDate::from_ymd_opt(2025, 9, 27).unwrap();
        let resolved = EventTime::Date(d).resolve(&tz);
        assert_eq!(resolved.format("%Y-%m-%d %H:%M").to_string(), "2025-09-27 00:00");
    }

    #[test]
    fn test_zoned_time_converts_into_configured_zone() {
        let tz: Tz = "Australia/Brisbane".parse().unwrap();
        let naive = NaiveDate::from_ymd_opt(2025, 9, 26)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        let t = EventTime::Zoned {
            datetime: naive,
            tzid: "America/New_York".to_string(),
        };
        // 15:00 EDT == 19:00 UTC == 05:00 AEST next day
        assert_eq!(t.resolve(&tz).format("%d %H:%M").to_string(), "27 05:00");
    }

    #[test]
    fn test_vendor_prefixed_tzid() {
        assert_eq!(
            parse_tzid("/mozilla.org/20050126_1/Europe/Berlin"),
            Some(chrono_tz::Europe::Berlin)
        );
        assert_eq!(parse_tzid("\"Europe/Paris\""), Some(chrono_tz::Europe::Paris));
        assert_eq!(parse_tzid("Atlantis/Capital"), None);
    }

    #[test]
    fn test_windows_tzid_converts_into_configured_zone() {
        assert_eq!(
            parse_tzid("W. Europe Standard Time"),
            Some(chrono_tz::Europe::Berlin)
        );
        let tz: Tz = "Australia/Brisbane".parse().unwrap();
        let t = EventTime::Zoned {
            datetime: NaiveDate::from_ymd_opt(2025, 9, 26)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            tzid: "Eastern Standard Time".to_string(),
        };
        // 09:00 EDT == 13:00 UTC == 23:00 AEST
        assert_eq!(t.resolve(&tz).format("%d %H:%M").to_string(), "26 23:00");
    }
}
