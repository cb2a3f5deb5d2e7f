// File: src/model/adapter.rs
//! Reads VEVENTs out of an iCalendar document into `FeedEvent`s.
use crate::model::event::EventTime;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use icalendar::DatePerhapsTime;
use icalendar::parser::{Component, Property, read_calendar, unfold};

/// A VEVENT as written in the feed, before recurrence expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub start: EventTime,
    pub end: Option<EventTime>,
    pub duration: Option<Duration>,
    pub rrule: Option<String>,
    pub exdates: Vec<EventTime>,
    pub recurrence_id: Option<EventTime>,
}

impl FeedEvent {
    /// Length of one occurrence. Missing DTEND/DURATION means one day for dates,
    /// zero for timed events.
    pub fn span(&self, tz: &chrono_tz::Tz) -> Duration {
        match (&self.start, &self.end, self.duration) {
            (EventTime::Date(start), Some(EventTime::Date(end)), _) => *end - *start,
            (start, Some(end), _) => end.resolve(tz) - start.resolve(tz),
            (_, None, Some(d)) => d,
            (EventTime::Date(_), None, None) => Duration::days(1),
            (_, None, None) => Duration::zero(),
        }
    }

    /// DTEND as written, or DTSTART plus the span.
    pub fn end_or_derived(&self, tz: &chrono_tz::Tz) -> EventTime {
        match &self.end {
            Some(end) => end.clone(),
            None => self.start.shifted(self.span(tz)),
        }
    }
}

/// Parse every VEVENT in `ics`. Events without a usable DTSTART are skipped;
/// a document that is not an iCalendar at all is an error.
pub fn parse_feed(ics: &str) -> Result<Vec<FeedEvent>, String> {
    if !ics.contains("BEGIN:VCALENDAR") {
        return Err("Not an iCalendar document (no BEGIN:VCALENDAR)".to_string());
    }

    let unfolded = unfold(ics);
    let calendar = read_calendar(&unfolded)?;

    let mut vevents: Vec<&Component> = Vec::new();
    for component in &calendar.components {
        if component.name == "VEVENT" {
            vevents.push(component);
        } else if component.name == "VCALENDAR" {
            vevents.extend(component.components.iter().filter(|c| c.name == "VEVENT"));
        }
    }

    let mut events = Vec::with_capacity(vevents.len());
    for vevent in vevents {
        match parse_vevent(vevent) {
            Some(event) => events.push(event),
            None => log::debug!("Skipping VEVENT without a usable DTSTART"),
        }
    }
    Ok(events)
}

fn parse_vevent(vevent: &Component) -> Option<FeedEvent> {
    let start = to_event_time(DatePerhapsTime::try_from(vevent.find_prop("DTSTART")?).ok()?);

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    let duration = vevent
        .find_prop("DURATION")
        .and_then(|p| parse_duration(p.val.as_ref()));

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "No Title".to_string());

    let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());

    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    Some(FeedEvent {
        uid,
        summary,
        start,
        end,
        duration,
        rrule,
        exdates,
        recurrence_id,
    })
}

fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::Utc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::Floating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => EventTime::Zoned {
                datetime: date_time,
                tzid,
            },
        },
    }
}

/// EXDATE may carry TZID or VALUE=DATE and a comma-separated list of values.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    let val: &str = prop.val.as_ref();
    val.split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date || s.len() == 8 {
                NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(stripped) = s.strip_suffix('Z') {
                NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::Utc(dt.and_utc()))
            } else if let Some(ref tz) = tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::Zoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::Floating)
            }
        })
        .collect()
}

/// RFC 5545 DURATION: `[+-]P[nW][nD][T[nH][nM][nS]]`.
pub fn parse_duration(val: &str) -> Option<Duration> {
    let val = val.trim();
    let (negative, rest) = match val.as_bytes().first()? {
        b'-' => (true, &val[1..]),
        b'+' => (false, &val[1..]),
        _ => (false, val),
    };
    let rest = rest.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut num_buf = String::new();
    let mut in_time = false;
    let mut saw_unit = false;
    for c in rest.chars() {
        if c == 'T' {
            in_time = true;
            continue;
        }
        if c.is_ascii_digit() {
            num_buf.push(c);
            continue;
        }
        let n: i64 = num_buf.parse().ok()?;
        num_buf.clear();
        total += match (c, in_time) {
            ('W', false) => Duration::weeks(n),
            ('D', false) => Duration::days(n),
            ('H', true) => Duration::hours(n),
            ('M', true) => Duration::minutes(n),
            ('S', true) => Duration::seconds(n),
            _ => return None,
        };
        saw_unit = true;
    }
    if !num_buf.is_empty() || !saw_unit {
        return None;
    }
    Some(if negative { -total } else { total })
}

/// Undo TEXT escaping (`\,` `\;` `\n` `\\`). Newlines become spaces: titles render on one line.
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push(' '),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("PT30M"), Some(Duration::minutes(30)));
        assert_eq!(parse_duration("PT1H30M"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("P1D"), Some(Duration::days(1)));
        assert_eq!(parse_duration("P2W"), Some(Duration::weeks(2)));
        assert_eq!(parse_duration("P1DT2H"), Some(Duration::hours(26)));
        assert_eq!(parse_duration("-PT15M"), Some(Duration::minutes(-15)));
        assert_eq!(parse_duration("PT"), None);
        assert_eq!(parse_duration("30M"), None);
        assert_eq!(parse_duration("P1H"), None);
    }

    #[test]
    fn test_unescape_summary() {
        assert_eq!(unescape_text("Lunch\\, then talk\\; notes\\nmore"), "Lunch, then talk; notes more");
        assert_eq!(unescape_text("Back\\\\slash"), "Back\\slash");
    }

    #[test]
    fn test_parse_feed_reads_event_kinds() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:a\r\n\
SUMMARY:Holiday\r\n\
DTSTART;VALUE=DATE:20250927\r\n\
DTEND;VALUE=DATE:20250928\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:b\r\n\
SUMMARY:Call\r\n\
DTSTART;TZID=Europe/Berlin:20250927T090000\r\n\
DURATION:PT45M\r\n\
RRULE:FREQ=WEEKLY\r\n\
EXDATE;TZID=Europe/Berlin:20251004T090000,20251011T090000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:No start\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).expect("parse");
        assert_eq!(events.len(), 2);

        let holiday = &events[0];
        assert_eq!(holiday.summary, "Holiday");
        assert!(holiday.start.is_date());
        assert_eq!(holiday.span(&chrono_tz::UTC), Duration::days(1));

        let call = &events[1];
        assert_eq!(call.rrule.as_deref(), Some("FREQ=WEEKLY"));
        assert_eq!(call.duration, Some(Duration::minutes(45)));
        assert_eq!(call.exdates.len(), 2);
        assert!(matches!(call.start, EventTime::Zoned { ref tzid, .. } if tzid == "Europe/Berlin"));
    }

    #[test]
    fn test_parse_feed_rejects_non_calendar() {
        assert!(parse_feed("<html>502 Bad Gateway</html>").is_err());
        assert!(parse_feed("").is_err());
    }
}
