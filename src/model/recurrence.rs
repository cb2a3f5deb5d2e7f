// File: ./src/model/recurrence.rs
use crate::model::adapter::FeedEvent;
use crate::model::event::{EventTime, RawOccurrence, localize, parse_tzid};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use std::collections::HashSet;
use std::str::FromStr;

/// Upper bound on instances pulled from one rule inside the search window.
const MAX_INSTANCES: u16 = 500;

/// Half-open civil day `[00:00, next 00:00)` in `tz`.
#[derive(Debug, Clone, Copy)]
pub struct DayWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DayWindow {
    pub fn new(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            start: localize(tz, date.and_time(NaiveTime::MIN)),
            end: localize(tz, next.and_time(NaiveTime::MIN)),
        }
    }

    /// Zero-length events count when they start inside the day.
    pub fn overlaps(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> bool {
        if end <= start {
            start >= self.start && start < self.end
        } else {
            start < self.end && end > self.start
        }
    }
}

/// All occurrences of `events` active during `date` in `tz`.
///
/// Recurring masters are expanded; instances replaced by a RECURRENCE-ID override
/// of the same UID are dropped, and the override is judged on its own times.
pub fn occurrences_on(events: &[FeedEvent], date: NaiveDate, tz: &Tz) -> Vec<RawOccurrence> {
    let window = DayWindow::new(date, tz);

    let overridden: HashSet<(String, DateTime<Utc>)> = events
        .iter()
        .filter_map(|e| {
            let uid = e.uid.clone()?;
            let rid = e.recurrence_id.as_ref()?;
            Some((uid, rid.resolve(tz).with_timezone(&Utc)))
        })
        .collect();

    let mut occurrences = Vec::new();
    for event in events {
        if event.rrule.is_some() && event.recurrence_id.is_none() {
            match expand_recurring(event, &window, tz) {
                Ok(instances) => {
                    for (start, end) in instances {
                        if let Some(uid) = &event.uid
                            && overridden
                                .contains(&(uid.clone(), start.resolve(tz).with_timezone(&Utc)))
                        {
                            continue;
                        }
                        occurrences.push(RawOccurrence {
                            title: event.summary.clone(),
                            start,
                            end,
                        });
                    }
                }
                Err(e) => log::warn!("Skipping recurring event '{}': {}", event.summary, e),
            }
            continue;
        }

        let end = event.end_or_derived(tz);
        if window.overlaps(event.start.resolve(tz), end.resolve(tz)) {
            occurrences.push(RawOccurrence {
                title: event.summary.clone(),
                start: event.start.clone(),
                end,
            });
        }
    }
    occurrences
}

/// Expand one master into `(start, end)` pairs overlapping `window`, keeping
/// the master's kind of time.
fn expand_recurring(
    master: &FeedEvent,
    window: &DayWindow,
    tz: &Tz,
) -> Result<Vec<(EventTime, EventTime)>, String> {
    let rule = master.rrule.as_deref().unwrap_or_default();
    let start = canonical_start(&master.start);
    let span = master.span(tz);

    let rrule_string = build_rrule_string(&start, rule, &master.exdates);
    let rrule_set = RRuleSet::from_str(&rrule_string)
        .map_err(|e| format!("invalid recurrence rule '{}': {}", rule, e))?;

    // Floating and date masters are expanded on a UTC wall clock, so pad the window
    // by a day on each side and filter precisely after resolving.
    let utc_tz = rrule::Tz::UTC;
    let after = (window.start.with_timezone(&Utc) - span - Duration::days(1)).with_timezone(&utc_tz);
    let before = (window.end.with_timezone(&Utc) + Duration::days(1)).with_timezone(&utc_tz);

    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);
    if result.limited {
        log::debug!(
            "Recurrence for '{}' hit the {} instance cap",
            master.summary,
            MAX_INSTANCES
        );
    }

    let mut instances = Vec::new();
    for occ in &result.dates {
        let occ_start = occurrence_to_event_time(occ, &start);
        let occ_end = occ_start.shifted(span);
        if window.overlaps(occ_start.resolve(tz), occ_end.resolve(tz)) {
            instances.push((occ_start, occ_end));
        }
    }
    Ok(instances)
}

/// Zoned starts with an unknown TZID cannot be expanded in their zone; treat them as floating.
/// Known TZIDs are rewritten to the plain IANA name the rrule parser expects.
fn canonical_start(start: &EventTime) -> EventTime {
    match start {
        EventTime::Zoned { datetime, tzid } => match parse_tzid(tzid) {
            Some(zone) => EventTime::Zoned {
                datetime: *datetime,
                tzid: zone.name().to_string(),
            },
            None => {
                log::warn!("Unknown TZID '{}' on recurring event, expanding as floating", tzid);
                EventTime::Floating(*datetime)
            }
        },
        other => other.clone(),
    }
}

/// Build an iCalendar-format DTSTART/RRULE/EXDATE block for the rrule crate parser.
fn build_rrule_string(start: &EventTime, rule: &str, exdates: &[EventTime]) -> String {
    let mut lines = Vec::new();

    // The rrule crate needs a datetime, so dates become midnight and floating
    // times are pinned to UTC.
    let dtstart = match start {
        EventTime::Date(d) => format!("DTSTART:{}T000000Z", d.format("%Y%m%d")),
        EventTime::Floating(dt) => format!("DTSTART:{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::Utc(dt) => format!("DTSTART:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::Zoned { datetime, tzid } => format!(
            "DTSTART;TZID={}:{}",
            tzid,
            datetime.format("%Y%m%dT%H%M%S")
        ),
    };
    lines.push(dtstart);

    let rule = rule.trim();
    let rule = if rule.to_uppercase().starts_with("RRULE:") {
        &rule[6..]
    } else {
        rule
    };
    lines.push(format!("RRULE:{}", normalize_until(rule)));

    let mut seen = HashSet::new();
    for exdate in exdates {
        let line = exdate_line(exdate, start);
        if seen.insert(line.clone()) {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// UNTIL must be a UTC datetime once DTSTART is a datetime. Date-only UNTIL
/// values become end-of-day; floating ones are pinned to UTC.
fn normalize_until(rule: &str) -> String {
    let mut rule = rule.to_string();
    if let Some(idx) = rule.find("UNTIL=") {
        let val_start = idx + 6;
        let val_end = rule[val_start..]
            .find(';')
            .map(|i| val_start + i)
            .unwrap_or(rule.len());
        let until = rule[val_start..val_end].to_string();

        let fixed = if until.len() == 8 && !until.contains('T') {
            format!("{}T235959Z", until)
        } else if !until.ends_with('Z') {
            format!("{}Z", until)
        } else {
            until
        };
        rule.replace_range(val_start..val_end, &fixed);
    }
    rule
}

/// EXDATE line expressed the same way as the master's DTSTART.
fn exdate_line(exdate: &EventTime, master_start: &EventTime) -> String {
    match (exdate, master_start) {
        (EventTime::Date(d), _) => match master_start {
            EventTime::Zoned { datetime, tzid } => format!(
                "EXDATE;TZID={}:{}",
                tzid,
                d.and_time(datetime.time()).format("%Y%m%dT%H%M%S")
            ),
            EventTime::Floating(dt) => {
                format!("EXDATE:{}Z", d.and_time(dt.time()).format("%Y%m%dT%H%M%S"))
            }
            EventTime::Utc(dt) => {
                format!("EXDATE:{}Z", d.and_time(dt.time()).format("%Y%m%dT%H%M%S"))
            }
            EventTime::Date(_) => format!("EXDATE:{}T000000Z", d.format("%Y%m%d")),
        },
        (EventTime::Utc(dt), _) => format!("EXDATE:{}", dt.format("%Y%m%dT%H%M%SZ")),
        (EventTime::Floating(dt), EventTime::Zoned { tzid, .. }) => {
            format!("EXDATE;TZID={}:{}", tzid, dt.format("%Y%m%dT%H%M%S"))
        }
        (EventTime::Floating(dt), _) => format!("EXDATE:{}Z", dt.format("%Y%m%dT%H%M%S")),
        (EventTime::Zoned { datetime, tzid }, _) => match parse_tzid(tzid) {
            Some(zone) => format!(
                "EXDATE;TZID={}:{}",
                zone.name(),
                datetime.format("%Y%m%dT%H%M%S")
            ),
            // Unknown zones are floating, like the master they cancel.
            None => match master_start {
                EventTime::Zoned { tzid: master_tzid, .. } => format!(
                    "EXDATE;TZID={}:{}",
                    master_tzid,
                    datetime.format("%Y%m%dT%H%M%S")
                ),
                _ => format!("EXDATE:{}Z", datetime.format("%Y%m%dT%H%M%S")),
            },
        },
    }
}

/// Convert an rrule occurrence back to an EventTime matching the master's variant.
fn occurrence_to_event_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.naive_utc().date()),
        EventTime::Floating(_) => EventTime::Floating(dt.naive_utc()),
        EventTime::Utc(_) => EventTime::Utc(dt.with_timezone(&Utc)),
        EventTime::Zoned { tzid, .. } => EventTime::Zoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}
