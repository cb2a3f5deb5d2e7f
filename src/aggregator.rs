// File: ./src/aggregator.rs
//! Collects today's events from every configured calendar feed into one `Schedule`.
//!
//! Sources are independent: a feed that cannot be downloaded or parsed is logged
//! and contributes nothing, it never aborts the run.
use crate::client::FeedClient;
use crate::config::{CalendarSource, Config, TextConfig};
use crate::model::adapter::parse_feed;
use crate::model::event::{NormalizedEvent, RawOccurrence, Schedule};
use crate::model::recurrence::occurrences_on;
use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::time::Duration;

/// Fetch, expand and normalize every source for `today` in `tz`.
pub async fn get_todays_events(
    client: &FeedClient,
    config: &Config,
    tz: &Tz,
    today: NaiveDate,
) -> Schedule {
    log::debug!("Fetching events for date: {} ({} time)", today, tz.name());
    let timeout = Duration::from_secs(config.behavior.fetch_timeout_secs);

    let mut all_events = Vec::new();
    for source in &config.calendars {
        log::debug!("Processing calendar: {}", source.name);
        match events_for_source(client, source, &config.text, tz, today, timeout).await {
            Ok(events) => {
                log::debug!("Calendar '{}' has {} events today", source.name, events.len());
                all_events.extend(events);
            }
            Err(e) => {
                log::warn!("Error fetching calendar '{}': {:#}", source.name, e);
            }
        }
    }

    if all_events.is_empty() {
        log::warn!("No events found for today");
        return Schedule::empty();
    }

    log::info!("Processing {} total events from all calendars", all_events.len());
    let schedule = Schedule::from_events(all_events);
    for event in &schedule {
        log::debug!(
            "  {} | {} | {}",
            event.time_display,
            event.calendar,
            event.title
        );
    }
    schedule
}

async fn events_for_source(
    client: &FeedClient,
    source: &CalendarSource,
    text: &TextConfig,
    tz: &Tz,
    today: NaiveDate,
    timeout: Duration,
) -> Result<Vec<NormalizedEvent>> {
    log::debug!("Downloading calendar data from: {}", source.url);
    let body = client.fetch(&source.url, timeout).await?;

    let feed_events = parse_feed(&body).map_err(|e| anyhow::anyhow!(e))?;
    log::debug!(
        "Successfully parsed calendar '{}' ({} VEVENTs)",
        source.name,
        feed_events.len()
    );

    let occurrences = occurrences_on(&feed_events, today, tz);
    Ok(normalize_occurrences(source, &occurrences, tz, text))
}

/// Resolve a source's occurrences into normalized rows (unsorted).
pub fn normalize_occurrences(
    source: &CalendarSource,
    occurrences: &[RawOccurrence],
    tz: &Tz,
    text: &TextConfig,
) -> Vec<NormalizedEvent> {
    occurrences
        .iter()
        .map(|occ| {
            NormalizedEvent::from_occurrence(
                source,
                occ,
                tz,
                &text.title_prefixes,
                text.max_title_length,
            )
        })
        .collect()
}
