// File: ./src/render/layout.rs
//! Pure layout: which rows the panel shows, in which color, and where.
use crate::color_utils::{Rgb, parse_color_or_white};
use crate::config::Config;
use crate::model::event::{Schedule, truncate_title};
use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;

/// Base glyph height of the title font; `font_size` is expressed against it.
const BASE_FONT_PX: f32 = 20.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelRow {
    /// Empty for whole-day events.
    pub time_label: String,
    pub title: String,
    pub color: Rgb,
    pub is_past: bool,
}

/// `now` truncated to the start of its hour.
pub fn floor_to_hour(now: DateTime<Tz>) -> DateTime<Tz> {
    now - Duration::minutes(i64::from(now.minute()))
        - Duration::seconds(i64::from(now.second()))
        - Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Events starting at or before this instant are drawn in the past color.
pub fn past_cutoff(now: DateTime<Tz>, threshold_hours: u32) -> DateTime<Tz> {
    floor_to_hour(now) - Duration::hours(i64::from(threshold_hours))
}

/// Whole-day rows first in schedule order, then timed rows by start.
pub fn build_rows(schedule: &Schedule, now: DateTime<Tz>, config: &Config) -> Vec<PanelRow> {
    let cutoff = past_cutoff(now, config.behavior.past_event_threshold_hours);
    let past_color = parse_color_or_white(&config.text.past_event_color);
    let max_len = config.text.max_title_length;

    let (all_day, timed) = schedule.partition();

    let mut rows = Vec::with_capacity(all_day.len() + timed.len());
    for event in all_day {
        rows.push(PanelRow {
            time_label: String::new(),
            title: truncate_title(&event.title, max_len),
            color: parse_color_or_white(&event.text_color),
            is_past: false,
        });
    }
    for event in timed {
        let is_past = event.start_time <= cutoff;
        let color = if is_past {
            past_color
        } else {
            parse_color_or_white(&event.text_color)
        };
        rows.push(PanelRow {
            time_label: event.start_str.clone(),
            title: truncate_title(&event.title, max_len),
            color,
            is_past,
        });
    }
    rows
}

/// Panel position in image pixels (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelRect {
    pub x: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl PanelRect {
    /// `box_top_position` is measured upward from the bottom edge.
    pub fn compute(config: &Config, width: u32, height: u32, rows: usize) -> Self {
        let layout = &config.layout;
        let w = width as f32;
        let h = height as f32;
        Self {
            x: w * layout.box_left_margin,
            top: h * (1.0 - layout.box_top_position),
            width: w * layout.box_width,
            height: (rows as f32) * layout.line_height as f32 + 2.0 * layout.padding as f32,
        }
    }

    /// Rectangle actually filled: the panel grown by the corner radius on every side.
    pub fn inflated(&self, radius: u32) -> (i32, i32, u32, u32) {
        let r = radius as f32;
        (
            (self.x - r).round() as i32,
            (self.top - r).round() as i32,
            (self.width + 2.0 * r).round().max(0.0) as u32,
            (self.height + 2.0 * r).round().max(0.0) as u32,
        )
    }

    /// Vertical center of row `index`.
    pub fn row_center(&self, config: &Config, index: usize) -> i32 {
        let layout = &config.layout;
        (self.top
            + layout.padding as f32
            + layout.first_row_offset as f32
            + (index as f32) * layout.line_height as f32)
            .round() as i32
    }

    pub fn time_x(&self, config: &Config) -> i32 {
        (self.x + config.layout.time_column_offset as f32).round() as i32
    }

    pub fn title_x(&self, config: &Config) -> i32 {
        (self.x + config.layout.title_column_offset as f32).round() as i32
    }
}

/// Integer glyph scale for the configured font size.
pub fn font_scale(font_size: u32) -> u32 {
    ((font_size as f32 / BASE_FONT_PX).round() as u32).max(1)
}
