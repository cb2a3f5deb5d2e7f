// File: tests/lockscreen_render.rs
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use image::{GenericImageView, Rgba, RgbaImage};
use lockcal::background::BackgroundAsset;
use lockcal::config::{CalendarSource, Config};
use lockcal::context::{AppContext, TestContext};
use lockcal::model::event::localize;
use lockcal::model::{EventTime, NormalizedEvent, RawOccurrence, Schedule};
use lockcal::render::{compose, render_lockscreen};
use std::path::PathBuf;

const WIDTH: u32 = 400;
const HEIGHT: u32 = 800;

fn brisbane() -> Tz {
    "Australia/Brisbane".parse().unwrap()
}

fn at(h: u32) -> DateTime<Tz> {
    localize(
        &brisbane(),
        NaiveDate::from_ymd_opt(2025, 9, 27)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap(),
    )
}

fn white_background() -> BackgroundAsset {
    BackgroundAsset {
        source: PathBuf::from("white.png"),
        image: RgbaImage::from_pixel(WIDTH, HEIGHT, Rgba([255, 255, 255, 255])),
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.timezone.timezone = "Australia/Brisbane".to_string();
    config.display.width_px = WIDTH;
    config.display.height_px = HEIGHT;
    config
}

fn team_sync() -> Schedule {
    let source = CalendarSource {
        name: "work".to_string(),
        url: "file:///dev/null".to_string(),
        text_color: "green".to_string(),
    };
    let day = NaiveDate::from_ymd_opt(2025, 9, 27).unwrap();
    let occ = RawOccurrence {
        title: "S: Team Sync".to_string(),
        start: EventTime::Floating(day.and_hms_opt(9, 0, 0).unwrap()),
        end: EventTime::Floating(day.and_hms_opt(9, 30, 0).unwrap()),
    };
    let prefixes = vec!["S: ".to_string()];
    Schedule::from_events(vec![NormalizedEvent::from_occurrence(
        &source,
        &occ,
        &brisbane(),
        &prefixes,
        30,
    )])
}

#[test]
fn test_empty_schedule_renders_background_only() {
    let background = white_background();
    let canvas = compose(&Schedule::empty(), &background, at(8), &config()).unwrap();
    assert_eq!(canvas.dimensions(), (WIDTH, HEIGHT));
    assert_eq!(canvas, background.image);
}

#[test]
fn test_panel_is_drawn_behind_events() {
    let config = config();
    let canvas = compose(&team_sync(), &white_background(), at(8), &config).unwrap();

    // One row: panel spans x 20..380, y 320..420 (box_top_position 0.6 from the bottom).
    let inside = canvas.get_pixel(370, 410);
    assert!(inside[0] < 60, "panel should darken the background, got {:?}", inside);
    assert_eq!(canvas.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
    assert_eq!(canvas.get_pixel(200, 100), &Rgba([255, 255, 255, 255]));

    // The title is drawn in the source color, not the past color.
    let mut green_pixels = 0;
    for y in 330..390 {
        for x in 170..WIDTH {
            if canvas.get_pixel(x, y) == &Rgba([0, 128, 0, 255]) {
                green_pixels += 1;
            }
        }
    }
    assert!(green_pixels > 0, "expected title pixels in the event color");
}

#[test]
fn test_past_event_is_grayed() {
    let config = config();
    // Threshold 1h: at 11:00 the cutoff is 10:00, so the 09:00 event is past.
    let canvas = compose(&team_sync(), &white_background(), at(11), &config).unwrap();

    let mut green = 0;
    let mut gray = 0;
    for y in 330..390 {
        for x in 20..WIDTH {
            match canvas.get_pixel(x, y) {
                Rgba([0, 128, 0, 255]) => green += 1,
                Rgba([128, 128, 128, 255]) => gray += 1,
                _ => {}
            }
        }
    }
    assert_eq!(green, 0);
    assert!(gray > 0);
}

#[test]
fn test_render_writes_file_at_target_size() {
    let ctx = TestContext::new();
    for name in ["lockscreen.jpg", "nested/dir/lockscreen.png"] {
        let path = ctx.get_output_path(name).unwrap();
        let rendered =
            render_lockscreen(&team_sync(), &white_background(), at(8), &config(), &path).unwrap();

        assert_eq!(rendered.path, path);
        assert_eq!((rendered.width, rendered.height), (WIDTH, HEIGHT));
        let reopened = image::open(&path).unwrap();
        assert_eq!(reopened.dimensions(), (WIDTH, HEIGHT));
    }
}
