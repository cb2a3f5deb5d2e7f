// File: tests/run_pipeline.rs
use chrono::{TimeZone, Utc};
use image::{GenericImageView, Rgba, RgbaImage};
use lockcal::config::{CalendarSource, Config};
use lockcal::context::{AppContext, TestContext};
use lockcal::controller::{RunOptions, RunOutcome, run};

const FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
BEGIN:VEVENT\r
UID:gym\r
SUMMARY:Gym\r
DTSTART;TZID=Australia/Brisbane:20250927T070000\r
DTEND;TZID=Australia/Brisbane:20250927T080000\r
END:VEVENT\r
END:VCALENDAR\r
";

fn prepare(ctx: &TestContext) -> Config {
    let inputs = ctx.get_inputs_dir().unwrap();
    let backgrounds = inputs.join("backgrounds");
    std::fs::create_dir_all(&backgrounds).unwrap();
    RgbaImage::from_pixel(90, 160, Rgba([30, 60, 90, 255]))
        .save(backgrounds.join("sky.png"))
        .unwrap();

    let feed = inputs.join("personal.ics");
    std::fs::write(&feed, FEED).unwrap();

    let mut config = Config::default();
    config.timezone.timezone = "Australia/Brisbane".to_string();
    config.display.width_px = 180;
    config.display.height_px = 320;
    config.calendars = vec![CalendarSource {
        name: "Personal".to_string(),
        url: format!("file://{}", feed.display()),
        text_color: "white".to_string(),
    }];
    config
}

fn options() -> RunOptions {
    RunOptions {
        // 2025-09-27 06:00 in Brisbane (UTC+10).
        now: Some(Utc.with_ymd_and_hms(2025, 9, 26, 20, 0, 0).unwrap()),
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_render_only_run() {
    let ctx = TestContext::new();
    let config = prepare(&ctx);
    let opts = RunOptions {
        upload: false,
        ..options()
    };

    let outcome = run(&ctx, &config, &opts).await.unwrap();
    let image = match &outcome {
        RunOutcome::Rendered(image) => image,
        other => panic!("expected a render-only outcome, got {:?}", other),
    };
    assert_eq!(image.path, ctx.get_output_path("lockscreen.jpg").unwrap());
    assert_eq!(image::open(&image.path).unwrap().dimensions(), (180, 320));
}

#[tokio::test]
async fn test_failed_upload_is_partial_completion() {
    let ctx = TestContext::new();
    let config = prepare(&ctx);

    // Blank credentials: upload fails, the image stays.
    let outcome = run(&ctx, &config, &options()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::PartiallyCompleted(_)));
    assert!(outcome.image().path.is_file());
}

#[tokio::test]
async fn test_size_and_output_overrides() {
    let ctx = TestContext::new();
    let config = prepare(&ctx);
    let custom = ctx.get_output_path("preview/custom.png").unwrap();
    let opts = RunOptions {
        upload: false,
        width: Some(100),
        height: Some(50),
        output_path: Some(custom.clone()),
        ..options()
    };

    let outcome = run(&ctx, &config, &opts).await.unwrap();
    assert_eq!(outcome.image().path, custom);
    assert_eq!(image::open(&custom).unwrap().dimensions(), (100, 50));
}

#[tokio::test]
async fn test_missing_backgrounds_abort_the_run() {
    let ctx = TestContext::new();
    let mut config = prepare(&ctx);
    config.paths.backgrounds_folder = "nowhere".to_string();

    let opts = RunOptions {
        upload: false,
        ..options()
    };
    assert!(run(&ctx, &config, &opts).await.is_err());
    assert!(!ctx.get_output_path("lockscreen.jpg").unwrap().exists());
}
