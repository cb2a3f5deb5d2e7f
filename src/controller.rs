// File: src/controller.rs
//! Drives one lockscreen run: events, background, render, upload.
//! Every stage is awaited before the next starts; nothing runs concurrently.
use crate::aggregator;
use crate::background::select_background;
use crate::client::FeedClient;
use crate::config::Config;
use crate::context::AppContext;
use crate::publish;
use crate::render::{RenderedLockscreen, render_lockscreen};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Per-run overrides of the configured defaults.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_path: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub object_key: Option<String>,
    pub upload: bool,
    /// Pin the clock. Defaults to the current time.
    pub now: Option<DateTime<Utc>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_path: None,
            width: None,
            height: None,
            object_key: None,
            upload: true,
            now: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Image generated and uploaded.
    Completed(RenderedLockscreen),
    /// Image generated, upload failed.
    PartiallyCompleted(RenderedLockscreen),
    /// Image generated, upload not requested.
    Rendered(RenderedLockscreen),
}

impl RunOutcome {
    pub fn image(&self) -> &RenderedLockscreen {
        match self {
            RunOutcome::Completed(img)
            | RunOutcome::PartiallyCompleted(img)
            | RunOutcome::Rendered(img) => img,
        }
    }
}

pub async fn run(ctx: &dyn AppContext, config: &Config, options: &RunOptions) -> Result<RunOutcome> {
    let tz = config.tz()?;
    let now = options.now.unwrap_or_else(Utc::now).with_timezone(&tz);
    let today = now.date_naive();
    log::info!("Generating lockscreen for {} ({})", today, tz.name());

    log::info!("Fetching today's events from {} calendars", config.calendars.len());
    let client = FeedClient::new().map_err(|e| anyhow::anyhow!(e))?;
    let schedule = aggregator::get_todays_events(&client, config, &tz, today).await;
    log::info!("Found {} events for today", schedule.len());

    let width = options.width.unwrap_or(config.display.width_px);
    let height = options.height.unwrap_or(config.display.height_px);
    let backgrounds_dir = ctx.get_backgrounds_dir(&config.paths.backgrounds_folder)?;
    let background = select_background(&backgrounds_dir, today, width, height)
        .context("Failed to prepare background image")?;

    let output_path = match &options.output_path {
        Some(path) => path.clone(),
        None => ctx.get_output_path(&config.paths.output_file)?,
    };
    let image = render_lockscreen(&schedule, &background, now, config, &output_path)
        .context("Failed to render lockscreen")?;

    if !options.upload {
        log::info!("Upload disabled, image left at {}", image.path.display());
        return Ok(RunOutcome::Rendered(image));
    }

    log::info!("Uploading to S3");
    if publish::publish(&config.aws, &image.path, options.object_key.as_deref()).await {
        log::info!("Lockscreen generation completed successfully");
        Ok(RunOutcome::Completed(image))
    } else {
        log::warn!(
            "Lockscreen generated at {} but upload failed",
            image.path.display()
        );
        Ok(RunOutcome::PartiallyCompleted(image))
    }
}
