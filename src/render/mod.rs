// File: ./src/render/mod.rs
//! Composes the lockscreen: fitted background plus, when there is anything
//! to show, a translucent rounded panel listing today's events.
pub mod canvas;
pub mod layout;

use crate::background::BackgroundAsset;
use crate::config::Config;
use crate::model::event::Schedule;
use anyhow::{Context, Result};
use canvas::{BlendCanvas, to_rgb888};
use chrono::DateTime;
use chrono_tz::Tz;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_1::{FONT_9X18_BOLD, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, RoundedRectangle};
use embedded_graphics::text::{Baseline, Text};
use image::{DynamicImage, RgbaImage};
use layout::{PanelRect, PanelRow, build_rows, font_scale};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLockscreen {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Compose and write the lockscreen to `output_path`.
pub fn render_lockscreen(
    schedule: &Schedule,
    background: &BackgroundAsset,
    now: DateTime<Tz>,
    config: &Config,
    output_path: &Path,
) -> Result<RenderedLockscreen> {
    let canvas = compose(schedule, background, now, config)?;
    let (width, height) = canvas.dimensions();
    save_image(canvas, output_path)?;
    log::info!(
        "Lockscreen saved to {} ({}x{})",
        output_path.display(),
        width,
        height
    );
    Ok(RenderedLockscreen {
        path: output_path.to_path_buf(),
        width,
        height,
    })
}

/// Draw everything in memory. The canvas takes the background's dimensions.
pub fn compose(
    schedule: &Schedule,
    background: &BackgroundAsset,
    now: DateTime<Tz>,
    config: &Config,
) -> Result<RgbaImage> {
    let mut canvas = background.image.clone();
    if schedule.is_empty() {
        log::info!("No events to display, rendering background only");
        return Ok(canvas);
    }

    let rows = build_rows(schedule, now, config);
    let (width, height) = canvas.dimensions();
    let rect = PanelRect::compute(config, width, height, rows.len());
    log::debug!("Drawing panel for {} rows at {:?}", rows.len(), rect);

    draw_panel(&mut canvas, &rect, config)?;
    for (index, row) in rows.iter().enumerate() {
        draw_row(&mut canvas, &rect, config, index, row)?;
    }
    Ok(canvas)
}

fn draw_panel(canvas: &mut RgbaImage, rect: &PanelRect, config: &Config) -> Result<()> {
    let radius = config.layout.corner_radius;
    let (x, y, w, h) = rect.inflated(radius);
    let alpha = (config.layout.background_alpha.clamp(0.0, 1.0) * 255.0).round() as u8;

    let panel = RoundedRectangle::with_equal_corners(
        Rectangle::new(Point::new(x, y), Size::new(w, h)),
        Size::new(radius, radius),
    );
    let mut target = BlendCanvas::new(canvas).with_alpha(alpha);
    panel
        .into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
        .draw(&mut target)?;
    Ok(())
}

fn draw_row(
    canvas: &mut RgbaImage,
    rect: &PanelRect,
    config: &Config,
    index: usize,
    row: &PanelRow,
) -> Result<()> {
    let scale = font_scale(config.text.font_size);
    let color = to_rgb888(row.color);
    let center_y = rect.row_center(config, index);

    if !row.time_label.is_empty() {
        let anchor = Point::new(rect.time_x(config), center_y);
        let mut target = BlendCanvas::scaled_at(canvas, anchor, scale);
        Text::with_baseline(
            &row.time_label,
            Point::zero(),
            MonoTextStyle::new(&FONT_9X18_BOLD, color),
            Baseline::Middle,
        )
        .draw(&mut target)?;
    }

    let anchor = Point::new(rect.title_x(config), center_y);
    let mut target = BlendCanvas::scaled_at(canvas, anchor, scale);
    Text::with_baseline(
        &row.title,
        Point::zero(),
        MonoTextStyle::new(&FONT_10X20, color),
        Baseline::Middle,
    )
    .draw(&mut target)?;
    Ok(())
}

/// Write `img` in the format implied by the extension. JPEG has no alpha channel.
pub fn save_image(img: RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));

    let result = if is_jpeg {
        DynamicImage::ImageRgba8(img).to_rgb8().save(path)
    } else {
        img.save(path)
    };
    result.with_context(|| format!("Failed to save image to {}", path.display()))
}
