// File: ./src/background.rs
// Date-seeded background choice plus cover-style scale and center crop.
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const CANDIDATE_EXTENSION: &str = "png";

/// A decoded background already fitted to the canvas.
#[derive(Debug, Clone)]
pub struct BackgroundAsset {
    pub source: PathBuf,
    pub image: RgbaImage,
}

impl BackgroundAsset {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// `YYYYMMDD` as an integer.
pub fn date_seed(date: NaiveDate) -> u64 {
    let year = date.year().max(0) as u64;
    year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day())
}

/// Candidate files in `dir`, sorted by file name. A missing directory or an
/// empty pool is reported as `NotFound`.
pub fn list_candidates(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Background folder not found: {}", dir.display()),
        )
        .into());
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list background folder {}", dir.display()))?
    {
        let path = entry?.path();
        let is_candidate = path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(CANDIDATE_EXTENSION));
        if is_candidate {
            candidates.push(path);
        }
    }

    if candidates.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("No .{} images found in {}", CANDIDATE_EXTENSION, dir.display()),
        )
        .into());
    }

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

/// Pick the candidate for `date`. Same pool and date always give the same file.
pub fn choose_candidate(candidates: &[PathBuf], date: NaiveDate) -> Option<&PathBuf> {
    if candidates.is_empty() {
        return None;
    }
    let mut rng = fastrand::Rng::with_seed(date_seed(date));
    candidates.get(rng.usize(..candidates.len()))
}

/// Select, decode and fit today's background to exactly `width` x `height`.
pub fn select_background(
    dir: &Path,
    date: NaiveDate,
    width: u32,
    height: u32,
) -> Result<BackgroundAsset> {
    let candidates = list_candidates(dir)?;
    log::debug!("Found {} background candidates in {}", candidates.len(), dir.display());

    let chosen = choose_candidate(&candidates, date)
        .cloned()
        .context("Background pool is empty")?;
    log::info!("Selected background: {}", chosen.display());

    let decoded = image::open(&chosen)
        .with_context(|| format!("Failed to decode background {}", chosen.display()))?;
    let image = cover_crop(&decoded, width, height)?;

    Ok(BackgroundAsset {
        source: chosen,
        image,
    })
}

/// Scale so the image covers the target box, then crop the overflow evenly from both sides.
pub fn cover_crop(img: &DynamicImage, width: u32, height: u32) -> Result<RgbaImage> {
    let (orig_w, orig_h) = img.dimensions();
    if orig_w == 0 || orig_h == 0 || width == 0 || height == 0 {
        anyhow::bail!(
            "Cannot fit a {}x{} image into {}x{}",
            orig_w,
            orig_h,
            width,
            height
        );
    }

    let (scaled_w, scaled_h) = scaled_dimensions(orig_w, orig_h, width, height);
    log::debug!(
        "Resizing background {}x{} -> {}x{}, cropping to {}x{}",
        orig_w,
        orig_h,
        scaled_w,
        scaled_h,
        width,
        height
    );

    let resized = img.resize_exact(scaled_w, scaled_h, FilterType::Lanczos3);
    let left = (scaled_w - width) / 2;
    let top = (scaled_h - height) / 2;
    Ok(resized.crop_imm(left, top, width, height).to_rgba8())
}

/// Dimensions after scaling by `max(W/w, H/h)`, never smaller than the target.
pub fn scaled_dimensions(orig_w: u32, orig_h: u32, width: u32, height: u32) -> (u32, u32) {
    let scale = f64::max(
        f64::from(width) / f64::from(orig_w),
        f64::from(height) / f64::from(orig_h),
    );
    let scaled_w = (f64::from(orig_w) * scale).round() as u32;
    let scaled_h = (f64::from(orig_h) * scale).round() as u32;
    (scaled_w.max(width), scaled_h.max(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_seed_encoding() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 27).unwrap();
        assert_eq!(date_seed(d), 20250927);
    }

    #[test]
    fn test_scaled_dimensions_cover_target() {
        // Wide source: height drives the scale.
        assert_eq!(scaled_dimensions(4000, 1000, 1290, 2796), (11184, 2796));
        // Tall source: width drives the scale.
        assert_eq!(scaled_dimensions(100, 1000, 200, 300), (200, 2000));
        // Exact fit.
        assert_eq!(scaled_dimensions(645, 1398, 1290, 2796), (1290, 2796));
        // Rounding never undershoots the target.
        let (w, h) = scaled_dimensions(3, 7, 10, 10);
        assert!(w >= 10 && h >= 10);
    }

    #[test]
    fn test_choice_is_stable_for_a_date() {
        let pool: Vec<PathBuf> = (0..7).map(|i| PathBuf::from(format!("bg{}.png", i))).collect();
        let d = NaiveDate::from_ymd_opt(2025, 9, 27).unwrap();
        let first = choose_candidate(&pool, d).cloned();
        for _ in 0..5 {
            assert_eq!(choose_candidate(&pool, d).cloned(), first);
        }
        assert!(choose_candidate(&[], d).is_none());
    }
}
