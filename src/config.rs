// File: ./src/config.rs
// Handles configuration loading, defaults and validation.
use crate::context::AppContext;
use anyhow::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_output_file() -> String {
    "lockscreen.jpg".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_object_key() -> String {
    "lockscreen.jpg".to_string()
}
fn default_cache_max_age() -> u32 {
    60
}

fn default_fetch_timeout() -> u64 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

fn default_title_prefixes() -> Vec<String> {
    vec!["S: ".to_string(), "D: ".to_string()]
}
fn default_past_color() -> String {
    "gray".to_string()
}

fn default_corner_radius() -> u32 {
    15
}
fn default_time_column_offset() -> u32 {
    20
}
fn default_title_column_offset() -> u32 {
    150
}
fn default_first_row_offset() -> u32 {
    20
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DisplayConfig {
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PathsConfig {
    /// Relative to the inputs directory.
    pub backgrounds_folder: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct AwsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// S3-compatible endpoint override (MinIO, localstack, test servers).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_object_key")]
    pub object_key: String,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TimezoneConfig {
    pub timezone: String,
}

/// One remote iCalendar feed.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CalendarSource {
    pub name: String,
    pub url: String,
    pub text_color: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BehaviorConfig {
    pub past_event_threshold_hours: u32,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TextConfig {
    pub max_title_length: usize,
    pub font_size: u32,
    #[serde(default = "default_title_prefixes")]
    pub title_prefixes: Vec<String>,
    #[serde(default = "default_past_color")]
    pub past_event_color: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct LayoutConfig {
    /// Fraction of canvas width.
    pub box_left_margin: f32,
    /// Fraction of canvas height, measured upward from the bottom edge.
    pub box_top_position: f32,
    /// Fraction of canvas width.
    pub box_width: f32,
    pub line_height: u32,
    pub padding: u32,
    pub background_alpha: f32,
    #[serde(default = "default_corner_radius")]
    pub corner_radius: u32,
    #[serde(default = "default_time_column_offset")]
    pub time_column_offset: u32,
    #[serde(default = "default_title_column_offset")]
    pub title_column_offset: u32,
    #[serde(default = "default_first_row_offset")]
    pub first_row_offset: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub display: DisplayConfig,
    pub paths: PathsConfig,
    pub aws: AwsConfig,
    pub timezone: TimezoneConfig,
    #[serde(default)]
    pub calendars: Vec<CalendarSource>,
    pub behavior: BehaviorConfig,
    pub text: TextConfig,
    pub layout: LayoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig {
                width_px: 1290,
                height_px: 2796,
            },
            paths: PathsConfig {
                backgrounds_folder: "backgrounds".to_string(),
                output_file: default_output_file(),
            },
            aws: AwsConfig {
                access_key_id: String::new(),
                secret_access_key: String::new(),
                bucket_name: String::new(),
                region: default_region(),
                endpoint_url: None,
                object_key: default_object_key(),
                cache_max_age_secs: default_cache_max_age(),
            },
            timezone: TimezoneConfig {
                timezone: "UTC".to_string(),
            },
            calendars: Vec::new(),
            behavior: BehaviorConfig {
                past_event_threshold_hours: 1,
                fetch_timeout_secs: default_fetch_timeout(),
                log_level: default_log_level(),
            },
            text: TextConfig {
                max_title_length: 30,
                font_size: 30,
                title_prefixes: default_title_prefixes(),
                past_event_color: default_past_color(),
            },
            layout: LayoutConfig {
                box_left_margin: 0.05,
                box_top_position: 0.6,
                box_width: 0.9,
                line_height: 60,
                padding: 20,
                background_alpha: 0.9,
                corner_radius: default_corner_radius(),
                time_column_offset: default_time_column_offset(),
                title_column_offset: default_title_column_offset(),
                first_row_offset: default_first_row_offset(),
            },
        }
    }
}

impl Config {
    /// Load the configuration from `<inputs>/config.toml` of the given context.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.get_config_file_path()?;
        Self::load_from_path(&path)
    }

    /// Load, parse and validate a configuration file.
    /// Returns a contextualized error if reading, parsing or validation fails.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!(
                "Config file not found: {}",
                path.display()
            ));
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        let config = Self::from_toml_str(&contents).map_err(|e| {
            anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e)
        })?;

        log::debug!(
            "Loaded config from {} ({} calendars)",
            path.display(),
            config.calendars.len()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Helper to detect whether an anyhow::Error indicates that the config file was missing.
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }

        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }

        false
    }

    /// Checks values serde cannot express. Colors are deliberately not checked here:
    /// an unknown color degrades to white at render time.
    pub fn validate(&self) -> Result<()> {
        if self.display.width_px == 0 || self.display.height_px == 0 {
            anyhow::bail!(
                "display size must be non-zero (got {}x{})",
                self.display.width_px,
                self.display.height_px
            );
        }

        self.tz()?;

        if self.text.max_title_length < 4 {
            anyhow::bail!(
                "text.max_title_length must be at least 4 (got {})",
                self.text.max_title_length
            );
        }

        let fractions = [
            ("layout.box_left_margin", self.layout.box_left_margin),
            ("layout.box_top_position", self.layout.box_top_position),
            ("layout.box_width", self.layout.box_width),
            ("layout.background_alpha", self.layout.background_alpha),
        ];
        for (key, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1] (got {})", key, value);
            }
        }

        for cal in &self.calendars {
            if cal.url.trim().is_empty() {
                anyhow::bail!("calendar '{}' has an empty url", cal.name);
            }
        }

        Ok(())
    }

    /// The configured IANA zone all dates and times resolve to.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.timezone.parse::<Tz>().map_err(|e| {
            anyhow::anyhow!(
                "Unknown timezone '{}': {}",
                self.timezone.timezone,
                e
            )
        })
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.behavior
            .log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let mut config = Config::default();
        config.timezone.timezone = "Mars/Olympus_Mons".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown timezone"));
    }

    #[test]
    fn test_out_of_range_fraction_is_rejected() {
        let mut config = Config::default();
        config.layout.background_alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_falls_back_to_info() {
        let mut config = Config::default();
        config.behavior.log_level = "chatty".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Info);
        config.behavior.log_level = "DEBUG".to_string();
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }
}
