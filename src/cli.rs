// File: ./src/cli.rs
//! Command-line parsing and help text for the `lockcal` binary.
use crate::context::AppContext;
use crate::controller::RunOptions;
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub key: Option<String>,
    pub no_upload: bool,
    pub verbose: bool,
    pub help: bool,
}

impl CliArgs {
    /// `--config` when given, otherwise the context's default location.
    pub fn config_path(&self, ctx: &dyn AppContext) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => ctx.get_config_file_path(),
        }
    }

    /// Parse `args` (including the binary name at index 0).
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = CliArgs::default();

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "-h" | "--help" | "help" => parsed.help = true,
                "-v" | "--verbose" => parsed.verbose = true,
                "--no-upload" => parsed.no_upload = true,
                "-r" | "--root" => parsed.root = Some(value_for(args, &mut i)?.into()),
                "-c" | "--config" => parsed.config = Some(value_for(args, &mut i)?.into()),
                "-o" | "--output" => parsed.output = Some(value_for(args, &mut i)?.into()),
                "--key" => parsed.key = Some(value_for(args, &mut i)?.to_string()),
                "--width" => parsed.width = Some(pixels(flag, value_for(args, &mut i)?)?),
                "--height" => parsed.height = Some(pixels(flag, value_for(args, &mut i)?)?),
                other => return Err(format!("Unknown argument '{}'", other)),
            }
            i += 1;
        }
        Ok(parsed)
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            output_path: self.output.clone(),
            width: self.width,
            height: self.height,
            object_key: self.key.clone(),
            upload: !self.no_upload,
            now: None,
        }
    }
}

/// The value following the flag at `*i`; advances `i` past it.
fn value_for<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    match args.get(*i + 1) {
        Some(value) => {
            *i += 1;
            Ok(value.as_str())
        }
        None => Err(format!("Missing value for {}", flag)),
    }
}

fn pixels(flag: &str, value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(px) if px > 0 => Ok(px),
        _ => Err(format!("{} expects a positive integer, got '{}'", flag, value)),
    }
}

pub fn print_help(binary_name: &str) {
    println!(
        "Lockcal v{} - Renders today's calendar onto a phone lockscreen image",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS]", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>      Directory holding inputs/ (config.toml, backgrounds) and the output.");
    println!("    -c, --config <file>    Use this config file instead of <root>/inputs/config.toml.");
    println!("    -o, --output <file>    Write the image here instead of the configured output file.");
    println!("    --width <px>           Override display.width_px.");
    println!("    --height <px>          Override display.height_px.");
    println!("    --key <object key>     Upload under this S3 key instead of aws.object_key.");
    println!("    --no-upload            Render only, skip the S3 upload.");
    println!("    -v, --verbose          Debug logging.");
    println!("    -h, --help             Show this help message.");
    println!();
    println!("EXAMPLES:");
    println!("    {}                                  Render and upload using ./inputs/config.toml", binary_name);
    println!("    {} --no-upload -o /tmp/preview.png  Render a local preview", binary_name);
    println!("    {} --width 1179 --height 2556       Render for a smaller screen", binary_name);
}
