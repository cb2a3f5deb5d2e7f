// Binary entry point: parse flags, load config, run once.
use anyhow::Result;
use lockcal::cli::{CliArgs, print_help};
use lockcal::config::Config;
use lockcal::context::StandardContext;
use lockcal::controller::{self, RunOutcome};
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let binary_name = args
        .first()
        .and_then(|a| std::path::Path::new(a).file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("lockcal")
        .to_string();

    let cli = match CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Run '{} --help' for usage.", binary_name);
            std::process::exit(2);
        }
    };
    if cli.help {
        print_help(&binary_name);
        return Ok(());
    }

    let ctx = StandardContext::new(cli.root.clone());
    let config_path = cli.config_path(&ctx)?;
    let config = match Config::load_from_path(&config_path) {
        Ok(config) => config,
        Err(e) => {
            if Config::is_missing_config_error(&e) {
                eprintln!(
                    "No configuration found at {}. Create it or pass --config <file>.",
                    config_path.display()
                );
            }
            return Err(e);
        }
    };

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level()
    };
    if let Err(e) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    match controller::run(&ctx, &config, &cli.run_options()).await? {
        RunOutcome::Completed(img) => {
            log::info!("Done: {} rendered and uploaded", img.path.display());
        }
        RunOutcome::PartiallyCompleted(img) => {
            log::warn!(
                "Partially completed: {} rendered, upload failed",
                img.path.display()
            );
        }
        RunOutcome::Rendered(img) => {
            log::info!("Done: {} rendered ({}x{})", img.path.display(), img.width, img.height);
        }
    }
    Ok(())
}
