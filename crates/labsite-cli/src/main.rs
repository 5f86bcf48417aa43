use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use labsite::{
    BuildOptions, init_logging, publish,
    errors::{LabsiteError, describe},
};
use log::{error, info};

const DEFAULT_CONFIG_FILE: &str = "labsite.toml";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Build the lab website into a static output directory
struct Cli {
    /// Path to a labsite.toml. Defaults to ./labsite.toml when it exists
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Don't print anything
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging();
    if cli.quiet {
        log::set_max_level(log::LevelFilter::Off);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(target: "labsite", "{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), LabsiteError> {
    let options = load_options(cli.config.as_deref())?;
    let output = publish(&options)?;

    if !output.skipped.is_empty() {
        info!(target: "labsite", "{} expected inputs were missing", output.skipped.len());
    }
    if !output.failures.is_empty() {
        info!(target: "labsite", "{}", format!("{} artifacts could not be written, see above", output.failures.len()).yellow());
    }

    Ok(())
}

fn load_options(config: Option<&Path>) -> Result<BuildOptions, LabsiteError> {
    let options = match config {
        Some(path) => BuildOptions::from_toml_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            BuildOptions::from_toml_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => BuildOptions::default(),
    };

    Ok(options)
}
