use std::{
    path::Path,
    process::{Command, Stdio},
    time::Instant,
};

use log::info;

use crate::build::options::BundlerOptions;
use crate::errors::BuildError;
use crate::logging::{FormatElapsedTimeOptions, format_elapsed_time};

/// Runs the application bundler from `root` and waits for it.
///
/// Output is streamed straight to the terminal. There is no timeout: a bundler that hangs hangs the build.
pub fn run_bundler(options: &BundlerOptions, root: &Path) -> Result<(), BuildError> {
    let command_line = options.command_line();
    let bundler_start = Instant::now();

    info!(target: "bundler", "Running `{}`", command_line);

    let status = Command::new(&options.program)
        .args(&options.args)
        .envs(&options.env)
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| BuildError::BundlerSpawn {
            command: command_line.clone(),
            source,
        })?;

    if !status.success() {
        return Err(BuildError::BundlerFailed {
            command: command_line,
            status,
        });
    }

    info!(target: "bundler", "Bundle built in {}", format_elapsed_time(bundler_start.elapsed(), &FormatElapsedTimeOptions::default()));
    Ok(())
}
