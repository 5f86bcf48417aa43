use std::{path::PathBuf, process::Termination, time::Instant};

/// A file written by a build step.
#[derive(Debug)]
pub struct ArtifactOutput {
    pub step: &'static str,
    pub file_path: PathBuf,
}

/// A recoverable failure. The build carried on without this artifact (or without the whole step).
#[derive(Debug)]
pub struct StepFailure {
    pub step: &'static str,
    pub path: Option<PathBuf>,
    pub message: String,
}

/// Returned by [`publish()`](crate::publish) after a build that wasn't fatally interrupted.
#[derive(Debug)]
pub struct BuildOutput {
    pub start_time: Instant,
    pub artifacts: Vec<ArtifactOutput>,
    pub failures: Vec<StepFailure>,
    /// Inputs that were expected but absent, e.g. a data file that doesn't exist.
    pub skipped: Vec<PathBuf>,
}

impl BuildOutput {
    pub fn new(start_time: Instant) -> Self {
        Self {
            start_time,
            artifacts: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub(crate) fn add_artifact(&mut self, step: &'static str, file_path: PathBuf) {
        self.artifacts.push(ArtifactOutput { step, file_path });
    }

    pub(crate) fn add_failure(&mut self, step: &'static str, path: Option<PathBuf>, message: String) {
        self.failures.push(StepFailure {
            step,
            path,
            message,
        });
    }

    pub(crate) fn add_skipped(&mut self, path: PathBuf) {
        self.skipped.push(path);
    }
}

impl Default for BuildOutput {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

/// Recoverable failures don't change the exit code.
impl Termination for BuildOutput {
    fn report(self) -> std::process::ExitCode {
        0.into()
    }
}
