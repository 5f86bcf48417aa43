//! Declarative description of the files a build step produces.
//!
//! Steps plan a [`Manifest`] (output path → how to produce it) without touching the output directory, and the manifest
//! is then emitted in one go. This keeps "which paths does a step produce" testable on its own.
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use colored::{ColoredString, Colorize};
use log::{error, info};
use serde::Serialize;

use crate::build::metadata::BuildOutput;
use crate::logging::{FormatElapsedTimeOptions, format_elapsed_time};
use crate::templating::redirect_page;

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactSource {
    /// A byte-for-byte copy of the SPA shell, so a direct request to the path boots the client app.
    Shell,
    /// A redirect page sending the visitor to an external URL.
    Redirect { target: String },
    /// A copy of a source file.
    Copy(PathBuf),
    /// Pre-rendered text, such as a JSON document or the sitemap.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    /// Path relative to the output directory.
    pub path: PathBuf,
    pub source: ArtifactSource,
}

impl Artifact {
    fn write(&self, output_dir: &Path, shell: &[u8]) -> std::io::Result<PathBuf> {
        let destination = output_dir.join(&self.path);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        match &self.source {
            ArtifactSource::Shell => fs::write(&destination, shell)?,
            ArtifactSource::Redirect { target } => fs::write(&destination, redirect_page(target))?,
            ArtifactSource::Copy(from) => {
                fs::copy(from, &destination)?;
            }
            ArtifactSource::Text(text) => fs::write(&destination, text)?,
        }

        Ok(destination)
    }
}

/// The planned output of one build step.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub step: &'static str,
    artifacts: Vec<Artifact>,
}

impl Manifest {
    pub fn new(step: &'static str) -> Self {
        Self {
            step,
            artifacts: vec![],
        }
    }

    pub fn push<P: Into<PathBuf>>(&mut self, path: P, source: ArtifactSource) {
        self.artifacts.push(Artifact {
            path: path.into(),
            source,
        });
    }

    pub fn shell<P: Into<PathBuf>>(&mut self, path: P) {
        self.push(path, ArtifactSource::Shell);
    }

    pub fn redirect<P: Into<PathBuf>>(&mut self, path: P, target: &str) {
        self.push(
            path,
            ArtifactSource::Redirect {
                target: target.to_string(),
            },
        );
    }

    pub fn copy<P: Into<PathBuf>>(&mut self, path: P, from: PathBuf) {
        self.push(path, ArtifactSource::Copy(from));
    }

    pub fn text<P: Into<PathBuf>>(&mut self, path: P, text: String) {
        self.push(path, ArtifactSource::Text(text));
    }

    /// Serializes `value` as pretty-printed JSON.
    pub fn json<P, T>(&mut self, path: P, value: &T) -> Result<(), serde_json::Error>
    where
        P: Into<PathBuf>,
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string_pretty(value)?;
        self.text(path, json);
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&ArtifactSource> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.path == path)
            .map(|artifact| &artifact.source)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|artifact| artifact.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Writes every artifact under `output_dir`. A failing artifact is logged and recorded in `report`, the rest are
    /// still written. Returns how many artifacts were written.
    pub fn emit(&self, output_dir: &Path, shell: &[u8], report: &mut BuildOutput) -> usize {
        let route_format_options = FormatElapsedTimeOptions {
            additional_fn: Some(&|msg: ColoredString| format!("(+{})", msg).dimmed()),
            ..Default::default()
        };

        let mut written = 0;
        for artifact in &self.artifacts {
            let artifact_start = Instant::now();
            match artifact.write(output_dir, shell) {
                Ok(destination) => {
                    info!(target: self.step, "{} {}", destination.to_string_lossy().dimmed(), format_elapsed_time(artifact_start.elapsed(), &route_format_options));
                    report.add_artifact(self.step, destination);
                    written += 1;
                }
                Err(err) => {
                    error!(target: self.step, "Failed to write {}: {}", artifact.path.display(), err);
                    report.add_failure(self.step, Some(artifact.path.clone()), err.to_string());
                }
            }
        }

        written
    }
}
