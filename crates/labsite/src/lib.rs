#![doc = include_str!("../README.md")]

// Modules the end-user will interact directly or indirectly with
pub mod build;
pub mod client;
pub mod content;
pub mod data;
pub mod errors;
pub mod sitemap;

// Exports for end-users
pub use build::metadata::{ArtifactOutput, BuildOutput, StepFailure};
pub use build::options::{BuildOptions, BundlerOptions, SitemapOptions};

mod templating;

// Internal modules
mod logging;

pub use logging::init_logging;

use build::execute_build;
use errors::BuildError;

/// Starts the build process and generates the output files.
///
/// ## Example
/// Should be called from the main function of the binary crate.
/// ```rust,no_run
/// use labsite::{publish, BuildOptions, BuildOutput};
///
/// fn main() -> Result<BuildOutput, labsite::errors::BuildError> {
///     publish(&BuildOptions::default())
/// }
/// ```
pub fn publish(options: &BuildOptions) -> Result<BuildOutput, BuildError> {
    init_logging();

    execute_build(options)
}
