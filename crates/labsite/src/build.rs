use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::NaiveDate;
use colored::Colorize;
use log::{error, info, trace, warn};
use serde::Serialize;

use crate::{
    BuildOptions,
    build::manifest::Manifest,
    build::metadata::BuildOutput,
    content::{ContentSource, ListingEntry, PublicationContent},
    data::read_records,
    errors::{BuildError, describe},
    logging::{FormatElapsedTimeOptions, format_elapsed_time, print_title},
    sitemap::build_sitemap,
};

pub mod bundler;
pub mod manifest;
pub mod metadata;
pub mod options;

pub const BLOG_SOURCE: &str = "blog";
pub const PUBLICATIONS_SOURCE: &str = "publications";
const BLOG_LISTING_FILE: &str = "blogs.json";
const PUBLICATIONS_DATA_FILE: &str = "publications.json";

/// Runs the whole pipeline. Only a failure to prepare the output directory or to bundle the application is fatal;
/// every later step logs its failures and lets the next step run.
pub fn execute_build(options: &BuildOptions) -> Result<BuildOutput, BuildError> {
    let build_start = Instant::now();
    let mut build_metadata = BuildOutput::new(build_start);

    let section_format_options = FormatElapsedTimeOptions {
        sec_red_threshold: 5,
        sec_yellow_threshold: 1,
        millis_red_threshold: None,
        millis_yellow_threshold: None,
        ..Default::default()
    };

    let output_dir = options.output_dir();
    trace!(target: "build", "Setting up output directory...");
    prepare_output_dir(&output_dir)?;
    info!(target: "build", "Output directory: {}", output_dir.display());

    print_title("bundling application");
    bundler::run_bundler(&options.bundler, &options.root)?;

    let shell_path = options.shell_path();
    let shell = fs::read(&shell_path).map_err(|source| BuildError::MissingShell {
        path: shell_path.clone(),
        source,
    })?;

    let today = chrono::Local::now().date_naive();
    let blog = ContentSource::new(BLOG_SOURCE, options.blog_dir());

    print_title("processing blog posts");
    let step_start = Instant::now();
    let listing = blog.listing();
    info!(target: "blog", "Found {} blog posts", listing.len());
    let manifest = plan_blog(&blog, &listing, &mut build_metadata);
    let written = manifest.emit(&output_dir, &shell, &mut build_metadata);
    info!(target: "blog", "{}", format!("processed {} blog artifacts in {}", written, format_elapsed_time(step_start.elapsed(), &section_format_options)).bold());

    print_title("copying data files");
    let manifest = plan_data_files(options, &listing, &mut build_metadata);
    manifest.emit(&output_dir, &shell, &mut build_metadata);

    print_title("creating route pages");
    plan_routes(&options.routes).emit(&output_dir, &shell, &mut build_metadata);

    print_title("creating publication pages");
    match plan_publications(options, &mut build_metadata) {
        Ok(manifest) => {
            let written = manifest.emit(&output_dir, &shell, &mut build_metadata);
            info!(target: "publications", "Created {} publication artifacts", written);
        }
        Err(message) => {
            error!(target: "publications", "Publication pages skipped: {}", message);
            build_metadata.add_failure("publications", None, message);
        }
    }

    if options.sitemap.enabled {
        print_title("generating sitemap");
        plan_sitemap(options, &listing, today).emit(&output_dir, &shell, &mut build_metadata);
    }

    if build_metadata.failures.is_empty() {
        info!(target: "build", "{}", format!("Static site built in {}", format_elapsed_time(build_start.elapsed(), &section_format_options)).bold());
    } else {
        warn!(target: "build", "{}", format!("Static site built in {} with {} failed artifacts", format_elapsed_time(build_start.elapsed(), &section_format_options), build_metadata.failures.len()).bold());
    }

    Ok(build_metadata)
}

/// Removes and recreates `output_dir`.
fn prepare_output_dir(output_dir: &Path) -> Result<(), BuildError> {
    let to_error = |source| BuildError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    };

    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(to_error)?;
    }
    fs::create_dir_all(output_dir).map_err(to_error)
}

/// `blog/<slug>.json` with the full post and `blog/<slug>/index.html` for every post in `listing`.
pub fn plan_blog(
    blog: &ContentSource,
    listing: &[ListingEntry],
    report: &mut BuildOutput,
) -> Manifest {
    let mut manifest = Manifest::new("blog");

    for entry in listing {
        let Some(post) = blog.get_entry(&entry.slug) else {
            warn!(target: "blog", "Could not load {}, skipping", entry.slug);
            report.add_failure("blog", Some(blog.entry_path(&entry.slug)), "could not be loaded".to_string());
            continue;
        };

        let json_path = PathBuf::from(BLOG_SOURCE).join(format!("{}.json", post.slug));
        if let Err(err) = manifest.json(&json_path, &post) {
            error!(target: "blog", "Failed to serialize {}: {}", post.slug, err);
            report.add_failure("blog", Some(json_path), err.to_string());
            continue;
        }
        manifest.shell(PathBuf::from(BLOG_SOURCE).join(&post.slug).join("index.html"));
    }

    manifest
}

/// Copies of the configured data files. A missing file is skipped with a warning.
///
/// When the data directory has no `blogs.json`, one is generated from the blog listing.
pub fn plan_data_files(
    options: &BuildOptions,
    listing: &[ListingEntry],
    report: &mut BuildOutput,
) -> Manifest {
    let mut manifest = Manifest::new("data");
    let data_dir = options.data_dir();

    for file in &options.data_files {
        let source = data_dir.join(file);
        let destination = PathBuf::from("data").join(file);

        if source.is_file() {
            manifest.copy(destination, source);
        } else if file == BLOG_LISTING_FILE {
            info!(target: "data", "{} not found, generating it from {} blog posts", file, listing.len());
            let entries: Vec<BlogListingRecord> = listing.iter().map(BlogListingRecord::from).collect();
            if let Err(err) = manifest.json(&destination, &entries) {
                error!(target: "data", "Failed to serialize {}: {}", file, err);
                report.add_failure("data", Some(destination), err.to_string());
            }
        } else {
            warn!(target: "data", "{} not found, skipping", file);
            report.add_skipped(source);
        }
    }

    manifest
}

/// Shape of a `blogs.json` record, as read by the blog index page.
#[derive(Debug, Serialize)]
struct BlogListingRecord<'a> {
    id: &'a str,
    #[serde(flatten)]
    entry: &'a ListingEntry,
}

impl<'a> From<&'a ListingEntry> for BlogListingRecord<'a> {
    fn from(entry: &'a ListingEntry) -> Self {
        Self {
            id: &entry.slug,
            entry,
        }
    }
}

/// One copy of the SPA shell per top-level route, so that direct navigation and refreshes work on a static host.
pub fn plan_routes(routes: &[String]) -> Manifest {
    let mut manifest = Manifest::new("routes");
    for route in routes {
        let route = route.trim_matches('/');
        if route.is_empty() {
            continue;
        }
        manifest.shell(PathBuf::from(route).join("index.html"));
    }
    manifest
}

/// Publication detail pages.
///
/// Every record with an `id` gets `publications/<id>/index.html`: a redirect when the record has a `link`, otherwise
/// the SPA shell. Publications with a write-up in the publications directory also get `publications/<id>.json`. A
/// write-up that can't be read or serialized is recorded in `report` and the other publications carry on.
///
/// Errors only when `publications.json` itself can't be used.
pub fn plan_publications(options: &BuildOptions, report: &mut BuildOutput) -> Result<Manifest, String> {
    let mut manifest = Manifest::new("publications");
    let data_file = options.data_dir().join(PUBLICATIONS_DATA_FILE);

    if !data_file.is_file() {
        warn!(target: "publications", "{} not found, no publication pages", data_file.display());
        return Ok(manifest);
    }

    let records = read_records(&data_file).map_err(|err| describe(&err))?;
    let write_ups = ContentSource::new(PUBLICATIONS_SOURCE, options.publications_dir());

    for record in &records {
        let id = record.id();
        if id.is_empty() {
            continue;
        }
        if id.contains(['/', '\\']) || id == "." || id == ".." {
            warn!(target: "publications", "Skipping publication with unusable id '{}'", id);
            continue;
        }

        let page = PathBuf::from(PUBLICATIONS_SOURCE).join(&id).join("index.html");
        match record.link() {
            Some(link) => manifest.redirect(page, link),
            None => manifest.shell(page),
        }

        let write_up = match write_ups.read_raw(&id) {
            Ok(Some(document)) => PublicationContent::from_document(&document),
            Ok(None) => continue,
            Err(err) => {
                error!(target: "publications", "{}", describe(&err));
                report.add_failure("publications", Some(write_ups.entry_path(&id)), describe(&err));
                continue;
            }
        };

        let json_path = PathBuf::from(PUBLICATIONS_SOURCE).join(format!("{id}.json"));
        if let Err(err) = manifest.json(&json_path, &write_up) {
            error!(target: "publications", "Failed to serialize write-up for {}: {}", id, err);
            report.add_failure("publications", Some(json_path), err.to_string());
        }
    }

    Ok(manifest)
}

pub fn plan_sitemap(options: &BuildOptions, listing: &[ListingEntry], today: NaiveDate) -> Manifest {
    let mut manifest = Manifest::new("sitemap");
    let xml = build_sitemap(
        listing,
        &options.sitemap.base_url,
        today,
        options.sitemap.stylesheet.as_deref(),
    );
    manifest.text(options.sitemap.filename.as_str(), xml);
    manifest
}
