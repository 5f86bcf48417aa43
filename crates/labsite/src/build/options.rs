use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::errors::ConfigError;

/// labsite build options. Should be passed to [`publish()`](crate::publish()).
///
/// Relative paths are resolved against [`BuildOptions::root`].
///
/// ## Examples
/// Default values:
/// ```rust
/// use labsite::BuildOptions;
///
/// let options = BuildOptions::default();
/// assert_eq!(options.output_dir(), std::path::Path::new("./dist"));
/// ```
/// From a TOML file (every key is optional):
/// ```toml
/// output_dir = "dist"
/// data_dir = "public/data"
/// blog_dir = "public/blog"
///
/// [bundler]
/// program = "npm"
/// args = ["run", "build-vite"]
///
/// [sitemap]
/// base_url = "https://lab.example.org"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    /// Project root. The bundler runs from here. Defaults to the current directory.
    pub root: PathBuf,

    pub output_dir: PathBuf,

    /// Directory holding the structured JSON data files.
    pub data_dir: PathBuf,

    /// Directory of blog posts, one Markdown file per post.
    pub blog_dir: PathBuf,

    /// Directory of optional publication write-ups, `<id>.md`.
    pub publications_dir: PathBuf,

    /// Data files copied from `data_dir` to `<output_dir>/data`.
    pub data_files: Vec<String>,

    /// Top-level client routes that get their own copy of the SPA shell. Home is the root `index.html`.
    pub routes: Vec<String>,

    pub bundler: BundlerOptions,

    pub sitemap: SitemapOptions,
}

/// The external process that builds the client application into the output directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerOptions {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    /// Path of the SPA shell the bundler writes, relative to the output directory.
    pub shell: PathBuf,
}

impl BundlerOptions {
    /// Human-readable command line, for logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for BundlerOptions {
    fn default() -> Self {
        Self {
            program: "npm".to_string(),
            args: vec!["run".to_string(), "build-vite".to_string()],
            env: BTreeMap::from([("NODE_ENV".to_string(), "production".to_string())]),
            shell: "index.html".into(),
        }
    }
}

/// Options for sitemap generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SitemapOptions {
    /// Whether to generate a sitemap. Default: `true`
    pub enabled: bool,
    /// Absolute URL the site is served from, used to build every `<loc>`. Default: `http://localhost:8000`
    pub base_url: String,
    /// The sitemap filename. Default: `"sitemap.xml"`
    pub filename: String,
    /// Optional XSL stylesheet URL for styling the sitemap. Default: `None`
    ///
    /// If the value starts with `http(s)://`it will be used as-is. Otherwise, the path is appended to the base URL.
    pub stylesheet: Option<String>,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:8000".to_string(),
            filename: "sitemap.xml".to_string(),
            stylesheet: None,
        }
    }
}

pub const DEFAULT_DATA_FILES: &[&str] = &[
    "people.json",
    "research.json",
    "publications.json",
    "talks.json",
    "news.json",
    "gallery.json",
    "blogs.json",
];

pub const DEFAULT_ROUTES: &[&str] = &["about", "publications", "talks", "blog"];

/// Provides default values matching the usual project layout (`public/blog`, `public/data`, output in `dist`).
impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            root: ".".into(),
            output_dir: "dist".into(),
            data_dir: "public/data".into(),
            blog_dir: "public/blog".into(),
            publications_dir: "public/publications".into(),
            data_files: DEFAULT_DATA_FILES.iter().map(|f| f.to_string()).collect(),
            routes: DEFAULT_ROUTES.iter().map(|r| r.to_string()).collect(),
            bundler: BundlerOptions::default(),
            sitemap: SitemapOptions::default(),
        }
    }
}

impl BuildOptions {
    /// Options rooted at `root`, everything else default.
    pub fn with_root<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut options: Self =
            toml_edit::de::from_str(raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        // A relative root is relative to the config file, not to wherever the CLI was started.
        if let Some(parent) = path.parent() {
            options.root = parent.join(&options.root);
        }

        Ok(options)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw, path)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output_dir)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    pub fn blog_dir(&self) -> PathBuf {
        self.resolve(&self.blog_dir)
    }

    pub fn publications_dir(&self) -> PathBuf {
        self.resolve(&self.publications_dir)
    }

    pub fn shell_path(&self) -> PathBuf {
        self.output_dir().join(&self.bundler.shell)
    }
}
