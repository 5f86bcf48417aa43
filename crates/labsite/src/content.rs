//! Markdown-backed content: blog posts and publication write-ups.
//!
//! A [`ContentSource`] is a named directory of `*.md` files. Each file is one entry, identified by its slug (the file
//! name without extension), and linked from the site at `/<source name>/<slug>`.
use std::path::{Path, PathBuf};

use glob::{Pattern, glob as glob_fs};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

mod date;
mod frontmatter;
mod markdown;

use crate::errors::{ContentError, describe};
pub use date::{newest_first, parse_date};
pub use frontmatter::{AuthorLink, Frontmatter, split_frontmatter};
pub use markdown::render_markdown;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_DATE: &str = "No date";
pub const DEFAULT_AUTHOR: &str = "Unknown author";

/// A fully loaded Markdown entry, as written to `blog/<slug>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_links: Option<Vec<AuthorLink>>,
    pub excerpt: String,
    pub image: String,
    pub content: String,
    pub link: String,
}

impl ContentItem {
    /// Parses a Markdown document with frontmatter, applying the defaults for missing fields.
    pub fn from_document(slug: &str, link: String, document: &str) -> Self {
        let (frontmatter, body) = Frontmatter::from_document(document);
        let fields = EntryFields::from(&frontmatter);

        Self {
            slug: slug.to_string(),
            title: fields.title,
            date: fields.date,
            author: fields.author,
            author_links: frontmatter.author_links(),
            excerpt: fields.excerpt,
            image: fields.image,
            content: render_markdown(body),
            link,
        }
    }
}

/// A publication's optional long-form write-up, as written to `publications/<id>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tldr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl PublicationContent {
    pub fn from_document(document: &str) -> Self {
        let (frontmatter, body) = Frontmatter::from_document(document);
        Self {
            content: render_markdown(body),
            tldr: frontmatter.string("tldr"),
            keywords: frontmatter.string_list("keywords"),
        }
    }
}

/// Summary of an entry used by index pages. Built from frontmatter only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub slug: String,
    pub title: String,
    pub date: String,
    pub author: String,
    pub excerpt: String,
    pub image: String,
    pub link: String,
}

/// Frontmatter fields every entry has, with the defaults applied.
struct EntryFields {
    title: String,
    date: String,
    author: String,
    excerpt: String,
    image: String,
}

impl From<&Frontmatter> for EntryFields {
    fn from(frontmatter: &Frontmatter) -> Self {
        Self {
            title: frontmatter.string_or("title", DEFAULT_TITLE),
            date: frontmatter.string_or("date", DEFAULT_DATE),
            author: frontmatter.string_or("author", DEFAULT_AUTHOR),
            excerpt: frontmatter.string_or("excerpt", ""),
            image: frontmatter.string_or("image", ""),
        }
    }
}

/// A named directory of Markdown entries.
///
/// ## Example
/// ```rust
/// use labsite::content::ContentSource;
///
/// let blog = ContentSource::new("blog", "public/blog");
/// assert_eq!(blog.link("hello-world"), "/blog/hello-world");
/// ```
#[derive(Debug, Clone)]
pub struct ContentSource {
    pub name: String,
    pub dir: PathBuf,
}

impl ContentSource {
    pub fn new<N, P>(name: N, dir: P) -> Self
    where
        N: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }

    pub fn link(&self, slug: &str) -> String {
        format!("/{}/{}", self.name, slug)
    }

    pub fn entry_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}.md"))
    }

    /// Reads the raw document for `slug`. `Ok(None)` when the entry doesn't exist.
    pub fn read_raw(&self, slug: &str) -> Result<Option<String>, ContentError> {
        let path = self.entry_path(slug);
        if !path.is_file() {
            return Ok(None);
        }

        std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| ContentError::Read { path, source })
    }

    /// Loads and renders one entry.
    ///
    /// Missing entries and unreadable files both return `None`; the latter is logged.
    pub fn get_entry(&self, slug: &str) -> Option<ContentItem> {
        let document = match self.read_raw(slug) {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(target: "content", "{} entry '{}' not found", self.name, slug);
                return None;
            }
            Err(err) => {
                warn!(target: "content", "{}", describe(&err));
                return None;
            }
        };

        Some(ContentItem::from_document(slug, self.link(slug), &document))
    }

    /// Slugs of every `*.md` file in the directory, in file-name order. A missing directory has no entries.
    pub fn slugs(&self) -> Result<Vec<String>, ContentError> {
        if !self.dir.is_dir() {
            return Ok(vec![]);
        }

        let pattern = format!("{}/*.md", Pattern::escape(&self.dir.to_string_lossy()));
        let paths = glob_fs(&pattern).map_err(|source| ContentError::Pattern {
            path: self.dir.clone(),
            source,
        })?;

        let mut slugs = vec![];
        for path in paths {
            let path = match path {
                Ok(path) => path,
                Err(err) => {
                    warn!(target: "content", "Skipping unreadable path in {}: {}", self.dir.display(), err);
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            if let Some(slug) = slug_from_path(&path) {
                slugs.push(slug);
            }
        }

        Ok(slugs)
    }

    /// Lists every entry's summary, newest first. Bodies are not rendered.
    ///
    /// Entries with equal dates are ordered by slug. See [`newest_first`] for how unparseable dates are ordered.
    pub fn listing(&self) -> Vec<ListingEntry> {
        let slugs = match self.slugs() {
            Ok(slugs) => slugs,
            Err(err) => {
                warn!(target: "content", "{}", describe(&err));
                return vec![];
            }
        };

        let mut entries: Vec<ListingEntry> = slugs
            .into_iter()
            .filter_map(|slug| match self.read_raw(&slug) {
                Ok(Some(document)) => Some(self.listing_entry(slug, &document)),
                Ok(None) => None,
                Err(err) => {
                    warn!(target: "content", "{}", describe(&err));
                    None
                }
            })
            .collect();

        entries.sort_by(|a, b| newest_first(&a.date, &b.date).then_with(|| a.slug.cmp(&b.slug)));
        entries
    }

    fn listing_entry(&self, slug: String, document: &str) -> ListingEntry {
        let (raw, _) = split_frontmatter(document);
        let fields = EntryFields::from(&Frontmatter::parse(raw));

        ListingEntry {
            link: self.link(&slug),
            slug,
            title: fields.title,
            date: fields.date,
            author: fields.author,
            excerpt: fields.excerpt,
            image: fields.image,
        }
    }
}

fn slug_from_path(path: &Path) -> Option<String> {
    if path.extension()? != "md" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}
