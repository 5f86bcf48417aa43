//! Client-side routing: which page a pathname shows.
use crate::client::base_path::BasePath;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    About,
    Blog,
    BlogPost { slug: String },
    Talks,
    Publications,
    PublicationDetail { id: String },
    NotFound,
}

impl Page {
    /// Canonical path of the page, relative to the base path. `None` for [`Page::NotFound`].
    pub fn path(&self) -> Option<String> {
        let path = match self {
            Page::Home => "/".to_string(),
            Page::About => "/about".to_string(),
            Page::Blog => "/blog".to_string(),
            Page::BlogPost { slug } => format!("/blog/{slug}"),
            Page::Talks => "/talks".to_string(),
            Page::Publications => "/publications".to_string(),
            Page::PublicationDetail { id } => format!("/publications/{id}"),
            Page::NotFound => return None,
        };
        Some(path)
    }

    /// Path of the `index.html` the static host serves for this page, relative to the output directory.
    pub fn index_file(&self) -> Option<String> {
        let path = self.path()?;
        let directory = path.trim_matches('/');
        Some(if directory.is_empty() {
            "index.html".to_string()
        } else {
            format!("{directory}/index.html")
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Router {
    base: BasePath,
}

impl Router {
    pub fn new(base: BasePath) -> Self {
        Self { base }
    }

    /// A router whose base path is guessed from the pathname the app was loaded at.
    pub fn detect(initial_pathname: &str) -> Self {
        Self::new(BasePath::detect(initial_pathname))
    }

    pub fn base(&self) -> &BasePath {
        &self.base
    }

    pub fn resolve(&self, pathname: &str) -> Page {
        let pathname = pathname.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = self
            .base
            .strip(pathname)
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            [] => Page::Home,
            ["about"] => Page::About,
            ["blog"] => Page::Blog,
            ["blog", slug] => Page::BlogPost {
                slug: slug.to_string(),
            },
            ["talks"] => Page::Talks,
            ["publications"] => Page::Publications,
            ["publications", id] => Page::PublicationDetail { id: id.to_string() },
            _ => Page::NotFound,
        }
    }

    /// Full link to `page`, including the base path.
    pub fn href(&self, page: &Page) -> Option<String> {
        let path = page.path()?;
        Some(if self.base.is_root() {
            path
        } else if path == "/" {
            format!("{}/", self.base)
        } else {
            format!("{}{}", self.base, path)
        })
    }
}
