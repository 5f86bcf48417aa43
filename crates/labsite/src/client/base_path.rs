use std::fmt;

/// First path segments that belong to the site's own routes, and therefore never name a deployment sub-directory.
pub const RESERVED_SEGMENTS: &[&str] = &["about", "blog", "blogs", "talks", "publications"];

/// URL prefix the site is served under, e.g. `/lab` for `https://example.org/lab/`. Empty at the domain root.
///
/// ## Example
/// ```rust
/// use labsite::client::BasePath;
///
/// let base = BasePath::detect("/lab/blog/hello");
/// assert_eq!(base.as_str(), "/lab");
/// assert_eq!(base.asset_path("/data/people.json"), "/lab/data/people.json");
///
/// let root = BasePath::detect("/blog/hello");
/// assert_eq!(root.asset_path("data/people.json"), "/data/people.json");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BasePath(String);

impl BasePath {
    /// Guesses the prefix from the current pathname: a first segment that isn't one of [`RESERVED_SEGMENTS`] is taken
    /// to be the deployment directory.
    ///
    /// This misfires both ways. A site deployed under `/blog/` is treated as a root deployment, and an unknown path on
    /// a root deployment (`/unknown`) becomes a base path. Prefer [`BasePath::explicit`] when the prefix is known at
    /// build time.
    pub fn detect(pathname: &str) -> Self {
        match pathname.split('/').find(|segment| !segment.is_empty()) {
            Some(segment) if !RESERVED_SEGMENTS.contains(&segment) => Self(format!("/{segment}")),
            _ => Self::root(),
        }
    }

    /// A known prefix. Surrounding slashes are normalized away, so `"lab"`, `"/lab"` and `"/lab/"` are equivalent.
    pub fn explicit(prefix: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            Self::root()
        } else {
            Self(format!("/{prefix}"))
        }
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of a site asset under this base path.
    pub fn asset_path(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }

    /// `pathname` with this base path removed, always starting with `/`. Pathnames outside the base path are returned
    /// unchanged.
    pub fn strip<'a>(&self, pathname: &'a str) -> &'a str {
        if self.is_root() {
            return pathname;
        }

        match pathname.strip_prefix(self.0.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => pathname,
        }
    }
}

impl fmt::Display for BasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
