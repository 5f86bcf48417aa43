//! Sitemap generation for the static routes and every blog post.
use chrono::NaiveDate;

use crate::content::{ListingEntry, parse_date};

/// Change frequency values for sitemap entries.
///
/// See: https://www.sitemaps.org/protocol.html#changefreqdef for more details.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    fn as_str(&self) -> &str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

/// A top-level page of the site and how it is advertised in the sitemap.
#[derive(Debug, Clone, Copy)]
pub struct StaticRoute {
    pub path: &'static str,
    pub changefreq: ChangeFreq,
    pub priority: f32,
}

pub const STATIC_ROUTES: &[StaticRoute] = &[
    StaticRoute {
        path: "/",
        changefreq: ChangeFreq::Weekly,
        priority: 1.0,
    },
    StaticRoute {
        path: "/about/",
        changefreq: ChangeFreq::Monthly,
        priority: 0.8,
    },
    StaticRoute {
        path: "/blog/",
        changefreq: ChangeFreq::Weekly,
        priority: 0.9,
    },
    StaticRoute {
        path: "/publications/",
        changefreq: ChangeFreq::Monthly,
        priority: 0.9,
    },
    StaticRoute {
        path: "/talks/",
        changefreq: ChangeFreq::Monthly,
        priority: 0.8,
    },
];

const POST_CHANGEFREQ: ChangeFreq = ChangeFreq::Yearly;
const POST_PRIORITY: f32 = 0.6;

/// Represents a single URL entry in the sitemap.
#[derive(Debug)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f32>,
}

impl SitemapEntry {
    fn to_xml(&self) -> String {
        let mut xml = String::from("<url>");
        xml.push_str(&format!("<loc>{}</loc>", escape_xml(&self.loc)));

        if let Some(ref lastmod) = self.lastmod {
            xml.push_str(&format!("<lastmod>{}</lastmod>", escape_xml(lastmod)));
        }

        if let Some(changefreq) = self.changefreq {
            xml.push_str(&format!("<changefreq>{}</changefreq>", changefreq.as_str()));
        }

        if let Some(priority) = self.priority {
            xml.push_str(&format!("<priority>{:.1}</priority>", priority));
        }

        xml.push_str("</url>");
        xml
    }
}

/// Escapes XML special characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Resolves a stylesheet path to a full URL.
/// If the path starts with http:// or https://, it's used as-is.
/// Otherwise, it's appended to the base URL.
fn resolve_stylesheet_url(base_url: &str, stylesheet_path: &str) -> String {
    if stylesheet_path.starts_with("http://") || stylesheet_path.starts_with("https://") {
        stylesheet_path.to_string()
    } else {
        format!("{}{}", base_url.trim_end_matches('/'), stylesheet_path)
    }
}

fn absolute_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Builds the sitemap entries: every static route first, then one entry per blog post in listing order.
///
/// A post's `lastmod` is its own date when it parses, otherwise `today`.
pub fn sitemap_entries(posts: &[ListingEntry], base_url: &str, today: NaiveDate) -> Vec<SitemapEntry> {
    let today = today.format("%Y-%m-%d").to_string();

    let static_entries = STATIC_ROUTES.iter().map(|route| SitemapEntry {
        loc: absolute_url(base_url, route.path),
        lastmod: Some(today.clone()),
        changefreq: Some(route.changefreq),
        priority: Some(route.priority),
    });

    let post_entries = posts.iter().map(|post| SitemapEntry {
        loc: absolute_url(base_url, &format!("{}/", post.link)),
        lastmod: Some(
            parse_date(&post.date)
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| today.clone()),
        ),
        changefreq: Some(POST_CHANGEFREQ),
        priority: Some(POST_PRIORITY),
    });

    static_entries.chain(post_entries).collect()
}

/// Renders a `<urlset>` document.
pub fn render_sitemap(entries: &[SitemapEntry], base_url: &str, stylesheet: Option<&str>) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

    if let Some(stylesheet_path) = stylesheet {
        let stylesheet_url = resolve_stylesheet_url(base_url, stylesheet_path);
        xml.push_str(&format!(
            "<?xml-stylesheet type=\"text/xsl\" href=\"{}\"?>\n",
            escape_xml(&stylesheet_url)
        ));
    }

    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");

    for entry in entries {
        xml.push_str("  ");
        xml.push_str(&entry.to_xml());
        xml.push('\n');
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Sitemap for the whole site. Pure: depends only on the blog listing, the base URL and the date passed in.
pub fn build_sitemap(
    posts: &[ListingEntry],
    base_url: &str,
    today: NaiveDate,
    stylesheet: Option<&str>,
) -> String {
    render_sitemap(&sitemap_entries(posts, base_url, today), base_url, stylesheet)
}
