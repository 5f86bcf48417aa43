#![cfg(unix)]

use std::fs;
use std::path::Path;

use labsite::{
    BuildOptions, BundlerOptions, publish,
    client::{BasePath, Page, Router},
    content::ContentItem,
    errors::BuildError,
};
use tempfile::{TempDir, tempdir};

const SHELL: &str = "<!doctype html><html><body><div id=\"root\"></div></body></html>";

/// A bundler that writes the SPA shell, like `npm run build-vite` would.
fn fake_bundler(script: &str) -> BundlerOptions {
    BundlerOptions {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        ..Default::default()
    }
}

fn site() -> (TempDir, BuildOptions) {
    let dir = tempdir().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("public/blog")).unwrap();
    fs::create_dir_all(root.join("public/data")).unwrap();
    fs::write(
        root.join("public/blog/first-post.md"),
        "---\ntitle: Hello\ndate: 2024-01-01\nauthor: Ada\nexcerpt: The first one\n---\nFirst line\nSecond line\n",
    )
    .unwrap();
    fs::write(
        root.join("public/blog/second-post.md"),
        "---\ntitle: World\ndate: 2024-06-01\n---\n# Heading\n",
    )
    .unwrap();
    fs::write(
        root.join("public/data/publications.json"),
        r#"[{"id": "p1", "title": "Linked", "link": "https://example.com"}, {"id": "p2", "title": "Local"}]"#,
    )
    .unwrap();
    fs::write(root.join("public/data/people.json"), r#"{"faculty": [{"id": "ada"}]}"#).unwrap();

    let mut options = BuildOptions::with_root(root);
    options.bundler = fake_bundler(&format!("mkdir -p dist && printf '{SHELL}' > dist/index.html"));
    (dir, options)
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("{}: {}", path.display(), err))
}

#[test]
fn builds_blog_posts() {
    let (_dir, options) = site();
    publish(&options).unwrap();
    let dist = options.output_dir();

    for path in [
        "blog/first-post.json",
        "blog/first-post/index.html",
        "blog/second-post.json",
        "blog/second-post/index.html",
    ] {
        assert!(dist.join(path).is_file(), "{path} should exist");
    }

    let post: ContentItem = serde_json::from_str(&read(&dist.join("blog/first-post.json"))).unwrap();
    assert_eq!(post.title, "Hello");
    assert_eq!(post.date, "2024-01-01");
    assert_eq!(post.author, "Ada");
    assert_eq!(post.excerpt, "The first one");
    assert_eq!(post.content, "<p>First line<br />\nSecond line</p>\n");
    assert_eq!(post.link, "/blog/first-post");

    // No blogs.json in the data directory, so one is generated from the listing.
    let listing: serde_json::Value = serde_json::from_str(&read(&dist.join("data/blogs.json"))).unwrap();
    let slugs: Vec<_> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, ["second-post", "first-post"]);
}

#[test]
fn builds_publication_pages() {
    let (_dir, options) = site();
    publish(&options).unwrap();
    let dist = options.output_dir();

    let redirect = read(&dist.join("publications/p1/index.html"));
    assert!(redirect.contains(r#"http-equiv="refresh""#));
    assert!(redirect.contains("url=https://example.com"));

    assert_eq!(
        fs::read(dist.join("publications/p2/index.html")).unwrap(),
        fs::read(dist.join("index.html")).unwrap()
    );
    assert!(!dist.join("publications/p2.json").exists());
}

#[test]
fn skips_missing_data_files() {
    let (_dir, options) = site();
    let output = publish(&options).unwrap();
    let dist = options.output_dir();

    assert!(dist.join("data/people.json").is_file());
    assert!(!dist.join("data/talks.json").exists());
    assert!(output.skipped.contains(&options.data_dir().join("talks.json")));
    assert!(output.failures.is_empty());
}

#[test]
fn writes_route_shells_and_sitemap() {
    let (_dir, options) = site();
    publish(&options).unwrap();
    let dist = options.output_dir();

    for route in ["about", "publications", "talks", "blog"] {
        assert_eq!(read(&dist.join(route).join("index.html")), SHELL);
    }

    let sitemap = read(&dist.join("sitemap.xml"));
    assert_eq!(sitemap.matches("<url>").count(), 5 + 2);
    assert!(sitemap.contains("<loc>http://localhost:8000/blog/second-post/</loc>"));
    assert!(sitemap.contains("<lastmod>2024-06-01</lastmod>"));
}

#[test]
fn every_routed_page_has_an_index_file() {
    let (_dir, options) = site();
    publish(&options).unwrap();
    let dist = options.output_dir();
    let router = Router::new(BasePath::root());

    for href in [
        "/",
        "/about",
        "/blog",
        "/blog/first-post",
        "/blog/second-post/",
        "/talks",
        "/publications",
        "/publications/p1",
        "/publications/p2",
    ] {
        let page = router.resolve(href);
        assert_ne!(page, Page::NotFound, "{href}");
        let index = page.index_file().unwrap();
        assert!(dist.join(&index).is_file(), "{index} should exist for {href}");
    }
}

#[test]
fn cleans_the_output_directory() {
    let (_dir, options) = site();
    let stale = options.output_dir().join("blog/deleted-post.json");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "{}").unwrap();

    publish(&options).unwrap();
    assert!(!stale.exists());
}

#[test]
fn emits_publication_write_ups() {
    let (_dir, options) = site();
    fs::create_dir_all(options.publications_dir()).unwrap();
    fs::write(
        options.publications_dir().join("p2.md"),
        "---\ntldr: In short\nkeywords: [a, b]\n---\nDetails.\n",
    )
    .unwrap();

    publish(&options).unwrap();

    let write_up: serde_json::Value =
        serde_json::from_str(&read(&options.output_dir().join("publications/p2.json"))).unwrap();
    assert_eq!(write_up["tldr"], "In short");
    assert_eq!(write_up["keywords"], serde_json::json!(["a", "b"]));
    assert_eq!(write_up["content"], "<p>Details.</p>\n");
}

#[test]
fn bundler_failure_is_fatal() {
    let (_dir, mut options) = site();
    options.bundler = fake_bundler("exit 1");

    let result = publish(&options);
    assert!(matches!(result, Err(BuildError::BundlerFailed { .. })));
    assert!(!options.output_dir().join("blog").exists());
}

#[test]
fn missing_shell_is_fatal() {
    let (_dir, mut options) = site();
    options.bundler = fake_bundler("true");

    let result = publish(&options);
    assert!(matches!(result, Err(BuildError::MissingShell { .. })));
}
