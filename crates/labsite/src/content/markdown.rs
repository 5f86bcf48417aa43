use pulldown_cmark::{CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream};

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_GFM,
    );
    options
}

/// Render a Markdown body (frontmatter already removed) to HTML.
///
/// Uses the GitHub-flavored dialect the site's content is written in: tables, strikethrough, task lists, footnotes,
/// alert blockquotes and bare-URL autolinks. Single newlines inside a paragraph are kept as `<br />`.
///
/// ## Example
/// ```rust
/// use labsite::content::render_markdown;
///
/// let html = render_markdown("first line\nsecond line");
/// assert_eq!(html, "<p>first line<br />\nsecond line</p>\n");
/// ```
pub fn render_markdown(body: &str) -> String {
    let mut events = Vec::new();
    let mut in_code_block = false;
    let mut link_depth = 0usize;

    for event in TextMergeStream::new(Parser::new_ext(body, markdown_options())) {
        match &event {
            Event::SoftBreak => {
                events.push(Event::HardBreak);
                continue;
            }
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) => link_depth += 1,
            Event::End(TagEnd::Link | TagEnd::Image) => link_depth = link_depth.saturating_sub(1),
            Event::Text(text) if !in_code_block && link_depth == 0 => {
                if let Some(linked) = autolink(text) {
                    events.extend(linked);
                    continue;
                }
            }
            _ => {}
        }
        events.push(event);
    }

    let mut html_output = String::with_capacity(body.len() + body.len() / 2);
    pulldown_cmark::html::push_html(&mut html_output, events.into_iter());
    html_output
}

const URL_PREFIXES: &[&str] = &["https://", "http://", "www."];

/// Splits `text` around the bare URLs it contains. `None` when there are none.
fn autolink(text: &str) -> Option<Vec<Event<'static>>> {
    let mut events = Vec::new();
    let mut plain_start = 0;

    while let Some((start, end)) = find_url(text, plain_start) {
        if start > plain_start {
            events.push(Event::Text(CowStr::from(text[plain_start..start].to_string())));
        }

        let url = &text[start..end];
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };

        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(href),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(CowStr::from(url.to_string())));
        events.push(Event::End(TagEnd::Link));
        plain_start = end;
    }

    if events.is_empty() {
        return None;
    }
    if plain_start < text.len() {
        events.push(Event::Text(CowStr::from(text[plain_start..].to_string())));
    }
    Some(events)
}

/// Byte range of the next URL in `text` at or after `from`.
///
/// A URL starts at a word boundary and runs until whitespace or `<`. Trailing punctuation and unbalanced closing
/// parentheses are not part of it.
fn find_url(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;

    loop {
        let (start, prefix) = URL_PREFIXES
            .iter()
            .filter_map(|prefix| text[search..].find(prefix).map(|i| (search + i, *prefix)))
            .min_by_key(|(start, _)| *start)?;

        let at_boundary = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || "(*_~\"'".contains(c));

        let tail = &text[start..];
        let mut end = start + tail.find(|c: char| c.is_whitespace() || c == '<').unwrap_or(tail.len());
        while let Some(last) = text[start..end].chars().next_back() {
            let url = &text[start..end];
            let unbalanced = last == ')' && url.matches(')').count() > url.matches('(').count();
            if "?!.,:;*_~'\"".contains(last) || unbalanced {
                end -= last.len_utf8();
            } else {
                break;
            }
        }

        let host_start = start + prefix.len();
        let has_host = end > host_start
            && text[host_start..end]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric());
        if at_boundary && has_host {
            return Some((start, end));
        }
        search = start + prefix.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_breaks_are_preserved() {
        let html = render_markdown("Hello\nWorld");
        assert!(html.contains("Hello<br />"));
        assert!(html.contains("World"));
    }

    #[test]
    fn test_gfm_extensions() {
        let html = render_markdown(
            "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n\n- [x] done\n",
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_headings_and_emphasis() {
        let html = render_markdown("# Title\n\nSome **bold** text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_bare_urls_are_linked() {
        assert_eq!(
            render_markdown("See https://example.com for details."),
            "<p>See <a href=\"https://example.com\">https://example.com</a> for details.</p>\n"
        );
        assert_eq!(
            render_markdown("Read https://example.com/paper."),
            "<p>Read <a href=\"https://example.com/paper\">https://example.com/paper</a>.</p>\n"
        );
        assert_eq!(
            render_markdown("Visit www.example.org"),
            "<p>Visit <a href=\"http://www.example.org\">www.example.org</a></p>\n"
        );
    }

    #[test]
    fn test_bare_url_in_parentheses() {
        assert_eq!(
            render_markdown("(see https://example.com)"),
            "<p>(see <a href=\"https://example.com\">https://example.com</a>)</p>\n"
        );
    }

    #[test]
    fn test_urls_in_code_and_links_are_left_alone() {
        let html = render_markdown("`https://a.example`\n\n```\nhttps://b.example\n```\n\n[site](https://c.example)");

        assert!(html.contains("<code>https://a.example</code>"));
        assert!(html.contains("<pre><code>https://b.example\n</code></pre>"));
        assert!(html.contains("<a href=\"https://c.example\">site</a>"));
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn test_words_containing_prefixes_are_not_linked() {
        let html = render_markdown("nothttps://example.com and www. alone");
        assert!(!html.contains("<a "));
    }
}
