//! Frontmatter splitting and total parsing.
//!
//! A document starts with a frontmatter block when its first line is `---`. The block ends at the next line that is
//! exactly `---` or `...`. Everything after that line is the body. Documents without a closed block have no
//! frontmatter and the whole text is the body.
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Splits a Markdown document into its raw frontmatter (if any) and its body.
pub fn split_frontmatter(document: &str) -> (Option<&str>, &str) {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);

    let Some(first_line_end) = document.find('\n') else {
        return (None, document);
    };
    if document[..first_line_end].trim_end() != "---" {
        return (None, document);
    }

    let block_start = first_line_end + 1;
    let mut line_start = block_start;
    while line_start <= document.len() {
        let line_end = document[line_start..]
            .find('\n')
            .map(|offset| line_start + offset)
            .unwrap_or(document.len());
        let line = document[line_start..line_end].trim_end();

        if line == "---" || line == "..." {
            let body_start = (line_end + 1).min(document.len());
            return (
                Some(&document[block_start..line_start]),
                &document[body_start..],
            );
        }

        if line_end == document.len() {
            break;
        }
        line_start = line_end + 1;
    }

    (None, document)
}

/// A parsed frontmatter block. Parsing never fails: malformed YAML, or YAML that is not a mapping, yields an empty
/// record and every accessor falls back to its default.
#[derive(Debug, Clone, Default)]
pub struct Frontmatter {
    fields: Mapping,
}

impl Frontmatter {
    pub fn parse(raw: Option<&str>) -> Self {
        let fields = raw
            .and_then(|raw| match serde_yaml::from_str::<Value>(raw) {
                Ok(Value::Mapping(fields)) => Some(fields),
                Ok(_) => None,
                Err(err) => {
                    log::debug!(target: "content", "Ignoring malformed frontmatter: {}", err);
                    None
                }
            })
            .unwrap_or_default();

        Self { fields }
    }

    pub fn from_document(document: &str) -> (Self, &str) {
        let (raw, body) = split_frontmatter(document);
        (Self::parse(raw), body)
    }

    /// Returns a scalar field as a string. Empty strings and non-scalar values count as missing.
    pub fn string(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(scalar_to_string)
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    /// Returns a list of strings. A single scalar is treated as a one-element list.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.fields.get(key)? {
            Value::Sequence(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
            other => scalar_to_string(other).map(|value| vec![value]),
        }
    }

    pub fn author_links(&self) -> Option<Vec<AuthorLink>> {
        let value = self
            .fields
            .get("authorLinks")
            .or_else(|| self.fields.get("author_links"))?;

        match serde_yaml::from_value::<Vec<AuthorLink>>(value.clone()) {
            Ok(links) if !links.is_empty() => Some(links),
            _ => None,
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let value = match value {
        Value::String(value) => value.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Tagged(tagged) => return scalar_to_string(&tagged.value),
        _ => return None,
    };

    if value.is_empty() { None } else { Some(value) }
}

/// A named link to one of a post's authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorLink {
    pub name: String,
    pub url: String,
}
