//! Design document frontmatter parsing and editing
//!
//! Design documents carry a flat `key: value` header:
//!
//! ```markdown
//! ---
//! uuid: PROJ-SPEC-20250108-a7b3f2e1
//! version: 1
//! title: "Auth Service"
//! type: spec
//! status: draft
//! tags: ["auth", "jwt"]
//! supersedes: null
//! ---
//! ```
//!
//! The parser is deliberately lenient: agents write these headers by hand
//! and a stray line must not make a document unreadable. Field updates
//! rewrite single lines so the rest of the file stays byte-for-byte intact.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

const DELIMITER: &str = "---";

/// A single frontmatter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FmValue {
    Str(String),
    Int(u64),
    List(Vec<String>),
    Null,
}

impl FmValue {
    /// Parse a raw value the way the header is written
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.len() >= 2
            && ((raw.starts_with('"') && raw.ends_with('"')) || (raw.starts_with('\'') && raw.ends_with('\'')))
        {
            return FmValue::Str(raw[1..raw.len() - 1].to_string());
        }

        if raw.starts_with('[') && raw.ends_with(']') {
            let inner = &raw[1..raw.len() - 1];
            let items = inner
                .split(',')
                .map(|item| item.trim().trim_matches('"').trim_matches('\'').to_string())
                .filter(|item| !item.is_empty())
                .collect();
            return FmValue::List(items);
        }

        if raw.eq_ignore_ascii_case("null") {
            return FmValue::Null;
        }

        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && let Ok(n) = raw.parse::<u64>()
        {
            return FmValue::Int(n);
        }

        FmValue::Str(raw.to_string())
    }

    /// String form; lists and null yield None
    pub fn as_str(&self) -> Option<String> {
        match self {
            FmValue::Str(s) => Some(s.clone()),
            FmValue::Int(n) => Some(n.to_string()),
            FmValue::List(_) | FmValue::Null => None,
        }
    }

    /// True for null, empty strings and empty lists
    pub fn is_empty(&self) -> bool {
        match self {
            FmValue::Str(s) => s.is_empty(),
            FmValue::Int(_) => false,
            FmValue::List(items) => items.is_empty(),
            FmValue::Null => true,
        }
    }
}

impl fmt::Display for FmValue {
    /// Render as a frontmatter value (strings quoted)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmValue::Str(s) => write!(f, "\"{}\"", s),
            FmValue::Int(n) => write!(f, "{}", n),
            FmValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|i| format!("\"{}\"", i)).collect();
                write!(f, "[{}]", quoted.join(", "))
            }
            FmValue::Null => f.write_str("null"),
        }
    }
}

/// Free text made safe for a quoted single-line value
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").replace('"', "'")
}

/// Ordered frontmatter fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frontmatter {
    fields: IndexMap<String, FmValue>,
}

impl Frontmatter {
    /// Split content into frontmatter and body.
    ///
    /// Returns None when the content does not open with `---` or the block
    /// is never closed.
    pub fn parse(content: &str) -> Option<(Self, String)> {
        let (start, end) = block_bounds(content)?;
        let lines: Vec<&str> = content.split('\n').collect();

        let mut fields = IndexMap::new();
        for line in &lines[start..end] {
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                fields.insert(key.to_string(), FmValue::parse(value));
            }
        }

        let body = lines[end + 1..].join("\n");
        Some((Self { fields }, body))
    }

    pub fn get(&self, key: &str) -> Option<&FmValue> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(FmValue::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<u64> {
        match self.fields.get(key) {
            Some(FmValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// List field; a bare string becomes a one-element list
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(FmValue::List(items)) => items.clone(),
            Some(FmValue::Str(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Set a field, keeping its position when it already exists
    pub fn set(&mut self, key: &str, value: FmValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    /// Render including delimiters and trailing newline
    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        out.push_str("---\n");
        out
    }
}

/// Inputs for a freshly generated document header
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub uuid: &'a str,
    pub title: &'a str,
    pub doc_type: &'a str,
    pub status: &'a str,
    pub author: &'a str,
    pub date: &'a str,
    pub previous_version: Option<&'a str>,
}

/// Canonical header written for new documents
pub fn new_document(doc: &NewDocument<'_>) -> String {
    let previous = match doc.previous_version {
        Some(prev) => format!("\"{}\"", prev),
        None => "null".to_string(),
    };

    format!(
        "---\n\
         uuid: {uuid}\n\
         version: 1\n\
         title: \"{title}\"\n\
         type: {doc_type}\n\
         status: {status}\n\
         created: {date}\n\
         updated: {date}\n\
         author: \"{author}\"\n\
         related_issues: []\n\
         related_docs: []\n\
         supersedes: null\n\
         superseded_by: null\n\
         previous_version: {previous}\n\
         tags: []\n\
         ---\n",
        uuid = doc.uuid,
        title = doc.title,
        doc_type = doc.doc_type.to_lowercase(),
        status = doc.status,
        date = doc.date,
        author = doc.author,
        previous = previous,
    )
}

/// Replace `key:` inside the frontmatter block, or append it before the
/// closing delimiter. Content without a frontmatter block is returned as is.
///
/// `rendered` is written verbatim after `key: `.
pub fn set_field(content: &str, key: &str, rendered: &str) -> String {
    let Some((start, end)) = block_bounds(content) else {
        return content.to_string();
    };

    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let new_line = format!("{}: {}", key, rendered);

    let existing = (start..end).find(|&i| {
        lines[i]
            .split_once(':')
            .map(|(k, _)| k.trim() == key)
            .unwrap_or(false)
    });

    match existing {
        Some(i) => {
            let carriage = lines[i].ends_with('\r');
            lines[i] = if carriage { format!("{}\r", new_line) } else { new_line };
        }
        None => lines.insert(end, new_line),
    }

    lines.join("\n")
}

/// Read one field from raw content without keeping the parse
pub fn field(content: &str, key: &str) -> Option<String> {
    Frontmatter::parse(content).and_then(|(fm, _)| fm.get_str(key))
}

/// Raw header text and body, for headers that need a real YAML parser
pub fn split_raw(content: &str) -> Option<(String, String)> {
    let (start, end) = block_bounds(content)?;
    let lines: Vec<&str> = content.split('\n').collect();
    Some((lines[start..end].join("\n"), lines[end + 1..].join("\n")))
}

/// Line indices (first field line, closing delimiter line)
fn block_bounds(content: &str) -> Option<(usize, usize)> {
    if !content.starts_with(DELIMITER) {
        return None;
    }
    let end = content
        .split('\n')
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.trim() == DELIMITER)
        .map(|(i, _)| i)?;
    Some((1, end))
}
