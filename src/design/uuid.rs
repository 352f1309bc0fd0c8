//! Design document identifiers
//!
//! Format: `{PREFIX}-{TYPE}-{YYYYMMDD}-{uuid8}[_v{NNNN}]`, e.g.
//! `PROJ-SPEC-20250108-a7b3f2e1_v0002`. The eight hex characters come from
//! a random v4 UUID, which keeps identifiers unique without a counter file.

use chrono::NaiveDate;
use eyre::{Context, Result, bail};
use lazy_regex::{regex_captures, regex_is_match};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::frontmatter::{Frontmatter, NewDocument, new_document};
use super::{DocType, is_skipped_file};

/// A parsed design document identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocUuid {
    pub prefix: String,
    pub doc_type: String,
    pub date: String,
    pub short: String,
    pub version: Option<u32>,
}

impl DocUuid {
    /// Parse a UUID string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let (_, prefix, doc_type, date, short, version) =
            regex_captures!(r"(?i)^([A-Z]{2,6})-([A-Z]+)-(\d{8})-([a-f0-9]{8})(?:_v(\d{4}))?$", s.trim())?;

        Some(Self {
            prefix: prefix.to_uppercase(),
            doc_type: doc_type.to_uppercase(),
            date: date.to_string(),
            short: short.to_lowercase(),
            version: version.parse().ok(),
        })
    }

    /// Generate a fresh identifier; the prefix must be 2-6 ASCII letters
    pub fn generate(prefix: &str, doc_type: DocType, date: NaiveDate) -> Result<Self> {
        let prefix = check_prefix(prefix)?;
        let short = ::uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Ok(Self {
            prefix,
            doc_type: doc_type.tag().to_string(),
            date: date.format("%Y%m%d").to_string(),
            short,
            version: None,
        })
    }

    /// Identifier without the version suffix
    pub fn base(&self) -> String {
        format!("{}-{}-{}-{}", self.prefix, self.doc_type, self.date, self.short)
    }
}

impl fmt::Display for DocUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}_v{:04}", self.base(), v),
            None => f.write_str(&self.base()),
        }
    }
}

/// Upper-cased prefix, or an error when it is not 2-6 ASCII letters
pub fn check_prefix(prefix: &str) -> Result<String> {
    let prefix = prefix.trim();
    if !regex_is_match!(r"^[A-Za-z]{2,6}$", prefix) {
        bail!("Invalid UUID prefix '{}': use 2 to 6 letters (e.g. PROJ, AUTH)", prefix);
    }
    Ok(prefix.to_uppercase())
}

/// Check the identifier shape without building a DocUuid
pub fn is_valid(s: &str) -> bool {
    DocUuid::parse(s).is_some()
}

/// Remove a trailing `_vNNNN`
pub fn strip_version(s: &str) -> String {
    lazy_regex::regex!(r"_v\d{4}$").replace(s.trim(), "").to_string()
}

/// Version number from a trailing `_vNNNN`
pub fn version_of(s: &str) -> Option<u32> {
    regex_captures!(r"_v(\d{4})$", s.trim()).and_then(|(_, v)| v.parse().ok())
}

/// Format a versioned identifier
pub fn versioned(base: &str, version: u32) -> String {
    format!("{}_v{:04}", strip_version(base), version)
}

/// Next free versioned identifier for `base`.
///
/// Every markdown file under `design_root` is scanned for `base_vNNNN`, so
/// versions referenced only from other documents still count.
pub fn next_version(base: &str, design_root: &Path) -> Result<String> {
    let base = match DocUuid::parse(base) {
        Some(parsed) => parsed.base(),
        None => strip_version(base),
    };

    let pattern = regex::Regex::new(&format!(r"{}_v(\d{{4}})", regex::escape(&base)))
        .context("Failed to build version pattern")?;

    let mut highest = 0;
    for path in markdown_files(design_root) {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        for caps in pattern.captures_iter(&content) {
            if let Ok(v) = caps[1].parse::<u32>() {
                highest = highest.max(v);
            }
        }
    }

    Ok(versioned(&base, highest + 1))
}

/// Outcome of stamping a file with frontmatter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stamp {
    Added { path: PathBuf, uuid: String },
    Skipped { path: PathBuf, uuid: String },
}

impl Stamp {
    pub fn uuid(&self) -> &str {
        match self {
            Stamp::Added { uuid, .. } | Stamp::Skipped { uuid, .. } => uuid,
        }
    }
}

/// Options shared by single-file and directory stamping
#[derive(Debug, Clone)]
pub struct StampOptions<'a> {
    pub doc_type: DocType,
    pub prefix: &'a str,
    pub author: &'a str,
    pub date: NaiveDate,
    pub force: bool,
}

/// Add a generated header to a markdown file
pub fn stamp_file(path: &Path, opts: &StampOptions<'_>) -> Result<Stamp> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let (existing, body) = match Frontmatter::parse(&content) {
        Some((fm, body)) => (Some(fm), body),
        None => (None, content.clone()),
    };

    if let Some(uuid) = existing.as_ref().and_then(|fm| fm.get_str("uuid"))
        && !opts.force
    {
        log::info!("{} already has UUID {}", path.display(), uuid);
        return Ok(Stamp::Skipped {
            path: path.to_path_buf(),
            uuid,
        });
    }

    let uuid = DocUuid::generate(opts.prefix, opts.doc_type, opts.date)?.to_string();
    let title = title_for(&body, path);
    let date = opts.date.format("%Y-%m-%d").to_string();

    let header = new_document(&NewDocument {
        uuid: &uuid,
        title: &title,
        doc_type: opts.doc_type.tag(),
        status: "draft",
        author: opts.author,
        date: &date,
        previous_version: None,
    });

    let new_content = format!("{}\n{}", header, body.trim_start());
    fs::write(path, new_content).with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Stamped {} with {}", path.display(), uuid);
    Ok(Stamp::Added {
        path: path.to_path_buf(),
        uuid,
    })
}

/// Stamp every markdown file under a directory
pub fn stamp_dir(dir: &Path, opts: &StampOptions<'_>) -> Result<Vec<Stamp>> {
    if !dir.is_dir() {
        bail!("Directory not found: {}", dir.display());
    }
    check_prefix(opts.prefix)?;

    let mut stamps = Vec::new();
    for path in markdown_files(dir) {
        let skip = path
            .file_name()
            .map(|n| is_skipped_file(&n.to_string_lossy()))
            .unwrap_or(false);
        if skip {
            continue;
        }
        stamps.push(stamp_file(&path, opts)?);
    }
    Ok(stamps)
}

/// Every UUID declared in a frontmatter under the design root
pub fn list_uuids(design_root: &Path) -> Vec<(String, PathBuf)> {
    markdown_files(design_root)
        .into_iter()
        .filter_map(|path| {
            let content = fs::read_to_string(&path).ok()?;
            let (fm, _) = Frontmatter::parse(&content)?;
            fm.get_str("uuid").map(|uuid| (uuid, path))
        })
        .collect()
}

/// Title from the first `# ` heading, else from the file name
pub fn title_for(body: &str, path: &Path) -> String {
    for line in body.lines() {
        if let Some(heading) = line.strip_prefix("# ") {
            let heading = heading.trim();
            if !heading.is_empty() {
                return heading.to_string();
            }
        }
    }

    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Sorted markdown files below `root` (empty when root is missing)
pub fn markdown_files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!("Error walking directory: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|ext| ext == "md").unwrap_or(false))
        .collect();
    files.sort();
    files
}
