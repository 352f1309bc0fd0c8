//! Filesystem-backed design document store
//!
//! There is no index: the directory layout is the index and each query
//! walks it. Only the first 4 KiB of a file is read to extract metadata.

use eyre::{Result, bail};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::frontmatter::Frontmatter;
use super::uuid::{markdown_files, strip_version};
use super::{DocType, TYPE_DIRS};
use crate::config::ProjectConfig;

const METADATA_BYTES: u64 = 4096;

/// Frontmatter summary of a design document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub path: PathBuf,
    pub uuid: String,
    pub version: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub status: String,
    pub created: String,
    pub updated: String,
    pub author: String,
    pub tags: Vec<String>,
    pub related_issues: Vec<String>,
    pub related_docs: Vec<String>,
    pub supersedes: Option<String>,
    pub superseded_by: Option<String>,
    pub previous_version: Option<String>,
}

impl DocumentMetadata {
    /// Read metadata from the head of a file.
    ///
    /// Returns None for unreadable files and files without frontmatter.
    pub fn read(path: &Path) -> Option<Self> {
        let mut head = Vec::new();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                log::debug!("Cannot open {}: {}", path.display(), e);
                return None;
            }
        };
        if let Err(e) = file.take(METADATA_BYTES).read_to_end(&mut head) {
            log::debug!("Cannot read {}: {}", path.display(), e);
            return None;
        }
        Self::from_content(path, &String::from_utf8_lossy(&head))
    }

    pub fn from_content(path: &Path, content: &str) -> Option<Self> {
        let (fm, _) = Frontmatter::parse(content)?;
        if fm.keys().next().is_none() {
            return None;
        }

        let text = |key: &str| fm.get_str(key).unwrap_or_default();

        Some(Self {
            path: path.to_path_buf(),
            uuid: text("uuid"),
            version: fm.get_int("version").unwrap_or(1),
            title: text("title"),
            doc_type: text("type").to_uppercase(),
            status: text("status"),
            created: text("created"),
            updated: text("updated"),
            author: text("author"),
            tags: fm.get_list("tags"),
            related_issues: fm.get_list("related_issues"),
            related_docs: fm.get_list("related_docs"),
            supersedes: fm.get_str("supersedes"),
            superseded_by: fm.get_str("superseded_by"),
            previous_version: fm.get_str("previous_version"),
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn has_issue(&self, issue: &str) -> bool {
        let wanted = issue.trim_start_matches('#');
        self.related_issues.iter().any(|i| i.trim_start_matches('#') == wanted)
    }
}

/// Search criteria; see [`DesignStore::search`] for precedence
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub uuid: Option<String>,
    pub uuid_prefix: Option<String>,
    pub doc_type: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub issue: Option<String>,
    pub text: Option<String>,
}

/// Design documents of one project
#[derive(Debug, Clone)]
pub struct DesignStore {
    project_root: PathBuf,
    design_root: PathBuf,
}

impl DesignStore {
    pub fn new(project_root: impl Into<PathBuf>, design_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            design_root: design_root.into(),
        }
    }

    /// Store for a project, using its patterns.md settings
    pub fn open(project_root: &Path, project: &ProjectConfig) -> Self {
        Self::new(project_root, project.design_root(project_root))
    }

    pub fn design_root(&self) -> &Path {
        &self.design_root
    }

    pub fn exists(&self) -> bool {
        self.design_root.is_dir()
    }

    /// Every document under the design root
    pub fn all(&self) -> Vec<DocumentMetadata> {
        markdown_files(&self.design_root)
            .iter()
            .filter_map(|p| DocumentMetadata::read(p))
            .collect()
    }

    /// Documents matching a UUID.
    ///
    /// With `all_versions`, `_vNNNN` suffixes are ignored on both sides. A
    /// typed UUID only looks in that type's directory.
    pub fn by_uuid(&self, uuid: &str, all_versions: bool) -> Vec<DocumentMetadata> {
        let dirs: Vec<PathBuf> = match DocType::from_uuid(uuid) {
            Some(t) => vec![self.design_root.join(t.dir())],
            None => TYPE_DIRS
                .iter()
                .map(|d| self.design_root.join(d))
                .chain(std::iter::once(self.design_root.clone()))
                .collect(),
        };

        let base = strip_version(uuid);
        let mut results = Vec::new();
        for dir in dirs {
            for path in shallow_markdown_files(&dir) {
                let Some(meta) = DocumentMetadata::read(&path) else {
                    continue;
                };
                if meta.uuid.is_empty() {
                    continue;
                }
                let matched = if all_versions {
                    strip_version(&meta.uuid).eq_ignore_ascii_case(&base)
                } else {
                    meta.uuid.eq_ignore_ascii_case(uuid.trim())
                };
                if matched {
                    results.push(meta);
                }
            }
        }
        results
    }

    /// Documents of a type; the type directory serves as the index
    pub fn by_type(&self, doc_type: &str) -> Vec<DocumentMetadata> {
        match doc_type.parse::<DocType>() {
            Ok(t) => shallow_markdown_files(&self.design_root.join(t.dir()))
                .iter()
                .filter_map(|p| DocumentMetadata::read(p))
                .collect(),
            Err(_) => self
                .all()
                .into_iter()
                .filter(|m| m.doc_type.eq_ignore_ascii_case(doc_type))
                .collect(),
        }
    }

    pub fn by_status(&self, status: &str) -> Vec<DocumentMetadata> {
        self.all()
            .into_iter()
            .filter(|m| m.status.eq_ignore_ascii_case(status))
            .collect()
    }

    pub fn by_tag(&self, tag: &str) -> Vec<DocumentMetadata> {
        self.all().into_iter().filter(|m| m.has_tag(tag)).collect()
    }

    pub fn by_issue(&self, issue: &str) -> Vec<DocumentMetadata> {
        self.all().into_iter().filter(|m| m.has_issue(issue)).collect()
    }

    /// Case-insensitive substring search over whole files
    pub fn by_text(&self, query: &str) -> Vec<DocumentMetadata> {
        let needle = query.to_lowercase();
        markdown_files(&self.design_root)
            .iter()
            .filter(|p| match fs::read_to_string(p) {
                Ok(content) => content.to_lowercase().contains(&needle),
                Err(e) => {
                    log::debug!("Skipping {}: {}", p.display(), e);
                    false
                }
            })
            .filter_map(|p| DocumentMetadata::read(p))
            .collect()
    }

    /// Run a query.
    ///
    /// One primary strategy is chosen in the order uuid, uuid_prefix, issue,
    /// text, type, everything; type, status and tag then narrow the result.
    pub fn search(&self, query: &SearchQuery) -> Vec<DocumentMetadata> {
        let results = if let Some(uuid) = &query.uuid {
            self.by_uuid(uuid, false)
        } else if let Some(prefix) = &query.uuid_prefix {
            self.by_uuid(prefix, true)
        } else if let Some(issue) = &query.issue {
            self.by_issue(issue)
        } else if let Some(text) = &query.text {
            self.by_text(text)
        } else if let Some(doc_type) = &query.doc_type {
            self.by_type(doc_type)
        } else if let Some(status) = &query.status {
            self.by_status(status)
        } else {
            self.all()
        };

        log::debug!("Search {:?} matched {} documents before filters", query, results.len());

        results
            .into_iter()
            .filter(|m| query.doc_type.as_ref().is_none_or(|t| m.doc_type.eq_ignore_ascii_case(t)))
            .filter(|m| query.status.as_ref().is_none_or(|s| m.status.eq_ignore_ascii_case(s)))
            .filter(|m| query.tag.as_ref().is_none_or(|t| m.has_tag(t)))
            .collect()
    }

    /// The single document carrying exactly this UUID
    pub fn find(&self, uuid: &str) -> Result<DocumentMetadata> {
        let mut found = self.by_uuid(uuid, false);
        if found.is_empty() {
            // Typed UUIDs filed in the wrong directory still resolve
            found = self
                .all()
                .into_iter()
                .filter(|m| m.uuid.eq_ignore_ascii_case(uuid.trim()))
                .collect();
        }

        match found.len() {
            0 => bail!("Document not found: {}", uuid),
            1 => Ok(found.remove(0)),
            n => {
                log::warn!("{} documents share UUID {}, using {}", n, uuid, found[0].path.display());
                Ok(found.remove(0))
            }
        }
    }

    /// Path relative to the project root, for display
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.project_root).unwrap_or(path)
    }
}

/// Sorted `*.md` files directly inside `dir`
fn shallow_markdown_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map(|ext| ext == "md").unwrap_or(false))
        .collect();
    files.sort();
    files
}
