//! Status transitions, archiving and supersession
//!
//! Every operation resolves documents through the store, checks what it
//! needs up front, then rewrites single frontmatter lines.

use chrono::NaiveDate;
use eyre::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::Status;
use super::frontmatter::{field, set_field, single_line};
use super::store::{DesignStore, DocumentMetadata};
use super::uuid::{strip_version, version_of};

/// Result of a status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub path: PathBuf,
    pub from: Option<String>,
    pub to: Status,
}

/// Move a document to a new status.
///
/// The transition table applies unless `force` is set or the document has
/// no status yet.
pub fn update_status(
    store: &DesignStore,
    uuid: &str,
    target: Status,
    force: bool,
    today: NaiveDate,
) -> Result<StatusChange> {
    let doc = store.find(uuid)?;
    let content = read(&doc.path)?;

    let current = field(&content, "status").map(|s| s.to_lowercase());
    if let Some(current) = current.as_deref().filter(|s| !s.is_empty()) {
        let allowed: Vec<&str> = match current.parse::<Status>() {
            Ok(status) => status.allowed_targets().iter().map(Status::as_str).collect(),
            Err(_) => Vec::new(),
        };
        if !force && !allowed.contains(&target.as_str()) {
            let allowed = if allowed.is_empty() {
                "none (terminal)".to_string()
            } else {
                allowed.join(", ")
            };
            bail!(
                "Invalid transition: {} -> {} (allowed from '{}': {}; use --force to override)",
                current,
                target,
                current,
                allowed
            );
        }
    }

    let updated = set_field(&content, "status", target.as_str());
    let updated = set_field(&updated, "updated", &today.format("%Y-%m-%d").to_string());
    write(&doc.path, &updated)?;

    log::info!("Status of {}: {:?} -> {}", uuid, current, target);
    Ok(StatusChange {
        path: doc.path,
        from: current,
        to: target,
    })
}

/// Mark a document archived and move it under `<design_root>/archive/`
pub fn archive(
    store: &DesignStore,
    uuid: &str,
    reason: Option<&str>,
    superseded_by: Option<&str>,
    today: NaiveDate,
) -> Result<PathBuf> {
    let doc = store.find(uuid)?;
    let content = read(&doc.path)?;

    let mut updated = set_field(&content, "status", Status::Archived.as_str());
    updated = set_field(&updated, "updated", &today.format("%Y-%m-%d").to_string());
    if let Some(by) = superseded_by {
        updated = set_field(&updated, "superseded_by", &format!("\"{}\"", by));
    }
    if let Some(reason) = reason.filter(|r| !r.is_empty()) {
        updated = set_field(&updated, "archive_reason", &format!("\"{}\"", single_line(reason)));
    }

    let archive_dir = store.design_root().join("archive");
    fs::create_dir_all(&archive_dir)
        .with_context(|| format!("Failed to create {}", archive_dir.display()))?;

    let target = unique_path(&archive_dir, &doc.path)?;
    write(&doc.path, &updated)?;
    fs::rename(&doc.path, &target)
        .with_context(|| format!("Failed to move {} to {}", doc.path.display(), target.display()))?;

    log::info!("Archived {} to {}", uuid, target.display());
    Ok(target)
}

/// Record that `new_uuid` replaces `old_uuid`
pub fn supersede(store: &DesignStore, old_uuid: &str, new_uuid: &str, today: NaiveDate) -> Result<()> {
    let old = store.find(old_uuid).context("Old document not found")?;
    let new = store.find(new_uuid).context("New document not found")?;
    let date = today.format("%Y-%m-%d").to_string();

    let old_content = read(&old.path)?;
    let mut old_updated = set_field(&old_content, "status", Status::Superseded.as_str());
    old_updated = set_field(&old_updated, "updated", &date);
    old_updated = set_field(&old_updated, "superseded_by", &format!("\"{}\"", new.uuid));

    let new_content = read(&new.path)?;
    let mut new_updated = set_field(&new_content, "supersedes", &format!("\"{}\"", old.uuid));
    new_updated = set_field(&new_updated, "updated", &date);

    write(&old.path, &old_updated)?;
    write(&new.path, &new_updated)?;

    log::info!("{} superseded by {}", old.uuid, new.uuid);
    Ok(())
}

/// One row of a document's version history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// `base` or the four-digit version
    pub version: String,
    pub status: String,
    pub updated: String,
    pub uuid: String,
    pub supersedes: Option<String>,
    pub superseded_by: Option<String>,
}

impl From<DocumentMetadata> for HistoryEntry {
    fn from(doc: DocumentMetadata) -> Self {
        let version = match version_of(&doc.uuid) {
            Some(v) => format!("{:04}", v),
            None => "base".to_string(),
        };
        let or_unknown = |s: String| if s.is_empty() { "unknown".to_string() } else { s };
        Self {
            version,
            status: or_unknown(doc.status),
            updated: or_unknown(doc.updated),
            uuid: doc.uuid,
            supersedes: doc.supersedes,
            superseded_by: doc.superseded_by,
        }
    }
}

/// Every version sharing the base UUID, ordered by UUID
pub fn history(store: &DesignStore, uuid: &str) -> Result<(String, Vec<HistoryEntry>)> {
    let base = strip_version(uuid);
    let mut docs = store.by_uuid(&base, true);
    if docs.is_empty() {
        bail!("No history found for: {}", uuid);
    }
    docs.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    Ok((base, docs.into_iter().map(HistoryEntry::from).collect()))
}

/// `dir/<name>`, or `dir/<stem>_<n>.md` when taken
pub(crate) fn unique_path(dir: &Path, source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| eyre::eyre!("Invalid document path: {}", source.display()))?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut candidate = dir.join(name);
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.md", stem, counter));
        counter += 1;
    }
    Ok(candidate)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OLD: &str = "PROJ-SPEC-20250108-aaaaaaaa";
    const NEW: &str = "PROJ-SPEC-20250108-aaaaaaaa_v0002";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    fn doc(uuid: &str, status: &str) -> String {
        format!(
            "---\nuuid: {}\ntitle: \"Auth\"\ntype: spec\nstatus: {}\nupdated: 2025-01-08\nsupersedes: null\nsuperseded_by: null\n---\n# Auth\nstatus: body line\n",
            uuid, status
        )
    }

    fn fixture() -> (TempDir, DesignStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");
        fs::create_dir_all(root.join("specs")).unwrap();
        fs::write(root.join("specs/auth.md"), doc(OLD, "draft")).unwrap();
        fs::write(root.join("specs/auth_v0002.md"), doc(NEW, "draft")).unwrap();
        let store = DesignStore::new(temp.path(), root);
        (temp, store)
    }

    #[test]
    fn test_update_status_allowed() {
        let (_temp, store) = fixture();
        let change = update_status(&store, OLD, Status::Review, false, today()).unwrap();
        assert_eq!(change.from.as_deref(), Some("draft"));

        let content = fs::read_to_string(&change.path).unwrap();
        assert!(content.contains("\nstatus: review\n"));
        assert!(content.contains("\nupdated: 2025-02-01\n"));
        assert!(content.contains("status: body line"));
    }

    #[test]
    fn test_update_status_rejects_skipping_review() {
        let (_temp, store) = fixture();
        let err = update_status(&store, OLD, Status::Approved, false, today()).unwrap_err();
        assert!(err.to_string().contains("Invalid transition: draft -> approved"));

        let forced = update_status(&store, OLD, Status::Approved, true, today()).unwrap();
        assert_eq!(forced.to, Status::Approved);
    }

    #[test]
    fn test_update_status_terminal() {
        let (_temp, store) = fixture();
        update_status(&store, OLD, Status::Deprecated, false, today()).unwrap();
        let err = update_status(&store, OLD, Status::Draft, false, today()).unwrap_err();
        assert!(err.to_string().contains("none (terminal)"));
    }

    #[test]
    fn test_update_status_without_current() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");
        fs::create_dir_all(root.join("specs")).unwrap();
        fs::write(root.join("specs/x.md"), format!("---\nuuid: {}\n---\n", OLD)).unwrap();
        let store = DesignStore::new(temp.path(), root);

        let change = update_status(&store, OLD, Status::Approved, false, today()).unwrap();
        assert_eq!(change.from, None);
        let content = fs::read_to_string(&change.path).unwrap();
        assert!(content.contains("status: approved"));
    }

    #[test]
    fn test_archive_moves_and_dedups() {
        let (_temp, store) = fixture();
        let archive_dir = store.design_root().join("archive");
        fs::create_dir_all(&archive_dir).unwrap();
        fs::write(archive_dir.join("auth.md"), "occupied").unwrap();

        let target = archive(&store, OLD, Some("Obsolete"), Some(NEW), today()).unwrap();
        assert_eq!(target, archive_dir.join("auth_1.md"));
        assert!(!store.design_root().join("specs/auth.md").exists());

        let content = fs::read_to_string(&target).unwrap();
        assert!(content.contains("status: archived"));
        assert!(content.contains(&format!("superseded_by: \"{}\"", NEW)));
        assert!(content.contains("archive_reason: \"Obsolete\""));
    }

    #[test]
    fn test_archive_reason_cannot_break_frontmatter() {
        let (_temp, store) = fixture();
        let target = archive(&store, OLD, Some("Dropped\n---\nstatus: \"approved\""), None, today()).unwrap();

        let content = fs::read_to_string(&target).unwrap();
        assert!(content.contains("archive_reason: \"Dropped --- status: 'approved'\"\n"));
        assert_eq!(field(&content, "status").as_deref(), Some("archived"));
        assert_eq!(content.matches("\n---\n").count(), 1);
    }

    #[test]
    fn test_supersede_links_both() {
        let (_temp, store) = fixture();
        supersede(&store, OLD, NEW, today()).unwrap();

        let old = store.find(OLD).unwrap();
        assert_eq!(old.status, "superseded");
        assert_eq!(old.superseded_by.as_deref(), Some(NEW));
        let new = store.find(NEW).unwrap();
        assert_eq!(new.supersedes.as_deref(), Some(OLD));
        assert_eq!(new.updated, "2025-02-01");
    }

    #[test]
    fn test_supersede_missing_new_writes_nothing() {
        let (_temp, store) = fixture();
        let before = fs::read_to_string(store.design_root().join("specs/auth.md")).unwrap();
        assert!(supersede(&store, OLD, "PROJ-SPEC-20250108-ffffffff", today()).is_err());
        let after = fs::read_to_string(store.design_root().join("specs/auth.md")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_history() {
        let (_temp, store) = fixture();
        let (base, entries) = history(&store, NEW).unwrap();
        assert_eq!(base, OLD);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version, "base");
        assert_eq!(entries[1].version, "0002");
        assert!(history(&store, "PROJ-SPEC-20250108-ffffffff").is_err());
    }
}
