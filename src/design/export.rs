//! Sanitized exports for issue trackers

use clap::ValueEnum;
use eyre::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::frontmatter::{Frontmatter, field};
use super::store::DesignStore;

/// Comment blocks and sections that never leave the design repository
static PRIVATE_MARKERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?s)<!-- ARCHITECT:.*?-->").unwrap(),
        Regex::new(r"(?s)<!-- INTERNAL:.*?-->").unwrap(),
        Regex::new(r"(?s)<!-- PRIVATE:.*?-->").unwrap(),
        Regex::new(r"(?s)<!-- INTERNAL_START -->.*?<!-- INTERNAL_END -->").unwrap(),
    ]
});

/// Shape of an exported file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// The document as is
    #[default]
    Markdown,
    /// Issue body with title and UUID header
    Issue,
}

/// Strip internal markers and links into the private design tree
pub fn sanitize_for_export(content: &str) -> String {
    let mut out = content.to_string();

    for pattern in PRIVATE_MARKERS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }

    out = lazy_regex::regex!(r"\[([^\]]+)\]\(([^)]+\.md)\)")
        .replace_all(&out, |caps: &Captures| {
            let target = &caps[2];
            if target.starts_with("http://") || target.starts_with("https://") || target.starts_with('#') {
                caps[0].to_string()
            } else {
                caps[1].to_string()
            }
        })
        .into_owned();

    lazy_regex::regex!(r"\n{3,}").replace_all(&out, "\n\n").trim().to_string()
}

/// Wrap a document as an issue body
pub fn format_for_issue(content: &str, uuid: &str) -> String {
    let (title, body) = match Frontmatter::parse(content) {
        Some((fm, body)) => (fm.get_str("title"), body),
        None => (field(content, "title"), content.to_string()),
    };
    let title = title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Design Document".to_string());

    format!(
        "## {}\n\n**UUID**: `{}`\n\n---\n\n{}\n\n---\n*Exported from the project design records*\n",
        title,
        uuid,
        body.trim()
    )
}

/// Export one document; returns the written path.
///
/// `out_dir` defaults to `<design_root>/exports`.
pub fn export_document(
    store: &DesignStore,
    uuid: &str,
    out_dir: Option<&Path>,
    sanitize: bool,
    format: ExportFormat,
) -> Result<PathBuf> {
    let doc = store.find(uuid)?;
    let mut content =
        fs::read_to_string(&doc.path).with_context(|| format!("Failed to read {}", doc.path.display()))?;

    if sanitize {
        content = sanitize_for_export(&content);
    }

    let file_name = match format {
        ExportFormat::Markdown => format!("{}.md", uuid),
        ExportFormat::Issue => {
            content = format_for_issue(&content, uuid);
            format!("{}-issue.md", uuid)
        }
    };

    let out_dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| store.design_root().join("exports"));
    fs::create_dir_all(&out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let path = out_dir.join(file_name);
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Exported {} to {}", uuid, path.display());
    Ok(path)
}

/// Outcome of exporting every document of a type
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportBatch {
    pub exported: Vec<PathBuf>,
    /// Documents without a UUID
    pub skipped: Vec<PathBuf>,
}

pub fn export_batch(
    store: &DesignStore,
    doc_type: &str,
    out_dir: Option<&Path>,
    sanitize: bool,
    format: ExportFormat,
) -> Result<ExportBatch> {
    let mut batch = ExportBatch::default();
    for doc in store.by_type(doc_type) {
        if doc.uuid.is_empty() {
            log::warn!("No UUID in {}, skipping export", doc.path.display());
            batch.skipped.push(doc.path);
            continue;
        }
        batch
            .exported
            .push(export_document(store, &doc.uuid, out_dir, sanitize, format)?);
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_removes_markers() {
        let content = "# Title\n<!-- ARCHITECT: decided\nacross lines -->\nKeep\n<!-- INTERNAL: x -->\n<!-- PRIVATE: y -->\n<!-- INTERNAL_START -->\nsecret\n<!-- INTERNAL_END -->\n\n\n\nEnd\n";
        let out = sanitize_for_export(content);
        assert!(!out.contains("ARCHITECT"));
        assert!(!out.contains("secret"));
        assert!(!out.contains("PRIVATE"));
        assert!(!out.contains("\n\n\n"));
        assert!(out.starts_with("# Title"));
        assert!(out.ends_with("End"));
    }

    #[test]
    fn test_sanitize_links() {
        let content = "See [design](../specs/auth.md), [docs](https://example.com/guide.md) and [anchor](#notes.md).";
        let out = sanitize_for_export(content);
        assert_eq!(
            out,
            "See design, [docs](https://example.com/guide.md) and [anchor](#notes.md)."
        );
    }

    #[test]
    fn test_format_for_issue() {
        let content = "---\nuuid: X\ntitle: \"Auth Service\"\n---\n\n# Auth\nBody\n";
        let issue = format_for_issue(content, "PROJ-SPEC-20250108-a7b3f2e1");
        assert!(issue.starts_with("## Auth Service\n\n**UUID**: `PROJ-SPEC-20250108-a7b3f2e1`\n\n---\n\n# Auth\nBody\n"));
        assert!(!issue.contains("title:"));

        let untitled = format_for_issue("plain body", "X");
        assert!(untitled.starts_with("## Design Document"));
    }

    fn fixture() -> (TempDir, DesignStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");
        fs::create_dir_all(root.join("decisions")).unwrap();
        fs::write(
            root.join("decisions/db.md"),
            "---\nuuid: PROJ-ADR-20250108-dddddddd\ntitle: \"Use Postgres\"\n---\nBody <!-- INTERNAL: cost -->\n",
        )
        .unwrap();
        fs::write(root.join("decisions/draft.md"), "---\ntitle: \"Untracked\"\ntype: adr\n---\n").unwrap();
        let store = DesignStore::new(temp.path(), root);
        (temp, store)
    }

    #[test]
    fn test_export_document_default_dir() {
        let (_temp, store) = fixture();
        let path = export_document(&store, "PROJ-ADR-20250108-dddddddd", None, true, ExportFormat::Markdown).unwrap();
        assert_eq!(path, store.design_root().join("exports/PROJ-ADR-20250108-dddddddd.md"));
        assert!(!fs::read_to_string(path).unwrap().contains("cost"));
    }

    #[test]
    fn test_export_issue_format() {
        let (temp, store) = fixture();
        let out = temp.path().join("out");
        let path = export_document(&store, "PROJ-ADR-20250108-dddddddd", Some(&out), false, ExportFormat::Issue).unwrap();
        assert_eq!(path, out.join("PROJ-ADR-20250108-dddddddd-issue.md"));
        assert!(fs::read_to_string(path).unwrap().starts_with("## Use Postgres"));
    }

    #[test]
    fn test_export_batch_skips_missing_uuid() {
        let (temp, store) = fixture();
        let batch = export_batch(&store, "ADR", Some(&temp.path().join("out")), false, ExportFormat::Markdown).unwrap();
        assert_eq!(batch.exported.len(), 1);
        assert_eq!(batch.skipped.len(), 1);
    }
}
