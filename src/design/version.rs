//! Versioned copies of design documents

use chrono::NaiveDate;
use eyre::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use super::frontmatter::{FmValue, Frontmatter, single_line};
use super::store::DesignStore;
use super::uuid::{strip_version, version_of, versioned};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVersion {
    pub path: PathBuf,
    pub uuid: String,
    pub previous: String,
    pub version: u32,
}

/// Copy a document into its next version.
///
/// The copy starts as a draft, points back at the source through
/// `previous_version`, and lands next to the source as `<stem>_vNNNN.md`.
pub fn create_version(store: &DesignStore, uuid: &str, reason: Option<&str>, today: NaiveDate) -> Result<NewVersion> {
    let source = store.find(uuid)?;
    let content = fs::read_to_string(&source.path)
        .with_context(|| format!("Failed to read {}", source.path.display()))?;

    let Some((mut fm, body)) = Frontmatter::parse(&content).filter(|(fm, _)| fm.keys().next().is_some()) else {
        bail!("No frontmatter in source: {}", source.path.display());
    };

    let base = strip_version(uuid);
    let highest = store
        .by_uuid(&base, true)
        .iter()
        .filter_map(|doc| version_of(&doc.uuid))
        .max()
        .unwrap_or(0);
    let version = highest + 1;
    let new_uuid = versioned(&base, version);

    fm.set("uuid", FmValue::Str(new_uuid.clone()));
    fm.set("previous_version", FmValue::Str(source.uuid.clone()));
    fm.set("version", FmValue::Int(u64::from(version)));
    fm.set("updated", FmValue::Str(today.format("%Y-%m-%d").to_string()));
    fm.set("status", FmValue::Str("draft".to_string()));
    if let Some(reason) = reason.filter(|r| !r.is_empty()) {
        fm.set("version_reason", FmValue::Str(single_line(reason)));
    }

    let dir = source
        .path
        .parent()
        .ok_or_else(|| eyre::eyre!("Invalid document path: {}", source.path.display()))?;
    let stem = source
        .path
        .file_stem()
        .map(|s| strip_version(&s.to_string_lossy()))
        .unwrap_or_default();

    let mut path = dir.join(format!("{}_v{:04}.md", stem, version));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{}_v{:04}_{}.md", stem, version, counter));
        counter += 1;
    }

    fs::write(&path, format!("{}{}", fm.render(), body))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    log::info!("Created {} from {} at {}", new_uuid, source.uuid, path.display());
    Ok(NewVersion {
        path,
        uuid: new_uuid,
        previous: source.uuid,
        version,
    })
}

/// All versions sharing the base UUID, ordered by UUID
pub fn list_versions(store: &DesignStore, uuid: &str) -> Vec<(String, PathBuf)> {
    let mut versions: Vec<(String, PathBuf)> = store
        .by_uuid(&strip_version(uuid), true)
        .into_iter()
        .map(|doc| (doc.uuid, doc.path))
        .collect();
    versions.sort();
    versions
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE: &str = "PROJ-PLAN-20250108-bbbbbbbb";

    fn fixture() -> (TempDir, DesignStore) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");
        fs::create_dir_all(root.join("plans")).unwrap();
        fs::write(
            root.join("plans/rollout.md"),
            format!(
                "---\nuuid: {}\nversion: 1\ntitle: \"Rollout\"\ntype: plan\nstatus: approved\ntags: [deploy]\nsupersedes: null\n---\n# Rollout\n\nSteps.\n",
                BASE
            ),
        )
        .unwrap();
        let store = DesignStore::new(temp.path(), root);
        (temp, store)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_create_first_version() {
        let (_temp, store) = fixture();
        let created = create_version(&store, BASE, Some("API change"), today()).unwrap();

        assert_eq!(created.uuid, format!("{}_v0001", BASE));
        assert_eq!(created.version, 1);
        assert!(created.path.ends_with("plans/rollout_v0001.md"));

        let content = fs::read_to_string(&created.path).unwrap();
        let (fm, body) = Frontmatter::parse(&content).unwrap();
        assert_eq!(fm.get_str("status").unwrap(), "draft");
        assert_eq!(fm.get_str("previous_version").unwrap(), BASE);
        assert_eq!(fm.get_int("version"), Some(1));
        assert_eq!(fm.get_str("updated").unwrap(), "2025-03-01");
        assert_eq!(fm.get_list("tags"), vec!["deploy"]);
        assert_eq!(fm.get("supersedes"), Some(&FmValue::Null));
        assert_eq!(fm.get_str("version_reason").unwrap(), "API change");
        assert_eq!(body, "# Rollout\n\nSteps.\n");
    }

    #[test]
    fn test_multiline_reason_stays_in_frontmatter() {
        let (_temp, store) = fixture();
        let created = create_version(&store, BASE, Some("split\n---\nrollout"), today()).unwrap();

        let content = fs::read_to_string(&created.path).unwrap();
        let (fm, body) = Frontmatter::parse(&content).unwrap();
        assert_eq!(fm.get_str("version_reason").unwrap(), "split --- rollout");
        assert_eq!(body, "# Rollout\n\nSteps.\n");
    }

    #[test]
    fn test_create_version_from_version() {
        let (_temp, store) = fixture();
        let first = create_version(&store, BASE, None, today()).unwrap();
        let second = create_version(&store, &first.uuid, None, today()).unwrap();

        assert_eq!(second.uuid, format!("{}_v0002", BASE));
        assert_eq!(second.previous, first.uuid);
        assert!(second.path.ends_with("plans/rollout_v0002.md"));

        let listed = list_versions(&store, BASE);
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].0, BASE);
    }

    #[test]
    fn test_create_version_dedups_filename() {
        let (_temp, store) = fixture();
        fs::write(store.design_root().join("plans/rollout_v0001.md"), "# stray\n").unwrap();
        let created = create_version(&store, BASE, None, today()).unwrap();
        assert!(created.path.ends_with("plans/rollout_v0001_1.md"));
    }

    #[test]
    fn test_create_version_missing() {
        let (_temp, store) = fixture();
        assert!(create_version(&store, "PROJ-PLAN-20250108-cccccccc", None, today()).is_err());
    }
}
