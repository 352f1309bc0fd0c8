//! Design folder layout

use eyre::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

const FOLDERS: &[&str] = &["specs", "plans", "decisions", "exports"];

/// Create the design folders; returns the paths that did not exist yet
pub fn init_design_folders(project_root: &Path, design_root: &Path) -> Result<Vec<PathBuf>> {
    if !project_root.exists() {
        bail!("Project root does not exist: {}", project_root.display());
    }
    if !project_root.is_dir() {
        bail!("Project root is not a directory: {}", project_root.display());
    }

    let mut created = Vec::new();
    for folder in FOLDERS {
        let path = design_root.join(folder);
        if !path.is_dir() {
            fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
            created.push(path);
        }
    }

    let gitkeep = design_root.join("exports").join(".gitkeep");
    if !gitkeep.exists() {
        fs::write(&gitkeep, "").with_context(|| format!("Failed to create {}", gitkeep.display()))?;
        created.push(gitkeep);
    }

    log::info!("Initialized design folders at {} ({} new)", design_root.display(), created.len());
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");

        let created = init_design_folders(temp.path(), &root).unwrap();
        assert_eq!(created.len(), 5);
        assert!(root.join("exports/.gitkeep").is_file());

        let again = init_design_folders(temp.path(), &root).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_init_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(init_design_folders(&missing, &missing.join("docs/design")).is_err());

        let file = temp.path().join("file");
        fs::write(&file, "").unwrap();
        let err = init_design_folders(&file, &file.join("docs/design")).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }
}
