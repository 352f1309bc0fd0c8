//! Move design documents from a private `.design/` repository into the
//! project tree (`docs/design/`).
//!
//! UUIDs are copied unchanged so issue references stay valid.

use eyre::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::uuid::markdown_files;
use crate::config::{PATTERNS_FILES, ProjectConfig};
use crate::git;

const PRIVATE_ROOT: &str = ".design";
const PUBLIC_ROOT: &str = "docs/design";
const COPIED_DIRS: &[&str] = &["specs", "plans", "decisions", "templates"];
const CREATED_DIRS: &[&str] = &["specs", "plans", "decisions", "templates", "exports"];
const UUID_COUNTER: &str = ".architect-uuid-counter";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionOptions {
    pub force: bool,
    pub dry_run: bool,
    pub keep_private: bool,
    pub commit: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransitionReport {
    pub specs: usize,
    pub plans: usize,
    pub adrs: usize,
    pub total: usize,
    /// Markdown files per copied directory
    pub copied: Vec<(String, usize)>,
    pub counter_copied: bool,
    pub patterns_file: Option<PathBuf>,
    pub patterns_updated: bool,
    pub committed: bool,
    pub dry_run: bool,
    /// `.design/` is left in place and should be removed by hand
    pub private_left_behind: bool,
}

/// Document counts found under `.design/`, before anything is touched
pub fn survey(project_root: &Path) -> Result<TransitionReport> {
    let private = project_root.join(PRIVATE_ROOT);
    if !private.is_dir() {
        bail!(
            "No {}/ directory found in {}; nothing to transition (already single-git?)",
            PRIVATE_ROOT,
            project_root.display()
        );
    }

    let specs = markdown_files(&private.join("specs")).len();
    let plans = markdown_files(&private.join("plans")).len();
    let adrs = markdown_files(&private.join("decisions")).len();

    Ok(TransitionReport {
        specs,
        plans,
        adrs,
        total: specs + plans + adrs,
        ..Default::default()
    })
}

/// Run the transition.
///
/// `confirm` is asked once unless `force` or `dry_run` is set; a false
/// answer aborts before anything is written.
pub fn transition(
    project_root: &Path,
    opts: TransitionOptions,
    confirm: &mut dyn FnMut(&TransitionReport) -> Result<bool>,
) -> Result<TransitionReport> {
    let mut report = survey(project_root)?;
    report.dry_run = opts.dry_run;

    if !opts.force && !opts.dry_run && !confirm(&report)? {
        bail!("Aborted");
    }

    let private = project_root.join(PRIVATE_ROOT);
    let public = project_root.join(PUBLIC_ROOT);

    if !opts.dry_run {
        for dir in CREATED_DIRS {
            let path = public.join(dir);
            fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        }
    }

    for dir in COPIED_DIRS {
        let count = copy_tree(&private.join(dir), &public.join(dir), opts.dry_run)?;
        report.copied.push((dir.to_string(), count));
    }

    let counter = private.join(UUID_COUNTER);
    if counter.is_file() {
        if !opts.dry_run {
            fs::copy(&counter, public.join(UUID_COUNTER))
                .with_context(|| format!("Failed to copy {}", counter.display()))?;
        }
        report.counter_copied = true;
    }

    // Without a patterns file the left-over .design/ would be auto-detected again
    let project = ProjectConfig::load(project_root)?;
    let patterns = project
        .patterns_file
        .unwrap_or_else(|| project_root.join(PATTERNS_FILES[0]));
    if !opts.dry_run {
        report.patterns_updated = ProjectConfig::set_single_git(&patterns)?;
    }
    report.patterns_file = Some(patterns);

    if opts.commit && !opts.dry_run {
        report.committed = commit_transition(project_root, &report);
    }

    report.private_left_behind = !opts.keep_private && !opts.dry_run;

    log::info!(
        "Transitioned {} documents from {} to {} (dry run: {})",
        report.total,
        private.display(),
        public.display(),
        opts.dry_run
    );
    Ok(report)
}

/// Copy every file below `src`; returns the markdown count
fn copy_tree(src: &Path, dest: &Path, dry_run: bool) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let count = markdown_files(src).len();
    if dry_run || count == 0 {
        return Ok(count);
    }

    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::copy(entry.path(), &target).with_context(|| format!("Failed to copy {}", entry.path().display()))?;
    }
    Ok(count)
}

fn commit_transition(project_root: &Path, report: &TransitionReport) -> bool {
    let message = format!(
        "[TRANSITION] Move design documents from private to public\n\n\
         - MOVED: .design/{{specs,plans,decisions,templates}} -> docs/design/\n\
         - UPDATED: patterns.md (mode: single-git, design_root: docs/design/)\n\
         - All document UUIDs unchanged\n\n\
         - Specs: {}\n- Plans: {}\n- ADRs: {}\n- Total: {}\n",
        report.specs, report.plans, report.adrs, report.total
    );

    let mut paths = vec![format!("{}/", PUBLIC_ROOT)];
    if let Some(patterns) = &report.patterns_file
        && let Ok(relative) = patterns.strip_prefix(project_root)
    {
        paths.push(relative.to_string_lossy().to_string());
    }
    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();

    match git::commit(project_root, &paths, &message) {
        Ok(committed) => committed,
        Err(e) => {
            log::warn!("Transition commit failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitMode;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let private = temp.path().join(".design");
        for dir in ["specs", "plans", "decisions/db", "templates", "memory"] {
            fs::create_dir_all(private.join(dir)).unwrap();
        }
        fs::write(private.join("specs/a.md"), "---\nuuid: PROJ-SPEC-20250108-aaaaaaaa\n---\n").unwrap();
        fs::write(private.join("specs/b.md"), "# b\n").unwrap();
        fs::write(private.join("plans/p.md"), "# p\n").unwrap();
        fs::write(private.join("decisions/db/adr.md"), "# adr\n").unwrap();
        fs::write(private.join("templates/spec.md"), "# template\n").unwrap();
        fs::write(private.join(UUID_COUNTER), "3\n").unwrap();
        fs::write(
            private.join("memory/patterns.md"),
            "# Patterns\nmode: dual-git\ndesign_root: .design/\nuuid_prefix: AUTH\n",
        )
        .unwrap();
        temp
    }

    fn opts(force: bool, dry_run: bool) -> TransitionOptions {
        TransitionOptions {
            force,
            dry_run,
            keep_private: false,
            commit: false,
        }
    }

    #[test]
    fn test_requires_private_root() {
        let temp = TempDir::new().unwrap();
        let err = transition(temp.path(), opts(true, false), &mut |_| Ok(true)).unwrap_err();
        assert!(err.to_string().contains("No .design/ directory"));
    }

    #[test]
    fn test_transition_copies_and_updates() {
        let temp = fixture();
        let report = transition(temp.path(), opts(true, false), &mut |_| Ok(false)).unwrap();

        assert_eq!((report.specs, report.plans, report.adrs, report.total), (2, 1, 1, 4));
        assert!(report.counter_copied);
        assert!(report.patterns_updated);
        assert!(report.private_left_behind);

        let public = temp.path().join("docs/design");
        assert!(public.join("exports").is_dir());
        assert!(public.join("decisions/db/adr.md").is_file());
        assert!(public.join("templates/spec.md").is_file());
        assert_eq!(
            fs::read_to_string(public.join("specs/a.md")).unwrap(),
            "---\nuuid: PROJ-SPEC-20250108-aaaaaaaa\n---\n"
        );

        let patterns = fs::read_to_string(temp.path().join(".design/memory/patterns.md")).unwrap();
        assert!(patterns.contains("mode: single-git\n"));
        assert!(patterns.contains("design_root: docs/design/\n"));
        assert!(patterns.contains("uuid_prefix: AUTH"));
    }

    #[test]
    fn test_project_resolves_to_public_root_afterwards() {
        let temp = fixture();
        fs::remove_file(temp.path().join(".design/memory/patterns.md")).unwrap();

        let report = transition(temp.path(), opts(true, false), &mut |_| Ok(true)).unwrap();
        assert!(report.patterns_updated);
        assert_eq!(report.patterns_file, Some(temp.path().join(".claude/architect/patterns.md")));

        let project = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(project.mode, GitMode::SingleGit);
        assert_eq!(project.design_root, PathBuf::from("docs/design"));
        assert!(temp.path().join(".design").is_dir());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = fixture();
        let mut asked = false;
        let report = transition(temp.path(), opts(false, true), &mut |_| {
            asked = true;
            Ok(true)
        })
        .unwrap();

        assert!(!asked);
        assert_eq!(report.total, 4);
        assert!(!temp.path().join("docs").exists());
        assert!(!report.patterns_updated);
    }

    #[test]
    fn test_declined_confirmation_aborts() {
        let temp = fixture();
        let err = transition(temp.path(), opts(false, false), &mut |report| {
            assert_eq!(report.total, 4);
            Ok(false)
        })
        .unwrap_err();
        assert!(err.to_string().contains("Aborted"));
        assert!(!temp.path().join("docs").exists());
    }
}
