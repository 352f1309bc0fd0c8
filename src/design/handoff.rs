//! Hand a design document to an implementer through its GitHub issue
//!
//! The document is copied into `exports/`, posted to the issue as a
//! collapsible comment, linked back from the source frontmatter, and the
//! export is committed to whichever repository owns the design root.

use chrono::NaiveDate;
use eyre::{Context, Result, bail};
use lazy_regex::regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

use super::TYPE_DIRS;
use super::frontmatter::{FmValue, Frontmatter, field, set_field};
use super::uuid::markdown_files;
use crate::config::GitMode;
use crate::git;

/// Failures talking to the issue tracker
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub CLI (gh) not installed (install: https://cli.github.com/)")]
    NotInstalled,

    #[error("Not authenticated to GitHub (run: gh auth login)")]
    NotAuthenticated,

    #[error("gh {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Where handoff comments go
pub trait IssueTracker {
    /// Fail early when the tracker cannot be used
    fn ensure_ready(&self) -> Result<(), GithubError>;

    fn comment(&self, issue: u64, body: &str) -> Result<(), GithubError>;

    fn add_label(&self, issue: u64, label: &str) -> Result<(), GithubError>;

    /// Open issues assigned to the current user; none by default
    fn assigned_open_issues(&self) -> Result<Vec<OpenIssue>, GithubError> {
        Ok(Vec::new())
    }
}

/// An open issue as listed by `gh issue list --json number,title,labels`
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueLabel {
    pub name: String,
}

impl OpenIssue {
    pub fn has_label(&self, names: &[&str]) -> bool {
        self.labels.iter().any(|l| names.contains(&l.name.as_str()))
    }
}

/// Issue tracker backed by the `gh` CLI
#[derive(Debug, Clone)]
pub struct GhCli {
    bin: Option<PathBuf>,
}

impl GhCli {
    pub fn new() -> Self {
        Self {
            bin: which::which("gh").ok(),
        }
    }

    /// Run gh and return its stdout
    fn run(&self, args: &[&str]) -> Result<String, GithubError> {
        let bin = self.bin.as_ref().ok_or(GithubError::NotInstalled)?;
        let output = Command::new(bin).args(args).output().map_err(|_| GithubError::NotInstalled)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(GithubError::CommandFailed {
                command: args.iter().take(2).cloned().collect::<Vec<_>>().join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl Default for GhCli {
    fn default() -> Self {
        Self::new()
    }
}

impl IssueTracker for GhCli {
    fn ensure_ready(&self) -> Result<(), GithubError> {
        self.run(&["--version"]).map_err(|_| GithubError::NotInstalled)?;
        self.run(&["auth", "status"]).map_err(|e| match e {
            GithubError::NotInstalled => GithubError::NotInstalled,
            _ => GithubError::NotAuthenticated,
        })?;
        Ok(())
    }

    fn comment(&self, issue: u64, body: &str) -> Result<(), GithubError> {
        self.run(&["issue", "comment", &issue.to_string(), "--body", body])?;
        Ok(())
    }

    fn add_label(&self, issue: u64, label: &str) -> Result<(), GithubError> {
        self.run(&["issue", "edit", &issue.to_string(), "--add-label", label])?;
        Ok(())
    }

    fn assigned_open_issues(&self) -> Result<Vec<OpenIssue>, GithubError> {
        let args = [
            "issue", "list", "--assignee", "@me", "--state", "open", "--json", "number,title,labels",
        ];
        let stdout = self.run(&args)?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout).map_err(|e| GithubError::CommandFailed {
            command: "issue list".to_string(),
            stderr: format!("unreadable output: {}", e),
        })
    }
}

/// Parameters of one handoff
#[derive(Debug, Clone)]
pub struct HandoffRequest<'a> {
    /// UUID or path of the source document
    pub identifier: &'a str,
    pub issue: &'a str,
    pub sanitize: bool,
    pub dry_run: bool,
    pub commit: bool,
    pub author: &'a str,
    pub label: &'a str,
    pub today: NaiveDate,
}

/// What a handoff did (or would do, in a dry run)
#[derive(Debug, Clone, Serialize)]
pub struct HandoffReport {
    pub source: PathBuf,
    pub uuid: String,
    pub issue: u64,
    pub mode: GitMode,
    pub export_file: PathBuf,
    pub comment: String,
    /// The issue was added to `related_issues`
    pub linked: bool,
    pub label_added: bool,
    /// A commit was requested
    pub commit: bool,
    pub committed: bool,
    pub dry_run: bool,
}

/// Parse a plain decimal issue number
pub fn parse_issue(issue: &str) -> Result<u64> {
    let issue = issue.trim();
    if issue.is_empty() || !issue.bytes().all(|b| b.is_ascii_digit()) {
        bail!("Issue number must be numeric: {}", issue);
    }
    issue
        .parse()
        .with_context(|| format!("Issue number out of range: {}", issue))
}

/// Find a document by path, or by UUID in the type directories
pub fn resolve_document(identifier: &str, project_root: &Path, design_root: &Path) -> Option<PathBuf> {
    let as_path = Path::new(identifier);
    for candidate in [as_path.to_path_buf(), project_root.join(as_path)] {
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    TYPE_DIRS
        .iter()
        .flat_map(|dir| markdown_files(&design_root.join(dir)))
        .find(|path| {
            fs::read_to_string(path)
                .ok()
                .and_then(|content| field(&content, "uuid"))
                .map(|uuid| uuid.contains(identifier))
                .unwrap_or(false)
        })
}

/// Remove INTERNAL and SENSITIVE sections
pub fn sanitize_sections(content: &str) -> String {
    let out = regex!(r"(?s)<!-- INTERNAL -->.*?<!-- /INTERNAL -->").replace_all(content, "");
    regex!(r"(?s)<!-- SENSITIVE -->.*?<!-- /SENSITIVE -->")
        .replace_all(&out, "")
        .into_owned()
}

/// Issue comment carrying the exported document
pub fn build_comment(export: &str, author: &str, mode: GitMode, today: NaiveDate) -> String {
    let value = |key: &str| field(export, key).unwrap_or_default();
    format!(
        "## Specification Attached\n\n\
         **UUID**: `{uuid}`\n\
         **Title**: {title}\n\
         **Type**: {doc_type}\n\
         **Status**: {status}\n\
         **Attached by**: {author}\n\
         **Date**: {date}\n\
         **Mode**: {mode}\n\n\
         <details>\n\
         <summary>Click to expand specification</summary>\n\n\
         ```markdown\n\
         {export}\n\
         ```\n\n\
         </details>\n\n\
         ---\n\
         *Attached by atlas handoff*",
        uuid = value("uuid"),
        title = value("title"),
        doc_type = value("type"),
        status = value("status"),
        author = author,
        date = today.format("%Y-%m-%d"),
        mode = mode.as_str(),
        export = export.trim_end(),
    )
}

/// Add `#<issue>` to `related_issues`; None when already listed
pub fn link_issue(content: &str, issue: u64) -> Option<String> {
    let tag = format!("#{}", issue);
    let (fm, _) = Frontmatter::parse(content)?;
    let mut issues = fm.get_list("related_issues");
    if issues.iter().any(|i| i.trim_start_matches('#') == issue.to_string()) {
        return None;
    }
    issues.insert(0, tag);
    Some(set_field(content, "related_issues", &FmValue::List(issues).to_string()))
}

/// Run a handoff against `tracker`
pub fn handoff(
    project_root: &Path,
    design_root: &Path,
    mode: GitMode,
    tracker: &dyn IssueTracker,
    req: &HandoffRequest<'_>,
) -> Result<HandoffReport> {
    let issue = parse_issue(req.issue)?;

    let Some(source) = resolve_document(req.identifier, project_root, design_root) else {
        bail!(
            "Document not found: {} (searched {}/{{specs,plans,decisions}}/)",
            req.identifier,
            design_root.display()
        );
    };

    let original =
        fs::read_to_string(&source).with_context(|| format!("Failed to read {}", source.display()))?;
    let uuid = field(&original, "uuid").unwrap_or_default();

    let export = if req.sanitize { sanitize_sections(&original) } else { original.clone() };
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let export_file = design_root.join("exports").join(format!("{}-export.md", stem));
    let comment = build_comment(&export, req.author, mode, req.today);
    let linked_content = link_issue(&original, issue);

    let mut report = HandoffReport {
        source: source.clone(),
        uuid: uuid.clone(),
        issue,
        mode,
        export_file: export_file.clone(),
        comment,
        linked: linked_content.is_some(),
        label_added: false,
        commit: req.commit,
        committed: false,
        dry_run: req.dry_run,
    };

    if req.dry_run {
        log::info!("Dry run handoff of {} to #{}", uuid, issue);
        return Ok(report);
    }

    tracker.ensure_ready()?;

    // Nothing is written until the comment is on the issue
    tracker.comment(issue, &report.comment)?;

    if let Some(parent) = export_file.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&export_file, &export).with_context(|| format!("Failed to write {}", export_file.display()))?;

    report.label_added = match tracker.add_label(issue, req.label) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Could not label issue #{}: {}", issue, e);
            false
        }
    };

    if let Some(updated) = linked_content {
        fs::write(&source, updated).with_context(|| format!("Failed to write {}", source.display()))?;
    }

    if req.commit {
        report.committed = commit_export(project_root, design_root, mode, &export_file, &uuid, issue);
    }

    log::info!("Handed off {} to issue #{}", uuid, issue);
    Ok(report)
}

/// Commit the export; failures are logged, never fatal
fn commit_export(
    project_root: &Path,
    design_root: &Path,
    mode: GitMode,
    export_file: &Path,
    uuid: &str,
    issue: u64,
) -> bool {
    let message = format!(
        "[EXPORT] Handoff {} to issue #{}\n\n- ADDED: {} (exported copy)\n\nExported design document for attachment to GitHub issue #{}.\n",
        uuid,
        issue,
        export_file.display(),
        issue
    );

    let result = match mode {
        GitMode::DualGit => git::commit(design_root, &["exports/"], &message),
        GitMode::SingleGit => {
            let relative = export_file
                .strip_prefix(project_root)
                .unwrap_or(export_file)
                .to_string_lossy()
                .to_string();
            git::commit(project_root, &[relative.as_str()], &message)
        }
    };

    match result {
        Ok(committed) => committed,
        Err(e) => {
            log::warn!("Export commit failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockTracker {
        calls: RefCell<Vec<String>>,
        unauthenticated: bool,
        fail_comment: bool,
        fail_label: bool,
    }

    impl IssueTracker for MockTracker {
        fn ensure_ready(&self) -> Result<(), GithubError> {
            if self.unauthenticated {
                return Err(GithubError::NotAuthenticated);
            }
            Ok(())
        }

        fn comment(&self, issue: u64, body: &str) -> Result<(), GithubError> {
            if self.fail_comment {
                return Err(GithubError::CommandFailed {
                    command: "issue comment".to_string(),
                    stderr: "HTTP 404".to_string(),
                });
            }
            self.calls.borrow_mut().push(format!("comment {} {}", issue, body.len()));
            Ok(())
        }

        fn add_label(&self, issue: u64, label: &str) -> Result<(), GithubError> {
            if self.fail_label {
                return Err(GithubError::CommandFailed {
                    command: "issue edit".to_string(),
                    stderr: "no such label".to_string(),
                });
            }
            self.calls.borrow_mut().push(format!("label {} {}", issue, label));
            Ok(())
        }
    }

    const UUID: &str = "PROJ-SPEC-20250108-a7b3f2e1";

    fn fixture() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("docs/design");
        fs::create_dir_all(root.join("specs/auth")).unwrap();
        fs::write(
            root.join("specs/auth/service.md"),
            format!(
                "---\nuuid: {}\ntitle: \"Auth Service\"\ntype: spec\nstatus: approved\nrelated_issues: [\"#7\"]\n---\n# Auth\nPublic\n<!-- INTERNAL -->\nsecret\n<!-- /INTERNAL -->\n",
                UUID
            ),
        )
        .unwrap();
        (temp, root)
    }

    fn request<'a>(issue: &'a str, dry_run: bool) -> HandoffRequest<'a> {
        HandoffRequest {
            identifier: UUID,
            issue,
            sanitize: true,
            dry_run,
            commit: false,
            author: "Architect Agent",
            label: "spec-attached",
            today: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
        }
    }

    #[test]
    fn test_parse_issue() {
        assert_eq!(parse_issue("234").unwrap(), 234);
        assert!(parse_issue("#234").is_err());
        assert!(parse_issue("abc").is_err());
        assert!(parse_issue("").is_err());
    }

    #[test]
    fn test_resolve_by_uuid_and_path() {
        let (temp, root) = fixture();
        let found = resolve_document(UUID, temp.path(), &root).unwrap();
        assert!(found.ends_with("specs/auth/service.md"));

        let by_path = resolve_document("docs/design/specs/auth/service.md", temp.path(), &root).unwrap();
        assert!(by_path.is_file());
        assert!(resolve_document("PROJ-SPEC-20250108-ffffffff", temp.path(), &root).is_none());
    }

    #[test]
    fn test_link_issue() {
        let content = "---\nuuid: X\nrelated_issues: [\"#7\"]\n---\n";
        let linked = link_issue(content, 12).unwrap();
        assert!(linked.contains("related_issues: [\"#12\", \"#7\"]"));
        assert!(link_issue(&linked, 12).is_none());
        assert!(link_issue("---\nuuid: X\nrelated_issues: [7]\n---\n", 7).is_none());

        let added = link_issue("---\nuuid: X\n---\n", 3).unwrap();
        assert!(added.contains("related_issues: [\"#3\"]"));
    }

    #[test]
    fn test_handoff_posts_and_links() {
        let (temp, root) = fixture();
        let tracker = MockTracker::default();
        let report = handoff(temp.path(), &root, GitMode::SingleGit, &tracker, &request("42", false)).unwrap();

        assert_eq!(report.uuid, UUID);
        assert!(report.linked);
        assert!(report.label_added);
        assert_eq!(report.export_file, root.join("exports/service-export.md"));

        let export = fs::read_to_string(&report.export_file).unwrap();
        assert!(export.contains("Public"));
        assert!(!export.contains("secret"));
        assert!(report.comment.contains("**Title**: Auth Service"));
        assert!(report.comment.contains("**Mode**: single-git"));

        let calls = tracker.calls.borrow();
        assert!(calls[0].starts_with("comment 42"));
        assert_eq!(calls[1], "label 42 spec-attached");

        let source = fs::read_to_string(root.join("specs/auth/service.md")).unwrap();
        assert!(source.contains("related_issues: [\"#42\", \"#7\"]"));
    }

    #[test]
    fn test_handoff_dry_run_writes_nothing() {
        let (temp, root) = fixture();
        let tracker = MockTracker {
            unauthenticated: true,
            ..Default::default()
        };
        let report = handoff(temp.path(), &root, GitMode::DualGit, &tracker, &request("42", true)).unwrap();
        assert!(report.dry_run);
        assert!(!report.export_file.exists());
        assert!(tracker.calls.borrow().is_empty());
        let source = fs::read_to_string(root.join("specs/auth/service.md")).unwrap();
        assert!(!source.contains("#42"));
    }

    #[test]
    fn test_handoff_unauthenticated_is_github_error() {
        let (temp, root) = fixture();
        let tracker = MockTracker {
            unauthenticated: true,
            ..Default::default()
        };
        let err = handoff(temp.path(), &root, GitMode::SingleGit, &tracker, &request("42", false)).unwrap_err();
        assert!(matches!(err.downcast_ref::<GithubError>(), Some(GithubError::NotAuthenticated)));
        assert!(!root.join("exports/service-export.md").exists());
    }

    #[test]
    fn test_failed_comment_leaves_no_export() {
        let (temp, root) = fixture();
        let tracker = MockTracker {
            fail_comment: true,
            ..Default::default()
        };
        let err = handoff(temp.path(), &root, GitMode::SingleGit, &tracker, &request("42", false)).unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
        assert!(!root.join("exports/service-export.md").exists());
        let source = fs::read_to_string(root.join("specs/auth/service.md")).unwrap();
        assert!(!source.contains("#42"));
    }

    #[test]
    fn test_handoff_label_failure_is_not_fatal() {
        let (temp, root) = fixture();
        let tracker = MockTracker {
            fail_label: true,
            ..Default::default()
        };
        let report = handoff(temp.path(), &root, GitMode::SingleGit, &tracker, &request("42", false)).unwrap();
        assert!(!report.label_added);
    }

    #[test]
    fn test_handoff_rejects_non_numeric_issue() {
        let (temp, root) = fixture();
        let tracker = MockTracker::default();
        assert!(handoff(temp.path(), &root, GitMode::SingleGit, &tracker, &request("#42", false)).is_err());
    }
}
