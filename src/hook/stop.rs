//! Stop hook: refuse to end a session while design work is unfinished

use lazy_regex::regex;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{HookEvent, HookHandler, HookResult};
use crate::design::handoff::IssueTracker;

const DESIGN_DIRS: &[&str] = &["docs/design", "design", "docs_dev/design", "thoughts/shared/handoffs"];
const HANDOFFS_DIR: &str = "thoughts/shared/handoffs";
const TASKS_DIR: &str = ".claude/tasks";

const DRAFT_MARKERS: &[&str] = &[
    "status: draft",
    "state: draft",
    "[draft]",
    "## draft",
    "wip:",
    "status: wip",
    "in_progress",
];
const OPEN_TASK_STATES: &[&str] = &["pending", "in_progress", "in-progress", "running"];
const REQUIREMENT_FILES: &[&str] = &["requirements.md", "REQUIREMENTS.md"];
const REQUIREMENT_DIR: &str = "requirements";
const REQUIREMENT_DESIGN_DIRS: &[&str] = &["design", "docs/design"];
const ARCHITECT_LABELS: &[&str] = &["architecture", "design", "planning", "architect"];
const MAX_ORPHANS: usize = 5;
const MAX_ISSUES: usize = 5;
const MAX_LISTED: usize = 10;

/// Nearest ancestor holding `.claude` or `.git`, else `start`
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(".claude").exists() || dir.join(".git").exists())
        .unwrap_or(start)
        .to_path_buf()
}

pub struct StopGuard {
    project_root: PathBuf,
    tracker: Option<Box<dyn IssueTracker>>,
}

impl StopGuard {
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            tracker: None,
        }
    }

    /// Also block on open architecture issues assigned to the user
    pub fn with_tracker(mut self, tracker: Box<dyn IssueTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Everything that should keep the session alive
    pub fn blockers(&self) -> Vec<String> {
        let mut blockers = self.draft_documents();
        blockers.extend(self.pending_tasks());
        blockers.extend(self.open_handoffs());
        blockers.extend(self.orphan_requirements());
        blockers.extend(self.open_issues());
        blockers
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn draft_documents(&self) -> Vec<String> {
        let mut found = Vec::new();
        for dir in DESIGN_DIRS {
            for path in markdown_under(&self.project_root.join(dir)) {
                let Ok(content) = fs::read_to_string(&path) else {
                    log::debug!("Skipping unreadable {}", path.display());
                    continue;
                };
                let lower = content.to_lowercase();
                if DRAFT_MARKERS.iter().any(|m| lower.contains(m)) {
                    found.push(format!("Draft design doc: {}", self.relative(&path)));
                }
            }
        }
        found
    }

    fn pending_tasks(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.project_root.join(TASKS_DIR)) else {
            return Vec::new();
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut found = Vec::new();
        for path in paths {
            let Some(task) = fs::read_to_string(&path)
                .ok()
                .and_then(|s| serde_json::from_str::<Value>(&s).ok())
            else {
                log::debug!("Skipping unreadable task {}", path.display());
                continue;
            };

            let status = task.get("status").and_then(Value::as_str).unwrap_or_default().to_lowercase();
            if OPEN_TASK_STATES.contains(&status.as_str()) {
                let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
                let name = task.get("name").and_then(Value::as_str).map(str::to_string).unwrap_or(stem);
                found.push(format!("Pending task: {} (status: {})", name, status));
            }
        }
        found
    }

    fn open_handoffs(&self) -> Vec<String> {
        markdown_under(&self.project_root.join(HANDOFFS_DIR))
            .into_iter()
            .filter(|p| p.file_name().is_some_and(|n| n == "current.md"))
            .filter(|p| {
                fs::read_to_string(p).is_ok_and(|content| content.contains("IN_PROGRESS") || content.contains("PENDING"))
            })
            .map(|p| format!("Incomplete handoff: {}", self.relative(&p)))
            .collect()
    }

    /// Requirement IDs with neither a design doc named after them nor a
    /// "design for <id>" note next to them
    fn orphan_requirements(&self) -> Vec<String> {
        let root = &self.project_root;

        let mut files: Vec<PathBuf> = REQUIREMENT_FILES.iter().map(|f| root.join(f)).filter(|p| p.is_file()).collect();
        files.extend(markdown_in(&root.join(REQUIREMENT_DIR)));
        files.sort();
        files.dedup();

        let designs: Vec<String> = REQUIREMENT_DESIGN_DIRS
            .iter()
            .flat_map(|dir| markdown_in(&root.join(dir)))
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_lowercase()))
            .collect();

        let mut found = Vec::new();
        for path in files {
            let Ok(content) = fs::read_to_string(&path) else {
                log::debug!("Skipping unreadable requirements {}", path.display());
                continue;
            };
            let lower = content.to_lowercase();

            for id in regex!(r"(?i)(?:REQ|R|REQUIREMENT)-?\d{1,4}").find_iter(&content) {
                let id = id.as_str();
                let normalized = id.to_lowercase().replace('-', "");
                let designed = designs
                    .iter()
                    .any(|stem| *stem == normalized || *stem == format!("design-{}", normalized));
                if !designed && !lower.contains(&format!("design for {}", id.to_lowercase())) {
                    found.push(format!("Requirement without design: {}", id));
                }
            }
        }

        found.sort();
        found.dedup();
        found.truncate(MAX_ORPHANS);
        found
    }

    /// Skipped silently when the tracker is missing or unusable
    fn open_issues(&self) -> Vec<String> {
        let Some(tracker) = &self.tracker else {
            return Vec::new();
        };
        let issues = match tracker.assigned_open_issues() {
            Ok(issues) => issues,
            Err(e) => {
                log::debug!("Skipping issue check: {}", e);
                return Vec::new();
            }
        };

        issues
            .iter()
            .take(MAX_ISSUES)
            .filter(|issue| issue.has_label(ARCHITECT_LABELS))
            .map(|issue| {
                let title: String = issue.title.chars().take(50).collect();
                format!("Open issue #{}: {}", issue.number, title)
            })
            .collect()
    }
}

/// Markdown files directly inside `dir`
fn markdown_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    files.sort();
    files
}

fn markdown_under(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "md"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// The block decision printed to the host
pub fn block_decision(event: HookEvent, blockers: &[String]) -> Value {
    let listed: Vec<&String> = blockers.iter().take(MAX_LISTED).collect();
    let lines: Vec<String> = listed.iter().map(|b| format!("- {}", b)).collect();

    json!({
        "decision": "block",
        "reason": format!("Incomplete design work: {} items", blockers.len()),
        "continue": true,
        "systemMessage": format!(
            "Cannot exit - complete the following design work first:\n{}",
            lines.join("\n")
        ),
        "hookSpecificOutput": {
            "hookEventName": event.name(),
            "blockers": listed,
            "blockerCount": blockers.len(),
        },
    })
}

impl HookHandler for StopGuard {
    fn handles(&self, event: HookEvent) -> bool {
        matches!(event, HookEvent::Stop | HookEvent::SubagentStop)
    }

    fn handle(&self, event: HookEvent, _payload: &Value) -> HookResult {
        let blockers = self.blockers();
        if blockers.is_empty() {
            return HookResult::Allow;
        }

        log::info!("Blocking stop: {} unfinished items", blockers.len());
        HookResult::Block {
            output: block_decision(event, &blockers).to_string(),
        }
    }
}
