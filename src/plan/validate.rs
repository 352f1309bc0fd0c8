//! Structural checks for plan documents
//!
//! A plan is markdown with `## Phase N: name` headings, `### Component`
//! sections, a risk section, checkbox tasks that may end in
//! `(depends on: other task, ...)` and success criteria.

use eyre::{Context, Result};
use lazy_regex::{regex, regex_is_match};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

pub const REQUIRED_PHASES: [&str; 5] = ["analysis", "design", "implementation", "testing", "deployment"];
pub const RISK_CATEGORIES: [&str; 4] = ["technical", "schedule", "resource", "external"];
const MIN_RISKS_PER_CATEGORY: usize = 1;
const MAX_TOP_LEVEL_COMPONENTS: usize = 10;
const MAX_SUB_COMPONENTS: usize = 8;
const MAX_DEPENDENCIES_PER_TASK: usize = 5;
const TASK_ID_LEN: usize = 50;

const VAGUE_TERMS: [&str; 6] = ["appropriate", "sufficient", "reasonable", "adequate", "good", "proper"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanMetrics {
    pub file: String,
    pub size_bytes: usize,
    pub lines: usize,
    pub phases_found: usize,
    pub tasks_found: usize,
    pub risks_found: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: PlanMetrics,
}

/// Errors and warnings of one check
#[derive(Debug, Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl PlanReport {
    /// Validate a plan file. A missing file is a failed report, not an error.
    pub fn check_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self {
                valid: false,
                errors: vec![format!("Plan file not found: {}", path.display())],
                warnings: Vec::new(),
                metrics: PlanMetrics {
                    file: path.display().to_string(),
                    ..Default::default()
                },
            });
        }
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut report = Self::check(&content);
        report.metrics.file = path.display().to_string();
        Ok(report)
    }

    pub fn check(content: &str) -> Self {
        let checks: [(&str, fn(&str) -> Findings); 5] = [
            ("phases", check_phases),
            ("architecture", check_architecture),
            ("risks", check_risks),
            ("dependencies", check_dependencies),
            ("criteria", check_criteria),
        ];

        let mut report = Self {
            valid: true,
            metrics: metrics(content),
            ..Default::default()
        };
        for (name, check) in checks {
            let findings = check(content);
            if !findings.errors.is_empty() {
                report.valid = false;
            }
            report.errors.extend(findings.errors.iter().map(|e| format!("[{}] {}", name, e)));
            report.warnings.extend(findings.warnings.iter().map(|w| format!("[{}] {}", name, w)));
        }
        report
    }

    /// Warnings count as errors
    pub fn apply_strict(&mut self) {
        if self.warnings.is_empty() {
            return;
        }
        self.valid = false;
        self.errors.extend(self.warnings.iter().cloned());
    }
}

fn metrics(content: &str) -> PlanMetrics {
    PlanMetrics {
        file: String::new(),
        size_bytes: content.len(),
        lines: content.matches('\n').count() + 1,
        phases_found: regex!(r"(?m)^##\s+Phase").find_iter(content).count(),
        tasks_found: regex!(r"(?m)^[-*]\s+\[.\]").find_iter(content).count(),
        risks_found: regex!(r"(?im)^[-*]\s+\[.\].*risk").find_iter(content).count(),
    }
}

/// Text after `start` up to the next `##` heading
fn section_body(content: &str, start: usize) -> &str {
    let rest = &content[start..];
    match rest.find("\n##") {
        Some(end) => &rest[..end],
        None => rest,
    }
}

fn check_phases(content: &str) -> Findings {
    let mut findings = Findings::default();
    let found: HashSet<String> = regex!(r"(?im)^##\s+Phase\s+\d+[:\s]+(\w+)")
        .captures_iter(content)
        .map(|caps| caps[1].to_lowercase())
        .collect();

    let missing: Vec<&str> = REQUIRED_PHASES.iter().copied().filter(|p| !found.contains(*p)).collect();
    if !missing.is_empty() {
        findings.errors.push(format!("Missing required phases: {}", missing.join(", ")));
    }

    let mut extra: Vec<&str> = found
        .iter()
        .map(String::as_str)
        .filter(|p| !REQUIRED_PHASES.contains(p))
        .collect();
    extra.sort_unstable();
    if !extra.is_empty() {
        findings.warnings.push(format!("Extra phases found: {}", extra.join(", ")));
    }
    findings
}

fn check_architecture(content: &str) -> Findings {
    let mut findings = Findings::default();
    let top_level = regex!(r"(?m)^###\s+Component[:\s]+(.+)").find_iter(content).count();
    // Deepest component counts; text before the first one is skipped
    let max_sub = content
        .split("### Component")
        .skip(1)
        .map(|section| regex!(r"(?m)^####\s+").find_iter(section).count())
        .max()
        .unwrap_or(0);

    if top_level > MAX_TOP_LEVEL_COMPONENTS {
        findings.errors.push(format!(
            "Too many top-level components: {} (max: {})",
            top_level, MAX_TOP_LEVEL_COMPONENTS
        ));
    }
    if max_sub > MAX_SUB_COMPONENTS {
        findings.errors.push(format!(
            "Component has too many sub-components: {} (max: {})",
            max_sub, MAX_SUB_COMPONENTS
        ));
    }
    findings
}

fn check_risks(content: &str) -> Findings {
    let mut findings = Findings::default();
    let Some(header) = regex!(r"(?i)##\s+(?:Phase\s+\d+[:\s]+)?Risk[^\n]*\n").find(content) else {
        findings.errors.push("No risk assessment section found".to_string());
        return findings;
    };
    let risks = section_body(content, header.end()).to_lowercase();

    for category in RISK_CATEGORIES {
        if !risks.contains(category) {
            findings.warnings.push(format!("Risk category not explicitly addressed: {}", category));
        }
    }

    let items = regex!(r"(?m)^[-*]\s+\[.\]\s+").find_iter(&risks).count();
    let min_required = RISK_CATEGORIES.len() * MIN_RISKS_PER_CATEGORY;
    if items < min_required {
        findings.warnings.push(format!(
            "Only {} risks identified (recommended minimum: {})",
            items, min_required
        ));
    }
    findings
}

/// Lowercase slug used to match a dependency to its task
fn task_id(name: &str) -> String {
    regex!(r"[^a-z0-9]+")
        .replace_all(&name.to_lowercase(), "-")
        .chars()
        .take(TASK_ID_LEN)
        .collect()
}

fn check_dependencies(content: &str) -> Findings {
    let mut findings = Findings::default();
    let mut tasks: Vec<(String, String)> = Vec::new();
    let mut deps: HashMap<String, Vec<String>> = HashMap::new();

    for caps in regex!(r"(?im)^[-*]\s+\[.\]\s+(.+?)(?:\s+\(depends on:?\s*(.+?)\))?$").captures_iter(content) {
        let name = caps[1].trim().to_string();
        let id = task_id(&name);

        if let Some(list) = caps.get(2) {
            let list: Vec<String> = list.as_str().split([',', ';']).map(|d| task_id(d.trim())).collect();
            if list.len() > MAX_DEPENDENCIES_PER_TASK {
                findings.warnings.push(format!(
                    "Task '{}' has {} dependencies (max recommended: {})",
                    name,
                    list.len(),
                    MAX_DEPENDENCIES_PER_TASK
                ));
            }
            deps.insert(id.clone(), list);
        }
        tasks.push((id, name));
    }

    let mut visited = HashSet::new();
    for (id, name) in &tasks {
        let mut path = HashSet::new();
        if has_cycle(id, &deps, &mut visited, &mut path) {
            findings.errors.push(format!("Circular dependency detected involving task: {}", name));
            break;
        }
    }
    findings
}

fn has_cycle<'a>(
    node: &'a str,
    deps: &'a HashMap<String, Vec<String>>,
    visited: &mut HashSet<&'a str>,
    path: &mut HashSet<&'a str>,
) -> bool {
    if path.contains(node) {
        return true;
    }
    if !visited.insert(node) {
        return false;
    }
    path.insert(node);
    for dep in deps.get(node).into_iter().flatten() {
        if has_cycle(dep, deps, visited, path) {
            return true;
        }
    }
    path.remove(node);
    false
}

fn check_criteria(content: &str) -> Findings {
    let mut findings = Findings::default();
    let header = regex!(r"(?i)(?:success criteria|acceptance criteria|done when)[:\s]*\n");

    let mut pos = 0;
    while let Some(found) = header.find_at(content, pos) {
        let body = section_body(content, found.end());
        let lower = body.to_lowercase();
        for term in VAGUE_TERMS {
            let warning = format!(
                "Vague term '{}' found in success criteria. Replace with measurable threshold.",
                term
            );
            if lower.contains(term) && !findings.warnings.contains(&warning) {
                findings.warnings.push(warning);
            }
        }
        pos = found.end() + body.len();
    }

    let measurable = regex_is_match!(
        r"(?i)\d+%|\d+\s*(?:hours?|days?|minutes?)|exit code\s*\d+|at least\s+\d+|no more than\s+\d+",
        content
    );
    if !measurable {
        findings
            .warnings
            .push("No measurable success criteria found (percentages, counts, etc.)".to_string());
    }
    findings
}
