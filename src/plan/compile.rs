//! Implementer handoff documents compiled from a template
//!
//! Module data comes from the `modules_status` list in the orchestrator's
//! exec-phase state file. The module spec body is inlined when it exists.

use chrono::Local;
use eyre::{Context, Result, bail};
use lazy_regex::regex;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::design::frontmatter::split_raw;

pub const STATE_FILE: &str = ".claude/orchestrator-exec-phase.local.md";
pub const DEFAULT_ROOT: &str = ".atlas";

#[derive(Debug, Deserialize)]
struct ExecState {
    #[serde(default)]
    modules_status: Vec<Value>,
}

/// One module as the orchestrator tracks it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub github_issue: Option<Value>,
    #[serde(default)]
    pub acceptance_criteria: Option<Value>,
    #[serde(default)]
    pub requirements: Option<Value>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ModuleInfo {
    /// Used when the state file does not know the module
    pub fn minimal(id: &str) -> Self {
        let name = id
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ");
        Self {
            id: id.to_string(),
            name: Some(name),
            priority: Some("medium".to_string()),
            github_issue: Some(Value::String("N/A".to_string())),
            ..Default::default()
        }
    }

    /// Find a module in the state file; None when the file or entry is missing
    pub fn find(project_root: &Path, id: &str) -> Result<Option<Self>> {
        let path = project_root.join(STATE_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        let Some((header, _)) = split_raw(&content) else {
            return Ok(None);
        };
        let state: ExecState =
            serde_yaml::from_str(&header).with_context(|| format!("Invalid state header in {}", path.display()))?;

        for entry in state.modules_status {
            if entry.get("id").and_then(Value::as_str) != Some(id) {
                continue;
            }
            let module = serde_yaml::from_value(entry).with_context(|| format!("Invalid module '{}'", id))?;
            return Ok(Some(module));
        }
        Ok(None)
    }
}

/// Scalar as text, lists as markdown bullets
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(|item| text(Some(item)))
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

/// Values that are not part of the module itself
pub struct Assignment<'a> {
    pub agent_id: &'a str,
    pub platform: &'a str,
    /// Design folder root as written in the document
    pub root: &'a str,
    pub task_uuid: String,
    pub assigned_at: String,
    pub spec_body: String,
}

impl<'a> Assignment<'a> {
    pub fn new(agent_id: &'a str, platform: &'a str, root: &'a str, spec_body: String) -> Self {
        let hex = ::uuid::Uuid::new_v4().simple().to_string();
        Self {
            agent_id,
            platform,
            root,
            task_uuid: format!("task-{}", &hex[..12]),
            assigned_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            spec_body,
        }
    }
}

/// Fill every `{{PLACEHOLDER}}`; unknown ones are dropped
pub fn render(template: &str, module: &ModuleInfo, assignment: &Assignment<'_>) -> String {
    let root = assignment.root.trim_end_matches('/');
    let platform = assignment.platform;
    let id = module.id.as_str();
    let spec = assignment.spec_body.trim();

    let replacements = [
        ("{{MODULE_NAME}}", module.name.clone().unwrap_or_else(|| "Unknown Module".to_string())),
        ("{{MODULE_ID}}", id.to_string()),
        ("{{MODULE_DESCRIPTION}}", module.description.clone().unwrap_or_default()),
        ("{{AGENT_ID}}", assignment.agent_id.to_string()),
        ("{{TASK_UUID}}", assignment.task_uuid.clone()),
        ("{{GITHUB_ISSUE}}", text(module.github_issue.as_ref()).unwrap_or_else(|| "N/A".to_string())),
        ("{{ASSIGNED_AT}}", assignment.assigned_at.clone()),
        ("{{PRIORITY}}", module.priority.clone().unwrap_or_else(|| "medium".to_string())),
        (
            "{{ACCEPTANCE_CRITERIA}}",
            text(module.acceptance_criteria.as_ref()).unwrap_or_else(|| "See specification".to_string()),
        ),
        (
            "{{MODULE_SPEC_CONTENT}}",
            if spec.is_empty() { "See linked specification file".to_string() } else { spec.to_string() },
        ),
        ("{{PLATFORM}}", platform.to_string()),
        ("{{CONFIG_FILES}}", format!("See {}/config/{}/", root, platform)),
        ("{{SPEC_PATH}}", format!("{}/designs/{}/specs/{}.md", root, platform, id)),
        ("{{RDD_PATH}}", format!("{}/designs/{}/rdd/{}-rdd.md", root, platform, id)),
        ("{{ARCH_PATH}}", format!("{}/designs/shared/ARCHITECTURE.md", root)),
        (
            "{{SUCCESS_METRICS}}",
            "All acceptance criteria met, tests passing, code reviewed".to_string(),
        ),
        (
            "{{REQUIREMENTS_LIST}}",
            text(module.requirements.as_ref()).unwrap_or_else(|| "See specification".to_string()),
        ),
        (
            "{{DEPENDENCIES}}",
            if module.dependencies.is_empty() { "None".to_string() } else { module.dependencies.join(", ") },
        ),
        ("{{TECHNICAL_DESIGN}}", "See specification".to_string()),
        ("{{TEST_REQUIREMENTS}}", "Unit tests, integration tests required".to_string()),
    ];

    let mut compiled = template.to_string();
    for (placeholder, value) in &replacements {
        compiled = compiled.replace(placeholder, value);
    }
    regex!(r"\{\{[A-Z_]+\}\}").replace_all(&compiled, "").into_owned()
}

pub struct CompileRequest<'a> {
    pub project_root: &'a Path,
    pub module_id: &'a str,
    pub agent_id: &'a str,
    pub platform: &'a str,
    pub template: Option<&'a Path>,
    /// Design folder root, relative to the project
    pub root: &'a str,
    pub preview: bool,
}

#[derive(Debug)]
pub struct CompiledHandoff {
    pub content: String,
    pub module: ModuleInfo,
    /// True when the state file had no entry for the module
    pub minimal: bool,
    /// Where the document was written; None in preview
    pub path: Option<PathBuf>,
}

pub fn handoff_path(project_root: &Path, root: &str, agent_id: &str, module_id: &str) -> PathBuf {
    project_root
        .join(root)
        .join("handoffs")
        .join(agent_id)
        .join(format!("{}-handoff.md", module_id))
}

pub fn compile(req: &CompileRequest<'_>) -> Result<CompiledHandoff> {
    let design_root = req.project_root.join(req.root);

    // Module data, or a minimal stand-in
    let found = ModuleInfo::find(req.project_root, req.module_id)?;
    let minimal = found.is_none();
    if minimal {
        log::info!("Module {} not in {}, using minimal data", req.module_id, STATE_FILE);
    }
    let module = found.unwrap_or_else(|| ModuleInfo::minimal(req.module_id));

    // Template
    let template_path = match req.template {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => req.project_root.join(path),
        None => design_root
            .join("designs")
            .join(req.platform)
            .join("templates")
            .join("handoff-template.md"),
    };
    if !template_path.is_file() {
        bail!("Template not found: {}", template_path.display());
    }
    let template = fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read {}", template_path.display()))?;

    // Spec body without its header
    let spec_path = design_root
        .join("designs")
        .join(req.platform)
        .join("specs")
        .join(format!("{}.md", req.module_id));
    let spec_body = if spec_path.is_file() {
        let content =
            fs::read_to_string(&spec_path).with_context(|| format!("Failed to read {}", spec_path.display()))?;
        split_raw(&content).map(|(_, body)| body).unwrap_or(content)
    } else {
        String::new()
    };

    let assignment = Assignment::new(req.agent_id, req.platform, req.root, spec_body);
    let content = render(&template, &module, &assignment);

    if req.preview {
        return Ok(CompiledHandoff {
            content,
            module,
            minimal,
            path: None,
        });
    }

    let path = handoff_path(req.project_root, req.root, req.agent_id, req.module_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, &content).with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Compiled handoff for {} to {}", req.module_id, path.display());

    Ok(CompiledHandoff {
        content,
        module,
        minimal,
        path: Some(path),
    })
}
