//! Frontmatter validation

use lazy_regex::regex_is_match;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::frontmatter::Frontmatter;
use super::uuid::{is_valid, markdown_files};
use super::{DocType, Status, is_skipped_file};

const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("uuid", "Globally unique document identifier"),
    ("title", "Human-readable document title"),
    ("type", "Document type: spec, plan, adr"),
    ("status", "Document status"),
];

const RECOMMENDED_FIELDS: &[&str] = &["created", "updated", "author", "version"];

const DATE_FIELDS: &[&str] = &["created", "updated"];

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub path: PathBuf,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, message: String) {
        self.valid = false;
        self.errors.push(message);
    }
}

/// Validate a single document; in strict mode warnings become errors
pub fn validate_file(path: &Path, strict: bool) -> ValidationResult {
    let mut result = ValidationResult::new(path);

    if !path.exists() {
        result.error("File not found".to_string());
        return result;
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            result.error(format!("Cannot read file: {}", e));
            return result;
        }
    };

    let Some((fm, _)) = Frontmatter::parse(&content) else {
        result.error("No frontmatter (must start with ---)".to_string());
        return result;
    };

    check_frontmatter(&fm, &mut result);

    if strict && !result.warnings.is_empty() {
        let promoted: Vec<String> = result.warnings.iter().map(|w| format!("[strict] {}", w)).collect();
        for message in promoted {
            result.error(message);
        }
    }

    log::debug!(
        "Validated {}: {} errors, {} warnings",
        path.display(),
        result.errors.len(),
        result.warnings.len()
    );
    result
}

fn check_frontmatter(fm: &Frontmatter, result: &mut ValidationResult) {
    let present = |key: &str| fm.get(key).map(|v| !v.is_empty()).unwrap_or(false);

    for (key, description) in REQUIRED_FIELDS {
        if !present(key) {
            result.error(format!("Missing required: {} ({})", key, description));
        }
    }

    for key in RECOMMENDED_FIELDS {
        if !present(key) {
            result.warnings.push(format!("Missing recommended: {}", key));
        }
    }

    if let Some(uuid) = fm.get_str("uuid").filter(|s| !s.is_empty())
        && !is_valid(&uuid)
    {
        result.error(format!(
            "Invalid UUID format: {} (expected: PREFIX-TYPE-YYYYMMDD-uuid8)",
            uuid
        ));
    }

    if let Some(doc_type) = fm.get_str("type").filter(|s| !s.is_empty())
        && doc_type.parse::<DocType>().is_err()
    {
        result.error(format!("Invalid type: {} (valid: spec, plan, adr)", doc_type));
    }

    if let Some(status) = fm.get_str("status").filter(|s| !s.is_empty())
        && let Err(e) = status.parse::<Status>()
    {
        result.error(e.to_string());
    }

    for key in DATE_FIELDS {
        if let Some(date) = fm.get_str(key).filter(|s| !s.is_empty())
            && !regex_is_match!(r"^\d{4}-\d{2}-\d{2}$", &date)
        {
            result
                .warnings
                .push(format!("Invalid date format for {}: {} (expected: YYYY-MM-DD)", key, date));
        }
    }
}

/// Validate every document below a directory, skipping index/readme/template
pub fn validate_dir(dir: &Path, strict: bool) -> Vec<ValidationResult> {
    markdown_files(dir)
        .iter()
        .filter(|p| {
            p.file_name()
                .map(|n| !is_skipped_file(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .map(|p| validate_file(p, strict))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GOOD: &str = "---\nuuid: PROJ-SPEC-20250108-a7b3f2e1\nversion: 1\ntitle: \"Auth\"\ntype: spec\nstatus: draft\ncreated: 2025-01-08\nupdated: 2025-01-08\nauthor: \"Architect Agent\"\n---\n# Auth\n";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_valid_document() {
        let temp = TempDir::new().unwrap();
        let result = validate_file(&write(&temp, "good.md", GOOD), true);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_frontmatter() {
        let temp = TempDir::new().unwrap();
        let result = validate_file(&write(&temp, "plain.md", "# Plain\n"), false);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["No frontmatter (must start with ---)"]);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_file(Path::new("/nonexistent/doc.md"), false);
        assert_eq!(result.errors, vec!["File not found"]);
    }

    #[test]
    fn test_invalid_fields() {
        let temp = TempDir::new().unwrap();
        let content = "---\nuuid: bad-uuid\ntitle: \"\"\ntype: memo\nstatus: wip\n---\n";
        let result = validate_file(&write(&temp, "bad.md", content), false);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Missing required: title")));
        assert!(result.errors.iter().any(|e| e.starts_with("Invalid UUID format: bad-uuid")));
        assert!(result.errors.iter().any(|e| e.starts_with("Invalid type: memo")));
        assert!(result.errors.iter().any(|e| e.starts_with("Invalid status: wip")));
        assert_eq!(result.warnings.len(), 4);
    }

    #[test]
    fn test_strict_promotes_warnings() {
        let temp = TempDir::new().unwrap();
        let content = GOOD.replace("created: 2025-01-08", "created: Jan 8");
        let path = write(&temp, "dates.md", &content);

        let lenient = validate_file(&path, false);
        assert!(lenient.valid);
        assert_eq!(lenient.warnings.len(), 1);

        let strict = validate_file(&path, true);
        assert!(!strict.valid);
        assert!(strict.errors[0].starts_with("[strict] Invalid date format for created"));
    }

    #[test]
    fn test_validate_dir_skips_readme() {
        let temp = TempDir::new().unwrap();
        write(&temp, "README.md", "# Readme\n");
        write(&temp, "specs/a.md", GOOD);
        write(&temp, "plans/b.md", "# no frontmatter\n");

        let results = validate_dir(temp.path(), false);
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.valid).count(), 1);
    }
}
