//! Design document management
//!
//! Design documents are markdown files with a frontmatter header, stored
//! under the project's design root:
//!
//! ```text
//! docs/design/
//! ├── specs/      SPEC documents
//! ├── plans/      PLAN documents
//! ├── decisions/  ADRs
//! ├── archive/    archived documents
//! └── exports/    sanitized copies for issue trackers
//! ```
//!
//! The filesystem is the database: every query walks the tree.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub mod export;
pub mod frontmatter;
pub mod handoff;
pub mod init;
pub mod lifecycle;
pub mod store;
pub mod transition;
pub mod uuid;
pub mod validate;
pub mod version;

/// Files that never count as design documents
pub const SKIPPED_FILES: &[&str] = &["readme.md", "template.md", "index.md"];

/// Type-specific subdirectories of the design root
pub const TYPE_DIRS: &[&str] = &["specs", "plans", "decisions"];

pub fn is_skipped_file(name: &str) -> bool {
    SKIPPED_FILES.contains(&name.to_lowercase().as_str())
}

/// Kind of design document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    Spec,
    Plan,
    Adr,
}

impl DocType {
    pub const ALL: [DocType; 3] = [DocType::Spec, DocType::Plan, DocType::Adr];

    /// Upper-case tag used inside UUIDs
    pub fn tag(&self) -> &'static str {
        match self {
            DocType::Spec => "SPEC",
            DocType::Plan => "PLAN",
            DocType::Adr => "ADR",
        }
    }

    /// Directory under the design root that holds this type
    pub fn dir(&self) -> &'static str {
        match self {
            DocType::Spec => "specs",
            DocType::Plan => "plans",
            DocType::Adr => "decisions",
        }
    }

    /// Guess the type from a UUID's type segment
    pub fn from_uuid(uuid: &str) -> Option<Self> {
        let upper = uuid.to_uppercase();
        DocType::ALL
            .into_iter()
            .find(|t| upper.contains(&format!("-{}-", t.tag())))
    }
}

impl FromStr for DocType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SPEC" => Ok(DocType::Spec),
            "PLAN" => Ok(DocType::Plan),
            "ADR" => Ok(DocType::Adr),
            other => Err(eyre::eyre!("Unknown document type: {} (valid: spec, plan, adr)", other)),
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag().to_lowercase())
    }
}

/// Lifecycle state of a design document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Review,
    Approved,
    Implemented,
    Deprecated,
    Superseded,
    Archived,
}

impl Status {
    pub const ALL: [Status; 7] = [
        Status::Draft,
        Status::Review,
        Status::Approved,
        Status::Implemented,
        Status::Deprecated,
        Status::Superseded,
        Status::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Review => "review",
            Status::Approved => "approved",
            Status::Implemented => "implemented",
            Status::Deprecated => "deprecated",
            Status::Superseded => "superseded",
            Status::Archived => "archived",
        }
    }

    /// States reachable from this one without --force.
    ///
    /// `archived` is absent everywhere: only the archive operation gets there.
    pub fn allowed_targets(&self) -> &'static [Status] {
        match self {
            Status::Draft => &[Status::Review, Status::Deprecated],
            Status::Review => &[Status::Draft, Status::Approved, Status::Deprecated],
            Status::Approved => &[Status::Implemented, Status::Deprecated, Status::Superseded],
            Status::Implemented => &[Status::Deprecated, Status::Superseded],
            Status::Deprecated | Status::Superseded | Status::Archived => &[],
        }
    }

    pub fn can_transition_to(&self, target: Status) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

impl FromStr for Status {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == lower)
            .ok_or_else(|| {
                let valid: Vec<&str> = Status::ALL.iter().map(|s| s.as_str()).collect();
                eyre::eyre!("Invalid status: {} (valid: {})", s, valid.join(", "))
            })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};

    #[test]
    fn test_doc_type_parse() {
        assert_eq!("spec".parse::<DocType>().unwrap(), DocType::Spec);
        assert_eq!("ADR".parse::<DocType>().unwrap(), DocType::Adr);
        assert!("memo".parse::<DocType>().is_err());
    }

    #[test]
    fn test_doc_type_dirs() {
        assert_eq!(DocType::Spec.dir(), "specs");
        assert_eq!(DocType::Plan.dir(), "plans");
        assert_eq!(DocType::Adr.dir(), "decisions");
    }

    #[test]
    fn test_doc_type_from_uuid() {
        assert_eq!(DocType::from_uuid("PROJ-SPEC-20250108-a7b3f2e1"), Some(DocType::Spec));
        assert_eq!(DocType::from_uuid("proj-adr-20250108-a7b3f2e1_v0002"), Some(DocType::Adr));
        assert_eq!(DocType::from_uuid("PROJ-MEMO-20250108-a7b3f2e1"), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Approved".parse::<Status>().unwrap(), Status::Approved);
        let err = "wip".parse::<Status>().unwrap_err().to_string();
        assert!(err.contains("Invalid status: wip"));
    }

    #[test]
    fn test_transition_table() {
        assert!(Status::Draft.can_transition_to(Status::Review));
        assert!(!Status::Draft.can_transition_to(Status::Approved));
        assert!(Status::Review.can_transition_to(Status::Draft));
        assert!(Status::Approved.can_transition_to(Status::Superseded));
        assert!(!Status::Implemented.can_transition_to(Status::Draft));
    }

    #[test]
    fn test_terminal_states() {
        assert!(Status::Deprecated.is_terminal());
        assert!(Status::Superseded.is_terminal());
        assert!(Status::Archived.is_terminal());
        assert!(!Status::Draft.is_terminal());
    }

    #[test]
    fn test_approval_requires_review() {
        // Walk every path from draft that avoids review; approved must be unreachable
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([Status::Draft]);
        while let Some(status) = queue.pop_front() {
            if !seen.insert(status) {
                continue;
            }
            for next in status.allowed_targets() {
                if *next != Status::Review {
                    queue.push_back(*next);
                }
            }
        }
        assert!(!seen.contains(&Status::Approved));
        assert!(!seen.contains(&Status::Implemented));
    }

    #[test]
    fn test_skipped_files() {
        assert!(is_skipped_file("README.md"));
        assert!(is_skipped_file("index.md"));
        assert!(!is_skipped_file("auth.md"));
    }
}
