use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::design::export::ExportFormat;
use crate::design::{DocType, Status};
use crate::maestro::{MessageKind, Priority};

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

/// Output of `atlas search`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SearchOutput {
    #[default]
    Table,
    Json,
    Yaml,
    /// Paths relative to the project root
    Path,
    Uuid,
    /// Full file contents
    Content,
}

/// Output of `atlas deps`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DepsFormat {
    /// One node per line
    #[default]
    Text,
    /// JSON array
    Json,
}

#[derive(Parser)]
#[command(
    name = "atlas",
    about = "Design document lifecycle toolkit for architect agents",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/atlas/logs/atlas.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to atlas.yaml config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the design folder layout
    Init,

    /// Generate, stamp and list design UUIDs
    Uuid {
        #[command(subcommand)]
        action: UuidAction,
    },

    /// Search design documents
    Search {
        /// Exact UUID (version suffix allowed)
        #[arg(long, conflicts_with = "uuid_prefix")]
        uuid: Option<String>,

        /// UUID without version; matches every version
        #[arg(long)]
        uuid_prefix: Option<String>,

        /// Document type (spec, plan, adr)
        #[arg(long = "type")]
        doc_type: Option<String>,

        /// Status filter
        #[arg(long)]
        status: Option<String>,

        /// Tag filter (case-insensitive)
        #[arg(long)]
        tag: Option<String>,

        /// Related GitHub issue
        #[arg(long)]
        issue: Option<String>,

        /// Full-text query (case-insensitive)
        #[arg(long)]
        text: Option<String>,

        /// Output format
        #[arg(long, short = 'o', value_enum, default_value_t = SearchOutput::Table)]
        format: SearchOutput,
    },

    /// Validate design document frontmatter
    Validate {
        /// Validate one file
        #[arg(long, conflicts_with_all = ["dir", "all"])]
        file: Option<PathBuf>,

        /// Validate every document below a directory
        #[arg(long, conflicts_with = "all")]
        dir: Option<PathBuf>,

        /// Validate the whole design root
        #[arg(long)]
        all: bool,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Change the status of a document
    Status {
        #[arg(long)]
        uuid: String,

        /// Target status
        #[arg(long, value_enum)]
        to: Status,

        /// Skip the transition check
        #[arg(long)]
        force: bool,
    },

    /// Archive a document
    Archive {
        #[arg(long)]
        uuid: String,

        #[arg(long)]
        reason: Option<String>,

        /// UUID of the replacing document
        #[arg(long)]
        superseded_by: Option<String>,
    },

    /// Mark a document as superseded by another
    Supersede {
        /// Old document
        #[arg(long)]
        uuid: String,

        /// New document
        #[arg(long)]
        by: String,
    },

    /// Show every version of a document
    History {
        #[arg(long)]
        uuid: String,
    },

    /// Manage document versions
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },

    /// Export documents for sharing
    Export {
        /// Export one document
        #[arg(long, required_unless_present = "doc_type", conflicts_with = "doc_type")]
        uuid: Option<String>,

        /// Export every document of a type
        #[arg(long = "type", value_enum)]
        doc_type: Option<DocType>,

        /// Output directory (default: <design_root>/exports)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Strip internal comments and relative links
        #[arg(long)]
        sanitize: bool,

        #[arg(long, value_enum, default_value_t = ExportFormat::Markdown)]
        format: ExportFormat,
    },

    /// Hand a design document to a GitHub issue
    Handoff {
        /// Document UUID or path
        target: String,

        /// GitHub issue number
        issue: String,

        /// Remove INTERNAL and SENSITIVE sections
        #[arg(long)]
        sanitize: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,

        /// Do not commit the export
        #[arg(long)]
        no_commit: bool,
    },

    /// Move design documents from .design/ to docs/design/
    Transition {
        /// Skip confirmation
        #[arg(long)]
        force: bool,

        /// Show what would happen without making changes
        #[arg(long)]
        dry_run: bool,

        /// Do not suggest removing .design/ afterwards
        #[arg(long)]
        keep_private: bool,

        /// Do not commit the result
        #[arg(long)]
        no_commit: bool,
    },

    /// Talk to other agents over AI Maestro
    Message {
        #[command(subcommand)]
        action: MessageAction,
    },

    /// Order tasks by their dependencies
    Deps {
        #[command(subcommand)]
        action: DepsAction,
    },

    /// Check plans and compile implementer handoffs
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Handle hook events
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },

    /// Diagnose setup issues
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum UuidAction {
    /// Print a new UUID
    New {
        #[arg(long = "type", value_enum)]
        doc_type: DocType,

        /// Project prefix (default: uuid_prefix from patterns.md)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Print the next version of a UUID
    Next {
        /// UUID without version suffix
        base: String,
    },

    /// Add frontmatter with a UUID to documents
    Stamp {
        #[arg(long, required_unless_present = "dir", conflicts_with = "dir")]
        file: Option<PathBuf>,

        #[arg(long)]
        dir: Option<PathBuf>,

        #[arg(long = "type", value_enum)]
        doc_type: DocType,

        #[arg(long)]
        prefix: Option<String>,

        /// Replace existing frontmatter
        #[arg(long)]
        force: bool,
    },

    /// List every UUID in the design root
    List,
}

#[derive(Subcommand)]
pub enum VersionAction {
    /// Create the next version of a document
    Create {
        #[arg(long)]
        uuid: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// List versions of a document
    List {
        #[arg(long)]
        uuid: String,
    },
}

#[derive(Subcommand)]
pub enum MessageAction {
    /// Send a message
    Send {
        /// Recipient agent
        #[arg(long)]
        to: String,

        #[arg(long)]
        subject: String,

        #[arg(long)]
        message: String,

        #[arg(long, value_enum, default_value_t = Priority::Normal)]
        priority: Priority,

        #[arg(long = "type", value_enum, default_value_t = MessageKind::Notification)]
        kind: MessageKind,

        /// Message bus URL
        #[arg(long)]
        api_url: Option<String>,

        /// Print the raw response
        #[arg(long)]
        json: bool,
    },

    /// Read the inbox
    Inbox {
        /// Include read messages
        #[arg(long, conflicts_with = "count")]
        all: bool,

        /// Only print the unread count
        #[arg(long)]
        count: bool,

        #[arg(long)]
        api_url: Option<String>,

        /// Print the raw response
        #[arg(long)]
        json: bool,
    },

    /// Report that this agent is blocked
    Blocked {
        #[arg(long)]
        to: String,

        #[arg(long)]
        reason: String,

        #[arg(long)]
        api_url: Option<String>,
    },
}

/// Input and output of a dependency query
#[derive(Args, Debug, Clone)]
pub struct DepsArgs {
    /// Graph file (JSON or YAML)
    #[arg(long, short = 'i')]
    pub input: PathBuf,

    #[arg(long, short = 'f', value_enum, default_value_t = DepsFormat::Text)]
    pub format: DepsFormat,

    /// Write here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum DepsAction {
    /// Every node in execution order
    Order {
        #[command(flatten)]
        io: DepsArgs,
    },

    /// Report dependency cycles
    Cycles {
        #[command(flatten)]
        io: DepsArgs,
    },

    /// Transitive dependencies of one node
    Subgraph {
        node: String,

        #[command(flatten)]
        io: DepsArgs,
    },

    /// Nodes whose field equals a value
    Filter {
        field: String,

        value: String,

        #[command(flatten)]
        io: DepsArgs,
    },
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Check phases, components, risks, task dependencies and success criteria
    Validate {
        /// Plan file
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Write a JSON report here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Fill the handoff template for a module assignment
    Handoff {
        /// Module identifier
        module: String,

        /// Implementer agent
        agent: String,

        /// Platform name (web, ios, ...)
        #[arg(long)]
        platform: String,

        /// Template (default: <root>/designs/<platform>/templates/handoff-template.md)
        #[arg(long)]
        template: Option<PathBuf>,

        /// Print instead of saving
        #[arg(long)]
        preview: bool,

        /// Design folder root
        #[arg(long, default_value = crate::plan::compile::DEFAULT_ROOT)]
        root: String,
    },
}

#[derive(Subcommand)]
pub enum HookAction {
    /// Block the session from ending while design work is open
    Stop,
    /// Same checks when a subagent finishes
    SubagentStop,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_status_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["atlas", "status", "--uuid", "X", "--to", "done"]).is_err());
        assert!(Cli::try_parse_from(["atlas", "status", "--uuid", "X", "--to", "review"]).is_ok());
    }

    #[test]
    fn test_export_needs_a_target() {
        assert!(Cli::try_parse_from(["atlas", "export"]).is_err());
        assert!(Cli::try_parse_from(["atlas", "export", "--type", "spec", "--sanitize"]).is_ok());
    }

    #[test]
    fn test_plan_handoff_needs_platform() {
        assert!(Cli::try_parse_from(["atlas", "plan", "handoff", "auth-core", "impl-1"]).is_err());
        let cli = Cli::try_parse_from(["atlas", "plan", "handoff", "auth-core", "impl-1", "--platform", "web"]).unwrap();
        match cli.command {
            Commands::Plan {
                action: PlanAction::Handoff { root, preview, .. },
            } => {
                assert_eq!(root, ".atlas");
                assert!(!preview);
            }
            _ => panic!("expected plan handoff"),
        }
    }

    #[test]
    fn test_global_project_root() {
        let cli = Cli::try_parse_from(["atlas", "search", "--type", "spec", "--project-root", "/tmp/p"]).unwrap();
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp/p")));
    }
}
