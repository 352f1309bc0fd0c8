use eyre::{Context, Result};
use lazy_regex::regex_captures;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::design::uuid::check_prefix;

/// Main atlas configuration (atlas.yaml)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: LogLevel,
    /// Author written into generated frontmatter
    pub author: String,
    pub maestro: MaestroConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// AI Maestro message bus settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaestroConfig {
    pub api_url: String,
    /// Agent name used as sender and inbox owner
    pub session_name: Option<String>,
    pub timeout_secs: u64,
    /// Extra attempts after a transport failure
    pub retries: u32,
    pub retry_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Label added to an issue once a spec is attached
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            author: "Architect Agent".to_string(),
            maestro: MaestroConfig::default(),
            github: GithubConfig::default(),
        }
    }
}

impl Default for MaestroConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:23000".to_string(),
            session_name: None,
            timeout_secs: 10,
            retries: 1,
            retry_delay_secs: 30,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            label: "spec-attached".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Check ATLAS_CONFIG env var
        if let Ok(env_path) = std::env::var("ATLAS_CONFIG") {
            let path = PathBuf::from(env_path);
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from ATLAS_CONFIG: {}", e);
                    }
                }
            }
        }

        // Try ATLAS_DIR/atlas.yaml
        if let Ok(atlas_dir) = std::env::var("ATLAS_DIR") {
            let path = PathBuf::from(atlas_dir).join("atlas.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from ATLAS_DIR: {}", e);
                    }
                }
            }
        }

        // Try ~/.config/atlas/atlas.yaml
        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("atlas").join("atlas.yaml");
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Try ./atlas.yaml (for development)
        let local_config = PathBuf::from("atlas.yaml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load local config: {}", e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// AIMAESTRO_API and SESSION_NAME win over the file
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("AIMAESTRO_API")
            && !url.trim().is_empty()
        {
            self.maestro.api_url = url;
        }
        if let Ok(name) = std::env::var("SESSION_NAME")
            && !name.trim().is_empty()
        {
            self.maestro.session_name = Some(name);
        }
    }

    /// Directory holding atlas.yaml and logs
    pub fn atlas_dir() -> PathBuf {
        std::env::var("ATLAS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("atlas"))
    }

    /// Expand a path that may contain ~ or env vars
    pub fn expand_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        let expanded = shellexpand::full(&path_str).unwrap_or_else(|_| path_str.clone());
        PathBuf::from(expanded.as_ref())
    }
}

/// How design documents are versioned alongside the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitMode {
    /// Design docs live in the project repository
    SingleGit,
    /// Design docs live in a separate private repository (.design/)
    DualGit,
}

impl GitMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_matches('"').to_lowercase().as_str() {
            "single-git" => Some(Self::SingleGit),
            "dual-git" => Some(Self::DualGit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GitMode::SingleGit => "single-git",
            GitMode::DualGit => "dual-git",
        }
    }
}

/// Candidate locations of patterns.md, relative to the project root
pub const PATTERNS_FILES: &[&str] = &[
    ".claude/architect/patterns.md",
    "design/memory/patterns.md",
    ".design/memory/patterns.md",
];

/// Per-project settings read from patterns.md
#[derive(Debug, Clone, Serialize)]
pub struct ProjectConfig {
    pub mode: GitMode,
    /// Relative to the project root
    pub design_root: PathBuf,
    pub uuid_prefix: String,
    pub memory_root: PathBuf,
    /// The patterns.md that was read, if any
    pub patterns_file: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            mode: GitMode::SingleGit,
            design_root: PathBuf::from("docs/design"),
            uuid_prefix: "PROJ".to_string(),
            memory_root: PathBuf::from("design/memory"),
            patterns_file: None,
        }
    }
}

impl ProjectConfig {
    pub fn load(project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        // First patterns.md found wins
        let patterns = PATTERNS_FILES.iter().map(|p| project_root.join(p)).find(|p| p.is_file());

        let mut design_root_set = false;
        let mut mode_set = false;

        if let Some(patterns_file) = patterns {
            let content = fs::read_to_string(&patterns_file)
                .with_context(|| format!("Failed to read {}", patterns_file.display()))?;

            for line in content.lines() {
                if let Some((_, value)) = regex_captures!(r"^mode:\s*(\S+)", line) {
                    if let Some(mode) = GitMode::parse(value) {
                        config.mode = mode;
                        mode_set = true;
                    }
                } else if let Some((_, value)) = regex_captures!(r"^design_root:\s*(\S+)", line) {
                    config.design_root = PathBuf::from(clean_value(value));
                    design_root_set = true;
                } else if let Some((_, value)) = regex_captures!(r"^uuid_prefix:\s*(\S+)", line) {
                    config.uuid_prefix = check_prefix(&clean_value(value))
                        .with_context(|| format!("Bad uuid_prefix in {}", patterns_file.display()))?;
                } else if let Some((_, value)) = regex_captures!(r"^memory_root:\s*(\S+)", line) {
                    config.memory_root = PathBuf::from(clean_value(value));
                }
            }

            log::info!("Loaded project config from: {}", patterns_file.display());
            config.patterns_file = Some(patterns_file);
        }

        // A bare .design/ means dual-git unless patterns.md says otherwise
        if !design_root_set && project_root.join(".design").is_dir() {
            config.design_root = PathBuf::from(".design");
            if !mode_set {
                config.mode = GitMode::DualGit;
            }
        } else if !mode_set && config.design_root == Path::new(".design") {
            config.mode = GitMode::DualGit;
        }

        Ok(config)
    }

    /// Absolute design root for a project
    pub fn design_root(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.design_root)
    }

    /// Point a patterns file at `docs/design/` in single-git mode.
    ///
    /// Existing `mode:`/`design_root:` lines are rewritten, missing ones are
    /// appended, and a missing file is created. Returns whether anything changed.
    pub fn set_single_git(patterns_file: &Path) -> Result<bool> {
        let content = if patterns_file.is_file() {
            fs::read_to_string(patterns_file)
                .with_context(|| format!("Failed to read {}", patterns_file.display()))?
        } else {
            "# Architecture Patterns

".to_string()
        };

        let mut has_mode = false;
        let mut has_root = false;
        let mut lines: Vec<String> = content
            .split_inclusive('\n')
            .map(|line| {
                if line.starts_with("mode:") {
                    has_mode = true;
                    SINGLE_GIT_MODE.to_string()
                } else if line.starts_with("design_root:") {
                    has_root = true;
                    SINGLE_GIT_ROOT.to_string()
                } else {
                    line.to_string()
                }
            })
            .collect();

        // Keys must sit on their own lines
        if !(has_mode && has_root) && lines.last().is_some_and(|l| !l.ends_with('\n')) {
            lines.push("\n".to_string());
        }
        if !has_mode {
            lines.push(SINGLE_GIT_MODE.to_string());
        }
        if !has_root {
            lines.push(SINGLE_GIT_ROOT.to_string());
        }

        let updated = lines.concat();
        if updated == content {
            return Ok(false);
        }

        if let Some(parent) = patterns_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(patterns_file, updated).with_context(|| format!("Failed to write {}", patterns_file.display()))?;
        log::info!("Switched {} to single-git", patterns_file.display());
        Ok(true)
    }
}

const SINGLE_GIT_MODE: &str = "mode: single-git\n";
const SINGLE_GIT_ROOT: &str = "design_root: docs/design/\n";

fn clean_value(value: &str) -> String {
    value.trim_matches('"').trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.maestro.api_url, "http://localhost:23000");
        assert_eq!(config.maestro.retries, 1);
        assert_eq!(config.maestro.retry_delay_secs, 30);
        assert_eq!(config.github.label, "spec-attached");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "author: Jane\nmaestro:\n  timeout_secs: 3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.author, "Jane");
        assert_eq!(config.maestro.timeout_secs, 3);
        assert_eq!(config.maestro.api_url, "http://localhost:23000");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_expand_path_no_expansion() {
        let path = PathBuf::from("/usr/local/bin");
        let expanded = Config::expand_path(&path);
        assert_eq!(expanded, PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = Config::expand_path(&path);
        assert!(!expanded.to_string_lossy().contains('~'));
        assert!(expanded.to_string_lossy().contains("test"));
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Debug.as_filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::Off.as_filter(), log::LevelFilter::Off);
    }

    #[test]
    fn test_project_config_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(config.mode, GitMode::SingleGit);
        assert_eq!(config.design_root, PathBuf::from("docs/design"));
        assert_eq!(config.uuid_prefix, "PROJ");
        assert!(config.patterns_file.is_none());
    }

    #[test]
    fn test_project_config_from_patterns() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".claude/architect");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("patterns.md"),
            "# Patterns\n\nmode: single-git\ndesign_root: design/docs/\nuuid_prefix: auth\n",
        )
        .unwrap();

        let config = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(config.design_root, PathBuf::from("design/docs"));
        assert_eq!(config.uuid_prefix, "AUTH");
        assert_eq!(config.design_root(temp.path()), temp.path().join("design/docs"));
    }

    #[test]
    fn test_project_config_rejects_bad_prefix() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".claude/architect");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("patterns.md"), "uuid_prefix: MYPROJECT\n").unwrap();

        let err = ProjectConfig::load(temp.path()).unwrap_err();
        assert!(format!("{:?}", err).contains("Invalid UUID prefix 'MYPROJECT'"));
    }

    #[test]
    fn test_project_config_detects_dual_git() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".design/specs")).unwrap();

        let config = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(config.mode, GitMode::DualGit);
        assert_eq!(config.design_root, PathBuf::from(".design"));
    }

    #[test]
    fn test_set_single_git() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("patterns.md");
        fs::write(&file, "mode: dual-git\ndesign_root: .design/\nother: kept\n").unwrap();

        assert!(ProjectConfig::set_single_git(&file).unwrap());
        let content = fs::read_to_string(&file).unwrap();
        assert_eq!(content, "mode: single-git\ndesign_root: docs/design/\nother: kept\n");

        // Already single-git: nothing to do
        assert!(!ProjectConfig::set_single_git(&file).unwrap());
    }

    #[test]
    fn test_set_single_git_inserts_missing_keys() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("patterns.md");
        fs::write(&file, "# Patterns\nuuid_prefix: AUTH").unwrap();

        assert!(ProjectConfig::set_single_git(&file).unwrap());
        let content = fs::read_to_string(&file).unwrap();
        assert_eq!(
            content,
            "# Patterns\nuuid_prefix: AUTH\nmode: single-git\ndesign_root: docs/design/\n"
        );
    }

    #[test]
    fn test_set_single_git_creates_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".design/specs")).unwrap();
        let file = temp.path().join(PATTERNS_FILES[0]);

        assert!(ProjectConfig::set_single_git(&file).unwrap());

        // A left-over .design/ no longer wins
        let config = ProjectConfig::load(temp.path()).unwrap();
        assert_eq!(config.patterns_file.as_deref(), Some(file.as_path()));
        assert_eq!(config.mode, GitMode::SingleGit);
        assert_eq!(config.design_root, PathBuf::from("docs/design"));
    }

    #[test]
    fn test_git_mode_parse() {
        assert_eq!(GitMode::parse("dual-git"), Some(GitMode::DualGit));
        assert_eq!(GitMode::parse("\"single-git\""), Some(GitMode::SingleGit));
        assert_eq!(GitMode::parse("triple"), None);
    }
}
