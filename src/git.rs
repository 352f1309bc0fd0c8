//! Thin wrapper over the git CLI

use eyre::{Context, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Run git with `cwd` as the working directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("Failed to run git {}", args.join(" ")))
}

/// Stage `paths` and commit them.
///
/// Returns false when git reports nothing to commit.
pub fn commit(cwd: &Path, paths: &[&str], message: &str) -> Result<bool> {
    let mut add_args = vec!["add", "--"];
    add_args.extend_from_slice(paths);
    let add = git(cwd, &add_args)?;
    if !add.status.success() {
        let stderr = String::from_utf8_lossy(&add.stderr);
        eyre::bail!("git add failed: {}", stderr.trim());
    }

    let output = git(cwd, &["commit", "-m", message])?;
    if output.status.success() {
        log::info!("Committed in {}: {}", cwd.display(), message.lines().next().unwrap_or_default());
        return Ok(true);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
        return Ok(false);
    }
    eyre::bail!("git commit failed: {}", stderr.trim())
}
