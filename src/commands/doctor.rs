//! Diagnose atlas setup issues

use colored::*;
use eyre::Result;
use std::process::Command;

use super::Context;
use crate::config::Config;
use crate::design::TYPE_DIRS;
use crate::maestro::resolve_session_name;

pub fn run(ctx: &Context) -> Result<()> {
    println!("{}", "Atlas Doctor".bold());
    println!("{}", "═".repeat(50));
    println!();

    let mut issues = 0;

    let config_file = Config::atlas_dir().join("atlas.yaml");
    if config_file.exists() {
        println!("{} Config file: {}", "✓".green(), config_file.display());
    } else {
        println!("{} Config file missing: {} (using defaults)", "⚠".yellow(), config_file.display());
    }

    println!();
    println!("{}", "Project:".bold());
    println!("  Root: {}", ctx.project_root.display());
    println!("  Mode: {}", ctx.project.mode.as_str());
    match &ctx.project.patterns_file {
        Some(path) => println!("  {} patterns.md: {}", "✓".green(), path.display()),
        None => println!("  {} No patterns.md (defaults in use)", "⚠".yellow()),
    }

    let design_root = ctx.design_root();
    if design_root.is_dir() {
        println!("  {} Design root: {}", "✓".green(), design_root.display());
        for dir in TYPE_DIRS {
            if !design_root.join(dir).is_dir() {
                println!("  {} Missing {}/", "⚠".yellow(), dir);
            }
        }
    } else {
        println!("  {} Design root missing: {}", "✗".red(), design_root.display());
        println!("    Run {} to create it", "atlas init".cyan());
        issues += 1;
    }

    println!();
    println!("{}", "Dependencies:".bold());

    if check_command("git", &["--version"]) {
        println!("  {} git", "✓".green());
    } else {
        println!("  {} git (required for handoff and transition commits)", "✗".red());
        issues += 1;
    }

    if which::which("gh").is_err() {
        println!("  {} gh (needed for handoff)", "⚠".yellow());
    } else if check_command("gh", &["auth", "status"]) {
        println!("  {} gh (authenticated)", "✓".green());
    } else {
        println!("  {} gh (not authenticated, run: gh auth login)", "⚠".yellow());
    }

    if which::which("tmux").is_ok() {
        println!("  {} tmux", "✓".green());
    } else {
        println!("  {} tmux (session name falls back to config)", "⚠".yellow());
    }

    println!();
    println!("{}", "AI Maestro:".bold());
    println!("  API: {}", ctx.config.maestro.api_url);
    println!(
        "  Agent: {}",
        resolve_session_name(ctx.config.maestro.session_name.as_deref())
    );

    println!();
    println!("{}", "═".repeat(50));
    if issues == 0 {
        println!("{} All checks passed!", "✓".green().bold());
    } else {
        println!("{} {} issue(s) found", "⚠".yellow().bold(), issues);
    }

    Ok(())
}

fn check_command(cmd: &str, args: &[&str]) -> bool {
    Command::new(cmd)
        .args(args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
