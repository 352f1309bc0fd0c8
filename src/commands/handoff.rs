//! Hand a design document to a GitHub issue

use colored::*;
use eyre::Result;

use super::Context;
use crate::design::handoff::{GhCli, GithubError, HandoffReport, HandoffRequest, handoff};

/// Exit code when the GitHub CLI cannot be used
pub const EXIT_GITHUB_UNAVAILABLE: i32 = 2;

const PREVIEW_LINES: usize = 20;

pub fn run(target: &str, issue: &str, sanitize: bool, dry_run: bool, commit: bool, ctx: &Context) -> Result<()> {
    let design_root = ctx.design_root();
    let request = HandoffRequest {
        identifier: target,
        issue,
        sanitize,
        dry_run,
        commit,
        author: &ctx.config.author,
        label: &ctx.config.github.label,
        today: ctx.today(),
    };

    // Missing or logged-out gh gets its own exit code
    let tracker = GhCli::new();
    let report = match handoff(&ctx.project_root, &design_root, ctx.project.mode, &tracker, &request) {
        Ok(report) => report,
        Err(e) => {
            if let Some(gh) = e.downcast_ref::<GithubError>()
                && !matches!(gh, GithubError::CommandFailed { .. })
            {
                eprintln!("{} {}", "✗".red(), gh);
                std::process::exit(EXIT_GITHUB_UNAVAILABLE);
            }
            return Err(e);
        }
    };

    if report.dry_run {
        print_dry_run(&report, ctx);
    } else if !ctx.quiet {
        print_report(&report, ctx);
    }
    Ok(())
}

fn print_dry_run(report: &HandoffReport, ctx: &Context) {
    let shown = |p: &std::path::Path| p.strip_prefix(&ctx.project_root).unwrap_or(p).display().to_string();

    println!("{}", "Dry run: nothing will be written".yellow());
    println!("  Source: {}", shown(&report.source));
    println!("  UUID:   {}", report.uuid.cyan());
    println!("  Mode:   {}", report.mode.as_str());
    println!("  Would export to {}", shown(&report.export_file));
    if report.linked {
        println!("  Would add issue #{} to related_issues", report.issue);
    }
    if report.commit {
        println!("  Would commit export to git");
    } else {
        println!("  Would leave the export uncommitted");
    }
    println!();
    println!("=== Would post to issue #{} ===", report.issue);
    for line in report.comment.lines().take(PREVIEW_LINES) {
        println!("{}", line);
    }
    println!("...");
    println!("=== End dry run ===");
}

fn print_report(report: &HandoffReport, ctx: &Context) {
    let shown = |p: &std::path::Path| p.strip_prefix(&ctx.project_root).unwrap_or(p).display().to_string();

    println!("{} Handed off {} to issue #{}", "✓".green(), report.uuid.cyan(), report.issue);
    println!("  {} Exported to {}", "✓".green(), shown(&report.export_file));
    println!("  {} Comment posted", "✓".green());
    if report.label_added {
        println!("  {} Label '{}' added", "✓".green(), ctx.config.github.label);
    } else {
        println!("  {} Label '{}' not added", "⚠".yellow(), ctx.config.github.label);
    }
    if report.linked {
        println!("  {} Linked #{} in {}", "✓".green(), report.issue, shown(&report.source));
    }
    if report.committed {
        println!("  {} Export committed ({})", "✓".green(), report.mode.as_str());
    } else {
        println!("  {} Export not committed", "⚠".yellow());
    }
}
