//! Move design documents from `.design/` into `docs/design/`

use colored::*;
use eyre::{Context as _, Result};
use std::io::{self, BufRead, Write};

use super::Context;
use crate::design::transition::{TransitionOptions, TransitionReport, transition};

pub fn run(opts: TransitionOptions, ctx: &Context) -> Result<()> {
    let report = transition(&ctx.project_root, opts, &mut confirm_on_stdin)?;

    if report.dry_run {
        println!("{}", "Dry run: nothing was written".yellow());
    }
    print_counts(&report);

    for (dir, count) in &report.copied {
        let verb = if report.dry_run { "Would copy" } else { "Copied" };
        println!("  {} {} {} files from .design/{}/", "→".blue(), verb, count, dir);
    }
    if report.counter_copied {
        println!("  {} UUID counter", "→".blue());
    }

    // patterns.md is what makes later commands use docs/design/
    match &report.patterns_file {
        Some(path) if report.patterns_updated => {
            println!("  {} Updated {} (mode: single-git)", "✓".green(), path.display())
        }
        Some(path) if report.dry_run => println!("  Would update {}", path.display()),
        Some(path) => println!("  {} {} already single-git", "✓".green(), path.display()),
        None => println!("  {} No patterns.md found", "⚠".yellow()),
    }

    if !report.dry_run {
        if report.committed {
            println!("  {} Changes committed", "✓".green());
        } else if opts.commit {
            println!("  {} Changes not committed", "⚠".yellow());
        }
    }

    // .design/ is never deleted here
    if report.private_left_behind {
        println!();
        println!("The private design directory was kept. Once verified, remove it with:");
        println!("  {}", "rm -rf .design".cyan());
    }
    Ok(())
}

fn print_counts(report: &TransitionReport) {
    println!("{}", "Documents in .design/".bold());
    println!("  Specs: {}", report.specs);
    println!("  Plans: {}", report.plans);
    println!("  ADRs:  {}", report.adrs);
    println!("  Total: {}", report.total);
}

fn confirm_on_stdin(report: &TransitionReport) -> Result<bool> {
    print_counts(report);
    println!();
    println!("{}", "This copies every design document into docs/design/ (public).".yellow());
    print!("Type CONFIRM to proceed: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;
    Ok(answer.trim() == "CONFIRM")
}
