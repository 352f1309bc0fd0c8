//! Status, archive, supersede and history commands

use colored::*;
use eyre::Result;

use super::Context;
use crate::design::Status;
use crate::design::lifecycle;

pub fn status(uuid: &str, to: Status, force: bool, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let change = lifecycle::update_status(&store, uuid, to, force, ctx.today())?;

    if !ctx.quiet {
        println!(
            "{} {}: {} -> {}",
            "✓".green(),
            uuid.cyan(),
            change.from.as_deref().unwrap_or("(none)"),
            change.to.as_str().green()
        );
        println!("  {}", store.relative(&change.path).display().to_string().dimmed());
    }
    Ok(())
}

pub fn archive(uuid: &str, reason: Option<&str>, superseded_by: Option<&str>, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    let target = lifecycle::archive(&store, uuid, reason, superseded_by, ctx.today())?;

    if !ctx.quiet {
        println!("{} Archived {}", "✓".green(), uuid.cyan());
        println!("  {}", store.relative(&target).display());
        if let Some(by) = superseded_by {
            println!("  Superseded by: {}", by);
        }
    }
    Ok(())
}

pub fn supersede(old: &str, new: &str, ctx: &Context) -> Result<()> {
    lifecycle::supersede(&ctx.store(), old, new, ctx.today())?;

    if !ctx.quiet {
        println!("{} {} superseded by {}", "✓".green(), old.cyan(), new.cyan());
    }
    Ok(())
}

pub fn history(uuid: &str, ctx: &Context) -> Result<()> {
    let (base, entries) = lifecycle::history(&ctx.store(), uuid)?;

    println!("{} {}", "History of".bold(), base.cyan());
    println!();
    println!(
        "{:<8} {:<12} {:<12} {}",
        "VERSION".bold(),
        "STATUS".bold(),
        "UPDATED".bold(),
        "UUID".bold()
    );
    // Supersession links under each version
    for entry in &entries {
        println!("{:<8} {:<12} {:<12} {}", entry.version, entry.status, entry.updated, entry.uuid);
        if let Some(old) = entry.supersedes.as_deref().filter(|s| !s.is_empty()) {
            println!("         {} {}", "supersedes".dimmed(), old);
        }
        if let Some(new) = entry.superseded_by.as_deref().filter(|s| !s.is_empty()) {
            println!("         {} {}", "superseded by".dimmed(), new);
        }
    }
    Ok(())
}
