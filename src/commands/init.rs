//! Create the design folder layout

use colored::*;
use eyre::Result;

use super::Context;
use crate::design::init::init_design_folders;

pub fn run(ctx: &Context) -> Result<()> {
    let design_root = ctx.design_root();
    let created = init_design_folders(&ctx.project_root, &design_root)?;

    if ctx.quiet {
        return Ok(());
    }

    println!(
        "{} Design folders at {} ({})",
        "✓".green(),
        design_root.display().to_string().cyan(),
        ctx.project.mode.as_str()
    );
    if created.is_empty() {
        println!("  Already initialized");
    }
    for path in &created {
        let shown = path.strip_prefix(&ctx.project_root).unwrap_or(path);
        println!("  {} {}", "+".green(), shown.display());
    }

    Ok(())
}
