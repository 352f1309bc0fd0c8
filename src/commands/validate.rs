use colored::*;
use eyre::{Result, bail};
use std::path::Path;

use super::Context;
use crate::design::validate::{ValidationResult, validate_dir, validate_file};

pub fn run(file: Option<&Path>, dir: Option<&Path>, all: bool, strict: bool, ctx: &Context) -> Result<()> {
    // Collect results for the chosen target
    let results = match (file, dir, all) {
        (Some(file), _, _) => vec![validate_file(file, strict)],
        (None, Some(dir), _) => {
            if !dir.is_dir() {
                bail!("Directory not found: {}", dir.display());
            }
            validate_dir(dir, strict)
        }
        (None, None, true) => {
            let design_root = ctx.design_root();
            if !design_root.is_dir() {
                bail!("Design root not found: {}", design_root.display());
            }
            validate_dir(&design_root, strict)
        }
        (None, None, false) => bail!("Specify --file, --dir, or --all"),
    };

    // Invalid files are always listed; -q hides the valid ones
    let mut valid = 0;
    let mut invalid = 0;
    for result in &results {
        if result.valid {
            valid += 1;
            if !ctx.quiet {
                print_result(result, ctx);
            }
        } else {
            invalid += 1;
            print_result(result, ctx);
        }
    }

    println!();
    println!("Summary: {} valid, {} invalid", valid, invalid);
    log::info!("Validated {} documents ({} invalid)", results.len(), invalid);

    if invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_result(result: &ValidationResult, ctx: &Context) {
    let shown = result.path.strip_prefix(&ctx.project_root).unwrap_or(&result.path);
    if result.valid {
        println!("{} {}", "✓".green(), shown.display());
    } else {
        println!("{} {}", "✗".red(), shown.display());
    }

    for error in &result.errors {
        println!("    {} {}", "ERROR:".red(), error);
    }
    // Warnings only with -v
    if ctx.verbose {
        for warning in &result.warnings {
            println!("    {} {}", "WARN:".yellow(), warning);
        }
    }
}
