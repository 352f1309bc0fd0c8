use colored::*;
use eyre::Result;
use std::path::Path;

use super::Context;
use crate::cli::PlanAction;
use crate::plan::PlanReport;
use crate::plan::compile::{CompileRequest, compile};
use crate::plan::deps::write_atomic;

pub fn run(action: PlanAction, ctx: &Context) -> Result<()> {
    match action {
        PlanAction::Validate { input, output, strict } => validate(&input, output.as_deref(), strict),
        PlanAction::Handoff {
            module,
            agent,
            platform,
            template,
            preview,
            root,
        } => handoff(
            &CompileRequest {
                project_root: &ctx.project_root,
                module_id: &module,
                agent_id: &agent,
                platform: &platform,
                template: template.as_deref(),
                root: &root,
                preview,
            },
            ctx,
        ),
    }
}

fn validate(input: &Path, output: Option<&Path>, strict: bool) -> Result<()> {
    let mut report = PlanReport::check_file(input)?;

    println!("Validating: {}", input.display());
    println!("{}", "=".repeat(50));

    if !report.errors.is_empty() {
        println!("\n{}", "ERRORS:".red().bold());
        for error in &report.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }
    if !report.warnings.is_empty() {
        println!("\n{}", "WARNINGS:".yellow().bold());
        for warning in &report.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    let metrics = &report.metrics;
    println!("\nMETRICS:");
    println!("  size_bytes: {}", metrics.size_bytes);
    println!("  lines: {}", metrics.lines);
    println!("  phases_found: {}", metrics.phases_found);
    println!("  tasks_found: {}", metrics.tasks_found);
    println!("  risks_found: {}", metrics.risks_found);
    println!("\n{}", "=".repeat(50));

    // Strict mode folds warnings in after they were listed
    if strict {
        report.apply_strict();
    }
    if report.valid {
        println!("{} VALIDATION PASSED", "✓".green());
    } else {
        println!("{} VALIDATION FAILED", "✗".red());
    }

    if let Some(path) = output {
        write_atomic(path, &format!("{}\n", serde_json::to_string_pretty(&report)?))?;
        println!("\nReport written to: {}", path.display());
    }
    log::info!(
        "Validated plan {} ({} errors, {} warnings)",
        input.display(),
        report.errors.len(),
        report.warnings.len()
    );

    if !report.valid {
        std::process::exit(1);
    }
    Ok(())
}

fn handoff(req: &CompileRequest<'_>, ctx: &Context) -> Result<()> {
    let compiled = compile(req)?;

    // Preview goes to stdout untouched
    let Some(path) = &compiled.path else {
        println!("\n--- PREVIEW ---\n");
        println!("{}", compiled.content);
        println!("\n--- END PREVIEW ---\n");
        return Ok(());
    };

    if ctx.quiet {
        println!("{}", path.display());
        return Ok(());
    }
    if compiled.minimal {
        println!("{} Module not in the exec-phase state file, using minimal data", "⚠".yellow());
    }
    println!("{} Handoff compiled", "✓".green());
    println!("  Module: {}", compiled.module.id);
    println!("  Agent: {}", req.agent_id);
    println!("  Saved to: {}", path.display());
    Ok(())
}
