use colored::*;
use eyre::{Result, bail};
use std::path::Path;

use super::Context;
use crate::design::DocType;
use crate::design::export::{ExportFormat, export_batch, export_document};

pub fn run(
    uuid: Option<&str>,
    doc_type: Option<DocType>,
    out: Option<&Path>,
    sanitize: bool,
    format: ExportFormat,
    ctx: &Context,
) -> Result<()> {
    let store = ctx.store();

    match (uuid, doc_type) {
        // Single document
        (Some(uuid), _) => {
            let path = export_document(&store, uuid, out, sanitize, format)?;
            if ctx.quiet {
                println!("{}", path.display());
            } else {
                println!("{} Exported {} to {}", "✓".green(), uuid.cyan(), path.display());
            }
        }
        // Every document of a type; files without a UUID are reported
        (None, Some(doc_type)) => {
            let batch = export_batch(&store, doc_type.tag(), out, sanitize, format)?;
            for path in &batch.exported {
                println!("{} {}", "✓".green(), path.display());
            }
            for path in &batch.skipped {
                println!("{} {} (no UUID)", "⚠".yellow(), store.relative(path).display());
            }
            if !ctx.quiet {
                println!();
                println!("Exported {} {} documents", batch.exported.len(), doc_type);
            }
        }
        (None, None) => bail!("Specify --uuid or --type"),
    }
    Ok(())
}
