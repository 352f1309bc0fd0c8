use colored::*;
use eyre::Result;

use super::Context;
use crate::cli::VersionAction;
use crate::design::version::{create_version, list_versions};

pub fn run(action: VersionAction, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    match action {
        VersionAction::Create { uuid, reason } => {
            let created = create_version(&store, &uuid, reason.as_deref(), ctx.today())?;
            // Quiet mode prints only the new UUID for scripts
            if ctx.quiet {
                println!("{}", created.uuid);
            } else {
                println!("{} Created version {:04} of {}", "✓".green(), created.version, created.previous);
                println!("  UUID: {}", created.uuid.cyan());
                println!("  File: {}", store.relative(&created.path).display());
            }
        }
        VersionAction::List { uuid } => {
            let versions = list_versions(&store, &uuid);
            if versions.is_empty() {
                eyre::bail!("No versions found for: {}", uuid);
            }
            for (version_uuid, path) in versions {
                println!("{}  {}", version_uuid, store.relative(&path).display().to_string().dimmed());
            }
        }
    }
    Ok(())
}
