use colored::*;
use eyre::{Result, bail};

use super::Context;
use crate::cli::UuidAction;
use crate::design::uuid::{self as design_uuid, DocUuid, Stamp, StampOptions};

pub fn run(action: UuidAction, ctx: &Context) -> Result<()> {
    match action {
        UuidAction::New { doc_type, prefix } => {
            // Fall back to the prefix from patterns.md
            let prefix = prefix.unwrap_or_else(|| ctx.project.uuid_prefix.clone());
            let uuid = DocUuid::generate(&prefix, doc_type, ctx.today())?;
            println!("{}", uuid);
            Ok(())
        }
        UuidAction::Next { base } => {
            println!("{}", design_uuid::next_version(&base, &ctx.design_root())?);
            Ok(())
        }
        UuidAction::Stamp {
            file,
            dir,
            doc_type,
            prefix,
            force,
        } => {
            let prefix = prefix.unwrap_or_else(|| ctx.project.uuid_prefix.clone());
            let opts = StampOptions {
                doc_type,
                prefix: &prefix,
                author: &ctx.config.author,
                date: ctx.today(),
                force,
            };

            let stamps = match (file, dir) {
                (Some(file), _) => vec![design_uuid::stamp_file(&file, &opts)?],
                (None, Some(dir)) => design_uuid::stamp_dir(&dir, &opts)?,
                (None, None) => bail!("Specify --file or --dir"),
            };
            print_stamps(&stamps, ctx.quiet);
            Ok(())
        }
        // Only documents with a frontmatter uuid
        UuidAction::List => {
            let uuids = design_uuid::list_uuids(&ctx.design_root());
            if uuids.is_empty() && !ctx.quiet {
                eprintln!("No UUIDs found under {}", ctx.design_root().display());
            }
            for (uuid, path) in uuids {
                let shown = path.strip_prefix(&ctx.project_root).unwrap_or(&path);
                println!("{}  {}", uuid, shown.display().to_string().dimmed());
            }
            Ok(())
        }
    }
}

fn print_stamps(stamps: &[Stamp], quiet: bool) {
    let mut added = 0;
    for stamp in stamps {
        match stamp {
            Stamp::Added { path, uuid } => {
                added += 1;
                if !quiet {
                    println!("{} {} {}", "✓".green(), uuid.cyan(), path.display());
                }
            }
            Stamp::Skipped { path, uuid } => {
                if !quiet {
                    println!("{} {} already has {}", "⚠".yellow(), path.display(), uuid);
                }
            }
        }
    }
    if !quiet && stamps.len() > 1 {
        println!();
        println!("Stamped {} of {} files", added, stamps.len());
    }
}
