//! Search design documents

use colored::*;
use eyre::{Result, bail};
use std::fs;
use terminal_size::{Width, terminal_size};

use super::Context;
use crate::cli::SearchOutput;
use crate::design::store::{DesignStore, DocumentMetadata, SearchQuery};

const TITLE_WIDTH: usize = 38;

pub fn run(query: &SearchQuery, format: SearchOutput, ctx: &Context) -> Result<()> {
    let store = ctx.store();
    if !store.exists() {
        bail!("Design root not found: {}", store.design_root().display());
    }

    // Table output is always ordered by UUID
    let mut results = store.search(query);
    results.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    log::info!("Search matched {} documents", results.len());

    match format {
        SearchOutput::Table => print_table(&results),
        SearchOutput::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        SearchOutput::Yaml => print!("{}", serde_yaml::to_string(&results)?),
        SearchOutput::Path => {
            for doc in &results {
                println!("{}", store.relative(&doc.path).display());
            }
        }
        SearchOutput::Uuid => {
            for doc in results.iter().filter(|d| !d.uuid.is_empty()) {
                println!("{}", doc.uuid);
            }
        }
        SearchOutput::Content => print_contents(&store, &results),
    }

    // An empty result is a failure for scripts
    if results.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn get_terminal_width() -> usize {
    terminal_size().map(|(Width(w), _)| w as usize).unwrap_or(100)
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_WIDTH {
        let head: String = title.chars().take(TITLE_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

fn print_table(results: &[DocumentMetadata]) {
    if results.is_empty() {
        println!("No documents found.");
        return;
    }

    // Size the UUID column to the longest id
    let uuid_width = results.iter().map(|d| d.uuid.len()).max().unwrap_or(4).max(4);
    let rule = (uuid_width + 1 + 6 + 1 + 12 + 1 + TITLE_WIDTH).min(get_terminal_width());

    println!(
        "{:<uuid_width$} {:<6} {:<12} {}",
        "UUID".bold(),
        "TYPE".bold(),
        "STATUS".bold(),
        "TITLE".bold(),
        uuid_width = uuid_width,
    );
    println!("{}", "-".repeat(rule));

    for doc in results {
        let status = match doc.status.as_str() {
            "approved" | "implemented" => doc.status.green(),
            "draft" | "review" => doc.status.yellow(),
            _ => doc.status.dimmed(),
        };
        println!(
            "{:<uuid_width$} {:<6} {:<12} {}",
            doc.uuid.cyan(),
            doc.doc_type,
            status,
            truncate_title(&doc.title),
            uuid_width = uuid_width,
        );
    }

    println!();
    println!("{}", format!("Total: {} documents", results.len()).dimmed());
}

fn print_contents(store: &DesignStore, results: &[DocumentMetadata]) {
    let mut parts = Vec::new();
    for doc in results {
        match fs::read_to_string(&doc.path) {
            Ok(content) => parts.push(format!("--- FILE: {} ---\n{}", store.relative(&doc.path).display(), content)),
            Err(e) => log::warn!("Cannot read {}: {}", doc.path.display(), e),
        }
    }
    println!("{}", parts.join("\n\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("Short"), "Short");
        let long = "A".repeat(40);
        let shown = truncate_title(&long);
        assert_eq!(shown.chars().count(), TITLE_WIDTH);
        assert!(shown.ends_with("..."));
        assert_eq!(truncate_title(&"B".repeat(38)), "B".repeat(38));
    }
}
