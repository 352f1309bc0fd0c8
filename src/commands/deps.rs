use eyre::Result;

use crate::cli::{DepsAction, DepsArgs, DepsFormat};
use crate::plan::DependencyGraph;
use crate::plan::deps::write_atomic;

pub fn run(action: DepsAction) -> Result<()> {
    match action {
        DepsAction::Order { io } => {
            let graph = DependencyGraph::load(&io.input)?;
            emit(&graph.topological_sort()?, &io)
        }
        DepsAction::Cycles { io } => {
            let graph = DependencyGraph::load(&io.input)?;
            let cycles: Vec<String> = graph.detect_cycles().iter().map(|c| c.join(" -> ")).collect();
            emit(&cycles, &io)
        }
        DepsAction::Subgraph { node, io } => {
            let graph = DependencyGraph::load(&io.input)?;
            emit(&graph.subgraph(&node)?, &io)
        }
        DepsAction::Filter { field, value, io } => {
            let graph = DependencyGraph::load(&io.input)?;
            emit(&graph.filter(&field, &value)?, &io)
        }
    }
}

fn render(items: &[String], format: DepsFormat) -> Result<String> {
    Ok(match format {
        DepsFormat::Json => serde_json::to_string_pretty(items)?,
        DepsFormat::Text => items.join("\n"),
    })
}

fn emit(items: &[String], io: &DepsArgs) -> Result<()> {
    let output = render(items, io.format)?;
    match &io.output {
        Some(path) => {
            write_atomic(path, &format!("{}\n", output))?;
            log::info!("Wrote {} entries to {}", items.len(), path.display());
        }
        None => println!("{}", output),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_formats() {
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(render(&items, DepsFormat::Text).unwrap(), "a\nb");
        assert_eq!(render(&items, DepsFormat::Json).unwrap(), "[\n  \"a\",\n  \"b\"\n]");
        assert_eq!(render(&[], DepsFormat::Json).unwrap(), "[]");
    }
}
