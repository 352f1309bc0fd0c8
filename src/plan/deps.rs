//! Dependency graph ordering for plans
//!
//! Graph files look like `{"nodes": {"A": {"deps": ["B"], "status": "pending"}}}`
//! in JSON or YAML. Output order always puts dependencies before dependents.

use eyre::{Context, Result, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct GraphFile {
    nodes: Option<IndexMap<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    pub deps: Vec<String>,
    /// Every other key of the node
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexMap<String, Node>,
}

impl DependencyGraph {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("Graph file not found: {}", path.display());
        }
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid graph file {}", path.display()))
    }

    /// Parse JSON, falling back to YAML
    pub fn parse(content: &str) -> Result<Self> {
        let file: GraphFile = match serde_json::from_str(content) {
            Ok(file) => file,
            Err(json_err) => serde_yaml::from_str(content).map_err(|yaml_err| {
                eyre::eyre!("Neither JSON ({}) nor YAML ({})", json_err, yaml_err)
            })?,
        };

        let Some(raw) = file.nodes else {
            bail!(r#"Invalid graph format. Expected: {{"nodes": {{"A": {{"deps": [...]}}, ...}}}}"#);
        };

        let mut nodes = IndexMap::new();
        for (id, value) in raw {
            let node = match value {
                Value::Null => Node::default(),
                Value::Object(mut fields) => {
                    let deps = match fields.remove("deps") {
                        None | Some(Value::Null) => Vec::new(),
                        Some(Value::Array(items)) => items
                            .into_iter()
                            .map(|item| match item {
                                Value::String(s) => s,
                                other => other.to_string(),
                            })
                            .collect(),
                        Some(other) => bail!("Node '{}' has invalid deps (must be list): {}", id, other),
                    };
                    Node { deps, fields }
                }
                _ => Node::default(),
            };
            nodes.insert(id, node);
        }

        for (id, node) in &nodes {
            let missing: Vec<&str> = node
                .deps
                .iter()
                .filter(|d| !nodes.contains_key(d.as_str()))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                bail!("Node '{}' references non-existent dependencies: {}", id, missing.join(", "));
            }
        }

        log::info!("Loaded dependency graph with {} nodes", nodes.len());
        Ok(Self { nodes })
    }

    /// Every cycle reachable by DFS in declaration order, as `a, b, ..., a`
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = HashSet::new();
        let mut on_path = HashSet::new();
        let mut path = Vec::new();

        for id in self.nodes.keys() {
            if !visited.contains(id.as_str()) {
                self.visit(id, &mut visited, &mut on_path, &mut path, &mut cycles);
            }
        }

        if !cycles.is_empty() {
            log::warn!("Detected {} dependency cycle(s)", cycles.len());
        }
        cycles
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        visited: &mut HashSet<&'a str>,
        on_path: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(id);
        on_path.insert(id);
        path.push(id);

        for dep in &self.nodes[id].deps {
            if !visited.contains(dep.as_str()) {
                self.visit(dep, visited, on_path, path, cycles);
            } else if on_path.contains(dep.as_str())
                && let Some(start) = path.iter().position(|p| *p == dep)
            {
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(dep.clone());
                cycles.push(cycle);
            }
        }

        path.pop();
        on_path.remove(id);
    }

    /// Kahn's algorithm; ties broken by name
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            let listed: Vec<String> = cycles.iter().map(|c| format!("  - {}", c.join(" -> "))).collect();
            bail!(
                "Cannot perform topological sort: circular dependencies detected:\n{}",
                listed.join("\n")
            );
        }

        let mut in_degree: IndexMap<&str, usize> =
            self.nodes.iter().map(|(id, node)| (id.as_str(), node.deps.len())).collect();

        let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (id, node) in &self.nodes {
            for dep in &node.deps {
                dependents.entry(dep.as_str()).or_default().push(id.as_str());
            }
        }

        let mut ready: Vec<&str> = in_degree.iter().filter(|(_, d)| **d == 0).map(|(id, _)| *id).collect();
        ready.sort_unstable();
        let mut queue: VecDeque<&str> = ready.into();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());

            let mut next = dependents.get(id).cloned().unwrap_or_default();
            next.sort_unstable();
            for dependent in next {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let done: HashSet<&str> = order.iter().map(String::as_str).collect();
            let left: Vec<&str> = self.nodes.keys().map(String::as_str).filter(|id| !done.contains(id)).collect();
            bail!("Topological sort incomplete. Unprocessed nodes: {}", left.join(", "));
        }

        Ok(order)
    }

    /// Transitive dependencies of `id`, in execution order
    pub fn subgraph(&self, id: &str) -> Result<Vec<String>> {
        let Some(node) = self.nodes.get(id) else {
            bail!("Node not found in graph: {}", id);
        };

        let mut reachable: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = node.deps.iter().map(String::as_str).collect();
        while let Some(dep) = queue.pop_front() {
            if reachable.insert(dep) {
                queue.extend(self.nodes[dep].deps.iter().map(String::as_str));
            }
        }

        Ok(self
            .topological_sort()?
            .into_iter()
            .filter(|n| reachable.contains(n.as_str()))
            .collect())
    }

    /// Nodes whose `field` equals `value`, in execution order
    pub fn filter(&self, field: &str, value: &str) -> Result<Vec<String>> {
        let matching: HashSet<&str> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.fields.get(field).is_some_and(|v| match v {
                    Value::String(s) => s == value,
                    other => other.to_string() == value,
                })
            })
            .map(|(id, _)| id.as_str())
            .collect();

        Ok(self
            .topological_sort()?
            .into_iter()
            .filter(|n| matching.contains(n.as_str()))
            .collect())
    }
}

/// Write through a temp file in the target directory, then rename over it
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut temp =
        tempfile::NamedTempFile::new_in(dir).with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(content.as_bytes()).context("Failed to write temp file")?;
    temp.as_file().sync_all().context("Failed to sync temp file")?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const GRAPH: &str = r#"{
        "nodes": {
            "task_A": {"deps": ["task_B", "task_C"], "status": "pending"},
            "task_B": {"deps": [], "status": "done"},
            "task_C": {"deps": ["task_B"], "status": "pending"},
            "task_D": null
        }
    }"#;

    #[test]
    fn test_topological_order() {
        let graph = DependencyGraph::parse(GRAPH).unwrap();
        assert_eq!(graph.topological_sort().unwrap(), vec!["task_B", "task_D", "task_C", "task_A"]);
    }

    #[test]
    fn test_yaml_input() {
        let yaml = "nodes:\n  build:\n    deps: [fetch]\n  fetch:\n";
        let graph = DependencyGraph::parse(yaml).unwrap();
        assert_eq!(graph.topological_sort().unwrap(), vec!["fetch", "build"]);
    }

    #[test]
    fn test_load_errors() {
        let err = DependencyGraph::parse(r#"{"tasks": {}}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid graph format"));

        let err = DependencyGraph::parse(r#"{"nodes": {"A": {"deps": "B"}}}"#).unwrap_err();
        assert!(err.to_string().contains("invalid deps"));

        let err = DependencyGraph::parse(r#"{"nodes": {"A": {"deps": ["Z"]}}}"#).unwrap_err();
        assert!(err.to_string().contains("non-existent dependencies: Z"));
    }

    #[test]
    fn test_cycles_reported() {
        let graph =
            DependencyGraph::parse(r#"{"nodes": {"A": {"deps": ["B"]}, "B": {"deps": ["C"]}, "C": {"deps": ["A"]}, "D": {}}}"#)
                .unwrap();
        assert_eq!(graph.detect_cycles(), vec![vec!["A", "B", "C", "A"]]);

        let err = graph.topological_sort().unwrap_err();
        assert!(err.to_string().contains("A -> B -> C -> A"));
    }

    #[test]
    fn test_subgraph_and_filter() {
        let graph = DependencyGraph::parse(GRAPH).unwrap();
        assert_eq!(graph.subgraph("task_A").unwrap(), vec!["task_B", "task_C"]);
        assert!(graph.subgraph("task_D").unwrap().is_empty());
        assert!(graph.subgraph("missing").is_err());

        assert_eq!(graph.filter("status", "pending").unwrap(), vec!["task_C", "task_A"]);
        assert!(graph.filter("owner", "x").unwrap().is_empty());
    }

    #[test]
    fn test_write_atomic() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out/order.txt");
        write_atomic(&out, "a\nb\n").unwrap();
        write_atomic(&out, "b\n").unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "b\n");
        assert_eq!(fs::read_dir(temp.path().join("out")).unwrap().count(), 1);
    }
}
