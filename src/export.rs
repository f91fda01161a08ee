//! JSON export and import of the goal graph.
//!
//! The document shape is `{ "nodes": [...], "links": [...] }`, the same
//! [`GraphSnapshot`] used for storage.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::graph::GoalGraph;
use crate::models::GraphSnapshot;

pub const DEFAULT_EXPORT_FILE: &str = "goal-graph.json";

pub fn export_json(graph: &GoalGraph) -> Result<String> {
    serde_json::to_string_pretty(&graph.snapshot()).context("Failed to serialize goal graph")
}

pub fn import_json(json: &str) -> Result<GoalGraph> {
    let snapshot: GraphSnapshot =
        serde_json::from_str(json).context("Failed to parse goal graph document")?;
    Ok(GoalGraph::from(snapshot))
}

pub fn write_export(graph: &GoalGraph, path: &Path) -> Result<()> {
    let json = export_json(graph)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create export directory")?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(
        "Exported {} goals to {}",
        graph.len(),
        path.display()
    );
    Ok(())
}

pub fn read_import(path: &Path) -> Result<GoalGraph> {
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    import_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn export_has_nodes_and_links_keys() {
        let mut g = GoalGraph::new();
        g.add_node("a", "A", Category::Work);
        g.add_node("b", "B", Category::Health);
        g.add_link("a", "b");

        let value: serde_json::Value = serde_json::from_str(&export_json(&g).unwrap()).unwrap();
        assert_eq!(value["nodes"][0]["id"], "a");
        assert_eq!(value["nodes"][0]["category"], "work");
        assert_eq!(value["nodes"][0]["children"][0], "b");
        assert_eq!(value["nodes"][1]["parents"][0], "a");
        assert_eq!(value["links"][0]["source"], "a");
        assert_eq!(value["links"][0]["target"], "b");
        assert_eq!(value["links"][0]["id"], "a-b");
    }

    #[test]
    fn import_tolerates_minimal_documents() {
        let json = r#"{
            "nodes": [
                { "id": "x", "description": "X" },
                { "id": "y", "description": "Y", "category": "learning" }
            ],
            "links": [ { "source": "x", "target": "y" } ]
        }"#;
        let g = import_json(json).unwrap();
        assert_eq!(g.get_node("x").unwrap().category, Category::Personal);
        assert_eq!(g.get_node("y").unwrap().parents, vec!["x"]);
        assert_eq!(g.all_links()[0].id, "x-y");
    }

    #[test]
    fn import_rejects_garbage() {
        assert!(import_json("not json").is_err());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_EXPORT_FILE);

        let g = GoalGraph::example();
        write_export(&g, &path).unwrap();
        let back = read_import(&path).unwrap();
        assert_eq!(back.snapshot(), g.snapshot());
    }
}
