use std::collections::{BTreeSet, HashMap};
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::GoalGraph;
use crate::models::GoalNode;

const DESCRIPTION_PREVIEW_CHARS: usize = 30;
const SEED_RADIUS: f64 = 100.0;

pub const EMPTY_GRAPH_MESSAGE: &str = "No goals yet. Add a goal to get started.";

/// An ordered pair identifying a link, used in highlight sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub source: String,
    pub target: String,
}

impl LinkKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Which goals and links to draw as highlighted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub nodes: BTreeSet<String>,
    pub links: BTreeSet<LinkKey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-goal positions handed back by the external layout simulation.
///
/// This is scratch state: it is never persisted and has no bearing on the
/// graph's structure.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    positions: HashMap<String, Position>,
}

impl LayoutState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every goal without a position on a circle around the viewport center,
    /// so the simulation has a sane starting point.
    pub fn seed(&mut self, graph: &GoalGraph, width: f64, height: f64) {
        let nodes = graph.all_nodes();
        let count = nodes.len().max(1) as f64;
        for (i, node) in nodes.iter().enumerate() {
            let angle = (i as f64) * 2.0 * PI / count;
            self.positions.entry(node.id.clone()).or_insert(Position {
                x: width / 2.0 + SEED_RADIUS * angle.cos(),
                y: height / 2.0 + SEED_RADIUS * angle.sin(),
            });
        }
    }

    pub fn set_position(&mut self, id: &str, x: f64, y: f64) {
        self.positions.insert(id.to_string(), Position { x, y });
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    /// Forget positions of goals that are no longer in the graph.
    pub fn retain(&mut self, graph: &GoalGraph) {
        self.positions.retain(|id, _| graph.contains(id));
    }

    /// View translation that centers `id` in a `width` x `height` viewport at `scale`.
    pub fn center_on(&self, id: &str, width: f64, height: f64, scale: f64) -> Option<(f64, f64)> {
        let pos = self.position(id)?;
        Some((width / 2.0 - scale * pos.x, height / 2.0 - scale * pos.y))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: String,
    /// Description cut to a short preview.
    pub description: String,
    pub color: String,
    pub category: String,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLink {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Everything the drawing layer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderModel {
    pub nodes: Vec<RenderNode>,
    pub links: Vec<RenderLink>,
    /// Shown instead of the graph when there is nothing to draw.
    pub placeholder: Option<String>,
}

/// Details for the selected-goal info panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: String,
    pub description: String,
    pub category: String,
    pub connections: String,
}

/// Read-only adapter between a [`GoalGraph`] and whatever draws it.
///
/// Borrowing the graph keeps the presenter honest: it can answer queries but
/// never mutate structure. Mutations go through the graph owner.
pub struct GraphPresenter<'a> {
    graph: &'a GoalGraph,
    layout: Option<&'a LayoutState>,
}

impl<'a> GraphPresenter<'a> {
    pub fn new(graph: &'a GoalGraph) -> Self {
        Self {
            graph,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: &'a LayoutState) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The goal itself, its parents and children, and every link touching it.
    ///
    /// Unknown ids highlight nothing.
    pub fn highlight_connections(&self, node_id: &str) -> Highlight {
        let Some(node) = self.graph.get_node(node_id) else {
            return Highlight::default();
        };

        let mut nodes = BTreeSet::new();
        nodes.insert(node.id.clone());
        nodes.extend(node.parents.iter().cloned());
        nodes.extend(node.children.iter().cloned());

        let links = self
            .graph
            .all_links()
            .iter()
            .filter(|l| l.touches(node_id))
            .map(|l| LinkKey::new(l.source.clone(), l.target.clone()))
            .collect();

        Highlight { nodes, links }
    }

    /// Ids of goals matching `query`. An empty (or blank) query highlights nothing.
    pub fn search(&self, query: &str) -> BTreeSet<String> {
        let query = query.trim();
        if query.is_empty() {
            return BTreeSet::new();
        }
        self.graph
            .search(query)
            .into_iter()
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn render_model(&self) -> RenderModel {
        if self.graph.is_empty() {
            return RenderModel {
                placeholder: Some(EMPTY_GRAPH_MESSAGE.to_string()),
                ..Default::default()
            };
        }

        let nodes = self
            .graph
            .all_nodes()
            .into_iter()
            .map(|n| RenderNode {
                id: n.id.clone(),
                description: preview(&n.description),
                color: n.category.color().to_string(),
                category: n.category.display_name().to_string(),
                position: self.layout.and_then(|l| l.position(&n.id)),
            })
            .collect();

        let links = self
            .graph
            .all_links()
            .iter()
            .map(|l| RenderLink {
                id: l.id.clone(),
                source: l.source.clone(),
                target: l.target.clone(),
            })
            .collect();

        RenderModel {
            nodes,
            links,
            placeholder: None,
        }
    }

    pub fn node_info(&self, id: &str) -> Option<NodeInfo> {
        let node = self.graph.get_node(id)?;
        Some(NodeInfo {
            id: node.id.clone(),
            description: node.description.clone(),
            category: node.category.display_name().to_string(),
            connections: connections_line(node),
        })
    }
}

fn connections_line(node: &GoalNode) -> String {
    let mut parts = Vec::new();
    if !node.parents.is_empty() {
        parts.push(format!("Parents: {}", node.parents.join(", ")));
    }
    if !node.children.is_empty() {
        parts.push(format!("Children: {}", node.children.join(", ")));
    }

    if parts.is_empty() {
        "No connections".to_string()
    } else {
        parts.join(" | ")
    }
}

fn preview(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
        let cut: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        description.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn chain() -> GoalGraph {
        let mut g = GoalGraph::new();
        g.add_node("a", "A", Category::Personal);
        g.add_node("b", "B", Category::Work);
        g.add_node("c", "C", Category::Health);
        g.add_link("a", "b");
        g.add_link("b", "c");
        g
    }

    #[test]
    fn highlight_unknown_node_is_empty() {
        let g = chain();
        assert_eq!(
            GraphPresenter::new(&g).highlight_connections("zzz"),
            Highlight::default()
        );
    }

    #[test]
    fn highlight_endpoint_only_reaches_direct_neighbors() {
        let g = chain();
        let h = GraphPresenter::new(&g).highlight_connections("a");
        assert_eq!(h.nodes, BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert_eq!(h.links, BTreeSet::from([LinkKey::new("a", "b")]));
    }

    #[test]
    fn blank_search_highlights_nothing() {
        let g = chain();
        assert!(GraphPresenter::new(&g).search("   ").is_empty());
        assert_eq!(
            GraphPresenter::new(&g).search("b"),
            BTreeSet::from(["b".to_string()])
        );
    }

    #[test]
    fn render_model_of_empty_graph_has_placeholder() {
        let g = GoalGraph::new();
        let model = GraphPresenter::new(&g).render_model();
        assert!(model.nodes.is_empty());
        assert_eq!(model.placeholder.as_deref(), Some(EMPTY_GRAPH_MESSAGE));
    }

    #[test]
    fn render_model_truncates_and_colors() {
        let mut g = GoalGraph::new();
        g.add_node(
            "long",
            "A description that is definitely longer than thirty characters",
            Category::Financial,
        );
        let mut layout = LayoutState::new();
        layout.set_position("long", 4.0, 2.0);

        let model = GraphPresenter::new(&g).with_layout(&layout).render_model();
        let node = &model.nodes[0];
        assert_eq!(node.description, "A description that is definite...");
        assert_eq!(node.color, "#9b59b6");
        assert_eq!(node.category, "Financial");
        assert_eq!(node.position, Some(Position { x: 4.0, y: 2.0 }));
        assert!(model.placeholder.is_none());
    }

    #[test]
    fn node_info_lists_connections() {
        let g = chain();
        let p = GraphPresenter::new(&g);
        assert_eq!(p.node_info("b").unwrap().connections, "Parents: a | Children: c");
        assert_eq!(p.node_info("c").unwrap().connections, "Parents: b");

        let mut lonely = GoalGraph::new();
        lonely.add_node("x", "X", Category::Work);
        let info = GraphPresenter::new(&lonely).node_info("x").unwrap();
        assert_eq!(info.connections, "No connections");
        assert_eq!(info.category, "Work");
    }

    #[test]
    fn layout_seed_retain_and_center() {
        let mut g = chain();
        let mut layout = LayoutState::new();
        layout.seed(&g, 400.0, 200.0);

        let a = layout.position("a").unwrap();
        assert!((a.x - 300.0).abs() < 1e-9);
        assert!((a.y - 100.0).abs() < 1e-9);

        layout.set_position("b", 10.0, 20.0);
        assert_eq!(layout.center_on("b", 400.0, 200.0, 1.5), Some((185.0, 70.0)));

        g.remove_node("b");
        layout.retain(&g);
        assert!(layout.position("b").is_none());
        assert!(layout.center_on("b", 400.0, 200.0, 1.5).is_none());
    }
}
