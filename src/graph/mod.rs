//! In-memory goal graph.
//!
//! Nodes live in an id-keyed map; edges are stored twice, once as the link
//! list and once as the `children`/`parents` id lists on each endpoint. Every
//! mutating operation keeps the two views in step:
//!
//! - for every link `a -> b`, `b` appears exactly once in `a.children` and `a`
//!   exactly once in `b.parents`;
//! - ids are unique;
//! - removing a node leaves no reference to it anywhere.
//!
//! Cycles and self-loops are allowed. Nothing here does I/O.
//!
//! The boolean methods (`add_node`, `add_link`, ...) mirror what the UI needs:
//! a failed call changes nothing and returns `false`. The `try_*` variants
//! carry the reason as a [`GraphError`].

mod presenter;
pub mod tree_render;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::models::{Category, GoalLink, GoalNode, GraphSnapshot};

pub use presenter::*;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("Goal with ID \"{0}\" already exists")]
    DuplicateId(String),

    #[error("One or both goals don't exist: \"{from}\" -> \"{to}\"")]
    MissingEndpoint { from: String, to: String },

    #[error("Link \"{from}\" -> \"{to}\" already exists")]
    DuplicateLink { from: String, to: String },

    #[error("Goal \"{0}\" not found")]
    NotFound(String),

    #[error("Link \"{from}\" -> \"{to}\" not found")]
    LinkNotFound { from: String, to: String },

    #[error("Invalid goal: {0}")]
    InvalidInput(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct GoalGraph {
    nodes: HashMap<String, GoalNode>,
    /// Creation order of the ids in `nodes`.
    order: Vec<String>,
    links: Vec<GoalLink>,
}

impl GoalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from stored nodes and links.
    ///
    /// Adjacency lists on the incoming nodes are ignored and rebuilt from
    /// `links`, so the result is consistent even if the input was not.
    /// Duplicate nodes and links with a missing endpoint are skipped.
    pub fn from_parts(nodes: Vec<GoalNode>, links: Vec<GoalLink>) -> Self {
        let mut graph = Self::new();

        for node in nodes {
            if let Err(e) = graph.try_add_node(&node.id, &node.description, node.category) {
                tracing::warn!("Skipping stored goal: {}", e);
            }
        }

        for link in links {
            match graph.try_add_link(&link.source, &link.target) {
                Ok(()) | Err(GraphError::DuplicateLink { .. }) => {}
                Err(e) => tracing::warn!("Skipping stored link: {}", e),
            }
        }

        graph
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.all_nodes().into_iter().cloned().collect(),
            links: self.links.clone(),
        }
    }

    // ============================================================
    // Mutations
    // ============================================================

    pub fn add_node(&mut self, id: &str, description: &str, category: Category) -> bool {
        self.try_add_node(id, description, category).is_ok()
    }

    pub fn try_add_node(
        &mut self,
        id: &str,
        description: &str,
        category: Category,
    ) -> Result<(), GraphError> {
        if id.is_empty() {
            return Err(GraphError::InvalidInput("id must not be empty"));
        }
        if description.is_empty() {
            return Err(GraphError::InvalidInput("description must not be empty"));
        }
        if self.nodes.contains_key(id) {
            return Err(GraphError::DuplicateId(id.to_string()));
        }

        self.nodes
            .insert(id.to_string(), GoalNode::new(id, description, category));
        self.order.push(id.to_string());
        Ok(())
    }

    pub fn add_link(&mut self, source: &str, target: &str) -> bool {
        self.try_add_link(source, target).is_ok()
    }

    pub fn try_add_link(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return Err(GraphError::MissingEndpoint {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        if self.has_link(source, target) {
            return Err(GraphError::DuplicateLink {
                from: source.to_string(),
                to: target.to_string(),
            });
        }

        // Both endpoints were checked above, so both updates happen or neither does.
        if let Some(node) = self.nodes.get_mut(source) {
            node.children.push(target.to_string());
        }
        if let Some(node) = self.nodes.get_mut(target) {
            node.parents.push(source.to_string());
        }
        self.links.push(GoalLink::new(source, target));
        Ok(())
    }

    pub fn remove_link(&mut self, source: &str, target: &str) -> bool {
        self.try_remove_link(source, target).is_ok()
    }

    pub fn try_remove_link(&mut self, source: &str, target: &str) -> Result<(), GraphError> {
        let Some(pos) = self.links.iter().position(|l| l.connects(source, target)) else {
            return Err(GraphError::LinkNotFound {
                from: source.to_string(),
                to: target.to_string(),
            });
        };
        self.links.remove(pos);

        if let Some(node) = self.nodes.get_mut(source) {
            node.children.retain(|c| c != target);
        }
        if let Some(node) = self.nodes.get_mut(target) {
            node.parents.retain(|p| p != source);
        }
        Ok(())
    }

    /// Remove a single goal and every reference to it.
    ///
    /// Not recursive: children of the removed goal stay in the graph. Callers
    /// that want a whole subtree gone walk [`GoalGraph::subtree_preorder`] and
    /// remove each id in turn.
    pub fn remove_node(&mut self, id: &str) -> bool {
        self.try_remove_node(id).is_ok()
    }

    pub fn try_remove_node(&mut self, id: &str) -> Result<(), GraphError> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;

        for parent_id in &node.parents {
            if let Some(parent) = self.nodes.get_mut(parent_id) {
                parent.children.retain(|c| c != id);
            }
        }
        for child_id in &node.children {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parents.retain(|p| p != id);
            }
        }

        self.links.retain(|l| !l.touches(id));
        self.order.retain(|o| o != id);
        Ok(())
    }

    pub fn update_node(&mut self, id: &str, description: &str, category: Category) -> bool {
        self.try_update_node(id, description, category).is_ok()
    }

    pub fn try_update_node(
        &mut self,
        id: &str,
        description: &str,
        category: Category,
    ) -> Result<(), GraphError> {
        if description.is_empty() {
            return Err(GraphError::InvalidInput("description must not be empty"));
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NotFound(id.to_string()))?;
        node.description = description.to_string();
        node.category = category;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.order.clear();
        self.links.clear();
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn get_node(&self, id: &str) -> Option<&GoalNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn has_link(&self, source: &str, target: &str) -> bool {
        self.links.iter().any(|l| l.connects(source, target))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All goals in creation order.
    pub fn all_nodes(&self) -> Vec<&GoalNode> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    pub fn all_links(&self) -> &[GoalLink] {
        &self.links
    }

    /// Goals with no parents, in creation order.
    pub fn roots(&self) -> Vec<&GoalNode> {
        self.all_nodes()
            .into_iter()
            .filter(|n| n.parents.is_empty())
            .collect()
    }

    /// Goals whose id or description contains `query`, ignoring case.
    ///
    /// An empty query matches every goal.
    pub fn search(&self, query: &str) -> Vec<&GoalNode> {
        let query = query.to_lowercase();
        self.all_nodes()
            .into_iter()
            .filter(|n| {
                n.id.to_lowercase().contains(&query)
                    || n.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// `id` followed by everything reachable through `children`, pre-order.
    ///
    /// Each goal is listed once even when reachable along several paths or
    /// through a cycle. Returns an empty list for an unknown id.
    pub fn subtree_preorder(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }

        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                for child in node.children.iter().rev() {
                    if !seen.contains(child) {
                        stack.push(child.clone());
                    }
                }
            }
            out.push(current);
        }
        out
    }

    /// The canned sample graph offered by the "load example" action.
    pub fn example() -> Self {
        let mut graph = Self::new();

        let goals = [
            ("learn-js", "Learn JavaScript", Category::Learning),
            ("web-app", "Build a web application", Category::Work),
            ("learn-d3", "Learn D3.js", Category::Learning),
            ("visualizations", "Create interactive visualizations", Category::Work),
            ("deploy", "Deploy application", Category::Work),
            ("html-css", "Learn HTML & CSS", Category::Learning),
            ("styling", "Style the application", Category::Work),
            ("exercise", "Regular exercise", Category::Health),
            ("budget", "Create monthly budget", Category::Financial),
            ("savings", "Increase savings", Category::Financial),
            ("meditation", "Daily meditation", Category::Personal),
        ];
        for (id, description, category) in goals {
            graph.add_node(id, description, category);
        }

        let links = [
            ("learn-js", "web-app"),
            ("learn-js", "learn-d3"),
            ("learn-d3", "visualizations"),
            ("web-app", "deploy"),
            ("html-css", "styling"),
            ("learn-js", "html-css"),
            ("web-app", "styling"),
            ("budget", "savings"),
        ];
        for (source, target) in links {
            graph.add_link(source, target);
        }

        graph
    }
}

impl From<GraphSnapshot> for GoalGraph {
    fn from(snapshot: GraphSnapshot) -> Self {
        Self::from_parts(snapshot.nodes, snapshot.links)
    }
}
