//! ASCII outline rendering for goal graphs.

use std::collections::HashSet;

use super::GoalGraph;
use crate::models::{Category, GoalNode};

/// Get the symbol for a goal category.
fn category_symbol(category: Category) -> char {
    match category {
        Category::Personal => '●',
        Category::Work => '■',
        Category::Learning => '▲',
        Category::Health => '♥',
        Category::Financial => '$',
    }
}

/// Render the graph as an outline, starting from goals with no parents.
///
/// Each goal is expanded once. Later visits print a single `(see above)` line,
/// and a goal already on the current path prints a `(cycle)` line instead. Goals only reachable through a cycle get their own top-level
/// entry.
///
/// Example output:
/// ```text
/// learn-js: Learn JavaScript
/// ├── ■ web-app: Build a web application
/// │   └── ■ deploy: Deploy application
/// └── ▲ learn-d3: Learn D3.js
/// ```
pub fn render_graph(graph: &GoalGraph) -> String {
    let mut output = String::new();
    let mut visited = HashSet::new();

    for root in graph.roots() {
        let mut path = Vec::new();
        render_node(&mut output, graph, root, "", true, true, &mut path, &mut visited);
    }

    // Anything left is only reachable through a cycle.
    for node in graph.all_nodes() {
        if !visited.contains(&node.id) {
            let mut path = Vec::new();
            render_node(&mut output, graph, node, "", true, true, &mut path, &mut visited);
        }
    }

    output
}

#[allow(clippy::too_many_arguments)]
fn render_node<'g>(
    output: &mut String,
    graph: &'g GoalGraph,
    node: &'g GoalNode,
    prefix: &str,
    is_last: bool,
    is_root: bool,
    path: &mut Vec<&'g str>,
    visited: &mut HashSet<String>,
) {
    let label = format!("{}: {}", node.id, node.description);
    let on_path = path.contains(&node.id.as_str());

    if is_root {
        output.push_str(&label);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(category_symbol(node.category));
        output.push(' ');
        output.push_str(&label);
    }
    if on_path {
        output.push_str(" (cycle)\n");
        return;
    }
    if visited.contains(&node.id) {
        output.push_str(" (see above)\n");
        return;
    }
    output.push('\n');
    visited.insert(node.id.clone());

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    path.push(&node.id);
    let children: Vec<&GoalNode> = node
        .children
        .iter()
        .filter_map(|id| graph.get_node(id))
        .collect();
    for (i, &child) in children.iter().enumerate() {
        let child_is_last = i == children.len() - 1;
        render_node(output, graph, child, &child_prefix, child_is_last, false, path, visited);
    }
    path.pop();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        assert_eq!(render_graph(&GoalGraph::new()), "");
    }

    #[test]
    fn test_single_root() {
        let mut g = GoalGraph::new();
        g.add_node("fit", "Get fit", Category::Health);
        assert_eq!(render_graph(&g), "fit: Get fit\n");
    }

    #[test]
    fn test_with_children() {
        let mut g = GoalGraph::new();
        g.add_node("a", "A", Category::Personal);
        g.add_node("b", "B", Category::Learning);
        g.add_node("c", "C", Category::Work);
        g.add_link("a", "b");
        g.add_link("a", "c");
        assert_eq!(render_graph(&g), "a: A\n├── ▲ b: B\n└── ■ c: C\n");
    }

    #[test]
    fn test_nested_children() {
        let mut g = GoalGraph::new();
        g.add_node("a", "A", Category::Personal);
        g.add_node("b", "B", Category::Work);
        g.add_node("c", "C", Category::Health);
        g.add_node("d", "D", Category::Financial);
        g.add_link("a", "b");
        g.add_link("b", "c");
        g.add_link("a", "d");
        let expected = "a: A\n├── ■ b: B\n│   └── ♥ c: C\n└── $ d: D\n";
        assert_eq!(render_graph(&g), expected);
    }

    #[test]
    fn test_pure_cycle_gets_own_entry() {
        let mut g = GoalGraph::new();
        g.add_node("a", "A", Category::Personal);
        g.add_node("b", "B", Category::Work);
        g.add_link("a", "b");
        g.add_link("b", "a");
        assert_eq!(render_graph(&g), "a: A\n└── ■ b: B\n    └── ● a: A (cycle)\n");
    }

    #[test]
    fn test_shared_child_expanded_once() {
        let mut g = GoalGraph::new();
        g.add_node("x", "X", Category::Work);
        g.add_node("y", "Y", Category::Work);
        g.add_node("z", "Z", Category::Work);
        g.add_node("leaf", "Leaf", Category::Health);
        g.add_link("x", "z");
        g.add_link("y", "z");
        g.add_link("z", "leaf");
        let expected = "x: X\n└── ■ z: Z\n    └── ♥ leaf: Leaf\ny: Y\n└── ■ z: Z (see above)\n";
        assert_eq!(render_graph(&g), expected);
    }

    #[test]
    fn test_layered_dag_stays_linear() {
        let mut g = GoalGraph::new();
        let layers = 20;
        for layer in 0..layers {
            for side in ["a", "b"] {
                let id = format!("{}{}", side, layer);
                g.add_node(&id, &id, Category::Personal);
            }
        }
        for layer in 0..layers - 1 {
            for from in ["a", "b"] {
                for to in ["a", "b"] {
                    g.add_link(&format!("{}{}", from, layer), &format!("{}{}", to, layer + 1));
                }
            }
        }

        let output = render_graph(&g);
        // Two roots plus one line per link.
        assert_eq!(output.lines().count(), 2 + 4 * (layers - 1));
        assert_eq!(output.matches("(see above)").count(), 2 * (layers - 1));
        assert!(!output.contains("(cycle)"));
    }
}
