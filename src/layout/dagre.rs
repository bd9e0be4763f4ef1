use super::{LayeredLayout, LayoutError, LayoutRequest, LayoutResult};
use crate::ir::Direction;
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::HashSet;
use std::time::Instant;

/// Layered layout backed by `dagre_rust` (network-simplex ranking, barycenter
/// ordering, Brandes-Köpf coordinates).
#[derive(Debug, Clone, Copy, Default)]
pub struct DagreLayout;

impl LayeredLayout for DagreLayout {
    fn name(&self) -> &'static str {
        "dagre"
    }

    fn layout(&self, request: &LayoutRequest<'_>) -> Result<LayoutResult, LayoutError> {
        let started = Instant::now();
        let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
            DagreGraph::new(Some(GraphOption {
                directed: Some(true),
                multigraph: Some(false),
                compound: Some(false),
            }));

        let mut graph_config = DagreConfig::default();
        graph_config.rankdir = Some(dagre_rankdir(request.direction).to_string());
        graph_config.nodesep = Some(request.config.node_spacing);
        graph_config.ranksep = Some(request.config.rank_spacing);
        graph_config.marginx = Some(request.config.margin);
        graph_config.marginy = Some(request.config.margin);
        dagre_graph.set_graph(graph_config);

        let mut node_set: HashSet<&str> = HashSet::new();
        for (id, width, height) in request.nodes {
            let mut node = DagreNode::default();
            node.width = *width;
            node.height = *height;
            dagre_graph.set_node(id.clone(), Some(node));
            node_set.insert(id.as_str());
        }

        let mut edge_set: HashSet<(&str, &str)> = HashSet::new();
        let routed = request.edges.iter().chain(request.layout_only_edges.iter());
        for edge in routed {
            let from = edge.source.as_str();
            let to = edge.target.as_str();
            if from == to || !node_set.contains(from) || !node_set.contains(to) {
                continue;
            }
            if !edge_set.insert((from, to)) {
                continue;
            }
            let mut edge_label = DagreEdge::default();
            edge_label.minlen = Some(1.0);
            let _ = dagre_graph.set_edge(&edge.source, &edge.target, Some(edge_label), None);
        }

        dagre_layout::run_layout(&mut dagre_graph);

        let mut result = LayoutResult::default();
        for (id, _, _) in request.nodes {
            let Some(dagre_node) = dagre_graph.node(id) else {
                continue;
            };
            result.centers.insert(id.clone(), (dagre_node.x, dagre_node.y));
        }

        for edge in request.edges {
            let mut bends = Vec::new();
            if edge.source != edge.target {
                if let Some(label) = dagre_graph.edge(&edge.source, &edge.target, None) {
                    if let Some(points) = label.points.as_ref() {
                        // The first and last points are the node boundary
                        // intersections; only the interior ones are bends.
                        if points.len() > 2 {
                            bends = points[1..points.len() - 1]
                                .iter()
                                .map(|p| (p.x, p.y))
                                .collect();
                        }
                    }
                }
            }
            result.waypoints.push(bends);
        }

        if result.centers.is_empty() {
            return Err(LayoutError::Failed {
                engine: self.name(),
                message: "no node positions produced".to_string(),
            });
        }

        tracing::debug!(
            nodes = request.nodes.len(),
            edges = request.edges.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "dagre layout finished"
        );
        Ok(result)
    }
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::BottomTop => "bt",
        Direction::LeftRight => "lr",
        Direction::RightLeft => "rl",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::{LayoutEdge, LayoutNode, layout_graph};
    use std::collections::BTreeMap;

    #[test]
    fn chain_is_layered_top_down() {
        let config = LayoutConfig::default();
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
            LayoutNode::new("c", 100.0, 40.0),
        ];
        let edges = vec![LayoutEdge::new("a", "b"), LayoutEdge::new("b", "c")];
        let outcome = layout_graph(&DagreLayout, &nodes, &edges, &[], &config, &BTreeMap::new());
        assert!(outcome.fallback_nodes.is_empty());
        let a = outcome.positions["a"];
        let b = outcome.positions["b"];
        let c = outcome.positions["c"];
        assert!(a.y < b.y);
        assert!(b.y < c.y);
        assert_eq!(outcome.waypoints.len(), 2);
    }

    #[test]
    fn left_right_advances_on_x() {
        let mut config = LayoutConfig::default();
        config.direction = Direction::LeftRight;
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
        ];
        let edges = vec![LayoutEdge::new("a", "b")];
        let outcome = layout_graph(&DagreLayout, &nodes, &edges, &[], &config, &BTreeMap::new());
        assert!(outcome.positions["a"].x < outcome.positions["b"].x);
    }

    #[test]
    fn unconnected_nodes_do_not_overlap() {
        let config = LayoutConfig::default();
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
        ];
        let outcome = layout_graph(&DagreLayout, &nodes, &[], &[], &config, &BTreeMap::new());
        let a = outcome.positions["a"];
        let b = outcome.positions["b"];
        assert!((a.x - b.x).abs() >= 100.0 || (a.y - b.y).abs() >= 40.0);
    }
}
