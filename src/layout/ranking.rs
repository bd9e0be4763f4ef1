//! Self-contained layered layout: longest-path ranking over a topological
//! order, dummy nodes for long edges, median ordering sweeps and compact
//! coordinate assignment.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::{LayeredLayout, LayoutEdge, LayoutError, LayoutRequest, LayoutResult};
use crate::ir::Direction;

#[derive(Debug, Clone, Copy, Default)]
pub struct LongestPathLayout;

impl LayeredLayout for LongestPathLayout {
    fn name(&self) -> &'static str {
        "longest-path"
    }

    fn layout(&self, request: &LayoutRequest<'_>) -> Result<LayoutResult, LayoutError> {
        let node_ids: Vec<String> = request.nodes.iter().map(|(id, _, _)| id.clone()).collect();
        let sizes: HashMap<&str, (f32, f32)> = request
            .nodes
            .iter()
            .map(|(id, w, h)| (id.as_str(), (*w, *h)))
            .collect();
        let node_order: HashMap<String, usize> = node_ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        let all_edges: Vec<LayoutEdge> = request
            .edges
            .iter()
            .chain(request.layout_only_edges.iter())
            .filter(|e| {
                e.source != e.target
                    && sizes.contains_key(e.source.as_str())
                    && sizes.contains_key(e.target.as_str())
            })
            .cloned()
            .collect();

        let ranks = compute_ranks(&node_ids, &all_edges, &node_order);
        let max_rank = ranks.values().copied().max().unwrap_or(0);
        let mut rank_nodes: Vec<Vec<String>> = vec![Vec::new(); max_rank + 1];
        for node_id in &node_ids {
            let rank = *ranks.get(node_id).unwrap_or(&0);
            rank_nodes[rank].push(node_id.clone());
        }

        // Split edges spanning several ranks into dummy chains.
        let mut order_map = node_order.clone();
        let mut expanded_edges: Vec<LayoutEdge> = Vec::new();
        let mut chains: Vec<Vec<String>> = Vec::with_capacity(all_edges.len());
        let mut dummy_counter = 0usize;
        for edge in &all_edges {
            let from_rank = ranks[&edge.source];
            let to_rank = ranks[&edge.target];
            let mut chain = Vec::new();
            if to_rank <= from_rank {
                chains.push(chain);
                continue;
            }
            let mut prev = edge.source.clone();
            for step in 1..(to_rank - from_rank) {
                // Skip counters that would shadow a real node id.
                let dummy_id = loop {
                    let candidate = format!("__dummy_{}__", dummy_counter);
                    dummy_counter += 1;
                    if !order_map.contains_key(&candidate) {
                        break candidate;
                    }
                };
                order_map.insert(dummy_id.clone(), order_map.len());
                rank_nodes[from_rank + step].push(dummy_id.clone());
                expanded_edges.push(LayoutEdge::new(&prev, &dummy_id));
                chain.push(dummy_id.clone());
                prev = dummy_id;
            }
            expanded_edges.push(LayoutEdge::new(&prev, &edge.target));
            chains.push(chain);
        }

        order_rank_nodes(
            &mut rank_nodes,
            &expanded_edges,
            &order_map,
            request.config.order_passes,
        );

        let horizontal = request.direction.is_horizontal();
        let extent = |id: &str| -> (f32, f32) {
            // (main-axis extent, cross-axis extent)
            let (w, h) = sizes.get(id).copied().unwrap_or((0.0, 0.0));
            if horizontal { (w, h) } else { (h, w) }
        };

        let spacing = request.config.node_spacing;
        let margin = request.config.margin;
        let mut main_centers: Vec<f32> = Vec::with_capacity(rank_nodes.len());
        let mut cursor = margin;
        for bucket in &rank_nodes {
            let thickness = bucket.iter().map(|id| extent(id).0).fold(0.0_f32, f32::max);
            main_centers.push(cursor + thickness / 2.0);
            cursor += thickness + request.config.rank_spacing;
        }
        let main_total = (cursor - request.config.rank_spacing + margin).max(0.0);

        let mut cross_centers: HashMap<String, f32> = HashMap::new();
        let mut widest: f32 = 0.0;
        let mut rank_spans: Vec<f32> = Vec::with_capacity(rank_nodes.len());
        for bucket in &rank_nodes {
            let span: f32 = bucket.iter().map(|id| extent(id).1).sum::<f32>()
                + spacing * bucket.len().saturating_sub(1) as f32;
            widest = widest.max(span);
            rank_spans.push(span);
        }
        for (bucket, span) in rank_nodes.iter().zip(&rank_spans) {
            let mut offset = margin + (widest - span) / 2.0;
            for id in bucket {
                let cross = extent(id).1;
                cross_centers.insert(id.clone(), offset + cross / 2.0);
                offset += cross + spacing;
            }
        }

        let place = |id: &str, rank: usize| -> (f32, f32) {
            let main = match request.direction {
                Direction::BottomTop | Direction::RightLeft => main_total - main_centers[rank],
                Direction::TopDown | Direction::LeftRight => main_centers[rank],
            };
            let cross = cross_centers.get(id).copied().unwrap_or(margin);
            if horizontal { (main, cross) } else { (cross, main) }
        };

        let mut result = LayoutResult::default();
        let mut dummy_rank: HashMap<&str, usize> = HashMap::new();
        for (rank, bucket) in rank_nodes.iter().enumerate() {
            for id in bucket {
                if sizes.contains_key(id.as_str()) {
                    result.centers.insert(id.clone(), place(id, rank));
                } else {
                    dummy_rank.insert(id.as_str(), rank);
                }
            }
        }

        let mut chain_by_edge: HashMap<(&str, &str), &Vec<String>> = HashMap::new();
        for (edge, chain) in all_edges.iter().zip(&chains) {
            chain_by_edge
                .entry((edge.source.as_str(), edge.target.as_str()))
                .or_insert(chain);
        }
        for edge in request.edges {
            let bends = chain_by_edge
                .get(&(edge.source.as_str(), edge.target.as_str()))
                .map(|chain| {
                    chain
                        .iter()
                        .filter_map(|dummy| {
                            dummy_rank
                                .get(dummy.as_str())
                                .map(|rank| place(dummy, *rank))
                        })
                        .collect()
                })
                .unwrap_or_default();
            result.waypoints.push(bends);
        }

        Ok(result)
    }
}

/// Topological order (declaration order among ready nodes, cycles broken at
/// the earliest remaining node) followed by longest-path ranking.
pub(super) fn compute_ranks(
    node_ids: &[String],
    edges: &[LayoutEdge],
    node_order: &HashMap<String, usize>,
) -> HashMap<String, usize> {
    let set: HashSet<String> = node_ids.iter().cloned().collect();
    let mut adj: HashMap<String, Vec<String>> = HashMap::new();
    let mut rev: HashMap<String, Vec<String>> = HashMap::new();

    for edge in edges {
        if set.contains(&edge.source) && set.contains(&edge.target) {
            adj.entry(edge.source.clone())
                .or_default()
                .push(edge.target.clone());
            rev.entry(edge.target.clone())
                .or_default()
                .push(edge.source.clone());
        }
    }

    let order_key = |id: &str| -> usize { node_order.get(id).copied().unwrap_or(usize::MAX) };

    let mut indeg: HashMap<String, usize> = HashMap::new();
    for id in &set {
        let count = rev.get(id).map(|v| v.len()).unwrap_or(0);
        indeg.insert(id.clone(), count);
    }

    let mut ready: BinaryHeap<Reverse<(usize, String)>> = BinaryHeap::new();
    for id in &set {
        if *indeg.get(id).unwrap_or(&0) == 0 {
            ready.push(Reverse((order_key(id.as_str()), id.clone())));
        }
    }

    let mut order = Vec::with_capacity(set.len());
    let mut processed: HashSet<String> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if processed.contains(&id) {
                continue;
            }
            order.push(id.clone());
            processed.insert(id.clone());
            if let Some(nexts) = adj.get(&id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((order_key(next.as_str()), next.clone())));
                        }
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }

        // Cycle: the earliest remaining node becomes a source and its incoming
        // edges are treated as back-edges.
        let best = set
            .iter()
            .filter(|id| !processed.contains(*id))
            .min_by_key(|id| (order_key(id.as_str()), (*id).clone()));
        match best {
            Some(id) => ready.push(Reverse((order_key(id.as_str()), id.clone()))),
            None => break,
        }
    }

    let order_index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();

    let mut ranks: HashMap<String, usize> = HashMap::new();
    for node in &order {
        let rank = *ranks.entry(node.clone()).or_insert(0);
        if let Some(nexts) = adj.get(node) {
            let from_idx = order_index[node.as_str()];
            for next in nexts {
                let to_idx = order_index.get(next.as_str()).copied().unwrap_or(from_idx);
                if to_idx <= from_idx {
                    continue;
                }
                let entry = ranks.entry(next.clone()).or_insert(0);
                *entry = (*entry).max(rank + 1);
            }
        }
    }

    ranks
}

/// Alternating down/up sweeps sorting each rank by the median position of
/// its neighbors in the adjacent rank.
pub(super) fn order_rank_nodes(
    rank_nodes: &mut [Vec<String>],
    edges: &[LayoutEdge],
    node_order: &HashMap<String, usize>,
    passes: usize,
) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();

    for edge in edges {
        outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(edge.target.clone());
        incoming
            .entry(edge.target.clone())
            .or_default()
            .push(edge.source.clone());
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let update_positions = |rank_nodes: &mut [Vec<String>],
                            positions: &mut HashMap<String, usize>| {
        positions.clear();
        for bucket in rank_nodes.iter() {
            for (idx, node_id) in bucket.iter().enumerate() {
                positions.insert(node_id.clone(), idx);
            }
        }
    };

    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<String>,
                       neighbors: &HashMap<String, Vec<String>>,
                       positions: &HashMap<String, usize>| {
        let current_positions: HashMap<String, usize> = bucket
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        bucket.sort_by(|a, b| {
            let a_score = median_position(a, neighbors, positions, &current_positions);
            let b_score = median_position(b, neighbors, positions, &current_positions);
            match a_score.partial_cmp(&b_score) {
                Some(std::cmp::Ordering::Equal) | None => {
                    let a_pos = current_positions.get(a).copied().unwrap_or(0);
                    let b_pos = current_positions.get(b).copied().unwrap_or(0);
                    match a_pos.cmp(&b_pos) {
                        std::cmp::Ordering::Equal => node_order
                            .get(a)
                            .copied()
                            .unwrap_or(usize::MAX)
                            .cmp(&node_order.get(b).copied().unwrap_or(usize::MAX)),
                        other => other,
                    }
                }
                Some(ordering) => ordering,
            }
        });
    };

    for _ in 0..passes.max(1) {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
            update_positions(rank_nodes, &mut positions);
        }
        for rank in (0..rank_nodes.len().saturating_sub(1)).rev() {
            if rank_nodes[rank].len() <= 1 {
                continue;
            }
            sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
            update_positions(rank_nodes, &mut positions);
        }
    }
}

fn median_position(
    node_id: &str,
    neighbors: &HashMap<String, Vec<String>>,
    positions: &HashMap<String, usize>,
    current_positions: &HashMap<String, usize>,
) -> f32 {
    let fallback = *current_positions.get(node_id).unwrap_or(&0) as f32;
    let Some(list) = neighbors.get(node_id) else {
        return fallback;
    };
    let mut values: Vec<f32> = list
        .iter()
        .filter_map(|neighbor| positions.get(neighbor).map(|pos| *pos as f32))
        .collect();
    if values.is_empty() {
        return fallback;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::{LayoutNode, layout_graph};
    use std::collections::BTreeMap;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn order_of(names: &[String]) -> HashMap<String, usize> {
        names
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect()
    }

    #[test]
    fn ranks_follow_longest_path() {
        let nodes = ids(&["a", "b", "c", "d"]);
        let edges = vec![
            LayoutEdge::new("a", "b"),
            LayoutEdge::new("b", "c"),
            LayoutEdge::new("a", "c"),
        ];
        let ranks = compute_ranks(&nodes, &edges, &order_of(&nodes));
        assert_eq!(ranks["a"], 0);
        assert_eq!(ranks["b"], 1);
        assert_eq!(ranks["c"], 2);
        assert_eq!(ranks["d"], 0);
    }

    #[test]
    fn cycles_are_broken_deterministically() {
        let nodes = ids(&["a", "b", "c"]);
        let edges = vec![
            LayoutEdge::new("a", "b"),
            LayoutEdge::new("b", "c"),
            LayoutEdge::new("c", "a"),
        ];
        let ranks = compute_ranks(&nodes, &edges, &order_of(&nodes));
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks["a"], 0);
        assert_eq!(ranks["c"], 2);
    }

    #[test]
    fn long_edges_get_waypoints() {
        let config = LayoutConfig::default();
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
            LayoutNode::new("c", 100.0, 40.0),
        ];
        let edges = vec![
            LayoutEdge::new("a", "b"),
            LayoutEdge::new("b", "c"),
            LayoutEdge::new("a", "c"),
        ];
        let outcome = layout_graph(
            &LongestPathLayout,
            &nodes,
            &edges,
            &[],
            &config,
            &BTreeMap::new(),
        );
        assert!(outcome.fallback_nodes.is_empty());
        assert!(outcome.waypoints[0].is_empty());
        assert!(outcome.waypoints[1].is_empty());
        assert_eq!(outcome.waypoints[2].len(), 1);
        let bend = outcome.waypoints[2][0];
        let b = outcome.positions["b"];
        assert_eq!(bend.1, b.y + 20.0);
    }

    #[test]
    fn bottom_top_reverses_main_axis() {
        let mut config = LayoutConfig::default();
        config.direction = Direction::BottomTop;
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
        ];
        let edges = vec![LayoutEdge::new("a", "b")];
        let outcome = layout_graph(
            &LongestPathLayout,
            &nodes,
            &edges,
            &[],
            &config,
            &BTreeMap::new(),
        );
        assert!(outcome.positions["a"].y > outcome.positions["b"].y);
    }

    #[test]
    fn layout_only_edges_bias_ranking() {
        let config = LayoutConfig::default();
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("b", 100.0, 40.0),
        ];
        let extra = vec![LayoutEdge::new("a", "b"), LayoutEdge::new("a", "ghost")];
        let outcome = layout_graph(
            &LongestPathLayout,
            &nodes,
            &[],
            &extra,
            &config,
            &BTreeMap::new(),
        );
        assert!(outcome.positions["a"].y < outcome.positions["b"].y);
        assert!(outcome.waypoints.is_empty());
    }

    #[test]
    fn dummy_ids_do_not_shadow_real_nodes() {
        let config = LayoutConfig::default();
        let nodes = vec![
            LayoutNode::new("a", 100.0, 40.0),
            LayoutNode::new("__dummy_0__", 100.0, 40.0),
            LayoutNode::new("c", 100.0, 40.0),
        ];
        let edges = vec![
            LayoutEdge::new("a", "__dummy_0__"),
            LayoutEdge::new("__dummy_0__", "c"),
            LayoutEdge::new("a", "c"),
        ];
        let outcome = layout_graph(
            &LongestPathLayout,
            &nodes,
            &edges,
            &[],
            &config,
            &BTreeMap::new(),
        );
        assert!(outcome.fallback_nodes.is_empty());
        let middle = outcome.positions["__dummy_0__"];
        assert!(outcome.positions["a"].y < middle.y);
        assert!(middle.y < outcome.positions["c"].y);
        assert_eq!(outcome.waypoints[2].len(), 1);
        assert_eq!(outcome.waypoints[2][0].1, middle.y + 20.0);
    }
}
