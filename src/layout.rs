//! Layered placement of top-level nodes.
//!
//! The ranking/ordering/coordinate work is delegated to a [`LayeredLayout`]
//! implementation. [`layout_graph`] wraps an engine so that a failing or
//! panicking engine never takes the whole recomputation down: nodes it did not
//! place keep their last known position or land on a fallback grid.

mod dagre;
mod ranking;

pub use dagre::DagreLayout;
pub use ranking::LongestPathLayout;

use crate::config::{LayoutConfig, LayoutEngineKind};
use crate::ir::{Direction, Position};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub id: String,
    /// `None` falls back to the configured module size.
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl LayoutNode {
    pub fn new(id: &str, width: f32, height: f32) -> Self {
        Self {
            id: id.to_string(),
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn size(&self, config: &LayoutConfig) -> (f32, f32) {
        (
            self.width.unwrap_or(config.module_width),
            self.height.unwrap_or(config.module_height),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
}

impl LayoutEdge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
        }
    }
}

/// Input handed to an engine. Node sizes are already resolved.
#[derive(Debug)]
pub struct LayoutRequest<'a> {
    pub nodes: &'a [(String, f32, f32)],
    pub edges: &'a [LayoutEdge],
    /// Edges that bias ranking but are not part of the result.
    pub layout_only_edges: &'a [LayoutEdge],
    pub direction: Direction,
    pub config: &'a LayoutConfig,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutResult {
    /// Node centers keyed by id. Nodes the engine could not place are absent.
    pub centers: HashMap<String, (f32, f32)>,
    /// Bend points per entry of `LayoutRequest::edges`, empty for direct routes.
    pub waypoints: Vec<Vec<(f32, f32)>>,
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("layout engine '{engine}' panicked: {message}")]
    Panicked { engine: &'static str, message: String },
    #[error("layout engine '{engine}' failed: {message}")]
    Failed { engine: &'static str, message: String },
}

/// A layered graph drawing algorithm.
pub trait LayeredLayout {
    fn name(&self) -> &'static str;

    fn layout(&self, request: &LayoutRequest<'_>) -> Result<LayoutResult, LayoutError>;
}

pub fn engine_for(kind: LayoutEngineKind) -> Box<dyn LayeredLayout> {
    match kind {
        LayoutEngineKind::Dagre => Box::new(DagreLayout),
        LayoutEngineKind::LongestPath => Box::new(LongestPathLayout),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOutcome {
    /// Top-left position for every input node.
    pub positions: BTreeMap<String, Position>,
    /// Waypoints parallel to the input edges.
    pub waypoints: Vec<Vec<(f32, f32)>>,
    /// Nodes that were not placed by the engine.
    pub fallback_nodes: Vec<String>,
}

/// Runs `engine` over `nodes`/`edges` and converts centers to top-left anchors.
///
/// `layout_only_edges` are only forwarded when both endpoints are nodes.
/// `last_known` supplies positions for nodes the engine leaves unplaced; any
/// node without one goes onto a grid below the placed nodes.
pub fn layout_graph(
    engine: &dyn LayeredLayout,
    nodes: &[LayoutNode],
    edges: &[LayoutEdge],
    layout_only_edges: &[LayoutEdge],
    config: &LayoutConfig,
    last_known: &BTreeMap<String, Position>,
) -> LayoutOutcome {
    let sized: Vec<(String, f32, f32)> = nodes
        .iter()
        .map(|node| {
            let (w, h) = node.size(config);
            (node.id.clone(), w, h)
        })
        .collect();
    if sized.is_empty() {
        return LayoutOutcome {
            positions: BTreeMap::new(),
            waypoints: vec![Vec::new(); edges.len()],
            fallback_nodes: Vec::new(),
        };
    }

    let node_set: HashSet<&str> = sized.iter().map(|(id, _, _)| id.as_str()).collect();
    let extra: Vec<LayoutEdge> = layout_only_edges
        .iter()
        .filter(|e| node_set.contains(e.source.as_str()) && node_set.contains(e.target.as_str()))
        .cloned()
        .collect();

    let request = LayoutRequest {
        nodes: &sized,
        edges,
        layout_only_edges: &extra,
        direction: config.direction,
        config,
    };

    let result = match catch_unwind(AssertUnwindSafe(|| engine.layout(&request))) {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "layered layout failed; using fallback placement");
            LayoutResult::default()
        }
        Err(payload) => {
            let err = LayoutError::Panicked {
                engine: engine.name(),
                message: panic_message(payload.as_ref()),
            };
            tracing::warn!(error = %err, "layered layout failed; using fallback placement");
            LayoutResult::default()
        }
    };

    let mut positions = BTreeMap::new();
    let mut unplaced = Vec::new();
    let mut placed_bottom: f32 = 0.0;
    for (id, w, h) in &sized {
        match result.centers.get(id) {
            Some(&(cx, cy)) if cx.is_finite() && cy.is_finite() => {
                let pos = Position::new(cx - w / 2.0, cy - h / 2.0);
                placed_bottom = placed_bottom.max(pos.y + h);
                positions.insert(id.clone(), pos);
            }
            _ => unplaced.push((id.clone(), *w, *h)),
        }
    }

    let mut fallback_nodes = Vec::new();
    let grid_top = if positions.is_empty() {
        config.margin
    } else {
        placed_bottom + config.rank_spacing
    };
    // Rows of `fallback_columns` slots, each slot as wide as its own node and
    // each row as tall as its tallest node.
    let columns = config.fallback_columns.max(1);
    let mut in_row = 0usize;
    let mut cursor_x = config.margin;
    let mut cursor_y = grid_top;
    let mut row_height: f32 = 0.0;
    for (id, w, h) in unplaced {
        let pos = match last_known.get(&id) {
            Some(pos) => *pos,
            None => {
                if in_row == columns {
                    cursor_y += row_height + config.node_spacing;
                    cursor_x = config.margin;
                    row_height = 0.0;
                    in_row = 0;
                }
                let pos = Position::new(cursor_x, cursor_y);
                cursor_x += w + config.node_spacing;
                row_height = row_height.max(h);
                in_row += 1;
                pos
            }
        };
        positions.insert(id.clone(), pos);
        fallback_nodes.push(id);
    }
    if !fallback_nodes.is_empty() {
        tracing::debug!(count = fallback_nodes.len(), "nodes placed by fallback");
    }

    let mut waypoints = result.waypoints;
    waypoints.resize(edges.len(), Vec::new());

    LayoutOutcome {
        positions,
        waypoints,
        fallback_nodes,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
