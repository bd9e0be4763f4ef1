//! Assembly of the render model: module and group nodes, collapsed-aware
//! edges, and the choice between saved and computed positions.

use crate::batch::{Batch, compute_batches_with_theme};
use crate::config::Config;
use crate::group::{GroupLayout, compute_group_layout};
use crate::ir::{Direction, Module, Position, authoritative_modules};
use crate::layout::{LayeredLayout, LayoutEdge, LayoutNode, engine_for, layout_graph};
use crate::spline::{anchors, edge_path};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Prefix of group container ids. Module filenames must not carry it.
pub const GROUP_NODE_PREFIX: &str = "group::";

pub fn group_node_id(name: &str) -> String {
    format!("{GROUP_NODE_PREFIX}{name}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleNodeData {
    pub filename: String,
    pub label: String,
    pub language: Option<String>,
    pub priority: i64,
    pub group: Option<String>,
    pub batch: Option<usize>,
    pub batch_color: Option<String>,
    pub has_prompt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNodeData {
    pub name: String,
    pub expanded: bool,
    pub members: Vec<String>,
    pub member_count: usize,
    pub prompt_count: usize,
    pub completion_ratio: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeData {
    Module(ModuleNodeData),
    Group(GroupNodeData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    /// Owning expanded group container; `position` is then relative to it.
    pub parent: Option<String>,
    pub position: Position,
    pub width: f32,
    pub height: f32,
    pub draggable: bool,
    pub data: NodeData,
}

impl GraphNode {
    pub fn is_group(&self) -> bool {
        matches!(self.data, NodeData::Group(_))
    }
}

/// Directed edge; `target` depends on `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub waypoints: Vec<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionSource {
    /// Every module had a saved position; the layout engine was skipped.
    Saved,
    /// All positions come from the layout engine.
    Computed,
    /// Computed positions overlaid with the saved ones that exist.
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePath {
    pub id: String,
    pub path: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("no node with id '{0}'")]
    UnknownNode(String),
    #[error("node '{0}' is positioned by its group and cannot be moved")]
    NotDraggable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
    pub direction: Direction,
    pub position_source: PositionSource,
    /// Top-level nodes first, then group children.
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub batches: Vec<Batch>,
}

/// Everything a recomputation depends on.
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub modules: &'a [Module],
    pub expanded_groups: &'a BTreeSet<String>,
    pub existing_prompts: &'a HashSet<String>,
    pub saved_positions: &'a BTreeMap<String, Position>,
}

pub fn build_graph_model(input: &ModelInput<'_>, config: &Config) -> GraphModel {
    let engine = engine_for(config.layout.engine);
    build_graph_model_with_engine(input, config, engine.as_ref())
}

pub fn build_graph_model_with_engine(
    input: &ModelInput<'_>,
    config: &Config,
    engine: &dyn LayeredLayout,
) -> GraphModel {
    let layout_cfg = &config.layout;
    let modules = authoritative_modules(input.modules);
    let by_name: HashMap<&str, &Module> =
        modules.iter().map(|m| (m.filename.as_str(), *m)).collect();

    let batches = compute_batches_with_theme(input.modules, &config.theme);
    let mut batch_lookup: HashMap<&str, &Batch> = HashMap::new();
    for batch in &batches {
        for member in &batch.members {
            batch_lookup.insert(member.as_str(), batch);
        }
    }

    // The external store wins over a position embedded in the record.
    let saved: HashMap<&str, Position> = modules
        .iter()
        .filter_map(|m| {
            input
                .saved_positions
                .get(&m.filename)
                .copied()
                .or(m.position)
                .map(|p| (m.filename.as_str(), p))
        })
        .collect();

    let mut groups: BTreeMap<&str, Vec<&Module>> = BTreeMap::new();
    for module in &modules {
        if let Some(group) = module.group.as_deref() {
            groups.entry(group).or_default().push(module);
        }
    }
    let is_expanded = |group: &str| input.expanded_groups.contains(group);
    let is_hidden = |module: &Module| {
        module
            .group
            .as_deref()
            .is_some_and(|group| !is_expanded(group))
    };

    let group_layouts: BTreeMap<&str, GroupLayout> = groups
        .iter()
        .filter(|(name, _)| is_expanded(name))
        .map(|(name, members)| {
            let children: Vec<&str> = members.iter().map(|m| m.filename.as_str()).collect();
            (*name, compute_group_layout(&children, layout_cfg))
        })
        .collect();

    let mut nodes: Vec<GraphNode> = Vec::new();
    for module in modules.iter().filter(|m| !is_hidden(m)) {
        let parent_group = module.group.as_deref().filter(|g| group_layouts.contains_key(g));
        let (parent, position, draggable) = match parent_group {
            Some(group) => {
                let offset = group_layouts[group]
                    .child_positions
                    .iter()
                    .find(|c| c.filename == module.filename)
                    .map(|c| Position::new(c.x, c.y))
                    .unwrap_or_default();
                (Some(group_node_id(group)), offset, false)
            }
            None => (
                None,
                saved.get(module.filename.as_str()).copied().unwrap_or_default(),
                true,
            ),
        };
        let batch = batch_lookup.get(module.filename.as_str());
        nodes.push(GraphNode {
            id: module.filename.clone(),
            parent,
            position,
            width: layout_cfg.module_width,
            height: layout_cfg.module_height,
            draggable,
            data: NodeData::Module(ModuleNodeData {
                filename: module.filename.clone(),
                label: module.label(),
                language: module.language(),
                priority: module.priority,
                group: module.group.clone(),
                batch: batch.map(|b| b.id),
                batch_color: batch.map(|b| b.color.clone()),
                has_prompt: input.existing_prompts.contains(&module.filename),
            }),
        });
    }

    for (name, members) in &groups {
        let id = group_node_id(name);
        let expanded = is_expanded(name);
        let (width, height) = match group_layouts.get(name) {
            Some(layout) => (layout.container_width, layout.container_height),
            None => (
                layout_cfg.group.collapsed_width,
                layout_cfg.group.collapsed_height,
            ),
        };
        let prompt_count = members
            .iter()
            .filter(|m| input.existing_prompts.contains(&m.filename))
            .count();
        let member_count = members.len();
        let completion_ratio = if member_count == 0 {
            0.0
        } else {
            prompt_count as f32 / member_count as f32
        };
        nodes.push(GraphNode {
            position: input.saved_positions.get(&id).copied().unwrap_or_default(),
            id,
            parent: None,
            width,
            height,
            draggable: true,
            data: NodeData::Group(GroupNodeData {
                name: name.to_string(),
                expanded,
                members: members.iter().map(|m| m.filename.clone()).collect(),
                member_count,
                prompt_count,
                completion_ratio,
            }),
        });
    }

    let effective_id = |filename: &str| -> String {
        match by_name.get(filename) {
            Some(module) if is_hidden(module) => {
                group_node_id(module.group.as_deref().unwrap_or_default())
            }
            _ => filename.to_string(),
        }
    };
    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut edge_pairs: HashSet<(String, String)> = HashSet::new();
    for module in &modules {
        let target = effective_id(&module.filename);
        for dep in &module.dependencies {
            if !by_name.contains_key(dep.as_str()) {
                continue;
            }
            let source = effective_id(dep);
            if source == target || !edge_pairs.insert((source.clone(), target.clone())) {
                continue;
            }
            edges.push(GraphEdge {
                id: format!("{source}->{target}"),
                source,
                target: target.clone(),
                waypoints: Vec::new(),
            });
        }
    }

    let visible_all_saved = modules
        .iter()
        .filter(|m| !is_hidden(m))
        .all(|m| saved.contains_key(m.filename.as_str()));
    let none_saved = saved.is_empty();
    let some_saved = !none_saved && saved.len() < modules.len();

    if groups.is_empty() && !none_saved && visible_all_saved {
        tracing::debug!(nodes = nodes.len(), "all modules have saved positions; layout skipped");
        return GraphModel {
            direction: layout_cfg.direction,
            position_source: PositionSource::Saved,
            nodes,
            edges,
            batches,
        };
    }

    let (mut top_level, children): (Vec<GraphNode>, Vec<GraphNode>) =
        nodes.into_iter().partition(|n| n.parent.is_none());

    let parent_of: HashMap<&str, &str> = children
        .iter()
        .filter_map(|n| n.parent.as_deref().map(|p| (n.id.as_str(), p)))
        .collect();
    let lift = |id: &str| -> String { parent_of.get(id).map_or(id, |p| *p).to_string() };
    let mut layout_only: Vec<LayoutEdge> = Vec::new();
    let mut layout_only_pairs: HashSet<(String, String)> = HashSet::new();
    for edge in &edges {
        if !parent_of.contains_key(edge.source.as_str()) && !parent_of.contains_key(edge.target.as_str()) {
            continue;
        }
        let source = lift(&edge.source);
        let target = lift(&edge.target);
        if source != target && layout_only_pairs.insert((source.clone(), target.clone())) {
            layout_only.push(LayoutEdge { source, target });
        }
    }

    let layout_nodes: Vec<LayoutNode> = top_level
        .iter()
        .map(|n| LayoutNode::new(&n.id, n.width, n.height))
        .collect();
    let layout_edges: Vec<LayoutEdge> = edges
        .iter()
        .map(|e| LayoutEdge::new(&e.source, &e.target))
        .collect();
    let last_known: BTreeMap<String, Position> = top_level
        .iter()
        .filter_map(|n| {
            saved
                .get(n.id.as_str())
                .or_else(|| input.saved_positions.get(&n.id))
                .map(|p| (n.id.clone(), *p))
        })
        .collect();

    let outcome = layout_graph(
        engine,
        &layout_nodes,
        &layout_edges,
        &layout_only,
        layout_cfg,
        &last_known,
    );
    for node in &mut top_level {
        if let Some(pos) = outcome.positions.get(&node.id) {
            node.position = *pos;
        }
    }
    for (edge, bends) in edges.iter_mut().zip(outcome.waypoints) {
        edge.waypoints = bends.into_iter().map(|(x, y)| Position::new(x, y)).collect();
    }

    let position_source = if some_saved {
        let mut moved: HashSet<String> = HashSet::new();
        for node in &mut top_level {
            let overlay = if node.is_group() {
                input.saved_positions.get(&node.id).copied()
            } else {
                saved.get(node.id.as_str()).copied()
            };
            if let Some(pos) = overlay {
                if pos != node.position {
                    moved.insert(node.id.clone());
                }
                node.position = pos;
            }
        }
        // Bends computed for the old spot no longer connect the moved node.
        for edge in &mut edges {
            if moved.contains(&edge.source) || moved.contains(&edge.target) {
                edge.waypoints.clear();
            }
        }
        PositionSource::Hybrid
    } else {
        PositionSource::Computed
    };

    tracing::debug!(
        engine = engine.name(),
        source = ?position_source,
        top_level = top_level.len(),
        children = children.len(),
        edges = edges.len(),
        "graph model built"
    );

    top_level.extend(children);
    GraphModel {
        direction: layout_cfg.direction,
        position_source,
        nodes: top_level,
        edges,
        batches,
    }
}

impl GraphModel {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Position in diagram coordinates, resolving the parent offset.
    pub fn absolute_position(&self, id: &str) -> Option<Position> {
        let node = self.node(id)?;
        let mut pos = node.position;
        if let Some(parent) = node.parent.as_deref().and_then(|p| self.node(p)) {
            pos.x += parent.position.x;
            pos.y += parent.position.y;
        }
        Some(pos)
    }

    /// Positions of the freely placed nodes, for the external position store.
    pub fn positions(&self) -> BTreeMap<String, Position> {
        self.nodes
            .iter()
            .filter(|n| n.draggable)
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }

    /// Records a drag-end. Never rebuilds the model; edges touching the node
    /// lose their stale waypoints and fall back to a direct curve.
    pub fn apply_position(&mut self, id: &str, position: Position) -> Result<(), ModelError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| ModelError::UnknownNode(id.to_string()))?;
        if !node.draggable {
            return Err(ModelError::NotDraggable(id.to_string()));
        }
        node.position = position;
        for edge in &mut self.edges {
            if edge.source == id || edge.target == id {
                edge.waypoints.clear();
            }
        }
        Ok(())
    }

    pub fn edge_paths(&self) -> Vec<EdgePath> {
        self.edges
            .iter()
            .filter_map(|edge| {
                let source = self.node(&edge.source)?;
                let target = self.node(&edge.target)?;
                let source_pos = self.absolute_position(&source.id)?;
                let target_pos = self.absolute_position(&target.id)?;
                let (out, _) = anchors(
                    source_pos.x,
                    source_pos.y,
                    source.width,
                    source.height,
                    self.direction,
                );
                let (_, inc) = anchors(
                    target_pos.x,
                    target_pos.y,
                    target.width,
                    target.height,
                    self.direction,
                );
                let bends: Vec<(f32, f32)> = edge.waypoints.iter().map(|p| (p.x, p.y)).collect();
                Some(EdgePath {
                    id: edge.id.clone(),
                    path: edge_path(out, &bends, inc, self.direction),
                })
            })
            .collect()
    }
}

/// Canonical summary of module identities, dependencies and group
/// assignments. Positions do not contribute.
pub fn structural_fingerprint(modules: &[Module]) -> String {
    let mut entries: Vec<(String, String)> = authoritative_modules(modules)
        .into_iter()
        .map(|module| {
            let mut deps: Vec<&str> = module.dependencies.iter().map(String::as_str).collect();
            deps.sort_unstable();
            deps.dedup();
            let entry = format!(
                "{}\u{1f}{}\u{1f}{}",
                module.filename,
                deps.join("\u{1e}"),
                module.group.as_deref().unwrap_or_default()
            );
            (module.filename.clone(), entry)
        })
        .collect();
    entries.sort();
    entries
        .into_iter()
        .map(|(_, entry)| entry)
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the host remembers about the last rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    pub fingerprint: String,
    pub expanded_groups: BTreeSet<String>,
}

impl ModelSnapshot {
    pub fn capture(modules: &[Module], expanded_groups: &BTreeSet<String>) -> Self {
        Self {
            fingerprint: structural_fingerprint(modules),
            expanded_groups: expanded_groups.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildReason {
    Initial,
    StructureChanged,
    ExpansionChanged,
    RearrangeCompleted,
}

/// Decides whether the live node/edge state must be replaced. Position-only
/// edits never produce a reason.
pub fn rebuild_reason(
    previous: Option<&ModelSnapshot>,
    current: &ModelSnapshot,
    rearrange_completed: bool,
) -> Option<RebuildReason> {
    let Some(previous) = previous else {
        return Some(RebuildReason::Initial);
    };
    if rearrange_completed {
        return Some(RebuildReason::RearrangeCompleted);
    }
    if previous.fingerprint != current.fingerprint {
        return Some(RebuildReason::StructureChanged);
    }
    if previous.expanded_groups != current.expanded_groups {
        return Some(RebuildReason::ExpansionChanged);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LayoutError, LayoutRequest, LayoutResult, LongestPathLayout};

    struct Fixture {
        modules: Vec<Module>,
        expanded: BTreeSet<String>,
        prompts: HashSet<String>,
        saved: BTreeMap<String, Position>,
    }

    impl Fixture {
        fn new(modules: Vec<Module>) -> Self {
            Self {
                modules,
                expanded: BTreeSet::new(),
                prompts: HashSet::new(),
                saved: BTreeMap::new(),
            }
        }

        fn input(&self) -> ModelInput<'_> {
            ModelInput {
                modules: &self.modules,
                expanded_groups: &self.expanded,
                existing_prompts: &self.prompts,
                saved_positions: &self.saved,
            }
        }

        fn build(&self) -> GraphModel {
            build_graph_model_with_engine(&self.input(), &Config::default(), &LongestPathLayout)
        }
    }

    /// Engine that must never be reached.
    struct Unreachable;

    impl LayeredLayout for Unreachable {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        fn layout(&self, _request: &LayoutRequest<'_>) -> Result<LayoutResult, LayoutError> {
            panic!("layout engine should have been skipped");
        }
    }

    fn grouped() -> Vec<Module> {
        vec![
            Module::new("app").with_priority(3).with_dependencies(&["db", "cache", "api"]),
            Module::new("db").with_priority(1).with_group("storage"),
            Module::new("cache").with_priority(2).with_group("storage").with_dependencies(&["db"]),
            Module::new("api").with_priority(4).with_dependencies(&["missing", "api"]),
        ]
    }

    #[test]
    fn collapsed_group_reroutes_and_dedups_edges() {
        let fx = Fixture::new(grouped());
        let model = fx.build();
        assert!(model.node("db").is_none());
        assert!(model.node("cache").is_none());
        let group = model.node("group::storage").unwrap();
        assert_eq!(group.width, 240.0);
        let pairs: Vec<(&str, &str)> = model
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("group::storage", "app"), ("api", "app")]);
    }

    #[test]
    fn expanded_group_packs_children() {
        let mut fx = Fixture::new(grouped());
        fx.expanded.insert("storage".to_string());
        fx.prompts.insert("db".to_string());
        let model = fx.build();

        let db = model.node("db").unwrap();
        assert_eq!(db.parent.as_deref(), Some("group::storage"));
        assert!(!db.draggable);
        let cfg = Config::default().layout;
        assert_eq!(db.position, Position::new(cfg.group.inner_padding, cfg.group.header_height + cfg.group.inner_padding));

        let group = model.node("group::storage").unwrap();
        let NodeData::Group(data) = &group.data else {
            panic!("expected group data");
        };
        assert!(data.expanded);
        assert_eq!(data.member_count, 2);
        assert_eq!(data.completion_ratio, 0.5);

        let first_child = model.nodes.iter().position(|n| n.parent.is_some()).unwrap();
        assert!(model.nodes[first_child..].iter().all(|n| n.parent.is_some()));

        assert!(model.edges.iter().any(|e| e.source == "db" && e.target == "cache"));
        assert!(model.edges.iter().any(|e| e.source == "db" && e.target == "app"));
    }

    #[test]
    fn all_saved_without_groups_skips_layout() {
        let modules = vec![
            Module::new("a").with_dependencies(&["b"]).with_position(10.0, 20.0),
            Module::new("b"),
        ];
        let mut fx = Fixture::new(modules);
        fx.saved.insert("b".to_string(), Position::new(300.0, 40.0));
        let model = build_graph_model_with_engine(&fx.input(), &Config::default(), &Unreachable);
        assert_eq!(model.position_source, PositionSource::Saved);
        assert_eq!(model.node("a").unwrap().position, Position::new(10.0, 20.0));
        assert_eq!(model.node("b").unwrap().position, Position::new(300.0, 40.0));
        assert!(model.edges[0].waypoints.is_empty());
    }

    #[test]
    fn hybrid_keeps_saved_and_places_new() {
        let modules = vec![
            Module::new("a"),
            Module::new("b").with_dependencies(&["a"]),
            Module::new("c").with_dependencies(&["b"]),
        ];
        let mut fx = Fixture::new(modules);
        fx.saved.insert("a".to_string(), Position::new(-500.0, -500.0));
        let model = fx.build();
        assert_eq!(model.position_source, PositionSource::Hybrid);
        assert_eq!(model.node("a").unwrap().position, Position::new(-500.0, -500.0));
        let b = model.node("b").unwrap().position;
        let c = model.node("c").unwrap().position;
        assert!(b.y < c.y);
    }

    #[test]
    fn none_saved_is_computed() {
        let fx = Fixture::new(vec![Module::new("a"), Module::new("b").with_dependencies(&["a"])]);
        let model = fx.build();
        assert_eq!(model.position_source, PositionSource::Computed);
        assert!(model.node("a").unwrap().position.y < model.node("b").unwrap().position.y);
        assert_eq!(model.positions().len(), 2);
    }

    #[test]
    fn groups_force_layout_even_when_all_saved() {
        let modules = vec![
            Module::new("a").with_position(1.0, 1.0),
            Module::new("b").with_group("g").with_position(2.0, 2.0),
        ];
        let fx = Fixture::new(modules);
        let model = fx.build();
        assert_eq!(model.position_source, PositionSource::Computed);
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let mut fx = Fixture::new(grouped());
        fx.expanded.insert("storage".to_string());
        fx.saved.insert("app".to_string(), Position::new(5.0, 5.0));
        let first = serde_json::to_string(&fx.build()).unwrap();
        let second = serde_json::to_string(&fx.build()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn dagre_output_is_identical_across_builds() {
        let mut modules = grouped();
        modules.push(Module::new("worker").with_dependencies(&["app", "db"]));
        modules[0].dependencies.push("worker".to_string());
        let mut fx = Fixture::new(modules);
        fx.expanded.insert("storage".to_string());
        let build = || {
            let model =
                build_graph_model_with_engine(&fx.input(), &Config::default(), &crate::layout::DagreLayout);
            serde_json::to_string(&model).unwrap()
        };
        let first = build();
        for _ in 0..5 {
            assert_eq!(build(), first);
        }
    }

    #[test]
    fn drag_updates_position_without_rebuild() {
        let fx = Fixture::new(vec![Module::new("a"), Module::new("b").with_dependencies(&["a"])]);
        let mut model = fx.build();
        model.edges[0].waypoints.push(Position::new(1.0, 1.0));
        model.apply_position("b", Position::new(900.0, 900.0)).unwrap();
        assert_eq!(model.positions()["b"], Position::new(900.0, 900.0));
        assert!(model.edges[0].waypoints.is_empty());
        assert_eq!(
            model.apply_position("zzz", Position::default()),
            Err(ModelError::UnknownNode("zzz".to_string()))
        );
    }

    #[test]
    fn group_children_are_not_draggable() {
        let mut fx = Fixture::new(grouped());
        fx.expanded.insert("storage".to_string());
        let mut model = fx.build();
        assert_eq!(
            model.apply_position("db", Position::default()),
            Err(ModelError::NotDraggable("db".to_string()))
        );
        assert!(!model.positions().contains_key("db"));
        assert!(model.positions().contains_key("group::storage"));
    }

    #[test]
    fn child_absolute_position_includes_parent() {
        let mut fx = Fixture::new(grouped());
        fx.expanded.insert("storage".to_string());
        let model = fx.build();
        let group = model.node("group::storage").unwrap().position;
        let db = model.node("db").unwrap().position;
        let abs = model.absolute_position("db").unwrap();
        assert_eq!(abs, Position::new(group.x + db.x, group.y + db.y));
        assert_eq!(model.edge_paths().len(), model.edges.len());
    }

    #[test]
    fn edge_paths_use_splines_for_waypoints() {
        let fx = Fixture::new(vec![
            Module::new("a"),
            Module::new("b").with_dependencies(&["a"]),
            Module::new("c").with_dependencies(&["a", "b"]),
        ]);
        let model = fx.build();
        let paths = model.edge_paths();
        let long = paths.iter().find(|p| p.id == "a->c").unwrap();
        assert!(long.path.contains(" Q "));
        let short = paths.iter().find(|p| p.id == "a->b").unwrap();
        assert!(short.path.contains(" C "));
    }

    #[test]
    fn fingerprint_ignores_positions_and_dep_order() {
        let a = vec![
            Module::new("x").with_dependencies(&["y", "z"]),
            Module::new("y").with_group("g"),
        ];
        let b = vec![
            Module::new("y").with_group("g").with_position(4.0, 4.0),
            Module::new("x").with_dependencies(&["z", "y", "y"]).with_position(1.0, 2.0),
        ];
        assert_eq!(structural_fingerprint(&a), structural_fingerprint(&b));
    }

    #[test]
    fn fingerprint_tracks_structure() {
        let base = vec![Module::new("x").with_dependencies(&["y"]), Module::new("y")];
        let fp = structural_fingerprint(&base);

        let mut dep_changed = base.clone();
        dep_changed[0].dependencies.clear();
        assert_ne!(fp, structural_fingerprint(&dep_changed));

        let mut regrouped = base.clone();
        regrouped[1].group = Some("g".to_string());
        assert_ne!(fp, structural_fingerprint(&regrouped));

        let mut added = base.clone();
        added.push(Module::new("z"));
        assert_ne!(fp, structural_fingerprint(&added));
    }

    #[test]
    fn rebuild_decisions() {
        let modules = vec![Module::new("x")];
        let none = BTreeSet::new();
        let snap = ModelSnapshot::capture(&modules, &none);
        assert_eq!(rebuild_reason(None, &snap, false), Some(RebuildReason::Initial));
        assert_eq!(rebuild_reason(Some(&snap), &snap, false), None);
        assert_eq!(
            rebuild_reason(Some(&snap), &snap, true),
            Some(RebuildReason::RearrangeCompleted)
        );

        let moved = vec![Module::new("x").with_position(9.0, 9.0)];
        assert_eq!(
            rebuild_reason(Some(&snap), &ModelSnapshot::capture(&moved, &none), false),
            None
        );

        let mut expanded = BTreeSet::new();
        expanded.insert("g".to_string());
        assert_eq!(
            rebuild_reason(Some(&snap), &ModelSnapshot::capture(&modules, &expanded), false),
            Some(RebuildReason::ExpansionChanged)
        );

        let grown = vec![Module::new("x"), Module::new("y")];
        assert_eq!(
            rebuild_reason(Some(&snap), &ModelSnapshot::capture(&grown, &none), false),
            Some(RebuildReason::StructureChanged)
        );
    }
}
