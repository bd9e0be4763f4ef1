use crate::batch::Batch;
use crate::ir::{Direction, Module, Position};
use crate::theme::Theme;
use crate::model::{GraphModel, GraphNode, PositionSource, structural_fingerprint};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDump {
    pub direction: Direction,
    pub position_source: PositionSource,
    pub fingerprint: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<EdgeDump>,
    pub batches: Vec<Batch>,
    pub positions: BTreeMap<String, Position>,
    /// Colors and dimming the rendering layer applies to the nodes and edges.
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub waypoints: Vec<[f32; 2]>,
    pub path: Option<String>,
}

impl ModelDump {
    pub fn from_model(model: &GraphModel, modules: &[Module], theme: &Theme) -> Self {
        let paths: HashMap<String, String> = model
            .edge_paths()
            .into_iter()
            .map(|p| (p.id, p.path))
            .collect();

        let edges = model
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                waypoints: edge.waypoints.iter().map(|p| [p.x, p.y]).collect(),
                path: paths.get(&edge.id).cloned(),
            })
            .collect();

        ModelDump {
            direction: model.direction,
            position_source: model.position_source,
            fingerprint: structural_fingerprint(modules),
            nodes: model.nodes.clone(),
            edges,
            batches: model.batches.clone(),
            positions: model.positions(),
            theme: theme.clone(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_positions(path: &Path, positions: &BTreeMap<String, Position>) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), positions)?;
    Ok(())
}

pub fn load_positions(path: &Path) -> anyhow::Result<BTreeMap<String, Position>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::LongestPathLayout;
    use crate::model::{ModelInput, build_graph_model_with_engine};
    use std::collections::{BTreeSet, HashSet};

    #[test]
    fn dump_carries_paths_and_positions() {
        let modules = vec![Module::new("a"), Module::new("b").with_dependencies(&["a"])];
        let expanded = BTreeSet::new();
        let prompts = HashSet::new();
        let saved = BTreeMap::new();
        let input = ModelInput {
            modules: &modules,
            expanded_groups: &expanded,
            existing_prompts: &prompts,
            saved_positions: &saved,
        };
        let model = build_graph_model_with_engine(&input, &Config::default(), &LongestPathLayout);
        let dump = ModelDump::from_model(&model, &modules, &Theme::modern());
        assert_eq!(dump.edges.len(), 1);
        assert!(dump.edges[0].path.as_deref().unwrap().starts_with("M "));
        assert_eq!(dump.positions.len(), 2);

        let json = dump.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["positionSource"], "computed");
        assert_eq!(value["nodes"][0]["data"]["type"], "module");
        assert_eq!(value["batches"][0]["name"], "Batch 1");
        assert_eq!(value["direction"], "top-down");
        assert_eq!(value["theme"]["dimmedOpacity"], 0.25);
        assert_eq!(value["theme"]["edgeColor"], "#7A8AA6");
    }
}
