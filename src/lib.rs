pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod focus;
pub mod group;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod spline;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use batch::{Batch, BatchFilter, batch_of, compute_batches};
pub use config::{Config, LayoutConfig, load_config};
pub use focus::{FocusState, focus_neighborhood};
pub use group::{GroupLayout, compute_group_layout};
pub use ir::{Architecture, Direction, Module, Position, load_architecture};
pub use layout::{DagreLayout, LayeredLayout, LongestPathLayout, layout_graph};
pub use layout_dump::ModelDump;
pub use model::{
    GraphModel, ModelInput, ModelSnapshot, build_graph_model, rebuild_reason,
    structural_fingerprint,
};
pub use spline::build_edge_path;
pub use theme::Theme;

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Inputs that accompany the architecture when building a model in one call.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    pub config: Config,
    pub expanded_groups: BTreeSet<String>,
    pub expand_all: bool,
    pub existing_prompts: HashSet<String>,
    pub saved_positions: BTreeMap<String, Position>,
}

/// Parses an architecture document and builds the model dump for it.
pub fn build_model_dump(architecture_json: &str, options: &ModelOptions) -> anyhow::Result<ModelDump> {
    let architecture = Architecture::from_json(architecture_json)?;
    Ok(build_dump_for(&architecture, options))
}

pub fn build_dump_for(architecture: &Architecture, options: &ModelOptions) -> ModelDump {
    let expanded = if options.expand_all {
        architecture
            .modules
            .iter()
            .filter_map(|m| m.group.clone())
            .collect()
    } else {
        options.expanded_groups.clone()
    };
    let input = ModelInput {
        modules: &architecture.modules,
        expanded_groups: &expanded,
        existing_prompts: &options.existing_prompts,
        saved_positions: &options.saved_positions,
    };
    let model = build_graph_model(&input, &options.config);
    ModelDump::from_model(&model, &architecture.modules, &options.config.theme)
}
