use archgraph::config::parse_config;
use archgraph::ir::Module;
use archgraph::{Config, ModelOptions, Position, build_model_dump, structural_fingerprint};
use serde::Deserialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphModelOptions {
    expanded_groups: Option<Vec<String>>,
    expand_all: Option<bool>,
    existing_prompts: Option<Vec<String>>,
    positions: Option<BTreeMap<String, Position>>,
    /// Same shape as the CLI config file.
    config: Option<serde_json::Value>,
}

fn build_model_options(options: GraphModelOptions) -> Result<ModelOptions, String> {
    let config = match options.config {
        Some(value) => parse_config(&value.to_string(), Config::default()).map_err(|e| e.to_string())?,
        None => Config::default(),
    };
    Ok(ModelOptions {
        config,
        expanded_groups: options.expanded_groups.unwrap_or_default().into_iter().collect(),
        expand_all: options.expand_all.unwrap_or(false),
        existing_prompts: options.existing_prompts.unwrap_or_default().into_iter().collect(),
        saved_positions: options.positions.unwrap_or_default(),
    })
}

fn build_graph_model_inner(architecture: &str, options_json: Option<String>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<GraphModelOptions>(&raw).map_err(|e| e.to_string())?,
        None => GraphModelOptions::default(),
    };
    let options = build_model_options(options)?;
    let dump = build_model_dump(architecture, &options).map_err(|e| e.to_string())?;
    dump.to_json().map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn build_graph_model_json(architecture: &str, options_json: Option<String>) -> Result<String, JsValue> {
    build_graph_model_inner(architecture, options_json).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn structural_fingerprint_json(modules_json: &str) -> Result<String, JsValue> {
    let modules: Vec<Module> =
        serde_json::from_str(modules_json).map_err(|error| JsValue::from_str(&error.to_string()))?;
    Ok(structural_fingerprint(&modules))
}
