use crate::ir::Direction;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutEngineKind {
    #[default]
    Dagre,
    LongestPath,
}

/// Geometry of group containers and the children packed inside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub columns: usize,
    pub inner_padding: f32,
    pub gap: f32,
    pub header_height: f32,
    pub collapsed_width: f32,
    pub collapsed_height: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            columns: 2,
            inner_padding: 20.0,
            gap: 16.0,
            header_height: 40.0,
            collapsed_width: 240.0,
            collapsed_height: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub direction: Direction,
    pub engine: LayoutEngineKind,
    /// Separation between nodes of the same rank.
    pub node_spacing: f32,
    /// Separation between ranks.
    pub rank_spacing: f32,
    pub margin: f32,
    pub module_width: f32,
    pub module_height: f32,
    /// Columns of the grid used for nodes the layered engine could not place.
    pub fallback_columns: usize,
    pub order_passes: usize,
    pub group: GroupConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopDown,
            engine: LayoutEngineKind::Dagre,
            node_spacing: 60.0,
            rank_spacing: 100.0,
            margin: 20.0,
            module_width: 220.0,
            module_height: 80.0,
            fallback_columns: 4,
            order_passes: 4,
            group: GroupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    direction: Option<String>,
    engine: Option<LayoutEngineKind>,
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
    margin: Option<f32>,
    module_width: Option<f32>,
    module_height: Option<f32>,
    fallback_columns: Option<usize>,
    order_passes: Option<usize>,
    group: Option<GroupConfigFile>,
    batch_palette: Option<Vec<String>>,
    module_color: Option<String>,
    group_color: Option<String>,
    edge_color: Option<String>,
    dimmed_opacity: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroupConfigFile {
    columns: Option<usize>,
    inner_padding: Option<f32>,
    gap: Option<f32>,
    header_height: Option<f32>,
    collapsed_width: Option<f32>,
    collapsed_height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents, config)
}

/// Overlays a camelCase config document onto `base`. Fields that are absent
/// keep their base values.
pub fn parse_config(contents: &str, base: Config) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(err) => json5::from_str(contents).map_err(|_| err)?,
    };
    let mut config = base;

    if let Some(token) = parsed.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown layout direction '{token}'"))?;
    }
    if let Some(v) = parsed.engine {
        config.layout.engine = v;
    }
    if let Some(v) = parsed.node_spacing {
        config.layout.node_spacing = v;
    }
    if let Some(v) = parsed.rank_spacing {
        config.layout.rank_spacing = v;
    }
    if let Some(v) = parsed.margin {
        config.layout.margin = v;
    }
    if let Some(v) = parsed.module_width {
        config.layout.module_width = v;
    }
    if let Some(v) = parsed.module_height {
        config.layout.module_height = v;
    }
    if let Some(v) = parsed.fallback_columns {
        config.layout.fallback_columns = v.max(1);
    }
    if let Some(v) = parsed.order_passes {
        config.layout.order_passes = v;
    }

    if let Some(group) = parsed.group {
        if let Some(v) = group.columns {
            config.layout.group.columns = v.max(1);
        }
        if let Some(v) = group.inner_padding {
            config.layout.group.inner_padding = v;
        }
        if let Some(v) = group.gap {
            config.layout.group.gap = v;
        }
        if let Some(v) = group.header_height {
            config.layout.group.header_height = v;
        }
        if let Some(v) = group.collapsed_width {
            config.layout.group.collapsed_width = v;
        }
        if let Some(v) = group.collapsed_height {
            config.layout.group.collapsed_height = v;
        }
    }

    if let Some(palette) = parsed.batch_palette {
        if !palette.is_empty() {
            config.theme.batch_palette = palette;
        }
    }
    if let Some(v) = parsed.module_color {
        config.theme.module_color = v;
    }
    if let Some(v) = parsed.group_color {
        config.theme.group_color = v;
    }
    if let Some(v) = parsed.edge_color {
        config.theme.edge_color = v;
    }
    if let Some(v) = parsed.dimmed_opacity {
        config.theme.dimmed_opacity = v.clamp(0.0, 1.0);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.layout, LayoutConfig::default());
        assert_eq!(config.layout.group.columns, 2);
    }

    #[test]
    fn overlays_only_present_fields() {
        let input = r##"{
            "direction": "LR",
            "engine": "longest-path",
            "rankSpacing": 140,
            "group": { "columns": 3, "headerHeight": 32 },
            "batchPalette": ["#000000"],
            "edgeColor": "#333333",
            "dimmedOpacity": 0.4
        }"##;
        let config = parse_config(input, Config::default()).unwrap();
        assert_eq!(config.layout.direction, Direction::LeftRight);
        assert_eq!(config.layout.engine, LayoutEngineKind::LongestPath);
        assert_eq!(config.layout.rank_spacing, 140.0);
        assert_eq!(config.layout.node_spacing, 60.0);
        assert_eq!(config.layout.group.columns, 3);
        assert_eq!(config.layout.group.header_height, 32.0);
        assert_eq!(config.layout.group.gap, 16.0);
        assert_eq!(config.theme.batch_palette, vec!["#000000".to_string()]);
        assert_eq!(config.theme.edge_color, "#333333");
        assert_eq!(config.theme.dimmed_opacity, 0.4);
        assert_eq!(config.theme.module_color, Theme::modern().module_color);
    }

    #[test]
    fn accepts_json5() {
        let input = "{ nodeSpacing: 12, /* tight */ }";
        let config = parse_config(input, Config::default()).unwrap();
        assert_eq!(config.layout.node_spacing, 12.0);
    }

    #[test]
    fn rejects_unknown_direction() {
        assert!(parse_config(r#"{"direction": "up"}"#, Config::default()).is_err());
    }
}
