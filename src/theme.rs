use serde::{Deserialize, Serialize};

pub const BATCH_PALETTE: [&str; 8] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub batch_palette: Vec<String>,
    pub module_color: String,
    pub group_color: String,
    pub edge_color: String,
    /// Opacity of nodes outside the focus neighborhood.
    pub dimmed_opacity: f32,
}

impl Theme {
    pub fn modern() -> Self {
        Self {
            batch_palette: BATCH_PALETTE.iter().map(|c| c.to_string()).collect(),
            module_color: "#F8FAFF".to_string(),
            group_color: "#F7FAFF".to_string(),
            edge_color: "#7A8AA6".to_string(),
            dimmed_opacity: 0.25,
        }
    }

    /// Palette entry for a batch ordinal; wraps around the palette.
    pub fn batch_color(&self, index: usize) -> String {
        if self.batch_palette.is_empty() {
            return BATCH_PALETTE[index % BATCH_PALETTE.len()].to_string();
        }
        self.batch_palette[index % self.batch_palette.len()].clone()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::modern()
    }
}
