use crate::config::{GroupConfig, LayoutConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildPosition {
    pub filename: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupLayout {
    pub columns: usize,
    pub rows: usize,
    pub container_width: f32,
    pub container_height: f32,
    /// Offsets relative to the container's top-left corner, in `children` order.
    pub child_positions: Vec<ChildPosition>,
}

/// Packs the children of an expanded group into a fixed-column grid.
///
/// Depends only on the ordered child list, so the geometry is identical on
/// every call for the same input.
pub fn compute_group_layout<S: AsRef<str>>(children: &[S], config: &LayoutConfig) -> GroupLayout {
    let group: &GroupConfig = &config.group;
    let node_w = config.module_width;
    let node_h = config.module_height;

    let columns = children.len().min(group.columns).max(1);
    let rows = children.len().div_ceil(columns);

    let container_width =
        2.0 * group.inner_padding + columns as f32 * (node_w + group.gap) - group.gap;
    let grid_height = (rows as f32 * (node_h + group.gap) - group.gap).max(0.0);
    let container_height = group.header_height + 2.0 * group.inner_padding + grid_height;

    let child_positions = children
        .iter()
        .enumerate()
        .map(|(idx, filename)| {
            let col = idx % columns;
            let row = idx / columns;
            ChildPosition {
                filename: filename.as_ref().to_string(),
                x: group.inner_padding + col as f32 * (node_w + group.gap),
                y: group.header_height + group.inner_padding + row as f32 * (node_h + group.gap),
            }
        })
        .collect();

    GroupLayout {
        columns,
        rows,
        container_width,
        container_height,
        child_positions,
    }
}
