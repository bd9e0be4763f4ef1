//! Edge path construction.
//!
//! With waypoints the path is a chain of quadratic segments: each interior
//! waypoint is a control point and segments meet at the midpoints between
//! consecutive waypoints, giving C1-continuous joins that end exactly on the
//! target. Without waypoints a direct cubic curve is used instead.

use crate::ir::Direction;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    QuadraticTo {
        cx: f32,
        cy: f32,
        x: f32,
        y: f32,
    },
    CubicTo {
        cx1: f32,
        cy1: f32,
        cx2: f32,
        cy2: f32,
        x: f32,
        y: f32,
    },
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoveTo(x, y) => write!(f, "M {} {}", x, y),
            Self::QuadraticTo { cx, cy, x, y } => write!(f, "Q {} {} {} {}", cx, cy, x, y),
            Self::CubicTo {
                cx1,
                cy1,
                cx2,
                cy2,
                x,
                y,
            } => write!(f, "C {} {} {} {} {} {}", cx1, cy1, cx2, cy2, x, y),
        }
    }
}

pub fn commands_to_path(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quadratic spline commands through `[source, ...waypoints, target]`.
pub fn spline_commands(
    source: (f32, f32),
    waypoints: &[(f32, f32)],
    target: (f32, f32),
) -> Vec<PathCommand> {
    let mut points = Vec::with_capacity(waypoints.len() + 2);
    points.push(source);
    points.extend_from_slice(waypoints);
    points.push(target);

    let mut commands = vec![PathCommand::MoveTo(source.0, source.1)];
    let last_interior = points.len().saturating_sub(2);
    for i in 1..=last_interior {
        let (cx, cy) = points[i];
        let (x, y) = if i == last_interior {
            target
        } else {
            let next = points[i + 1];
            ((cx + next.0) / 2.0, (cy + next.1) / 2.0)
        };
        commands.push(PathCommand::QuadraticTo { cx, cy, x, y });
    }
    commands
}

pub fn build_edge_path(
    source: (f32, f32),
    waypoints: &[(f32, f32)],
    target: (f32, f32),
) -> String {
    commands_to_path(&spline_commands(source, waypoints, target))
}

/// Direct cubic curve between two anchors, bending along the rank axis.
pub fn direct_edge_path(source: (f32, f32), target: (f32, f32), direction: Direction) -> String {
    let command = if direction.is_horizontal() {
        let mid = (source.0 + target.0) / 2.0;
        PathCommand::CubicTo {
            cx1: mid,
            cy1: source.1,
            cx2: mid,
            cy2: target.1,
            x: target.0,
            y: target.1,
        }
    } else {
        let mid = (source.1 + target.1) / 2.0;
        PathCommand::CubicTo {
            cx1: source.0,
            cy1: mid,
            cx2: target.0,
            cy2: mid,
            x: target.0,
            y: target.1,
        }
    };
    commands_to_path(&[PathCommand::MoveTo(source.0, source.1), command])
}

/// Spline when the layout produced waypoints, direct curve otherwise.
pub fn edge_path(
    source: (f32, f32),
    waypoints: &[(f32, f32)],
    target: (f32, f32),
    direction: Direction,
) -> String {
    if waypoints.is_empty() {
        direct_edge_path(source, target, direction)
    } else {
        build_edge_path(source, waypoints, target)
    }
}

/// Outgoing and incoming anchor points of a node box for the given flow direction.
pub fn anchors(x: f32, y: f32, width: f32, height: f32, direction: Direction) -> ((f32, f32), (f32, f32)) {
    let cx = x + width / 2.0;
    let cy = y + height / 2.0;
    match direction {
        Direction::TopDown => ((cx, y + height), (cx, y)),
        Direction::BottomTop => ((cx, y), (cx, y + height)),
        Direction::LeftRight => ((x + width, cy), (x, cy)),
        Direction::RightLeft => ((x, cy), (x + width, cy)),
    }
}
