use serde::Serialize;

use super::layout::CanvasLayout;
use super::style::OverlayColor;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogicalPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LogicalRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashPattern {
    pub dash: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrokeStyle {
    pub color: OverlayColor,
    pub width: f64,
    pub dash: Option<DashPattern>,
    pub glow_blur: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayLayer {
    Primary,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OverlayDrawCommand {
    Clear {
        color: OverlayColor,
    },
    Line {
        from: LogicalPoint,
        to: LogicalPoint,
        stroke: StrokeStyle,
    },
    StrokeRect {
        component_id: String,
        layer: OverlayLayer,
        rect: LogicalRect,
        stroke: StrokeStyle,
    },
}

/// One full frame for a canvas. Replaying a batch onto a surface always
/// starts from a cleared frame, so replay is idempotent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayDrawBatch {
    pub layout: CanvasLayout,
    pub commands: Vec<OverlayDrawCommand>,
}

impl OverlayDrawBatch {
    pub fn rect_count(&self, layer: OverlayLayer) -> usize {
        self.commands
            .iter()
            .filter(|command| {
                matches!(command, OverlayDrawCommand::StrokeRect { layer: candidate, .. } if *candidate == layer)
            })
            .count()
    }

    pub fn replay<S: OverlaySurface>(&self, surface: &mut S) {
        surface.prepare(&self.layout);
        for command in &self.commands {
            match command {
                OverlayDrawCommand::Clear { color } => surface.clear(*color),
                OverlayDrawCommand::Line { from, to, stroke } => {
                    surface.stroke_line(*from, *to, stroke)
                }
                OverlayDrawCommand::StrokeRect { rect, stroke, .. } => {
                    surface.stroke_rect(rect, stroke)
                }
            }
        }
    }
}

/// A drawing target that accepts logical coordinates. `prepare` sizes the
/// backing store from the layout and establishes the device pixel ratio
/// transform once per frame.
pub trait OverlaySurface {
    fn prepare(&mut self, layout: &CanvasLayout);
    fn clear(&mut self, color: OverlayColor);
    fn stroke_line(&mut self, from: LogicalPoint, to: LogicalPoint, stroke: &StrokeStyle);
    fn stroke_rect(&mut self, rect: &LogicalRect, stroke: &StrokeStyle);
}
