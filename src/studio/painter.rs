use eframe::egui;

use crate::overlay::commands::{LogicalPoint, LogicalRect, StrokeStyle};
use crate::overlay::dash::{dash_axis_segment, rect_edges};
use crate::overlay::{CanvasLayout, OverlayColor, OverlaySurface};

const GLOW_ALPHA_FACTOR: f32 = 0.3;

/// Replays overlay batches through an egui painter. egui already scales
/// points by `pixels_per_point`, so logical coordinates map 1:1 to points.
pub struct PainterSurface<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
    size: egui::Vec2,
}

impl<'a> PainterSurface<'a> {
    pub fn new(painter: &'a egui::Painter, origin: egui::Pos2) -> Self {
        Self {
            painter,
            origin,
            size: egui::Vec2::ZERO,
        }
    }

    fn to_screen(&self, (x, y): (f64, f64)) -> egui::Pos2 {
        self.origin + egui::vec2(x as f32, y as f32)
    }

    /// Strokes a path of axis-aligned edges in logical units, carrying the
    /// dash phase from one edge to the next. Edges are clipped to the canvas
    /// before dashing.
    fn stroke_edges(
        &self,
        edges: &[((f64, f64), (f64, f64))],
        stroke: &StrokeStyle,
        width: f64,
        color: egui::Color32,
    ) {
        let egui_stroke = egui::Stroke::new(width as f32, color);
        let extent = (f64::from(self.size.x), f64::from(self.size.y));
        let pattern = stroke.dash.map(|pattern| (pattern.dash, pattern.gap));

        let mut phase = 0.0;
        for &(from, to) in edges {
            let dashes = dash_axis_segment(from, to, width, extent, pattern, phase);
            for (a, b) in dashes.runs {
                self.painter
                    .line_segment([self.to_screen(a), self.to_screen(b)], egui_stroke);
            }
            phase = dashes.end_phase;
        }
    }
}

impl OverlaySurface for PainterSurface<'_> {
    fn prepare(&mut self, layout: &CanvasLayout) {
        self.size = egui::vec2(
            layout.canvas_width_px as f32,
            layout.canvas_height_px as f32,
        );
    }

    fn clear(&mut self, color: OverlayColor) {
        let rect = egui::Rect::from_min_size(self.origin, self.size);
        self.painter.rect_filled(rect, 0.0_f32, to_color32(color));
    }

    fn stroke_line(&mut self, from: LogicalPoint, to: LogicalPoint, stroke: &StrokeStyle) {
        let from = (from.x, from.y);
        let to = (to.x, to.y);
        if (from.0 - to.0).abs() > f64::EPSILON && (from.1 - to.1).abs() > f64::EPSILON {
            self.painter.line_segment(
                [self.to_screen(from), self.to_screen(to)],
                egui::Stroke::new(stroke.width as f32, to_color32(stroke.color)),
            );
            return;
        }
        self.stroke_edges(&[(from, to)], stroke, stroke.width, to_color32(stroke.color));
    }

    fn stroke_rect(&mut self, rect: &LogicalRect, stroke: &StrokeStyle) {
        let edges = rect_edges(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height);

        if stroke.glow_blur > 0.0 {
            let glow_alpha = (f32::from(stroke.color.a) * GLOW_ALPHA_FACTOR).round() as u8;
            self.stroke_edges(
                &edges,
                stroke,
                stroke.width + stroke.glow_blur,
                to_color32(stroke.color.with_alpha(glow_alpha)),
            );
        }
        self.stroke_edges(&edges, stroke, stroke.width, to_color32(stroke.color));
    }
}

pub fn to_color32(color: OverlayColor) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}
