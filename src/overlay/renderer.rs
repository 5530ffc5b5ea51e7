use crate::tree::Component;

use super::commands::{
    DashPattern, LogicalPoint, OverlayDrawBatch, OverlayDrawCommand, OverlayLayer, StrokeStyle,
};
use super::layout::CanvasLayout;
use super::style::{MIN_GRID_SPACING, OverlayColor, OverlayStyle};

const MIN_STROKE_WIDTH: f64 = 0.5;
const PRIMARY_BASE_WIDTH: f64 = 1.0;
const UNMATCHED_BASE_WIDTH: f64 = 0.75;
const PRIMARY_DASH: (f64, f64) = (6.0, 3.0);
const UNMATCHED_DASH: (f64, f64) = (4.0, 2.0);

pub struct OverlayRenderInput<'a> {
    pub layout: &'a CanvasLayout,
    pub style: &'a OverlayStyle,
    pub components: &'a [Component],
    pub unmatched: Option<&'a [Component]>,
    pub primary_color: OverlayColor,
    pub unmatched_color: OverlayColor,
}

pub struct OverlayRenderer;

impl OverlayRenderer {
    /// Background, then grid, then the primary set, then the unmatched set on top.
    pub fn render(input: OverlayRenderInput<'_>) -> OverlayDrawBatch {
        let layout = input.layout;
        let width = f64::from(layout.canvas_width_px);
        let height = f64::from(layout.canvas_height_px);

        let mut commands = vec![OverlayDrawCommand::Clear {
            color: input.style.background,
        }];
        push_grid(&mut commands, input.style, width, height);

        let primary_stroke = StrokeStyle {
            color: input.primary_color,
            width: scaled_stroke_width(PRIMARY_BASE_WIDTH, layout),
            dash: Some(scaled_dash(PRIMARY_DASH, layout.scale)),
            glow_blur: input.style.glow_blur,
        };
        push_rects(
            &mut commands,
            layout,
            input.components,
            OverlayLayer::Primary,
            primary_stroke,
        );

        if let Some(unmatched) = input.unmatched {
            let unmatched_stroke = StrokeStyle {
                color: input.unmatched_color,
                width: scaled_stroke_width(UNMATCHED_BASE_WIDTH, layout),
                dash: Some(scaled_dash(UNMATCHED_DASH, layout.scale)),
                glow_blur: 0.0,
            };
            push_rects(
                &mut commands,
                layout,
                unmatched,
                OverlayLayer::Unmatched,
                unmatched_stroke,
            );
        }

        OverlayDrawBatch {
            layout: *layout,
            commands,
        }
    }
}

fn push_grid(commands: &mut Vec<OverlayDrawCommand>, style: &OverlayStyle, width: f64, height: f64) {
    let stroke = StrokeStyle {
        color: style.grid_color,
        width: style.grid_line_width,
        dash: None,
        glow_blur: 0.0,
    };

    let spacing = style.grid_spacing.max(MIN_GRID_SPACING);
    for index in 0..grid_line_count(width, spacing) {
        let x = index as f64 * spacing;
        commands.push(OverlayDrawCommand::Line {
            from: LogicalPoint { x, y: 0.0 },
            to: LogicalPoint { x, y: height },
            stroke,
        });
    }

    for index in 0..grid_line_count(height, spacing) {
        let y = index as f64 * spacing;
        commands.push(OverlayDrawCommand::Line {
            from: LogicalPoint { x: 0.0, y },
            to: LogicalPoint { x: width, y },
            stroke,
        });
    }
}

/// Lines at `0, spacing, 2 * spacing, ...` strictly below `extent`.
fn grid_line_count(extent: f64, spacing: f64) -> u32 {
    if extent <= 0.0 {
        return 0;
    }
    (extent / spacing).ceil() as u32
}

fn push_rects(
    commands: &mut Vec<OverlayDrawCommand>,
    layout: &CanvasLayout,
    components: &[Component],
    layer: OverlayLayer,
    stroke: StrokeStyle,
) {
    for component in components {
        commands.push(OverlayDrawCommand::StrokeRect {
            component_id: component.id.clone(),
            layer,
            rect: layout.to_logical(&component.bounding_box),
            stroke,
        });
    }
}

fn scaled_stroke_width(base: f64, layout: &CanvasLayout) -> f64 {
    (base * layout.scale / layout.device_pixel_ratio).max(MIN_STROKE_WIDTH)
}

fn scaled_dash((dash, gap): (f64, f64), scale: f64) -> DashPattern {
    DashPattern {
        dash: (dash * scale).round().max(1.0),
        gap: (gap * scale).round().max(1.0),
    }
}
