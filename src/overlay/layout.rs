use serde::Serialize;

use crate::tree::{BoundingBox, ScreenSize};

use super::commands::LogicalRect;

pub const FALLBACK_CONTAINER_WIDTH: f64 = 640.0;
pub const FALLBACK_VIEWPORT_HEIGHT: f64 = 800.0;
pub const VIEWPORT_SAFETY_MARGIN: f64 = 240.0;
pub const MIN_HEIGHT_CAP: f64 = 300.0;
pub const FALLBACK_SOURCE_SCREEN: ScreenSize = ScreenSize {
    width: 640,
    height: 420,
};

/// Size of the box the canvas has to fit into, plus the display density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConstraints {
    pub container_width: Option<f64>,
    pub viewport_height: Option<f64>,
    pub device_pixel_ratio: f64,
}

impl Default for ViewportConstraints {
    fn default() -> Self {
        Self {
            container_width: None,
            viewport_height: None,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Result of mapping a source screen into a displayable canvas.
///
/// `canvas_*` are logical pixels; `backing_*` are physical pixels of the
/// backing store. All draw coordinates are logical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasLayout {
    pub source: ScreenSize,
    pub scale: f64,
    pub canvas_width_px: u32,
    pub canvas_height_px: u32,
    pub backing_width_px: u32,
    pub backing_height_px: u32,
    pub device_pixel_ratio: f64,
}

impl CanvasLayout {
    pub fn to_logical(&self, bounding_box: &BoundingBox) -> LogicalRect {
        LogicalRect {
            x: bounding_box.x as f64 * self.scale,
            y: bounding_box.y as f64 * self.scale,
            width: bounding_box.width as f64 * self.scale,
            height: bounding_box.height as f64 * self.scale,
        }
    }
}

/// Uniform, aspect-preserving fit of `source` into the viewport.
///
/// The height target is capped at `max(300, viewport_height - 240)` so very
/// tall screens do not overflow the viewport.
pub fn compute_layout(source: Option<ScreenSize>, constraints: &ViewportConstraints) -> CanvasLayout {
    let source = source.unwrap_or(FALLBACK_SOURCE_SCREEN);
    let target_width = positive_or(constraints.container_width, FALLBACK_CONTAINER_WIDTH);
    let viewport_height = positive_or(constraints.viewport_height, FALLBACK_VIEWPORT_HEIGHT);
    let height_cap = (viewport_height - VIEWPORT_SAFETY_MARGIN).max(MIN_HEIGHT_CAP);
    let device_pixel_ratio = positive_or(Some(constraints.device_pixel_ratio), 1.0);

    let source_width = f64::from(source.width.max(1));
    let source_height = f64::from(source.height.max(1));
    let scale = (target_width / source_width).min(height_cap / source_height);

    let canvas_width_px = floor_px(source_width * scale);
    let canvas_height_px = floor_px(source_height * scale);

    CanvasLayout {
        source,
        scale,
        canvas_width_px,
        canvas_height_px,
        backing_width_px: floor_px(f64::from(canvas_width_px) * device_pixel_ratio),
        backing_height_px: floor_px(f64::from(canvas_height_px) * device_pixel_ratio),
        device_pixel_ratio,
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    value
        .filter(|candidate| candidate.is_finite() && *candidate > 0.0)
        .unwrap_or(fallback)
}

fn floor_px(value: f64) -> u32 {
    // `as` saturates on overflow and maps NaN to zero.
    (value.floor() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::{ViewportConstraints, compute_layout};
    use crate::tree::{BoundingBox, ScreenSize};

    fn constraints(width: f64, height: f64, dpr: f64) -> ViewportConstraints {
        ViewportConstraints {
            container_width: Some(width),
            viewport_height: Some(height),
            device_pixel_ratio: dpr,
        }
    }

    #[test]
    fn tall_screen_is_limited_by_height_cap() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 1080,
                height: 1920,
            }),
            &constraints(540.0, 1000.0, 1.0),
        );

        let expected_scale = (540.0_f64 / 1080.0).min(760.0 / 1920.0);
        assert!((layout.scale - expected_scale).abs() < 1e-12);
        assert!((layout.scale - 0.3958).abs() < 1e-3);
        assert_eq!(layout.canvas_width_px, (1080.0 * layout.scale).floor() as u32);
        assert_eq!(layout.canvas_height_px, (1920.0 * layout.scale).floor() as u32);
        assert_eq!(layout.backing_width_px, layout.canvas_width_px);
    }

    #[test]
    fn wide_screen_is_limited_by_container_width() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 1920,
                height: 1080,
            }),
            &constraints(960.0, 1400.0, 1.0),
        );
        assert_eq!(layout.scale, 0.5);
        assert_eq!(layout.canvas_width_px, 960);
        assert_eq!(layout.canvas_height_px, 540);
    }

    #[test]
    fn height_cap_never_drops_below_minimum() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 100,
                height: 600,
            }),
            &constraints(1000.0, 200.0, 1.0),
        );
        assert_eq!(layout.scale, 0.5);
        assert_eq!(layout.canvas_height_px, 300);
    }

    #[test]
    fn missing_inputs_use_fallbacks() {
        let layout = compute_layout(
            None,
            &ViewportConstraints {
                container_width: None,
                viewport_height: Some(f64::NAN),
                device_pixel_ratio: 0.0,
            },
        );
        assert_eq!(layout.source, super::FALLBACK_SOURCE_SCREEN);
        assert_eq!(layout.scale, 1.0);
        assert_eq!((layout.canvas_width_px, layout.canvas_height_px), (640, 420));
        assert_eq!(layout.device_pixel_ratio, 1.0);
    }

    #[test]
    fn backing_store_scales_with_device_pixel_ratio() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 1000,
                height: 500,
            }),
            &constraints(500.0, 1000.0, 2.0),
        );
        assert_eq!((layout.canvas_width_px, layout.canvas_height_px), (500, 250));
        assert_eq!((layout.backing_width_px, layout.backing_height_px), (1000, 500));
    }

    #[test]
    fn degenerate_screen_keeps_one_pixel_canvas() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 0,
                height: 0,
            }),
            &constraints(640.0, 800.0, 1.0),
        );
        assert!(layout.canvas_width_px >= 1);
        assert!(layout.canvas_height_px >= 1);
    }

    #[test]
    fn to_logical_multiplies_every_edge_by_scale() {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 1000,
                height: 1000,
            }),
            &constraints(500.0, 1000.0, 1.0),
        );
        let rect = layout.to_logical(&BoundingBox {
            x: 100,
            y: 40,
            width: 200,
            height: 60,
        });
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (50.0, 20.0, 100.0, 30.0));
    }
}
