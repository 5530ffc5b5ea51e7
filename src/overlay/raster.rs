use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::commands::{LogicalPoint, LogicalRect, OverlaySurface, StrokeStyle};
use super::dash::{dash_axis_segment, rect_edges};
use super::layout::CanvasLayout;
use super::style::OverlayColor;

const GLOW_ALPHA_FACTOR: f64 = 0.3;

/// In-memory backing store. Coordinates arrive in logical units and are
/// multiplied by the device pixel ratio set in `prepare`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    image: RgbaImage,
    device_pixel_ratio: f64,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self {
            image: RgbaImage::new(1, 1),
            device_pixel_ratio: 1.0,
        }
    }
}

impl RasterSurface {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(self.image.clone())
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .context("failed to encode overlay PNG")?;
        Ok(out)
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to write overlay PNG `{}`", path.display()))
    }

    fn fill_physical(&mut self, x0: f64, x1: f64, y0: f64, y1: f64, color: OverlayColor) {
        let (first_x, last_x) = pixel_span(x0, x1);
        let (first_y, last_y) = pixel_span(y0, y1);
        let max_x = i64::from(self.image.width()) - 1;
        let max_y = i64::from(self.image.height()) - 1;
        if last_x < 0 || last_y < 0 || first_x > max_x || first_y > max_y {
            return;
        }

        let source = Rgba(color.to_array());
        for y in first_y.max(0)..=last_y.min(max_y) {
            for x in first_x.max(0)..=last_x.min(max_x) {
                let pixel = self.image.get_pixel_mut(x as u32, y as u32);
                *pixel = blend_pixel(*pixel, source);
            }
        }
    }

    /// Axis-aligned band of `width` physical pixels centred on the segment,
    /// split into dashes when a pattern is given. Returns the dash phase at
    /// the end of the segment so rectangle edges continue one pattern.
    fn stroke_segment(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
        dash: Option<(f64, f64)>,
        phase: f64,
        color: OverlayColor,
    ) -> f64 {
        let extent = (
            f64::from(self.image.width()),
            f64::from(self.image.height()),
        );
        let dashes = dash_axis_segment(from, to, width, extent, dash, phase);
        let half = width / 2.0;
        for (a, b) in dashes.runs {
            if (a.1 - b.1).abs() <= f64::EPSILON {
                self.fill_physical(a.0.min(b.0), a.0.max(b.0), a.1 - half, a.1 + half, color);
            } else {
                self.fill_physical(a.0 - half, a.0 + half, a.1.min(b.1), a.1.max(b.1), color);
            }
        }
        dashes.end_phase
    }

    fn stroke_rect_pass(&mut self, rect: &LogicalRect, width: f64, stroke: &StrokeStyle, color: OverlayColor) {
        let dpr = self.device_pixel_ratio;
        let left = rect.x * dpr;
        let top = rect.y * dpr;
        let right = (rect.x + rect.width) * dpr;
        let bottom = (rect.y + rect.height) * dpr;
        let dash = stroke
            .dash
            .map(|pattern| (pattern.dash * dpr, pattern.gap * dpr));

        let mut phase = 0.0;
        for (from, to) in rect_edges(left, top, right, bottom) {
            phase = self.stroke_segment(from, to, width * dpr, dash, phase, color);
        }
    }
}

impl OverlaySurface for RasterSurface {
    fn prepare(&mut self, layout: &CanvasLayout) {
        if self.image.dimensions() != (layout.backing_width_px, layout.backing_height_px) {
            self.image = RgbaImage::new(layout.backing_width_px, layout.backing_height_px);
        }
        self.device_pixel_ratio = layout.device_pixel_ratio;
    }

    fn clear(&mut self, color: OverlayColor) {
        let fill = Rgba(color.to_array());
        for pixel in self.image.pixels_mut() {
            *pixel = fill;
        }
    }

    fn stroke_line(&mut self, from: LogicalPoint, to: LogicalPoint, stroke: &StrokeStyle) {
        let dpr = self.device_pixel_ratio;
        let from = (from.x * dpr, from.y * dpr);
        let to = (to.x * dpr, to.y * dpr);
        let dash = stroke
            .dash
            .map(|pattern| (pattern.dash * dpr, pattern.gap * dpr));
        let width = stroke.width * dpr;

        if (from.0 - to.0).abs() <= f64::EPSILON || (from.1 - to.1).abs() <= f64::EPSILON {
            self.stroke_segment(from, to, width, dash, 0.0, stroke.color);
            return;
        }

        // Diagonal lines are stamped as small squares along the path.
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let steps = (dx * dx + dy * dy).sqrt().ceil().max(1.0) as u32;
        let half = (width / 2.0).max(0.5);
        for step in 0..=steps {
            let t = f64::from(step) / f64::from(steps);
            let x = from.0 + dx * t;
            let y = from.1 + dy * t;
            self.fill_physical(x - half, x + half, y - half, y + half, stroke.color);
        }
    }

    fn stroke_rect(&mut self, rect: &LogicalRect, stroke: &StrokeStyle) {
        if stroke.glow_blur > 0.0 {
            let glow_alpha = (f64::from(stroke.color.a) * GLOW_ALPHA_FACTOR).round() as u8;
            let glow_color = stroke.color.with_alpha(glow_alpha);
            self.stroke_rect_pass(rect, stroke.width + stroke.glow_blur, stroke, glow_color);
        }
        self.stroke_rect_pass(rect, stroke.width, stroke, stroke.color);
    }
}

/// Pixels whose centres fall inside `[start, end)`, never fewer than one.
fn pixel_span(start: f64, end: f64) -> (i64, i64) {
    let first = (start + 0.5).floor() as i64;
    let last = ((end + 0.5).floor() as i64 - 1).max(first);
    (first, last)
}

fn blend_pixel(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let a = f64::from(src[3]) / 255.0;
    if a <= 0.0 {
        return dst;
    }
    let inv = 1.0 - a;
    let channel = |index: usize| {
        (f64::from(dst[index]) * inv + f64::from(src[index]) * a)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let out_a = (f64::from(dst[3]) * inv + f64::from(src[3]))
        .round()
        .clamp(0.0, 255.0) as u8;
    Rgba([channel(0), channel(1), channel(2), out_a])
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use image::Rgba;

    use super::{RasterSurface, pixel_span};
    use crate::overlay::commands::OverlaySurface;
    use crate::overlay::layout::{ViewportConstraints, compute_layout};
    use crate::overlay::renderer::{OverlayRenderInput, OverlayRenderer};
    use crate::overlay::style::OverlayStyle;
    use crate::tree::{BoundingBox, Component, ScreenSize};

    fn component(id: &str, x: i64, y: i64, width: i64, height: i64) -> Component {
        Component {
            id: id.to_owned(),
            kind: "View".to_owned(),
            bounding_box: BoundingBox {
                x,
                y,
                width,
                height,
            },
            confidence: None,
            text: None,
        }
    }

    fn render_to_surface(surface: &mut RasterSurface, components: &[Component], dpr: f64) {
        let layout = compute_layout(
            Some(ScreenSize {
                width: 200,
                height: 100,
            }),
            &ViewportConstraints {
                container_width: Some(200.0),
                viewport_height: Some(1000.0),
                device_pixel_ratio: dpr,
            },
        );
        let style = OverlayStyle::default();
        OverlayRenderer::render(OverlayRenderInput {
            layout: &layout,
            style: &style,
            components,
            unmatched: None,
            primary_color: style.design_color,
            unmatched_color: style.unmatched_design_color,
        })
        .replay(surface);
    }

    #[test]
    fn pixel_span_covers_at_least_one_pixel() {
        assert_eq!(pixel_span(-0.5, 0.5), (0, 0));
        assert_eq!(pixel_span(19.5, 20.5), (20, 20));
        assert_eq!(pixel_span(10.25, 10.75), (10, 10));
        assert_eq!(pixel_span(0.0, 4.0), (0, 3));
    }

    #[test]
    fn clipped_dashes_keep_their_phase() {
        let mut surface = RasterSurface::default();
        surface.prepare(&compute_layout(None, &ViewportConstraints::default()));
        let color = OverlayStyle::default().design_color;

        // -90 is a whole number of 9px periods before x = 0.
        let phase = surface.stroke_segment((-90.0, 20.0), (300.0, 20.0), 1.0, Some((6.0, 3.0)), 0.0, color);

        assert_eq!(phase, 390.0 % 9.0);
        assert_eq!(*surface.image().get_pixel(1, 20), Rgba(color.to_array()));
        assert_eq!(*surface.image().get_pixel(7, 20), Rgba([0, 0, 0, 0]));
        assert_eq!(*surface.image().get_pixel(10, 20), Rgba(color.to_array()));
    }

    #[test]
    fn huge_off_canvas_rect_renders_quickly() {
        let started = Instant::now();
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &[component("wide", 0, 10, 2_000_000_000, 50)], 1.0);
        let elapsed = started.elapsed();

        let style = OverlayStyle::default();
        assert!(elapsed < Duration::from_secs(5), "render took {elapsed:?}");
        assert_eq!(*surface.image().get_pixel(1, 10), Rgba(style.design_color.to_array()));
    }

    #[test]
    fn backing_store_matches_layout_and_dpr() {
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &[], 2.0);
        assert_eq!(surface.image().dimensions(), (400, 200));
    }

    #[test]
    fn background_and_grid_render_without_components() {
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &[], 1.0);
        let style = OverlayStyle::default();

        assert_eq!(*surface.image().get_pixel(5, 5), Rgba(style.background.to_array()));
        assert_eq!(*surface.image().get_pixel(20, 5), Rgba(style.grid_color.to_array()));
        assert_eq!(*surface.image().get_pixel(5, 40), Rgba(style.grid_color.to_array()));
    }

    #[test]
    fn component_edges_are_stroked_in_primary_colour() {
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &[component("a", 50, 30, 100, 40)], 1.0);
        let style = OverlayStyle::default();

        // First dash of the top edge starts at the rectangle's corner.
        assert_eq!(*surface.image().get_pixel(51, 30), Rgba(style.design_color.to_array()));
        assert_ne!(*surface.image().get_pixel(100, 50), Rgba(style.design_color.to_array()));
    }

    #[test]
    fn rerender_is_pixel_idempotent() {
        let components = vec![component("a", 10, 10, 60, 30), component("b", 120, 40, 50, 50)];
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &components, 1.5);
        let first = surface.image().clone();
        render_to_surface(&mut surface, &components, 1.5);
        assert_eq!(surface.image(), &first);

        let mut fresh = RasterSurface::default();
        render_to_surface(&mut fresh, &components, 1.5);
        assert_eq!(fresh.image(), &first);
    }

    #[test]
    fn encoded_png_has_signature() {
        let mut surface = RasterSurface::default();
        render_to_surface(&mut surface, &[], 1.0);
        let bytes = surface.encode_png().expect("png encoding should succeed");
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn prepare_resizes_only_when_layout_changes() {
        let mut surface = RasterSurface::default();
        let layout = compute_layout(None, &ViewportConstraints::default());
        surface.prepare(&layout);
        assert_eq!(surface.image().dimensions(), (640, 420));
    }
}
