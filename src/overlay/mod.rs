//! Scaled bounding-box overlays: viewport fitting, draw-command generation and
//! the surfaces that replay those commands.

pub mod commands;
pub mod dash;
pub mod layout;
pub mod raster;
pub mod renderer;
pub mod style;

pub use self::commands::{OverlayDrawBatch, OverlayDrawCommand, OverlayLayer, OverlaySurface};
pub use self::layout::{CanvasLayout, ViewportConstraints, compute_layout};
pub use self::raster::RasterSurface;
pub use self::renderer::{OverlayRenderInput, OverlayRenderer};
pub use self::style::{OverlayColor, OverlayStyle, load_overlay_style};
