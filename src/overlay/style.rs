use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKGROUND: OverlayColor = OverlayColor::rgb(0x0a, 0x0a, 0x0a);
pub const DEFAULT_GRID_COLOR: OverlayColor = OverlayColor::rgb(0x1a, 0x1a, 0x1a);
pub const DEFAULT_GRID_SPACING: f64 = 20.0;
pub const MIN_GRID_SPACING: f64 = 1.0;
pub const DEFAULT_GRID_LINE_WIDTH: f64 = 1.0;
pub const DEFAULT_DESIGN_COLOR: OverlayColor = OverlayColor::rgb(0xff, 0x00, 0x3c);
pub const DEFAULT_CODE_COLOR: OverlayColor = OverlayColor::rgb(0x00, 0xf3, 0xff);
pub const DEFAULT_UNMATCHED_DESIGN_COLOR: OverlayColor = OverlayColor::rgb(0xff, 0x44, 0x44);
pub const DEFAULT_UNMATCHED_CODE_COLOR: OverlayColor = OverlayColor::rgb(0x44, 0x44, 0xff);
pub const DEFAULT_GLOW_BLUR: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OverlayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl OverlayColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for OverlayColor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| anyhow!("colour `{trimmed}` must start with `#`"))?;
        ensure!(
            hex.len() == 6 || hex.len() == 8,
            "colour `{trimmed}` must be `#rrggbb` or `#rrggbbaa`"
        );

        let channel = |index: usize| {
            hex.get(index..index + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| anyhow!("colour `{trimmed}` contains invalid hex digits"))
        };
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };

        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: alpha,
        })
    }
}

impl Display for OverlayColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for OverlayColor {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<OverlayColor> for String {
    fn from(color: OverlayColor) -> Self {
        color.to_string()
    }
}

/// Fixed visual parameters of the overlay canvases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub background: OverlayColor,
    pub grid_color: OverlayColor,
    pub grid_spacing: f64,
    pub grid_line_width: f64,
    pub design_color: OverlayColor,
    pub code_color: OverlayColor,
    pub unmatched_design_color: OverlayColor,
    pub unmatched_code_color: OverlayColor,
    pub glow_blur: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            grid_color: DEFAULT_GRID_COLOR,
            grid_spacing: DEFAULT_GRID_SPACING,
            grid_line_width: DEFAULT_GRID_LINE_WIDTH,
            design_color: DEFAULT_DESIGN_COLOR,
            code_color: DEFAULT_CODE_COLOR,
            unmatched_design_color: DEFAULT_UNMATCHED_DESIGN_COLOR,
            unmatched_code_color: DEFAULT_UNMATCHED_CODE_COLOR,
            glow_blur: DEFAULT_GLOW_BLUR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverlayStyleFile {
    background: Option<OverlayColor>,
    grid_color: Option<OverlayColor>,
    grid_spacing: Option<f64>,
    design_color: Option<OverlayColor>,
    code_color: Option<OverlayColor>,
    unmatched_design_color: Option<OverlayColor>,
    unmatched_code_color: Option<OverlayColor>,
    glow_blur: Option<f64>,
}

pub fn load_overlay_style(path: &Path) -> Result<OverlayStyle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read overlay style file `{}`", path.display()))?;
    parse_overlay_style(&raw)
        .with_context(|| format!("failed to parse overlay style file `{}`", path.display()))
}

pub fn parse_overlay_style(raw: &str) -> Result<OverlayStyle> {
    let file = if raw.trim().is_empty() {
        OverlayStyleFile::default()
    } else {
        serde_yaml::from_str::<OverlayStyleFile>(raw)?
    };

    let defaults = OverlayStyle::default();
    let style = OverlayStyle {
        background: file.background.unwrap_or(defaults.background),
        grid_color: file.grid_color.unwrap_or(defaults.grid_color),
        grid_spacing: file.grid_spacing.unwrap_or(defaults.grid_spacing),
        grid_line_width: defaults.grid_line_width,
        design_color: file.design_color.unwrap_or(defaults.design_color),
        code_color: file.code_color.unwrap_or(defaults.code_color),
        unmatched_design_color: file
            .unmatched_design_color
            .unwrap_or(defaults.unmatched_design_color),
        unmatched_code_color: file
            .unmatched_code_color
            .unwrap_or(defaults.unmatched_code_color),
        glow_blur: file.glow_blur.unwrap_or(defaults.glow_blur),
    };

    ensure!(
        style.grid_spacing.is_finite() && style.grid_spacing >= MIN_GRID_SPACING,
        "grid_spacing must be at least {MIN_GRID_SPACING}"
    );
    ensure!(
        style.glow_blur.is_finite() && style.glow_blur >= 0.0,
        "glow_blur cannot be negative"
    );
    Ok(style)
}
