use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

use crate::overlay::layout::{FALLBACK_CONTAINER_WIDTH, FALLBACK_VIEWPORT_HEIGHT};
use crate::overlay::{OverlayStyle, ViewportConstraints, load_overlay_style};

pub const DEFAULT_COMPARE_BASE_URL: &str = "http://localhost:5050";
pub const DEFAULT_DEVICE_PIXEL_RATIO: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    pub compare_base_url: String,
    /// `None` lets the comparison call run to completion.
    pub compare_timeout_ms: Option<u64>,
    pub container_width: f64,
    pub viewport_height: f64,
    pub device_pixel_ratio: f64,
    pub style_path: Option<PathBuf>,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            compare_base_url: DEFAULT_COMPARE_BASE_URL.to_owned(),
            compare_timeout_ms: None,
            container_width: FALLBACK_CONTAINER_WIDTH,
            viewport_height: FALLBACK_VIEWPORT_HEIGHT,
            device_pixel_ratio: DEFAULT_DEVICE_PIXEL_RATIO,
            style_path: None,
        }
    }
}

impl OverlaySettings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from any variable source. `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let compare_base_url = lookup("COMPARE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_COMPARE_BASE_URL.to_owned());
        ensure!(
            !compare_base_url.trim().is_empty(),
            "COMPARE_BASE_URL cannot be empty"
        );

        let compare_timeout_ms = match parse_u64_var(&lookup, "COMPARE_TIMEOUT_MS", 0)? {
            0 => None,
            timeout_ms => Some(timeout_ms),
        };

        let container_width =
            parse_f64_var(&lookup, "OVERLAY_CONTAINER_WIDTH", FALLBACK_CONTAINER_WIDTH)?;
        ensure!(
            container_width > 0.0,
            "OVERLAY_CONTAINER_WIDTH must be greater than 0"
        );

        let viewport_height =
            parse_f64_var(&lookup, "OVERLAY_VIEWPORT_HEIGHT", FALLBACK_VIEWPORT_HEIGHT)?;
        ensure!(
            viewport_height > 0.0,
            "OVERLAY_VIEWPORT_HEIGHT must be greater than 0"
        );

        let device_pixel_ratio =
            parse_f64_var(&lookup, "OVERLAY_DEVICE_PIXEL_RATIO", DEFAULT_DEVICE_PIXEL_RATIO)?;
        ensure!(
            device_pixel_ratio > 0.0,
            "OVERLAY_DEVICE_PIXEL_RATIO must be greater than 0"
        );

        let style_path = read_optional_var(&lookup, "OVERLAY_STYLE_PATH").map(PathBuf::from);

        Ok(Self {
            compare_base_url: compare_base_url.trim().to_owned(),
            compare_timeout_ms,
            container_width,
            viewport_height,
            device_pixel_ratio,
            style_path,
        })
    }

    pub fn viewport_constraints(&self) -> ViewportConstraints {
        ViewportConstraints {
            container_width: Some(self.container_width),
            viewport_height: Some(self.viewport_height),
            device_pixel_ratio: self.device_pixel_ratio,
        }
    }

    pub fn overlay_style(&self) -> Result<OverlayStyle> {
        match &self.style_path {
            Some(path) => load_overlay_style(path),
            None => Ok(OverlayStyle::default()),
        }
    }
}

fn read_optional_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn parse_u64_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> Result<u64> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("failed to parse {name} as u64")),
        None => Ok(default),
    }
}

fn parse_f64_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: f64) -> Result<f64> {
    match lookup(name) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("failed to parse {name} as a number"))?;
            ensure!(value.is_finite(), "{name} must be a finite number");
            Ok(value)
        }
        None => Ok(default),
    }
}
