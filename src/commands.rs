use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::info;

use layout_overlay::config::OverlaySettings;
use layout_overlay::overlay::{OverlayLayer, OverlayStyle, RasterSurface, ViewportConstraints};
use layout_overlay::service::{CompareResponse, ComparisonClient};
use layout_overlay::session::{ComparisonSession, DatasetKind};
use layout_overlay::tree::{Component, ScreenSize, extract_components, parse_tree, resolve_screen_size};

#[derive(Debug, Clone, Copy, Default)]
pub struct ViewportOverrides {
    pub container_width: Option<f64>,
    pub viewport_height: Option<f64>,
    pub device_pixel_ratio: Option<f64>,
}

impl ViewportOverrides {
    fn apply(self, settings: &OverlaySettings) -> ViewportConstraints {
        let mut constraints = settings.viewport_constraints();
        if let Some(width) = self.container_width {
            constraints.container_width = Some(width);
        }
        if let Some(height) = self.viewport_height {
            constraints.viewport_height = Some(height);
        }
        if let Some(dpr) = self.device_pixel_ratio {
            constraints.device_pixel_ratio = dpr;
        }
        constraints
    }
}

pub fn run_render(
    settings: &OverlaySettings,
    design: Option<&Path>,
    code: Option<&Path>,
    out_dir: &Path,
    overrides: ViewportOverrides,
) -> Result<()> {
    let mut session = ComparisonSession::new();
    for (kind, path) in [(DatasetKind::Design, design), (DatasetKind::Code, code)] {
        if let Some(path) = path {
            session.load(kind, read_tree_file(path)?);
        }
    }

    let style = settings.overlay_style()?;
    let constraints = overrides.apply(settings);
    for path in write_overlays(&session, &style, &constraints, out_dir)? {
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn run_compare(
    settings: &OverlaySettings,
    design: &Path,
    code: &Path,
    out_dir: Option<&Path>,
    json: bool,
    overrides: ViewportOverrides,
) -> Result<()> {
    let mut session = ComparisonSession::new();
    session.load(DatasetKind::Design, read_tree_file(design)?);
    session.load(DatasetKind::Code, read_tree_file(code)?);

    let request = session.begin_comparison()?;
    let client = ComparisonClient::new(settings);
    info!(base_url = %client.base_url(), "requesting comparison");
    let outcome = client.compare(&request).await;
    let response = session
        .finish_comparison(outcome)
        .map_err(|error| anyhow!(error.user_message()))?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(response).context("failed to serialize response")?
        );
    } else {
        print!("{}", format_compare_summary(response));
    }

    if let Some(out_dir) = out_dir {
        let style = settings.overlay_style()?;
        let constraints = overrides.apply(settings);
        for path in write_overlays(&session, &style, &constraints, out_dir)? {
            if !json {
                println!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ExtractOutput {
    screen: Option<ScreenSize>,
    components: Vec<Component>,
}

pub fn run_extract(path: &Path, json: bool) -> Result<()> {
    let raw = read_tree_file(path)?;
    let tree = parse_tree(&raw);
    let output = ExtractOutput {
        screen: tree.as_ref().and_then(resolve_screen_size),
        components: tree.as_ref().map(extract_components).unwrap_or_default(),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to serialize components")?
        );
        return Ok(());
    }

    match output.screen {
        Some(screen) => println!("screen: {screen}"),
        None => println!("screen: unknown"),
    }
    println!("components: {}", output.components.len());
    for component in &output.components {
        let bounding_box = component.bounding_box;
        println!(
            "{}\t{}\t{},{} {}x{}",
            component.id,
            component.kind,
            bounding_box.x,
            bounding_box.y,
            bounding_box.width,
            bounding_box.height
        );
    }
    Ok(())
}

pub async fn run_health(settings: &OverlaySettings) -> Result<()> {
    let client = ComparisonClient::new(settings);
    let status = client
        .health()
        .await
        .with_context(|| format!("comparison service at {} is unavailable", client.base_url()))?;
    println!("{}: {}", client.base_url(), status.status);
    Ok(())
}

fn read_tree_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file `{}`", path.display()))
}

fn write_overlays(
    session: &ComparisonSession,
    style: &OverlayStyle,
    constraints: &ViewportConstraints,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory `{}`", out_dir.display()))?;

    let mut written = Vec::new();
    let mut surface = RasterSurface::default();
    for kind in DatasetKind::ALL {
        let batch = session.render_slot(kind, style, constraints);
        batch.replay(&mut surface);

        let path = out_dir.join(format!("{kind}.png"));
        surface.save_png(&path)?;
        info!(
            slot = %kind,
            path = %path.display(),
            width = batch.layout.backing_width_px,
            height = batch.layout.backing_height_px,
            rects = batch.rect_count(OverlayLayer::Primary),
            unmatched = batch.rect_count(OverlayLayer::Unmatched),
            "overlay written"
        );
        written.push(path);
    }
    Ok(written)
}

fn format_compare_summary(response: &CompareResponse) -> String {
    let mut out = String::new();
    if let Some(report_id) = response.report_id() {
        out.push_str(&format!("report: {report_id}\n"));
    }
    if let Some(screen) = response.screen {
        out.push_str(&format!("screen: {screen}\n"));
    }
    if let Some(result) = &response.comparison_result {
        out.push_str(&format!(
            "matches: {}\nunmatched design: {}\nunmatched code: {}\n",
            result.matches.len(),
            result.unmatched_design.len(),
            result.unmatched_code.len()
        ));
        if let (Some(design), Some(code)) =
            (result.total_design_components, result.total_code_components)
        {
            out.push_str(&format!("components: {design} design, {code} code\n"));
        }
    }
    if let Some(metrics) = &response.metrics {
        if let Some(match_rate) = metrics.match_rate {
            out.push_str(&format!("match rate: {match_rate:.1}%\n"));
        }
        if let Some(completeness) = metrics.completeness {
            out.push_str(&format!("completeness: {completeness:.1}%\n"));
        }
        if let Some(differences) = metrics.difference_count {
            out.push_str(&format!("differences: {differences}\n"));
        }
    }
    for blueprint in &response.ai_blueprints {
        out.push_str(&format!(
            "blueprint {} [{}] {} -> {}\n",
            blueprint.plan_id,
            blueprint.confidence,
            blueprint.action_type,
            blueprint.display_target_file()
        ));
    }
    for suggestion in &response.ai_suggestions {
        out.push_str(&format!("suggestion: {suggestion}\n"));
    }
    out
}
