use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

use crate::config::OverlaySettings;
use crate::overlay::{OverlayStyle, ViewportConstraints};
use crate::service::{Blueprint, CompareResponse, ComparisonClient};
use crate::session::{ComparisonSession, DatasetKind, SessionError};

pub mod events;
pub mod painter;

use self::events::{StudioCommand, StudioEvent};
use self::painter::PainterSurface;

const APP_TITLE: &str = "layout_overlay studio";
const CONTROL_PANE_WIDTH: f32 = 360.0;

pub fn run_studio(settings: &OverlaySettings) -> Result<()> {
    let runtime_handle = Handle::try_current().context("studio requires a tokio runtime")?;
    let style = settings.overlay_style()?;

    let (command_tx, command_rx) = unbounded_channel::<StudioCommand>();
    let (event_tx, event_rx) = unbounded_channel::<StudioEvent>();
    spawn_runtime_worker(
        &runtime_handle,
        ComparisonClient::new(settings),
        command_rx,
        event_tx,
    );
    info!(
        compare_base_url = %settings.compare_base_url,
        "starting overlay studio"
    );

    let viewport_height = settings.viewport_height;
    eframe::run_native(
        APP_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_cc| {
            Ok(Box::new(StudioApp::new(
                style,
                viewport_height,
                command_tx,
                event_rx,
            )))
        }),
    )
    .map_err(|error| anyhow::anyhow!("studio UI exited with error: {error}"))
}

/// Each command runs as its own task, so a file read never waits behind a
/// comparison that is still in flight.
fn spawn_runtime_worker(
    handle: &Handle,
    client: ComparisonClient,
    mut command_rx: UnboundedReceiver<StudioCommand>,
    event_tx: UnboundedSender<StudioEvent>,
) {
    let task_handle = handle.clone();
    let _task = handle.spawn(async move {
        while let Some(command) = command_rx.recv().await {
            let event_tx = event_tx.clone();
            match command {
                StudioCommand::LoadFile { kind, path } => {
                    let _load = task_handle.spawn(async move {
                        let _ = event_tx.send(read_tree_file(kind, path).await);
                    });
                }
                StudioCommand::Compare { request } => {
                    let client = client.clone();
                    let _compare = task_handle.spawn(async move {
                        let outcome = client.compare(&request).await;
                        let _ = event_tx.send(StudioEvent::ComparisonFinished { outcome });
                    });
                }
                StudioCommand::Shutdown => break,
            }
        }
    });
}

async fn read_tree_file(kind: DatasetKind, path: PathBuf) -> StudioEvent {
    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => StudioEvent::FileLoaded { kind, path, raw },
        Err(error) => StudioEvent::FileLoadFailed {
            kind,
            path,
            error: error.to_string(),
        },
    }
}

struct SlotInput {
    path_buffer: String,
    loaded_path: Option<PathBuf>,
    loading: bool,
}

impl SlotInput {
    fn new() -> Self {
        Self {
            path_buffer: String::new(),
            loaded_path: None,
            loading: false,
        }
    }
}

struct StudioApp {
    style: OverlayStyle,
    viewport_height: f64,
    command_tx: UnboundedSender<StudioCommand>,
    event_rx: UnboundedReceiver<StudioEvent>,
    session: ComparisonSession,
    design_input: SlotInput,
    code_input: SlotInput,
    status: String,
    notification: Option<String>,
    runtime_disconnected: bool,
}

impl StudioApp {
    fn new(
        style: OverlayStyle,
        viewport_height: f64,
        command_tx: UnboundedSender<StudioCommand>,
        event_rx: UnboundedReceiver<StudioEvent>,
    ) -> Self {
        Self {
            style,
            viewport_height,
            command_tx,
            event_rx,
            session: ComparisonSession::new(),
            design_input: SlotInput::new(),
            code_input: SlotInput::new(),
            status: "Load a design tree and a code tree to begin.".to_owned(),
            notification: None,
            runtime_disconnected: false,
        }
    }

    fn input_mut(&mut self, kind: DatasetKind) -> &mut SlotInput {
        match kind {
            DatasetKind::Design => &mut self.design_input,
            DatasetKind::Code => &mut self.code_input,
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.runtime_disconnected {
                        warn!("studio runtime worker disconnected");
                        self.notification =
                            Some("Runtime worker disconnected. Restart studio to continue.".to_owned());
                    }
                    self.runtime_disconnected = true;
                    self.session.abandon_comparison();
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: StudioEvent) {
        match event {
            StudioEvent::FileLoaded { kind, path, raw } => {
                let slot = self.session.load(kind, raw);
                self.status = format!(
                    "Loaded {kind} tree: {} components",
                    slot.components().len()
                );
                let input = self.input_mut(kind);
                input.loading = false;
                input.loaded_path = Some(path);
            }
            StudioEvent::FileLoadFailed { kind, path, error } => {
                self.input_mut(kind).loading = false;
                warn!(slot = %kind, path = %path.display(), error = %error, "failed to read tree file");
                self.notification = Some(format!(
                    "Failed to read {kind} file `{}`: {error}",
                    path.display()
                ));
            }
            StudioEvent::ComparisonFinished { outcome } => {
                match self.session.finish_comparison(outcome) {
                    Ok(response) => self.status = comparison_summary(response),
                    Err(error) => {
                        self.status = "Comparison failed".to_owned();
                        self.notification = Some(error.user_message());
                    }
                }
            }
        }
    }

    fn request_load(&mut self, kind: DatasetKind) {
        let path = self.input_mut(kind).path_buffer.trim().to_owned();
        if path.is_empty() {
            return;
        }

        self.input_mut(kind).loading = true;
        if let Err(error) = self.command_tx.send(StudioCommand::LoadFile {
            kind,
            path: PathBuf::from(path),
        }) {
            self.input_mut(kind).loading = false;
            self.runtime_disconnected = true;
            self.notification = Some(format!("Failed to submit file load: {error}"));
        }
    }

    fn request_comparison(&mut self) {
        let request = match self.session.begin_comparison() {
            Ok(request) => request,
            Err(error) => {
                self.notification = Some(precondition_message(&error));
                return;
            }
        };

        self.status = "Comparing...".to_owned();
        if let Err(error) = self.command_tx.send(StudioCommand::Compare { request }) {
            self.session.abandon_comparison();
            self.runtime_disconnected = true;
            self.status = "Runtime disconnected".to_owned();
            self.notification = Some(format!("Failed to submit comparison: {error}"));
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Trees");
        for kind in DatasetKind::ALL {
            let can_load = !self.runtime_disconnected;
            ui.label(egui::RichText::new(format!("{kind} tree")).strong());
            let input = self.input_mut(kind);
            let load_clicked = ui
                .horizontal(|ui| {
                    ui.add(
                        egui::TextEdit::singleline(&mut input.path_buffer)
                            .hint_text("path/to/tree.json")
                            .desired_width(220.0),
                    );
                    let enabled =
                        can_load && !input.loading && !input.path_buffer.trim().is_empty();
                    ui.add_enabled(enabled, egui::Button::new("Load")).clicked()
                })
                .inner;
            if load_clicked {
                self.request_load(kind);
            }

            let input = self.input_mut(kind);
            if input.loading {
                ui.label("Reading file...");
            } else if let Some(path) = &input.loaded_path {
                ui.label(format!("Loaded: {}", path.display()));
            }
            ui.add_space(6.0);
        }

        ui.separator();
        let can_compare = self.session.can_compare() && !self.runtime_disconnected;
        if ui
            .add_enabled(can_compare, egui::Button::new("Compare"))
            .clicked()
        {
            self.request_comparison();
        }
        if self.session.comparison_in_flight() {
            ui.label("Comparison running...");
        }
        ui.label(format!("Status: {}", self.status));

        let mut dismiss = false;
        if let Some(notification) = &self.notification {
            ui.colored_label(egui::Color32::from_rgb(173, 33, 33), notification);
            dismiss = ui.button("Dismiss").clicked();
        }
        if dismiss {
            self.notification = None;
        }

        ui.separator();
        self.render_report(ui);
    }

    fn render_report(&self, ui: &mut egui::Ui) {
        ui.heading("Report");
        if let Some(report_id) = self.session.report_id() {
            ui.label(format!("Report id: {report_id}"));
        }

        let blueprints = self.session.blueprints();
        if blueprints.is_empty() {
            ui.label("No blueprints yet.");
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for blueprint in blueprints {
                ui.group(|ui| {
                    for line in blueprint_lines(blueprint) {
                        ui.label(line);
                    }
                });
                ui.add_space(6.0);
            }
        });
    }

    fn render_canvases(&self, ui: &mut egui::Ui) {
        let device_pixel_ratio = f64::from(ui.ctx().pixels_per_point());
        let viewport_height =
            window_viewport_height(ui.ctx().screen_rect().height(), self.viewport_height);
        ui.columns(2, |columns| {
            for (column, kind) in columns.iter_mut().zip(DatasetKind::ALL) {
                let slot = self.session.slot(kind);
                column.heading(format!("{kind}"));
                column.label(match slot.screen() {
                    Some(screen) => format!("{} components, screen {screen}", slot.components().len()),
                    None => format!("{} components", slot.components().len()),
                });

                let constraints = ViewportConstraints {
                    container_width: Some(f64::from(column.available_width())),
                    viewport_height: Some(viewport_height),
                    device_pixel_ratio,
                };
                let batch = self.session.render_slot(kind, &self.style, &constraints);
                let size = egui::vec2(
                    batch.layout.canvas_width_px as f32,
                    batch.layout.canvas_height_px as f32,
                );
                let (response, painter) = column.allocate_painter(size, egui::Sense::hover());
                batch.replay(&mut PainterSurface::new(&painter, response.rect.min));
            }
        });
    }
}

impl Drop for StudioApp {
    fn drop(&mut self) {
        let _ = self.command_tx.send(StudioCommand::Shutdown);
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::SidePanel::left("studio_controls")
            .resizable(true)
            .default_width(CONTROL_PANE_WIDTH)
            .show(ctx, |ui| self.render_controls(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.render_canvases(ui));

        ctx.request_repaint_after(Duration::from_millis(120));
    }
}

/// Current window height in points, or the configured height before the
/// window has a usable size.
fn window_viewport_height(window_height: f32, configured: f64) -> f64 {
    let window_height = f64::from(window_height);
    if window_height.is_finite() && window_height > 0.0 {
        window_height
    } else {
        configured
    }
}

fn precondition_message(error: &SessionError) -> String {
    match error {
        SessionError::MissingDataset { .. } => "Please load both JSON files".to_owned(),
        SessionError::ComparisonInFlight => "A comparison is already running".to_owned(),
    }
}

fn comparison_summary(response: &CompareResponse) -> String {
    let Some(result) = &response.comparison_result else {
        return "Comparison complete".to_owned();
    };
    format!(
        "Comparison complete: {} matches, {} unmatched design, {} unmatched code",
        result.matches.len(),
        result.unmatched_design.len(),
        result.unmatched_code.len()
    )
}

fn blueprint_lines(blueprint: &Blueprint) -> Vec<String> {
    let mut lines = vec![
        format!("Plan {} ({})", blueprint.plan_id, blueprint.confidence),
        format!("Action: {}", blueprint.action_type),
        format!("File: {}", blueprint.display_target_file()),
    ];
    if let Some(parent) = &blueprint.parent_container_path {
        lines.push(format!("Parent: {parent}"));
    }
    if !blueprint.reasoning.is_empty() {
        lines.push(blueprint.reasoning.clone());
    }
    lines.extend(
        blueprint
            .location_hint
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(text) => format!("{key}: {text}"),
                other => format!("{key}: {other}"),
            }),
    );
    lines
}
