//! Per-dataset slots and the comparison lifecycle shared by the CLI and the
//! studio viewer.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::overlay::{
    OverlayDrawBatch, OverlayRenderInput, OverlayRenderer, OverlayStyle, ViewportConstraints,
    compute_layout,
};
use crate::service::{Blueprint, CompareRequest, CompareResponse, ComparisonClientError};
use crate::tree::{Component, ScreenSize, extract_components, parse_tree, resolve_screen_size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Design,
    Code,
}

impl DatasetKind {
    pub const ALL: [Self; 2] = [Self::Design, Self::Code];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Code => "code",
        }
    }
}

impl Display for DatasetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Empty -> Loaded -> Extracted`. A new load always passes through `Loaded`
/// again; extraction has no failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Empty,
    Loaded,
    Extracted,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("both design and code trees must be loaded before comparing (missing: {missing})")]
    MissingDataset { missing: String },

    #[error("a comparison is already in flight")]
    ComparisonInFlight,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSlot {
    raw: Option<String>,
    components: Vec<Component>,
    screen: Option<ScreenSize>,
    unmatched: Option<Vec<Component>>,
    state: SlotState,
    generation: u64,
}

impl DatasetSlot {
    /// Replaces everything derived from a previous load, then extracts.
    pub fn load(&mut self, raw: String) {
        *self = Self {
            raw: Some(raw),
            state: SlotState::Loaded,
            generation: self.generation + 1,
            ..Self::default()
        };
        self.extract();
    }

    fn extract(&mut self) {
        let tree = self.raw.as_deref().and_then(parse_tree);
        if let Some(tree) = &tree {
            self.components = extract_components(tree);
            self.screen = resolve_screen_size(tree);
        }
        self.state = SlotState::Extracted;
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Blank files count as not loaded.
    pub fn has_data(&self) -> bool {
        self.raw.as_deref().is_some_and(|raw| !raw.is_empty())
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn screen(&self) -> Option<ScreenSize> {
        self.screen
    }

    pub fn unmatched(&self) -> Option<&[Component]> {
        self.unmatched.as_deref()
    }

    /// Number of loads so far. Identifies which tree a response describes.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Slot generations captured when a request was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingComparison {
    design_generation: u64,
    code_generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonSession {
    design: DatasetSlot,
    code: DatasetSlot,
    pending: Option<PendingComparison>,
    last_response: Option<CompareResponse>,
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: DatasetKind) -> &DatasetSlot {
        match kind {
            DatasetKind::Design => &self.design,
            DatasetKind::Code => &self.code,
        }
    }

    fn slot_mut(&mut self, kind: DatasetKind) -> &mut DatasetSlot {
        match kind {
            DatasetKind::Design => &mut self.design,
            DatasetKind::Code => &mut self.code,
        }
    }

    pub fn load(&mut self, kind: DatasetKind, raw: String) -> &DatasetSlot {
        let slot = self.slot_mut(kind);
        slot.load(raw);
        info!(
            slot = %kind,
            components = slot.components().len(),
            screen = %slot.screen().map(|screen| screen.to_string()).unwrap_or_else(|| "-".to_owned()),
            "dataset loaded"
        );
        self.slot(kind)
    }

    pub fn comparison_in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_compare(&self) -> bool {
        !self.comparison_in_flight() && self.design.has_data() && self.code.has_data()
    }

    /// Checks preconditions and marks the comparison as in flight before any
    /// request exists, so a second trigger is rejected.
    pub fn begin_comparison(&mut self) -> Result<CompareRequest, SessionError> {
        if self.comparison_in_flight() {
            return Err(SessionError::ComparisonInFlight);
        }

        let missing = DatasetKind::ALL
            .into_iter()
            .filter(|kind| !self.slot(*kind).has_data())
            .map(DatasetKind::as_str)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(SessionError::MissingDataset {
                missing: missing.join(", "),
            });
        }

        let (Some(design_json), Some(code_json)) = (self.design.raw(), self.code.raw()) else {
            return Err(SessionError::MissingDataset {
                missing: "design, code".to_owned(),
            });
        };
        let request = CompareRequest {
            design_json: design_json.to_owned(),
            code_json: code_json.to_owned(),
        };
        self.pending = Some(PendingComparison {
            design_generation: self.design.generation,
            code_generation: self.code.generation,
        });
        debug!("comparison marked in flight");
        Ok(request)
    }

    /// Clears the in-flight flag on every outcome. Failed or unsuccessful
    /// responses leave both slots untouched. A slot reloaded while the
    /// request was running keeps its fresh extraction.
    pub fn finish_comparison(
        &mut self,
        outcome: Result<CompareResponse, ComparisonClientError>,
    ) -> Result<&CompareResponse, ComparisonClientError> {
        let pending = self.pending.take();

        let response = match outcome {
            Ok(response) if response.success => response,
            Ok(response) => {
                let message = response
                    .error
                    .unwrap_or_else(|| "service reported failure without details".to_owned());
                warn!(error = %message, "comparison rejected by service");
                return Err(ComparisonClientError::Rejected { message });
            }
            Err(error) => {
                warn!(error = %error, "comparison failed");
                return Err(error);
            }
        };

        let design_current =
            pending.is_none_or(|pending| pending.design_generation == self.design.generation);
        let code_current =
            pending.is_none_or(|pending| pending.code_generation == self.code.generation);
        for (kind, current) in [
            (DatasetKind::Design, design_current),
            (DatasetKind::Code, code_current),
        ] {
            if !current {
                info!(slot = %kind, "slot reloaded during comparison; keeping its new tree");
            }
        }

        if let Some(screen) = response.screen {
            if design_current {
                self.design.screen = Some(screen);
            }
            if code_current {
                self.code.screen = Some(screen);
            }
        }
        if let Some(result) = &response.comparison_result {
            if design_current {
                self.design.unmatched = Some(result.unmatched_design.clone());
            }
            if code_current {
                self.code.unmatched = Some(result.unmatched_code.clone());
            }
        }
        info!(
            matches = response
                .comparison_result
                .as_ref()
                .map_or(0, |result| result.matches.len()),
            blueprints = response.ai_blueprints.len(),
            "comparison applied"
        );

        Ok(self.last_response.insert(response))
    }

    /// Drops the in-flight flag when the request could not be handed off.
    pub fn abandon_comparison(&mut self) {
        if self.pending.take().is_some() {
            warn!("comparison abandoned before a response arrived");
        }
    }

    pub fn last_response(&self) -> Option<&CompareResponse> {
        self.last_response.as_ref()
    }

    pub fn blueprints(&self) -> &[Blueprint] {
        self.last_response
            .as_ref()
            .map(|response| response.ai_blueprints.as_slice())
            .unwrap_or_default()
    }

    pub fn report_id(&self) -> Option<&str> {
        self.last_response.as_ref().and_then(CompareResponse::report_id)
    }

    /// Draw batch for one slot at the given viewport.
    pub fn render_slot(
        &self,
        kind: DatasetKind,
        style: &OverlayStyle,
        constraints: &ViewportConstraints,
    ) -> OverlayDrawBatch {
        let slot = self.slot(kind);
        let layout = compute_layout(slot.screen(), constraints);
        let (primary_color, unmatched_color) = match kind {
            DatasetKind::Design => (style.design_color, style.unmatched_design_color),
            DatasetKind::Code => (style.code_color, style.unmatched_code_color),
        };

        OverlayRenderer::render(OverlayRenderInput {
            layout: &layout,
            style,
            components: slot.components(),
            unmatched: slot.unmatched(),
            primary_color,
            unmatched_color,
        })
    }
}
