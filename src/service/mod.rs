//! Wire model of the remote comparison service.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::tree::{BoundingBox, Component, DEFAULT_COMPONENT_TYPE, ScreenSize};

pub mod client;

pub use self::client::{ComparisonClient, ComparisonClientError};

pub const COMPARE_PATH: &str = "/api/compare";
pub const HEALTH_PATH: &str = "/health";
pub const UNKNOWN_TARGET_FILE: &str = "unknown file";

/// Both uploaded trees, sent as the raw text that was read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub design_json: String,
    pub code_json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompareResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub comparison_result: Option<ComparisonResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_blueprints: Vec<Blueprint>,
    #[serde(default)]
    pub diagnostic_report: Option<DiagnosticReport>,
    #[serde(default, deserialize_with = "lenient_screen")]
    pub screen: Option<ScreenSize>,
    #[serde(default)]
    pub metrics: Option<ComparisonMetrics>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ai_suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompareResponse {
    pub fn report_id(&self) -> Option<&str> {
        self.diagnostic_report
            .as_ref()
            .map(|report| report.report_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub matches: Vec<ComponentMatch>,
    #[serde(default, deserialize_with = "unmatched_set")]
    pub unmatched_design: Vec<Component>,
    #[serde(default, deserialize_with = "unmatched_set")]
    pub unmatched_code: Vec<Component>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_design_components: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_code_components: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_components: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmatched_design_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmatched_code_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawComponentMatch")]
pub struct ComponentMatch {
    pub design_component: Option<Component>,
    pub code_component: Option<Component>,
    pub iou: f64,
}

#[derive(Deserialize)]
struct RawComponentMatch {
    #[serde(default)]
    design_component: Value,
    #[serde(default)]
    code_component: Value,
    #[serde(default)]
    iou: Option<f64>,
}

impl From<RawComponentMatch> for ComponentMatch {
    fn from(raw: RawComponentMatch) -> Self {
        Self {
            design_component: normalize_component(&raw.design_component, 0),
            code_component: normalize_component(&raw.code_component, 0),
            iou: raw.iou.unwrap_or(0.0),
        }
    }
}

/// Aggregate scores. Rates are percentages in `0..=100`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    #[serde(default)]
    pub difference_count: Option<u64>,
    #[serde(default)]
    pub match_rate: Option<f64>,
    #[serde(default)]
    pub total_components: Option<u64>,
    #[serde(default)]
    pub completeness: Option<f64>,
}

/// Remediation plan produced by the service. Shown as received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    #[serde(default, deserialize_with = "lenient_text")]
    pub plan_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub target_file: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub confidence: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub action_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location_hint: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_container_path: Option<String>,
}

impl Blueprint {
    pub fn display_target_file(&self) -> &str {
        if self.target_file.trim().is_empty() {
            UNKNOWN_TARGET_FILE
        } else {
            &self.target_file
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    #[serde(default, deserialize_with = "lenient_text")]
    pub report_id: String,
    #[serde(default)]
    pub global_calibration: Option<GlobalCalibration>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<DiagnosticIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalCalibration {
    #[serde(default)]
    pub y_offset_px: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub severity: String,
    #[serde(default)]
    pub node_id: Option<Value>,
    #[serde(default)]
    pub widget_role: Option<String>,
    #[serde(default)]
    pub delta_px: Option<f64>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
}

/// Converts one unmatched entry into a renderable component. Entries may be
/// plain components (`bounding_box`) or semantic-graph elements
/// (`geometry.abs` corner pairs). `index` is the fallback identifier.
pub fn normalize_component(value: &Value, index: usize) -> Option<Component> {
    let object = value.as_object()?;

    if let Some(bounding_box) = object.get("bounding_box").and_then(box_from_fields) {
        return Some(Component {
            id: object
                .get("id")
                .and_then(scalar_text)
                .unwrap_or_else(|| index.to_string()),
            kind: object
                .get("type")
                .and_then(scalar_text)
                .unwrap_or_else(|| DEFAULT_COMPONENT_TYPE.to_owned()),
            bounding_box,
            confidence: object.get("confidence").and_then(Value::as_f64),
            text: object.get("text").and_then(scalar_text),
        });
    }

    let bounding_box = object
        .get("geometry")
        .and_then(|geometry| geometry.get("abs"))
        .and_then(box_from_corners)?;
    let semantic_type = object.get("type");
    Some(Component {
        id: object
            .get("id")
            .and_then(scalar_text)
            .unwrap_or_else(|| index.to_string()),
        kind: semantic_type
            .and_then(|kind| kind.get("label").or(Some(kind)))
            .and_then(scalar_text)
            .unwrap_or_else(|| DEFAULT_COMPONENT_TYPE.to_owned()),
        bounding_box,
        confidence: semantic_type
            .and_then(|kind| kind.get("conf"))
            .and_then(Value::as_f64),
        text: object
            .get("content")
            .and_then(|content| content.get("text"))
            .and_then(scalar_text),
    })
}

pub fn normalize_unmatched(entries: &[Value]) -> Vec<Component> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match normalize_component(entry, index) {
            Some(component) if component.bounding_box.has_area() => Some(component),
            Some(component) => {
                debug!(id = %component.id, "dropping zero-area unmatched entry");
                None
            }
            None => {
                debug!(index, "dropping unmatched entry without usable geometry");
                None
            }
        })
        .collect()
}

fn box_from_fields(value: &Value) -> Option<BoundingBox> {
    Some(BoundingBox {
        x: integer(value.get("x")?)?,
        y: integer(value.get("y")?)?,
        width: integer(value.get("width")?)?.max(0),
        height: integer(value.get("height")?)?.max(0),
    })
}

fn box_from_corners(value: &Value) -> Option<BoundingBox> {
    let corners = value.as_array()?;
    if corners.len() < 4 {
        return None;
    }
    Some(BoundingBox::from_corners(
        integer(&corners[0])?,
        integer(&corners[1])?,
        integer(&corners[2])?,
        integer(&corners[3])?,
    ))
}

fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|number| number.is_finite())
            .map(|number| number.round() as i64)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

fn lenient_screen<'de, D>(deserializer: D) -> Result<Option<ScreenSize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let dimension = |field: &str| {
        integer(value.get(field)?).map(|number| u32::try_from(number.max(0)).unwrap_or(u32::MAX))
    };
    Ok(dimension("width")
        .zip(dimension("height"))
        .map(|(width, height)| ScreenSize { width, height }))
}

fn unmatched_set<'de, D>(deserializer: D) -> Result<Vec<Component>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Vec<Value> = null_as_default(deserializer)?;
    Ok(normalize_unmatched(&entries))
}
