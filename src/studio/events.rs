use std::path::PathBuf;

use crate::service::{CompareRequest, CompareResponse, ComparisonClientError};
use crate::session::DatasetKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioCommand {
    LoadFile { kind: DatasetKind, path: PathBuf },
    Compare { request: CompareRequest },
    Shutdown,
}

#[derive(Debug)]
pub enum StudioEvent {
    FileLoaded {
        kind: DatasetKind,
        path: PathBuf,
        raw: String,
    },
    FileLoadFailed {
        kind: DatasetKind,
        path: PathBuf,
        error: String,
    },
    ComparisonFinished {
        outcome: Result<CompareResponse, ComparisonClientError>,
    },
}
