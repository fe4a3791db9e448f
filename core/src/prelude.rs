use serde::{Deserialize, Serialize};

/// `[longitude, latitude]` pair in the GeoJSON axis order.
pub type Coordinates = [f64; 2];

/// Lifecycle shared by the three phase runs. `Completed` and `Error` are
/// terminal until an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Idle,
    Running,
    Completed,
    Error,
}

impl PhaseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseStatus::Completed | PhaseStatus::Error)
    }
}

/// The three simulated phases advanced by the tick scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Evacuation,
    Typhoon,
    ReturnHome,
}

/// Common error type for engine commands. Every variant indicates a caller
/// bug; runtime conditions such as missing prerequisites surface through a
/// run's `status`/`error` fields instead.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("no active shelter draft: {0}")]
    NoActiveDraft(String),
    #[error("unknown shelter: {0}")]
    UnknownShelter(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
