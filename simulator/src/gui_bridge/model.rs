use evaccore::engine::{EngineSnapshot, RunTimers, SimulationMode};
use evaccore::prelude::PhaseStatus;
use serde::Serialize;

/// Headline view of the scenario served beside the full snapshot, for
/// front-ends that only need the dashboard numbers.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub mode: SimulationMode,
    pub shelter_count: usize,
    pub evacuation_status: PhaseStatus,
    pub typhoon_status: PhaseStatus,
    pub return_home_status: PhaseStatus,
    pub safety_level: u8,
    pub live_hazards: usize,
    pub can_return_home: bool,
    pub timers: RunTimers,
}

impl StatusView {
    pub fn from_snapshot(snapshot: &EngineSnapshot) -> Self {
        Self {
            mode: snapshot.mode,
            shelter_count: snapshot.shelters.len(),
            evacuation_status: snapshot.evacuation.status,
            typhoon_status: snapshot.typhoon.status,
            return_home_status: snapshot.return_home.status,
            safety_level: snapshot.typhoon.safety_level,
            live_hazards: snapshot.typhoon.total_hazards,
            can_return_home: snapshot.typhoon.can_return_home,
            timers: snapshot.timers,
        }
    }
}
