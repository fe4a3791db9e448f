//! The simulation engine: single owner of the scenario state.
//!
//! Callers drive it through `apply(Command)` and `tick(Phase)`; every tick
//! replaces whole run state, so each transition is atomic relative to
//! observers. Wall-clock scheduling lives outside the engine: a production
//! driver ticks on a timer, a test harness ticks synchronously.

pub mod evacuation;
pub mod return_home;
pub mod typhoon;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::coverage::trim_coverage;
use crate::geojson::FeatureCollection;
use crate::prelude::{Coordinates, EngineError, EngineResult, Phase, PhaseStatus};
use crate::shelter::{Shelter, ShelterDraft, ShelterId};
use crate::telemetry::{EngineMetrics, MetricsSnapshot};

use evacuation::EvacuationRun;
use return_home::ReturnHomeRun;
use typhoon::TyphoonRun;

/// Which interaction the scenario is currently in. Exactly one mode is
/// active at a time; mode transitions are the only way to change which run
/// is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMode {
    Idle,
    AddShelters,
    ViewShelter,
    Simulating,
    Typhoon,
    ReturningHome,
}

/// Per-run timer flags. A run only advances on `tick` while its flag is
/// set; conflict rules and completion clear flags so no timer leaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTimers {
    pub evacuation: bool,
    pub typhoon: bool,
    pub return_home: bool,
}

/// Every externally triggered state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    StartAddShelter,
    UpdateDraft {
        name: Option<String>,
        coordinates: Option<Coordinates>,
        radius_minutes: Option<f64>,
    },
    AttachDraftCoverage {
        generation: u64,
        coverage: Option<FeatureCollection>,
        error: Option<String>,
    },
    ConfirmDraftShelter,
    DeleteShelter {
        shelter_id: ShelterId,
    },
    ViewShelter {
        shelter_id: ShelterId,
    },
    StartEvacuation,
    StartTyphoon,
    StartReturnHome,
    Reset,
}

/// A serializable copy of the full engine state for external consumers.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub mode: SimulationMode,
    pub draft: Option<ShelterDraft>,
    pub selected_shelter: Option<ShelterId>,
    pub shelters: Vec<Shelter>,
    pub evacuation: EvacuationRun,
    pub typhoon: TyphoonRun,
    pub return_home: ReturnHomeRun,
    pub timers: RunTimers,
}

pub struct SimulationEngine {
    mode: SimulationMode,
    draft: Option<ShelterDraft>,
    selected_shelter: Option<ShelterId>,
    shelters: Vec<Shelter>,
    evacuation: EvacuationRun,
    typhoon: TyphoonRun,
    return_home: ReturnHomeRun,
    timers: RunTimers,
    rng: StdRng,
    palette_index: u32,
    next_shelter_seq: u64,
    next_hazard_seq: u64,
    metrics: EngineMetrics,
}

impl SimulationEngine {
    /// Production construction: unseeded randomness.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Fully reproducible construction for tests and scripted runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            mode: SimulationMode::Idle,
            draft: None,
            selected_shelter: None,
            shelters: Vec::new(),
            evacuation: EvacuationRun::default(),
            typhoon: TyphoonRun::default(),
            return_home: ReturnHomeRun::default(),
            timers: RunTimers::default(),
            rng,
            palette_index: 0,
            next_shelter_seq: 0,
            next_hazard_seq: 0,
            metrics: EngineMetrics::new(),
        }
    }

    /// Applies one command and returns the resulting state.
    pub fn apply(&mut self, command: Command) -> EngineResult<EngineSnapshot> {
        self.metrics.record_command();
        match command {
            Command::StartAddShelter => self.start_add_shelter(),
            Command::UpdateDraft {
                name,
                coordinates,
                radius_minutes,
            } => {
                self.update_draft(name, coordinates, radius_minutes)?;
            }
            Command::AttachDraftCoverage {
                generation,
                coverage,
                error,
            } => {
                let outcome = match coverage {
                    Some(collection) => Ok(collection),
                    None => Err(error.unwrap_or_else(|| "coverage request failed".to_string())),
                };
                self.attach_draft_coverage(generation, outcome);
            }
            Command::ConfirmDraftShelter => {
                self.confirm_draft_shelter()?;
            }
            Command::DeleteShelter { shelter_id } => self.delete_shelter(&shelter_id)?,
            Command::ViewShelter { shelter_id } => self.view_shelter(&shelter_id)?,
            Command::StartEvacuation => self.start_evacuation(),
            Command::StartTyphoon => self.start_typhoon(),
            Command::StartReturnHome => self.start_return_home(),
            Command::Reset => self.reset_scenario(),
        }
        Ok(self.snapshot())
    }

    /// Advances one phase by one tick. Returns false without touching state
    /// when the phase's timer is not live; completion clears the timer.
    pub fn tick(&mut self, phase: Phase) -> bool {
        match phase {
            Phase::Evacuation => {
                if !self.timers.evacuation {
                    return false;
                }
                evacuation::tick(&mut self.evacuation, &self.shelters);
                if self.evacuation.status != PhaseStatus::Running {
                    self.timers.evacuation = false;
                }
            }
            Phase::Typhoon => {
                if !self.timers.typhoon {
                    return false;
                }
                let spawned = typhoon::tick(
                    &mut self.typhoon,
                    &self.shelters,
                    &mut self.rng,
                    &mut self.next_hazard_seq,
                );
                self.metrics.record_hazards_spawned(spawned);
                if self.typhoon.status != PhaseStatus::Running {
                    self.timers.typhoon = false;
                }
            }
            Phase::ReturnHome => {
                if !self.timers.return_home {
                    return false;
                }
                return_home::tick(&mut self.return_home, &self.shelters, &self.typhoon.hazards);
                if self.return_home.status != PhaseStatus::Running {
                    self.timers.return_home = false;
                }
            }
        }
        self.metrics.record_tick();
        true
    }

    /// Resets the three runs and stops every timer. The shelter list and
    /// any draft survive.
    pub fn reset_scenario(&mut self) {
        self.timers = RunTimers::default();
        self.evacuation = EvacuationRun::default();
        self.typhoon = TyphoonRun::default();
        self.return_home = ReturnHomeRun::default();
        self.mode = if self.selected_shelter.is_some() {
            SimulationMode::ViewShelter
        } else {
            SimulationMode::Idle
        };
    }

    pub fn start_add_shelter(&mut self) {
        self.reset_scenario();
        self.palette_index += 1;
        self.draft = Some(ShelterDraft::with_palette_index(self.palette_index));
        self.selected_shelter = None;
        self.mode = SimulationMode::AddShelters;
    }

    /// Patches the draft. Changing placement (coordinates or radius) drops
    /// any attached coverage and supersedes in-flight requests. Returns the
    /// draft's current coverage-request generation.
    pub fn update_draft(
        &mut self,
        name: Option<String>,
        coordinates: Option<Coordinates>,
        radius_minutes: Option<f64>,
    ) -> EngineResult<u64> {
        let draft = self.draft.as_mut().ok_or_else(|| {
            EngineError::NoActiveDraft("update-draft requires the add-shelters mode".to_string())
        })?;

        if let Some(name) = name {
            draft.name = name;
        }
        let placement_changed = coordinates.is_some() || radius_minutes.is_some();
        if let Some(coordinates) = coordinates {
            draft.coordinates = Some(coordinates);
        }
        if let Some(radius_minutes) = radius_minutes {
            draft.radius_minutes = radius_minutes;
        }
        if placement_changed {
            draft.coverage = None;
            draft.coverage_request += 1;
        }
        Ok(draft.coverage_request)
    }

    /// Applies a fetched isochrone result to the draft, unless a newer
    /// request has superseded it. Provider failures degrade to "no coverage
    /// yet". Returns whether the result was applied.
    pub fn attach_draft_coverage(
        &mut self,
        generation: u64,
        outcome: Result<FeatureCollection, String>,
    ) -> bool {
        let Some(draft) = self.draft.as_mut() else {
            debug!("discarding coverage result: no active draft");
            return false;
        };
        if draft.coverage_request != generation {
            debug!(
                "discarding stale coverage result (generation {generation}, current {})",
                draft.coverage_request
            );
            return false;
        }
        match outcome {
            Ok(coverage) => {
                draft.coverage = Some(coverage);
                true
            }
            Err(error) => {
                warn!("coverage request for draft '{}' failed: {error}", draft.name);
                false
            }
        }
    }

    /// Promotes the draft into an accepted shelter. An incomplete draft or
    /// one whose trimmed coverage comes up empty creates nothing and leaves
    /// the draft in place.
    pub fn confirm_draft_shelter(&mut self) -> EngineResult<Option<ShelterId>> {
        let draft = self.draft.as_ref().ok_or_else(|| {
            EngineError::NoActiveDraft("confirm requires an active draft".to_string())
        })?;

        let Some(coordinates) = draft.coordinates else {
            return Ok(None);
        };
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Ok(None);
        }
        let Some(coverage) = draft.coverage.as_ref() else {
            return Ok(None);
        };

        let trimmed = trim_coverage(coverage, &self.shelters);
        if trimmed.is_empty() {
            info!("draft '{name}' rejected: coverage lies entirely inside existing shelters");
            return Ok(None);
        }

        self.next_shelter_seq += 1;
        let id = format!("shelter-{}", self.next_shelter_seq);
        self.shelters.push(Shelter {
            id: id.clone(),
            name,
            coordinates,
            color: draft.color,
            radius_minutes: draft.radius_minutes,
            coverage: trimmed,
        });
        self.draft = None;
        self.selected_shelter = Some(id.clone());
        self.mode = SimulationMode::ViewShelter;
        Ok(Some(id))
    }

    /// Removes a shelter and resets the whole scenario; selection moves to
    /// the first remaining shelter.
    pub fn delete_shelter(&mut self, shelter_id: &str) -> EngineResult<()> {
        let index = self
            .shelters
            .iter()
            .position(|shelter| shelter.id == shelter_id)
            .ok_or_else(|| EngineError::UnknownShelter(shelter_id.to_string()))?;

        self.reset_scenario();
        self.shelters.remove(index);
        if self.selected_shelter.as_deref() == Some(shelter_id) {
            self.selected_shelter = self.shelters.first().map(|shelter| shelter.id.clone());
        }
        self.draft = None;
        self.mode = if self.selected_shelter.is_some() {
            SimulationMode::ViewShelter
        } else {
            SimulationMode::Idle
        };
        Ok(())
    }

    pub fn view_shelter(&mut self, shelter_id: &str) -> EngineResult<()> {
        if !self.shelters.iter().any(|shelter| shelter.id == shelter_id) {
            return Err(EngineError::UnknownShelter(shelter_id.to_string()));
        }
        self.draft = None;
        self.selected_shelter = Some(shelter_id.to_string());
        self.mode = SimulationMode::ViewShelter;
        Ok(())
    }

    /// Starts the evacuation phase. Missing prerequisites mark the run as
    /// errored without touching the other runs; otherwise starting a new
    /// rehearsal resets the whole scenario first.
    pub fn start_evacuation(&mut self) {
        if self.shelters.is_empty() {
            self.evacuation = EvacuationRun::rejected(
                "Add at least one shelter before starting the evacuation phase.",
            );
            self.timers.evacuation = false;
            self.metrics.record_rejected_start();
            return;
        }

        self.reset_scenario();
        let zones = evacuation::build_zones(&mut self.rng, &self.shelters);
        self.evacuation = EvacuationRun::started(zones, &self.shelters);
        self.timers.evacuation = true;
        if self.selected_shelter.is_none() {
            self.selected_shelter = self.shelters.first().map(|shelter| shelter.id.clone());
        }
        self.mode = SimulationMode::Simulating;
        info!(
            "evacuation started: {} zone(s), {} tick(s) to slowest target",
            self.evacuation.zones.len(),
            self.evacuation.total_ticks
        );
    }

    /// Starts the typhoon phase. Stops its own and the return-home timers;
    /// a running evacuation is left untouched.
    pub fn start_typhoon(&mut self) {
        if self.shelters.is_empty() {
            self.typhoon =
                TyphoonRun::rejected("Add shelters before starting the typhoon phase.");
            self.timers.typhoon = false;
            self.metrics.record_rejected_start();
            return;
        }

        self.timers.typhoon = false;
        self.timers.return_home = false;
        self.typhoon = TyphoonRun::started();
        self.timers.typhoon = true;
        if self.selected_shelter.is_none() {
            self.selected_shelter = self.shelters.first().map(|shelter| shelter.id.clone());
        }
        self.mode = SimulationMode::Typhoon;
        info!("typhoon started: {} tick(s)", self.typhoon.total_ticks);
    }

    /// Starts the return-home phase. Requires typhoon readiness and a
    /// non-empty evacuation zone set; stops only its own timer.
    pub fn start_return_home(&mut self) {
        if !self.typhoon.can_return_home {
            self.return_home = ReturnHomeRun::rejected(
                "Return phase is not ready. Wait for the typhoon to end, improve the safety level, and reduce hazards.",
            );
            self.timers.return_home = false;
            self.metrics.record_rejected_start();
            return;
        }
        if self.evacuation.zones.is_empty() {
            self.return_home = ReturnHomeRun::rejected(
                "Run the evacuation phase before starting the return-home phase.",
            );
            self.timers.return_home = false;
            self.metrics.record_rejected_start();
            return;
        }

        self.timers.return_home = false;
        let mut zones = return_home::build_zones(&self.shelters, &self.evacuation.zones);
        return_home::refresh_blocks(&mut zones, &self.shelters, &self.typhoon.hazards);
        self.return_home = ReturnHomeRun::started(zones, &self.shelters);
        self.timers.return_home = true;
        self.mode = SimulationMode::ReturningHome;
        info!(
            "return-home started: {} zone(s)",
            self.return_home.zones.len()
        );
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            mode: self.mode,
            draft: self.draft.clone(),
            selected_shelter: self.selected_shelter.clone(),
            shelters: self.shelters.clone(),
            evacuation: self.evacuation.clone(),
            typhoon: self.typhoon.clone(),
            return_home: self.return_home.clone(),
            timers: self.timers,
        }
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn draft(&self) -> Option<&ShelterDraft> {
        self.draft.as_ref()
    }

    pub fn selected_shelter(&self) -> Option<&ShelterId> {
        self.selected_shelter.as_ref()
    }

    pub fn shelters(&self) -> &[Shelter] {
        &self.shelters
    }

    pub fn evacuation_run(&self) -> &EvacuationRun {
        &self.evacuation
    }

    pub fn typhoon_run(&self) -> &TyphoonRun {
        &self.typhoon
    }

    pub fn return_home_run(&self) -> &ReturnHomeRun {
        &self.return_home
    }

    pub fn timers(&self) -> RunTimers {
        self.timers
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}
