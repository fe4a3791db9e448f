//! Typhoon phase: a fixed-length storm window spawns and decays hazards
//! while the aggregate safety score decides return-home readiness.

use log::debug;
use rand::Rng;
use serde::Serialize;

use crate::geojson::FeatureCollection;
use crate::hazard::{
    can_return_home, decay_hazards, enforce_cap, safety_level, spawn_hazards, Hazard,
};
use crate::prelude::PhaseStatus;
use crate::progress::{build_debris_points, build_flooded_area};
use crate::shelter::Shelter;

/// The run completes at this tick.
pub const TYPHOON_TOTAL_TICKS: u32 = 90;
/// The storm spawns hazards and penalizes safety through this tick.
pub const STORM_ACTIVE_TICKS: u32 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct TyphoonRun {
    pub status: PhaseStatus,
    pub error: Option<String>,
    pub elapsed_ticks: u32,
    pub total_ticks: u32,
    pub storm_active: bool,
    pub hazards: Vec<Hazard>,
    pub total_hazards: usize,
    pub safety_level: u8,
    pub can_return_home: bool,
    pub flooded_area: FeatureCollection,
    pub debris: FeatureCollection,
}

impl Default for TyphoonRun {
    fn default() -> Self {
        Self {
            status: PhaseStatus::Idle,
            error: None,
            elapsed_ticks: 0,
            total_ticks: 0,
            storm_active: false,
            hazards: Vec::new(),
            total_hazards: 0,
            safety_level: 100,
            can_return_home: false,
            flooded_area: FeatureCollection::empty(),
            debris: FeatureCollection::empty(),
        }
    }
}

impl TyphoonRun {
    pub(crate) fn rejected(message: &str) -> Self {
        Self {
            status: PhaseStatus::Error,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn started() -> Self {
        Self {
            status: PhaseStatus::Running,
            storm_active: true,
            total_ticks: TYPHOON_TOTAL_TICKS,
            ..Self::default()
        }
    }
}

/// One storm tick: decay, spawn while the storm is active, cap, then derive
/// the renderable collections, safety score, and readiness. Returns the
/// number of hazards spawned this tick.
pub(crate) fn tick<R: Rng>(
    run: &mut TyphoonRun,
    shelters: &[Shelter],
    rng: &mut R,
    next_hazard_seq: &mut u64,
) -> usize {
    run.elapsed_ticks += 1;
    run.storm_active = run.elapsed_ticks <= STORM_ACTIVE_TICKS;

    decay_hazards(&mut run.hazards);

    let mut spawned = 0;
    if run.storm_active {
        let fresh = spawn_hazards(rng, shelters, next_hazard_seq);
        spawned = fresh.len();
        if spawned > 0 {
            debug!(
                "tick {}: spawned {} hazard(s), {} live",
                run.elapsed_ticks,
                spawned,
                run.hazards.len() + spawned
            );
        }
        run.hazards.extend(fresh);
    }
    enforce_cap(&mut run.hazards);

    run.flooded_area = build_flooded_area(&run.hazards);
    run.debris = build_debris_points(&run.hazards);
    run.safety_level = safety_level(&run.hazards, run.storm_active);
    run.total_hazards = run.hazards.len();

    if run.elapsed_ticks >= TYPHOON_TOTAL_TICKS {
        run.status = PhaseStatus::Completed;
    }
    run.can_return_home = can_return_home(run.status, run.safety_level, run.total_hazards);

    spawned
}
