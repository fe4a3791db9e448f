//! Return-home phase: households leave their shelter for a home anchor, but
//! only along routes verified clear of live hazards.

use serde::Serialize;

use crate::engine::evacuation::EvacuationZoneProgress;
use crate::geojson::FeatureCollection;
use crate::geometry::{distance_between, interpolate_line, representative_point};
use crate::hazard::{Hazard, DEBRIS_BLOCK_RADIUS_MULTIPLIER, FALLBACK_CENTER};
use crate::prelude::{Coordinates, PhaseStatus};
use crate::progress::build_return_progress;
use crate::shelter::{Shelter, ShelterId};

/// Progress gained per tick by an unblocked zone.
pub const RETURN_PROGRESS_STEP: f64 = 0.015;
/// The run is forcibly completed after this many ticks.
pub const RETURN_MAX_TICKS: u32 = 150;
/// Segments sampled along the shelter-to-anchor line when probing hazards;
/// yields `segments + 1` probe points.
pub const ROUTE_SAMPLE_SEGMENTS: usize = 28;

/// Obstacle category blocking a zone's route this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    Clear,
    FloodedArea,
    DebrisOnRoute,
}

/// Per-shelter return progress. `households_at_shelter` is always derived
/// as `total_households - households_returned`.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnHomeZoneProgress {
    pub shelter_id: ShelterId,
    pub shelter_name: String,
    pub total_households: u32,
    pub households_at_shelter: u32,
    pub households_returned: u32,
    pub return_progress: f64,
    pub home_anchor: Coordinates,
    pub blocked_reason: BlockReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReturnHomeRun {
    pub status: PhaseStatus,
    pub error: Option<String>,
    pub elapsed_ticks: u32,
    pub total_ticks: u32,
    pub zones: Vec<ReturnHomeZoneProgress>,
    pub return_progress: FeatureCollection,
}

impl Default for ReturnHomeRun {
    fn default() -> Self {
        Self {
            status: PhaseStatus::Idle,
            error: None,
            elapsed_ticks: 0,
            total_ticks: 0,
            zones: Vec::new(),
            return_progress: FeatureCollection::empty(),
        }
    }
}

impl ReturnHomeRun {
    pub(crate) fn rejected(message: &str) -> Self {
        Self {
            status: PhaseStatus::Error,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn started(zones: Vec<ReturnHomeZoneProgress>, shelters: &[Shelter]) -> Self {
        Self {
            status: PhaseStatus::Running,
            error: None,
            elapsed_ticks: 0,
            total_ticks: RETURN_MAX_TICKS,
            return_progress: build_return_progress(shelters, &zones),
            zones,
        }
    }
}

/// Samples the straight shelter-to-anchor line against every live hazard.
/// Floods block at their radius, debris at 1.1x its radius; floods win when
/// both kinds intersect the route.
pub fn detect_block_reason(
    shelter_position: Coordinates,
    home_anchor: Coordinates,
    hazards: &[Hazard],
) -> BlockReason {
    let route = interpolate_line(shelter_position, home_anchor, ROUTE_SAMPLE_SEGMENTS);

    let flood_blocked = route.iter().any(|point| {
        hazards
            .iter()
            .filter(|hazard| hazard.is_flood())
            .any(|hazard| distance_between(*point, hazard.center) <= hazard.size_degrees)
    });
    if flood_blocked {
        return BlockReason::FloodedArea;
    }

    let debris_blocked = route.iter().any(|point| {
        hazards
            .iter()
            .filter(|hazard| !hazard.is_flood())
            .any(|hazard| {
                distance_between(*point, hazard.center)
                    <= hazard.size_degrees * DEBRIS_BLOCK_RADIUS_MULTIPLIER
            })
    });
    if debris_blocked {
        return BlockReason::DebrisOnRoute;
    }

    BlockReason::Clear
}

/// Builds one return zone per evacuation zone. The zone total is the count
/// of households that actually evacuated; the anchor is the coverage
/// centroid, the shelter's own position when no polygon exists, or the
/// fallback center when the shelter itself is gone.
pub(crate) fn build_zones(
    shelters: &[Shelter],
    evacuation_zones: &[EvacuationZoneProgress],
) -> Vec<ReturnHomeZoneProgress> {
    evacuation_zones
        .iter()
        .map(|zone| {
            let shelter = shelters.iter().find(|item| item.id == zone.shelter_id);
            let (home_anchor, blocked_reason) = match shelter {
                Some(shelter) => (
                    representative_point(&shelter.coverage, shelter.coordinates),
                    BlockReason::Clear,
                ),
                None => (FALLBACK_CENTER, BlockReason::DebrisOnRoute),
            };

            ReturnHomeZoneProgress {
                shelter_id: zone.shelter_id.clone(),
                shelter_name: zone.shelter_name.clone(),
                total_households: zone.evacuated_households,
                households_at_shelter: zone.evacuated_households,
                households_returned: 0,
                return_progress: 0.0,
                home_anchor,
                blocked_reason,
            }
        })
        .collect()
}

/// Initial block-detection pass over freshly built zones.
pub(crate) fn refresh_blocks(
    zones: &mut [ReturnHomeZoneProgress],
    shelters: &[Shelter],
    hazards: &[Hazard],
) {
    for zone in zones {
        zone.blocked_reason = match shelters.iter().find(|item| item.id == zone.shelter_id) {
            Some(shelter) => detect_block_reason(shelter.coordinates, zone.home_anchor, hazards),
            None => BlockReason::DebrisOnRoute,
        };
    }
}

/// One tick of the return phase. Progress advances only on zones whose
/// route is clear this tick.
pub(crate) fn tick(run: &mut ReturnHomeRun, shelters: &[Shelter], hazards: &[Hazard]) {
    run.elapsed_ticks += 1;
    for zone in &mut run.zones {
        let Some(shelter) = shelters.iter().find(|item| item.id == zone.shelter_id) else {
            zone.blocked_reason = BlockReason::DebrisOnRoute;
            continue;
        };

        zone.blocked_reason = detect_block_reason(shelter.coordinates, zone.home_anchor, hazards);
        if zone.blocked_reason != BlockReason::Clear {
            continue;
        }

        zone.return_progress = (zone.return_progress + RETURN_PROGRESS_STEP).min(1.0);
        zone.households_returned =
            (zone.total_households as f64 * zone.return_progress).round() as u32;
        zone.households_at_shelter = zone.total_households - zone.households_returned;
    }
    run.return_progress = build_return_progress(shelters, &run.zones);

    let all_returned = run.zones.iter().all(|zone| zone.return_progress >= 1.0);
    if all_returned || run.elapsed_ticks >= RETURN_MAX_TICKS {
        run.status = PhaseStatus::Completed;
    }
}
