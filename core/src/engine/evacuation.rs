//! Evacuation phase: every shelter gets a zone of simulated households that
//! fills toward a randomly drawn compliance target.

use rand::Rng;
use serde::Serialize;

use crate::geojson::FeatureCollection;
use crate::prelude::PhaseStatus;
use crate::progress::build_regional_progress;
use crate::shelter::{Shelter, ShelterId};

/// Fill gained per tick by an unsaturated zone.
pub const EVACUATION_PROGRESS_STEP: f64 = 0.01;
/// The run is forcibly completed after this many ticks.
pub const EVACUATION_MAX_TICKS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceStatus {
    LowCompliance,
    ModerateCompliance,
    HighCompliance,
}

pub fn compliance_status(rate: f64) -> ComplianceStatus {
    if rate < 0.5 {
        ComplianceStatus::LowCompliance
    } else if rate < 0.75 {
        ComplianceStatus::ModerateCompliance
    } else {
        ComplianceStatus::HighCompliance
    }
}

/// Per-shelter evacuation progress. `fill_progress` is monotone and capped
/// at `target_progress`, which itself never exceeds 1.
#[derive(Debug, Clone, Serialize)]
pub struct EvacuationZoneProgress {
    pub shelter_id: ShelterId,
    pub shelter_name: String,
    pub total_households: u32,
    pub evacuated_households: u32,
    pub compliance_rate: f64,
    pub target_progress: f64,
    pub fill_progress: f64,
    pub status: ComplianceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvacuationRun {
    pub status: PhaseStatus,
    pub error: Option<String>,
    pub elapsed_ticks: u32,
    pub total_ticks: u32,
    pub zones: Vec<EvacuationZoneProgress>,
    pub regional_progress: FeatureCollection,
}

impl Default for EvacuationRun {
    fn default() -> Self {
        Self {
            status: PhaseStatus::Idle,
            error: None,
            elapsed_ticks: 0,
            total_ticks: 0,
            zones: Vec::new(),
            regional_progress: FeatureCollection::empty(),
        }
    }
}

impl EvacuationRun {
    pub(crate) fn rejected(message: &str) -> Self {
        Self {
            status: PhaseStatus::Error,
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn started(zones: Vec<EvacuationZoneProgress>, shelters: &[Shelter]) -> Self {
        let slowest_target = zones
            .iter()
            .map(|zone| zone.target_progress)
            .fold(0.0_f64, f64::max);
        Self {
            status: PhaseStatus::Running,
            error: None,
            elapsed_ticks: 0,
            total_ticks: (slowest_target * 100.0).ceil().max(1.0) as u32,
            regional_progress: build_regional_progress(shelters, &zones),
            zones,
        }
    }
}

/// Draws each zone's household count and compliance target at phase start.
pub(crate) fn build_zones<R: Rng>(rng: &mut R, shelters: &[Shelter]) -> Vec<EvacuationZoneProgress> {
    shelters
        .iter()
        .map(|shelter| {
            let base_households = 180.0 + shelter.radius_minutes * 28.0;
            let extra_households = (rng.gen::<f64>() * 220.0).floor();
            let total_households = (base_households + extra_households).round().max(80.0) as u32;
            let compliance_rate = round2(0.35 + rng.gen::<f64>() * 0.6);

            EvacuationZoneProgress {
                shelter_id: shelter.id.clone(),
                shelter_name: shelter.name.clone(),
                total_households,
                evacuated_households: 0,
                compliance_rate,
                target_progress: compliance_rate,
                fill_progress: 0.0,
                status: compliance_status(compliance_rate),
            }
        })
        .collect()
}

/// One tick of fill for a running evacuation.
pub(crate) fn tick(run: &mut EvacuationRun, shelters: &[Shelter]) {
    run.elapsed_ticks += 1;
    for zone in &mut run.zones {
        zone.fill_progress = (zone.fill_progress + EVACUATION_PROGRESS_STEP).min(zone.target_progress);
        zone.evacuated_households =
            (zone.total_households as f64 * zone.fill_progress).round() as u32;
        zone.status = compliance_status(zone.compliance_rate);
    }
    run.regional_progress = build_regional_progress(shelters, &run.zones);

    let all_reached_target = run
        .zones
        .iter()
        .all(|zone| zone.fill_progress >= zone.target_progress);
    if all_reached_target || run.elapsed_ticks >= EVACUATION_MAX_TICKS {
        run.status = PhaseStatus::Completed;
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::FeatureCollection;
    use rand::{rngs::StdRng, SeedableRng};

    fn shelter(id: &str, radius_minutes: f64) -> Shelter {
        Shelter {
            id: id.to_string(),
            name: id.to_string(),
            coordinates: [121.0, 13.0],
            color: [1, 2, 3],
            radius_minutes,
            coverage: FeatureCollection::empty(),
        }
    }

    #[test]
    fn compliance_status_bands() {
        assert_eq!(compliance_status(0.35), ComplianceStatus::LowCompliance);
        assert_eq!(compliance_status(0.49), ComplianceStatus::LowCompliance);
        assert_eq!(compliance_status(0.5), ComplianceStatus::ModerateCompliance);
        assert_eq!(compliance_status(0.74), ComplianceStatus::ModerateCompliance);
        assert_eq!(compliance_status(0.75), ComplianceStatus::HighCompliance);
        assert_eq!(compliance_status(0.95), ComplianceStatus::HighCompliance);
    }

    #[test]
    fn zones_draw_bounded_targets_and_household_counts() {
        let mut rng = StdRng::seed_from_u64(5);
        let shelters = vec![shelter("shelter-1", 10.0), shelter("shelter-2", 25.0)];
        for _ in 0..50 {
            for zone in build_zones(&mut rng, &shelters) {
                assert!(zone.compliance_rate >= 0.35 && zone.compliance_rate <= 0.95);
                assert_eq!(zone.target_progress, zone.compliance_rate);
                assert!(zone.total_households >= 80);
                assert_eq!(zone.fill_progress, 0.0);
                assert_eq!(zone.evacuated_households, 0);
            }
        }
    }

    #[test]
    fn fill_progress_is_monotone_and_capped_at_target() {
        let mut rng = StdRng::seed_from_u64(9);
        let shelters = vec![shelter("shelter-1", 10.0)];
        let zones = build_zones(&mut rng, &shelters);
        let mut run = EvacuationRun::started(zones, &shelters);

        let mut previous = 0.0;
        for _ in 0..EVACUATION_MAX_TICKS {
            tick(&mut run, &shelters);
            let zone = &run.zones[0];
            assert!(zone.fill_progress >= previous);
            assert!(zone.fill_progress <= zone.target_progress);
            assert!(zone.target_progress <= 1.0);
            previous = zone.fill_progress;
            if run.status == PhaseStatus::Completed {
                break;
            }
        }
        assert_eq!(run.status, PhaseStatus::Completed);
        assert_eq!(run.zones[0].fill_progress, run.zones[0].target_progress);
    }

    #[test]
    fn total_ticks_follows_the_slowest_zone() {
        let shelters = vec![shelter("shelter-1", 10.0)];
        let zones = vec![
            EvacuationZoneProgress {
                shelter_id: "shelter-1".to_string(),
                shelter_name: "Shelter 1".to_string(),
                total_households: 100,
                evacuated_households: 0,
                compliance_rate: 0.42,
                target_progress: 0.42,
                fill_progress: 0.0,
                status: compliance_status(0.42),
            },
            EvacuationZoneProgress {
                shelter_id: "shelter-2".to_string(),
                shelter_name: "Shelter 2".to_string(),
                total_households: 100,
                evacuated_households: 0,
                compliance_rate: 0.87,
                target_progress: 0.87,
                fill_progress: 0.0,
                status: compliance_status(0.87),
            },
        ];
        let run = EvacuationRun::started(zones, &shelters);
        assert_eq!(run.total_ticks, 87);
    }

    #[test]
    fn run_completes_when_every_zone_reaches_its_target() {
        let shelters = vec![shelter("shelter-1", 10.0)];
        let zones = vec![EvacuationZoneProgress {
            shelter_id: "shelter-1".to_string(),
            shelter_name: "Shelter 1".to_string(),
            total_households: 200,
            evacuated_households: 0,
            compliance_rate: 0.05,
            target_progress: 0.05,
            fill_progress: 0.0,
            status: compliance_status(0.05),
        }];
        let mut run = EvacuationRun::started(zones, &shelters);

        for _ in 0..4 {
            tick(&mut run, &shelters);
        }
        assert_eq!(run.status, PhaseStatus::Running);
        tick(&mut run, &shelters);
        assert_eq!(run.status, PhaseStatus::Completed);
        assert_eq!(run.zones[0].evacuated_households, 10);
    }
}
