//! Typhoon hazard generation and decay, and the aggregate safety scoring
//! that gates the return-home phase.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::prelude::{Coordinates, PhaseStatus};
use crate::shelter::Shelter;

/// Live hazards are capped; the oldest are dropped first.
pub const HAZARD_CAP: usize = 18;
/// Sides used when a flood footprint is rendered as a polygon.
pub const HAZARD_CIRCLE_SIDES: usize = 28;
/// A debris field blocks routes out to this multiple of its radius.
pub const DEBRIS_BLOCK_RADIUS_MULTIPLIER: f64 = 1.1;
/// Spawn anchor when no shelter exists to spawn around.
pub const FALLBACK_CENTER: Coordinates = [121.2, 13.0];

pub const RETURN_SAFETY_THRESHOLD: u8 = 78;
pub const RETURN_HAZARD_THRESHOLD: usize = 10;

const FLOOD_PROBABILITY: f64 = 0.82;
const FLOOD_MIN_TTL_TICKS: i32 = 18;
const FLOOD_MAX_TTL_TICKS: i32 = 44;
const STORM_PENALTY: f64 = 10.0;
const FLOOD_RISK_WEIGHT: f64 = 15.0;
const DEBRIS_RISK_WEIGHT: f64 = 22.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    Flood,
    Debris,
}

/// A transient obstacle spawned while the storm is active. Floods carry a
/// finite remaining-tick lifetime; debris uses the -1 sentinel and persists
/// until scenario reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: String,
    pub kind: HazardKind,
    pub center: Coordinates,
    pub intensity: f64,
    pub size_degrees: f64,
    pub remaining_ticks: i32,
}

impl Hazard {
    pub fn is_flood(&self) -> bool {
        self.kind == HazardKind::Flood
    }
}

/// Ticks every flood's lifetime down and removes the expired ones. Debris
/// never decays here.
pub fn decay_hazards(hazards: &mut Vec<Hazard>) {
    for hazard in hazards.iter_mut() {
        if hazard.is_flood() {
            hazard.remaining_ticks -= 1;
        }
    }
    hazards.retain(|hazard| !hazard.is_flood() || hazard.remaining_ticks > 0);
}

/// Spawn-count thresholds for one tick's uniform roll.
pub fn spawn_count_for_roll(roll: f64) -> usize {
    if roll > 0.9 {
        2
    } else if roll > 0.72 {
        1
    } else {
        0
    }
}

/// Rolls this tick's spawn count and materializes the hazards. `next_seq`
/// feeds the deterministic hazard ids.
pub fn spawn_hazards<R: Rng>(
    rng: &mut R,
    shelters: &[Shelter],
    next_seq: &mut u64,
) -> Vec<Hazard> {
    let count = spawn_count_for_roll(rng.gen::<f64>());
    (0..count)
        .map(|_| create_hazard(rng, shelters, next_seq))
        .collect()
}

/// Builds one hazard: flood with probability 0.82, else debris, centered in
/// a uniform-area disk around a randomly chosen shelter.
pub fn create_hazard<R: Rng>(rng: &mut R, shelters: &[Shelter], next_seq: &mut u64) -> Hazard {
    let is_flood = rng.gen::<f64>() < FLOOD_PROBABILITY;
    let intensity = round2(0.45 + rng.gen::<f64>() * 0.5);
    let center = spawn_center(rng, shelters);
    let seq = *next_seq;
    *next_seq += 1;

    if is_flood {
        Hazard {
            id: format!("hazard-{seq}-f"),
            kind: HazardKind::Flood,
            center,
            intensity,
            size_degrees: 0.0035 + intensity * 0.01,
            remaining_ticks: rng.gen_range(FLOOD_MIN_TTL_TICKS..FLOOD_MAX_TTL_TICKS),
        }
    } else {
        Hazard {
            id: format!("hazard-{seq}-d"),
            kind: HazardKind::Debris,
            center,
            intensity,
            size_degrees: 0.0014 + intensity * 0.0025,
            remaining_ticks: -1,
        }
    }
}

fn spawn_center<R: Rng>(rng: &mut R, shelters: &[Shelter]) -> Coordinates {
    let Some(shelter) = pick_shelter(rng, shelters) else {
        return FALLBACK_CENTER;
    };

    let spread = (shelter.radius_minutes * 0.0035).max(0.01);
    let angle = rng.gen::<f64>() * std::f64::consts::TAU;
    // sqrt keeps the sample uniform over the disk area.
    let distance = rng.gen::<f64>().sqrt() * spread;

    [
        shelter.coordinates[0] + angle.cos() * distance,
        shelter.coordinates[1] + angle.sin() * distance,
    ]
}

fn pick_shelter<'a, R: Rng>(rng: &mut R, shelters: &'a [Shelter]) -> Option<&'a Shelter> {
    if shelters.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..shelters.len());
    shelters.get(index)
}

/// Drops the oldest hazards beyond the cap.
pub fn enforce_cap(hazards: &mut Vec<Hazard>) {
    if hazards.len() > HAZARD_CAP {
        let excess = hazards.len() - HAZARD_CAP;
        hazards.drain(..excess);
    }
}

/// Aggregate safety in [0, 100]: flood and debris risks are intensity sums
/// weighted per kind, plus a flat penalty while the storm is active.
pub fn safety_level(hazards: &[Hazard], storm_active: bool) -> u8 {
    let flood_risk: f64 = hazards
        .iter()
        .filter(|hazard| hazard.is_flood())
        .map(|hazard| hazard.intensity * FLOOD_RISK_WEIGHT)
        .sum();
    let debris_risk: f64 = hazards
        .iter()
        .filter(|hazard| !hazard.is_flood())
        .map(|hazard| hazard.intensity * DEBRIS_RISK_WEIGHT)
        .sum();
    let storm_penalty = if storm_active { STORM_PENALTY } else { 0.0 };

    (100.0 - flood_risk - debris_risk - storm_penalty)
        .clamp(0.0, 100.0)
        .round() as u8
}

/// Return-home is permitted only once the typhoon run has completed with a
/// high enough safety level and few enough live hazards.
pub fn can_return_home(status: PhaseStatus, safety: u8, total_hazards: usize) -> bool {
    status == PhaseStatus::Completed
        && safety >= RETURN_SAFETY_THRESHOLD
        && total_hazards <= RETURN_HAZARD_THRESHOLD
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::FeatureCollection;
    use rand::{rngs::StdRng, SeedableRng};

    fn shelter_at(longitude: f64, latitude: f64) -> Shelter {
        Shelter {
            id: "shelter-1".to_string(),
            name: "Shelter 1".to_string(),
            coordinates: [longitude, latitude],
            color: [10, 20, 30],
            radius_minutes: 10.0,
            coverage: FeatureCollection::empty(),
        }
    }

    fn flood(intensity: f64, remaining_ticks: i32) -> Hazard {
        Hazard {
            id: "hazard-0-f".to_string(),
            kind: HazardKind::Flood,
            center: [121.0, 13.0],
            intensity,
            size_degrees: 0.0035 + intensity * 0.01,
            remaining_ticks,
        }
    }

    fn debris(intensity: f64) -> Hazard {
        Hazard {
            id: "hazard-0-d".to_string(),
            kind: HazardKind::Debris,
            center: [121.0, 13.0],
            intensity,
            size_degrees: 0.0014 + intensity * 0.0025,
            remaining_ticks: -1,
        }
    }

    #[test]
    fn spawn_count_thresholds_match_the_roll_bands() {
        assert_eq!(spawn_count_for_roll(0.0), 0);
        assert_eq!(spawn_count_for_roll(0.72), 0);
        assert_eq!(spawn_count_for_roll(0.73), 1);
        assert_eq!(spawn_count_for_roll(0.9), 1);
        assert_eq!(spawn_count_for_roll(0.95), 2);
    }

    #[test]
    fn decay_removes_expired_floods_but_keeps_debris() {
        let mut hazards = vec![flood(0.5, 1), flood(0.5, 5), debris(0.5)];
        decay_hazards(&mut hazards);
        assert_eq!(hazards.len(), 2);
        assert_eq!(hazards[0].remaining_ticks, 4);
        assert_eq!(hazards[1].remaining_ticks, -1);
    }

    #[test]
    fn cap_drops_oldest_first() {
        let mut hazards: Vec<Hazard> = (0..25)
            .map(|index| Hazard {
                id: format!("hazard-{index}-f"),
                ..flood(0.5, 10)
            })
            .collect();
        enforce_cap(&mut hazards);
        assert_eq!(hazards.len(), HAZARD_CAP);
        assert_eq!(hazards[0].id, "hazard-7-f");
        assert_eq!(hazards.last().unwrap().id, "hazard-24-f");
    }

    #[test]
    fn created_hazards_respect_intensity_and_size_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let shelters = vec![shelter_at(121.0, 13.0)];
        let mut seq = 0;
        for _ in 0..200 {
            let hazard = create_hazard(&mut rng, &shelters, &mut seq);
            assert!(hazard.intensity >= 0.45 && hazard.intensity <= 0.95);
            match hazard.kind {
                HazardKind::Flood => {
                    assert!(hazard.remaining_ticks >= 18 && hazard.remaining_ticks < 44);
                    assert!(hazard.size_degrees >= 0.0035);
                }
                HazardKind::Debris => {
                    assert_eq!(hazard.remaining_ticks, -1);
                    assert!(hazard.size_degrees <= 0.0014 + 0.95 * 0.0025 + 1e-12);
                }
            }
        }
        assert_eq!(seq, 200);
    }

    #[test]
    fn spawn_centers_stay_within_shelter_spread() {
        let mut rng = StdRng::seed_from_u64(11);
        let shelters = vec![shelter_at(121.0, 13.0)];
        let spread = (10.0 * 0.0035_f64).max(0.01);
        let mut seq = 0;
        for _ in 0..200 {
            let hazard = create_hazard(&mut rng, &shelters, &mut seq);
            let dx = hazard.center[0] - 121.0;
            let dy = hazard.center[1] - 13.0;
            assert!((dx * dx + dy * dy).sqrt() <= spread + 1e-12);
        }
    }

    #[test]
    fn spawn_without_shelters_uses_the_fallback_center() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seq = 0;
        let hazard = create_hazard(&mut rng, &[], &mut seq);
        assert_eq!(hazard.center, FALLBACK_CENTER);
    }

    #[test]
    fn safety_level_is_clamped_and_weighted() {
        assert_eq!(safety_level(&[], false), 100);
        assert_eq!(safety_level(&[], true), 90);
        // 100 - 0.5*15 - 0.5*22 - 10 = 71.5 -> 72
        assert_eq!(safety_level(&[flood(0.5, 10), debris(0.5)], true), 72);
        // Many intense hazards drive the score to the floor, never below 0.
        let pile: Vec<Hazard> = (0..18).map(|_| debris(0.95)).collect();
        assert_eq!(safety_level(&pile, true), 0);
    }

    #[test]
    fn readiness_requires_completion_safety_and_low_hazard_count() {
        assert!(can_return_home(PhaseStatus::Completed, 78, 10));
        assert!(!can_return_home(PhaseStatus::Running, 100, 0));
        assert!(!can_return_home(PhaseStatus::Completed, 77, 0));
        assert!(!can_return_home(PhaseStatus::Completed, 100, 11));
    }
}
