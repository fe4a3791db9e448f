//! Pure joins between shelter coverage and per-zone progress, producing the
//! feature collections consumed by the external rendering layer. Geometry
//! is never altered here; only feature properties are stamped.

use serde_json::{json, Map, Value};

use crate::engine::evacuation::EvacuationZoneProgress;
use crate::engine::return_home::ReturnHomeZoneProgress;
use crate::geojson::{Feature, FeatureCollection, Geometry};
use crate::geometry::circle_ring;
use crate::hazard::{Hazard, HAZARD_CIRCLE_SIDES};
use crate::shelter::Shelter;

/// Stamps evacuation progress onto copies of each shelter's coverage
/// features. Shelters without a matching zone contribute nothing.
pub fn build_regional_progress(
    shelters: &[Shelter],
    zones: &[EvacuationZoneProgress],
) -> FeatureCollection {
    let mut features = Vec::new();
    for shelter in shelters {
        let Some(zone) = zones.iter().find(|zone| zone.shelter_id == shelter.id) else {
            continue;
        };
        for feature in &shelter.coverage.features {
            let mut stamped = feature.clone();
            stamp_shelter(&mut stamped.properties, shelter);
            stamped
                .properties
                .insert("complianceRate".to_string(), json!(zone.compliance_rate));
            stamped
                .properties
                .insert("fillProgress".to_string(), json!(zone.fill_progress));
            stamped
                .properties
                .insert("status".to_string(), enum_value(&zone.status));
            features.push(stamped);
        }
    }
    FeatureCollection::new(features)
}

/// Stamps return-home progress onto copies of each shelter's coverage
/// features.
pub fn build_return_progress(
    shelters: &[Shelter],
    zones: &[ReturnHomeZoneProgress],
) -> FeatureCollection {
    let mut features = Vec::new();
    for shelter in shelters {
        let Some(zone) = zones.iter().find(|zone| zone.shelter_id == shelter.id) else {
            continue;
        };
        for feature in &shelter.coverage.features {
            let mut stamped = feature.clone();
            stamp_shelter(&mut stamped.properties, shelter);
            stamped
                .properties
                .insert("blockedReason".to_string(), enum_value(&zone.blocked_reason));
            stamped.properties.insert(
                "householdsReturned".to_string(),
                json!(zone.households_returned),
            );
            stamped
                .properties
                .insert("returnProgress".to_string(), json!(zone.return_progress));
            stamped.properties.insert(
                "totalHouseholds".to_string(),
                json!(zone.total_households),
            );
            features.push(stamped);
        }
    }
    FeatureCollection::new(features)
}

/// Flood hazards as circle-approximation MultiPolygons.
pub fn build_flooded_area(hazards: &[Hazard]) -> FeatureCollection {
    let features = hazards
        .iter()
        .filter(|hazard| hazard.is_flood())
        .map(|hazard| {
            let ring = circle_ring(hazard.center, hazard.size_degrees, HAZARD_CIRCLE_SIDES);
            let mut properties = Map::new();
            properties.insert("hazardId".to_string(), json!(hazard.id.clone()));
            properties.insert("intensity".to_string(), json!(hazard.intensity));
            properties.insert("remainingTicks".to_string(), json!(hazard.remaining_ticks));
            Feature::with_properties(
                Geometry::MultiPolygon {
                    coordinates: vec![vec![ring]],
                },
                properties,
            )
        })
        .collect();
    FeatureCollection::new(features)
}

/// Debris hazards as bare points.
pub fn build_debris_points(hazards: &[Hazard]) -> FeatureCollection {
    let features = hazards
        .iter()
        .filter(|hazard| !hazard.is_flood())
        .map(|hazard| {
            let mut properties = Map::new();
            properties.insert("hazardId".to_string(), json!(hazard.id.clone()));
            properties.insert("intensity".to_string(), json!(hazard.intensity));
            Feature::with_properties(
                Geometry::Point {
                    coordinates: hazard.center,
                },
                properties,
            )
        })
        .collect();
    FeatureCollection::new(features)
}

fn stamp_shelter(properties: &mut Map<String, Value>, shelter: &Shelter) {
    properties.insert("shelterId".to_string(), json!(shelter.id.clone()));
    properties.insert("shelterName".to_string(), json!(shelter.name.clone()));
    properties.insert("color".to_string(), json!(shelter.color));
}

fn enum_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
