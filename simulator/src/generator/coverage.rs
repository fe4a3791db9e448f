//! Synthetic coverage polygons: the offline stand-in for the external
//! isochrone provider. Rings are jittered circles so trimming and overlap
//! behavior see realistic, irregular boundaries.

use evaccore::geojson::{Feature, FeatureCollection, Geometry};
use evaccore::prelude::Coordinates;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Shape parameters for generated coverage rings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageProfile {
    pub sides: usize,
    /// Radius per minute of travel budget, in degrees.
    pub degrees_per_minute: f64,
    /// Relative radial jitter in [0, 1); 0 yields perfect circles.
    pub jitter: f64,
}

impl Default for CoverageProfile {
    fn default() -> Self {
        Self {
            sides: 28,
            degrees_per_minute: 0.0035,
            jitter: 0.12,
        }
    }
}

/// Builds one polygon feature approximating the area reachable within
/// `radius_minutes` from `center`. The ring is closed exactly.
pub fn synthetic_coverage(
    profile: &CoverageProfile,
    center: Coordinates,
    radius_minutes: f64,
    seed: u64,
) -> FeatureCollection {
    let mut rng = StdRng::seed_from_u64(seed);
    let sides = profile.sides.max(3);
    let radius = (radius_minutes * profile.degrees_per_minute).max(0.001);

    let mut ring = Vec::with_capacity(sides + 1);
    for index in 0..sides {
        let angle = std::f64::consts::TAU * index as f64 / sides as f64;
        let wobble = if profile.jitter > 0.0 {
            1.0 + rng.gen_range(-profile.jitter..profile.jitter)
        } else {
            1.0
        };
        ring.push([
            center[0] + angle.cos() * radius * wobble,
            center[1] + angle.sin() * radius * wobble,
        ]);
    }
    ring.push(ring[0]);

    let mut feature = Feature::new(Geometry::Polygon {
        coordinates: vec![ring],
    });
    feature
        .properties
        .insert("contour".to_string(), json!(radius_minutes));
    feature
        .properties
        .insert("metric".to_string(), json!("time"));

    FeatureCollection::new(vec![feature])
}
