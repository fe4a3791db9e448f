//! Coverage trimming for freshly drafted shelters.
//!
//! The trim is a coarse vertex-sampling pass, not boolean polygon clipping:
//! a draft feature survives only if at least one outer-ring vertex lies
//! outside every accepted shelter's boundary, and a surviving feature keeps
//! its full geometry. A feature whose vertices all fall inside existing
//! coverage is dropped in its entirety.

use crate::geojson::{Feature, FeatureCollection, Geometry, PolygonRings};
use crate::geometry::is_point_within_boundary;
use crate::shelter::Shelter;

/// Cuts a drafted coverage collection down to the features not already
/// claimed by existing shelters. Pure; inputs are never mutated. An empty
/// draft or an empty shelter set returns the draft unchanged.
pub fn trim_coverage(draft: &FeatureCollection, existing: &[Shelter]) -> FeatureCollection {
    if draft.features.is_empty() || existing.is_empty() {
        return draft.clone();
    }

    let kept = draft
        .features
        .iter()
        .filter(|feature| feature_escapes_existing_coverage(feature, existing))
        .cloned()
        .collect();

    FeatureCollection::new(kept)
}

fn feature_escapes_existing_coverage(feature: &Feature, existing: &[Shelter]) -> bool {
    let polygons: Vec<&PolygonRings> = match &feature.geometry {
        Some(Geometry::Polygon { coordinates }) => vec![coordinates],
        Some(Geometry::MultiPolygon { coordinates }) => coordinates.iter().collect(),
        _ => Vec::new(),
    };
    if polygons.is_empty() {
        return false;
    }

    polygons.iter().any(|polygon| {
        let Some(outer) = polygon.first().filter(|ring| !ring.is_empty()) else {
            return false;
        };
        outer.iter().any(|point| {
            !existing
                .iter()
                .any(|shelter| is_point_within_boundary(*point, &shelter.coverage))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Feature;

    fn square(offset_x: f64, offset_y: f64, size: f64) -> FeatureCollection {
        let ring = vec![
            [offset_x, offset_y],
            [offset_x + size, offset_y],
            [offset_x + size, offset_y + size],
            [offset_x, offset_y + size],
            [offset_x, offset_y],
        ];
        FeatureCollection::new(vec![Feature::new(Geometry::Polygon {
            coordinates: vec![ring],
        })])
    }

    fn shelter_with_coverage(id: &str, coverage: FeatureCollection) -> Shelter {
        Shelter {
            id: id.to_string(),
            name: id.to_string(),
            coordinates: [0.0, 0.0],
            color: [0, 0, 0],
            radius_minutes: 10.0,
            coverage,
        }
    }

    #[test]
    fn trim_with_no_existing_shelters_returns_draft_unchanged() {
        let draft = square(0.0, 0.0, 1.0);
        assert_eq!(trim_coverage(&draft, &[]), draft);
    }

    #[test]
    fn trim_of_empty_draft_returns_draft_unchanged() {
        let draft = FeatureCollection::empty();
        let existing = vec![shelter_with_coverage("a", square(0.0, 0.0, 1.0))];
        assert_eq!(trim_coverage(&draft, &existing), draft);
    }

    #[test]
    fn fully_contained_feature_is_dropped() {
        let existing = vec![shelter_with_coverage("a", square(-2.0, -2.0, 6.0))];
        let draft = square(0.0, 0.0, 1.0);
        let trimmed = trim_coverage(&draft, &existing);
        assert!(trimmed.is_empty());
    }

    #[test]
    fn partially_escaping_feature_is_kept_whole() {
        let existing = vec![shelter_with_coverage("a", square(0.0, 0.0, 1.0))];
        // Overlaps the existing square but pokes out to the east.
        let draft = square(0.5, 0.25, 1.0);
        let trimmed = trim_coverage(&draft, &existing);
        assert_eq!(trimmed.features.len(), 1);
        assert_eq!(trimmed.features[0], draft.features[0]);
    }

    #[test]
    fn trim_is_idempotent_for_a_fixed_shelter_set() {
        let existing = vec![
            shelter_with_coverage("a", square(0.0, 0.0, 1.0)),
            shelter_with_coverage("b", square(3.0, 0.0, 1.0)),
        ];
        let draft = FeatureCollection::new(
            square(0.25, 0.25, 0.5)
                .features
                .into_iter()
                .chain(square(10.0, 10.0, 1.0).features)
                .collect(),
        );

        let once = trim_coverage(&draft, &existing);
        let twice = trim_coverage(&once, &existing);
        assert_eq!(once, twice);
        // The contained feature is gone, the distant one survives.
        assert_eq!(once.features.len(), 1);
    }

    #[test]
    fn feature_without_polygon_geometry_is_dropped() {
        let existing = vec![shelter_with_coverage("a", square(0.0, 0.0, 1.0))];
        let draft = FeatureCollection::new(vec![Feature::new(Geometry::Point {
            coordinates: [5.0, 5.0],
        })]);
        assert!(trim_coverage(&draft, &existing).is_empty());
    }
}
