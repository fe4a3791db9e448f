//! Boundary-level operations over feature collections. Only the outer ring
//! (ring index 0) of each polygon is honored; holes are not modeled.

use crate::geojson::{FeatureCollection, Geometry, PolygonRings};
use crate::geometry::ring::{point_in_ring, rings_overlap};
use crate::prelude::Coordinates;

/// Collects every polygon carried by Polygon and MultiPolygon features.
/// Other geometry types and missing geometries are skipped.
pub fn extract_polygons(collection: &FeatureCollection) -> Vec<&PolygonRings> {
    let mut polygons = Vec::new();
    for feature in &collection.features {
        match &feature.geometry {
            Some(Geometry::Polygon { coordinates }) => polygons.push(coordinates),
            Some(Geometry::MultiPolygon { coordinates }) => polygons.extend(coordinates.iter()),
            _ => {}
        }
    }
    polygons
}

/// True if any outer ring of any polygon in `a` overlaps any outer ring of
/// any polygon in `b`.
pub fn boundaries_overlap(a: &FeatureCollection, b: &FeatureCollection) -> bool {
    let polygons_a = extract_polygons(a);
    let polygons_b = extract_polygons(b);

    for polygon_a in &polygons_a {
        let Some(outer_a) = polygon_a.first().filter(|ring| !ring.is_empty()) else {
            continue;
        };
        for polygon_b in &polygons_b {
            let Some(outer_b) = polygon_b.first().filter(|ring| !ring.is_empty()) else {
                continue;
            };
            if rings_overlap(outer_a, outer_b) {
                return true;
            }
        }
    }
    false
}

/// True if the point lies inside any polygon's outer ring.
pub fn is_point_within_boundary(point: Coordinates, collection: &FeatureCollection) -> bool {
    extract_polygons(collection).iter().any(|polygon| {
        polygon
            .first()
            .is_some_and(|outer| !outer.is_empty() && point_in_ring(point, outer))
    })
}

/// Centroid of the first polygon's outer-ring vertices, excluding the
/// closing duplicate vertex. Falls back when no usable ring exists.
pub fn representative_point(collection: &FeatureCollection, fallback: Coordinates) -> Coordinates {
    let polygons = extract_polygons(collection);
    let Some(ring) = polygons.first().and_then(|polygon| polygon.first()) else {
        return fallback;
    };
    if ring.is_empty() {
        return fallback;
    }

    let points = &ring[..ring.len().saturating_sub(1).max(1)];
    let sum = points
        .iter()
        .fold([0.0, 0.0], |acc, point| [acc[0] + point[0], acc[1] + point[1]]);
    [sum[0] / points.len() as f64, sum[1] / points.len() as f64]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::Feature;

    fn square_collection(offset_x: f64, offset_y: f64, size: f64) -> FeatureCollection {
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

    #[test]
    fn extract_polygons_handles_polygon_and_multipolygon() {
        let ring = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let collection = FeatureCollection::new(vec![
            Feature::new(Geometry::Polygon {
                coordinates: vec![ring.clone()],
            }),
            Feature::new(Geometry::MultiPolygon {
                coordinates: vec![vec![ring.clone()], vec![ring.clone()]],
            }),
            Feature::new(Geometry::Point {
                coordinates: [0.0, 0.0],
            }),
            Feature {
                marker: "Feature".to_string(),
                geometry: None,
                properties: Default::default(),
            },
        ]);

        assert_eq!(extract_polygons(&collection).len(), 3);
    }

    #[test]
    fn boundaries_overlap_detects_intersection() {
        let a = square_collection(0.0, 0.0, 1.0);
        let b = square_collection(0.5, 0.5, 1.0);
        let c = square_collection(5.0, 5.0, 1.0);
        assert!(boundaries_overlap(&a, &b));
        assert!(!boundaries_overlap(&a, &c));
    }

    #[test]
    fn point_within_boundary_checks_outer_rings() {
        let boundary = square_collection(0.0, 0.0, 2.0);
        assert!(is_point_within_boundary([1.0, 1.0], &boundary));
        assert!(!is_point_within_boundary([3.0, 1.0], &boundary));
        assert!(!is_point_within_boundary([1.0, 1.0], &FeatureCollection::empty()));
    }

    #[test]
    fn representative_point_averages_open_ring() {
        let boundary = square_collection(0.0, 0.0, 2.0);
        let point = representative_point(&boundary, [9.0, 9.0]);
        // Mean of the four distinct corners; the closing vertex is excluded.
        assert!((point[0] - 1.0).abs() < 1e-12);
        assert!((point[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn representative_point_falls_back_without_polygons() {
        assert_eq!(
            representative_point(&FeatureCollection::empty(), [121.2, 13.0]),
            [121.2, 13.0]
        );
    }
}
