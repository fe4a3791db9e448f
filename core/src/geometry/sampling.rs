//! Point sampling helpers: circle approximations for hazard footprints and
//! straight-line interpolation for route probing.

use crate::prelude::Coordinates;

/// Approximates a circle as a closed ring with `sides` segments.
pub fn circle_ring(center: Coordinates, radius_degrees: f64, sides: usize) -> Vec<Coordinates> {
    let sides = sides.max(3);
    let mut points = Vec::with_capacity(sides + 1);
    for index in 0..=sides {
        let angle = std::f64::consts::TAU * index as f64 / sides as f64;
        points.push([
            center[0] + angle.cos() * radius_degrees,
            center[1] + angle.sin() * radius_degrees,
        ]);
    }
    points
}

/// Samples `segments + 1` equally spaced points from `start` to `end`,
/// inclusive of both endpoints.
pub fn interpolate_line(start: Coordinates, end: Coordinates, segments: usize) -> Vec<Coordinates> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|index| {
            let t = index as f64 / segments as f64;
            [
                start[0] + (end[0] - start[0]) * t,
                start[1] + (end[1] - start[1]) * t,
            ]
        })
        .collect()
}

/// Planar distance in degrees. Adequate at the scenario's scale; no
/// great-circle correction.
pub fn distance_between(a: Coordinates, b: Coordinates) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_ring_has_expected_vertex_count() {
        let ring = circle_ring([121.0, 13.0], 0.01, 28);
        assert_eq!(ring.len(), 29);
        for point in &ring {
            let distance = distance_between(*point, [121.0, 13.0]);
            assert!((distance - 0.01).abs() < 1e-9);
        }
    }

    #[test]
    fn interpolate_line_is_inclusive_of_endpoints() {
        let line = interpolate_line([0.0, 0.0], [1.0, 2.0], 28);
        assert_eq!(line.len(), 29);
        assert_eq!(line[0], [0.0, 0.0]);
        assert_eq!(line[28], [1.0, 2.0]);
        assert!((line[14][0] - 0.5).abs() < 1e-12);
        assert!((line[14][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distance_is_euclidean_in_degrees() {
        assert_eq!(distance_between([0.0, 0.0], [3.0, 4.0]), 5.0);
        assert_eq!(distance_between([1.0, 1.0], [1.0, 1.0]), 0.0);
    }
}
