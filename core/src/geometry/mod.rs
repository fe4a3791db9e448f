pub mod boundary;
pub mod ring;
pub mod sampling;

pub use boundary::{
    boundaries_overlap, extract_polygons, is_point_within_boundary, representative_point,
};
pub use ring::{bounding_boxes_overlap, point_in_ring, rings_overlap, segments_intersect};
pub use sampling::{circle_ring, distance_between, interpolate_line};
