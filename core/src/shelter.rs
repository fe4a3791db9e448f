//! Shelter records and the draft that precedes them, plus the rotating
//! display palette assigned at draft creation.

use serde::{Deserialize, Serialize};

use crate::geojson::FeatureCollection;
use crate::prelude::Coordinates;

pub type ShelterId = String;

pub const DEFAULT_SHELTER_RADIUS_MINUTES: f64 = 10.0;

/// An accepted shelter. Immutable once confirmed, except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shelter {
    pub id: ShelterId,
    pub name: String,
    pub coordinates: Coordinates,
    pub color: [u8; 3],
    pub radius_minutes: f64,
    /// Accepted coverage polygon, already trimmed against earlier shelters.
    pub coverage: FeatureCollection,
}

/// The single in-progress shelter owned by the add-shelters mode.
/// Coordinates and coverage stay empty until placement and isochrone
/// retrieval complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelterDraft {
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub color: [u8; 3],
    pub radius_minutes: f64,
    pub coverage: Option<FeatureCollection>,
    /// Generation counter for cancel-aware coverage retrieval: a fetched
    /// result is applied only if its generation still matches.
    pub coverage_request: u64,
}

impl ShelterDraft {
    pub fn with_palette_index(index: u32) -> Self {
        Self {
            name: format!("Shelter {index}"),
            coordinates: None,
            color: shelter_color(index),
            radius_minutes: DEFAULT_SHELTER_RADIUS_MINUTES,
            coverage: None,
            coverage_request: 0,
        }
    }
}

/// Golden-angle hue rotation keeps consecutive shelters visually distinct.
pub fn shelter_color(index: u32) -> [u8; 3] {
    let hue = (index as f64 * 137.508) % 360.0;
    hsl_to_rgb(hue, 72.0, 45.0)
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let saturation = s / 100.0;
    let lightness = l / 100.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    [
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_red_converts_to_rgb() {
        assert_eq!(hsl_to_rgb(0.0, 72.0, 45.0), [197, 32, 32]);
    }

    #[test]
    fn hsl_green_band_has_dominant_green_channel() {
        let [r, g, b] = hsl_to_rgb(120.0, 72.0, 45.0);
        assert!(g > r && g > b);
    }

    #[test]
    fn consecutive_palette_entries_differ() {
        let first = shelter_color(1);
        let second = shelter_color(2);
        let third = shelter_color(3);
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_ne!(first, third);
    }

    #[test]
    fn draft_defaults_are_empty_until_placed() {
        let draft = ShelterDraft::with_palette_index(4);
        assert_eq!(draft.name, "Shelter 4");
        assert_eq!(draft.radius_minutes, DEFAULT_SHELTER_RADIUS_MINUTES);
        assert!(draft.coordinates.is_none());
        assert!(draft.coverage.is_none());
        assert_eq!(draft.coverage_request, 0);
    }
}
