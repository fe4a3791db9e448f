use anyhow::Context;
use evaccore::shelter::DEFAULT_SHELTER_RADIUS_MINUTES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::coverage::CoverageProfile;

/// Placement base for scripted scenarios without explicit shelter
/// coordinates.
const DEFAULT_BASE: [f64; 2] = [121.2, 13.0];
/// Spacing wide enough that default synthetic coverages never swallow each
/// other during trimming.
const DEFAULT_SPACING_DEGREES: f64 = 0.09;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShelterSpec {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default = "default_radius_minutes")]
    pub radius_minutes: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub seed: Option<u64>,
    pub shelters: Vec<ShelterSpec>,
    pub coverage: CoverageProfile,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            name: None,
            seed: None,
            shelters: Vec::new(),
            coverage: CoverageProfile::default(),
        }
    }
}

impl ScenarioConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario config {}", path_ref.display()))?;
        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Builds a scripted scenario from CLI flags: `count` shelters spaced
    /// along a west-east line.
    pub fn from_args(count: usize, radius_minutes: f64, seed: Option<u64>) -> Self {
        let shelters = (0..count)
            .map(|index| ShelterSpec {
                name: format!("Shelter {}", index + 1),
                longitude: DEFAULT_BASE[0] + index as f64 * DEFAULT_SPACING_DEGREES,
                latitude: DEFAULT_BASE[1],
                radius_minutes,
            })
            .collect();
        Self {
            name: None,
            seed,
            shelters,
            coverage: CoverageProfile::default(),
        }
    }

    /// Seed for one shelter's synthetic coverage; stable across runs of the
    /// same scenario.
    pub fn coverage_seed(&self, index: usize) -> u64 {
        self.seed.unwrap_or(0).wrapping_add(index as u64 + 1)
    }
}

fn default_radius_minutes() -> f64 {
    DEFAULT_SHELTER_RADIUS_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_spaces_shelters_apart() {
        let config = ScenarioConfig::from_args(3, 12.0, Some(4));
        assert_eq!(config.shelters.len(), 3);
        assert_eq!(config.shelters[0].radius_minutes, 12.0);
        let gap = config.shelters[1].longitude - config.shelters[0].longitude;
        assert!(gap >= 0.09);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"name: drill\nseed: 11\nshelters:\n  - name: Gym\n    longitude: 121.01\n    latitude: 13.02\n    radius_minutes: 15\n  - name: Hall\n    longitude: 121.12\n    latitude: 13.02\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let config = ScenarioConfig::load(&path).unwrap();
        assert_eq!(config.name.as_deref(), Some("drill"));
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.shelters.len(), 2);
        assert_eq!(config.shelters[0].radius_minutes, 15.0);
        // Omitted radius falls back to the platform default.
        assert_eq!(config.shelters[1].radius_minutes, 10.0);
    }

    #[test]
    fn coverage_seeds_differ_per_shelter() {
        let config = ScenarioConfig::from_args(2, 10.0, Some(9));
        assert_ne!(config.coverage_seed(0), config.coverage_seed(1));
    }
}
