//! Evacuation-scenario core for the Rust shelter-planning platform.
//!
//! The modules cover the deterministic three-phase scenario engine
//! (evacuation, typhoon, return-home) together with the computational
//! geometry it depends on: ring predicates, coverage trimming, hazard
//! spawning and decay, and the GeoJSON joins consumed by the rendering
//! layer.

pub mod coverage;
pub mod engine;
pub mod geojson;
pub mod geometry;
pub mod hazard;
pub mod prelude;
pub mod progress;
pub mod shelter;
pub mod telemetry;

pub use prelude::{Coordinates, EngineError, EngineResult, Phase, PhaseStatus};
