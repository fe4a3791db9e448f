use anyhow::{bail, Context};
use evaccore::engine::{Command, SimulationEngine};
use evaccore::prelude::{Phase, PhaseStatus};
use log::info;

use crate::generator::coverage::synthetic_coverage;
use crate::workflow::config::ScenarioConfig;

/// Summary of one scripted three-phase rehearsal.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub shelters: usize,
    pub evacuation_ticks: u32,
    pub evacuated_households: u32,
    pub safety_level: u8,
    pub live_hazards: usize,
    pub return_started: bool,
    pub return_status: PhaseStatus,
    pub return_ticks: u32,
    pub households_returned: u32,
}

#[derive(Clone)]
pub struct Runner {
    config: ScenarioConfig,
}

impl Runner {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Walks every configured shelter through the draft, coverage, and
    /// confirmation path using synthetic coverage.
    pub fn provision(&self, engine: &mut SimulationEngine) -> anyhow::Result<()> {
        for (index, spec) in self.config.shelters.iter().enumerate() {
            engine
                .apply(Command::StartAddShelter)
                .context("opening a shelter draft")?;
            let snapshot = engine
                .apply(Command::UpdateDraft {
                    name: Some(spec.name.clone()),
                    coordinates: Some([spec.longitude, spec.latitude]),
                    radius_minutes: Some(spec.radius_minutes),
                })
                .with_context(|| format!("placing draft '{}'", spec.name))?;
            let generation = snapshot
                .draft
                .as_ref()
                .map(|draft| draft.coverage_request)
                .context("draft disappeared during provisioning")?;

            let coverage = synthetic_coverage(
                &self.config.coverage,
                [spec.longitude, spec.latitude],
                spec.radius_minutes,
                self.config.coverage_seed(index),
            );
            engine
                .apply(Command::AttachDraftCoverage {
                    generation,
                    coverage: Some(coverage),
                    error: None,
                })
                .with_context(|| format!("attaching coverage for '{}'", spec.name))?;

            let snapshot = engine
                .apply(Command::ConfirmDraftShelter)
                .with_context(|| format!("confirming shelter '{}'", spec.name))?;
            if snapshot.shelters.len() != index + 1 {
                bail!(
                    "shelter '{}' was rejected: its coverage lies entirely inside existing shelters",
                    spec.name
                );
            }
        }
        Ok(())
    }

    /// Runs the scripted scenario to its end: evacuation, typhoon, then the
    /// return-home phase when the typhoon leaves the area safe enough.
    pub fn execute(&self) -> anyhow::Result<WorkflowResult> {
        let mut engine = match self.config.seed {
            Some(seed) => SimulationEngine::with_seed(seed),
            None => SimulationEngine::new(),
        };
        self.provision(&mut engine)
            .context("provisioning shelters")?;

        let snapshot = engine
            .apply(Command::StartEvacuation)
            .context("starting the evacuation phase")?;
        if snapshot.evacuation.status == PhaseStatus::Error {
            bail!(
                "evacuation refused to start: {}",
                snapshot.evacuation.error.as_deref().unwrap_or("unknown")
            );
        }
        while engine.tick(Phase::Evacuation) {}
        let evacuation = engine.evacuation_run();
        info!(
            "evacuation finished after {} tick(s): {} household(s) evacuated",
            evacuation.elapsed_ticks,
            evacuation
                .zones
                .iter()
                .map(|zone| zone.evacuated_households)
                .sum::<u32>()
        );

        let snapshot = engine
            .apply(Command::StartTyphoon)
            .context("starting the typhoon phase")?;
        if snapshot.typhoon.status == PhaseStatus::Error {
            bail!(
                "typhoon refused to start: {}",
                snapshot.typhoon.error.as_deref().unwrap_or("unknown")
            );
        }
        while engine.tick(Phase::Typhoon) {}
        info!(
            "typhoon finished: safety {} with {} live hazard(s)",
            engine.typhoon_run().safety_level,
            engine.typhoon_run().total_hazards
        );

        let return_started = engine.typhoon_run().can_return_home;
        if return_started {
            engine
                .apply(Command::StartReturnHome)
                .context("starting the return-home phase")?;
            while engine.tick(Phase::ReturnHome) {}
        } else {
            info!("return-home withheld: the area is not safe enough");
        }

        let evacuation = engine.evacuation_run();
        let typhoon = engine.typhoon_run();
        let return_home = engine.return_home_run();
        Ok(WorkflowResult {
            shelters: engine.shelters().len(),
            evacuation_ticks: evacuation.elapsed_ticks,
            evacuated_households: evacuation
                .zones
                .iter()
                .map(|zone| zone.evacuated_households)
                .sum(),
            safety_level: typhoon.safety_level,
            live_hazards: typhoon.total_hazards,
            return_started,
            return_status: return_home.status,
            return_ticks: return_home.elapsed_ticks,
            households_returned: return_home
                .zones
                .iter()
                .map(|zone| zone.households_returned)
                .sum(),
        })
    }
}
