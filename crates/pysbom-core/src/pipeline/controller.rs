//! Pipeline controller.
//!
//! Runs the stages strictly in order:
//!
//!   Detecting → ToolSetup → Installing → Generating → Validating → Reporting
//!
//! Every stage boundary is a checkpoint: cancellation is checked before a
//! stage starts, and after a failure the [`FailurePolicy`] decides whether
//! the run aborts, skips the stages that depend on the failed one, or simply
//! proceeds. Skipped stages are still written to the log, so the outcome
//! always lists all six stages.

use std::collections::BTreeMap;

use tracing::{info, info_span, warn};

use crate::config::{Config, ProjectContext};
use crate::detect::manager::DetectedManager;
use crate::detect::probe::FileProbe;
use crate::detect::rules::detect;
use crate::error::ErrorKind;
use crate::exec::CommandRunner;
use crate::pipeline::cancel::CancellationToken;
use crate::pipeline::policy::{Continuation, FailurePolicy, dependents};
use crate::report::model::{PipelineOutcome, SbomArtifact, Stage, StageResult, StageStatus};
use crate::sbom::generate::SbomGenerator;
use crate::sbom::validate::SbomValidator;
use crate::stages::install::DependencyInstaller;
use crate::stages::tool::ToolInstaller;

pub const NO_MANAGER_MESSAGE: &str = "no supported dependency manager found";

pub struct PipelineController<R: CommandRunner> {
    ctx: ProjectContext,
    runner: R,
    policy: FailurePolicy,
    cancel: CancellationToken,
}

/// Mutable bookkeeping for one run. Owned by `run` and consumed at the end.
struct RunState {
    log: Vec<StageResult>,
    artifacts: Vec<SbomArtifact>,
    manager: DetectedManager,
    skip: BTreeMap<Stage, String>,
    halted: Option<String>,
    cancelled: bool,
}

impl<R: CommandRunner> PipelineController<R> {
    pub fn new(config: Config, runner: R) -> Self {
        let policy = FailurePolicy::new(config.fail_on_error);
        Self {
            ctx: ProjectContext::new(config),
            runner,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned token so another thread can stop the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run(&self) -> PipelineOutcome {
        let span = info_span!("pipeline", root = %self.ctx.root.display());
        let _guard = span.enter();

        let mut state = RunState {
            log: Vec::with_capacity(Stage::ALL.len()),
            artifacts: Vec::new(),
            manager: DetectedManager::None,
            skip: BTreeMap::new(),
            halted: None,
            cancelled: false,
        };

        for stage in Stage::ALL {
            if let Some(reason) = &state.halted {
                state.log.push(StageResult::skipped(stage, reason.clone()));
                continue;
            }

            if self.cancel.is_cancelled() {
                let reason = self.cancel.reason().unwrap_or_else(|| "cancelled".into());
                warn!(%stage, %reason, "pipeline cancelled");
                state.cancelled = true;
                let message = format!("cancelled: {reason}");
                state.log.push(StageResult::skipped(stage, message.clone()));
                state.halted = Some(message);
                continue;
            }

            if let Some(reason) = state.skip.get(&stage) {
                info!(%stage, %reason, "stage skipped");
                state.log.push(StageResult::skipped(stage, reason.clone()));
                continue;
            }

            info!(%stage, "stage started");
            let (results, load_bearing) = self.execute(stage, &mut state);
            let failed = results.iter().any(StageResult::is_failed);
            for r in &results {
                match r.status {
                    StageStatus::Failed => {
                        warn!(%stage, error = ?r.error, message = %r.message, "stage failed")
                    }
                    _ => info!(%stage, message = %r.message, "stage finished"),
                }
            }
            state.log.extend(results);

            if failed {
                let reason = format!("skipped: {stage} failed");
                match self.policy.on_failure(stage, load_bearing) {
                    Continuation::Abort => state.halted = Some(reason),
                    Continuation::SkipDependents => {
                        for &d in dependents(stage) {
                            state.skip.entry(d).or_insert_with(|| reason.clone());
                        }
                    }
                    Continuation::Proceed => {}
                }
            }
        }

        let outcome = PipelineOutcome::new(
            state.manager,
            state.log,
            state.artifacts,
            self.policy.fail_on_error(),
            state.cancelled,
        );
        info!(
            success = outcome.success,
            manager = %outcome.dependency_manager,
            components = outcome.component_count,
            "pipeline finished"
        );
        outcome
    }

    /// Run one stage. Returns its log entries and whether a failure should
    /// block the stages that depend on it.
    fn execute(&self, stage: Stage, state: &mut RunState) -> (Vec<StageResult>, bool) {
        let config = &self.ctx.config;
        match stage {
            Stage::Detecting => (vec![self.run_detection(state)], true),

            Stage::ToolSetup => {
                let r = ToolInstaller::new(&self.ctx, &self.runner).ensure(state.manager);
                (vec![r], false)
            }

            Stage::Installing => {
                let r = DependencyInstaller::new(&self.ctx, &self.runner)
                    .install(state.manager, config.include_dev);
                (vec![r], true)
            }

            Stage::Generating => {
                let generation = SbomGenerator::new(&self.ctx, &self.runner).generate(
                    state.manager,
                    &config.sbom_format.formats(),
                    &config.sbom_spec_version,
                    &self.ctx.output_directory,
                    &config.filename_prefix,
                );
                let blocks = generation.all_failed();
                state.artifacts = generation.artifacts;
                (generation.results, blocks)
            }

            Stage::Validating => {
                let validator = SbomValidator::new(&config.sbom_spec_version);
                let mut results = Vec::with_capacity(state.artifacts.len());
                for artifact in state.artifacts.iter_mut() {
                    let validated = validator.validate(artifact);
                    *artifact = validated.artifact;
                    results.push(validated.result);
                }
                (results, false)
            }

            Stage::Reporting => (vec![self.report(state)], false),
        }
    }

    fn run_detection(&self, state: &mut RunState) -> StageResult {
        if let Err(e) = self.ctx.config.validate() {
            return StageResult::from_error(Stage::Detecting, &e);
        }

        match detect(&FileProbe::new(&self.ctx.root)) {
            Ok(detection) => {
                state.manager = detection.manager;
                match detection.signal {
                    Some(signal) => StageResult::ok(
                        Stage::Detecting,
                        format!("detected {} via {signal}", detection.manager),
                    )
                    .with_payload(serde_json::json!({
                        "manager": detection.manager,
                        "signal": signal,
                    })),
                    None => {
                        for s in [Stage::Installing, Stage::Generating, Stage::Validating] {
                            state.skip.insert(s, NO_MANAGER_MESSAGE.to_string());
                        }
                        StageResult::ok(Stage::Detecting, NO_MANAGER_MESSAGE)
                    }
                }
            }
            Err(e) => StageResult::from_error(Stage::Detecting, &e),
        }
    }

    fn report(&self, state: &RunState) -> StageResult {
        let detection_failed = state
            .log
            .iter()
            .any(|r| r.stage == Stage::Detecting && r.is_failed());
        if state.manager.is_none() && !detection_failed {
            return StageResult::ok(Stage::Reporting, NO_MANAGER_MESSAGE);
        }

        let requested = self.ctx.config.sbom_format.formats().len();
        let valid = state.artifacts.iter().filter(|a| a.is_valid()).count();
        let failures = state.log.iter().filter(|r| r.is_failed()).count();

        let message = format!("{valid} of {requested} requested SBOM documents valid");
        let result = StageResult::ok(Stage::Reporting, message).with_payload(serde_json::json!({
            "dependency_manager": state.manager,
            "artifacts": state.artifacts,
            "failed_stages": failures,
        }));

        if failures > 0 {
            warn!(failures, "pipeline completed with failed stages");
        }
        result
    }
}

/// Convenience for logging the kinds that appear in a finished log.
pub fn failure_kinds(outcome: &PipelineOutcome) -> Vec<ErrorKind> {
    outcome.failures().filter_map(|r| r.error).collect()
}
