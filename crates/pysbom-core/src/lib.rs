pub mod config;
pub mod detect;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod report;
pub mod sbom;
pub mod stages;
pub mod util;

pub use config::{Config, ProjectContext};
pub use detect::manager::DetectedManager;
pub use pipeline::controller::PipelineController;
pub use report::model::PipelineOutcome;

pub const TOOL_NAME: &str = "pysbom";

/// CycloneDX specification versions the generator can emit.
/// JSON serialization was introduced in 1.2, so older versions are rejected.
pub const SUPPORTED_SPEC_VERSIONS: &[&str] = &["1.2", "1.3", "1.4", "1.5", "1.6"];

/// Run the full pipeline for `config` against real package-manager processes.
///
/// This is the convenience entry point used by the CLI. Callers that need a
/// custom [`exec::CommandRunner`] or cancellation should build a
/// [`PipelineController`] directly.
pub fn run(config: Config) -> PipelineOutcome {
    PipelineController::new(config, exec::SystemRunner).run()
}
