use std::fs;
use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use crate::config::{ProjectContext, SbomFormat, document_path};
use crate::detect::manager::DetectedManager;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, Deadline};
use crate::report::model::{SbomArtifact, Stage, StageResult};
use crate::sbom::cyclonedx::Bom;
use crate::sbom::inspect::inspect_environment;

/// Output of the generating stage.
///
/// One `StageResult` per requested format, or a single failed result when
/// the environment could not be inspected at all.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub artifacts: Vec<SbomArtifact>,
    pub results: Vec<StageResult>,
}

impl Generation {
    /// True when no requested format produced a document.
    pub fn all_failed(&self) -> bool {
        self.artifacts.is_empty()
    }
}

pub struct SbomGenerator<'a> {
    ctx: &'a ProjectContext,
    runner: &'a dyn CommandRunner,
}

impl<'a> SbomGenerator<'a> {
    pub fn new(ctx: &'a ProjectContext, runner: &'a dyn CommandRunner) -> Self {
        Self { ctx, runner }
    }

    /// Inspect the prepared environment and write one document per format.
    ///
    /// Formats are independent: a write failure for one is recorded and the
    /// other is still attempted.
    pub fn generate(
        &self,
        manager: DetectedManager,
        formats: &[SbomFormat],
        spec_version: &str,
        output_dir: &Path,
        filename_prefix: &str,
    ) -> Generation {
        let deadline = Deadline::start(self.ctx.config.command_timeout());
        let packages = match inspect_environment(manager, self.ctx, self.runner, &deadline) {
            Ok(packages) => packages,
            Err(e) => {
                warn!(error = %e, "environment inspection failed");
                return Generation {
                    artifacts: Vec::new(),
                    results: vec![StageResult::from_error(Stage::Generating, &e)],
                };
            }
        };

        let bom = Bom::new(spec_version, packages);
        let mut generation = Generation::default();

        for &format in formats {
            let path = document_path(output_dir, filename_prefix, format);
            match write_document(&bom, format, &path) {
                Ok(()) => {
                    info!(
                        %format,
                        path = %path.display(),
                        components = bom.packages.len(),
                        "sbom written"
                    );
                    generation.results.push(
                        StageResult::ok(Stage::Generating, format!("wrote {}", path.display()))
                            .with_payload(json!({
                                "format": format,
                                "path": path.display().to_string(),
                                "components": bom.packages.len(),
                            })),
                    );
                    generation.artifacts.push(SbomArtifact::unvalidated(format, path));
                }
                Err(e) => {
                    warn!(%format, error = %e, "sbom generation failed");
                    generation.results.push(
                        StageResult::from_error(Stage::Generating, &e)
                            .with_payload(json!({ "format": format })),
                    );
                }
            }
        }

        generation
    }
}

fn write_document(bom: &Bom, format: SbomFormat, path: &Path) -> Result<()> {
    let content = match format {
        SbomFormat::Json => bom.to_json()?,
        SbomFormat::Xml => bom.to_xml(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent.display().to_string(), e))?;
    }
    fs::write(path, content).map_err(|e| Error::io(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;
    use crate::exec::{CommandOutput, CommandSpec};
    use crate::report::model::StageStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Listing(&'static str);

    impl CommandRunner for Listing {
        fn run(
            &self,
            _cmd: &CommandSpec,
            _timeout: Option<Duration>,
        ) -> crate::error::Result<CommandOutput> {
            Ok(CommandOutput {
                exit_code: Some(0),
                stdout: self.0.into(),
                stderr: String::new(),
            })
        }
    }

    const TWO_PACKAGES: &str =
        r#"[{"name": "requests", "version": "2.31.0"}, {"name": "idna", "version": "3.7"}]"#;

    #[test]
    fn writes_both_formats_with_prefix() {
        let out = TempDir::new().unwrap();
        let ctx = ProjectContext::new(Config::default());
        let runner = Listing(TWO_PACKAGES);

        let g = SbomGenerator::new(&ctx, &runner).generate(
            DetectedManager::Pip,
            &[SbomFormat::Json, SbomFormat::Xml],
            "1.5",
            out.path(),
            "sbom-cyclonedx",
        );

        assert_eq!(g.artifacts.len(), 2);
        assert!(out.path().join("sbom-cyclonedx.json").is_file());
        assert!(out.path().join("sbom-cyclonedx.xml").is_file());
        assert!(g.results.iter().all(|r| r.status == StageStatus::Ok));
        assert!(g.artifacts.iter().all(|a| a.valid.is_none()));
    }

    #[test]
    fn creates_missing_output_directory() {
        let out = TempDir::new().unwrap();
        let nested = out.path().join("reports").join("sbom");
        let ctx = ProjectContext::new(Config::default());

        let g = SbomGenerator::new(&ctx, &Listing("[]")).generate(
            DetectedManager::Uv,
            &[SbomFormat::Json],
            "1.5",
            &nested,
            "bom",
        );
        assert_eq!(g.artifacts.len(), 1);
        assert!(nested.join("bom.json").is_file());
    }

    #[test]
    fn one_format_failing_does_not_abort_the_other() {
        let out = TempDir::new().unwrap();
        // A directory squatting on the JSON path makes that write fail.
        std::fs::create_dir(out.path().join("sbom.json")).unwrap();
        let ctx = ProjectContext::new(Config::default());

        let g = SbomGenerator::new(&ctx, &Listing(TWO_PACKAGES)).generate(
            DetectedManager::Pip,
            &[SbomFormat::Json, SbomFormat::Xml],
            "1.5",
            out.path(),
            "sbom",
        );

        assert_eq!(g.results.len(), 2);
        assert_eq!(g.results[0].error, Some(ErrorKind::SbomGeneration));
        assert_eq!(g.results[1].status, StageStatus::Ok);
        assert_eq!(g.artifacts.len(), 1);
        assert_eq!(g.artifacts[0].format, SbomFormat::Xml);
        assert!(!g.all_failed());
    }

    #[test]
    fn inspection_failure_yields_single_failed_result() {
        let out = TempDir::new().unwrap();
        let ctx = ProjectContext::new(Config::default());

        let g = SbomGenerator::new(&ctx, &Listing("Traceback (most recent call last)")).generate(
            DetectedManager::Poetry,
            &[SbomFormat::Json, SbomFormat::Xml],
            "1.5",
            out.path(),
            "sbom",
        );

        assert!(g.all_failed());
        assert_eq!(g.results.len(), 1);
        assert_eq!(g.results[0].error, Some(ErrorKind::SbomGeneration));
    }
}
