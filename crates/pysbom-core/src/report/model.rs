use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SbomFormat;
use crate::detect::manager::DetectedManager;
use crate::error::{Error, ErrorKind};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detecting,
    ToolSetup,
    Installing,
    Generating,
    Validating,
    Reporting,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Detecting,
        Stage::ToolSetup,
        Stage::Installing,
        Stage::Generating,
        Stage::Validating,
        Stage::Reporting,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Detecting => "detecting",
            Stage::ToolSetup => "tool_setup",
            Stage::Installing => "installing",
            Stage::Generating => "generating",
            Stage::Validating => "validating",
            Stage::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    Failed,
    Skipped,
}

/// Outcome of one pipeline stage, as recorded in the execution log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl StageResult {
    pub fn ok(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            message: message.into(),
            error: None,
            payload: None,
        }
    }

    pub fn failed(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            message: message.into(),
            error: Some(kind),
            payload: None,
        }
    }

    pub fn skipped(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            message: reason.into(),
            error: None,
            payload: None,
        }
    }

    pub fn from_error(stage: Stage, err: &Error) -> Self {
        Self::failed(stage, err.kind(), err.to_string())
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}

/// One produced SBOM document.
///
/// `component_count` and `valid` stay `None` until the validator has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SbomArtifact {
    pub format: SbomFormat,
    pub path: PathBuf,
    pub component_count: Option<usize>,
    pub valid: Option<bool>,
    pub size_bytes: Option<u64>,
    pub sha256: Option<String>,
}

impl SbomArtifact {
    pub fn unvalidated(format: SbomFormat, path: PathBuf) -> Self {
        Self {
            format,
            path,
            component_count: None,
            valid: None,
            size_bytes: None,
            sha256: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid == Some(true)
    }
}

/// Terminal result of a pipeline run. This is the only value exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub cancelled: bool,
    pub dependency_manager: DetectedManager,
    /// Empty when no JSON document was produced.
    pub sbom_json_path: String,
    /// Empty when no XML document was produced.
    pub sbom_xml_path: String,
    pub component_count: usize,
    /// Process exit status the caller should use.
    pub exit_code: i32,
    pub stages: Vec<StageResult>,
    pub artifacts: Vec<SbomArtifact>,
}

impl PipelineOutcome {
    /// Assemble the outcome from the stage log and artifacts.
    ///
    /// A run succeeds when it was not cancelled and no stage failed. The exit
    /// code is 0 on success, and also when `fail_on_error` is off, since the
    /// continue policy reports failures only through the stage log.
    pub fn new(
        dependency_manager: DetectedManager,
        stages: Vec<StageResult>,
        mut artifacts: Vec<SbomArtifact>,
        fail_on_error: bool,
        cancelled: bool,
    ) -> Self {
        artifacts.sort_by_key(|a| a.format);

        let success = !cancelled && !stages.iter().any(StageResult::is_failed);

        let path_for = |format: SbomFormat| {
            artifacts
                .iter()
                .find(|a| a.format == format)
                .map(|a| a.path.display().to_string())
                .unwrap_or_default()
        };
        let sbom_json_path = path_for(SbomFormat::Json);
        let sbom_xml_path = path_for(SbomFormat::Xml);

        // Both formats describe the same environment; report the first valid count.
        let component_count = artifacts
            .iter()
            .filter(|a| a.is_valid())
            .find_map(|a| a.component_count)
            .unwrap_or(0);

        let exit_code = if success || !fail_on_error { 0 } else { 1 };

        Self {
            success,
            cancelled,
            dependency_manager,
            sbom_json_path,
            sbom_xml_path,
            component_count,
            exit_code,
            stages,
            artifacts,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(|s| s.is_failed())
    }

    pub fn stage_results(&self, stage: Stage) -> impl Iterator<Item = &StageResult> {
        self.stages.iter().filter(move |s| s.stage == stage)
    }
}
