//! Pipeline configuration and the immutable per-run project context.
//!
//! `Config` is the user-facing option set. It deserializes from TOML with
//! every field optional, and the CLI overlays its flags on top. A
//! `ProjectContext` is derived from a validated `Config` once, when the
//! pipeline starts, and is never mutated afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::SUPPORTED_SPEC_VERSIONS;
use crate::error::Error;

/// Serialization format of a single SBOM document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SbomFormat {
    Json,
    Xml,
}

impl SbomFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SbomFormat::Json => "json",
            SbomFormat::Xml => "xml",
        }
    }
}

impl std::fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which documents the generator should produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatSelection {
    Json,
    Xml,
    #[default]
    Both,
}

impl FormatSelection {
    /// Requested formats, JSON first.
    pub fn formats(self) -> Vec<SbomFormat> {
        match self {
            FormatSelection::Json => vec![SbomFormat::Json],
            FormatSelection::Xml => vec![SbomFormat::Xml],
            FormatSelection::Both => vec![SbomFormat::Json, SbomFormat::Xml],
        }
    }
}

impl std::str::FromStr for FormatSelection {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(FormatSelection::Json),
            "xml" => Ok(FormatSelection::Xml),
            "both" => Ok(FormatSelection::Both),
            other => Err(Error::Config {
                field: "sbom_format".into(),
                reason: format!("expected json, xml or both, got '{other}'"),
            }),
        }
    }
}

/// Recognized pipeline options. All fields are optional in TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub python_version: String,
    pub include_dev: bool,
    pub sbom_format: FormatSelection,
    pub sbom_spec_version: String,
    pub filename_prefix: String,
    pub path_prefix: PathBuf,
    pub output_directory: PathBuf,
    pub fail_on_error: bool,
    /// Wall-clock limit applied to each external command. `None` waits forever.
    pub command_timeout_secs: Option<u64>,
    pub python_interpreter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            python_version: "3.12".into(),
            include_dev: false,
            sbom_format: FormatSelection::Both,
            sbom_spec_version: "1.5".into(),
            filename_prefix: "sbom-cyclonedx".into(),
            path_prefix: PathBuf::from("."),
            output_directory: PathBuf::from("."),
            fail_on_error: true,
            command_timeout_secs: None,
            python_interpreter: "python3".into(),
        }
    }
}

impl Config {
    /// Load a config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), Error> {
        if !SUPPORTED_SPEC_VERSIONS.contains(&self.sbom_spec_version.as_str()) {
            return Err(Error::Config {
                field: "sbom_spec_version".into(),
                reason: format!(
                    "unsupported CycloneDX version '{}', expected one of {}",
                    self.sbom_spec_version,
                    SUPPORTED_SPEC_VERSIONS.join(", ")
                ),
            });
        }

        let prefix = self.filename_prefix.trim();
        if prefix.is_empty() {
            return Err(Error::Config {
                field: "filename_prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        if prefix.contains(['/', '\\']) {
            return Err(Error::Config {
                field: "filename_prefix".into(),
                reason: "must be a file name, not a path".into(),
            });
        }

        if self.python_version.trim().is_empty() {
            return Err(Error::Config {
                field: "python_version".into(),
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Immutable snapshot of everything a single pipeline run needs to know.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Directory treated as the project root for detection and installation.
    pub root: PathBuf,
    pub output_directory: PathBuf,
    pub config: Config,
}

impl ProjectContext {
    /// Relative `path_prefix` and `output_directory` are resolved against the
    /// current directory here, once, so later stages never depend on it.
    pub fn new(config: Config) -> Self {
        Self {
            root: absolute(&config.path_prefix),
            output_directory: absolute(&config.output_directory),
            config,
        }
    }
}

/// Absolute form of `path` without touching the filesystem; unchanged if the
/// current directory cannot be read.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Path of the document for `format`: `{output_directory}/{prefix}.{ext}`.
pub fn document_path(
    output_directory: &Path,
    filename_prefix: &str,
    format: SbomFormat,
) -> PathBuf {
    output_directory.join(format!("{}.{}", filename_prefix.trim(), format.extension()))
}
