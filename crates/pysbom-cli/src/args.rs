use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use pysbom_core::config::{Config, FormatSelection};

#[derive(Debug, Parser)]
#[command(
    name = "pysbom",
    version,
    about = "Detect a Python project's dependency manager and produce CycloneDX SBOMs"
)]
pub struct Args {
    /// Project root to scan (overrides path_prefix from the config file)
    pub path: Option<PathBuf>,

    /// TOML file with pipeline options; flags below take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Python version handed to the package manager
    #[arg(long)]
    pub python_version: Option<String>,

    /// Install development dependencies too
    #[arg(long)]
    pub include_dev: Option<bool>,

    /// Which SBOM documents to produce
    #[arg(long)]
    pub sbom_format: Option<SbomFormatArg>,

    /// CycloneDX specification version
    #[arg(long)]
    pub sbom_spec_version: Option<String>,

    /// Base name of the generated documents
    #[arg(long)]
    pub filename_prefix: Option<String>,

    /// Directory the documents are written to
    #[arg(long)]
    pub output_directory: Option<PathBuf>,

    /// Exit non-zero and stop at the first failed stage
    #[arg(long)]
    pub fail_on_error: Option<bool>,

    /// Wall-clock limit in seconds for the commands of one pipeline stage
    #[arg(long)]
    pub command_timeout_secs: Option<u64>,

    /// Interpreter used for pip and environment inspection
    #[arg(long)]
    pub python_interpreter: Option<String>,

    /// Only report the detected dependency manager
    #[arg(long)]
    pub detect_only: bool,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log line format (logs go to stderr)
    #[arg(long, default_value = "compact")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SbomFormatArg {
    Json,
    Xml,
    Both,
}

impl From<SbomFormatArg> for FormatSelection {
    fn from(arg: SbomFormatArg) -> Self {
        match arg {
            SbomFormatArg::Json => FormatSelection::Json,
            SbomFormatArg::Xml => FormatSelection::Xml,
            SbomFormatArg::Both => FormatSelection::Both,
        }
    }
}

impl Args {
    /// Config file (or defaults) with explicit flags applied on top.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(path) = &self.path {
            config.path_prefix = path.clone();
        }
        if let Some(v) = &self.python_version {
            config.python_version = v.clone();
        }
        if let Some(dev) = self.include_dev {
            config.include_dev = dev;
        }
        if let Some(f) = self.sbom_format {
            config.sbom_format = f.into();
        }
        if let Some(v) = &self.sbom_spec_version {
            config.sbom_spec_version = v.clone();
        }
        if let Some(p) = &self.filename_prefix {
            config.filename_prefix = p.clone();
        }
        if let Some(dir) = &self.output_directory {
            config.output_directory = dir.clone();
        }
        if let Some(f) = self.fail_on_error {
            config.fail_on_error = f;
        }
        if let Some(secs) = self.command_timeout_secs {
            config.command_timeout_secs = Some(secs);
        }
        if let Some(python) = &self.python_interpreter {
            config.python_interpreter = python.clone();
        }

        Ok(config)
    }
}
