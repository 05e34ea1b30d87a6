use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use pysbom_core::detect::{FileProbe, detect};
use pysbom_core::pipeline::controller::failure_kinds;
use pysbom_core::report::render;

mod args;
mod logging;

fn main() -> Result<()> {
    let args = args::Args::parse();
    logging::init_tracing(&args.log_level, args.log_format)?;

    let config = args.to_config()?;

    let (output, exit_code) = if args.detect_only {
        let detection = detect(&FileProbe::new(&config.path_prefix))?;
        let output = match args.format {
            args::OutputFormat::Json => serde_json::to_string_pretty(&json!({
                "dependency_manager": detection.manager,
                "signal": detection.signal,
            }))?,
            args::OutputFormat::Text => format!("{}\n", detection.manager),
        };
        (output, 0)
    } else {
        let outcome = pysbom_core::run(config);
        if !outcome.success {
            tracing::warn!(failures = ?failure_kinds(&outcome), "pipeline did not succeed");
        }
        let output = match args.format {
            args::OutputFormat::Json => serde_json::to_string_pretty(&outcome)?,
            args::OutputFormat::Text => render::render_text(&outcome),
        };
        (output, outcome.exit_code)
    };

    match args.out {
        Some(path) => std::fs::write(&path, &output)
            .with_context(|| format!("failed to write output: {}", path.display()))?,
        None => print!("{output}"),
    }

    std::process::exit(exit_code);
}
