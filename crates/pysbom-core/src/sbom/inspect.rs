//! Environment introspection.
//!
//! After installation, the manager's own interpreter is asked to enumerate
//! installed distributions. The listing script prints a JSON array of
//! `{"name", "version"}` objects on stdout.

use tracing::debug;

use crate::config::ProjectContext;
use crate::detect::manager::DetectedManager;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec, Deadline};
use crate::sbom::model::Package;
use crate::util::deterministic::sort_packages;
use crate::util::output::{OUTPUT_TAIL_BYTES, tail};

const LIST_DISTRIBUTIONS: &str = "import json, importlib.metadata as md; \
print(json.dumps([{'name': d.metadata['Name'], 'version': d.version} \
for d in md.distributions() if d.metadata['Name']]))";

/// Command that runs the listing script inside the manager's environment.
pub fn inspect_command(manager: DetectedManager, ctx: &ProjectContext) -> Option<CommandSpec> {
    let cmd = match manager {
        DetectedManager::Uv => {
            CommandSpec::new("uv").args(["run", "--frozen", "--no-sync", "python"])
        }
        DetectedManager::Pdm => CommandSpec::new("pdm").args(["run", "python"]),
        DetectedManager::Poetry => CommandSpec::new("poetry").args(["run", "python"]),
        DetectedManager::Pipenv => CommandSpec::new("pipenv").args(["run", "python"]),
        DetectedManager::PipTools | DetectedManager::Pip => {
            CommandSpec::new(&ctx.config.python_interpreter)
        }
        DetectedManager::None => return None,
    };
    Some(cmd.args(["-c", LIST_DISTRIBUTIONS]).current_dir(&ctx.root))
}

/// List the distributions installed in the project environment, sorted.
pub fn inspect_environment(
    manager: DetectedManager,
    ctx: &ProjectContext,
    runner: &dyn CommandRunner,
    deadline: &Deadline,
) -> Result<Vec<Package>> {
    let cmd = inspect_command(manager, ctx).ok_or_else(|| {
        Error::SbomGeneration("no dependency manager detected; no environment to inspect".into())
    })?;

    let output = match deadline.run(runner, &cmd) {
        Ok(output) => output,
        Err(e @ Error::Timeout { .. }) => return Err(e),
        Err(e) => {
            return Err(Error::SbomGeneration(format!(
                "failed to inspect environment: {e}"
            )));
        }
    };

    if !output.success() {
        return Err(Error::SbomGeneration(format!(
            "environment inspection exited with {:?}: {}",
            output.exit_code,
            tail(&output.combined(), OUTPUT_TAIL_BYTES)
        )));
    }

    parse_listing(&output.stdout)
}

/// Parse the listing script's stdout. Tools may print banners first, so the
/// JSON is taken from the last non-empty line.
pub fn parse_listing(stdout: &str) -> Result<Vec<Package>> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::SbomGeneration("environment inspection produced no output".into()))?;

    let mut packages: Vec<Package> = serde_json::from_str(line)
        .map_err(|e| Error::SbomGeneration(format!("malformed environment listing: {e}")))?;

    sort_packages(&mut packages);
    debug!(count = packages.len(), "environment inspected");
    Ok(packages)
}
