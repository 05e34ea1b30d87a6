//! Dependency installation for the detected manager.
//!
//! This is the only stage with side effects that are hard to undo, so every
//! result carries the command line, exit code and output tail.

use serde_json::json;
use tracing::{info, warn};

use crate::config::ProjectContext;
use crate::detect::manager::DetectedManager;
use crate::detect::probe::FileProbe;
use crate::detect::rules::REQUIREMENTS_TXT;
use crate::error::{Error, ErrorKind};
use crate::exec::{CommandRunner, CommandSpec, Deadline};
use crate::report::model::{Stage, StageResult};
use crate::stages::tool::command_payload;

pub const REQUIREMENTS_DEV_TXT: &str = "requirements-dev.txt";

/// Build the install invocation for `manager`.
///
/// `None` for [`DetectedManager::None`]. Dev requirements for pip and
/// pip-tools are only added when `requirements-dev.txt` exists.
pub fn install_command(
    manager: DetectedManager,
    ctx: &ProjectContext,
    include_dev: bool,
) -> Option<CommandSpec> {
    let python = ctx.config.python_version.trim();
    let probe = FileProbe::new(&ctx.root);
    let has_dev_requirements = include_dev && probe.exists(REQUIREMENTS_DEV_TXT);

    let cmd = match manager {
        DetectedManager::Uv => {
            let cmd = CommandSpec::new("uv").args(["sync", "--frozen", "--python", python]);
            if include_dev { cmd } else { cmd.arg("--no-dev") }
        }
        DetectedManager::Pdm => CommandSpec::new("pdm")
            .args(["install", "--frozen-lockfile"])
            .arg(if include_dev { "--dev" } else { "--prod" }),
        DetectedManager::Poetry => {
            let cmd = CommandSpec::new("poetry").args(["install", "--no-root"]);
            if include_dev { cmd } else { cmd.args(["--only", "main"]) }
        }
        DetectedManager::Pipenv => {
            let cmd = CommandSpec::new("pipenv").args(["install", "--deploy", "--python", python]);
            if include_dev { cmd.arg("--dev") } else { cmd }
        }
        DetectedManager::PipTools => {
            let cmd = CommandSpec::new("pip-sync")
                .arg("--python-executable")
                .arg(&ctx.config.python_interpreter)
                .arg(REQUIREMENTS_TXT);
            if has_dev_requirements { cmd.arg(REQUIREMENTS_DEV_TXT) } else { cmd }
        }
        DetectedManager::Pip => {
            let cmd = CommandSpec::new(&ctx.config.python_interpreter)
                .args(["-m", "pip", "install", "-r", REQUIREMENTS_TXT]);
            if has_dev_requirements {
                cmd.args(["-r", REQUIREMENTS_DEV_TXT])
            } else {
                cmd
            }
        }
        DetectedManager::None => return None,
    };

    Some(cmd.current_dir(&ctx.root))
}

pub struct DependencyInstaller<'a> {
    ctx: &'a ProjectContext,
    runner: &'a dyn CommandRunner,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(ctx: &'a ProjectContext, runner: &'a dyn CommandRunner) -> Self {
        Self { ctx, runner }
    }

    pub fn install(&self, manager: DetectedManager, include_dev: bool) -> StageResult {
        let Some(cmd) = install_command(manager, self.ctx, include_dev) else {
            return StageResult::ok(
                Stage::Installing,
                "no dependency manager detected; nothing to install",
            );
        };

        info!(command = %cmd.display(), include_dev, "installing dependencies");

        let deadline = Deadline::start(self.ctx.config.command_timeout());
        let output = match deadline.run(self.runner, &cmd) {
            Ok(output) => output,
            Err(e @ Error::Timeout { .. }) => {
                return StageResult::from_error(Stage::Installing, &e)
                    .with_payload(json!({ "command": cmd.display() }));
            }
            Err(e) => {
                return StageResult::failed(
                    Stage::Installing,
                    ErrorKind::DependencyInstall,
                    format!("failed to run `{}`: {e}", cmd.display()),
                )
                .with_payload(json!({ "command": cmd.display() }));
            }
        };

        if !output.success() {
            warn!(
                command = %cmd.display(),
                exit_code = ?output.exit_code,
                "dependency installation failed"
            );
            return StageResult::failed(
                Stage::Installing,
                ErrorKind::DependencyInstall,
                format!("`{}` exited with {:?}", cmd.display(), output.exit_code),
            )
            .with_payload(command_payload(&cmd, &output));
        }

        StageResult::ok(
            Stage::Installing,
            format!("installed dependencies with {manager}"),
        )
        .with_payload(command_payload(&cmd, &output))
    }
}
