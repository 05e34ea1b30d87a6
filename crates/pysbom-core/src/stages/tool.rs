//! Tool setup: make the detected manager's binary runnable.

use serde_json::json;
use tracing::{info, warn};

use crate::config::ProjectContext;
use crate::detect::manager::DetectedManager;
use crate::error::{Error, ErrorKind};
use crate::exec::{CommandOutput, CommandRunner, CommandSpec, Deadline};
use crate::report::model::{Stage, StageResult};
use crate::util::output::{OUTPUT_TAIL_BYTES, first_line, tail};

/// How a manager's binary is found and, if missing, installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub binary: &'static str,
    /// PyPI package that provides `binary`. `None` means verify only.
    pub package: Option<&'static str>,
}

pub fn tool_for(manager: DetectedManager) -> Option<ToolSpec> {
    let (binary, package) = match manager {
        DetectedManager::Uv => ("uv", Some("uv")),
        DetectedManager::Pdm => ("pdm", Some("pdm")),
        DetectedManager::Poetry => ("poetry", Some("poetry")),
        DetectedManager::Pipenv => ("pipenv", Some("pipenv")),
        DetectedManager::PipTools => ("pip-sync", Some("pip-tools")),
        DetectedManager::Pip => ("pip", None),
        DetectedManager::None => return None,
    };
    Some(ToolSpec { binary, package })
}

pub struct ToolInstaller<'a> {
    ctx: &'a ProjectContext,
    runner: &'a dyn CommandRunner,
}

impl<'a> ToolInstaller<'a> {
    pub fn new(ctx: &'a ProjectContext, runner: &'a dyn CommandRunner) -> Self {
        Self { ctx, runner }
    }

    pub fn ensure(&self, manager: DetectedManager) -> StageResult {
        let Some(tool) = tool_for(manager) else {
            return StageResult::ok(
                Stage::ToolSetup,
                "no dependency manager detected; nothing to install",
            );
        };

        let deadline = Deadline::start(self.ctx.config.command_timeout());

        if let Err(e) = self.check_python(&deadline) {
            return StageResult::from_error(Stage::ToolSetup, &e);
        }

        match self.probe(tool, &deadline) {
            Ok(Some(version)) => {
                info!(binary = tool.binary, %version, "tool already available");
                let message = format!("{} available: {version}", tool.binary);
                return StageResult::ok(Stage::ToolSetup, message).with_payload(json!({
                    "binary": tool.binary,
                    "version": version,
                    "installed": false,
                }));
            }
            Ok(None) => {}
            Err(e) => return StageResult::from_error(Stage::ToolSetup, &e),
        }

        let Some(package) = tool.package else {
            return StageResult::failed(
                Stage::ToolSetup,
                ErrorKind::ToolInstall,
                format!("{} is not available and cannot be installed automatically", tool.binary),
            )
            .with_payload(json!({ "binary": tool.binary }));
        };

        let cmd = CommandSpec::new(&self.ctx.config.python_interpreter)
            .args(["-m", "pip", "install", package])
            .current_dir(&self.ctx.root);
        info!(command = %cmd.display(), "installing tool");

        let output = match deadline.run(self.runner, &cmd) {
            Ok(output) => output,
            Err(e @ Error::Timeout { .. }) => return StageResult::from_error(Stage::ToolSetup, &e),
            Err(e) => {
                return StageResult::failed(
                    Stage::ToolSetup,
                    ErrorKind::ToolInstall,
                    format!("failed to run `{}`: {e}", cmd.display()),
                );
            }
        };

        if !output.success() {
            warn!(package, exit_code = ?output.exit_code, "tool installation failed");
            return StageResult::failed(
                Stage::ToolSetup,
                ErrorKind::ToolInstall,
                format!("`{}` exited with {:?}", cmd.display(), output.exit_code),
            )
            .with_payload(command_payload(&cmd, &output));
        }

        match self.probe(tool, &deadline) {
            Ok(Some(version)) => {
                let message = format!("installed {package}: {version}");
                StageResult::ok(Stage::ToolSetup, message).with_payload(json!({
                    "binary": tool.binary,
                    "version": version,
                    "installed": true,
                }))
            }
            Ok(None) => StageResult::failed(
                Stage::ToolSetup,
                ErrorKind::ToolInstall,
                format!("{package} installed but `{}` is still not runnable", tool.binary),
            ),
            Err(e) => StageResult::from_error(Stage::ToolSetup, &e),
        }
    }

    /// `Ok(Some(version))` when the tool runs, `Ok(None)` when it is missing.
    fn probe(&self, tool: ToolSpec, deadline: &Deadline) -> Result<Option<String>, Error> {
        let python = &self.ctx.config.python_interpreter;
        let cmd = match tool.package {
            None => CommandSpec::new(python).args(["-m", "pip", "--version"]),
            Some(_) => CommandSpec::new(tool.binary).arg("--version"),
        };
        let cmd = cmd.current_dir(&self.ctx.root);

        match deadline.run(self.runner, &cmd) {
            Ok(out) if out.success() => Ok(Some(
                first_line(&out.stdout)
                    .or_else(|| first_line(&out.stderr))
                    .unwrap_or_else(|| "unknown version".into()),
            )),
            Ok(_) => Ok(None),
            Err(e @ Error::Timeout { .. }) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Warn when the interpreter does not match the requested Python version.
    /// Only a timeout is an error.
    fn check_python(&self, deadline: &Deadline) -> Result<(), Error> {
        let cmd = CommandSpec::new(&self.ctx.config.python_interpreter).arg("--version");
        let wanted = self.ctx.config.python_version.trim();
        match deadline.run(self.runner, &cmd) {
            Ok(out) if out.success() => {
                let reported = first_line(&out.stdout)
                    .or_else(|| first_line(&out.stderr))
                    .unwrap_or_default();
                if !python_matches(&reported, wanted) {
                    warn!(
                        %reported,
                        wanted,
                        "python interpreter does not match requested version"
                    );
                }
            }
            Err(e @ Error::Timeout { .. }) => return Err(e),
            _ => warn!(
                interpreter = %self.ctx.config.python_interpreter,
                "could not query python version"
            ),
        }
        Ok(())
    }
}

/// `"Python 3.12.4"` matches `"3.12"` and `"3.12.4"`, but not `"3.1"`.
fn python_matches(reported: &str, wanted: &str) -> bool {
    let version = reported.trim().trim_start_matches("Python").trim();
    version == wanted || version.starts_with(&format!("{wanted}."))
}

pub(crate) fn command_payload(cmd: &CommandSpec, output: &CommandOutput) -> serde_json::Value {
    json!({
        "command": cmd.display(),
        "exit_code": output.exit_code,
        "output": tail(&output.combined(), OUTPUT_TAIL_BYTES),
    })
}
