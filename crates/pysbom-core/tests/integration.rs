use pysbom_core::config::{Config, FormatSelection, SbomFormat};
use pysbom_core::detect::{DetectedManager, FileProbe, detect};
use pysbom_core::error::{ErrorKind, Result};
use pysbom_core::exec::{CommandOutput, CommandRunner, CommandSpec};
use pysbom_core::pipeline::PipelineController;
use pysbom_core::report::model::{PipelineOutcome, Stage, StageStatus};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Stands in for a package manager and its interpreter.
///
/// Every command succeeds, the listing script reports `packages`, and the
/// install command of `fail_install` exits non-zero.
struct ScriptedToolchain {
    packages: Vec<(&'static str, &'static str)>,
    fail_install: Option<&'static str>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedToolchain {
    fn with_packages(packages: &[(&'static str, &'static str)]) -> Self {
        Self {
            packages: packages.to_vec(),
            fail_install: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(CommandSpec::display).collect()
    }
}

impl CommandRunner for ScriptedToolchain {
    fn run(&self, cmd: &CommandSpec, _timeout: Option<Duration>) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());

        let probing = cmd.args.iter().any(|a| a == "--version");
        let installing = !probing
            && (matches!(cmd.args.first().map(String::as_str), Some("install" | "sync"))
                || cmd.program == "pip-sync"
                || cmd.args.iter().any(|a| a == "-r"));
        if installing && self.fail_install == Some(cmd.program.as_str()) {
            return Ok(CommandOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "ERROR: Could not find a version that satisfies the requirement".into(),
            });
        }

        let stdout = if cmd.args.iter().any(|a| a == "-c") {
            let listing: Vec<_> = self
                .packages
                .iter()
                .map(|(name, version)| serde_json::json!({"name": name, "version": version}))
                .collect();
            serde_json::to_string(&listing).unwrap()
        } else if cmd.args == ["--version"] && cmd.program == "python3" {
            "Python 3.12.3".to_string()
        } else {
            format!("{} ok", cmd.program)
        };

        Ok(CommandOutput {
            exit_code: Some(0),
            stdout,
            stderr: String::new(),
        })
    }
}

fn write_project(dir: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn run_in(
    files: &[(&str, &str)],
    tweak: impl FnOnce(&mut Config),
    runner: &ScriptedToolchain,
) -> (PipelineOutcome, TempDir, TempDir) {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_project(root.path(), files);

    let mut config = Config {
        path_prefix: root.path().to_path_buf(),
        output_directory: out.path().to_path_buf(),
        ..Default::default()
    };
    tweak(&mut config);

    let outcome = PipelineController::new(config, runner).run();
    (outcome, root, out)
}

const PIP_COMPILED: &str = "# This file is autogenerated by pip-compile with Python 3.12
#    pip-compile requirements.in
#
certifi==2024.2.2
    # via requests
requests==2.31.0
    # via -r requirements.in
";

#[test]
fn poetry_project_yields_two_valid_artifacts() {
    let runner = ScriptedToolchain::with_packages(&[
        ("requests", "2.31.0"),
        ("Django", "4.2.11"),
        ("psycopg2-binary", "2.9.9"),
        ("certifi", "2024.2.2"),
    ]);
    let files = [("poetry.lock", ""), ("pyproject.toml", "")];
    let (outcome, _root, out) = run_in(&files, |_| {}, &runner);

    assert!(outcome.success, "stages: {:#?}", outcome.stages);
    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.dependency_manager, DetectedManager::Poetry);
    assert_eq!(outcome.artifacts.len(), 2);

    let formats: Vec<_> = outcome.artifacts.iter().map(|a| a.format).collect();
    assert_eq!(formats, vec![SbomFormat::Json, SbomFormat::Xml]);
    assert!(outcome.artifacts.iter().all(|a| a.valid == Some(true)));
    assert_eq!(outcome.component_count, 4);

    assert_eq!(
        Path::new(&outcome.sbom_json_path),
        out.path().join("sbom-cyclonedx.json")
    );
    assert_eq!(
        Path::new(&outcome.sbom_xml_path),
        out.path().join("sbom-cyclonedx.xml")
    );

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&outcome.sbom_json_path).unwrap()).unwrap();
    let names: Vec<&str> = json["components"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["certifi", "Django", "psycopg2-binary", "requests"]);

    assert!(
        runner
            .command_lines()
            .contains(&"poetry install --no-root --only main".to_string())
    );
}

#[test]
fn pip_tools_install_failure_in_continue_mode() {
    let runner = ScriptedToolchain {
        fail_install: Some("pip-sync"),
        ..ScriptedToolchain::with_packages(&[("requests", "2.31.0")])
    };
    let (outcome, _root, out) = run_in(
        &[("requirements.in", "requests\n"), ("requirements.txt", PIP_COMPILED)],
        |c| c.fail_on_error = false,
        &runner,
    );

    assert_eq!(outcome.dependency_manager, DetectedManager::PipTools);
    assert_eq!(outcome.exit_code, 0, "continue mode must exit successfully");
    assert!(!outcome.success);

    let failures: Vec<_> = outcome.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].stage, Stage::Installing);
    assert_eq!(failures[0].error, Some(ErrorKind::DependencyInstall));

    assert!(outcome.artifacts.is_empty());
    assert!(outcome.sbom_json_path.is_empty());
    let generating = outcome.stage_results(Stage::Generating).next().unwrap();
    assert_eq!(generating.status, StageStatus::Skipped);
    assert!(fs::read_dir(out.path()).unwrap().next().is_none());
}

#[test]
fn no_supported_manager_reports_success() {
    let runner = ScriptedToolchain::with_packages(&[]);
    let (outcome, _root, _out) = run_in(&[("setup.py", ""), ("main.py", "")], |_| {}, &runner);

    assert!(outcome.success);
    assert_eq!(outcome.dependency_manager, DetectedManager::None);
    assert!(outcome.artifacts.is_empty());
    assert_eq!(outcome.component_count, 0);
    assert!(runner.calls.borrow().is_empty());
    assert!(
        outcome
            .stages
            .iter()
            .any(|s| s.message == "no supported dependency manager found")
    );
}

#[test]
fn empty_requirements_still_installs_with_pip() {
    let runner = ScriptedToolchain::with_packages(&[]);
    let files = [("requirements.txt", "# no deps yet\n")];
    let (outcome, _root, _out) = run_in(&files, |_| {}, &runner);

    assert!(outcome.success, "stages: {:#?}", outcome.stages);
    assert_eq!(outcome.dependency_manager, DetectedManager::Pip);
    assert_eq!(outcome.component_count, 0);
    assert!(
        runner
            .command_lines()
            .contains(&"python3 -m pip install -r requirements.txt".to_string())
    );
}

#[test]
fn include_dev_changes_install_command() {
    let runner = ScriptedToolchain::with_packages(&[("pytest", "8.1.1")]);
    let (outcome, _root, _out) = run_in(&[("uv.lock", "")], |c| c.include_dev = true, &runner);

    assert!(outcome.success);
    let lines = runner.command_lines();
    assert!(lines.contains(&"uv sync --frozen --python 3.12".to_string()));
    assert!(!lines.iter().any(|l| l.contains("--no-dev")));
}

#[test]
fn fail_fast_records_skipped_stages() {
    let runner = ScriptedToolchain {
        fail_install: Some("pipenv"),
        ..ScriptedToolchain::with_packages(&[])
    };
    let (outcome, _root, _out) = run_in(&[("Pipfile.lock", "{}")], |_| {}, &runner);

    assert_eq!(outcome.exit_code, 1);
    let statuses: Vec<_> = outcome.stages.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            StageStatus::Ok,
            StageStatus::Ok,
            StageStatus::Failed,
            StageStatus::Skipped,
            StageStatus::Skipped,
            StageStatus::Skipped,
        ]
    );
}

#[test]
fn custom_prefix_and_single_format() {
    let runner = ScriptedToolchain::with_packages(&[("fastapi", "0.110.0")]);
    let (outcome, _root, out) = run_in(
        &[("pdm.lock", "")],
        |c| {
            c.filename_prefix = "bom".into();
            c.sbom_format = FormatSelection::Json;
            c.sbom_spec_version = "1.6".into();
        },
        &runner,
    );

    assert!(outcome.success);
    assert_eq!(outcome.artifacts.len(), 1);
    assert!(out.path().join("bom.json").is_file());
    assert!(!out.path().join("bom.xml").exists());
    assert!(outcome.sbom_xml_path.is_empty());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("bom.json")).unwrap()).unwrap();
    assert_eq!(json["specVersion"], "1.6");
}

#[test]
fn detection_priority_across_all_adjacent_pairs() {
    let cases: &[(&[(&str, &str)], DetectedManager)] = &[
        (&[("uv.lock", ""), ("pdm.lock", "")], DetectedManager::Uv),
        (&[("pdm.lock", ""), ("poetry.lock", "")], DetectedManager::Pdm),
        (&[("poetry.lock", ""), ("Pipfile.lock", "")], DetectedManager::Poetry),
        (&[("Pipfile.lock", ""), ("requirements.txt", "a==1")], DetectedManager::Pipenv),
        (&[("requirements.txt", "a==1")], DetectedManager::PipTools),
        (&[("requirements.txt", "a>=1")], DetectedManager::Pip),
        (&[], DetectedManager::None),
    ];

    for (files, expected) in cases {
        let dir = TempDir::new().unwrap();
        write_project(dir.path(), files);
        let probe = FileProbe::new(dir.path());
        let first = detect(&probe).unwrap();
        let second = detect(&probe).unwrap();
        assert_eq!(first.manager, *expected, "files: {files:?}");
        assert_eq!(first, second);
    }
}

#[test]
fn outcome_serializes_result_surface() {
    let runner = ScriptedToolchain::with_packages(&[("click", "8.1.7")]);
    let (outcome, _root, _out) = run_in(&[("uv.lock", "")], |_| {}, &runner);

    let v = serde_json::to_value(&outcome).unwrap();
    assert_eq!(v["dependency_manager"], "uv");
    assert_eq!(v["component_count"], 1);
    assert!(v["sbom_json_path"].as_str().unwrap().ends_with("sbom-cyclonedx.json"));
    let stages = v["stages"].as_array().unwrap();
    assert_eq!(stages.first().unwrap()["stage"], "detecting");
    assert_eq!(stages.last().unwrap()["stage"], "reporting");
    assert!(stages.iter().all(|s| s["status"] == "ok"));
}
