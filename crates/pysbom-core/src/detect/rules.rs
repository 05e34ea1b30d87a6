//! Dependency-manager detection.
//!
//! Classification is a first-match walk over an ordered rule table. The order
//! is the policy: lock files are unambiguous ownership signals and outrank the
//! content-based `requirements.txt` heuristics, and when several lock files
//! coexist the higher-priority tool wins.
//!
//!   1. uv.lock                                         → uv
//!   2. pdm.lock                                        → pdm
//!   3. poetry.lock                                     → poetry
//!   4. Pipfile.lock                                    → pipenv
//!   5. requirements.txt with `==` or requirements.in   → pip-tools
//!   6. requirements.txt                                → pip
//!   7. nothing matched                                 → none
//!
//! An empty or comment-only `requirements.txt` still means pip; only a
//! missing file falls through to `none`.

use serde::Serialize;
use tracing::debug;

use crate::detect::manager::DetectedManager;
use crate::detect::probe::FileProbe;
use crate::error::Result;

pub const REQUIREMENTS_TXT: &str = "requirements.txt";
pub const REQUIREMENTS_IN: &str = "requirements.in";

/// One entry of the detection table.
pub struct Rule {
    pub manager: DetectedManager,
    /// File whose presence this rule keys on.
    pub signal: &'static str,
    matches: fn(&FileProbe) -> bool,
}

impl Rule {
    pub fn matches(&self, probe: &FileProbe) -> bool {
        (self.matches)(probe)
    }
}

fn has_uv_lock(p: &FileProbe) -> bool {
    p.exists("uv.lock")
}

fn has_pdm_lock(p: &FileProbe) -> bool {
    p.exists("pdm.lock")
}

fn has_poetry_lock(p: &FileProbe) -> bool {
    p.exists("poetry.lock")
}

fn has_pipfile_lock(p: &FileProbe) -> bool {
    p.exists("Pipfile.lock")
}

fn is_pip_compiled(p: &FileProbe) -> bool {
    p.exists(REQUIREMENTS_TXT)
        && (p.contains_substring(REQUIREMENTS_TXT, "==") || p.exists(REQUIREMENTS_IN))
}

fn has_requirements(p: &FileProbe) -> bool {
    p.exists(REQUIREMENTS_TXT)
}

/// Detection rules in priority order.
pub static RULES: [Rule; 6] = [
    Rule {
        manager: DetectedManager::Uv,
        signal: "uv.lock",
        matches: has_uv_lock,
    },
    Rule {
        manager: DetectedManager::Pdm,
        signal: "pdm.lock",
        matches: has_pdm_lock,
    },
    Rule {
        manager: DetectedManager::Poetry,
        signal: "poetry.lock",
        matches: has_poetry_lock,
    },
    Rule {
        manager: DetectedManager::Pipenv,
        signal: "Pipfile.lock",
        matches: has_pipfile_lock,
    },
    Rule {
        manager: DetectedManager::PipTools,
        signal: REQUIREMENTS_TXT,
        matches: is_pip_compiled,
    },
    Rule {
        manager: DetectedManager::Pip,
        signal: REQUIREMENTS_TXT,
        matches: has_requirements,
    },
];

/// Outcome of a detection pass.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Detection {
    pub manager: DetectedManager,
    /// File that decided the match; `None` when nothing matched.
    pub signal: Option<&'static str>,
}

/// Classify the project rooted at `probe` into exactly one manager.
///
/// Fails only when the root itself is missing or unreadable.
pub fn detect(probe: &FileProbe) -> Result<Detection> {
    probe.check_root()?;

    for rule in RULES.iter() {
        if rule.matches(probe) {
            debug!(manager = %rule.manager, signal = rule.signal, "detection rule matched");
            return Ok(Detection {
                manager: rule.manager,
                signal: Some(rule.signal),
            });
        }
    }

    debug!(root = %probe.root().display(), "no detection rule matched");
    Ok(Detection {
        manager: DetectedManager::None,
        signal: None,
    })
}
