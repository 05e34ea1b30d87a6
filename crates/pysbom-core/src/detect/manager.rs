use serde::{Deserialize, Serialize};

/// The dependency manager that governs a project tree.
///
/// `None` is a valid classification, not an error: it means no supported
/// manager's files were found.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DetectedManager {
    Uv,
    Pdm,
    Poetry,
    Pipenv,
    PipTools,
    Pip,
    None,
}

impl DetectedManager {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectedManager::Uv => "uv",
            DetectedManager::Pdm => "pdm",
            DetectedManager::Poetry => "poetry",
            DetectedManager::Pipenv => "pipenv",
            DetectedManager::PipTools => "pip-tools",
            DetectedManager::Pip => "pip",
            DetectedManager::None => "none",
        }
    }

    pub fn is_none(self) -> bool {
        self == DetectedManager::None
    }
}

impl std::fmt::Display for DetectedManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
