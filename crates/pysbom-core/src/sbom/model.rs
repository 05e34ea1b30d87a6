use serde::{Deserialize, Serialize};

use crate::util::deterministic::normalize_name;

/// An installed distribution as reported by the environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub version: String,
}

impl Package {
    /// Package URL per the purl `pypi` type: normalized name, version as-is.
    pub fn purl(&self) -> String {
        format!("pkg:pypi/{}@{}", normalize_name(&self.name), self.version)
    }
}
