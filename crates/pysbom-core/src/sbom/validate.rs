//! Structural validation of generated SBOM documents.
//!
//! Checks are limited to well-formedness and CycloneDX shape: the format
//! marker, the requested spec version, and that every component is named.
//! Component counts include nested components.

use std::fs;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::SbomFormat;
use crate::error::{Error, Result};
use crate::report::model::{SbomArtifact, Stage, StageResult};
use crate::sbom::cyclonedx::{BOM_FORMAT, xml_namespace};

/// Validated copy of an artifact plus the stage log entry for it.
#[derive(Debug, Clone)]
pub struct Validated {
    pub artifact: SbomArtifact,
    pub result: StageResult,
}

pub struct SbomValidator {
    spec_version: String,
}

impl SbomValidator {
    pub fn new(spec_version: impl Into<String>) -> Self {
        Self {
            spec_version: spec_version.into(),
        }
    }

    /// Return a copy of `artifact` with count, validity and fingerprint set.
    pub fn validate(&self, artifact: &SbomArtifact) -> Validated {
        let mut checked = artifact.clone();

        let bytes = match fs::read(&artifact.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                checked.valid = Some(false);
                checked.component_count = Some(0);
                let path = artifact.path.display();
                let err = Error::Validation(format!("cannot read {path}: {e}"));
                return Validated {
                    artifact: checked,
                    result: StageResult::from_error(Stage::Validating, &err),
                };
            }
        };

        checked.size_bytes = Some(bytes.len() as u64);
        checked.sha256 = Some(hex::encode(Sha256::digest(&bytes)));

        let counted = match std::str::from_utf8(&bytes) {
            Ok(text) => match artifact.format {
                SbomFormat::Json => self.check_json(text),
                SbomFormat::Xml => self.check_xml(text),
            },
            Err(e) => Err(Error::Validation(format!("document is not UTF-8: {e}"))),
        };

        match counted {
            Ok(count) => {
                info!(format = %artifact.format, count, "sbom valid");
                checked.valid = Some(true);
                checked.component_count = Some(count);
                let result = StageResult::ok(
                    Stage::Validating,
                    format!("{} valid with {count} components", artifact.path.display()),
                )
                .with_payload(json!({
                    "format": artifact.format,
                    "path": artifact.path.display().to_string(),
                    "components": count,
                    "sha256": checked.sha256,
                }));
                Validated {
                    artifact: checked,
                    result,
                }
            }
            Err(e) => {
                warn!(format = %artifact.format, error = %e, "sbom invalid");
                checked.valid = Some(false);
                checked.component_count = Some(0);
                Validated {
                    artifact: checked,
                    result: StageResult::from_error(Stage::Validating, &e)
                        .with_payload(json!({ "format": artifact.format })),
                }
            }
        }
    }

    fn check_json(&self, text: &str) -> Result<usize> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| Error::Validation(format!("malformed JSON: {e}")))?;

        if doc.get("bomFormat").and_then(Value::as_str) != Some(BOM_FORMAT) {
            return Err(Error::Validation("bomFormat must be \"CycloneDX\"".into()));
        }

        let version = doc.get("specVersion").and_then(Value::as_str);
        if version != Some(self.spec_version.as_str()) {
            return Err(Error::Validation(format!(
                "specVersion {:?} does not match requested {}",
                version, self.spec_version
            )));
        }

        match doc.get("components") {
            None => Ok(0),
            Some(components) => count_json_components(components),
        }
    }

    fn check_xml(&self, text: &str) -> Result<usize> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| Error::Validation(format!("malformed XML: {e}")))?;

        let root = doc.root_element();
        let expected_ns = xml_namespace(&self.spec_version);
        if root.tag_name().name() != "bom" {
            return Err(Error::Validation(format!(
                "root element must be <bom>, found <{}>",
                root.tag_name().name()
            )));
        }
        if root.tag_name().namespace() != Some(expected_ns.as_str()) {
            return Err(Error::Validation(format!(
                "namespace {:?} does not match {expected_ns}",
                root.tag_name().namespace()
            )));
        }

        let mut count = 0;
        for node in root.descendants().filter(|n| n.has_tag_name("component")) {
            // Components under <metadata> describe the subject or tools, not dependencies.
            if node.ancestors().any(|a| a.has_tag_name("metadata")) {
                continue;
            }
            if !node.parent().is_some_and(|p| p.has_tag_name("components")) {
                continue;
            }
            let named = node
                .children()
                .any(|c| c.has_tag_name("name") && c.text().is_some_and(|t| !t.trim().is_empty()));
            if !named {
                return Err(Error::Validation("component without a name".into()));
            }
            count += 1;
        }
        Ok(count)
    }
}

fn count_json_components(components: &Value) -> Result<usize> {
    let list = components
        .as_array()
        .ok_or_else(|| Error::Validation("components must be an array".into()))?;

    let mut count = 0;
    for c in list {
        let named = c
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|n| !n.trim().is_empty());
        if !named {
            return Err(Error::Validation("component without a name".into()));
        }
        count += 1;
        if let Some(nested) = c.get("components") {
            count += count_json_components(nested)?;
        }
    }
    Ok(count)
}
