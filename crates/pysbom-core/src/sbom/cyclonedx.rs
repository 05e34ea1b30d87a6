//! CycloneDX document rendering.
//!
//! JSON goes through serde; XML is written directly since the document shape
//! is small and fixed. Both renderings of the same [`Bom`] list the same
//! components in the same order.

use serde::Serialize;

use crate::TOOL_NAME;
use crate::error::{Error, Result};
use crate::sbom::model::Package;

pub const BOM_FORMAT: &str = "CycloneDX";

/// XML namespace for a given spec version.
pub fn xml_namespace(spec_version: &str) -> String {
    format!("http://cyclonedx.org/schema/bom/{spec_version}")
}

fn json_schema_url(spec_version: &str) -> String {
    format!("http://cyclonedx.org/schema/bom-{spec_version}.schema.json")
}

/// Format-independent BOM content.
#[derive(Debug, Clone)]
pub struct Bom {
    pub spec_version: String,
    pub timestamp: String,
    pub packages: Vec<Package>,
}

impl Bom {
    pub fn new(spec_version: impl Into<String>, packages: Vec<Package>) -> Self {
        Self {
            spec_version: spec_version.into(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            packages,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let components = self
            .packages
            .iter()
            .map(|p| {
                let purl = p.purl();
                JsonComponent {
                    component_type: "library",
                    bom_ref: purl.clone(),
                    name: &p.name,
                    version: &p.version,
                    purl,
                }
            })
            .collect();

        let bom = JsonBom {
            schema: json_schema_url(&self.spec_version),
            bom_format: BOM_FORMAT,
            spec_version: &self.spec_version,
            version: 1,
            metadata: JsonMetadata {
                timestamp: &self.timestamp,
                tools: vec![JsonTool {
                    name: TOOL_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                }],
            },
            components,
        };

        serde_json::to_string_pretty(&bom)
            .map_err(|e| Error::SbomGeneration(format!("CycloneDX JSON serialization failed: {e}")))
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<bom xmlns=\"{}\" version=\"1\">\n",
            xml_namespace(&self.spec_version)
        ));
        out.push_str("  <metadata>\n");
        out.push_str(&format!("    <timestamp>{}</timestamp>\n", escape(&self.timestamp)));
        out.push_str("    <tools>\n      <tool>\n");
        out.push_str(&format!("        <name>{TOOL_NAME}</name>\n"));
        out.push_str(&format!("        <version>{}</version>\n", env!("CARGO_PKG_VERSION")));
        out.push_str("      </tool>\n    </tools>\n");
        out.push_str("  </metadata>\n");
        out.push_str("  <components>\n");
        for p in &self.packages {
            let purl = escape(&p.purl());
            out.push_str(&format!("    <component type=\"library\" bom-ref=\"{purl}\">\n"));
            out.push_str(&format!("      <name>{}</name>\n", escape(&p.name)));
            out.push_str(&format!("      <version>{}</version>\n", escape(&p.version)));
            out.push_str(&format!("      <purl>{purl}</purl>\n"));
            out.push_str("    </component>\n");
        }
        out.push_str("  </components>\n");
        out.push_str("</bom>\n");
        out
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonBom<'a> {
    #[serde(rename = "$schema")]
    schema: String,
    bom_format: &'static str,
    spec_version: &'a str,
    version: u32,
    metadata: JsonMetadata<'a>,
    components: Vec<JsonComponent<'a>>,
}

#[derive(Serialize)]
struct JsonMetadata<'a> {
    timestamp: &'a str,
    tools: Vec<JsonTool>,
}

#[derive(Serialize)]
struct JsonTool {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct JsonComponent<'a> {
    #[serde(rename = "type")]
    component_type: &'static str,
    #[serde(rename = "bom-ref")]
    bom_ref: String,
    name: &'a str,
    version: &'a str,
    purl: String,
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
