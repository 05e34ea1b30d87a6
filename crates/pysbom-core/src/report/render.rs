use crate::TOOL_NAME;
use crate::report::model::{PipelineOutcome, StageStatus};

pub fn render_text(outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, env!("CARGO_PKG_VERSION")));
    out.push_str(&format!(
        "Dependency manager: {}\n",
        outcome.dependency_manager
    ));
    out.push_str(&format!(
        "Result: {}\n",
        match (outcome.success, outcome.cancelled) {
            (_, true) => "cancelled",
            (true, false) => "success",
            (false, false) => "failed",
        }
    ));
    if !outcome.sbom_json_path.is_empty() {
        out.push_str(&format!("SBOM (json): {}\n", outcome.sbom_json_path));
    }
    if !outcome.sbom_xml_path.is_empty() {
        out.push_str(&format!("SBOM (xml): {}\n", outcome.sbom_xml_path));
    }
    out.push_str(&format!("Components: {}\n", outcome.component_count));
    out.push_str("Stages:\n");
    for s in &outcome.stages {
        let mark = match s.status {
            StageStatus::Ok => "ok",
            StageStatus::Failed => "FAILED",
            StageStatus::Skipped => "skipped",
        };
        out.push_str(&format!("  - {} [{}] {}\n", s.stage, mark, s.message));
    }
    out
}
