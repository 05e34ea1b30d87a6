//! Deterministic ordering helpers.
//!
//! Component order in generated documents must not depend on the order the
//! interpreter happened to enumerate distributions in.

use crate::sbom::model::Package;

/// PEP 503 normalized project name: lowercase, runs of `-`, `_`, `.` become `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Sort packages by `(normalized name, version)` and drop exact duplicates.
///
/// The same distribution can be listed twice when it is visible on more than
/// one `sys.path` entry.
pub fn sort_packages(packages: &mut Vec<Package>) {
    packages.sort_by(|a, b| {
        (normalize_name(&a.name), a.version.as_str())
            .cmp(&(normalize_name(&b.name), b.version.as_str()))
    });
    packages.dedup_by(|a, b| {
        normalize_name(&a.name) == normalize_name(&b.name) && a.version == b.version
    });
}
