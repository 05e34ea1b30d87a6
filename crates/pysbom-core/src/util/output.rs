//! Helpers for keeping subprocess output in stage payloads bounded.

/// Maximum bytes of process output kept in a stage payload.
pub const OUTPUT_TAIL_BYTES: usize = 4096;

/// Keep the last `max` bytes of `s`, cut on a char boundary.
///
/// Installers print their errors last, so the tail is what matters.
pub fn tail(s: &str, max: usize) -> String {
    let s = s.trim_end();
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &s[start..])
}

/// First non-empty line, trimmed. Used to pull versions out of `--version` output.
pub fn first_line(s: &str) -> Option<String> {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
