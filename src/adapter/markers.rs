//! Inline marker scanning
//!
//! Markers are found line by line in the raw text, independent of the
//! syntax tree, so they are reported even inside strings.

use crate::model::{MarkerKind, MarkerRecord};
use regex::Regex;
use std::sync::OnceLock;

static MARKER_RE: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_RE.get_or_init(|| {
        Regex::new(r"(?i)#\s*(TODO|FIXME|XXX):\s*(.+)").expect("marker pattern is valid")
    })
}

/// Scan `content` for `# TODO: ...` style comments. The colon is mandatory.
pub fn scan_markers(path: &str, content: &str) -> Vec<MarkerRecord> {
    let re = marker_regex();
    let mut markers = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let Some(caps) = re.captures(line) else {
            continue;
        };
        // The alternation only admits recognized kinds.
        let Ok(kind) = caps[1].parse::<MarkerKind>() else {
            continue;
        };
        markers.push(MarkerRecord {
            kind,
            message: caps[2].trim().to_string(),
            file: path.to_string(),
            line: (i + 1) as u32,
        });
    }

    markers
}
