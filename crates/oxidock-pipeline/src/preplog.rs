//! Read the derived docking box back from the receptor-preparation log.
//!
//! The preparation tool derives the search cavity from the reference ligand
//! and writes the six box scalars into its log. Rather than asking an
//! operator to transcribe them into the docking configuration by hand, the
//! orchestrator scans the log text for them.

use regex::Regex;

use oxidock_common::SearchBox;

/// Find one scalar in the log. Accepts `center_x: 17.8`, `center_x = 17.8`,
/// and the flag form `--center_x 17.8`; the last occurrence wins, as the
/// tool logs the final box after any refinement passes.
fn grab(log_text: &str, key: &str) -> Option<f64> {
    let pattern = format!(r"{key}\s*[:=]?\s*(-?[0-9]+(?:\.[0-9]+)?)");
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(log_text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract a complete search box from the preparation log text.
/// Returns None unless all six scalars are present.
pub fn extract_search_box(log_text: &str) -> Option<SearchBox> {
    Some(SearchBox {
        center_x: grab(log_text, "center_x")?,
        center_y: grab(log_text, "center_y")?,
        center_z: grab(log_text, "center_z")?,
        size_x: grab(log_text, "size_x")?,
        size_y: grab(log_text, "size_y")?,
        size_z: grab(log_text, "size_z")?,
    })
}
