//! Flattening of a possibly multi-candidate, multi-part response into a
//! single display string.
//!
//! The concatenation format is externally observable and must stay stable:
//! clients parse it, and the operations endpoint feeds it to a shell.

use std::fmt::Write;

use crate::types::{Content, GenerateResponse};

/// Flatten a full response.
///
/// When more than one candidate is present, each candidate's text is prefixed
/// with its 1-based index and a colon; candidates are concatenated with no
/// separator in between.
pub fn render_response(resp: &GenerateResponse) -> String {
    let mut out = String::new();
    let multi = resp.candidates.len() > 1;
    for (i, candidate) in resp.candidates.iter().enumerate() {
        if multi {
            let _ = write!(out, "{}:", i + 1);
        }
        out.push_str(&render_content(candidate.content.as_ref()));
    }
    out
}

/// Flatten one candidate's content: parts joined with `";"`, missing content
/// or missing text rendered as the empty string.
pub fn render_content(content: Option<&Content>) -> String {
    match content {
        None => String::new(),
        Some(c) => c
            .parts
            .iter()
            .map(|p| p.text.as_deref().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(";"),
    }
}
