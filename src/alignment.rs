//! In-memory model of one BLAST alignment report.
//!
//! The report is built once per submission by `blast_xml` and is not mutated
//! afterwards. Zero candidates is a valid (empty) report, not an error.

use crate::error::MutFindError;
use serde::Serialize;

/// Expectation-value cutoff below which a segment is worth inspecting.
/// Segments at or above this are statistically indistinguishable from chance.
pub const DEFAULT_EXPECT_THRESHOLD: f64 = 1.0;

/// Midline character BLAST uses for an identical aligned position.
pub const MATCH_MARKER: char = '|';

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentReport {
    pub candidates: Vec<AlignmentCandidate>,
}

impl AlignmentReport {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// One candidate reference match, with its locally-aligned segments in the
/// order the service reported them (best score first).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentCandidate {
    pub title: String,
    pub length: usize,
    pub segments: Vec<Segment>,
}

impl AlignmentCandidate {
    /// Segments with `expect` strictly below `threshold`, in parser order.
    pub fn significant_segments(&self, threshold: f64) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.expect < threshold)
    }
}

/// A single high-scoring segment pair (HSP): query and subject aligned over
/// the same span, with a per-position midline match track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Segment {
    pub expect: f64,
    pub identities: usize,
    pub align_length: usize,
    pub query_aligned: String,
    pub match_track: String,
    pub subject_aligned: String,
}

impl Segment {
    /// The three aligned strings must cover the same positions. A segment
    /// violating this is skipped by the renderer, not fatal for the report.
    pub fn validate(&self) -> Result<(), MutFindError> {
        let q = self.query_aligned.chars().count();
        let m = self.match_track.chars().count();
        let s = self.subject_aligned.chars().count();
        if q == m && m == s {
            Ok(())
        } else {
            Err(MutFindError::MalformedReport(format!(
                "aligned string lengths disagree (query {q}, match {m}, subject {s})"
            )))
        }
    }
}

/// Trims the raw input sequence. The alignment service is trusted to reject
/// bad symbols, so no alphabet validation happens here.
pub fn normalize_sequence(raw: &str) -> Result<String, MutFindError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MutFindError::EmptyInput);
    }
    Ok(trimmed.to_string())
}
