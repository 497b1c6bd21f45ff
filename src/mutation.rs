//! Mismatch extraction and mutation descriptors.
//!
//! A mismatch is any aligned position whose midline character is not the
//! BLAST match marker. Positions in descriptors are aligned-segment-local:
//! if the alignment contains gaps, `position` drifts from the coordinate in
//! the original ungapped query. That matches the service report and is kept
//! as-is rather than remapped.

use crate::alignment::{MATCH_MARKER, Segment};
use serde::Serialize;

/// One non-matching aligned position. `index` is zero-based into the three
/// aligned strings of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MismatchEvent {
    pub index: usize,
    pub query: char,
    pub subject: char,
}

impl Segment {
    /// Mismatch events in ascending index order. Lazy single forward pass.
    pub fn mismatches(&self) -> impl Iterator<Item = MismatchEvent> + '_ {
        self.match_track
            .chars()
            .zip(self.query_aligned.chars().zip(self.subject_aligned.chars()))
            .enumerate()
            .filter(|(_, (track, _))| *track != MATCH_MARKER)
            .map(|(index, (_, (query, subject)))| MismatchEvent {
                index,
                query,
                subject,
            })
    }
}

/// Normalized description of one putative point mutation, 1-based position
/// per biological convention. Bases are copied verbatim from the alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationDescriptor {
    pub query_base: char,
    pub position: usize,
    pub subject_base: char,
    pub annotation: Option<String>,
}

impl MutationDescriptor {
    pub fn from_event(event: &MismatchEvent) -> Self {
        Self {
            query_base: event.query,
            position: event.index + 1,
            subject_base: event.subject,
            annotation: None,
        }
    }

    /// Compact identifier used as the disorder-lookup search term,
    /// e.g. `G3C` for query G, position 3, subject C.
    pub fn compact_id(&self) -> String {
        format!("{}{}{}", self.query_base, self.position, self.subject_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(query: &str, track: &str, subject: &str) -> Segment {
        Segment {
            expect: 1e-5,
            identities: track.chars().filter(|c| *c == '|').count(),
            align_length: track.chars().count(),
            query_aligned: query.to_string(),
            match_track: track.to_string(),
            subject_aligned: subject.to_string(),
        }
    }

    #[test]
    fn test_all_match_segment_yields_no_events() {
        let events: Vec<_> = segment("ACGT", "||||", "ACGT").mismatches().collect();
        assert!(events.is_empty());
    }

    #[test]
    fn test_single_mismatch_is_reported_at_its_index() {
        let events: Vec<_> = segment("ACGT", "|| |", "ACCT").mismatches().collect();
        assert_eq!(
            events,
            vec![MismatchEvent {
                index: 2,
                query: 'G',
                subject: 'C'
            }]
        );
    }

    #[test]
    fn test_events_come_in_ascending_index_order() {
        let events: Vec<_> = segment("AAAA", " || ", "TAAT").mismatches().collect();
        let indices: Vec<usize> = events.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_descriptor_position_is_index_plus_one() {
        for event in segment("ACGT", "  ||", "GGGT").mismatches() {
            let descriptor = MutationDescriptor::from_event(&event);
            assert_eq!(descriptor.position, event.index + 1);
            assert!(descriptor.position >= 1);
        }
    }

    #[test]
    fn test_descriptor_round_trip_from_known_segment() {
        let events: Vec<_> = segment("ACGT", "|| |", "ACCT").mismatches().collect();
        let descriptor = MutationDescriptor::from_event(&events[0]);
        assert_eq!(descriptor.query_base, 'G');
        assert_eq!(descriptor.position, 3);
        assert_eq!(descriptor.subject_base, 'C');
        assert_eq!(descriptor.compact_id(), "G3C");
    }

    #[test]
    fn test_base_case_is_preserved_verbatim() {
        let events: Vec<_> = segment("aCGT", " |||", "tCGT").mismatches().collect();
        let descriptor = MutationDescriptor::from_event(&events[0]);
        assert_eq!(descriptor.query_base, 'a');
        assert_eq!(descriptor.subject_base, 't');
        assert_eq!(descriptor.compact_id(), "a1t");
    }

    #[test]
    fn test_gap_positions_are_segment_local() {
        // A gap in the query shifts every later position relative to the
        // ungapped sequence. Positions stay aligned-segment-local.
        let events: Vec<_> = segment("AC-GT", "|| ||", "ACTGT").mismatches().collect();
        assert_eq!(events.len(), 1);
        let descriptor = MutationDescriptor::from_event(&events[0]);
        assert_eq!(descriptor.query_base, '-');
        assert_eq!(descriptor.position, 3);
        assert_eq!(descriptor.subject_base, 'T');
    }
}
