//! Report assembly: the caller-facing `find_mutations` pipeline.
//!
//! Every stage failure is folded into user-visible text; this module never
//! returns an error and never panics on bad service output. A broken lookup
//! affects only its own mutation line, and a structurally inconsistent
//! segment is skipped with a note while its siblings still render.

use crate::alignment::{AlignmentReport, DEFAULT_EXPECT_THRESHOLD, Segment, normalize_sequence};
use crate::blast_client::AlignmentService;
use crate::blast_xml::parse_blast_xml_text;
use crate::disorder::DisorderLookup;
use crate::error::MutFindError;
use crate::mutation::MutationDescriptor;

pub const NO_ALIGNMENTS_FOUND: &str =
    "No alignments found. The sequence may not match any known reference.";
pub const NO_MISMATCHES: &str = "No mismatches (no mutations found).";
const ALIGNMENT_HEADER: &str = "\n**** Alignment Found ****\n";

/// One search invocation: normalize, submit, parse, extract, annotate,
/// render. Owns its collaborators; no state survives across calls.
pub struct MutationFinder {
    service: Box<dyn AlignmentService>,
    lookup: Option<Box<dyn DisorderLookup>>,
    threshold: f64,
}

impl MutationFinder {
    pub fn new(service: Box<dyn AlignmentService>, lookup: Option<Box<dyn DisorderLookup>>) -> Self {
        Self {
            service,
            lookup,
            threshold: DEFAULT_EXPECT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Runs the whole pipeline. Always returns report text, never an error:
    /// submission and parse failures become one-line diagnostics.
    pub fn find_mutations(&self, raw_sequence: &str) -> String {
        let sequence = match normalize_sequence(raw_sequence) {
            Ok(sequence) => sequence,
            Err(e) => return e.to_string(),
        };
        let xml = match self.service.submit(&sequence) {
            Ok(xml) => xml,
            Err(e) => return MutFindError::Service(e).to_string(),
        };
        let report = match parse_blast_xml_text(&xml) {
            Ok(report) => report,
            Err(e) => return MutFindError::Service(e.to_string()).to_string(),
        };
        self.render(&report)
    }

    fn render(&self, report: &AlignmentReport) -> String {
        if report.is_empty() {
            return NO_ALIGNMENTS_FOUND.to_string();
        }
        let mut text = String::new();
        for candidate in &report.candidates {
            for segment in candidate.significant_segments(self.threshold) {
                if let Err(e) = segment.validate() {
                    text.push_str(&format!("Skipping segment of '{}': {e}\n", candidate.title));
                    continue;
                }
                text.push_str(ALIGNMENT_HEADER);
                text.push_str(&format!("Sequence: {}\n", candidate.title));
                text.push_str(&format!("Length: {}\n", candidate.length));
                text.push_str(&format!("e-value: {}\n", segment.expect));
                text.push_str(&format!(
                    "Identities: {}/{}\n",
                    segment.identities, segment.align_length
                ));
                text.push_str(&format!("Query: {}\n", segment.query_aligned));
                text.push_str(&format!("Match: {}\n", segment.match_track));
                text.push_str(&format!("Subject: {}\n", segment.subject_aligned));
                self.render_mismatches(segment, &mut text);
            }
        }
        text
    }

    fn render_mismatches(&self, segment: &Segment, text: &mut String) {
        let mut found_any = false;
        for event in segment.mismatches() {
            found_any = true;
            // The mismatch line keeps the original zero-based aligned index;
            // the mutation line below it is 1-based.
            text.push_str(&format!(
                "Position {}: Query = {} | Subject = {}\n",
                event.index, event.query, event.subject
            ));
            let mut descriptor = MutationDescriptor::from_event(&event);
            if let Some(lookup) = &self.lookup {
                descriptor.annotation = Some(lookup.lookup(&descriptor.compact_id()));
            }
            text.push_str(&format!(
                "Mutation: {} -> {} at position {}\n",
                descriptor.query_base, descriptor.subject_base, descriptor.position
            ));
            if let Some(info) = &descriptor.annotation {
                text.push_str(&format!("Disorder Info:\n{info}\n"));
            }
        }
        if !found_any {
            text.push_str(NO_MISMATCHES);
            text.push('\n');
        }
    }
}
