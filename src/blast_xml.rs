//! NCBI BLAST report XML (`BlastOutput`) parser and dialect detection.
//!
//! Only the classic single-query `BlastOutput` DTD dialect is supported.
//! The newer `BlastOutput2`/`BlastXML2` dialect is detected and rejected
//! with an explicit diagnostic so report handling stays deterministic.

use crate::alignment::{AlignmentCandidate, AlignmentReport, MATCH_MARKER, Segment};
use anyhow::{Result, anyhow};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlastXmlDialect {
    BlastOutput,
    BlastOutput2,
    Unknown,
}

impl BlastXmlDialect {
    pub fn label(self) -> &'static str {
        match self {
            Self::BlastOutput => "BlastOutput",
            Self::BlastOutput2 => "BlastOutput2/BlastXML2",
            Self::Unknown => "unknown",
        }
    }
}

pub fn detect_blast_xml_dialect(input: &str) -> BlastXmlDialect {
    let lower = input.to_ascii_lowercase();
    if lower.contains("<blastoutput2") || lower.contains("<blastxml2") {
        BlastXmlDialect::BlastOutput2
    } else if lower.contains("<blastoutput") {
        BlastXmlDialect::BlastOutput
    } else {
        BlastXmlDialect::Unknown
    }
}

pub fn parse_blast_xml_file(path: &str) -> Result<AlignmentReport> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Could not read BLAST XML file '{path}': {e}"))?;
    parse_blast_xml_text(&text)
        .map_err(|e| anyhow!("Could not parse BLAST XML file '{path}': {e}"))
}

/// Parses a classic `BlastOutput` report into an [`AlignmentReport`].
/// A report with zero hits is valid and comes back empty.
pub fn parse_blast_xml_text(xml: &str) -> Result<AlignmentReport> {
    match detect_blast_xml_dialect(xml) {
        BlastXmlDialect::BlastOutput => {}
        BlastXmlDialect::BlastOutput2 => {
            return Err(anyhow!(
                "Unsupported XML dialect '{}'; only BlastOutput is currently supported",
                BlastXmlDialect::BlastOutput2.label()
            ));
        }
        BlastXmlDialect::Unknown => {
            return Err(anyhow!(
                "Unsupported XML dialect: expected '{}' root element",
                BlastXmlDialect::BlastOutput.label()
            ));
        }
    }

    let parsed: BlastOutputXml =
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("Malformed BlastOutput XML: {e}"))?;

    let candidates = parsed
        .iterations
        .map(|raw| raw.iterations)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|iteration| {
            iteration
                .hits
                .map(|raw| raw.hits)
                .unwrap_or_default()
                .into_iter()
        })
        .enumerate()
        .map(|(hit_idx, hit)| hit_to_candidate(&hit, hit_idx))
        .collect::<Result<Vec<AlignmentCandidate>>>()?;

    Ok(AlignmentReport { candidates })
}

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_iterations")]
    iterations: Option<BlastIterationsXml>,
}

#[derive(Debug, Deserialize)]
struct BlastIterationsXml {
    #[serde(rename = "Iteration", default)]
    iterations: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_hits")]
    hits: Option<IterationHitsXml>,
}

#[derive(Debug, Deserialize)]
struct IterationHitsXml {
    #[serde(rename = "Hit", default)]
    hits: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_id")]
    id: Option<String>,
    #[serde(rename = "Hit_def")]
    definition: Option<String>,
    #[serde(rename = "Hit_len")]
    length: Option<usize>,
    #[serde(rename = "Hit_hsps")]
    hsps: Option<HitHspsXml>,
}

#[derive(Debug, Deserialize)]
struct HitHspsXml {
    #[serde(rename = "Hsp", default)]
    hsps: Vec<HspXml>,
}

#[derive(Debug, Deserialize)]
struct HspXml {
    #[serde(rename = "Hsp_evalue")]
    evalue: Option<f64>,
    #[serde(rename = "Hsp_identity")]
    identity: Option<usize>,
    #[serde(rename = "Hsp_align-len")]
    align_len: Option<usize>,
    #[serde(rename = "Hsp_qseq")]
    qseq: Option<String>,
    #[serde(rename = "Hsp_midline")]
    midline: Option<String>,
    #[serde(rename = "Hsp_hseq")]
    hseq: Option<String>,
}

fn hit_to_candidate(hit: &HitXml, hit_idx: usize) -> Result<AlignmentCandidate> {
    // Hit_id + Hit_def together form the title line users see.
    let title = match (
        nonempty_owned(hit.id.as_deref()),
        nonempty_owned(hit.definition.as_deref()),
    ) {
        (Some(id), Some(def)) => format!("{id} {def}"),
        (Some(id), None) => id,
        (None, Some(def)) => def,
        (None, None) => format!("hit_{}", hit_idx + 1),
    };
    let length = hit
        .length
        .ok_or_else(|| anyhow!("Hit #{} ('{}') is missing Hit_len", hit_idx + 1, title))?;
    let segments = hit
        .hsps
        .as_ref()
        .map(|raw| raw.hsps.as_slice())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(hsp_idx, hsp)| hsp_to_segment(hsp, &title, hsp_idx))
        .collect::<Result<Vec<Segment>>>()?;

    Ok(AlignmentCandidate {
        title,
        length,
        segments,
    })
}

fn hsp_to_segment(hsp: &HspXml, hit_title: &str, hsp_idx: usize) -> Result<Segment> {
    let missing = |field: &str| {
        anyhow!(
            "Hsp #{} of hit '{}' is missing {}",
            hsp_idx + 1,
            hit_title,
            field
        )
    };
    let query_aligned = hsp.qseq.clone().ok_or_else(|| missing("Hsp_qseq"))?;
    let subject_aligned = hsp.hseq.clone().ok_or_else(|| missing("Hsp_hseq"))?;
    let midline = hsp.midline.clone().ok_or_else(|| missing("Hsp_midline"))?;
    Ok(Segment {
        expect: hsp.evalue.ok_or_else(|| missing("Hsp_evalue"))?,
        identities: hsp.identity.ok_or_else(|| missing("Hsp_identity"))?,
        align_length: hsp.align_len.ok_or_else(|| missing("Hsp_align-len"))?,
        match_track: repair_match_track(midline, &query_aligned, &subject_aligned),
        query_aligned,
        subject_aligned,
    })
}

/// The XML deserializer trims leading/trailing whitespace in text nodes, so
/// a midline whose first or last aligned position is a mismatch comes back
/// short of the aligned strings. The midline is positionally determined by
/// query and subject, so a short one is rebuilt from them; anything else is
/// passed through untouched for `Segment::validate` to judge.
fn repair_match_track(midline: String, query_aligned: &str, subject_aligned: &str) -> String {
    let aligned_len = query_aligned.chars().count();
    // Trimming can only shorten; a midline that is not shorter than the
    // aligned strings was not trimmed.
    if midline.chars().count() >= aligned_len
        || subject_aligned.chars().count() != aligned_len
    {
        return midline;
    }
    query_aligned
        .chars()
        .zip(subject_aligned.chars())
        .map(|(q, s)| if q == s { MATCH_MARKER } else { ' ' })
        .collect()
}

fn nonempty_owned(raw: Option<&str>) -> Option<String> {
    let text = raw.unwrap_or_default().trim();
    (!text.is_empty()).then_some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ONE_HIT_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "http://www.ncbi.nlm.nih.gov/dtd/NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastn</BlastOutput_program>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>gi|123|ref|NM_000000.1|</Hit_id>
          <Hit_def>Homo sapiens test reference</Hit_def>
          <Hit_len>1200</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_evalue>2.9e-07</Hsp_evalue>
              <Hsp_identity>3</Hsp_identity>
              <Hsp_align-len>4</Hsp_align-len>
              <Hsp_qseq>ACGT</Hsp_qseq>
              <Hsp_hseq>ACCT</Hsp_hseq>
              <Hsp_midline>|| |</Hsp_midline>
            </Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>"#;

    const ZERO_HIT_XML: &str = r#"<?xml version="1.0"?>
<BlastOutput>
  <BlastOutput_program>blastn</BlastOutput_program>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_hits></Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>"#;

    #[test]
    fn test_detect_blast_xml_dialect_classic() {
        assert_eq!(
            detect_blast_xml_dialect(ONE_HIT_XML),
            BlastXmlDialect::BlastOutput
        );
    }

    #[test]
    fn test_detect_blast_xml_dialect_xml2() {
        let xml = r#"<?xml version="1.0"?><BlastOutput2><report/></BlastOutput2>"#;
        assert_eq!(detect_blast_xml_dialect(xml), BlastXmlDialect::BlastOutput2);
    }

    #[test]
    fn test_parse_one_hit_report() {
        let report = parse_blast_xml_text(ONE_HIT_XML).expect("parse BlastOutput");
        assert_eq!(report.candidates.len(), 1);
        let candidate = &report.candidates[0];
        assert_eq!(
            candidate.title,
            "gi|123|ref|NM_000000.1| Homo sapiens test reference"
        );
        assert_eq!(candidate.length, 1200);
        assert_eq!(candidate.segments.len(), 1);
        let segment = &candidate.segments[0];
        assert_eq!(segment.expect, 2.9e-07);
        assert_eq!(segment.identities, 3);
        assert_eq!(segment.align_length, 4);
        assert_eq!(segment.query_aligned, "ACGT");
        assert_eq!(segment.match_track, "|| |");
        assert_eq!(segment.subject_aligned, "ACCT");
        segment.validate().expect("lengths agree");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_blast_xml_text(ONE_HIT_XML).unwrap();
        let second = parse_blast_xml_text(ONE_HIT_XML).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_hits_is_a_valid_empty_report() {
        let report = parse_blast_xml_text(ZERO_HIT_XML).expect("parse empty BlastOutput");
        assert!(report.is_empty());
    }

    #[test]
    fn test_rejects_blastoutput2_dialect() {
        let err = parse_blast_xml_text("<BlastOutput2></BlastOutput2>")
            .expect_err("BlastOutput2 should be rejected");
        assert!(
            err.to_string().contains("Unsupported XML dialect"),
            "expected unsupported-dialect error, got: {err}"
        );
    }

    #[test]
    fn test_rejects_non_blast_xml() {
        let err = parse_blast_xml_text("<GBSet><GBSeq/></GBSet>")
            .expect_err("GBSet should be rejected");
        assert!(err.to_string().contains("Unsupported XML dialect"));
    }

    #[test]
    fn test_midline_edge_mismatches_survive_parsing() {
        // Mismatches at the first and last aligned position put spaces at
        // the midline edges; those must not be lost to text-node trimming.
        let xml = ONE_HIT_XML
            .replace("<Hsp_hseq>ACCT</Hsp_hseq>", "<Hsp_hseq>TCGA</Hsp_hseq>")
            .replace("<Hsp_midline>|| |</Hsp_midline>", "<Hsp_midline> || </Hsp_midline>");
        let report = parse_blast_xml_text(&xml).expect("parse BlastOutput");
        let segment = &report.candidates[0].segments[0];
        assert_eq!(segment.match_track, " || ");
        segment.validate().expect("lengths agree");
        let indices: Vec<usize> = segment.mismatches().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 3]);
    }

    #[test]
    fn test_midline_rebuild_leaves_genuinely_short_tracks_alone() {
        // When query and subject disagree in length the midline cannot be
        // reconstructed; the segment must stay malformed.
        let xml = ONE_HIT_XML
            .replace("<Hsp_hseq>ACCT</Hsp_hseq>", "<Hsp_hseq>ACCTT</Hsp_hseq>")
            .replace("<Hsp_midline>|| |</Hsp_midline>", "<Hsp_midline>|||</Hsp_midline>");
        let report = parse_blast_xml_text(&xml).expect("parse BlastOutput");
        let segment = &report.candidates[0].segments[0];
        assert!(segment.validate().is_err());
    }

    #[test]
    fn test_missing_hsp_field_is_diagnosed_with_indices() {
        let xml = ONE_HIT_XML.replace("<Hsp_midline>|| |</Hsp_midline>", "");
        let err = parse_blast_xml_text(&xml).expect_err("missing midline should fail");
        assert!(
            err.to_string().contains("Hsp #1") && err.to_string().contains("Hsp_midline"),
            "expected indexed diagnostic, got: {err}"
        );
    }

    #[test]
    fn test_parse_fixture_file() {
        let report =
            parse_blast_xml_file("test_files/blast_sample.xml").expect("parse fixture report");
        assert_eq!(report.candidates.len(), 2);
        assert!(report.candidates[0].segments[0].expect < 1.0);
        assert!(report.candidates[1].segments[0].expect >= 1.0);
    }

    #[test]
    fn test_parse_file_reports_path_in_errors() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        write!(file, "not xml at all").expect("write temp file");
        let path = file.path().to_string_lossy().to_string();
        let err = parse_blast_xml_file(&path).expect_err("junk file should fail");
        assert!(err.to_string().contains(&path));
    }
}
