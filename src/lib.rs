//! mutfind: find putative point mutations in a DNA sequence by submitting
//! it to a remote BLAST alignment service, diffing the aligned segments of
//! the best reference matches, and optionally annotating each mutation with
//! disorder information from an external keyword search.

pub mod alignment;
pub mod blast_client;
pub mod blast_xml;
pub mod disorder;
pub mod error;
pub mod mutation;
pub mod report;
