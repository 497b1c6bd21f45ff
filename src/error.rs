use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum MutFindError {
    /// The input sequence is empty after trimming whitespace.
    EmptyInput,
    /// BLAST submission or report retrieval failed.
    Service(String),
    /// A disorder lookup failed; recoverable per mutation.
    Lookup(String),
    /// The aligned strings of a segment are structurally inconsistent.
    MalformedReport(String),
}

impl Error for MutFindError {}

impl fmt::Display for MutFindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MutFindError::EmptyInput => {
                write!(f, "Please enter a DNA sequence (input was empty)")
            }
            MutFindError::Service(msg) => {
                write!(f, "An error occurred during BLAST search: {msg}")
            }
            MutFindError::Lookup(msg) => {
                write!(f, "An error occurred while searching for disorders: {msg}")
            }
            MutFindError::MalformedReport(msg) => {
                write!(f, "Malformed alignment segment: {msg}")
            }
        }
    }
}

impl From<String> for MutFindError {
    fn from(err: String) -> Self {
        MutFindError::Service(err)
    }
}
