//! Blocking client for the NCBI BLAST URL API (`Blast.cgi`).
//!
//! A search is three phases: `CMD=Put` submits the query and yields a
//! request identifier (RID), `CMD=Get&FORMAT_OBJECT=SearchInfo` is polled
//! until the search status is READY, and `CMD=Get&FORMAT_TYPE=XML` fetches
//! the report. All failures come back as `Result<_, String>` diagnostics;
//! nothing here panics on network trouble.

use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

pub const NCBI_BLAST_URL: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";

/// Connection and search parameters, injected at construction. There is no
/// process-wide client state.
#[derive(Debug, Clone)]
pub struct BlastConfig {
    pub base_url: String,
    pub program: String,
    pub database: String,
    pub word_size: u32,
    pub user_agent: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Pause between SearchInfo polls.
    pub poll_interval: Duration,
    /// Overall deadline for the poll loop; expiry is a service error.
    pub poll_deadline: Duration,
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            base_url: NCBI_BLAST_URL.to_string(),
            program: "blastn".to_string(),
            database: "nt".to_string(),
            word_size: 7,
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(10),
            poll_deadline: Duration::from_secs(600),
        }
    }
}

/// Boundary for the remote alignment search: raw sequence in, raw report
/// text out. Implemented by [`BlastClient`]; tests substitute canned fakes.
pub trait AlignmentService {
    fn submit(&self, sequence: &str) -> Result<String, String>;
}

pub struct BlastClient {
    config: BlastConfig,
    client: reqwest::blocking::Client,
}

impl BlastClient {
    pub fn new(config: BlastConfig) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("Could not build HTTP client: {e}"))?;
        Ok(Self { config, client })
    }

    fn put_query(&self, sequence: &str) -> Result<(String, Option<u64>), String> {
        let word_size = self.config.word_size.to_string();
        let response = self
            .client
            .post(&self.config.base_url)
            .form(&[
                ("CMD", "Put"),
                ("PROGRAM", self.config.program.as_str()),
                ("DATABASE", self.config.database.as_str()),
                ("WORD_SIZE", word_size.as_str()),
                ("FORMAT_TYPE", "XML"),
                ("QUERY", sequence),
            ])
            .send()
            .map_err(|e| format!("Could not submit query to '{}': {e}", self.config.base_url))?
            .error_for_status()
            .map_err(|e| format!("Could not submit query to '{}': {e}", self.config.base_url))?;
        let body = response
            .text()
            .map_err(|e| format!("Could not read submission response: {e}"))?;
        let rid = extract_rid(&body)?;
        Ok((rid, extract_rtoe_seconds(&body)))
    }

    fn wait_until_ready(&self, rid: &str, rtoe_seconds: Option<u64>) -> Result<(), String> {
        let started = Instant::now();
        // The service estimates time-to-completion on submission; sleeping
        // that long up front saves most of the poll round-trips.
        if let Some(secs) = rtoe_seconds {
            let estimate = Duration::from_secs(secs);
            if estimate < self.config.poll_deadline {
                std::thread::sleep(estimate);
            }
        }
        loop {
            let body = self.get_text(&[
                ("CMD", "Get"),
                ("FORMAT_OBJECT", "SearchInfo"),
                ("RID", rid),
            ])?;
            match extract_status(&body)? {
                SearchStatus::Ready => return Ok(()),
                SearchStatus::Waiting => {}
                SearchStatus::Failed(status) => {
                    return Err(format!("BLAST search {rid} ended with status {status}"));
                }
            }
            if started.elapsed() + self.config.poll_interval > self.config.poll_deadline {
                return Err(format!(
                    "BLAST search {rid} did not complete within {}s",
                    self.config.poll_deadline.as_secs()
                ));
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn fetch_report(&self, rid: &str) -> Result<String, String> {
        self.get_text(&[("CMD", "Get"), ("FORMAT_TYPE", "XML"), ("RID", rid)])
    }

    fn get_text(&self, query: &[(&str, &str)]) -> Result<String, String> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(query)
            .send()
            .map_err(|e| format!("Could not fetch '{}': {e}", self.config.base_url))?;
        if !response.status().is_success() {
            return Err(format!(
                "Could not fetch '{}': HTTP {}",
                self.config.base_url,
                response.status()
            ));
        }
        response
            .text()
            .map_err(|e| format!("Could not read response from '{}': {e}", self.config.base_url))
    }
}

impl AlignmentService for BlastClient {
    /// Runs a full blocking search and returns the raw XML report text.
    fn submit(&self, sequence: &str) -> Result<String, String> {
        let (rid, rtoe_seconds) = self.put_query(sequence)?;
        self.wait_until_ready(&rid, rtoe_seconds)?;
        self.fetch_report(&rid)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SearchStatus {
    Ready,
    Waiting,
    Failed(String),
}

static RID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RID = (\S+)").expect("valid RID pattern"));
static RTOE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RTOE = (\d+)").expect("valid RTOE pattern"));
static STATUS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Status=(\w+)").expect("valid status pattern"));

/// Pulls the RID out of the `QBlastInfoBegin` comment block of a Put
/// response page.
fn extract_rid(body: &str) -> Result<String, String> {
    RID_PATTERN
        .captures(body)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| "Submission response carried no RID".to_string())
}

/// The estimated time-to-completion hint, if the service provided one.
fn extract_rtoe_seconds(body: &str) -> Option<u64> {
    RTOE_PATTERN
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
}

fn extract_status(body: &str) -> Result<SearchStatus, String> {
    let status = STATUS_PATTERN
        .captures(body)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| "SearchInfo response carried no Status".to_string())?;
    match status.as_str() {
        "READY" => Ok(SearchStatus::Ready),
        "WAITING" => Ok(SearchStatus::Waiting),
        other => Ok(SearchStatus::Failed(other.to_string())),
    }
}
