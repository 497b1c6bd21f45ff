//! Disorder/disease annotation for mutation identifiers.
//!
//! The lookup is a boundary: any backend that maps a compact mutation id
//! (`G3C`) to free-form text satisfies [`DisorderLookup`]. The bundled
//! implementation queries a GeneCards-style keyword search and pulls result
//! titles and descriptions out of the response page. Lookup failures are
//! folded into a diagnostic string; they never abort report assembly.

use crate::error::MutFindError;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

pub const NO_DISORDER_INFO: &str = "No disorder information found.";
pub const GENECARDS_SEARCH_URL: &str = "https://www.genecards.org/Search/Keyword";

pub trait DisorderLookup {
    /// Returns annotation text for a mutation id, or a diagnostic line.
    /// Implementations must not panic and must not return an error.
    fn lookup(&self, mutation_id: &str) -> String;
}

/// Injected lookup settings; no process-wide singleton.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: GENECARDS_SEARCH_URL.to_string(),
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GeneCardsLookup {
    config: LookupConfig,
    client: reqwest::blocking::Client,
}

impl GeneCardsLookup {
    pub fn new(config: LookupConfig) -> Result<Self, String> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| format!("Could not build HTTP client: {e}"))?;
        Ok(Self { config, client })
    }

    fn fetch_search_page(&self, mutation_id: &str) -> Result<String, String> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("queryString", mutation_id)])
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

impl DisorderLookup for GeneCardsLookup {
    fn lookup(&self, mutation_id: &str) -> String {
        match self.fetch_search_page(mutation_id) {
            Ok(page) => extract_disorder_info(&page),
            Err(e) => MutFindError::Lookup(e).to_string(),
        }
    }
}

static TITLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="[^"]*card-link[^"]*"[^>]*>(.*?)</a>"#)
        .expect("valid title pattern")
});
static DESCRIPTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<p[^>]*class="[^"]*description[^"]*"[^>]*>(.*?)</p>"#)
        .expect("valid description pattern")
});

/// Pulls `Title:`/`Description:` pairs out of a search-result page. Result
/// entries are `card-link` anchors paired positionally with `description`
/// paragraphs; a page without either yields the no-information literal.
pub fn extract_disorder_info(page: &str) -> String {
    let titles = TITLE_PATTERN
        .captures_iter(page)
        .map(|caps| strip_markup(&caps[1]));
    let descriptions = DESCRIPTION_PATTERN
        .captures_iter(page)
        .map(|caps| strip_markup(&caps[1]));

    let mut info = String::new();
    for (title, description) in titles.zip(descriptions) {
        if title.is_empty() || description.is_empty() {
            continue;
        }
        info.push_str(&format!("Title: {title}\nDescription: {description}\n\n"));
    }
    if info.is_empty() {
        NO_DISORDER_INFO.to_string()
    } else {
        info
    }
}

fn strip_markup(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
