use serde::{Deserialize, Serialize};

// --- Query lifecycle ---

/// Body for `/new-query`.
#[derive(Debug, Clone, Serialize)]
pub struct NewQueryRequest {
    pub project: String,
    pub keyword: String,
    /// Search engine locale, e.g. `google.co.uk`.
    pub engine: String,
    /// Language name as NeuronWriter spells it, e.g. `English`.
    pub language: String,
}

/// Response of `/new-query`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQueryResponse {
    pub query: String,
    pub query_url: Option<String>,
    pub share_url: Option<String>,
    pub readonly_url: Option<String>,
}

/// Body for `/get-query`.
#[derive(Debug, Clone, Serialize)]
pub struct GetQueryRequest {
    pub query: String,
}

/// Response of `/get-query`. `terms` is only populated once `status` is `ready`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: String,
    pub keyword: Option<String>,
    pub language: Option<String>,
    pub engine: Option<String>,
    pub terms: Option<QueryTermsWire>,
}

/// Term lists per content section, as returned by `/get-query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryTermsWire {
    #[serde(default)]
    pub title: Vec<TermWire>,
    #[serde(default)]
    pub desc: Vec<TermWire>,
    #[serde(default)]
    pub h1: Vec<TermWire>,
    #[serde(default)]
    pub h2: Vec<TermWire>,
    #[serde(default)]
    pub content_basic: Vec<TermWire>,
    #[serde(default)]
    pub content_extended: Vec<TermWire>,
}

/// A single recommended term.
#[derive(Debug, Clone, Deserialize)]
pub struct TermWire {
    pub t: String,
    /// Share of competitor pages using the term in this section (title/desc/headings).
    pub usage_pc: Option<f64>,
    /// Suggested occurrence range for content terms: `[lo, hi]` or `[v]`.
    #[serde(default)]
    pub sugg_usage: Vec<u32>,
}

// --- Content scoring ---

/// Body for `/evaluate-content` and `/import-content`.
#[derive(Debug, Clone, Serialize)]
pub struct ContentRequest {
    pub query: String,
    pub html: String,
    pub title: String,
    pub description: String,
}

/// Response of `/evaluate-content` and `/import-content`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub content_score: Option<f64>,
}

impl ContentResponse {
    pub fn is_ok(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s.eq_ignore_ascii_case("ok"))
    }

    /// Content score rounded to the nearest integer point.
    pub fn score(&self) -> Option<i32> {
        self.content_score.map(|s| s.round() as i32)
    }
}

// --- Projects ---

/// An entry of `/list-projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub project: String,
    pub name: String,
    pub language: Option<String>,
    pub engine: Option<String>,
}
