use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Terms ---

/// Content section a recommended term targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Title,
    Description,
    H1,
    H2,
    ContentBasic,
    ContentExtended,
}

impl TermCategory {
    pub const ALL: [TermCategory; 6] = [
        TermCategory::Title,
        TermCategory::Description,
        TermCategory::H1,
        TermCategory::H2,
        TermCategory::ContentBasic,
        TermCategory::ContentExtended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TermCategory::Title => "title",
            TermCategory::Description => "description",
            TermCategory::H1 => "h1",
            TermCategory::H2 => "h2",
            TermCategory::ContentBasic => "content_basic",
            TermCategory::ContentExtended => "content_extended",
        }
    }

    /// Only body-content terms are eligible for gap filling and excess reduction.
    pub fn is_content(&self) -> bool {
        matches!(self, TermCategory::ContentBasic | TermCategory::ContentExtended)
    }
}

impl fmt::Display for TermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested occurrence range for a term. `lo == hi` for single-value suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRange {
    pub lo: u32,
    pub hi: u32,
}

impl UsageRange {
    /// Build from the engine's `[lo, hi]` / `[v]` / `[]` representation.
    pub fn from_values(values: &[u32]) -> Option<Self> {
        let lo = *values.iter().min()?;
        let hi = *values.iter().max()?;
        Some(Self { lo, hi })
    }

    pub fn is_single(&self) -> bool {
        self.lo == self.hi
    }
}

impl fmt::Display for UsageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "{}-{}", self.lo, self.hi)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub text: String,
    pub category: TermCategory,
    /// Percentage of competitor pages using the term in this section.
    pub weight: Option<u32>,
    pub usage: Option<UsageRange>,
}

impl Term {
    pub fn new(text: impl Into<String>, category: TermCategory) -> Self {
        Self {
            text: text.into(),
            category,
            weight: None,
            usage: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_usage(mut self, lo: u32, hi: u32) -> Self {
        self.usage = UsageRange::from_values(&[lo, hi]);
        self
    }
}

/// All recommended terms of a ready query, grouped by section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerms {
    pub title: Vec<Term>,
    pub description: Vec<Term>,
    pub h1: Vec<Term>,
    pub h2: Vec<Term>,
    pub content_basic: Vec<Term>,
    pub content_extended: Vec<Term>,
}

impl QueryTerms {
    pub fn category(&self, category: TermCategory) -> &[Term] {
        match category {
            TermCategory::Title => &self.title,
            TermCategory::Description => &self.description,
            TermCategory::H1 => &self.h1,
            TermCategory::H2 => &self.h2,
            TermCategory::ContentBasic => &self.content_basic,
            TermCategory::ContentExtended => &self.content_extended,
        }
    }

    /// Basic then extended content terms, in engine order.
    pub fn content_terms(&self) -> impl Iterator<Item = &Term> {
        self.content_basic.iter().chain(self.content_extended.iter())
    }

    pub fn push(&mut self, term: Term) {
        match term.category {
            TermCategory::Title => self.title.push(term),
            TermCategory::Description => self.description.push(term),
            TermCategory::H1 => self.h1.push(term),
            TermCategory::H2 => self.h2.push(term),
            TermCategory::ContentBasic => self.content_basic.push(term),
            TermCategory::ContentExtended => self.content_extended.push(term),
        }
    }

    pub fn len(&self) -> usize {
        TermCategory::ALL.iter().map(|c| self.category(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// --- Queries ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    Waiting,
    InProgress,
    Ready,
    NotFound,
    Unknown(String),
}

impl QueryStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "waiting" => QueryStatus::Waiting,
            "in progress" => QueryStatus::InProgress,
            "ready" => QueryStatus::Ready,
            "not found" => QueryStatus::NotFound,
            _ => QueryStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, QueryStatus::Waiting | QueryStatus::InProgress)
    }
}

/// One poll of a query. `terms` is only meaningful when `status` is `Ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub terms: QueryTerms,
}

// --- Content ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    pub description: String,
    pub html: String,
    pub score: i32,
}

/// Output of a successful pipeline run, ready for a publishing adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalArticle {
    pub query_id: String,
    pub title: String,
    pub description: String,
    pub html: String,
    pub score: i32,
}

// --- Work queue ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WorkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Pending => "pending",
            WorkStatus::Processing => "processing",
            WorkStatus::Completed => "completed",
            WorkStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Completed | WorkStatus::Failed)
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WorkStatus::Pending),
            "processing" => Ok(WorkStatus::Processing),
            "completed" => Ok(WorkStatus::Completed),
            "failed" => Ok(WorkStatus::Failed),
            other => Err(format!("unknown work status: {other}")),
        }
    }
}

/// Fields supplied when a keyword is enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub keyword: String,
    pub project_ref: String,
    pub engine_locale: String,
    pub language: String,
    pub site: Option<String>,
    pub priority: i32,
}

impl NewWorkItem {
    pub fn new(
        keyword: impl Into<String>,
        project_ref: impl Into<String>,
        engine_locale: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            project_ref: project_ref.into(),
            engine_locale: engine_locale.into(),
            language: language.into(),
            site: None,
            priority: 1,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A keyword waiting for, or going through, article generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub keyword: String,
    pub project_ref: String,
    pub engine_locale: String,
    pub language: String,
    pub site: Option<String>,
    pub priority: i32,
    pub status: WorkStatus,
    pub owner: Option<String>,
    pub lease_expiry: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    pub fn new(new: NewWorkItem, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyword: new.keyword,
            project_ref: new.project_ref,
            engine_locale: new.engine_locale,
            language: new.language,
            site: new.site,
            priority: new.priority,
            status: WorkStatus::Pending,
            owner: None,
            lease_expiry: None,
            attempts: 0,
            error: None,
            created_at,
            processed_at: None,
        }
    }

    /// Pending, or processing under a lease that ran out before `now`.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            WorkStatus::Pending => true,
            WorkStatus::Processing => self.lease_expired(now),
            _ => false,
        }
    }

    pub fn lease_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == WorkStatus::Processing
            && self.lease_expiry.map_or(true, |expiry| expiry < now)
    }
}
