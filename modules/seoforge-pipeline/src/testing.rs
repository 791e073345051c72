// Test doubles for the two pipeline seams.
//
// - ScriptedEngine (TermEngine): scripted query statuses, scores computed by a
//   closure over the submitted html, every call recorded.
// - StubGenerator (ContentGenerator): canned outputs, queued rewrites for the
//   gap and excess passes, every call recorded.
//
// Plus fixtures for a small espresso-machine query.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use seoforge_common::{PipelineError, QuerySnapshot, QueryStatus, QueryTerms, Term, TermCategory};

use crate::orchestrator::ArticleRequest;
use crate::site_policy::SitePolicy;
use crate::terms::OverusedTerm;
use crate::traits::{ContentGenerator, Result, TermEngine};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const QUERY_ID: &str = "query-1";

/// Three headings: one h1, two h2.
pub const DRAFT_ARTICLE: &str = "<h1>Espresso Machines</h1>\n<p>A grinder matters.</p>\n<h2>Choosing</h2>\n<p>Look at the boiler.</p>\n<h2>Care</h2>\n<p>Descale often.</p>";

pub fn sample_terms() -> QueryTerms {
    let mut terms = QueryTerms::default();
    terms.push(Term::new("espresso", TermCategory::Title).with_weight(90));
    terms.push(Term::new("machine", TermCategory::Description).with_weight(70));
    terms.push(Term::new("best espresso", TermCategory::H1).with_weight(60));
    terms.push(Term::new("buying guide", TermCategory::H2).with_weight(40));
    terms.push(Term::new("grinder", TermCategory::ContentBasic).with_usage(2, 4));
    terms.push(Term::new("crema", TermCategory::ContentExtended).with_usage(1, 2));
    terms
}

pub fn sample_request() -> ArticleRequest {
    ArticleRequest {
        project_ref: "project-1".into(),
        keyword: "espresso machine".into(),
        engine_locale: "google.com".into(),
        language: "English".into(),
        site_policy: SitePolicy::empty("coffee.example"),
    }
}

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    CreateQuery { keyword: String },
    FetchQuery { query_id: String },
    Evaluate { html: String },
    Submit { html: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOp {
    CreateQuery,
    FetchQuery,
    Evaluate,
    Submit,
}

type Scorer = Box<dyn Fn(&str) -> i32 + Send + Sync>;

/// Statuses are served in order; once exhausted every poll is `Ready`.
/// Builder pattern: `.with_terms()`, `.with_statuses()`, `.with_scorer()`, `.failing()`.
pub struct ScriptedEngine {
    terms: QueryTerms,
    statuses: Mutex<VecDeque<QueryStatus>>,
    scorer: Scorer,
    failing: Option<EngineOp>,
    calls: Mutex<Vec<EngineCall>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            terms: sample_terms(),
            statuses: Mutex::new(VecDeque::new()),
            scorer: Box::new(|_| 50),
            failing: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_terms(mut self, terms: QueryTerms) -> Self {
        self.terms = terms;
        self
    }

    pub fn with_statuses(self, statuses: Vec<QueryStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_scorer(mut self, scorer: impl Fn(&str) -> i32 + Send + Sync + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn failing(mut self, op: EngineOp) -> Self {
        self.failing = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::FetchQuery { .. }))
            .count()
    }

    /// Html of every evaluate call, in order.
    pub fn evaluated(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Evaluate { html } => Some(html),
                _ => None,
            })
            .collect()
    }

    /// Html of every submit call, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Submit { html } => Some(html),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: EngineOp) -> Result<()> {
        if self.failing == Some(op) {
            return Err(PipelineError::EngineUnavailable(format!(
                "ScriptedEngine: {op:?} failed"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl TermEngine for ScriptedEngine {
    async fn create_query(
        &self,
        _project_ref: &str,
        keyword: &str,
        _engine_locale: &str,
        _language: &str,
    ) -> Result<String> {
        self.record(EngineCall::CreateQuery {
            keyword: keyword.to_string(),
        });
        self.check(EngineOp::CreateQuery)?;
        Ok(QUERY_ID.to_string())
    }

    async fn fetch_query(&self, query_id: &str) -> Result<QuerySnapshot> {
        self.record(EngineCall::FetchQuery {
            query_id: query_id.to_string(),
        });
        self.check(EngineOp::FetchQuery)?;
        let status = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(QueryStatus::Ready);
        let terms = if status == QueryStatus::Ready {
            self.terms.clone()
        } else {
            QueryTerms::default()
        };
        Ok(QuerySnapshot { status, terms })
    }

    async fn evaluate(&self, _query_id: &str, html: &str, _title: &str, _description: &str) -> Result<i32> {
        self.record(EngineCall::Evaluate {
            html: html.to_string(),
        });
        self.check(EngineOp::Evaluate)?;
        Ok((self.scorer)(html))
    }

    async fn submit(&self, _query_id: &str, html: &str, _title: &str, _description: &str) -> Result<i32> {
        self.record(EngineCall::Submit {
            html: html.to_string(),
        });
        self.check(EngineOp::Submit)?;
        Ok((self.scorer)(html))
    }
}

// ---------------------------------------------------------------------------
// StubGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorCall {
    Title { terms: Vec<String>, exact: Vec<String> },
    Description { terms: Vec<String>, exact: Vec<String> },
    Article { content_terms: Vec<String> },
    Headings { html: String, homepage: String },
    FillGaps { missing: Vec<String> },
    ReduceTerms { overused: Vec<OverusedTerm> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorOp {
    Title,
    Description,
    Article,
    Headings,
    FillGaps,
    ReduceTerms,
}

/// Canned generator. Gap and reduce rewrites are served from queues; when a
/// queue is empty the input html comes back unchanged.
/// Builder pattern: `.with_title()`, `.with_article()`, `.with_headings()`, `.on_fill_gaps()`, `.on_reduce()`.
pub struct StubGenerator {
    title: String,
    description: String,
    article: String,
    headings: String,
    gap_fills: Mutex<VecDeque<String>>,
    reductions: Mutex<VecDeque<String>>,
    failing: Option<GeneratorOp>,
    calls: Mutex<Vec<GeneratorCall>>,
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            title: "Espresso Machine Buying Guide".into(),
            description: "How to pick an espresso machine that suits your kitchen.".into(),
            article: DRAFT_ARTICLE.into(),
            headings: "<h1>Best Espresso Machine</h1>\n<h2>Buying Guide</h2>\n<h2>Machine Care</h2>".into(),
            gap_fills: Mutex::new(VecDeque::new()),
            reductions: Mutex::new(VecDeque::new()),
            failing: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_article(mut self, html: &str) -> Self {
        self.article = html.to_string();
        self
    }

    pub fn with_headings(mut self, fragment: &str) -> Self {
        self.headings = fragment.to_string();
        self
    }

    pub fn on_fill_gaps(self, html: &str) -> Self {
        self.gap_fills.lock().unwrap().push_back(html.to_string());
        self
    }

    pub fn on_reduce(self, html: &str) -> Self {
        self.reductions.lock().unwrap().push_back(html.to_string());
        self
    }

    pub fn failing(mut self, op: GeneratorOp) -> Self {
        self.failing = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GeneratorCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: GeneratorOp) -> Result<()> {
        if self.failing == Some(op) {
            return Err(PipelineError::Generation(format!("StubGenerator: {op:?} failed")));
        }
        Ok(())
    }
}

fn texts(terms: &[Term]) -> Vec<String> {
    terms.iter().map(|t| t.text.clone()).collect()
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn generate_title(&self, terms: &[Term], exact_phrases: &[String]) -> Result<String> {
        self.record(GeneratorCall::Title {
            terms: texts(terms),
            exact: exact_phrases.to_vec(),
        });
        self.check(GeneratorOp::Title)?;
        Ok(self.title.clone())
    }

    async fn generate_description(&self, terms: &[Term], exact_phrases: &[String]) -> Result<String> {
        self.record(GeneratorCall::Description {
            terms: texts(terms),
            exact: exact_phrases.to_vec(),
        });
        self.check(GeneratorOp::Description)?;
        Ok(self.description.clone())
    }

    async fn generate_article(
        &self,
        _title_terms: &[Term],
        _h1_terms: &[Term],
        _h2_terms: &[Term],
        content_terms: &[Term],
    ) -> Result<String> {
        self.record(GeneratorCall::Article {
            content_terms: texts(content_terms),
        });
        self.check(GeneratorOp::Article)?;
        Ok(self.article.clone())
    }

    async fn rewrite_headings(
        &self,
        html: &str,
        _h1_terms: &[Term],
        _h2_terms: &[Term],
        _exact_phrases: &[String],
        policy: &SitePolicy,
    ) -> Result<String> {
        self.record(GeneratorCall::Headings {
            html: html.to_string(),
            homepage: policy.homepage.clone(),
        });
        self.check(GeneratorOp::Headings)?;
        Ok(self.headings.clone())
    }

    async fn fill_gaps(&self, html: &str, missing_terms: &[String]) -> Result<String> {
        self.record(GeneratorCall::FillGaps {
            missing: missing_terms.to_vec(),
        });
        self.check(GeneratorOp::FillGaps)?;
        Ok(self
            .gap_fills
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| html.to_string()))
    }

    async fn reduce_terms(&self, html: &str, overused: &[OverusedTerm]) -> Result<String> {
        self.record(GeneratorCall::ReduceTerms {
            overused: overused.to_vec(),
        });
        self.check(GeneratorOp::ReduceTerms)?;
        Ok(self
            .reductions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| html.to_string()))
    }
}
