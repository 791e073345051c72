// Trait seams for the two external oracles a pipeline run talks to.
//
// TermEngine wraps the SEO scoring service (NeuronWriter in production).
// ContentGenerator wraps the language model behind fixed prompt templates.
// Both return PipelineError so every failure is already classified when it
// reaches the orchestrator. Mocks live in `testing`.

use async_trait::async_trait;

use seoforge_common::{PipelineError, QuerySnapshot, Term};

use crate::site_policy::SitePolicy;
use crate::terms::OverusedTerm;

pub type Result<T> = std::result::Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// TermEngine
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TermEngine: Send + Sync {
    /// Start an analysis for a keyword. Returns the engine's query id.
    async fn create_query(
        &self,
        project_ref: &str,
        keyword: &str,
        engine_locale: &str,
        language: &str,
    ) -> Result<String>;

    /// Poll a query. Terms are only populated once the status is ready.
    async fn fetch_query(&self, query_id: &str) -> Result<QuerySnapshot>;

    /// Score content without storing it. Read-only.
    async fn evaluate(
        &self,
        query_id: &str,
        html: &str,
        title: &str,
        description: &str,
    ) -> Result<i32>;

    /// Score content and store it as the query's current content.
    async fn submit(
        &self,
        query_id: &str,
        html: &str,
        title: &str,
        description: &str,
    ) -> Result<i32>;
}

// ---------------------------------------------------------------------------
// ContentGenerator
// ---------------------------------------------------------------------------

/// One templated prompt and one completion per call, no retries.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_title(&self, terms: &[Term], exact_phrases: &[String]) -> Result<String>;

    async fn generate_description(
        &self,
        terms: &[Term],
        exact_phrases: &[String],
    ) -> Result<String>;

    async fn generate_article(
        &self,
        title_terms: &[Term],
        h1_terms: &[Term],
        h2_terms: &[Term],
        content_terms: &[Term],
    ) -> Result<String>;

    /// Propose replacement h1/h2 elements for `html`. Returns only the headings.
    async fn rewrite_headings(
        &self,
        html: &str,
        h1_terms: &[Term],
        h2_terms: &[Term],
        exact_phrases: &[String],
        policy: &SitePolicy,
    ) -> Result<String>;

    async fn fill_gaps(&self, html: &str, missing_terms: &[String]) -> Result<String>;

    async fn reduce_terms(&self, html: &str, overused: &[OverusedTerm]) -> Result<String>;
}
