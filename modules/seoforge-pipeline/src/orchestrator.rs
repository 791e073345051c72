//! One keyword, one article: query readiness, draft, headings, gap pass,
//! excess pass. Strictly sequential; the first failure ends the run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use seoforge_common::{
    Clock, ContentDraft, FinalArticle, PipelineError, QueryStatus, QueryTerms,
};

use crate::balancer::{BalancerConfig, TermBalancer};
use crate::headings::{HeadingNegotiator, HEADING_REGRESSION_TOLERANCE};
use crate::site_policy::SitePolicy;
use crate::terms::exact_phrases;
use crate::traits::{ContentGenerator, TermEngine};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Wait after creating a query before the first poll.
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    /// Measured from the first poll.
    pub poll_timeout: Duration,
    pub heading_tolerance: i32,
    pub balancer: BalancerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(65),
            poll_interval: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(120),
            heading_tolerance: HEADING_REGRESSION_TOLERANCE,
            balancer: BalancerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &seoforge_common::Config) -> Self {
        Self {
            initial_delay: Duration::from_secs(config.query_initial_delay_secs),
            poll_interval: Duration::from_secs(config.query_poll_interval_secs),
            poll_timeout: Duration::from_secs(config.query_poll_timeout_secs),
            heading_tolerance: config.heading_regression_tolerance,
            balancer: BalancerConfig::default(),
        }
    }
}

/// Last stage a run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    QueryPending,
    QueryReady,
    DraftGenerated,
    HeadingsNegotiated,
    GapsFilled,
    ExcessReduced,
    Done,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::QueryPending => "query_pending",
            PipelineStage::QueryReady => "query_ready",
            PipelineStage::DraftGenerated => "draft_generated",
            PipelineStage::HeadingsNegotiated => "headings_negotiated",
            PipelineStage::GapsFilled => "gaps_filled",
            PipelineStage::ExcessReduced => "excess_reduced",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("pipeline failed at {stage}: {error}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub error: PipelineError,
}

impl PipelineFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

#[derive(Debug, Clone)]
pub struct ArticleRequest {
    pub project_ref: String,
    pub keyword: String,
    pub engine_locale: String,
    pub language: String,
    pub site_policy: SitePolicy,
}

/// Flat record of a run for callers that log or persist outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleReport {
    pub success: bool,
    pub message: String,
    pub error_kind: Option<String>,
    pub failed_stage: Option<PipelineStage>,
    pub article: Option<FinalArticle>,
}

impl From<std::result::Result<FinalArticle, PipelineFailure>> for ArticleReport {
    fn from(result: std::result::Result<FinalArticle, PipelineFailure>) -> Self {
        match result {
            Ok(article) => Self {
                success: true,
                message: format!("Article created with score {}", article.score),
                error_kind: None,
                failed_stage: None,
                article: Some(article),
            },
            Err(failure) => Self {
                success: false,
                message: failure.error.to_string(),
                error_kind: Some(failure.kind().to_string()),
                failed_stage: Some(failure.stage),
                article: None,
            },
        }
    }
}

struct ReadyQuery {
    query_id: String,
    terms: QueryTerms,
}

pub struct Pipeline {
    engine: Arc<dyn TermEngine>,
    generator: Arc<dyn ContentGenerator>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        engine: Arc<dyn TermEngine>,
        generator: Arc<dyn ContentGenerator>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            engine,
            generator,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run and fold the result into a report. Never returns an error.
    pub async fn create_article(&self, request: &ArticleRequest) -> ArticleReport {
        let report = ArticleReport::from(self.run(request).await);
        if !report.success {
            warn!(
                keyword = request.keyword.as_str(),
                error_kind = report.error_kind.as_deref().unwrap_or_default(),
                message = report.message.as_str(),
                "Article creation failed"
            );
        }
        report
    }

    pub async fn run(
        &self,
        request: &ArticleRequest,
    ) -> std::result::Result<FinalArticle, PipelineFailure> {
        let mut stage = PipelineStage::QueryPending;
        let fail = |stage: PipelineStage| move |error: PipelineError| PipelineFailure { stage, error };

        info!(keyword = request.keyword.as_str(), "Starting article pipeline");
        let ready = self.await_query(request).await.map_err(fail(stage))?;
        let query_id = ready.query_id.as_str();
        stage = self.advance(query_id, PipelineStage::QueryReady);

        let exact = exact_phrases(&request.keyword);
        let mut draft = self
            .draft(query_id, &ready.terms, &exact)
            .await
            .map_err(fail(stage))?;
        stage = self.advance(query_id, PipelineStage::DraftGenerated);

        let proposed = self
            .generator
            .rewrite_headings(
                &draft.html,
                &ready.terms.h1,
                &ready.terms.h2,
                &exact,
                &request.site_policy,
            )
            .await
            .map_err(fail(stage))?;
        let outcome = HeadingNegotiator::new(self.config.heading_tolerance)
            .negotiate(self.engine.as_ref(), query_id, &draft, &proposed)
            .await
            .map_err(fail(stage))?;
        draft.html = outcome.html;
        draft.score = outcome.score;
        stage = self.advance(query_id, PipelineStage::HeadingsNegotiated);

        let balancer = TermBalancer::new(self.config.balancer);
        balancer
            .fill_gaps(
                self.engine.as_ref(),
                self.generator.as_ref(),
                query_id,
                &mut draft,
                &ready.terms,
            )
            .await
            .map_err(fail(stage))?;
        stage = self.advance(query_id, PipelineStage::GapsFilled);

        balancer
            .reduce_excess(
                self.engine.as_ref(),
                self.generator.as_ref(),
                query_id,
                &mut draft,
                &ready.terms,
            )
            .await
            .map_err(fail(stage))?;
        self.advance(query_id, PipelineStage::ExcessReduced);

        self.advance(query_id, PipelineStage::Done);
        info!(query_id, score = draft.score, "Article pipeline complete");
        Ok(FinalArticle {
            query_id: ready.query_id.clone(),
            title: draft.title,
            description: draft.description,
            html: draft.html,
            score: draft.score,
        })
    }

    fn advance(&self, query_id: &str, stage: PipelineStage) -> PipelineStage {
        info!(query_id, stage = stage.as_str(), "Pipeline stage reached");
        stage
    }

    /// Create the query, wait out the initial delay, then poll until ready.
    async fn await_query(&self, request: &ArticleRequest) -> Result<ReadyQuery, PipelineError> {
        let query_id = self
            .engine
            .create_query(
                &request.project_ref,
                &request.keyword,
                &request.engine_locale,
                &request.language,
            )
            .await?;
        info!(
            query_id = query_id.as_str(),
            delay_secs = self.config.initial_delay.as_secs(),
            "Query created, waiting for analysis"
        );
        self.clock.sleep(self.config.initial_delay).await;

        let started = self.clock.now();
        loop {
            let snapshot = self.engine.fetch_query(&query_id).await?;
            match snapshot.status {
                QueryStatus::Ready => {
                    info!(query_id = query_id.as_str(), terms = snapshot.terms.len(), "Query ready");
                    return Ok(ReadyQuery {
                        query_id,
                        terms: snapshot.terms,
                    });
                }
                QueryStatus::NotFound => return Err(PipelineError::QueryNotFound(query_id)),
                QueryStatus::Unknown(status) => {
                    return Err(PipelineError::EngineUnavailable(format!(
                        "query {query_id} reported unexpected status {status:?}"
                    )))
                }
                QueryStatus::Waiting | QueryStatus::InProgress => {
                    let waited = (self.clock.now() - started).to_std().unwrap_or_default();
                    if waited >= self.config.poll_timeout {
                        warn!(query_id = query_id.as_str(), waited_secs = waited.as_secs(), "Query poll timed out");
                        return Err(PipelineError::QueryTimeout { query_id, waited });
                    }
                    debug!(query_id = query_id.as_str(), waited_secs = waited.as_secs(), "Query not ready yet");
                    self.clock.sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Title, description and article, then an initial submit for the baseline score.
    async fn draft(
        &self,
        query_id: &str,
        terms: &QueryTerms,
        exact: &[String],
    ) -> Result<ContentDraft, PipelineError> {
        let title = self.generator.generate_title(&terms.title, exact).await?;
        let description = self
            .generator
            .generate_description(&terms.description, exact)
            .await?;
        let content_terms: Vec<_> = terms.content_terms().cloned().collect();
        let html = self
            .generator
            .generate_article(&terms.title, &terms.h1, &terms.h2, &content_terms)
            .await?;

        let score = self
            .engine
            .submit(query_id, &html, &title, &description)
            .await?;
        info!(query_id, score, "Draft submitted");

        Ok(ContentDraft {
            title,
            description,
            html,
            score,
        })
    }
}
