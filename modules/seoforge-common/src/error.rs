use std::time::Duration;

use thiserror::Error;

/// Attempt-fatal failures of a pipeline run. None of these are retried inside the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Term engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Query {query_id} not ready after {waited:?}")]
    QueryTimeout { query_id: String, waited: Duration },

    #[error("Query {0} not found")]
    QueryNotFound(String),

    #[error("Heading count mismatch: article has {original}, proposal has {proposed}")]
    HeadingCountMismatch { original: usize, proposed: usize },

    #[error("Site policy error: {0}")]
    SitePolicy(String),
}

impl PipelineError {
    /// Stable machine-readable reason, recorded on failed runs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EngineUnavailable(_) => "engine_unavailable",
            PipelineError::Generation(_) => "generation_error",
            PipelineError::QueryTimeout { .. } => "query_timeout",
            PipelineError::QueryNotFound(_) => "query_not_found",
            PipelineError::HeadingCountMismatch { .. } => "heading_count_mismatch",
            PipelineError::SitePolicy(_) => "site_policy",
        }
    }
}
