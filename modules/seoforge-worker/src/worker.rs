//! Processing boundary: turns claimed queue items into pipeline runs and
//! records every outcome back on the queue.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

use seoforge_common::{PipelineError, WorkItem, WorkStatus};
use seoforge_pipeline::{ArticleReport, ArticleRequest, Pipeline, SitePolicy};
use seoforge_queue::{LeaseManager, QueueStats};

use crate::publisher::{LogPublisher, Publisher};

/// Long-lived collaborators of a worker.
#[derive(Clone, TypedBuilder)]
pub struct WorkerDeps {
    pub pipeline: Arc<Pipeline>,
    pub leases: LeaseManager,
    #[builder(default = Arc::new(LogPublisher))]
    pub publisher: Arc<dyn Publisher>,
    /// Site policy file. Without one, every item gets an empty policy.
    #[builder(default)]
    pub anchors_config_path: Option<PathBuf>,
    #[builder(default = "seoforge-worker".to_string())]
    pub worker_id: String,
    #[builder(default = chrono::Duration::minutes(120))]
    pub lease: chrono::Duration,
    #[builder(default = 5)]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub released: usize,
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub queue: Option<QueueStats>,
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "released={} claimed={} completed={} failed={}",
            self.released, self.claimed, self.completed, self.failed
        )?;
        if let Some(q) = &self.queue {
            write!(
                f,
                " | queue total={} pending={} processing={} expired={} completed={} failed={}",
                q.total, q.pending, q.processing, q.expired, q.completed, q.failed
            )?;
        }
        Ok(())
    }
}

pub struct Worker {
    deps: WorkerDeps,
}

impl Worker {
    pub fn new(deps: WorkerDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &WorkerDeps {
        &self.deps
    }

    pub fn site_policy(&self, item: &WorkItem) -> Result<SitePolicy, PipelineError> {
        match &self.deps.anchors_config_path {
            Some(path) => SitePolicy::load(path, item.site.as_deref()),
            None => Ok(SitePolicy::empty(item.site.clone().unwrap_or_default())),
        }
    }

    /// Run one item end to end and record the result on the queue. The item
    /// must be leased to this worker's id. A panic inside the run is recorded
    /// as a failure like any other.
    pub async fn process(&self, item: &WorkItem) -> Result<ArticleReport> {
        info!(item_id = %item.id, keyword = item.keyword.as_str(), attempt = item.attempts, "Processing item");

        let report = match AssertUnwindSafe(self.attempt(item)).catch_unwind().await {
            Ok(report) => report,
            Err(panic) => {
                let message = format!("panic during article run: {}", panic_message(panic.as_ref()));
                error!(item_id = %item.id, message = message.as_str(), "Article run panicked");
                failure_report("panic", message)
            }
        };

        let owner = self.deps.worker_id.as_str();
        if report.success {
            self.deps
                .leases
                .complete(&[item.id], owner, WorkStatus::Completed, None)
                .await?;
            info!(item_id = %item.id, message = report.message.as_str(), "Item completed");
        } else {
            self.deps
                .leases
                .complete(&[item.id], owner, WorkStatus::Failed, Some(report.message.as_str()))
                .await?;
            warn!(
                item_id = %item.id,
                error_kind = report.error_kind.as_deref().unwrap_or("unknown"),
                message = report.message.as_str(),
                "Item failed"
            );
        }
        Ok(report)
    }

    async fn attempt(&self, item: &WorkItem) -> ArticleReport {
        let site_policy = match self.site_policy(item) {
            Ok(policy) => policy,
            Err(e) => return failure_report(e.kind(), e.to_string()),
        };

        let request = ArticleRequest {
            project_ref: item.project_ref.clone(),
            keyword: item.keyword.clone(),
            engine_locale: item.engine_locale.clone(),
            language: item.language.clone(),
            site_policy,
        };
        let report = self.deps.pipeline.create_article(&request).await;

        match &report.article {
            Some(article) if report.success => match self.deps.publisher.publish(item, article).await {
                Ok(()) => report,
                Err(e) => failure_report("publish_error", format!("publish failed: {e:#}")),
            },
            _ => report,
        }
    }

    /// Recover expired leases, claim a batch and process it sequentially.
    pub async fn run_cycle(&self) -> Result<CycleStats> {
        let mut stats = CycleStats {
            released: self.deps.leases.release_expired().await?,
            ..CycleStats::default()
        };

        let items = self
            .deps
            .leases
            .claim(self.deps.batch_size, &self.deps.worker_id, self.deps.lease)
            .await?;
        stats.claimed = items.len();

        for item in &items {
            match self.process(item).await {
                Ok(report) if report.success => stats.completed += 1,
                Ok(_) => stats.failed += 1,
                // The rest of the batch still runs. This item stays leased
                // until its lease runs out and the next cycle releases it.
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "Failed to record item outcome");
                    stats.failed += 1;
                }
            }
        }

        stats.queue = match self.deps.leases.stats().await {
            Ok(queue) => Some(queue),
            Err(e) => {
                warn!(error = %e, "Failed to read queue stats");
                None
            }
        };
        info!(worker_id = self.deps.worker_id.as_str(), "Cycle finished. {stats}");
        Ok(stats)
    }
}

fn failure_report(kind: &str, message: String) -> ArticleReport {
    ArticleReport {
        success: false,
        message,
        error_kind: Some(kind.to_string()),
        failed_stage: None,
        article: None,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
