use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use seoforge_common::{FinalArticle, WorkItem};

/// Destination for finished articles (CMS, file drop, ...).
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, item: &WorkItem, article: &FinalArticle) -> Result<()>;
}

/// Logs the article and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl Publisher for LogPublisher {
    async fn publish(&self, item: &WorkItem, article: &FinalArticle) -> Result<()> {
        info!(
            item_id = %item.id,
            keyword = item.keyword.as_str(),
            site = item.site.as_deref().unwrap_or("<none>"),
            query_id = article.query_id.as_str(),
            title = article.title.as_str(),
            score = article.score,
            html_len = article.html.len(),
            "Article ready"
        );
        Ok(())
    }
}
