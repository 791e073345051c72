//! Postgres-backed queue. Guards are evaluated inside a single
//! `UPDATE ... WHERE ... RETURNING`, so a row is only changed while the guard
//! still holds at the moment Postgres locks it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use tracing::info;
use uuid::Uuid;

use seoforge_common::{NewWorkItem, WorkItem};

use crate::error::{QueueError, Result};
use crate::store::{Filter, Guard, QueueStats, QueueStore, Transition};

const SCHEMA: &str = include_str!("../migrations/001_keyword_queue.sql");

const COLUMNS: &str = "id, keyword, project_ref, engine_locale, language, site, priority, status, \
                       owner, lease_expiry, attempts, error, created_at, processed_at";

const ORDER: &str = "ORDER BY priority DESC, created_at ASC, seq ASC";

fn claimable(param: usize) -> String {
    format!(
        "(status = 'pending' OR (status = 'processing' AND (lease_expiry IS NULL OR lease_expiry < ${param})))"
    )
}

fn expired(param: usize) -> String {
    format!("(status = 'processing' AND (lease_expiry IS NULL OR lease_expiry < ${param}))")
}

/// WHERE predicate for a guard. Each guard takes exactly one parameter.
fn guard_condition(guard: &Guard, param: usize) -> String {
    match guard {
        Guard::Claimable { .. } => claimable(param),
        Guard::Expired { .. } => expired(param),
        Guard::HeldBy { .. } => format!("(status = 'processing' AND owner = ${param})"),
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QueueRow {
    id: Uuid,
    keyword: String,
    project_ref: String,
    engine_locale: String,
    language: String,
    site: Option<String>,
    priority: i32,
    status: String,
    owner: Option<String>,
    lease_expiry: Option<DateTime<Utc>>,
    attempts: i32,
    error: Option<String>,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueRow> for WorkItem {
    type Error = QueueError;

    fn try_from(row: QueueRow) -> Result<Self> {
        Ok(WorkItem {
            id: row.id,
            keyword: row.keyword,
            project_ref: row.project_ref,
            engine_locale: row.engine_locale,
            language: row.language,
            site: row.site,
            priority: row.priority,
            status: row.status.parse().map_err(QueueError::InvalidStatus)?,
            owner: row.owner,
            lease_expiry: row.lease_expiry,
            attempts: row.attempts.max(0) as u32,
            error: row.error,
            created_at: row.created_at,
            processed_at: row.processed_at,
        })
    }
}

fn into_items(rows: Vec<QueueRow>) -> Result<Vec<WorkItem>> {
    rows.into_iter().map(WorkItem::try_from).collect()
}

/// SET clause for a transition, numbering its parameters from `first`.
fn set_clause(transition: &Transition, first: usize) -> String {
    match transition {
        Transition::Claim { .. } => format!(
            "status = 'processing', owner = ${}, lease_expiry = ${}, attempts = attempts + 1",
            first,
            first + 1
        ),
        Transition::Finish { .. } => format!(
            "status = ${}, owner = NULL, lease_expiry = NULL, error = ${}, processed_at = ${}",
            first,
            first + 1,
            first + 2
        ),
        Transition::Release => {
            "status = 'pending', owner = NULL, lease_expiry = NULL".to_string()
        }
    }
}

fn bind_transition<'q>(
    query: QueryAs<'q, Postgres, QueueRow, PgArguments>,
    transition: &'q Transition,
) -> QueryAs<'q, Postgres, QueueRow, PgArguments> {
    match transition {
        Transition::Claim {
            owner,
            lease_expiry,
        } => query.bind(owner.as_str()).bind(*lease_expiry),
        Transition::Finish {
            status,
            error,
            processed_at,
        } => query
            .bind(status.as_str())
            .bind(error.as_deref())
            .bind(*processed_at),
        Transition::Release => query,
    }
}

fn bind_guard<'q>(
    query: QueryAs<'q, Postgres, QueueRow, PgArguments>,
    guard: &'q Guard,
) -> QueryAs<'q, Postgres, QueueRow, PgArguments> {
    match guard {
        Guard::Claimable { now } | Guard::Expired { now } => query.bind(*now),
        Guard::HeldBy { owner } => query.bind(owner.as_str()),
    }
}

#[derive(Clone)]
pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the queue table and indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Keyword queue schema ensured");
        Ok(())
    }

    pub async fn enqueue(&self, new: NewWorkItem, now: DateTime<Utc>) -> Result<WorkItem> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            r#"
            INSERT INTO keyword_queue (id, keyword, project_ref, engine_locale, language, site, priority, status, attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', 0, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.keyword)
        .bind(&new.project_ref)
        .bind(&new.engine_locale)
        .bind(&new.language)
        .bind(&new.site)
        .bind(new.priority)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        WorkItem::try_from(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<WorkItem>> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {COLUMNS} FROM keyword_queue WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkItem::try_from).transpose()
    }
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn select(&self, filter: Filter, limit: Option<usize>) -> Result<Vec<WorkItem>> {
        let limit = limit.map(|l| l as i64);
        let rows = match filter {
            Filter::Claimable { now } => {
                sqlx::query_as::<_, QueueRow>(&format!(
                    "SELECT {COLUMNS} FROM keyword_queue WHERE {} {ORDER} LIMIT $2",
                    claimable(1)
                ))
                .bind(now)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::Expired { now } => {
                sqlx::query_as::<_, QueueRow>(&format!(
                    "SELECT {COLUMNS} FROM keyword_queue WHERE {} {ORDER} LIMIT $2",
                    expired(1)
                ))
                .bind(now)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::Status(status) => {
                sqlx::query_as::<_, QueueRow>(&format!(
                    "SELECT {COLUMNS} FROM keyword_queue WHERE status = $1 {ORDER} LIMIT $2"
                ))
                .bind(status.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::All => {
                sqlx::query_as::<_, QueueRow>(&format!(
                    "SELECT {COLUMNS} FROM keyword_queue {ORDER} LIMIT $1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        into_items(rows)
    }

    async fn update_if(&self, id: Uuid, guard: Guard, transition: Transition) -> Result<Option<WorkItem>> {
        let sql = format!(
            "UPDATE keyword_queue SET {} WHERE id = $1 AND {} RETURNING {COLUMNS}",
            set_clause(&transition, 3),
            guard_condition(&guard, 2)
        );

        let query = sqlx::query_as::<_, QueueRow>(&sql).bind(id);
        let query = bind_guard(query, &guard);
        let row = bind_transition(query, &transition)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkItem::try_from).transpose()
    }

    async fn update_many(&self, ids: &[Uuid], guard: Guard, transition: Transition) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE keyword_queue SET {} WHERE id = ANY($1) AND {} RETURNING {COLUMNS}",
            set_clause(&transition, 3),
            guard_condition(&guard, 2)
        );

        let query = sqlx::query_as::<_, QueueRow>(&sql).bind(ids);
        let query = bind_guard(query, &guard);
        let rows = bind_transition(query, &transition)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.len() as u64)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<QueueStats> {
        let (total, pending, processing, expired, completed, failed) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(&format!(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'processing'),
                    COUNT(*) FILTER (WHERE {}),
                    COUNT(*) FILTER (WHERE status = 'completed'),
                    COUNT(*) FILTER (WHERE status = 'failed')
                FROM keyword_queue
                "#,
                expired(1)
            ))
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(QueueStats {
            total: total as u64,
            pending: pending as u64,
            processing: processing as u64,
            expired: expired as u64,
            completed: completed as u64,
            failed: failed as u64,
        })
    }
}
