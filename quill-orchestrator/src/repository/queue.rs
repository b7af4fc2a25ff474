//! Queue Repository
//!
//! Task queue stored in the `job_queue` table. Leasing pushes a delivery's
//! `visible_at` past the lease, so a delivery that is never acknowledged
//! becomes visible again and is handed out to another runner.

use async_trait::async_trait;
use chrono::Utc;
use quill_core::dto::queue::Delivery;
use quill_jobs::{DeliverySource, QueueError, TaskQueue};
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgTaskQueue {
    pool: PgPool,
    lease: Duration,
}

impl PgTaskQueue {
    pub fn new(pool: PgPool, lease: Duration) -> Self {
        Self { pool, lease }
    }
}

#[async_trait]
impl TaskQueue for PgTaskQueue {
    async fn enqueue(&self, job_id: Uuid, delay: Duration) -> Result<(), QueueError> {
        enqueue(&self.pool, job_id, delay).await
    }
}

#[async_trait]
impl DeliverySource for PgTaskQueue {
    async fn lease(&self, max: usize) -> Result<Vec<Delivery>, QueueError> {
        lease(&self.pool, max, self.lease).await
    }

    async fn ack(&self, delivery_id: i64) -> Result<(), QueueError> {
        ack(&self.pool, delivery_id).await
    }
}

/// Add a delivery for a job, visible after `delay`
pub async fn enqueue(pool: &PgPool, job_id: Uuid, delay: Duration) -> Result<(), QueueError> {
    let now = Utc::now();
    let visible_at = now + chrono::Duration::from_std(delay).map_err(backend)?;

    sqlx::query(
        r#"
        INSERT INTO job_queue (job_id, enqueued_at, visible_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(job_id)
    .bind(now)
    .bind(visible_at)
    .execute(pool)
    .await
    .map_err(backend)?;

    Ok(())
}

/// Lease up to `max` visible deliveries
///
/// `SKIP LOCKED` lets concurrent leases pick disjoint rows.
pub async fn lease(pool: &PgPool, max: usize, lease: Duration) -> Result<Vec<Delivery>, QueueError> {
    let now = Utc::now();
    let visible_at = now + chrono::Duration::from_std(lease).map_err(backend)?;

    let rows = sqlx::query_as::<_, DeliveryRow>(
        r#"
        UPDATE job_queue
        SET visible_at = $1, delivery_count = delivery_count + 1
        WHERE id IN (
            SELECT id FROM job_queue
            WHERE visible_at <= $2
            ORDER BY visible_at, id
            LIMIT $3
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, job_id, delivery_count
        "#,
    )
    .bind(visible_at)
    .bind(now)
    .bind(max as i64)
    .fetch_all(pool)
    .await
    .map_err(backend)?;

    let mut deliveries: Vec<Delivery> = rows.into_iter().map(Delivery::from).collect();
    deliveries.sort_by_key(|d| d.id);
    Ok(deliveries)
}

/// Remove a handled delivery
pub async fn ack(pool: &PgPool, delivery_id: i64) -> Result<(), QueueError> {
    let result = sqlx::query("DELETE FROM job_queue WHERE id = $1")
        .bind(delivery_id)
        .execute(pool)
        .await
        .map_err(backend)?;

    if result.rows_affected() == 0 {
        return Err(QueueError::UnknownDelivery(delivery_id));
    }

    Ok(())
}

fn backend(err: impl std::fmt::Display) -> QueueError {
    QueueError::Backend(err.to_string())
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i64,
    job_id: Uuid,
    delivery_count: i32,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            id: row.id,
            job_id: row.job_id,
            delivery_count: row.delivery_count.max(0) as u32,
        }
    }
}
