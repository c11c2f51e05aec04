//! The provider audit log. Rows are only ever inserted; the schema rejects updates and deletes.
use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewProviderOrderLog, ProviderOrderLog};

pub async fn insert_log(log: NewProviderOrderLog, conn: &mut SqliteConnection) -> Result<ProviderOrderLog, sqlx::Error> {
    let entry: ProviderOrderLog = sqlx::query_as(
        r#"
            INSERT INTO provider_order_logs (order_id, provider_id, action, status, response, error_message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(log.order_id)
    .bind(log.provider_id)
    .bind(log.action)
    .bind(log.status)
    .bind(log.response)
    .bind(log.error_message)
    .fetch_one(conn)
    .await?;
    trace!("🧾️ Audit entry #{}: order #{} {} {}", entry.id, entry.order_id, entry.action, entry.status);
    Ok(entry)
}

/// All audit entries for the order, oldest first.
pub async fn fetch_logs_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProviderOrderLog>, sqlx::Error> {
    let logs = sqlx::query_as("SELECT * FROM provider_order_logs WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(logs)
}

/// The provider that most recently handled the order, according to the audit log.
pub async fn latest_provider_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let provider_id: Option<(i64,)> = sqlx::query_as(
        r#"
            SELECT provider_id FROM provider_order_logs
            WHERE order_id = $1 AND provider_id IS NOT NULL
            ORDER BY id DESC LIMIT 1
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(provider_id.map(|(id,)| id))
}
