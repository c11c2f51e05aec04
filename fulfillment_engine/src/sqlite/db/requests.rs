//! Refill and cancel requests share a shape and a lifecycle, so the same functions serve both tables.
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{OrderRequest, RequestKind, RequestStatus},
    traits::FulfillmentError,
};

/// Inserts a new `pending` request, unless a live (`pending` or `approved`) request of the same kind already exists for
/// the order.
///
/// The check and the insert are a single statement, so two concurrent callers cannot both succeed.
pub async fn insert_request(
    kind: RequestKind,
    order_id: i64,
    user_id: i64,
    reason: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<OrderRequest, FulfillmentError> {
    let table = kind.table();
    let sql = format!(
        r#"
            INSERT INTO {table} (order_id, user_id, reason, status)
            SELECT $1, $2, $3, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM {table} WHERE order_id = $1 AND status IN ('pending', 'approved')
            )
            RETURNING *;
        "#
    );
    let request: Option<OrderRequest> = sqlx::query_as(&sql)
        .bind(order_id)
        .bind(user_id)
        .bind(reason)
        .bind(RequestStatus::Pending)
        .fetch_optional(conn)
        .await?;
    match request {
        Some(r) => {
            debug!("📨️ {kind} request #{} created for order #{order_id}", r.id);
            Ok(r)
        },
        None => Err(FulfillmentError::LiveRequestExists { kind, order_id }),
    }
}

/// Moves a request to its outcome status and stamps `processed_at`.
pub async fn resolve_request(
    kind: RequestKind,
    id: i64,
    status: RequestStatus,
    provider_refill_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<OrderRequest, FulfillmentError> {
    let sql = format!(
        r#"
            UPDATE {} SET
                status = $1,
                provider_refill_id = COALESCE($2, provider_refill_id),
                processed_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
        kind.table()
    );
    let request = sqlx::query_as(&sql)
        .bind(status)
        .bind(provider_refill_id)
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(FulfillmentError::RequestNotFound { kind, id })?;
    Ok(request)
}

pub async fn fetch_requests_for_order(
    kind: RequestKind,
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderRequest>, sqlx::Error> {
    let sql = format!("SELECT * FROM {} WHERE order_id = $1 ORDER BY id ASC", kind.table());
    let requests = sqlx::query_as(&sql).bind(order_id).fetch_all(conn).await?;
    Ok(requests)
}
