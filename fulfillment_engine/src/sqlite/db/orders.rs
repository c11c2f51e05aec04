use log::*;
use panel_common::{Amount, OrderStatus};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderDetails, OrderPricing, OrderSyncUpdate, SyncCandidate},
    traits::FulfillmentError,
};

/// Millisecond-precision timestamp, so that "least recently synced" ordering survives several runs per second.
const NOW_MS: &str = "strftime('%Y-%m-%d %H:%M:%f', 'now')";

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The order starts out `pending`, with nothing remaining delivered.
pub async fn insert_order(
    order: NewOrder,
    pricing: OrderPricing,
    conn: &mut SqliteConnection,
) -> Result<Order, FulfillmentError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                service_id,
                status,
                link,
                comments,
                runs,
                interval,
                quantity,
                remains,
                price,
                usd_price,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.service_id)
    .bind(OrderStatus::Pending)
    .bind(order.link)
    .bind(order.comments)
    .bind(order.runs)
    .bind(order.interval)
    .bind(order.quantity)
    .bind(order.quantity)
    .bind(pricing.price)
    .bind(pricing.usd_price)
    .bind(pricing.currency)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order #{} inserted for user #{}. Price: {} {}", order.id, order.user_id, order.price, order.currency);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches the order along with the user and service display fields.
pub async fn fetch_order_details(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderDetails>, sqlx::Error> {
    let details = sqlx::query_as(
        r#"
            SELECT
                orders.*,
                users.username AS username,
                services.name AS service_name,
                services.category AS category
            FROM orders
                JOIN users ON users.id = orders.user_id
                JOIN services ON services.id = orders.service_id
            WHERE orders.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(details)
}

/// Records a successful forward: the provider reference is stored, the order moves to `processing` and the spend is
/// flagged as recorded. Returns `None` if the order does not exist or has already been forwarded.
pub async fn mark_forwarded(
    id: i64,
    provider_order_id: &str,
    charge: Option<Amount>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                provider_order_id = $1,
                status = $2,
                charge = COALESCE($3, charge),
                forward_failed = 0,
                spend_recorded = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $4 AND provider_order_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(provider_order_id)
    .bind(OrderStatus::Processing)
    .bind(charge)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn mark_forward_failed(id: i64, conn: &mut SqliteConnection) -> Result<Order, FulfillmentError> {
    let order = sqlx::query_as(
        "UPDATE orders SET forward_failed = 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(FulfillmentError::OrderNotFound(id))?;
    Ok(order)
}

/// Fetches orders that have an upstream reference and whose service is linked to a provider, least recently synced
/// first (never-synced orders come first of all).
pub async fn fetch_sync_candidates(
    provider_id: Option<i64>,
    limit: usize,
    conn: &mut SqliteConnection,
) -> Result<Vec<SyncCandidate>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            orders.*,
            services.provider_id AS provider_id,
            services.provider_service_id AS provider_service_id
        FROM orders JOIN services ON services.id = orders.service_id
        WHERE orders.provider_order_id IS NOT NULL
            AND services.provider_id IS NOT NULL
            AND services.provider_service_id IS NOT NULL
        "#,
    );
    if let Some(id) = provider_id {
        builder.push(" AND services.provider_id = ");
        builder.push_bind(id);
    }
    builder.push(" ORDER BY orders.last_sync_at IS NOT NULL, orders.last_sync_at ASC, orders.id ASC LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    let candidates = builder.build_query_as::<SyncCandidate>().fetch_all(conn).await?;
    trace!("📝️ {} sync candidates found", candidates.len());
    Ok(candidates)
}

/// Fetches the given orders, as long as they have an upstream reference. Service linkage may be missing.
pub async fn fetch_sync_candidates_by_ids(
    ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<Vec<SyncCandidate>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            orders.*,
            services.provider_id AS provider_id,
            services.provider_service_id AS provider_service_id
        FROM orders LEFT JOIN services ON services.id = orders.service_id
        WHERE orders.provider_order_id IS NOT NULL AND orders.id IN (
        "#,
    );
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY orders.id");
    let candidates = builder.build_query_as::<SyncCandidate>().fetch_all(conn).await?;
    Ok(candidates)
}

/// Writes the changed fields of a sync and stamps `last_sync_at`. An empty update only stamps the sync time.
pub async fn apply_sync_update(
    id: i64,
    update: &OrderSyncUpdate,
    conn: &mut SqliteConnection,
) -> Result<Order, FulfillmentError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET last_sync_at = ");
    builder.push(NOW_MS);
    if !update.is_empty() {
        builder.push(", updated_at = CURRENT_TIMESTAMP");
    }
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(provider_status) = update.provider_status {
        builder.push(", provider_status = ");
        builder.push_bind(provider_status);
    }
    if let Some(remains) = update.remains {
        builder.push(", remains = ");
        builder.push_bind(remains);
    }
    if let Some(start_count) = update.start_count {
        builder.push(", start_count = ");
        builder.push_bind(start_count);
    }
    if let Some(charge) = update.charge {
        builder.push(", charge = ");
        builder.push_bind(charge);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    let order = builder
        .build_query_as::<Order>()
        .fetch_optional(conn)
        .await?
        .ok_or(FulfillmentError::OrderNotFound(id))?;
    Ok(order)
}

/// Claims the one-time refund marker on the order. Returns `true` if this call claimed it, and `false` if the refund
/// has already been applied.
///
/// This is the guard against double refunds, so it must run inside the same transaction as the balance change.
pub async fn claim_refund(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET refund_applied = 1 WHERE id = $1 AND refund_applied = 0")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
