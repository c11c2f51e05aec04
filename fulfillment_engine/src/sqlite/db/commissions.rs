use log::*;
use panel_common::Amount;
use sqlx::SqliteConnection;

use crate::db_types::{AffiliateCommission, CommissionStatus};

pub async fn insert_commission(
    order_id: i64,
    affiliate_user_id: i64,
    amount: Amount,
    conn: &mut SqliteConnection,
) -> Result<AffiliateCommission, sqlx::Error> {
    let commission = sqlx::query_as(
        r#"
            INSERT INTO affiliate_commissions (order_id, affiliate_user_id, amount, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(affiliate_user_id)
    .bind(amount)
    .bind(CommissionStatus::Pending)
    .fetch_one(conn)
    .await?;
    Ok(commission)
}

/// Pending commissions on the order become payable. Returns the number of commissions approved.
pub async fn approve_commissions(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE affiliate_commissions SET status = 'approved', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'pending'
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🤝️ {} commissions approved for order #{order_id}", result.rows_affected());
    }
    Ok(result.rows_affected())
}

/// Pending and approved commissions on the order are voided. Returns the number of commissions cancelled.
pub async fn cancel_commissions(order_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE affiliate_commissions SET status = 'cancelled', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status IN ('pending', 'approved')
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🤝️ {} commissions cancelled for order #{order_id}", result.rows_affected());
    }
    Ok(result.rows_affected())
}

pub async fn fetch_commissions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<AffiliateCommission>, sqlx::Error> {
    let commissions = sqlx::query_as("SELECT * FROM affiliate_commissions WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(commissions)
}
