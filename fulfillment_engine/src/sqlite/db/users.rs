use log::*;
use panel_common::Amount;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, User},
    traits::FulfillmentError,
};

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, sqlx::Error> {
    let user: User = sqlx::query_as(
        r#"
            INSERT INTO users (username, balance, total_spent, currency, dollar_rate)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user.username)
    .bind(user.balance)
    .bind(user.total_spent)
    .bind(user.currency)
    .bind(user.dollar_rate)
    .fetch_one(conn)
    .await?;
    debug!("👤️ User '{}' saved with id {}", user.username, user.id);
    Ok(user)
}

pub async fn fetch_user(id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(user)
}

/// Overwrites the user's balance and lifetime spend.
///
/// Balances are exact decimals stored as text, so arithmetic happens in Rust. Only call this from inside a
/// transaction that has already taken the write lock (i.e. has written something), after re-reading the user in that
/// same transaction.
pub async fn set_balances(
    user_id: i64,
    balance: Amount,
    total_spent: Amount,
    conn: &mut SqliteConnection,
) -> Result<User, FulfillmentError> {
    let user = sqlx::query_as(
        r#"
            UPDATE users SET balance = $1, total_spent = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(balance)
    .bind(total_spent)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(FulfillmentError::UserNotFound(user_id))?;
    trace!("👤️ User #{user_id} balance is now {balance}. Total spent: {total_spent}");
    Ok(user)
}
