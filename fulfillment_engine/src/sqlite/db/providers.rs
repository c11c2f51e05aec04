use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{NewProvider, Provider};

pub async fn insert_provider(provider: NewProvider, conn: &mut SqliteConnection) -> Result<Provider, sqlx::Error> {
    let provider: Provider = sqlx::query_as(
        r#"
            INSERT INTO providers (name, api_base_url, api_key, status, http_method, timeout_seconds, api_dialect_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(provider.name)
    .bind(provider.api_base_url)
    .bind(provider.api_key.reveal().clone())
    .bind(provider.status)
    .bind(provider.http_method)
    .bind(provider.timeout_seconds)
    .bind(provider.api_dialect_type)
    .fetch_one(conn)
    .await?;
    debug!("🔌️ Provider '{}' saved with id {}", provider.name, provider.id);
    Ok(provider)
}

pub async fn fetch_provider(id: i64, conn: &mut SqliteConnection) -> Result<Option<Provider>, sqlx::Error> {
    let provider = sqlx::query_as("SELECT * FROM providers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(provider)
}

/// Loads all the given providers in one query. Ids that do not exist are silently ignored.
pub async fn fetch_providers(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Provider>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM providers WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(") ORDER BY id");
    let providers = builder.build_query_as::<Provider>().fetch_all(conn).await?;
    trace!("🔌️ Loaded {} of {} requested providers", providers.len(), ids.len());
    Ok(providers)
}
