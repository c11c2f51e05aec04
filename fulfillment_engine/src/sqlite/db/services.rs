use log::*;
use sqlx::SqliteConnection;

use crate::db_types::{NewService, Service};

pub async fn insert_service(service: NewService, conn: &mut SqliteConnection) -> Result<Service, sqlx::Error> {
    let service: Service = sqlx::query_as(
        r#"
            INSERT INTO services (
                name,
                category,
                provider_id,
                provider_service_id,
                rate,
                min_order,
                max_order,
                refill,
                cancel,
                refill_days
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(service.name)
    .bind(service.category)
    .bind(service.provider_id)
    .bind(service.provider_service_id)
    .bind(service.rate)
    .bind(service.min_order)
    .bind(service.max_order)
    .bind(service.refill)
    .bind(service.cancel)
    .bind(service.refill_days)
    .fetch_one(conn)
    .await?;
    debug!("🛒️ Service '{}' saved with id {}", service.name, service.id);
    Ok(service)
}

pub async fn fetch_service(id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, sqlx::Error> {
    let service = sqlx::query_as("SELECT * FROM services WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(service)
}
