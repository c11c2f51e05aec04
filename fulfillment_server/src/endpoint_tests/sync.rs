use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use fulfillment_engine::{
    db_types::{Order, Provider, ProviderOrderLog, ProviderStatus, SyncCandidate},
    FulfillmentError,
    ProviderSyncApi,
    SyncRunResult,
};
use panel_common::{Amount, OrderStatus, Quantity, Secret};
use provider_tools::{ForwardingFacade, TransportResponse};
use serde_json::json;

use super::helpers::{get_request, post_request, ADMIN_TOKEN};
use crate::{
    endpoint_tests::mocks::{MockSyncStore, MockTransport},
    middleware::AdminTokenMiddlewareFactory,
    routes::ManualSyncRoute,
};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/health", configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn sync_without_a_token_is_refused() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("", "/api/sync", json!({}), configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Unauthorized. A valid admin token is required"}"#);
}

#[actix_web::test]
async fn sync_with_the_wrong_token_is_refused() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request("let-me-in-please", "/api/sync", json!({}), configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn an_unconfigured_token_refuses_everything() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("", "/api/sync", json!({}), configure_without_token).await.expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn sync_everything() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(ADMIN_TOKEN, "/api/sync", json!({}), configure_nothing_to_sync).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: SyncRunResult = serde_json::from_str(&body).expect("Not a sync result");
    assert_eq!(result, SyncRunResult::default());
}

#[actix_web::test]
async fn sync_selected_orders() {
    let _ = env_logger::try_init().ok();
    let body = json!({"orderIds": [3, 5]});
    let (status, _) =
        post_request(ADMIN_TOKEN, "/api/sync", body, configure_selected_orders).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn failed_selection_is_a_server_error() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(ADMIN_TOKEN, "/api/sync", json!({}), configure_broken_database).await.expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("database is locked"), "Unexpected body: {body}");
}

#[actix_web::test]
async fn completed_order_is_written_back() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(ADMIN_TOKEN, "/api/sync", json!({"providerId": 2}), configure_one_completed_order)
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: SyncRunResult = serde_json::from_str(&body).expect("Not a sync result");
    assert_eq!(result.processed, 1);
    assert_eq!(result.synced, 1);
    assert_eq!(result.failed, 0);
    assert_eq!(result.updated_order_ids, vec![7]);
}

fn mount(cfg: &mut ServiceConfig, db: MockSyncStore, transport: MockTransport, token: &str) {
    let api = ProviderSyncApi::new(db, ForwardingFacade::new(transport));
    let scope = web::scope("/api")
        .wrap(AdminTokenMiddlewareFactory::new(Secret::new(token.to_string())))
        .service(ManualSyncRoute::<MockSyncStore, MockTransport>::new());
    cfg.app_data(web::Data::new(api)).service(scope);
}

// The mocks have no expectations, so any call into the database or a provider fails the test
fn configure_untouched(cfg: &mut ServiceConfig) {
    mount(cfg, MockSyncStore::new(), MockTransport::new(), ADMIN_TOKEN);
}

fn configure_without_token(cfg: &mut ServiceConfig) {
    mount(cfg, MockSyncStore::new(), MockTransport::new(), "");
}

fn configure_nothing_to_sync(cfg: &mut ServiceConfig) {
    let mut db = MockSyncStore::new();
    db.expect_fetch_sync_candidates()
        .withf(|provider_id, limit| provider_id.is_none() && *limit == 200)
        .times(1)
        .returning(|_, _| Ok(vec![]));
    db.expect_fetch_providers().returning(|_| Ok(vec![]));
    mount(cfg, db, MockTransport::new(), ADMIN_TOKEN);
}

fn configure_selected_orders(cfg: &mut ServiceConfig) {
    let mut db = MockSyncStore::new();
    db.expect_fetch_sync_candidates_by_ids()
        .withf(|ids| ids.to_vec() == vec![3, 5])
        .times(1)
        .returning(|_| Ok(vec![]));
    db.expect_fetch_providers().returning(|_| Ok(vec![]));
    mount(cfg, db, MockTransport::new(), ADMIN_TOKEN);
}

fn configure_broken_database(cfg: &mut ServiceConfig) {
    let mut db = MockSyncStore::new();
    db.expect_fetch_sync_candidates()
        .returning(|_, _| Err(FulfillmentError::DatabaseError("database is locked".into())));
    mount(cfg, db, MockTransport::new(), ADMIN_TOKEN);
}

fn configure_one_completed_order(cfg: &mut ServiceConfig) {
    let mut db = MockSyncStore::new();
    db.expect_fetch_sync_candidates().withf(|provider_id, _| *provider_id == Some(2)).returning(|_, _| {
        Ok(vec![SyncCandidate { order: processing_order(7), provider_id: Some(2), provider_service_id: Some("101".into()) }])
    });
    db.expect_fetch_providers().returning(|_| Ok(vec![active_provider(2)]));
    db.expect_apply_sync_update()
        .withf(|id, update| *id == 7 && update.status == Some(OrderStatus::Completed))
        .times(1)
        .returning(|id, update| {
            let mut order = processing_order(id);
            order.status = update.status.unwrap_or(order.status);
            order.provider_status = update.provider_status;
            order.remains = update.remains;
            Ok(order)
        });
    db.expect_insert_provider_log().times(1).returning(|log| {
        Ok(ProviderOrderLog {
            id: 1,
            order_id: log.order_id,
            provider_id: log.provider_id,
            action: log.action,
            status: log.status,
            response: log.response,
            error_message: log.error_message,
            created_at: Utc::now(),
        })
    });
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Ok(TransportResponse::new(200, r#"{"status": "Completed", "remains": "0"}"#)));
    mount(cfg, db, transport, ADMIN_TOKEN);
}

fn processing_order(id: i64) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 15, 18, 30, 0).unwrap();
    Order {
        id,
        user_id: 1,
        service_id: 1,
        provider_order_id: Some(format!("90{id}")),
        status: OrderStatus::Processing,
        provider_status: Some(OrderStatus::Processing),
        link: "https://example.com/someone".to_string(),
        comments: None,
        runs: None,
        interval: None,
        quantity: Quantity::from(1000u64),
        remains: Some(Quantity::from(1000u64)),
        start_count: None,
        charge: None,
        price: Amount::from(10),
        usd_price: Amount::from(10),
        currency: "USD".to_string(),
        forward_failed: false,
        spend_recorded: true,
        refund_applied: false,
        last_sync_at: None,
        created_at,
        updated_at: created_at,
    }
}

fn active_provider(id: i64) -> Provider {
    let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Provider {
        id,
        name: "acme".to_string(),
        api_base_url: "https://acme.example/api/v2".to_string(),
        api_key: Secret::new("test-key".to_string()),
        status: ProviderStatus::Active,
        http_method: None,
        timeout_seconds: None,
        api_dialect_type: None,
        created_at,
        updated_at: created_at,
    }
}
