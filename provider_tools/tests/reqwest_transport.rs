use std::time::Duration;

use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use panel_common::{OrderStatus, Quantity};
use provider_tools::{
    ApiDialect,
    ForwardOrder,
    ForwardingFacade,
    HttpMethod,
    ProviderApiError,
    ProviderConfig,
    ReqwestTransport,
};
use serde_json::json;

fn facade() -> ForwardingFacade<ReqwestTransport> {
    let _ = env_logger::try_init();
    ForwardingFacade::new(ReqwestTransport::new().expect("Could not create transport"))
}

#[tokio::test]
async fn standard_dialect_posts_a_form() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v2")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("key=test-key")
                .body_contains("action=add")
                .body_contains("service=12")
                .body_contains("quantity=1000");
            then.status(200).json_body(json!({"order": 23501}));
        })
        .await;
    let provider = ProviderConfig::new(1, "acme", &server.url("/api/v2"), "test-key");
    let order = ForwardOrder::new("12", "https://example.com/me", Quantity::from(1000u64));
    let receipt = facade().forward_order(&provider, &order).await.unwrap();
    mock.assert_async().await;
    assert_eq!(receipt.provider_order_id, "23501");
}

#[tokio::test]
async fn get_requests_use_the_query_string() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v2").query_param("action", "status").query_param("order", "23501");
            then.status(200).body(r#"{"status":"In progress","start_count":"120","remains":"880","charge":"0.27"}"#);
        })
        .await;
    let provider =
        ProviderConfig::new(1, "acme", &server.url("/api/v2"), "test-key").with_method(HttpMethod::Get);
    let (report, raw) = facade().fetch_order_status(&provider, "23501").await.unwrap();
    mock.assert_async().await;
    assert_eq!(report.status, Some(OrderStatus::Processing));
    assert_eq!(report.start_count, Some(Quantity::from(120u64)));
    assert_eq!(report.remains, Some(Quantity::from(880u64)));
    assert!(raw.contains("In progress"));
}

#[tokio::test]
async fn legacy_dialect_uses_header_credential_and_paths() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/orders/abc/refill").header("X-Api-Key", "test-key");
            then.status(200).json_body(json!({"refillId": "r-77"}));
        })
        .await;
    let provider =
        ProviderConfig::new(2, "legacy", &server.base_url(), "test-key").with_dialect(ApiDialect::LegacyV1);
    let receipt = facade().forward_refill(&provider, "abc").await.unwrap();
    mock.assert_async().await;
    assert_eq!(receipt.refill_id.as_deref(), Some("r-77"));
}

#[tokio::test]
async fn provider_rejections_keep_the_raw_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2");
            then.status(200).body(r#"{"error":"Not enough funds on balance"}"#);
        })
        .await;
    let provider = ProviderConfig::new(1, "acme", &server.url("/api/v2"), "test-key");
    let order = ForwardOrder::new("12", "https://example.com/me", Quantity::from(10u64));
    let err = facade().forward_order(&provider, &order).await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(err.raw_response(), Some(r#"{"error":"Not enough funds on balance"}"#));
}

#[tokio::test]
async fn http_errors_are_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2");
            then.status(502).body("<html>Bad gateway</html>");
        })
        .await;
    let provider = ProviderConfig::new(1, "acme", &server.url("/api/v2"), "test-key");
    let err = facade().forward_cancel(&provider, "1").await.unwrap_err();
    assert!(matches!(err, ProviderApiError::HttpStatus { status: 502, .. }), "{err:?}");
}

#[tokio::test]
async fn slow_providers_time_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2");
            then.status(200).delay(Duration::from_secs(3)).body(r#"{"status":"Completed"}"#);
        })
        .await;
    let provider =
        ProviderConfig::new(1, "acme", &server.url("/api/v2"), "test-key").with_timeout(Duration::from_secs(1));
    let err = facade().fetch_order_status(&provider, "1").await.unwrap_err();
    assert!(matches!(err, ProviderApiError::Timeout { seconds: 1 }), "{err:?}");
}

#[tokio::test]
async fn unreachable_providers_fail_to_connect() {
    let provider = ProviderConfig::new(1, "nowhere", "http://127.0.0.1:9", "test-key");
    let err = facade().fetch_order_status(&provider, "1").await.unwrap_err();
    assert!(matches!(err, ProviderApiError::Connection(_)), "{err:?}");
}

#[tokio::test]
async fn connection_errors_do_not_reveal_the_credential() {
    let provider = ProviderConfig::new(1, "nowhere", "http://127.0.0.1:1/api/v2", "SUPER-SECRET-KEY")
        .with_method(HttpMethod::Get);
    let err = facade().fetch_order_status(&provider, "9").await.unwrap_err();
    assert!(matches!(err, ProviderApiError::Connection(_)), "{err:?}");
    let msg = err.to_string();
    assert!(!msg.contains("SUPER-SECRET-KEY"), "{msg}");
    assert!(!format!("{err:?}").contains("SUPER-SECRET-KEY"), "{err:?}");
}
