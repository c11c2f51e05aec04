//! The closed set of upstream API dialects.
//!
//! Every provider speaks exactly one dialect. A dialect knows where each operation lives, how the credential is
//! attached, which field names it uses on the way out, and which synonyms to accept on the way back in. Adding a new
//! provider family means adding a variant here, not sprinkling field-name guesses around the code.
use std::{fmt::Display, str::FromStr};

use log::*;

use crate::specification::{
    ActionNames,
    ApiSpecification,
    BodyEncoding,
    CredentialPlacement,
    Endpoints,
    RequestFields,
    ResponseFields,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ApiDialect {
    /// The de-facto reseller panel API: one endpoint, an `action` field and the key in the body.
    #[default]
    Standard,
    /// Older REST-style API with per-resource paths, JSON bodies and a header credential.
    LegacyV1,
}

impl Display for ApiDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiDialect::Standard => write!(f, "standard"),
            ApiDialect::LegacyV1 => write!(f, "legacy_v1"),
        }
    }
}

impl FromStr for ApiDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "standard" | "v2" | "default" => Ok(Self::Standard),
            "legacy_v1" | "legacyv1" | "v1" => Ok(Self::LegacyV1),
            other => Err(format!("Unknown API dialect: {other}")),
        }
    }
}

impl From<String> for ApiDialect {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            warn!("🔌️ {e}. Treating the provider as a standard API");
            ApiDialect::Standard
        })
    }
}

const ORDER_ID: &[&str] = &["order", "order_id", "orderId", "id"];
const STATUS: &[&str] = &["status", "order_status", "orderStatus", "state"];
const START_COUNT: &[&str] = &["start_count", "startCount", "start"];
const REMAINS: &[&str] = &["remains", "remaining", "remain"];
const CHARGE: &[&str] = &["charge", "cost", "price"];
const CURRENCY: &[&str] = &["currency", "currency_code"];
const REFILL_ID: &[&str] = &["refill", "refill_id", "refillId"];
const REFILL_AVAILABLE: &[&str] = &["refill_available", "refillAvailable", "can_refill", "canRefill"];
const CANCEL_AVAILABLE: &[&str] = &["cancel_available", "cancelAvailable", "can_cancel", "canCancel"];
const ERROR: &[&str] = &["error", "errors"];

impl ApiDialect {
    /// The full API description for this dialect. Provider-specific values (method, timeout) are filled in by
    /// [`crate::create_api_spec_from_provider`].
    pub fn describe(&self) -> ApiSpecification {
        match self {
            ApiDialect::Standard => ApiSpecification {
                dialect: *self,
                credential: CredentialPlacement::BodyField("key"),
                endpoints: Endpoints { order: "", status: "", refill: "", cancel: "" },
                actions: Some(ActionNames {
                    field: "action",
                    order: "add",
                    status: "status",
                    refill: "refill",
                    cancel: "cancel",
                }),
                encoding: BodyEncoding::Form,
                request: RequestFields {
                    service: "service",
                    link: "link",
                    quantity: "quantity",
                    comments: "comments",
                    runs: "runs",
                    interval: "interval",
                    order_id: "order",
                    cancel_order_ids: "orders",
                },
                response: standard_response_fields(),
                ..ApiSpecification::default()
            },
            ApiDialect::LegacyV1 => ApiSpecification {
                dialect: *self,
                credential: CredentialPlacement::Header("X-Api-Key"),
                endpoints: Endpoints {
                    order: "/orders",
                    status: "/orders/{id}",
                    refill: "/orders/{id}/refill",
                    cancel: "/orders/{id}/cancel",
                },
                actions: None,
                encoding: BodyEncoding::Json,
                request: RequestFields {
                    service: "serviceId",
                    link: "link",
                    quantity: "quantity",
                    comments: "comments",
                    runs: "runs",
                    interval: "interval",
                    order_id: "orderId",
                    cancel_order_ids: "orderIds",
                },
                response: ResponseFields {
                    order_id: &["orderId", "order_id", "order", "id"],
                    start_count: &["startCount", "start_count", "start"],
                    ..standard_response_fields()
                },
                ..ApiSpecification::default()
            },
        }
    }
}

fn standard_response_fields() -> ResponseFields {
    ResponseFields {
        order_id: ORDER_ID,
        status: STATUS,
        start_count: START_COUNT,
        remains: REMAINS,
        charge: CHARGE,
        currency: CURRENCY,
        refill_id: REFILL_ID,
        refill_available: REFILL_AVAILABLE,
        cancel_available: CANCEL_AVAILABLE,
        error: ERROR,
    }
}
