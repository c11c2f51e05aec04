use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
pub use panel_common::{Amount, OrderStatus, Quantity, Secret};
use provider_tools::{timeout_from_seconds, ApiDialect, HttpMethod, ProviderConfig};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------    ProviderStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ProviderStatus {
    #[default]
    Active,
    Inactive,
    /// Soft-deleted.
    Trash,
}

impl Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStatus::Active => write!(f, "active"),
            ProviderStatus::Inactive => write!(f, "inactive"),
            ProviderStatus::Trash => write!(f, "trash"),
        }
    }
}

//--------------------------------------       Provider        ---------------------------------------------------------
/// An upstream provider, as stored. The engine never modifies providers.
#[derive(Debug, Clone, FromRow)]
pub struct Provider {
    pub id: i64,
    pub name: String,
    pub api_base_url: String,
    #[sqlx(try_from = "String")]
    pub api_key: Secret<String>,
    pub status: ProviderStatus,
    pub http_method: Option<String>,
    pub timeout_seconds: Option<i64>,
    pub api_dialect_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn is_active(&self) -> bool {
        self.status == ProviderStatus::Active
    }

    /// Resolves the stored configuration into what the provider integration layer needs. Missing or unrecognised
    /// values fall back to defaults.
    pub fn api_config(&self) -> ProviderConfig {
        let dialect = self.api_dialect_type.clone().map(ApiDialect::from).unwrap_or_default();
        ProviderConfig {
            id: self.id,
            name: self.name.clone(),
            api_base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            http_method: HttpMethod::from_config(self.http_method.as_deref()),
            timeout: timeout_from_seconds(self.timeout_seconds),
            dialect,
        }
    }
}

/// Provider fields needed to seed a provider record.
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub api_base_url: String,
    pub api_key: Secret<String>,
    pub status: ProviderStatus,
    pub http_method: Option<String>,
    pub timeout_seconds: Option<i64>,
    pub api_dialect_type: Option<String>,
}

impl NewProvider {
    pub fn new(name: &str, api_base_url: &str, api_key: &str) -> Self {
        Self {
            name: name.to_string(),
            api_base_url: api_base_url.to_string(),
            api_key: Secret::new(api_key.to_string()),
            status: ProviderStatus::Active,
            http_method: None,
            timeout_seconds: None,
            api_dialect_type: None,
        }
    }

    pub fn with_status(mut self, status: ProviderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dialect(mut self, dialect: ApiDialect) -> Self {
        self.api_dialect_type = Some(dialect.to_string());
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: i64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

//--------------------------------------       Service         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub provider_id: Option<i64>,
    pub provider_service_id: Option<String>,
    /// Price in USD per 1,000 units
    pub rate: Amount,
    pub min_order: Quantity,
    pub max_order: Quantity,
    pub refill: bool,
    pub cancel: bool,
    pub refill_days: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Service {
    /// The provider linkage is usable only if both halves are present.
    pub fn provider_link(&self) -> Option<(i64, &str)> {
        match (self.provider_id, self.provider_service_id.as_deref()) {
            (Some(id), Some(sid)) if !sid.is_empty() => Some((id, sid)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub category: Option<String>,
    pub provider_id: Option<i64>,
    pub provider_service_id: Option<String>,
    pub rate: Amount,
    pub min_order: Quantity,
    pub max_order: Quantity,
    pub refill: bool,
    pub cancel: bool,
    pub refill_days: Option<i64>,
}

impl NewService {
    pub fn new(name: &str, rate: Amount) -> Self {
        Self {
            name: name.to_string(),
            category: None,
            provider_id: None,
            provider_service_id: None,
            rate,
            min_order: Quantity::from(1u64),
            max_order: Quantity::from(1_000_000u64),
            refill: false,
            cancel: false,
            refill_days: None,
        }
    }

    pub fn with_provider(mut self, provider_id: i64, provider_service_id: &str) -> Self {
        self.provider_id = Some(provider_id);
        self.provider_service_id = Some(provider_service_id.to_string());
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_limits(mut self, min: u64, max: u64) -> Self {
        self.min_order = Quantity::from(min);
        self.max_order = Quantity::from(max);
        self
    }

    pub fn with_refill(mut self, refill_days: Option<i64>) -> Self {
        self.refill = true;
        self.refill_days = refill_days;
        self
    }

    pub fn with_cancel(mut self) -> Self {
        self.cancel = true;
        self
    }
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub balance: Amount,
    pub total_spent: Amount,
    pub currency: String,
    /// Units of the user's currency per US dollar. `None` for USD accounts.
    pub dollar_rate: Option<Amount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub balance: Amount,
    pub total_spent: Amount,
    pub currency: String,
    pub dollar_rate: Option<Amount>,
}

impl NewUser {
    pub fn new(username: &str, balance: Amount) -> Self {
        Self {
            username: username.to_string(),
            balance,
            total_spent: Amount::zero(),
            currency: panel_common::DEFAULT_CURRENCY_CODE.to_string(),
            dollar_rate: None,
        }
    }

    pub fn with_total_spent(mut self, total_spent: Amount) -> Self {
        self.total_spent = total_spent;
        self
    }

    pub fn with_currency(mut self, currency: &str, dollar_rate: Amount) -> Self {
        self.currency = currency.to_string();
        self.dollar_rate = Some(dollar_rate);
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub service_id: i64,
    /// Assigned by the provider once the order has been forwarded successfully.
    pub provider_order_id: Option<String>,
    pub status: OrderStatus,
    /// The last status reported by the provider, mapped onto the local vocabulary.
    pub provider_status: Option<OrderStatus>,
    pub link: String,
    pub comments: Option<String>,
    pub runs: Option<i64>,
    pub interval: Option<i64>,
    pub quantity: Quantity,
    pub remains: Option<Quantity>,
    pub start_count: Option<Quantity>,
    /// What the provider charged us, as last reported.
    pub charge: Option<Amount>,
    /// What the user paid, in `currency`.
    pub price: Amount,
    pub usd_price: Amount,
    pub currency: String,
    pub forward_failed: bool,
    pub spend_recorded: bool,
    pub refund_applied: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_forwarded(&self) -> bool {
        self.provider_order_id.is_some()
    }

    /// True if either the local or the last known upstream status is `cancelled`.
    pub fn was_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled || self.provider_status == Some(OrderStatus::Cancelled)
    }
}

/// An order as requested by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub service_id: i64,
    pub link: String,
    pub quantity: Quantity,
    pub comments: Option<String>,
    pub runs: Option<i64>,
    pub interval: Option<i64>,
}

impl NewOrder {
    pub fn new(user_id: i64, service_id: i64, link: &str, quantity: Quantity) -> Self {
        Self { user_id, service_id, link: link.to_string(), quantity, comments: None, runs: None, interval: None }
    }

    pub fn with_comments(mut self, comments: &str) -> Self {
        self.comments = Some(comments.to_string());
        self
    }

    pub fn with_drip_feed(mut self, runs: i64, interval: i64) -> Self {
        self.runs = Some(runs);
        self.interval = Some(interval);
        self
    }
}

/// The financial terms of a new order, fixed at the time it is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPricing {
    pub price: Amount,
    pub usd_price: Amount,
    pub currency: String,
}

/// Only the order fields that changed. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSyncUpdate {
    pub status: Option<OrderStatus>,
    pub provider_status: Option<OrderStatus>,
    pub remains: Option<Quantity>,
    pub start_count: Option<Quantity>,
    pub charge: Option<Amount>,
}

impl OrderSyncUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.provider_status.is_none() &&
            self.remains.is_none() &&
            self.start_count.is_none() &&
            self.charge.is_none()
    }
}

/// An order together with the display fields that live-update consumers need.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderDetails {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub username: String,
    pub service_name: String,
    pub category: Option<String>,
}

/// A sync candidate: an order with an upstream reference, plus its service's provider linkage.
#[derive(Debug, Clone, FromRow)]
pub struct SyncCandidate {
    #[sqlx(flatten)]
    pub order: Order,
    pub provider_id: Option<i64>,
    pub provider_service_id: Option<String>,
}

//--------------------------------------    RequestStatus      ---------------------------------------------------------
/// Lifecycle of refill and cancel requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
    Failed,
    Refilling,
    Completed,
    Error,
}

impl RequestStatus {
    /// A live request blocks the creation of another request of the same kind for the same order.
    pub fn is_live(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Approved)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
            RequestStatus::Failed => "failed",
            RequestStatus::Refilling => "refilling",
            RequestStatus::Completed => "completed",
            RequestStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Refill,
    Cancel,
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Refill => write!(f, "refill"),
            RequestKind::Cancel => write!(f, "cancel"),
        }
    }
}

impl RequestKind {
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RequestKind::Refill => "refill_requests",
            RequestKind::Cancel => "cancel_requests",
        }
    }
}

/// A refill or cancel request. `provider_refill_id` is only ever set on refills.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub provider_refill_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

pub type RefillRequest = OrderRequest;
pub type CancelRequest = OrderRequest;

//--------------------------------------   ProviderOrderLog    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum LogAction {
    ForwardOrder,
    ForwardRefillOrder,
    ForwardCancelOrder,
    ManualSync,
    CronSync,
}

impl Display for LogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogAction::ForwardOrder => "forward_order",
            LogAction::ForwardRefillOrder => "forward_refill_order",
            LogAction::ForwardCancelOrder => "forward_cancel_order",
            LogAction::ManualSync => "manual_sync",
            LogAction::CronSync => "cron_sync",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    /// Transport, parse or local failures.
    Failed,
    /// The provider answered with an explicit error payload.
    Error,
}

impl Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStatus::Success => write!(f, "success"),
            LogStatus::Failed => write!(f, "failed"),
            LogStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "error" => Ok(Self::Error),
            s => Err(ConversionError(format!("Invalid log status: {s}"))),
        }
    }
}

/// Append-only audit record of one interaction with a provider.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ProviderOrderLog {
    pub id: i64,
    pub order_id: i64,
    pub provider_id: Option<i64>,
    pub action: LogAction,
    pub status: LogStatus,
    pub response: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProviderOrderLog {
    pub order_id: i64,
    pub provider_id: Option<i64>,
    pub action: LogAction,
    pub status: LogStatus,
    pub response: Option<String>,
    pub error_message: Option<String>,
}

impl NewProviderOrderLog {
    pub fn success(order_id: i64, provider_id: Option<i64>, action: LogAction, response: &str) -> Self {
        Self {
            order_id,
            provider_id,
            action,
            status: LogStatus::Success,
            response: Some(response.to_string()),
            error_message: None,
        }
    }

    pub fn failure(
        order_id: i64,
        provider_id: Option<i64>,
        action: LogAction,
        status: LogStatus,
        error: &str,
        response: Option<&str>,
    ) -> Self {
        if status == LogStatus::Success {
            warn!("🗃️ A failure audit entry for order {order_id} was requested with a success status");
        }
        Self {
            order_id,
            provider_id,
            action,
            status,
            response: response.map(String::from),
            error_message: Some(error.to_string()),
        }
    }
}

//--------------------------------------  AffiliateCommission  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AffiliateCommission {
    pub id: i64,
    pub order_id: i64,
    pub affiliate_user_id: i64,
    pub amount: Amount,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn provider(dialect: Option<&str>, method: Option<&str>, timeout: Option<i64>) -> Provider {
        Provider {
            id: 4,
            name: "acme".into(),
            api_base_url: "https://acme.example/api/v2".into(),
            api_key: Secret::new("k".to_string()),
            status: ProviderStatus::Active,
            http_method: method.map(String::from),
            timeout_seconds: timeout,
            api_dialect_type: dialect.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn provider_api_config_defaults() {
        let config = provider(None, None, None).api_config();
        assert_eq!(config.dialect, ApiDialect::Standard);
        assert_eq!(config.http_method, HttpMethod::Post);
        assert_eq!(config.timeout, provider_tools::DEFAULT_PROVIDER_TIMEOUT);
        let config = provider(Some("legacy_v1"), Some("get"), Some(12)).api_config();
        assert_eq!(config.dialect, ApiDialect::LegacyV1);
        assert_eq!(config.http_method, HttpMethod::Get);
        assert_eq!(config.timeout.as_secs(), 12);
        let config = provider(Some("something-new"), None, Some(-1)).api_config();
        assert_eq!(config.dialect, ApiDialect::Standard);
        assert_eq!(config.timeout, provider_tools::DEFAULT_PROVIDER_TIMEOUT);
    }

    #[test]
    fn live_requests() {
        assert!(RequestStatus::Pending.is_live());
        assert!(RequestStatus::Approved.is_live());
        assert!(!RequestStatus::Failed.is_live());
        assert!(!RequestStatus::Completed.is_live());
    }

    #[test]
    fn provider_link_requires_both_halves() {
        let mut service = Service {
            id: 1,
            name: "Followers".into(),
            category: None,
            provider_id: Some(1),
            provider_service_id: Some("12".into()),
            rate: Amount::from(1),
            min_order: Quantity::from(10u64),
            max_order: Quantity::from(100u64),
            refill: false,
            cancel: false,
            refill_days: None,
            created_at: Utc::now(),
        };
        assert_eq!(service.provider_link(), Some((1, "12")));
        service.provider_service_id = Some(String::new());
        assert_eq!(service.provider_link(), None);
        service.provider_service_id = None;
        assert_eq!(service.provider_link(), None);
    }
}
