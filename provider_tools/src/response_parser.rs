//! Lenient parsing of provider payloads into canonical records.
//!
//! Providers are inconsistent about field names and types: numbers arrive as strings, booleans as `0`/`1` or
//! `"yes"`, and ids as either. Every value the parser cannot find or understand becomes `None`, which callers read as
//! "unchanged". Only an empty body, a body that is not JSON, or an explicit error payload is treated as a failure.
use log::*;
use panel_common::{Amount, OrderStatus, Quantity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ProviderApiError, specification::ApiSpecification, status::map_provider_status};

/// The canonical view of an upstream order status response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusReport {
    pub status: Option<OrderStatus>,
    /// The status string exactly as the provider sent it
    pub raw_status: Option<String>,
    pub start_count: Option<Quantity>,
    pub remains: Option<Quantity>,
    pub charge: Option<Amount>,
    pub currency: Option<String>,
    pub transaction_id: Option<String>,
    pub refill_available: Option<bool>,
    pub cancel_available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub provider_order_id: String,
    pub charge: Option<Amount>,
    pub currency: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefillReceipt {
    pub refill_id: Option<String>,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelReceipt {
    pub provider_order_id: Option<String>,
    pub raw: String,
}

#[derive(Clone)]
pub struct ResponseParser {
    spec: ApiSpecification,
}

impl ResponseParser {
    pub fn new(spec: ApiSpecification) -> Self {
        Self { spec }
    }

    /// Parses a status payload. Some providers wrap single-order responses in an object keyed by the order id, or in
    /// a one-element array; both are unwrapped.
    pub fn parse_order_status_response(&self, raw: &str) -> Result<OrderStatusReport, ProviderApiError> {
        let value = self.unwrap_single(self.parse_json(raw)?);
        self.check_for_error(&value, raw)?;
        let fields = &self.spec.response;
        let raw_status = lookup(&value, fields.status).and_then(as_string);
        let status = raw_status.as_deref().map(map_provider_status);
        let report = OrderStatusReport {
            status,
            raw_status,
            start_count: lookup(&value, fields.start_count).and_then(as_quantity),
            remains: lookup(&value, fields.remains).and_then(as_quantity),
            charge: lookup(&value, fields.charge).and_then(as_amount),
            currency: lookup(&value, fields.currency).and_then(as_string),
            transaction_id: lookup(&value, fields.order_id).and_then(as_id),
            refill_available: lookup(&value, fields.refill_available).and_then(as_bool),
            cancel_available: lookup(&value, fields.cancel_available).and_then(as_bool),
        };
        trace!("🔌️ Parsed status report: {report:?}");
        Ok(report)
    }

    pub fn parse_order_response(&self, raw: &str) -> Result<OrderReceipt, ProviderApiError> {
        let value = self.unwrap_single(self.parse_json(raw)?);
        self.check_for_error(&value, raw)?;
        let fields = &self.spec.response;
        let provider_order_id = lookup(&value, fields.order_id).and_then(as_id).ok_or_else(|| {
            let field = fields.order_id.first().copied().unwrap_or("order").to_string();
            ProviderApiError::MissingField { field, body: raw.to_string() }
        })?;
        Ok(OrderReceipt {
            provider_order_id,
            charge: lookup(&value, fields.charge).and_then(as_amount),
            currency: lookup(&value, fields.currency).and_then(as_string),
            raw: raw.to_string(),
        })
    }

    pub fn parse_refill_response(&self, raw: &str) -> Result<RefillReceipt, ProviderApiError> {
        let value = self.unwrap_single(self.parse_json(raw)?);
        self.check_for_error(&value, raw)?;
        // Some providers nest the refill id: {"refill": {"id": 12}}
        let refill_id = lookup(&value, self.spec.response.refill_id).and_then(|v| match v {
            Value::Object(_) => lookup(v, &["id", "refill_id"]).and_then(as_id),
            other => as_id(other),
        });
        Ok(RefillReceipt { refill_id, raw: raw.to_string() })
    }

    /// Bulk-cancel APIs answer with one entry per order, e.g. `[{"order": 9, "cancel": 1}]` or
    /// `[{"order": 9, "cancel": {"error": "Incorrect order ID"}}]`.
    pub fn parse_cancel_response(&self, raw: &str) -> Result<CancelReceipt, ProviderApiError> {
        let value = self.unwrap_single(self.parse_json(raw)?);
        self.check_for_error(&value, raw)?;
        if let Some(result) = value.get("cancel") {
            self.check_for_error(result, raw)?;
        }
        let provider_order_id = lookup(&value, self.spec.response.order_id).and_then(as_id);
        Ok(CancelReceipt { provider_order_id, raw: raw.to_string() })
    }

    fn parse_json(&self, raw: &str) -> Result<Value, ProviderApiError> {
        if raw.trim().is_empty() {
            return Err(ProviderApiError::EmptyResponse);
        }
        serde_json::from_str(raw)
            .map_err(|e| ProviderApiError::InvalidJson { message: e.to_string(), body: raw.to_string() })
    }

    /// `[x]` becomes `x`; `{"123": {...}}` becomes the inner object, as long as the key is not a field we know.
    fn unwrap_single(&self, value: Value) -> Value {
        match value {
            Value::Array(mut items) if items.len() == 1 => items.remove(0),
            Value::Object(map) if map.len() == 1 && map.iter().all(|(k, v)| v.is_object() && !self.is_known_field(k)) =>
            {
                map.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null)
            },
            other => other,
        }
    }

    fn is_known_field(&self, name: &str) -> bool {
        let f = &self.spec.response;
        [f.order_id, f.status, f.start_count, f.remains, f.charge, f.currency, f.refill_id, f.error]
            .iter()
            .any(|synonyms| synonyms.contains(&name))
    }

    fn check_for_error(&self, value: &Value, raw: &str) -> Result<(), ProviderApiError> {
        let message = match lookup(value, self.spec.response.error) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(()),
            Some(Value::String(s)) if s.trim().is_empty() => return Ok(()),
            Some(Value::Array(a)) if a.is_empty() => return Ok(()),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Err(ProviderApiError::Rejected { message, body: raw.to_string() })
    }
}

fn lookup<'a>(value: &'a Value, synonyms: &[&str]) -> Option<&'a Value> {
    synonyms.iter().filter_map(|name| value.get(*name)).find(|v| !v.is_null())
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_id(value: &Value) -> Option<String> {
    as_string(value)
}

fn as_quantity(value: &Value) -> Option<Quantity> {
    match value {
        Value::Number(n) => n.as_u64().map(Quantity::from).or_else(|| n.to_string().parse().ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_amount(value: &Value) -> Option<Amount> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Some(true),
            "0" | "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ApiDialect;

    fn parser(dialect: ApiDialect) -> ResponseParser {
        ResponseParser::new(dialect.describe())
    }

    #[test]
    fn standard_status_response() {
        let raw = r#"{"charge":"2.5","start_count":"3572","status":"Partial","remains":"157","currency":"USD"}"#;
        let report = parser(ApiDialect::Standard).parse_order_status_response(raw).unwrap();
        assert_eq!(report.status, Some(OrderStatus::Partial));
        assert_eq!(report.raw_status.as_deref(), Some("Partial"));
        assert_eq!(report.start_count, Some(Quantity::from(3572u64)));
        assert_eq!(report.remains, Some(Quantity::from(157u64)));
        assert_eq!(report.charge, Some("2.5".parse().unwrap()));
        assert_eq!(report.currency.as_deref(), Some("USD"));
        assert_eq!(report.refill_available, None);
    }

    #[test]
    fn missing_fields_are_none_not_zero() {
        let report = parser(ApiDialect::Standard).parse_order_status_response(r#"{"status":"Completed"}"#).unwrap();
        assert_eq!(report.status, Some(OrderStatus::Completed));
        assert_eq!(report.remains, None);
        assert_eq!(report.start_count, None);
        let report = parser(ApiDialect::Standard).parse_order_status_response(r#"{"remains": 0}"#).unwrap();
        assert_eq!(report.status, None);
        assert_eq!(report.remains, Some(Quantity::zero()));
    }

    #[test]
    fn synonyms_and_loose_types() {
        let raw = r#"{"orderStatus":"In progress","startCount":12,"remaining":"1e2","canRefill":"yes","can_cancel":0,"id":77}"#;
        let report = parser(ApiDialect::LegacyV1).parse_order_status_response(raw).unwrap();
        assert_eq!(report.status, Some(OrderStatus::Processing));
        assert_eq!(report.start_count, Some(Quantity::from(12u64)));
        assert_eq!(report.remains, None, "scientific notation is not a quantity");
        assert_eq!(report.refill_available, Some(true));
        assert_eq!(report.cancel_available, Some(false));
        assert_eq!(report.transaction_id.as_deref(), Some("77"));
    }

    #[test]
    fn wrapped_single_order_responses() {
        let raw = r#"{"9001": {"status": "Canceled", "remains": "10"}}"#;
        let report = parser(ApiDialect::Standard).parse_order_status_response(raw).unwrap();
        assert_eq!(report.status, Some(OrderStatus::Cancelled));
        let raw = r#"[{"status": "Pending"}]"#;
        let report = parser(ApiDialect::Standard).parse_order_status_response(raw).unwrap();
        assert_eq!(report.status, Some(OrderStatus::Pending));
    }

    #[test]
    fn failures() {
        let p = parser(ApiDialect::Standard);
        assert!(matches!(p.parse_order_status_response(""), Err(ProviderApiError::EmptyResponse)));
        assert!(matches!(p.parse_order_status_response("  \n"), Err(ProviderApiError::EmptyResponse)));
        let err = p.parse_order_status_response("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ProviderApiError::InvalidJson { .. }));
        assert_eq!(err.raw_response(), Some("<html>502 Bad Gateway</html>"));
        let err = p.parse_order_status_response(r#"{"error":"Incorrect order ID"}"#).unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(err.to_string(), "Provider rejected the request: Incorrect order ID");
        // Falsy error fields are not errors
        assert!(p.parse_order_status_response(r#"{"error": null, "status": "Pending"}"#).is_ok());
        assert!(p.parse_order_status_response(r#"{"error": "", "status": "Pending"}"#).is_ok());
    }

    #[test]
    fn order_receipts() {
        let p = parser(ApiDialect::Standard);
        let receipt = p.parse_order_response(r#"{"order": 23501}"#).unwrap();
        assert_eq!(receipt.provider_order_id, "23501");
        let receipt = parser(ApiDialect::LegacyV1).parse_order_response(r#"{"orderId":"ab-1","cost":1.25}"#).unwrap();
        assert_eq!(receipt.provider_order_id, "ab-1");
        assert_eq!(receipt.charge, Some("1.25".parse().unwrap()));
        let err = p.parse_order_response(r#"{"status": "ok"}"#).unwrap_err();
        assert!(matches!(err, ProviderApiError::MissingField { .. }));
        let err = p.parse_order_response(r#"{"error": "Not enough funds on balance"}"#).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn refill_receipts() {
        let p = parser(ApiDialect::Standard);
        assert_eq!(p.parse_refill_response(r#"{"refill": "1"}"#).unwrap().refill_id.as_deref(), Some("1"));
        assert_eq!(p.parse_refill_response(r#"{"refill": {"id": 5}}"#).unwrap().refill_id.as_deref(), Some("5"));
        assert_eq!(p.parse_refill_response(r#"{"status": "ok"}"#).unwrap().refill_id, None);
        assert!(p.parse_refill_response(r#"{"error": "Refill not allowed"}"#).unwrap_err().is_rejection());
    }

    #[test]
    fn cancel_receipts() {
        let p = parser(ApiDialect::Standard);
        let receipt = p.parse_cancel_response(r#"[{"order": 9, "cancel": 1}]"#).unwrap();
        assert_eq!(receipt.provider_order_id.as_deref(), Some("9"));
        let err = p.parse_cancel_response(r#"[{"order": 9, "cancel": {"error": "Incorrect order ID"}}]"#).unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("Incorrect order ID"));
    }
}
