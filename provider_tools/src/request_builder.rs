use std::{fmt, time::Duration};

use panel_common::{Quantity, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    config::HttpMethod,
    specification::{ApiSpecification, BodyEncoding, CredentialPlacement},
};

/// The parameters of a new order, as the provider needs to see them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwardOrder {
    /// The provider's own catalogue id for the service
    pub service: String,
    pub link: String,
    pub quantity: Quantity,
    pub comments: Option<String>,
    /// Drip-feed: the number of deliveries
    pub runs: Option<u32>,
    /// Drip-feed: minutes between deliveries
    pub interval: Option<u32>,
}

impl ForwardOrder {
    pub fn new(service: &str, link: &str, quantity: Quantity) -> Self {
        Self { service: service.to_string(), link: link.to_string(), quantity, ..Default::default() }
    }

    pub fn with_comments(mut self, comments: &str) -> Self {
        self.comments = Some(comments.to_string());
        self
    }

    pub fn with_drip_feed(mut self, runs: u32, interval: u32) -> Self {
        self.runs = Some(runs);
        self.interval = Some(interval);
        self
    }
}

#[derive(Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

/// A fully specified outbound provider call.
///
/// `Debug` output masks the provider credential, so requests can be logged freely.
#[derive(Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Duration,
    credential_name: &'static str,
}

impl ProviderRequest {
    /// Looks up a query or form field by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        let form = match &self.body {
            RequestBody::Form(fields) => fields.as_slice(),
            _ => &[],
        };
        self.query.iter().chain(form.iter()).find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    fn masked(&self, pairs: &[(String, String)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| {
                let v = if k.eq_ignore_ascii_case(self.credential_name) { "****".to_string() } else { v.clone() };
                (k.clone(), v)
            })
            .collect()
    }
}

impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            RequestBody::Empty => "(empty)".to_string(),
            RequestBody::Form(fields) => format!("{:?}", self.masked(fields)),
            RequestBody::Json(value) => {
                let mut value = value.clone();
                if let Some(field) = value.get_mut(self.credential_name) {
                    *field = Value::String("****".into());
                }
                value.to_string()
            },
        };
        f.debug_struct("ProviderRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.masked(&self.headers))
            .field("query", &self.masked(&self.query))
            .field("body", &body)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builds outbound requests for the four provider operations according to an [`ApiSpecification`].
#[derive(Clone)]
pub struct RequestBuilder {
    spec: ApiSpecification,
    base_url: String,
    api_key: Secret<String>,
    method: HttpMethod,
}

impl RequestBuilder {
    pub fn new(spec: ApiSpecification, base_url: &str, api_key: Secret<String>, method: HttpMethod) -> Self {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Self { spec, base_url, api_key, method }
    }

    pub fn spec(&self) -> &ApiSpecification {
        &self.spec
    }

    pub fn build_order_request(&self, order: &ForwardOrder) -> ProviderRequest {
        let fields = &self.spec.request;
        let mut params = vec![
            (fields.service, Value::String(order.service.clone())),
            (fields.link, Value::String(order.link.clone())),
            (fields.quantity, Value::String(order.quantity.to_string())),
        ];
        if let Some(comments) = order.comments.as_ref().filter(|c| !c.is_empty()) {
            params.push((fields.comments, Value::String(comments.clone())));
        }
        if let (Some(runs), Some(interval)) = (order.runs, order.interval) {
            params.push((fields.runs, Value::from(runs)));
            params.push((fields.interval, Value::from(interval)));
        }
        let action = self.spec.actions.as_ref().map(|a| a.order);
        self.build(self.spec.endpoints.order, None, action, params)
    }

    pub fn build_order_status_request(&self, provider_order_id: &str) -> ProviderRequest {
        let action = self.spec.actions.as_ref().map(|a| a.status);
        let params = self.order_id_param(provider_order_id);
        self.build(self.spec.endpoints.status, Some(provider_order_id), action, params)
    }

    pub fn build_refill_request(&self, provider_order_id: &str) -> ProviderRequest {
        let action = self.spec.actions.as_ref().map(|a| a.refill);
        let params = self.order_id_param(provider_order_id);
        self.build(self.spec.endpoints.refill, Some(provider_order_id), action, params)
    }

    pub fn build_cancel_request(&self, provider_order_id: &str) -> ProviderRequest {
        let action = self.spec.actions.as_ref().map(|a| a.cancel);
        let params = match self.spec.actions {
            // Action-style APIs cancel in bulk, taking a comma-separated id list
            Some(_) => vec![(self.spec.request.cancel_order_ids, Value::String(provider_order_id.to_string()))],
            None => Vec::new(),
        };
        self.build(self.spec.endpoints.cancel, Some(provider_order_id), action, params)
    }

    /// REST-style dialects carry the order id in the path, percent-encoded; action-style dialects need it as a field.
    fn order_id_param(&self, provider_order_id: &str) -> Vec<(&'static str, Value)> {
        match self.spec.actions {
            Some(_) => vec![(self.spec.request.order_id, Value::String(provider_order_id.to_string()))],
            None => Vec::new(),
        }
    }

    fn build(
        &self,
        path: &str,
        provider_order_id: Option<&str>,
        action: Option<&'static str>,
        params: Vec<(&'static str, Value)>,
    ) -> ProviderRequest {
        let path = match provider_order_id {
            Some(id) => path.replace("{id}", &urlencoding::encode(id)),
            None => path.to_string(),
        };
        let url = format!("{}{path}", self.base_url);
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        let mut fields: Vec<(String, Value)> = Vec::with_capacity(params.len() + 2);
        match self.spec.credential {
            CredentialPlacement::Header(name) => headers.push((name.to_string(), self.api_key.reveal().clone())),
            CredentialPlacement::BodyField(name) => {
                fields.push((name.to_string(), Value::String(self.api_key.reveal().clone())))
            },
        }
        if let (Some(actions), Some(action)) = (&self.spec.actions, action) {
            fields.push((actions.field.to_string(), Value::String(action.to_string())));
        }
        fields.extend(params.into_iter().map(|(k, v)| (k.to_string(), v)));

        let (query, body) = match (self.method, self.spec.encoding) {
            (HttpMethod::Get, _) => (flatten(fields), RequestBody::Empty),
            (HttpMethod::Post, BodyEncoding::Form) => (Vec::new(), RequestBody::Form(flatten(fields))),
            (HttpMethod::Post, BodyEncoding::Json) => {
                if fields.is_empty() {
                    (Vec::new(), RequestBody::Empty)
                } else {
                    (Vec::new(), RequestBody::Json(Value::Object(fields.into_iter().collect::<Map<_, _>>())))
                }
            },
        };
        ProviderRequest {
            url,
            method: self.method,
            headers,
            query,
            body,
            timeout: self.spec.timeout,
            credential_name: self.spec.credential.name(),
        }
    }
}

fn flatten(fields: Vec<(String, Value)>) -> Vec<(String, String)> {
    fields
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect()
}
