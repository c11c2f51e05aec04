use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::*;
use provider_tools::{ProviderApiError, ProviderRequest, ProviderTransport, TransportResponse};

/// What the scripted provider does with a request.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(TransportResponse),
    Fail(ProviderApiError),
}

impl Script {
    pub fn ok(body: &str) -> Self {
        Script::Reply(TransportResponse::ok(body))
    }

    pub fn status(status: &str) -> Self {
        Script::ok(&format!(r#"{{"status": "{status}", "start_count": "0", "remains": "0", "charge": "1.00"}}"#))
    }
}

#[derive(Default)]
struct State {
    /// Per provider order id. Requests without an order id (new orders) use the `None` entry.
    scripts: HashMap<Option<String>, Script>,
    sent: Vec<ProviderRequest>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// An in-memory provider transport for tests.
///
/// Replies are scripted per upstream order id. Every request is recorded, and the transport tracks how many requests
/// were in flight at once for each provider host.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request takes this long to answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Scripts the reply for requests about the given upstream order.
    pub fn script(&self, provider_order_id: &str, script: Script) -> &Self {
        self.state.lock().unwrap().scripts.insert(Some(provider_order_id.to_string()), script);
        self
    }

    /// Scripts the reply for requests that do not refer to an existing upstream order, i.e. new orders.
    pub fn script_new_orders(&self, script: Script) -> &Self {
        self.state.lock().unwrap().scripts.insert(None, script);
        self
    }

    pub fn sent(&self) -> Vec<ProviderRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }

    /// The most requests that were ever in flight at once to the given host.
    pub fn max_in_flight(&self, host: &str) -> usize {
        self.state.lock().unwrap().max_in_flight.get(host).copied().unwrap_or(0)
    }

    fn begin(&self, request: &ProviderRequest) -> Script {
        let host = host_of(&request.url);
        let key = order_id_of(request);
        let mut state = self.state.lock().unwrap();
        state.sent.push(request.clone());
        let n = {
            let n = state.in_flight.entry(host.clone()).or_default();
            *n += 1;
            *n
        };
        let max = state.max_in_flight.entry(host).or_default();
        *max = (*max).max(n);
        state.scripts.get(&key).cloned().unwrap_or_else(|| {
            Script::Reply(TransportResponse::ok(r#"{"error": "Incorrect order ID"}"#))
        })
    }

    fn end(&self, request: &ProviderRequest) {
        let host = host_of(&request.url);
        let mut state = self.state.lock().unwrap();
        if let Some(n) = state.in_flight.get_mut(&host) {
            *n = n.saturating_sub(1);
        }
    }
}

impl ProviderTransport for ScriptedTransport {
    async fn send(&self, request: ProviderRequest) -> Result<TransportResponse, ProviderApiError> {
        let script = self.begin(&request);
        trace!("🧪️ Scripted provider received {request:?}");
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.end(&request);
        match script {
            Script::Reply(response) => Ok(response),
            Script::Fail(e) => Err(e),
        }
    }
}

fn host_of(url: &str) -> String {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split('/').next().unwrap_or_default().to_string()
}

fn order_id_of(request: &ProviderRequest) -> Option<String> {
    if let Some(id) = request.param("order").or_else(|| request.param("orders")) {
        return Some(id.to_string());
    }
    request.url.split_once("/orders/").map(|(_, rest)| rest.split('/').next().unwrap_or_default().to_string())
}
