use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::*;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::traits::FulfillmentError;

/// Allows at most one in-flight request per provider.
///
/// Clones share the same permits, so every sync run created from the same API instance is bound by the same limit.
#[derive(Clone, Default)]
pub struct ProviderLimiter {
    permits: Arc<Mutex<HashMap<i64, Arc<Semaphore>>>>,
}

impl ProviderLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other request to the provider is in flight. The slot is released when the permit is dropped.
    pub async fn acquire(&self, provider_id: i64) -> Result<OwnedSemaphorePermit, FulfillmentError> {
        let semaphore = {
            let mut permits = self.permits.lock().map_err(|_| FulfillmentError::LimiterClosed)?;
            Arc::clone(permits.entry(provider_id).or_insert_with(|| Arc::new(Semaphore::new(1))))
        };
        if semaphore.available_permits() == 0 {
            trace!("🚦️ Waiting for provider #{provider_id} to become free");
        }
        semaphore.acquire_owned().await.map_err(|_| FulfillmentError::LimiterClosed)
    }
}
