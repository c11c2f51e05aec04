use std::{collections::HashMap, fmt::Debug, time::Instant};

use log::*;
use panel_common::OrderStatus;
use provider_tools::{ForwardingFacade, OrderStatusReport, ProviderConfig, ProviderTransport};

use crate::{
    db_types::{LogAction, NewProviderOrderLog, Order, OrderSyncUpdate, Provider, SyncCandidate},
    events::{EventProducers, OrderUpdatedEvent, SyncProgressEvent},
    panel_api::{
        audit_status,
        limiter::ProviderLimiter,
        sync_objects::{SyncConfig, SyncRequest, SyncRunResult, SyncScope},
    },
    traits::{FulfillmentError, SyncDatabase},
};

/// `ProviderSyncApi` reconciles local orders with the state their providers report.
///
/// A run selects orders, groups them by provider and queries each one in turn, with at most one request in flight per
/// provider. Changes are written back, and an upstream cancellation refunds the user exactly once, however many runs
/// observe it. A failure on one order never stops the run.
pub struct ProviderSyncApi<B, T> {
    db: B,
    facade: ForwardingFacade<T>,
    limiter: ProviderLimiter,
    config: SyncConfig,
    producers: EventProducers,
}

impl<B, T> Debug for ProviderSyncApi<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProviderSyncApi ({:?})", self.config)
    }
}

impl<B, T> ProviderSyncApi<B, T> {
    pub fn new(db: B, facade: ForwardingFacade<T>) -> Self {
        Self {
            db,
            facade,
            limiter: ProviderLimiter::new(),
            config: SyncConfig::default(),
            producers: EventProducers::default(),
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a limiter with other API instances, so that they never query the same provider concurrently.
    pub fn with_limiter(mut self, limiter: ProviderLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_event_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

impl<B, T> ProviderSyncApi<B, T>
where
    B: SyncDatabase,
    T: ProviderTransport,
{
    /// Runs one reconciliation pass.
    ///
    /// Only the candidate selection can fail the run as a whole. Per-order failures are counted in the result and
    /// recorded in the audit trail. If the time budget runs out, the run stops before the next provider or order and
    /// reports `timed_out`.
    pub async fn run_provider_sync(&self, request: SyncRequest) -> Result<SyncRunResult, FulfillmentError> {
        let started = Instant::now();
        let action = request.trigger.log_action();
        let mut result = SyncRunResult::default();
        let mut candidates = match &request.scope {
            SyncScope::Orders(ids) => self.db.fetch_sync_candidates_by_ids(ids).await?,
            SyncScope::All { provider_id } => {
                self.db.fetch_sync_candidates(*provider_id, self.config.max_candidates).await?
            },
        };
        result.discovered = candidates.len();
        candidates.truncate(self.config.max_per_run);
        result.selected = candidates.len();
        debug!("🔄️ Sync run ({action}) selected {} of {} orders", result.selected, result.discovered);

        let (buckets, unresolved) = self.group_by_provider(candidates).await;
        result.skipped += unresolved;
        let provider_ids = buckets.iter().map(|(id, _)| *id).collect::<Vec<_>>();
        let providers = self
            .db
            .fetch_providers(&provider_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect::<HashMap<i64, Provider>>();

        'buckets: for (provider_id, orders) in buckets {
            if started.elapsed() >= self.config.time_budget {
                result.timed_out = true;
                break;
            }
            let provider = match providers.get(&provider_id) {
                Some(p) if p.is_active() => p,
                Some(p) => {
                    info!("🔄️ Skipping {} orders of provider {}, which is {}", orders.len(), p.name, p.status);
                    result.skipped += orders.len();
                    continue;
                },
                None => {
                    warn!("🔄️ Skipping {} orders of provider #{provider_id}, which does not exist", orders.len());
                    result.skipped += orders.len();
                    continue;
                },
            };
            let config = provider.api_config();
            for order in orders {
                if started.elapsed() >= self.config.time_budget {
                    result.timed_out = true;
                    break 'buckets;
                }
                result.processed += 1;
                match self.sync_order(&order, provider, &config, action).await {
                    Ok(true) => {
                        result.synced += 1;
                        result.updated_order_ids.push(order.id);
                    },
                    Ok(false) => result.synced += 1,
                    Err(e) => {
                        warn!("🔄️ Could not sync order #{} with {}. {e}", order.id, provider.name);
                        result.failed += 1;
                    },
                }
                if request.broadcast {
                    self.producers.publish_sync_progress(SyncProgressEvent {
                        total: result.selected,
                        processed: result.processed,
                        synced: result.synced,
                        current_order_id: order.id,
                    });
                }
            }
        }
        if result.timed_out {
            warn!("🔄️ Sync run ran out of time after {} of {} orders", result.processed, result.selected);
        }
        if request.broadcast {
            self.broadcast_updates(&result.updated_order_ids).await;
        }
        info!(
            "🔄️ Sync run ({action}) finished in {}ms. Processed: {}, synced: {}, failed: {}, skipped: {}, updated: {}",
            started.elapsed().as_millis(),
            result.processed,
            result.synced,
            result.failed,
            result.skipped,
            result.updated_order_ids.len()
        );
        Ok(result)
    }

    /// Groups candidates by provider, keeping selection order inside and across groups. Orders whose service has no
    /// provider fall back to the provider that last handled them according to the audit trail. Returns the groups and
    /// the number of orders that could not be attributed to any provider.
    async fn group_by_provider(&self, candidates: Vec<SyncCandidate>) -> (Vec<(i64, Vec<Order>)>, usize) {
        let mut buckets: Vec<(i64, Vec<Order>)> = Vec::new();
        let mut index = HashMap::<i64, usize>::new();
        let mut unresolved = 0;
        for candidate in candidates {
            let provider_id = match candidate.provider_id {
                Some(id) => Some(id),
                None => match self.db.latest_provider_for_order(candidate.order.id).await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("🔄️ Could not look up the provider of order #{}. {e}", candidate.order.id);
                        None
                    },
                },
            };
            let Some(provider_id) = provider_id else {
                debug!("🔄️ Order #{} has no known provider and will be skipped", candidate.order.id);
                unresolved += 1;
                continue;
            };
            let i = *index.entry(provider_id).or_insert_with(|| {
                buckets.push((provider_id, Vec::new()));
                buckets.len() - 1
            });
            buckets[i].1.push(candidate.order);
        }
        (buckets, unresolved)
    }

    /// Syncs one order and writes exactly one audit entry for the attempt. Returns whether anything about the order
    /// changed.
    async fn sync_order(
        &self,
        order: &Order,
        provider: &Provider,
        config: &ProviderConfig,
        action: LogAction,
    ) -> Result<bool, FulfillmentError> {
        match self.try_sync_order(order, config).await {
            Ok((changed, raw)) => {
                self.audit(NewProviderOrderLog::success(order.id, Some(provider.id), action, &raw)).await;
                Ok(changed)
            },
            Err((e, raw)) => {
                let raw = raw.as_deref().or(match &e {
                    FulfillmentError::ProviderError(pe) => pe.raw_response(),
                    _ => None,
                });
                let log = NewProviderOrderLog::failure(
                    order.id,
                    Some(provider.id),
                    action,
                    audit_status(&e),
                    &e.to_string(),
                    raw,
                );
                self.audit(log).await;
                Err(e)
            },
        }
    }

    async fn try_sync_order(
        &self,
        order: &Order,
        config: &ProviderConfig,
    ) -> Result<(bool, String), (FulfillmentError, Option<String>)> {
        let provider_order_id =
            order.provider_order_id.as_deref().ok_or((FulfillmentError::OrderNotForwarded(order.id), None))?;
        let fetched = {
            let _permit = self.limiter.acquire(config.id).await.map_err(|e| (e, None))?;
            self.facade.fetch_order_status(config, provider_order_id).await
        };
        let (report, raw) = fetched.map_err(|e| (FulfillmentError::from(e), None))?;
        match self.apply_report(order, &report).await {
            Ok(changed) => Ok((changed, raw)),
            Err(e) => Err((e, Some(raw))),
        }
    }

    async fn apply_report(&self, order: &Order, report: &OrderStatusReport) -> Result<bool, FulfillmentError> {
        let update = sync_update_for(order, report);
        if report.status == Some(OrderStatus::Cancelled) && !order.was_cancelled() {
            let outcome = self.db.apply_cancellation(order.id, update).await?;
            match outcome.refunded {
                Some(amount) => info!(
                    "💸️ Order #{} was cancelled upstream. Refunded {amount} {} to user #{}",
                    order.id, order.currency, order.user_id
                ),
                None => debug!("💸️ Order #{} was cancelled upstream, but has already been refunded", order.id),
            }
            return Ok(true);
        }
        let changed = !update.is_empty();
        let updated = self.db.apply_sync_update(order.id, update).await?;
        if changed {
            debug!("🔄️ Order #{} is now {} ({:?} remaining)", updated.id, updated.status, updated.remains);
        }
        Ok(changed)
    }

    async fn broadcast_updates(&self, order_ids: &[i64]) {
        for id in order_ids {
            match self.db.fetch_order_details(*id).await {
                Ok(Some(details)) => self.producers.publish_order_updated(OrderUpdatedEvent::new(details)),
                Ok(None) => warn!("🔄️ Updated order #{id} has disappeared"),
                Err(e) => warn!("🔄️ Could not load updated order #{id} for broadcast. {e}"),
            }
        }
    }

    async fn audit(&self, log: NewProviderOrderLog) {
        let order_id = log.order_id;
        if let Err(e) = self.db.insert_provider_log(log).await {
            error!("🧾️ Could not write audit entry for order #{order_id}. {e}");
        }
    }
}

/// The fields of `order` that differ from what the provider reports.
///
/// The upstream status is always recorded in `provider_status`, but a local `cancelled` or `refunded` order keeps its
/// local status, since money has already moved on it.
pub fn sync_update_for(order: &Order, report: &OrderStatusReport) -> OrderSyncUpdate {
    let mut update = OrderSyncUpdate::default();
    if let Some(status) = report.status {
        if order.provider_status != Some(status) {
            update.provider_status = Some(status);
        }
        let locked = matches!(order.status, OrderStatus::Cancelled | OrderStatus::Refunded);
        if status != order.status && !locked {
            update.status = Some(status);
        }
    }
    if report.remains.is_some() && report.remains != order.remains {
        update.remains = report.remains;
    }
    if report.start_count.is_some() && report.start_count != order.start_count {
        update.start_count = report.start_count;
    }
    if report.charge.is_some() && report.charge != order.charge {
        update.charge = report.charge;
    }
    update
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use panel_common::{Amount, Quantity};

    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 1,
            user_id: 1,
            service_id: 1,
            provider_order_id: Some("p-1".into()),
            status,
            provider_status: Some(status),
            link: "https://example.com".into(),
            comments: None,
            runs: None,
            interval: None,
            quantity: Quantity::from(1000u64),
            remains: Some(Quantity::from(1000u64)),
            start_count: None,
            charge: None,
            price: Amount::from(10),
            usd_price: Amount::from(10),
            currency: "USD".into(),
            forward_failed: false,
            spend_recorded: true,
            refund_applied: false,
            last_sync_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn report(status: OrderStatus) -> OrderStatusReport {
        OrderStatusReport { status: Some(status), raw_status: Some(status.to_string()), ..Default::default() }
    }

    #[test]
    fn unchanged_report_is_empty() {
        let o = order(OrderStatus::Processing);
        let mut r = report(OrderStatus::Processing);
        r.remains = Some(Quantity::from(1000u64));
        assert!(sync_update_for(&o, &r).is_empty());
    }

    #[test]
    fn only_changed_fields_are_written() {
        let o = order(OrderStatus::Processing);
        let mut r = report(OrderStatus::Partial);
        r.remains = Some(Quantity::from(250u64));
        r.start_count = Some(Quantity::from(17u64));
        let update = sync_update_for(&o, &r);
        assert_eq!(update.status, Some(OrderStatus::Partial));
        assert_eq!(update.provider_status, Some(OrderStatus::Partial));
        assert_eq!(update.remains, Some(Quantity::from(250u64)));
        assert_eq!(update.start_count, Some(Quantity::from(17u64)));
        assert_eq!(update.charge, None);
    }

    #[test]
    fn cancelled_orders_keep_their_local_status() {
        let o = order(OrderStatus::Cancelled);
        let update = sync_update_for(&o, &report(OrderStatus::Completed));
        assert_eq!(update.status, None);
        assert_eq!(update.provider_status, Some(OrderStatus::Completed));
    }

    #[test]
    fn missing_fields_are_left_alone() {
        let o = order(OrderStatus::Processing);
        let r = OrderStatusReport::default();
        assert!(sync_update_for(&o, &r).is_empty());
    }
}
