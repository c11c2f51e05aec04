use fulfillment_engine::events::{EventHandlers, EventHooks, OrderUpdatedEvent, SyncProgressEvent};
use log::*;

pub const EVENT_LOG_BUFFER_SIZE: usize = 50;

/// Subscribes to the engine's sync events and writes them to the log.
///
/// Broadcast sync runs emit
///
/// 1. SyncProgressEvent - after every order the run processes, so that an operator can follow a long run.
/// 2. OrderUpdatedEvent - at the end of the run, once for every order whose state changed.
///
/// Both are best-effort. If the log target falls behind, events are dropped rather than slowing the run down.
pub fn create_event_log_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_sync_progress(|ev| {
        Box::pin(async move {
            let SyncProgressEvent { total, processed, synced, current_order_id } = ev;
            debug!("📬️ Sync progress: {processed}/{total} processed, {synced} synced. Last order: #{current_order_id}");
        })
    });
    hooks.on_order_updated(|ev| {
        Box::pin(async move {
            let OrderUpdatedEvent { details } = ev;
            info!(
                "📬️ Order #{} ({} for {}) is now {}. Remains: {}",
                details.order.id,
                details.service_name,
                details.username,
                details.order.status,
                details.order.remains.map(|r| r.to_string()).unwrap_or_else(|| "unknown".into())
            );
        })
    });
    EventHandlers::new(EVENT_LOG_BUFFER_SIZE, hooks)
}
