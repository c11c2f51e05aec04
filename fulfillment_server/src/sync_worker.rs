use std::time::Duration;

use chrono::Utc;
use fulfillment_engine::{ProviderSyncApi, SqliteDatabase, SyncDatabase, SyncRequest, SyncTrigger};
use log::*;
use provider_tools::{ProviderTransport, ReqwestTransport};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the scheduled provider sync. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// A run that takes longer than the interval delays the next one rather than stacking runs on top of each other.
pub fn start_sync_worker(
    api: ProviderSyncApi<SqliteDatabase, ReqwestTransport>,
    interval: Duration,
    broadcast: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Provider sync worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            run_scheduled_sync(&api, broadcast).await;
        }
    })
}

pub async fn run_scheduled_sync<B, T>(api: &ProviderSyncApi<B, T>, broadcast: bool)
where
    B: SyncDatabase,
    T: ProviderTransport,
{
    info!("🕰️ Running scheduled provider sync");
    let started = Utc::now();
    let request = SyncRequest::all(SyncTrigger::Cron).with_broadcast(broadcast);
    match api.run_provider_sync(request).await {
        Ok(result) => {
            let elapsed = (Utc::now() - started).num_milliseconds();
            info!(
                "🕰️ Scheduled sync done in {elapsed}ms. {} of {} orders processed, {} synced, {} failed, {} skipped",
                result.processed, result.selected, result.synced, result.failed, result.skipped
            );
            if result.timed_out {
                warn!("🕰️ Scheduled sync ran out of time. The remaining orders will be picked up by the next run.");
            }
            debug!("🕰️ Updated orders: {:?}", result.updated_order_ids);
        },
        Err(e) => {
            error!("🕰️ Error running scheduled provider sync: {e}");
        },
    }
}
