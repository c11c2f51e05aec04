use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use fulfillment_engine::{
    db_types::OrderStatus,
    events::{EventHandlers, EventHooks},
    test_utils::{
        prepare_env::{fresh_database, tear_down},
        scripted_transport::{Script, ScriptedTransport},
        seed::{seed_catalog, seed_forwarded_order, seed_user},
    },
    ProviderSyncApi,
    SyncRequest,
    SyncTrigger,
};
use log::*;
use provider_tools::ForwardingFacade;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicUsize>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> usize {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn broadcast_runs_publish_progress_and_updates() {
    let db = fresh_database().await;
    let catalog = seed_catalog(&db, "acme.example").await;
    let user = seed_user(&db, "alice", 100).await;
    let done = seed_forwarded_order(&db, &user, &catalog.service, 1000, "11").await;
    let _same = seed_forwarded_order(&db, &user, &catalog.service, 1000, "12").await;
    let transport = ScriptedTransport::new();
    transport.script("11", Script::status("Completed"));
    transport.script("12", Script::Fail(provider_tools::ProviderApiError::Timeout { seconds: 5 }));

    let progress = HookCalled::default();
    let progress_copy = progress.clone();
    let updated = Arc::new(Mutex::new(Vec::new()));
    let updated_copy = Arc::clone(&updated);
    let mut hooks = EventHooks::default();
    hooks
        .on_sync_progress(move |ev| {
            trace!("🪝️ {ev:?}");
            progress_copy.called();
            Box::pin(async {})
        })
        .on_order_updated(move |ev| {
            info!("🪝️ Order #{} updated for {}", ev.details.order.id, ev.details.username);
            updated_copy.lock().unwrap().push((ev.details.order.id, ev.details.order.status));
            Box::pin(async {})
        });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = ProviderSyncApi::new(db.clone(), ForwardingFacade::new(transport)).with_event_producers(producers);
    let result = api.run_provider_sync(SyncRequest::all(SyncTrigger::Manual).with_broadcast(true)).await.unwrap();
    assert_eq!(result.processed, 2);
    assert_eq!(result.failed, 1);
    drop(api);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(progress.count(), 2, "One progress event per processed order");
    assert_eq!(*updated.lock().unwrap(), vec![(done.id, OrderStatus::Completed)]);
    tear_down(db).await;
}

#[tokio::test]
async fn quiet_runs_publish_nothing() {
    let db = fresh_database().await;
    let catalog = seed_catalog(&db, "acme.example").await;
    let user = seed_user(&db, "bob", 100).await;
    seed_forwarded_order(&db, &user, &catalog.service, 1000, "21").await;
    let transport = ScriptedTransport::new();
    transport.script("21", Script::status("Completed"));

    let event = HookCalled::default();
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_updated(move |_| {
        event_copy.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = ProviderSyncApi::new(db.clone(), ForwardingFacade::new(transport)).with_event_producers(producers);
    let result = api.run_provider_sync(SyncRequest::all(SyncTrigger::Cron)).await.unwrap();
    assert_eq!(result.updated_order_ids.len(), 1);
    drop(api);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(event.count(), 0);
    tear_down(db).await;
}
