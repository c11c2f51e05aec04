use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderUpdatedEvent, SyncProgressEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub sync_progress_producer: Vec<EventProducer<SyncProgressEvent>>,
    pub order_updated_producer: Vec<EventProducer<OrderUpdatedEvent>>,
}

impl EventProducers {
    pub fn publish_sync_progress(&self, event: SyncProgressEvent) {
        for producer in &self.sync_progress_producer {
            producer.publish_event(event.clone());
        }
    }

    pub fn publish_order_updated(&self, event: OrderUpdatedEvent) {
        for producer in &self.order_updated_producer {
            producer.publish_event(event.clone());
        }
    }
}

pub struct EventHandlers {
    pub on_sync_progress: Option<EventHandler<SyncProgressEvent>>,
    pub on_order_updated: Option<EventHandler<OrderUpdatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_sync_progress = hooks.on_sync_progress.map(|f| EventHandler::new(buffer_size, f));
        let on_order_updated = hooks.on_order_updated.map(|f| EventHandler::new(buffer_size, f));
        Self { on_sync_progress, on_order_updated }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_sync_progress {
            result.sync_progress_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_updated {
            result.order_updated_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_sync_progress {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_updated {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_sync_progress: Option<Handler<SyncProgressEvent>>,
    pub on_order_updated: Option<Handler<OrderUpdatedEvent>>,
}

impl EventHooks {
    pub fn on_sync_progress<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SyncProgressEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_sync_progress = Some(Arc::new(f));
        self
    }

    pub fn on_order_updated<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderUpdatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_updated = Some(Arc::new(f));
        self
    }
}
