use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CompensationFailedEvent, EventHandler, EventProducer, Handler, PaymentRecordedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_recorded_producer: Vec<EventProducer<PaymentRecordedEvent>>,
    pub compensation_failed_producer: Vec<EventProducer<CompensationFailedEvent>>,
}

impl EventProducers {
    pub async fn publish_payment_recorded(&self, event: PaymentRecordedEvent) {
        for producer in &self.payment_recorded_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_compensation_failed(&self, event: CompensationFailedEvent) {
        for producer in &self.compensation_failed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_payment_recorded: Option<EventHandler<PaymentRecordedEvent>>,
    pub on_compensation_failed: Option<EventHandler<CompensationFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_recorded = hooks.on_payment_recorded.map(|f| EventHandler::new(buffer_size, f));
        let on_compensation_failed = hooks.on_compensation_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_recorded, on_compensation_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_recorded {
            result.payment_recorded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_compensation_failed {
            result.compensation_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_recorded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_compensation_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_recorded: Option<Handler<PaymentRecordedEvent>>,
    pub on_compensation_failed: Option<Handler<CompensationFailedEvent>>,
}

impl EventHooks {
    pub fn on_payment_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentRecordedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_recorded = Some(Arc::new(f));
        self
    }

    pub fn on_compensation_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CompensationFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_compensation_failed = Some(Arc::new(f));
        self
    }
}
