use crate::error::RaceResult;
use crate::events::{Event, EventBus, EventFilter, EventHandler};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Keeps a copy of every event it is handed.
#[derive(Default)]
pub(crate) struct EventRecorder {
    events: Mutex<Vec<Event>>,
}

impl EventRecorder {
    pub(crate) fn subscribe(bus: &EventBus, filter: EventFilter) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        bus.subscribe(filter, recorder.clone());
        recorder
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    async fn handle(&self, _bus: &EventBus, event: &Event) -> RaceResult<()> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
        Ok(())
    }
}
