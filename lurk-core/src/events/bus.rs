//! The event bus.
//!
//! Handlers subscribe with an explicit [`EventFilter`] and are kept in a
//! tag-indexed routing table: one handler list per [`EventKind`], each in
//! registration order. Subscribing with `Any` or `Family` appends the handler
//! to every matching list, so per-kind order always equals global
//! registration order.
//!
//! # Dispatch
//!
//! [`EventBus::publish`] awaits every matching handler in order, one at a
//! time. A handler may publish again while it runs; that nested publish is
//! fully delivered (recursively) before the outer publish moves on to its
//! next handler. Delivery is therefore depth-first:
//!
//! ```text
//! publish(A)
//! ├─ H1(A) -> publish(B)
//! │          ├─ H1(B)
//! │          └─ H2(B)
//! └─ H2(A)
//! ```
//!
//! Failure is fail-fast with no handler isolation: the first handler error
//! stops the dispatch and unwinds every enclosing publish.

use crate::error::RaceResult;
use crate::events::types::{Event, EventFilter, EventKind};
use async_recursion::async_recursion;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};

/// A consumer of bus events.
///
/// Handlers receive the bus so they can publish follow-up events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, bus: &EventBus, event: &Event) -> RaceResult<()>;
}

/// Synchronous, reentrant publish/subscribe hub for one race session.
#[derive(Default)]
pub struct EventBus {
    routes: RwLock<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
    /// Current publish nesting, for logs only.
    depth: AtomicUsize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event kind matched by `filter`.
    ///
    /// Handlers cannot be removed. A subscription made while a publish is in
    /// flight only sees events published after it.
    pub fn subscribe(&self, filter: EventFilter, handler: Arc<dyn EventHandler>) {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        for kind in EventKind::ALL.into_iter().filter(|kind| filter.matches(*kind)) {
            routes.entry(kind).or_default().push(Arc::clone(&handler));
        }
        debug!(handler = handler.name(), ?filter, "Subscribed handler");
    }

    /// Number of handlers an event of `kind` is delivered to.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to its handlers and wait for every consequence,
    /// including events published by those handlers, to be delivered.
    #[async_recursion]
    pub async fn publish(&self, event: Event) -> RaceResult<()> {
        let kind = event.kind();
        let handlers = self.handlers_for(kind);
        let depth = self.depth.fetch_add(1, Ordering::Relaxed);

        debug!(%kind, depth, handlers = handlers.len(), ?event, "Publishing event");

        let mut result = Ok(());
        for handler in &handlers {
            if let Err(e) = handler.handle(self, &event).await {
                if depth == 0 {
                    error!(handler = handler.name(), %kind, error = %e, "Dispatch aborted");
                } else {
                    debug!(
                        handler = handler.name(),
                        %kind,
                        depth,
                        error = %e,
                        "Nested dispatch aborted"
                    );
                }
                result = Err(e);
                break;
            }
        }

        self.depth.fetch_sub(1, Ordering::Relaxed);
        result
    }

    /// Snapshot the handlers for `kind` so no lock is held while they run.
    fn handlers_for(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}
