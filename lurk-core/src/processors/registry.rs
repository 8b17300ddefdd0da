//! RacerRegistry processor.
//!
//! The RacerRegistry is responsible for:
//! - Owning every known racer, keyed by lowercased display name
//! - Receiving `JoinRace`, `LeaveRace` and `DropItem` attempts and driving
//!   the named racer, or silently dropping the attempt if nobody has that name
//! - Enumerating racers in insertion order for the field's collision scan

use crate::entities::{Racer, RacerKey};
use crate::error::RaceResult;
use crate::events::{AttemptEvent, Event, EventBus, EventFilter, EventHandler, EventKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Default)]
struct RegistryInner {
    /// Insertion order. The number of racers in one stream is small, so
    /// enumeration walks this `Vec` and lookups go through `index`.
    racers: Vec<Arc<Racer>>,
    index: HashMap<RacerKey, usize>,
}

/// Collection of all racers in the session.
#[derive(Default)]
pub struct RacerRegistry {
    inner: RwLock<RegistryInner>,
}

impl RacerRegistry {
    /// Create an empty registry and subscribe it to attempt events.
    pub fn new(bus: &EventBus) -> Arc<Self> {
        let registry = Arc::new(Self::default());
        for kind in [
            EventKind::JoinRaceAttempted,
            EventKind::LeaveRaceAttempted,
            EventKind::DropItemAttempted,
        ] {
            bus.subscribe(EventFilter::Kind(kind), registry.clone());
        }
        registry
    }

    /// Add a racer. A racer whose name differs only in case replaces the
    /// existing one in place.
    pub fn add(&self, racer: Racer) -> Arc<Racer> {
        let key = racer.key();
        let racer = Arc::new(racer);
        let mut inner = self.write();

        debug!(racer = %racer.display_name(), "Adding racer to registry");
        match inner.index.get(&key).copied() {
            Some(slot) => inner.racers[slot] = Arc::clone(&racer),
            None => {
                let slot = inner.racers.len();
                inner.racers.push(Arc::clone(&racer));
                inner.index.insert(key, slot);
            }
        }
        racer
    }

    /// Case-insensitive lookup by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<Racer>> {
        self.get(&RacerKey::new(name))
    }

    pub fn get(&self, key: &RacerKey) -> Option<Arc<Racer>> {
        let inner = self.read();
        inner
            .index
            .get(key)
            .and_then(|slot| inner.racers.get(*slot))
            .cloned()
    }

    /// All racers in insertion order.
    pub fn racers(&self) -> Vec<Arc<Racer>> {
        self.read().racers.clone()
    }

    /// Racers currently in the race, in insertion order.
    pub fn active_racers(&self) -> Vec<Arc<Racer>> {
        self.read()
            .racers
            .iter()
            .filter(|racer| racer.is_active())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().racers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Give every racer in the race `delta` points, in insertion order.
    pub async fn award_active(&self, bus: &EventBus, delta: i64) -> RaceResult<()> {
        let racers = self.active_racers();
        debug!(racers = racers.len(), delta, "Awarding points to active racers");
        for racer in racers {
            racer.adjust_points(bus, delta).await?;
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventHandler for RacerRegistry {
    fn name(&self) -> &'static str {
        "racer_registry"
    }

    async fn handle(&self, bus: &EventBus, event: &Event) -> RaceResult<()> {
        let Event::Attempt(attempt) = event else {
            return Ok(());
        };
        let Some(racer) = self.lookup(attempt.source_name()) else {
            debug!(
                name = attempt.source_name(),
                kind = %attempt.kind(),
                "Attempt from unknown racer dropped"
            );
            return Ok(());
        };

        match attempt {
            AttemptEvent::JoinRace { .. } => racer.attempt_join(bus).await,
            AttemptEvent::LeaveRace { .. } => racer.attempt_leave(bus).await,
            AttemptEvent::DropItem { .. } => racer.drop_item(bus).await,
        }
    }
}
