//! Field processor.
//!
//! The Field is responsible for:
//! - Receiving `ItemDropped` and checking whether an in-race racer already
//!   stands on the drop position (immediate hit), storing the item otherwise
//! - Receiving `PointsSet` and resolving the oldest stored item at the
//!   mover's new position
//!
//! Items stack per position and resolve oldest first. A stored item only
//! remembers its owner's [`RacerKey`]; the registry stays the owner of the
//! racer itself.
//!
//! Penalties go through [`Racer::adjust_points`], which publishes another
//! `PointsSet` that this processor handles before the hit is announced. A
//! penalty can therefore knock a racer back onto another item.

use crate::entities::{Racer, RacerKey, TRACK_LENGTH};
use crate::error::RaceResult;
use crate::events::{Event, EventBus, EventFilter, EventHandler, EventKind, SocketEvent};
use crate::processors::RacerRegistry;
use async_trait::async_trait;
use compact_str::CompactString;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Points lost when hitting someone else's item.
pub const HIT_PENALTY: i64 = 1;
/// Points lost when hitting your own item.
pub const SELF_HIT_PENALTY: i64 = 2;

/// Shared, position-indexed race state.
pub struct Field {
    registry: Arc<RacerRegistry>,
    /// A position is present iff its queue is non-empty.
    items: Mutex<HashMap<u32, VecDeque<RacerKey>>>,
}

impl Field {
    /// Create an empty field and subscribe it to `PointsSet` and
    /// `ItemDropped`.
    pub fn new(registry: Arc<RacerRegistry>, bus: &EventBus) -> Arc<Self> {
        let field = Arc::new(Self {
            registry,
            items: Mutex::new(HashMap::new()),
        });
        bus.subscribe(EventFilter::Kind(EventKind::PointsSet), field.clone());
        bus.subscribe(EventFilter::Kind(EventKind::ItemDropped), field.clone());
        field
    }

    /// Owners of the items stacked at `position`, oldest first.
    pub fn items_at(&self, position: u32) -> Vec<RacerKey> {
        self.items()
            .get(&position)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of positions holding at least one item.
    pub fn occupied_positions(&self) -> usize {
        self.items().len()
    }

    /// Total number of stored items.
    pub fn item_count(&self) -> usize {
        self.items().values().map(VecDeque::len).sum()
    }

    /// A racer moved; they may have landed on an item.
    ///
    /// Events published when an item is hit:
    /// 1. `PointsSet` for the penalty (and whatever that triggers)
    /// 2. `ItemHit`
    /// 3. a chat message
    async fn on_points_set(&self, bus: &EventBus, display_name: &str) -> RaceResult<()> {
        let Some(mover) = self.registry.lookup(display_name) else {
            debug!(racer = display_name, "Points set for unknown racer, ignoring");
            return Ok(());
        };
        let position = mover.position();
        let Some(owner) = self.take_item(position) else {
            return Ok(());
        };

        if owner == mover.key() {
            debug!(racer = %mover.display_name(), position, "Racer hit their own banana");
            mover.adjust_points(bus, -SELF_HIT_PENALTY).await?;
            self.announce_hit(bus, position, &mover, mover.display_name().clone())
                .await?;
            bus.publish(Event::chat(format!(
                "@{} hit their own banana, oof",
                mover.display_name()
            )))
            .await
        } else {
            let attacker = self.display_name_of(&owner);
            debug!(racer = %mover.display_name(), %attacker, position, "Racer hit a banana");
            mover.adjust_points(bus, -HIT_PENALTY).await?;
            self.announce_hit(bus, position, &mover, attacker.clone())
                .await?;
            bus.publish(Event::chat(format!(
                "@{} hit the banana set by @{}",
                mover.display_name(),
                attacker
            )))
            .await
        }
    }

    /// An item was dropped; it either hits someone standing there right away
    /// or is stored for later.
    ///
    /// Events published on an immediate hit:
    /// 1. `PointsSet` for the penalty (and whatever that triggers)
    /// 2. `ItemHit`
    /// 3. a chat message
    async fn on_item_dropped(
        &self,
        bus: &EventBus,
        dropper: &CompactString,
        position: u32,
    ) -> RaceResult<()> {
        let position = position % TRACK_LENGTH;
        let victim = self
            .registry
            .active_racers()
            .into_iter()
            .find(|racer| racer.position() == position);

        if let Some(victim) = victim {
            debug!(
                racer = %victim.display_name(),
                %dropper,
                position,
                "Racer hit a banana that was just dropped"
            );
            victim.adjust_points(bus, -HIT_PENALTY).await?;
            self.announce_hit(bus, position, &victim, dropper.clone())
                .await?;
            return bus
                .publish(Event::chat(format!(
                    "@{} hit the banana just set by @{}",
                    victim.display_name(),
                    dropper
                )))
                .await;
        }

        debug!(%dropper, position, "Banana dropped");
        self.items()
            .entry(position)
            .or_default()
            .push_back(RacerKey::new(dropper));
        Ok(())
    }

    async fn announce_hit(
        &self,
        bus: &EventBus,
        position: u32,
        victim: &Racer,
        attacker: CompactString,
    ) -> RaceResult<()> {
        bus.publish(
            SocketEvent::ItemHit {
                position,
                victim: victim.display_name().clone(),
                attacker,
            }
            .into(),
        )
        .await
    }

    /// Pop the oldest item at `position`, dropping the position once empty.
    fn take_item(&self, position: u32) -> Option<RacerKey> {
        let mut items = self.items();
        let queue = items.get_mut(&position)?;
        let owner = queue.pop_front();
        if queue.is_empty() {
            items.remove(&position);
        }
        owner
    }

    fn display_name_of(&self, key: &RacerKey) -> CompactString {
        self.registry
            .get(key)
            .map(|racer| racer.display_name().clone())
            .unwrap_or_else(|| key.as_str().into())
    }

    fn items(&self) -> MutexGuard<'_, HashMap<u32, VecDeque<RacerKey>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventHandler for Field {
    fn name(&self) -> &'static str {
        "field"
    }

    async fn handle(&self, bus: &EventBus, event: &Event) -> RaceResult<()> {
        match event {
            Event::Socket(SocketEvent::PointsSet { display_name, .. }) => {
                self.on_points_set(bus, display_name).await
            }
            Event::Socket(SocketEvent::ItemDropped {
                display_name,
                position,
            }) => self.on_item_dropped(bus, display_name, *position).await,
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::RaceStatus;
    use crate::events::AttemptEvent;
    use crate::testing::EventRecorder;
    use pretty_assertions::assert_eq;

    /// A wired race whose recorder is subscribed first, so it sees events in
    /// the order they are published.
    struct Race {
        bus: EventBus,
        recorder: Arc<EventRecorder>,
        registry: Arc<RacerRegistry>,
        field: Arc<Field>,
    }

    impl Race {
        fn new() -> Self {
            let bus = EventBus::new();
            let recorder = EventRecorder::subscribe(&bus, EventFilter::Any);
            let registry = RacerRegistry::new(&bus);
            let field = Field::new(registry.clone(), &bus);
            Self {
                bus,
                recorder,
                registry,
                field,
            }
        }

        async fn racer(&self, name: &str) -> Arc<Racer> {
            let racer = self.registry.add(Racer::new(name, format!("{name}_image")));
            racer.attempt_join(&self.bus).await.unwrap();
            racer
        }
    }

    fn points_set(name: &str, points: u32) -> Event {
        SocketEvent::PointsSet {
            display_name: name.into(),
            points,
        }
        .into()
    }

    fn item_dropped(name: &str, position: u32) -> Event {
        SocketEvent::ItemDropped {
            display_name: name.into(),
            position,
        }
        .into()
    }

    fn item_hit(position: u32, victim: &str, attacker: &str) -> Event {
        SocketEvent::ItemHit {
            position,
            victim: victim.into(),
            attacker: attacker.into(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_banana_can_hit_racer_already_in_position() {
        let race = Race::new();
        let hit = race.racer("hit").await;
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 10).await.unwrap();
        hit.adjust_points(&race.bus, 9).await.unwrap();
        race.recorder.clear();

        // Dropped from 10 the banana lands on 9, where "hit" already is.
        attack.drop_item(&race.bus).await.unwrap();

        assert_eq!(hit.points(), 8);
        assert_eq!(race.field.occupied_positions(), 0);
        assert_eq!(
            race.recorder.events(),
            vec![
                item_dropped("attack", 9),
                points_set("hit", 8),
                item_hit(9, "hit", "attack"),
                Event::chat("@hit hit the banana just set by @attack"),
            ]
        );
    }

    #[tokio::test]
    async fn test_banana_can_hit_racer_when_they_move() {
        let race = Race::new();
        let hit = race.racer("hit").await;
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();

        attack.drop_item(&race.bus).await.unwrap();
        assert_eq!(race.field.items_at(14), vec![RacerKey::new("attack")]);

        race.recorder.clear();
        hit.adjust_points(&race.bus, 14).await.unwrap();

        assert_eq!(hit.points(), 13);
        assert_eq!(race.field.item_count(), 0);
        assert_eq!(
            race.recorder.events(),
            vec![
                points_set("hit", 14),
                points_set("hit", 13),
                item_hit(14, "hit", "attack"),
                Event::chat("@hit hit the banana set by @attack"),
            ]
        );
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_penalty_before_the_move() {
        let race = Race::new();
        let hit = race.racer("Hit").await;
        let attack = race.racer("Attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();
        attack.drop_item(&race.bus).await.unwrap();
        let late =
            EventRecorder::subscribe(&race.bus, EventFilter::Kind(EventKind::PointsSet));

        hit.adjust_points(&race.bus, 14).await.unwrap();

        // The field handles the move first and its penalty is delivered in
        // full before anyone after the field hears about the move.
        assert_eq!(
            late.events(),
            vec![points_set("Hit", 13), points_set("Hit", 14)]
        );
    }

    #[tokio::test]
    async fn test_banana_ignores_racer_not_in_race() {
        let race = Race::new();
        let hit = race.racer("hit").await;
        hit.adjust_points(&race.bus, 14).await.unwrap();
        hit.attempt_leave(&race.bus).await.unwrap();
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();

        // The banana lands on 14, but nobody in the race is there.
        attack.drop_item(&race.bus).await.unwrap();

        assert_eq!(hit.status(), RaceStatus::Removed);
        assert_eq!(hit.points(), 14);
        assert_eq!(race.field.occupied_positions(), 1);
    }

    #[tokio::test]
    async fn test_hitting_own_banana_loses_more() {
        let race = Race::new();
        let dumb = race.racer("dumb").await;
        dumb.adjust_points(&race.bus, 18).await.unwrap();
        dumb.drop_item(&race.bus).await.unwrap();
        race.recorder.clear();

        dumb.adjust_points(&race.bus, -1).await.unwrap();

        assert_eq!(dumb.points(), 15);
        assert_eq!(
            race.recorder.events(),
            vec![
                points_set("dumb", 17),
                points_set("dumb", 15),
                item_hit(17, "dumb", "dumb"),
                Event::chat("@dumb hit their own banana, oof"),
            ]
        );
    }

    #[tokio::test]
    async fn test_bananas_only_work_once() {
        let race = Race::new();
        let hit = race.racer("hit").await;
        hit.adjust_points(&race.bus, 14).await.unwrap();
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();

        attack.drop_item(&race.bus).await.unwrap();
        // Knocked back to 13 on drop; stepping onto 14 again is safe.
        hit.adjust_points(&race.bus, 1).await.unwrap();

        assert_eq!(hit.points(), 14);
        assert_eq!(race.field.occupied_positions(), 0);
    }

    #[tokio::test]
    async fn test_can_stack_bananas() {
        let race = Race::new();
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();
        attack.drop_item(&race.bus).await.unwrap();
        attack.drop_item(&race.bus).await.unwrap();
        assert_eq!(race.field.item_count(), 2);
        assert_eq!(race.field.occupied_positions(), 1);

        // Moving to 14 hits the first banana and falls back to 13...
        let hit = race.racer("hit").await;
        hit.adjust_points(&race.bus, 14).await.unwrap();
        assert_eq!(hit.points(), 13);
        // ...and the second one is still waiting there.
        hit.adjust_points(&race.bus, 1).await.unwrap();
        assert_eq!(hit.points(), 13);

        assert_eq!(race.field.occupied_positions(), 0);
    }

    #[tokio::test]
    async fn test_stacked_bananas_resolve_oldest_first() {
        let race = Race::new();
        let first = race.racer("first").await;
        let second = race.racer("second").await;
        first.adjust_points(&race.bus, 31).await.unwrap();
        second.adjust_points(&race.bus, 31).await.unwrap();
        first.drop_item(&race.bus).await.unwrap();
        second.drop_item(&race.bus).await.unwrap();
        assert_eq!(
            race.field.items_at(30),
            vec![RacerKey::new("first"), RacerKey::new("second")]
        );

        let runner = race.racer("runner").await;
        let hits = EventRecorder::subscribe(&race.bus, EventFilter::Kind(EventKind::ItemHit));
        runner.adjust_points(&race.bus, 30).await.unwrap();
        runner.adjust_points(&race.bus, 1).await.unwrap();

        assert_eq!(
            hits.events(),
            vec![
                item_hit(30, "runner", "first"),
                item_hit(30, "runner", "second")
            ]
        );
    }

    #[tokio::test]
    async fn test_penalty_can_chain_into_another_banana() {
        let race = Race::new();
        // y leaves a banana on 19 and quits; x leaves one on 20.
        let y = race.racer("y").await;
        y.adjust_points(&race.bus, 20).await.unwrap();
        y.drop_item(&race.bus).await.unwrap();
        y.attempt_leave(&race.bus).await.unwrap();
        let x = race.racer("x").await;
        x.adjust_points(&race.bus, 21).await.unwrap();
        x.drop_item(&race.bus).await.unwrap();
        let runner = race.racer("runner").await;
        race.recorder.clear();

        runner.adjust_points(&race.bus, 20).await.unwrap();

        assert_eq!(runner.points(), 18);
        assert_eq!(race.field.item_count(), 0);
        assert_eq!(
            race.recorder.events(),
            vec![
                points_set("runner", 20),
                points_set("runner", 19),
                points_set("runner", 18),
                item_hit(19, "runner", "y"),
                Event::chat("@runner hit the banana set by @y"),
                item_hit(20, "runner", "x"),
                Event::chat("@runner hit the banana set by @x"),
            ]
        );
    }

    #[tokio::test]
    async fn test_points_for_unknown_racer_leave_items_alone() {
        let race = Race::new();
        let attack = race.racer("attack").await;
        attack.adjust_points(&race.bus, 15).await.unwrap();
        attack.drop_item(&race.bus).await.unwrap();

        race.bus.publish(points_set("ghost", 14)).await.unwrap();

        assert_eq!(race.field.items_at(14), vec![RacerKey::new("attack")]);
    }

    #[tokio::test]
    async fn end_to_end_drop_hits_racer_standing_on_it() {
        let race = Race::new();
        let a = race.racer("A").await;
        a.adjust_points(&race.bus, 15).await.unwrap();
        let b = race.racer("B").await;
        b.adjust_points(&race.bus, 14).await.unwrap();
        assert_eq!((a.position(), b.position()), (15, 14));
        race.recorder.clear();

        race.bus
            .publish(
                AttemptEvent::DropItem {
                    source_name: "a".into(),
                }
                .into(),
            )
            .await
            .unwrap();

        assert_eq!(b.points(), 13);
        assert_eq!(a.points(), 15);
        assert_eq!(race.field.item_count(), 0);
        assert_eq!(
            race.recorder.events(),
            vec![
                Event::from(AttemptEvent::DropItem {
                    source_name: "a".into()
                }),
                item_dropped("A", 14),
                points_set("B", 13),
                item_hit(14, "B", "A"),
                Event::chat("@B hit the banana just set by @A"),
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_banana_hits_only_the_first_racer_on_it() {
        let race = Race::new();
        let first = race.racer("first").await;
        let second = race.racer("second").await;
        first.adjust_points(&race.bus, 14).await.unwrap();
        second.adjust_points(&race.bus, 14).await.unwrap();
        let dropper = race.racer("dropper").await;
        dropper.adjust_points(&race.bus, 15).await.unwrap();
        race.recorder.clear();

        dropper.drop_item(&race.bus).await.unwrap();

        assert_eq!(first.points(), 13);
        assert_eq!(second.points(), 14);
        assert_eq!(race.field.item_count(), 0);
        assert_eq!(
            race.recorder.events(),
            vec![
                item_dropped("dropper", 14),
                points_set("first", 13),
                item_hit(14, "first", "dropper"),
                Event::chat("@first hit the banana just set by @dropper"),
            ]
        );
    }

    #[tokio::test]
    async fn test_drop_position_wraps_onto_track() {
        let race = Race::new();
        let attack = race.racer("attack").await;
        let hit = race.racer("hit").await;
        hit.adjust_points(&race.bus, 14).await.unwrap();

        // One lap past 14 lands on the racer standing at 14.
        race.bus.publish(item_dropped("attack", 74)).await.unwrap();
        assert_eq!(hit.points(), 13);

        // With nobody there, the item is stored under the wrapped position.
        race.bus.publish(item_dropped("attack", 80)).await.unwrap();
        assert_eq!(race.field.items_at(20), vec![attack.key()]);
        assert!(race.field.items_at(80).is_empty());
    }
}
