//! Per-participant race state.
//!
//! A racer walks a one-way state machine:
//!
//! ```text
//! Outside --join--> InRace --leave--> Removed
//! ```
//!
//! Every operation finishes mutating the racer before it publishes anything,
//! so handlers reacting to those events may call back into the same racer.

use crate::error::RaceResult;
use crate::events::{Event, EventBus, SocketEvent};
use compact_str::CompactString;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Number of positions on the circular track.
pub const TRACK_LENGTH: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceStatus {
    /// Known to the race but never joined.
    Outside,
    InRace,
    /// Left the race. Terminal.
    Removed,
}

/// Registry key of a racer: the lowercased display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RacerKey(CompactString);

impl RacerKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RacerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct RacerState {
    status: RaceStatus,
    points: u32,
}

/// One participant. Equality is by display name, case-sensitive.
#[derive(Debug)]
pub struct Racer {
    display_name: CompactString,
    avatar: String,
    state: Mutex<RacerState>,
}

impl Racer {
    pub fn new(display_name: impl Into<CompactString>, avatar: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar: avatar.into(),
            state: Mutex::new(RacerState {
                status: RaceStatus::Outside,
                points: 0,
            }),
        }
    }

    pub fn display_name(&self) -> &CompactString {
        &self.display_name
    }

    /// Opaque avatar reference (usually an image URL) for the overlay.
    pub fn avatar(&self) -> &str {
        &self.avatar
    }

    pub fn key(&self) -> RacerKey {
        RacerKey::new(&self.display_name)
    }

    pub fn status(&self) -> RaceStatus {
        self.state().status
    }

    pub fn points(&self) -> u32 {
        self.state().points
    }

    /// Where the racer is on the track, accounting for laps.
    pub fn position(&self) -> u32 {
        self.state().points % TRACK_LENGTH
    }

    pub fn is_active(&self) -> bool {
        self.status() == RaceStatus::InRace
    }

    /// Join the race.
    ///
    /// Events published:
    /// 1. chat "already in the race" when in the race
    /// 2. chat "already left" when removed
    /// 3. otherwise `Joined`, then a chat announcement
    pub async fn attempt_join(&self, bus: &EventBus) -> RaceResult<()> {
        let previous = {
            let mut state = self.state();
            let previous = state.status;
            if previous == RaceStatus::Outside {
                state.status = RaceStatus::InRace;
            }
            previous
        };

        match previous {
            RaceStatus::InRace => {
                debug!(racer = %self.display_name, "Tried to join the race but is already in it");
                bus.publish(Event::chat(format!(
                    "@{} you are already in the race",
                    self.display_name
                )))
                .await
            }
            RaceStatus::Removed => {
                debug!(racer = %self.display_name, "Tried to join the race but already left");
                bus.publish(Event::chat(format!(
                    "@{} you already left the race",
                    self.display_name
                )))
                .await
            }
            RaceStatus::Outside => {
                debug!(racer = %self.display_name, "Joined the race");
                bus.publish(
                    SocketEvent::Joined {
                        display_name: self.display_name.clone(),
                    }
                    .into(),
                )
                .await?;
                bus.publish(Event::chat(format!(
                    "LET'S GO! @{} IS IN THIS",
                    self.display_name
                )))
                .await
            }
        }
    }

    /// Leave the race for good.
    ///
    /// Events published:
    /// 1. chat "not in the race" unless in the race
    /// 2. otherwise `Left`, then a chat message
    pub async fn attempt_leave(&self, bus: &EventBus) -> RaceResult<()> {
        let left = {
            let mut state = self.state();
            let in_race = state.status == RaceStatus::InRace;
            if in_race {
                state.status = RaceStatus::Removed;
            }
            in_race
        };

        if !left {
            debug!(racer = %self.display_name, "Tried to leave the race without being in it");
            return self.publish_not_in_race(bus).await;
        }

        debug!(racer = %self.display_name, "Left the race");
        bus.publish(
            SocketEvent::Left {
                display_name: self.display_name.clone(),
            }
            .into(),
        )
        .await?;
        bus.publish(Event::chat(format!(
            "Ok then, @{} ditched us",
            self.display_name
        )))
        .await
    }

    /// Add `delta` points, or remove them when negative. Points never drop
    /// below zero.
    ///
    /// Publishes `PointsSet` with the new total, unless the racer is not in
    /// the race or the total did not change.
    pub async fn adjust_points(&self, bus: &EventBus, delta: i64) -> RaceResult<()> {
        let points = {
            let mut state = self.state();
            if state.status != RaceStatus::InRace {
                debug!(
                    racer = %self.display_name,
                    delta,
                    "Tried to get points without being in the race"
                );
                return Ok(());
            }

            let points = clamp_points(state.points, delta);
            if points == state.points {
                debug!(racer = %self.display_name, delta, "Points unchanged");
                return Ok(());
            }
            state.points = points;
            points
        };

        bus.publish(
            SocketEvent::PointsSet {
                display_name: self.display_name.clone(),
                points,
            }
            .into(),
        )
        .await
    }

    /// Drop an item one position behind the racer.
    ///
    /// Publishes `ItemDropped`, or a "not in the race" chat message.
    pub async fn drop_item(&self, bus: &EventBus) -> RaceResult<()> {
        let position = {
            let state = self.state();
            (state.status == RaceStatus::InRace).then_some(state.points % TRACK_LENGTH)
        };

        let Some(position) = position else {
            debug!(racer = %self.display_name, "Tried to drop an item without being in the race");
            return self.publish_not_in_race(bus).await;
        };

        bus.publish(
            SocketEvent::ItemDropped {
                display_name: self.display_name.clone(),
                position: (position + TRACK_LENGTH - 1) % TRACK_LENGTH,
            }
            .into(),
        )
        .await
    }

    async fn publish_not_in_race(&self, bus: &EventBus) -> RaceResult<()> {
        bus.publish(Event::chat(format!(
            "@{} you aint even in the race",
            self.display_name
        )))
        .await
    }

    fn state(&self) -> MutexGuard<'_, RacerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Racer {
    fn eq(&self, other: &Self) -> bool {
        self.display_name == other.display_name
    }
}

impl Eq for Racer {}

fn clamp_points(points: u32, delta: i64) -> u32 {
    let total = i64::from(points).saturating_add(delta).max(0);
    u32::try_from(total).unwrap_or(u32::MAX)
}
