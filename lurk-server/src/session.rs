//! One race, wired together.
//!
//! The session owns the bus and subscribes, in order: the outbound relays,
//! the racer registry and the field. Chat lines come in from stdin, ticks
//! come from a timer, and everything the race says goes out through the
//! relays.

use crate::config::runtime::SessionConfig;
use crate::relay::{ChatRelay, OutboundSender, SocketRelay};
use lurk_core::entities::Racer;
use lurk_core::events::{AttemptEvent, EventBus, EventFamily, EventFilter, EventKind};
use lurk_core::processors::{Field, RacerRegistry};
use lurk_core::{RaceError, RaceResult};
use lurk_sdk::objects::{ChatCommand, ChatLine, PACKET_SEPARATOR};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Dispatch(#[from] RaceError),

    #[error("failed to read chat input: {0}")]
    Input(#[from] std::io::Error),
}

pub struct RaceSession {
    bus: EventBus,
    registry: Arc<RacerRegistry>,
    field: Arc<Field>,
    config: SessionConfig,
}

impl RaceSession {
    pub fn new(config: SessionConfig, outbound: OutboundSender) -> Self {
        let bus = EventBus::new();
        bus.subscribe(
            EventFilter::Family(EventFamily::Socket),
            Arc::new(SocketRelay::new(config.output, outbound.clone())),
        );
        bus.subscribe(
            EventFilter::Kind(EventKind::ChatMessage),
            Arc::new(ChatRelay::new(outbound)),
        );
        let registry = RacerRegistry::new(&bus);
        let field = Field::new(registry.clone(), &bus);

        for entry in &config.roster {
            registry.add(Racer::new(entry.name.as_str(), entry.avatar.as_str()));
        }
        tracing::info!(racers = registry.len(), "Race session ready");

        Self {
            bus,
            registry,
            field,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<RacerRegistry> {
        &self.registry
    }

    pub fn field(&self) -> &Arc<Field> {
        &self.field
    }

    /// Handle one `<user>: <message>` line. Lines that do not parse and
    /// messages that are not commands are ignored.
    pub async fn handle_chat_line(&self, line: &str) -> RaceResult<()> {
        let chat = match ChatLine::parse(line) {
            Ok(chat) => chat,
            Err(e) => {
                tracing::debug!(error = %e, line, "Ignoring malformed chat line");
                return Ok(());
            }
        };
        let Some(command) = chat.command() else {
            return Ok(());
        };
        if chat.user.contains(PACKET_SEPARATOR) {
            tracing::debug!(
                user = %chat.user,
                "Ignoring command from a name the wire format cannot carry"
            );
            return Ok(());
        }

        if self.config.auto_register && self.registry.lookup(&chat.user).is_none() {
            tracing::info!(user = %chat.user, "Registering new racer");
            let avatar = self.config.avatar_for(&chat.user);
            self.registry.add(Racer::new(chat.user.clone(), avatar));
        }

        let source_name = chat.user;
        let attempt = match command {
            ChatCommand::Join => AttemptEvent::JoinRace { source_name },
            ChatCommand::Leave => AttemptEvent::LeaveRace { source_name },
            ChatCommand::DropItem => AttemptEvent::DropItem { source_name },
        };
        self.bus.publish(attempt.into()).await
    }

    /// Award the per-tick points to everyone in the race.
    pub async fn tick(&self) -> RaceResult<()> {
        self.registry
            .award_active(&self.bus, self.config.points_per_tick)
            .await
    }

    /// Run until `shutdown` resolves, `input` reaches EOF or a dispatch
    /// fails.
    pub async fn run<R, S>(&self, input: R, shutdown: S) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let period = self.config.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut lines = input.lines();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutting down race session");
                    return Ok(());
                }
                line = lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_chat_line(&line).await?,
                        None => {
                            tracing::info!("Chat input closed, ending race session");
                            return Ok(());
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }
    }
}
