//! Event type definitions.
//!
//! Events come in three families. Attempts are first-person requests sourced
//! by a chat name that may not resolve to a racer. Socket events are race
//! state changes with a fixed wire layout. Chat messages are text for the
//! chat bridge to post.

use compact_str::CompactString;
use lurk_sdk::objects::{EventCode, SocketPacket};
use std::fmt;

/// Abstract event families, used to subscribe to a whole family at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventFamily {
    Attempt,
    Socket,
    Chat,
}

/// One tag per concrete event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    JoinRaceAttempted,
    LeaveRaceAttempted,
    DropItemAttempted,
    Joined,
    Left,
    PointsSet,
    ItemDropped,
    ItemHit,
    ChatMessage,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::JoinRaceAttempted,
        EventKind::LeaveRaceAttempted,
        EventKind::DropItemAttempted,
        EventKind::Joined,
        EventKind::Left,
        EventKind::PointsSet,
        EventKind::ItemDropped,
        EventKind::ItemHit,
        EventKind::ChatMessage,
    ];

    pub fn family(self) -> EventFamily {
        match self {
            EventKind::JoinRaceAttempted
            | EventKind::LeaveRaceAttempted
            | EventKind::DropItemAttempted => EventFamily::Attempt,
            EventKind::Joined
            | EventKind::Left
            | EventKind::PointsSet
            | EventKind::ItemDropped
            | EventKind::ItemHit => EventFamily::Socket,
            EventKind::ChatMessage => EventFamily::Chat,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::JoinRaceAttempted => "join_race_attempted",
            EventKind::LeaveRaceAttempted => "leave_race_attempted",
            EventKind::DropItemAttempted => "drop_item_attempted",
            EventKind::Joined => "joined",
            EventKind::Left => "left",
            EventKind::PointsSet => "points_set",
            EventKind::ItemDropped => "item_dropped",
            EventKind::ItemHit => "item_hit",
            EventKind::ChatMessage => "chat_message",
        };
        f.write_str(name)
    }
}

/// Which events a handler wants, fixed at subscribe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event.
    Any,
    /// Every variant of one family.
    Family(EventFamily),
    /// Exactly one variant.
    Kind(EventKind),
}

impl EventFilter {
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Family(family) => kind.family() == family,
            EventFilter::Kind(k) => k == kind,
        }
    }
}

/// A chatter asked to do something. The name may not belong to any racer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    JoinRace { source_name: CompactString },
    LeaveRace { source_name: CompactString },
    DropItem { source_name: CompactString },
}

impl AttemptEvent {
    pub fn source_name(&self) -> &str {
        match self {
            AttemptEvent::JoinRace { source_name }
            | AttemptEvent::LeaveRace { source_name }
            | AttemptEvent::DropItem { source_name } => source_name,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            AttemptEvent::JoinRace { .. } => EventKind::JoinRaceAttempted,
            AttemptEvent::LeaveRace { .. } => EventKind::LeaveRaceAttempted,
            AttemptEvent::DropItem { .. } => EventKind::DropItemAttempted,
        }
    }
}

/// A race state change that is relayed to socket listeners.
///
/// Each variant maps to one [`EventCode`] and a fixed value layout, so
/// structural equality is the same as equality of `(code, values)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Joined {
        display_name: CompactString,
    },
    Left {
        display_name: CompactString,
    },
    PointsSet {
        display_name: CompactString,
        points: u32,
    },
    /// `position` is where the item lies, one step behind the dropper.
    ItemDropped {
        display_name: CompactString,
        position: u32,
    },
    /// `attacker` dropped the item and may be the same racer as `victim`.
    ItemHit {
        position: u32,
        victim: CompactString,
        attacker: CompactString,
    },
}

impl SocketEvent {
    pub fn code(&self) -> EventCode {
        match self {
            SocketEvent::Joined { .. } => EventCode::Joined,
            SocketEvent::Left { .. } => EventCode::Left,
            SocketEvent::PointsSet { .. } => EventCode::PointsSet,
            SocketEvent::ItemDropped { .. } => EventCode::ItemDropped,
            SocketEvent::ItemHit { .. } => EventCode::ItemHit,
        }
    }

    /// Positional values in wire order.
    pub fn values(&self) -> Vec<String> {
        match self {
            SocketEvent::Joined { display_name } | SocketEvent::Left { display_name } => {
                vec![display_name.to_string()]
            }
            SocketEvent::PointsSet {
                display_name,
                points,
            } => vec![display_name.to_string(), points.to_string()],
            SocketEvent::ItemDropped {
                display_name,
                position,
            } => vec![display_name.to_string(), position.to_string()],
            SocketEvent::ItemHit {
                position,
                victim,
                attacker,
            } => vec![position.to_string(), victim.to_string(), attacker.to_string()],
        }
    }

    pub fn packet(&self) -> SocketPacket {
        SocketPacket::new(self.code(), self.values())
    }

    pub fn kind(&self) -> EventKind {
        match self {
            SocketEvent::Joined { .. } => EventKind::Joined,
            SocketEvent::Left { .. } => EventKind::Left,
            SocketEvent::PointsSet { .. } => EventKind::PointsSet,
            SocketEvent::ItemDropped { .. } => EventKind::ItemDropped,
            SocketEvent::ItemHit { .. } => EventKind::ItemHit,
        }
    }
}

/// Text for the chat bridge to post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: String,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Any event that travels over the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Attempt(AttemptEvent),
    Socket(SocketEvent),
    Chat(ChatMessage),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Attempt(attempt) => attempt.kind(),
            Event::Socket(socket) => socket.kind(),
            Event::Chat(_) => EventKind::ChatMessage,
        }
    }

    pub fn family(&self) -> EventFamily {
        self.kind().family()
    }

    pub fn chat(message: impl Into<String>) -> Self {
        Event::Chat(ChatMessage::new(message))
    }
}

impl From<AttemptEvent> for Event {
    fn from(value: AttemptEvent) -> Self {
        Event::Attempt(value)
    }
}

impl From<SocketEvent> for Event {
    fn from(value: SocketEvent) -> Self {
        Event::Socket(value)
    }
}

impl From<ChatMessage> for Event {
    fn from(value: ChatMessage) -> Self {
        Event::Chat(value)
    }
}
