//! Errors surfaced by event dispatch.
//!
//! Unknown racer names and refused state transitions are not errors: the
//! former are dropped, the latter are answered with a chat message. What is
//! left are handler failures, which abort the whole dispatch chain.

use crate::events::EventKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RaceError {
    /// An outbound relay could not hand the event on because its receiver
    /// is gone.
    #[error("outbound channel closed while relaying {kind} event")]
    OutboundClosed { kind: EventKind },

    /// A handler refused an event.
    #[error("handler `{handler}` failed on {kind} event: {reason}")]
    Handler {
        handler: &'static str,
        kind: EventKind,
        reason: String,
    },
}

pub type RaceResult<T> = Result<T, RaceError>;
