//! Wire objects for the lurker race.
//!
//! Everything a downstream consumer (a stream overlay, a chat bot) needs to
//! talk to the race without depending on its runtime: the socket packet
//! codec and the chat command grammar.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod objects;
