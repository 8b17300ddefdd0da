#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod entities;
pub mod error;
pub mod events;
pub mod processors;

#[cfg(test)]
mod testing;

pub use error::{RaceError, RaceResult};
