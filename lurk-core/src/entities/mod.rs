pub mod racer;

pub use racer::{RaceStatus, Racer, RacerKey, TRACK_LENGTH};
