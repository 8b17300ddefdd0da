//! Event processors that own shared race state.
//!
//! - `RacerRegistry`: Receives attempt events, drives the named `Racer`
//! - `Field`: Receives `PointsSet` and `ItemDropped`, resolves item hits

pub mod field;
pub mod registry;

pub use field::Field;
pub use registry::RacerRegistry;
