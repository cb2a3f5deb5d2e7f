// File: ./src/model/mod.rs
pub mod adapter;
pub mod event;
pub mod recurrence;
pub mod windows_zones;

pub use event::{EventTime, NormalizedEvent, RawOccurrence, Schedule};
