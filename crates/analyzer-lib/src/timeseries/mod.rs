//! In-memory time-series storage
//!
//! Append-only series keyed by `(entity, metric)`. Key creation goes through
//! a sharded concurrent map while every series carries its own lock, so
//! writers to different series never contend.

mod retention;
mod store;

#[cfg(test)]
mod tests;

pub use retention::RetentionPolicy;
pub use store::{Series, SeriesKey, TimeSeriesStore};
