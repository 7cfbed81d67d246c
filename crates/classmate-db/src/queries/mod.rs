//! Query functions, one module per table.

pub mod schedule_events;
