//! Persistence layer for classmate.
//!
//! Owns the PostgreSQL connection configuration, the embedded migrations,
//! the row types and the query functions for the schedule record store.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
