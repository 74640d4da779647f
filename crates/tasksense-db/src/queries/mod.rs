//! Database query implementations.

pub mod activities;
pub mod summaries;
pub mod tasks;
pub mod users;
