//! The store adapter: a narrow trait onto the relational store for jobs
//! and schedules, plus an in-memory backend for fast unit tests and a
//! `sqlx::Any` backend for SQLite/Postgres, per SPEC_FULL.md §4.5.

pub mod memory;
pub mod sql;
pub mod traits;

pub use memory::InMemoryStore;
pub use sql::SqlStore;
pub use traits::{JobFilter, JobStatusUpdate, JobStore, ScheduleStore, Store};
