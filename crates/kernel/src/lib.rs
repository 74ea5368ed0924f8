//! Shared domain types, error taxonomy, and clock abstraction for the job
//! execution substrate. Every other crate in this workspace depends on
//! `kernel`; `kernel` depends on nothing in this workspace.

pub mod clock;
pub mod domain;
pub mod error;

pub use clock::{Clock, SystemClock};
pub use error::CoreError;
