//! Agent runtime: the trait every agent implements, the process-wide
//! registry keyed by name, and the wrapper that turns a raw `execute` call
//! into validated, timed, crash-safe [`AgentResult`]s.

pub mod reference;
pub mod registry;
pub mod runtime;
pub mod traits;

pub use registry::AgentRegistry;
pub use runtime::execute_with_guardrails;
pub use traits::{Agent, AgentOutcome, AgentResult};
