//! Provider registry: a process-wide mapping from provider name to a
//! handle behind a uniform `query` contract, used by the agent runtime.

pub mod anthropic;
pub mod deepseek;
pub mod google;
pub mod http;
pub mod llama;
pub mod openai;
pub mod provider;
pub mod registry;

pub use provider::{Provider, ProviderHealth, QueryRequest};
pub use registry::ProviderRegistry;
