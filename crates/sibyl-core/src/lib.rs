//! Configuration, credentials, and the question-answering orchestrator.

pub mod assistant;
pub mod config;
pub mod provider;
pub mod secrets;
pub mod session;

pub use assistant::{Answer, AskError, Assistant, AssistantOptions};
pub use config::{Config, ProviderKind};
pub use provider::resolve_provider;
pub use secrets::{ResolvedSecrets, Secret};
pub use session::Session;
