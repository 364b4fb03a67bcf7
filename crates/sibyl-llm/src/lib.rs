//! Chat and embedding provider abstraction with OpenAI and Claude backends.

pub mod any;
pub mod claude;
pub mod error;
pub mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;

pub use any::AnyProvider;
pub use claude::ClaudeProvider;
pub use error::LlmError;
pub use openai::OpenAiProvider;
pub use provider::{EmbedFuture, LlmProvider, Message, Role};
