//! Web chat over the question-answering assistant: embedded UI, JSON chat
//! API, optional bearer auth, per-IP rate limiting.

mod error;
mod handlers;
mod router;
mod server;
mod sessions;

pub use error::GatewayError;
pub use server::GatewayServer;
