//! GitHub operations gateway exposed as MCP tools over stdio.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod http;
pub mod models;
pub mod pagination;
pub mod resolver;
pub mod retry;
pub mod schema;
pub mod server;
pub mod tools;
pub mod upstream;
pub mod vcs;

pub use envelope::ResultEnvelope;
pub use error::GatewayError;
pub use handlers::Gateway;
