//! Stratus SSO authorization server.
//!
//! Wires the authorization core (`stratus-auth`) and the in-memory storage
//! backend (`stratus-store-memory`) into a runnable axum server: config
//! loading, tracing init, seed data, and routing.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod server;

pub use bootstrap::{AppState, build_state};
pub use config::{ConfigError, ServerConfig, load_config};
pub use server::{StratusServer, build_app};
