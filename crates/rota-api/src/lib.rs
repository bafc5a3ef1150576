//! Rota HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use config::Config;
pub use server::{create_router, start_server, AppState};
