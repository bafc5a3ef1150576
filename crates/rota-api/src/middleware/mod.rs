//! HTTP middleware for the duty-schedule submission pipeline.
//!
//! Provides the client principal gate that authenticates and authorizes
//! every request before the save handler runs.
pub mod auth;
