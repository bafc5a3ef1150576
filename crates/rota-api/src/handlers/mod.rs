//! HTTP request handlers for the rota API.
//!
//! One endpoint: duty-schedule submission. Every terminal state produces a
//! well-formed JSON body, `{"error": ...}` for rejections and
//! `{"success": true, "savedAt": ...}` on acceptance.

pub mod save;

pub use save::{save_duties, ErrorResponse, SaveResponse};
