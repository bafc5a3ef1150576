//! Core domain types for the duty-schedule submission service.
//!
//! Provides the client principal model and decoder, duty batch validation,
//! the persisted schedule entry, and the storage and clock seams. The API
//! crate depends on these foundational types; no HTTP concerns live here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod principal;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use models::{BatchError, Duty, DutyBatch, ScheduleEntry, SCHEDULE_PARTITION};
pub use principal::{Claim, ClientPrincipal};
pub use storage::{PgScheduleStore, ScheduleStore};
pub use time::{Clock, RealClock, TestClock};
