//! Storage is organized through [week_store::WeekStore].
//! The basic idea is:
//!  - There is a directory with one json record file per ISO week.
//!  - A record maps local date keys to per-domain accumulated milliseconds.
//!  - Values only ever grow, through additive merges under an exclusive
//!    file lock.

pub mod keys;
pub mod persister;
pub mod reader;
pub mod store;
pub mod week_store;
