//! Attributes browsing time to the domain of the active, focused, non-idle tab.
//! The daemon acts as a native-messaging host fed by a browser extension, folds
//! closed sessions into week-keyed record files, and the cli renders the stored
//! data back out (daily lists, weekly breakdowns, heatmap levels, backups).
//!

pub mod cli;
pub mod daemon;
pub mod storage;
pub mod tracker;
pub mod utils;
