//! Session-attribution core. The router receives browser environment events,
//! closes the open session through [session::SessionTracker] and decides,
//! by querying the [oracle::BrowserOracle], whether a new one may begin.

pub mod domain;
pub mod event;
pub mod oracle;
pub mod router;
pub mod session;
