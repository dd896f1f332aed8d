use chrono::{DateTime, Utc};
use tracing::{debug, error};

/// The interval currently being attributed to a domain. At most one exists in
/// the whole process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub domain: String,
    pub start: DateTime<Utc>,
}

/// A finished session, produced once by [SessionTracker::stop] and consumed
/// once by the persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub domain: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Owns the single open session. The tracker clears its state *before* the
/// closed session is handed to persistence, so a failed write can lose that one
/// session but can never double-flush it.
#[derive(Debug, Default)]
pub struct SessionTracker {
    current: Option<Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session. The router stops before it starts, so an already open
    /// session here is a routing bug.
    pub fn start(&mut self, domain: String, now: DateTime<Utc>) {
        debug_assert!(!domain.is_empty(), "session domain must not be empty");
        debug_assert!(
            self.current.is_none(),
            "start called while a session is open"
        );
        if let Some(open) = self.current.take() {
            error!(
                "Discarding open session for {} started at {}",
                open.domain, open.start
            );
        }
        debug!("Started tracking {domain}");
        self.current = Some(Session { domain, start: now });
    }

    /// Closes the open session, if any. Calling this with nothing open is a
    /// no-op.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<ClosedSession> {
        let session = self.current.take()?;
        debug!("Stopped tracking {}", session.domain);
        Some(ClosedSession {
            domain: session.domain,
            start: session.start,
            end: now,
        })
    }

    pub fn current_domain(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.domain.as_str())
    }
}
