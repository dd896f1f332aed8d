use chrono::{Local, TimeZone};
use tracing::debug;

use crate::{
    storage::{persister::Persister, store::TimeStore},
    utils::clock::Clock,
};

use super::{
    domain::extract_domain,
    event::{BrowserEvent, IdleState},
    oracle::BrowserOracle,
    session::SessionTracker,
};

/// What an event requires of the tracker. Every event stops the open session,
/// only some allow a new one to begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Stop,
    StopThenMaybeStart,
}

/// Pure event-to-action mapping. Focus loss and leaving the active idle state
/// only ever stop, everything else re-evaluates the environment afterwards.
pub fn route(event: &BrowserEvent) -> Action {
    match event {
        BrowserEvent::TabActivated | BrowserEvent::TabUpdated => Action::StopThenMaybeStart,
        BrowserEvent::WindowFocusChanged { window_id: Some(_) } => Action::StopThenMaybeStart,
        BrowserEvent::WindowFocusChanged { window_id: None } => Action::Stop,
        BrowserEvent::IdleStateChanged {
            state: IdleState::Active,
        } => Action::StopThenMaybeStart,
        BrowserEvent::IdleStateChanged { .. } => Action::Stop,
    }
}

/// Applies routed actions: stop and persist first, then start a new session
/// only when the user is active, a window is focused and the active tab has a
/// trackable domain. Events are handled one at a time, so two domains can never
/// be tracked concurrently.
pub struct EventRouter<S, O, Tz: TimeZone = Local> {
    tracker: SessionTracker,
    oracle: O,
    persister: Persister<S, Tz>,
    clock: Box<dyn Clock>,
}

impl<S: TimeStore, O: BrowserOracle, Tz: TimeZone> EventRouter<S, O, Tz> {
    pub fn new(oracle: O, persister: Persister<S, Tz>, clock: Box<dyn Clock>) -> Self {
        Self {
            tracker: SessionTracker::new(),
            oracle,
            persister,
            clock,
        }
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub async fn handle(&mut self, event: &BrowserEvent) {
        self.flush().await;
        if route(event) == Action::StopThenMaybeStart {
            self.maybe_start();
        }
    }

    /// Stops the open session, if any, and folds it into the store.
    pub async fn flush(&mut self) {
        if let Some(closed) = self.tracker.stop(self.clock.time()) {
            self.persister.persist(closed).await;
        }
    }

    fn maybe_start(&mut self) {
        if self.oracle.idle_state() != IdleState::Active {
            debug!("User is idle or locked, tracking paused");
            return;
        }
        let Some(window) = self.oracle.focused_window() else {
            debug!("No focused window, tracking paused");
            return;
        };
        let Some(url) = self.oracle.active_tab_url(window) else {
            return;
        };
        match extract_domain(&url) {
            Some(domain) => self.tracker.start(domain, self.clock.time()),
            None => debug!("Ignoring url without a trackable domain: {url}"),
        }
    }

    #[cfg(test)]
    pub(crate) fn current_domain(&self) -> Option<&str> {
        self.tracker.current_domain()
    }
}
