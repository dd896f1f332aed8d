use super::event::{EnvironmentSnapshot, IdleState, WindowId};

/// Intended to serve as the contract for querying the browser environment after
/// an event: idle state, window focus and the active tab's url.
#[cfg_attr(test, mockall::automock)]
pub trait BrowserOracle {
    fn idle_state(&mut self) -> IdleState;

    fn focused_window(&mut self) -> Option<WindowId>;

    fn active_tab_url(&mut self, window: WindowId) -> Option<String>;
}

/// Oracle backed by the last [EnvironmentSnapshot] received over the message
/// pipe. The extension answers the environment queries at event time, this
/// just replays its answers.
#[derive(Default)]
pub struct SnapshotOracle {
    snapshot: EnvironmentSnapshot,
}

impl SnapshotOracle {
    pub fn apply(&mut self, snapshot: EnvironmentSnapshot) {
        self.snapshot = snapshot;
    }
}

impl BrowserOracle for SnapshotOracle {
    fn idle_state(&mut self) -> IdleState {
        self.snapshot.idle_state
    }

    fn focused_window(&mut self) -> Option<WindowId> {
        self.snapshot.focused_window
    }

    fn active_tab_url(&mut self, window: WindowId) -> Option<String> {
        if self.snapshot.focused_window != Some(window) {
            return None;
        }
        self.snapshot.active_tab_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_oracle_answers_for_the_focused_window_only() {
        let mut oracle = SnapshotOracle::default();
        oracle.apply(EnvironmentSnapshot {
            idle_state: IdleState::Active,
            focused_window: Some(7),
            active_tab_url: Some("https://example.com/".into()),
        });

        assert_eq!(oracle.idle_state(), IdleState::Active);
        assert_eq!(oracle.focused_window(), Some(7));
        assert_eq!(
            oracle.active_tab_url(7).as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(oracle.active_tab_url(8), None);
    }

    #[test]
    fn fresh_oracle_has_no_focused_window() {
        let mut oracle = SnapshotOracle::default();
        assert_eq!(oracle.focused_window(), None);
    }
}
