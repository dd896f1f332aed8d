use serde::{Deserialize, Serialize};

/// Number of seconds without input after which the extension reports the user
/// as idle. The extension owns idle detection and delivers the resulting state
/// changes over the pipe, the host only logs this value at startup.
pub const IDLE_THRESHOLD_SECONDS: u32 = 60;

/// Identifier of a browser window. The browser's "no window" sentinel is mapped
/// to `None` on the extension side, so ids here are always real windows.
pub type WindowId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Environment events forwarded by the extension. `TabUpdated` is only sent for
/// loads that completed in the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    TabActivated,
    TabUpdated,
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged { window_id: Option<WindowId> },
    IdleStateChanged { state: IdleState },
}

/// Environment state captured by the extension at the moment an event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSnapshot {
    pub idle_state: IdleState,
    pub focused_window: Option<WindowId>,
    pub active_tab_url: Option<String>,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        // No focused window, so nothing can be tracked before the first message.
        Self {
            idle_state: IdleState::Active,
            focused_window: None,
            active_tab_url: None,
        }
    }
}

/// One native-messaging message: the event plus the snapshot to re-evaluate
/// the environment against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event: BrowserEvent,
    pub snapshot: EnvironmentSnapshot,
}
