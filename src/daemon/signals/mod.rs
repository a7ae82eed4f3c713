//! Browser lifecycle signals as the extension forwards them, and the messages the host sends
//! back. [tabs::TabMirror] keeps enough browser state to answer "which tab is active" questions,
//! [native] moves the messages over stdio.

pub mod native;
pub mod tabs;

use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

impl WindowId {
    /// Reported by the browser when focus moved away from every browser window.
    pub const NONE: WindowId = WindowId(-1);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Tab as reported in a startup snapshot.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSnapshot {
    pub tab_id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub url: Option<Arc<str>>,
    #[serde(default)]
    pub active: bool,
}

/// Inbound message from the extension. One variant per browser event the tracker listens to.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BrowserSignal {
    /// Sent once when the extension connects: every open tab plus the focused window.
    Startup {
        tabs: Vec<TabSnapshot>,
        #[serde(default)]
        focused_window: Option<WindowId>,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        url: Option<Arc<str>>,
    },
    /// Only carries `url` when the URL is what changed.
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        window_id: Option<WindowId>,
        #[serde(default)]
        url: Option<Arc<str>>,
    },
    TabRemoved {
        tab_id: TabId,
    },
    WindowFocusChanged {
        window_id: WindowId,
    },
    IdleStateChanged {
        state: IdleState,
    },
}

/// Outbound message to the extension.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HostMessage {
    Configure { idle_detection_seconds: u32 },
}

#[cfg(test)]
mod tests {
    use super::{BrowserSignal, HostMessage, IdleState, TabId, WindowId};

    #[test]
    fn test_signals_use_extension_field_names() {
        let signal: BrowserSignal = serde_json::from_str(
            r#"{"type":"tabActivated","tabId":4,"windowId":1,"url":"https://example.com/"}"#,
        )
        .unwrap();
        assert_eq!(
            signal,
            BrowserSignal::TabActivated {
                tab_id: TabId(4),
                window_id: WindowId(1),
                url: Some("https://example.com/".into()),
            }
        );

        let signal: BrowserSignal =
            serde_json::from_str(r#"{"type":"windowFocusChanged","windowId":-1}"#).unwrap();
        assert!(matches!(
            signal,
            BrowserSignal::WindowFocusChanged { window_id } if window_id.is_none()
        ));

        let signal: BrowserSignal =
            serde_json::from_str(r#"{"type":"idleStateChanged","state":"locked"}"#).unwrap();
        assert_eq!(
            signal,
            BrowserSignal::IdleStateChanged {
                state: IdleState::Locked
            }
        );
    }

    #[test]
    fn test_unknown_signal_is_rejected() {
        assert!(serde_json::from_str::<BrowserSignal>(r#"{"type":"bookmarkAdded"}"#).is_err());
    }

    #[test]
    fn test_configure_message_shape() {
        let message = HostMessage::Configure {
            idle_detection_seconds: 60,
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"configure","idleDetectionSeconds":60}"#
        );
    }
}
