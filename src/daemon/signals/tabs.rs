use std::{collections::HashMap, sync::Arc};

use tracing::trace;

use super::{BrowserSignal, TabId, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub tab_id: TabId,
    pub window_id: Option<WindowId>,
    pub url: Option<Arc<str>>,
}

impl TabInfo {
    fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            window_id: None,
            url: None,
        }
    }
}

/// What the router needs to know about the browser: the URL of a tab, and which tab is active in
/// a window. Kept up to date from the same signals the router dispatches.
#[cfg_attr(test, mockall::automock)]
pub trait BrowserState {
    fn observe(&mut self, signal: &BrowserSignal);

    fn tab(&self, tab_id: TabId) -> Option<TabInfo>;

    /// Active tab of `window`, or of the last focused window when `window` is `None`.
    fn active_tab(&self, window: Option<WindowId>) -> Option<TabInfo>;
}

/// In-memory copy of the browser's tabs, built only from received signals.
#[derive(Debug, Default)]
pub struct TabMirror {
    tabs: HashMap<TabId, TabInfo>,
    active: HashMap<WindowId, TabId>,
    focused: Option<WindowId>,
}

impl TabMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    fn tab_mut(&mut self, tab_id: TabId) -> &mut TabInfo {
        self.tabs
            .entry(tab_id)
            .or_insert_with(|| TabInfo::new(tab_id))
    }
}

impl BrowserState for TabMirror {
    fn observe(&mut self, signal: &BrowserSignal) {
        match signal {
            BrowserSignal::Startup {
                tabs,
                focused_window,
            } => {
                self.tabs.clear();
                self.active.clear();
                for snapshot in tabs {
                    self.tabs.insert(
                        snapshot.tab_id,
                        TabInfo {
                            tab_id: snapshot.tab_id,
                            window_id: Some(snapshot.window_id),
                            url: snapshot.url.clone(),
                        },
                    );
                    if snapshot.active {
                        self.active.insert(snapshot.window_id, snapshot.tab_id);
                    }
                }
                self.focused = focused_window
                    .filter(|window| !window.is_none())
                    .or_else(|| tabs.iter().find(|tab| tab.active).map(|tab| tab.window_id));
            }
            BrowserSignal::TabActivated {
                tab_id,
                window_id,
                url,
            } => {
                let tab = self.tab_mut(*tab_id);
                tab.window_id = Some(*window_id);
                if url.is_some() {
                    tab.url = url.clone();
                }
                self.active.insert(*window_id, *tab_id);
                self.focused.get_or_insert(*window_id);
            }
            BrowserSignal::TabUpdated {
                tab_id,
                window_id,
                url,
            } => {
                let tab = self.tab_mut(*tab_id);
                if window_id.is_some() {
                    tab.window_id = *window_id;
                }
                if url.is_some() {
                    tab.url = url.clone();
                }
            }
            BrowserSignal::TabRemoved { tab_id } => {
                self.tabs.remove(tab_id);
                self.active.retain(|_, active| *active != *tab_id);
            }
            // Losing focus keeps the last focused window as the "current" one, which is what the
            // browser reports as current as well.
            BrowserSignal::WindowFocusChanged { window_id } if !window_id.is_none() => {
                self.focused = Some(*window_id);
            }
            BrowserSignal::WindowFocusChanged { .. } | BrowserSignal::IdleStateChanged { .. } => {}
        }
        trace!(
            "Mirror holds {} tabs, focused window {:?}",
            self.tabs.len(),
            self.focused
        );
    }

    fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.tabs.get(&tab_id).cloned()
    }

    fn active_tab(&self, window: Option<WindowId>) -> Option<TabInfo> {
        let window = window.or(self.focused)?;
        self.active
            .get(&window)
            .and_then(|tab_id| self.tabs.get(tab_id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use crate::daemon::signals::{BrowserSignal, TabId, TabSnapshot, WindowId};

    use super::{BrowserState, TabMirror};

    fn snapshot(tab: i64, window: i64, url: &str, active: bool) -> TabSnapshot {
        TabSnapshot {
            tab_id: TabId(tab),
            window_id: WindowId(window),
            url: Some(url.into()),
            active,
        }
    }

    #[test]
    fn test_startup_seeds_active_tabs() {
        let mut mirror = TabMirror::new();
        mirror.observe(&BrowserSignal::Startup {
            tabs: vec![
                snapshot(1, 10, "https://a.com/", true),
                snapshot(2, 10, "https://b.com/", false),
                snapshot(3, 20, "https://c.com/", true),
            ],
            focused_window: Some(WindowId(20)),
        });

        assert_eq!(mirror.active_tab(None).unwrap().tab_id, TabId(3));
        assert_eq!(mirror.active_tab(Some(WindowId(10))).unwrap().tab_id, TabId(1));
        assert_eq!(
            mirror.tab(TabId(2)).unwrap().url.as_deref(),
            Some("https://b.com/")
        );
    }

    #[test]
    fn test_activation_and_updates() {
        let mut mirror = TabMirror::new();
        mirror.observe(&BrowserSignal::TabActivated {
            tab_id: TabId(5),
            window_id: WindowId(1),
            url: None,
        });
        assert_eq!(mirror.focused_window(), Some(WindowId(1)));
        assert_eq!(mirror.active_tab(None).unwrap().url, None);

        mirror.observe(&BrowserSignal::TabUpdated {
            tab_id: TabId(5),
            window_id: None,
            url: Some("https://news.example/".into()),
        });
        assert_eq!(
            mirror.active_tab(None).unwrap().url.as_deref(),
            Some("https://news.example/")
        );

        // Activation without a URL keeps the URL that is already known.
        mirror.observe(&BrowserSignal::TabActivated {
            tab_id: TabId(5),
            window_id: WindowId(1),
            url: None,
        });
        assert!(mirror.tab(TabId(5)).unwrap().url.is_some());
    }

    #[test]
    fn test_focus_loss_keeps_last_window() {
        let mut mirror = TabMirror::new();
        mirror.observe(&BrowserSignal::WindowFocusChanged {
            window_id: WindowId(7),
        });
        mirror.observe(&BrowserSignal::WindowFocusChanged {
            window_id: WindowId::NONE,
        });
        assert_eq!(mirror.focused_window(), Some(WindowId(7)));
    }

    #[test]
    fn test_removed_tab_is_forgotten() {
        let mut mirror = TabMirror::new();
        mirror.observe(&BrowserSignal::TabActivated {
            tab_id: TabId(1),
            window_id: WindowId(1),
            url: Some("https://a.com/".into()),
        });
        mirror.observe(&BrowserSignal::TabRemoved { tab_id: TabId(1) });

        assert_eq!(mirror.tab(TabId(1)), None);
        assert_eq!(mirror.active_tab(None), None);
    }
}
