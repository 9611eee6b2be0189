//! crates/emotion_diary_core/src/monitor.rs
//!
//! The activity monitor: translates raw page events into the two signal
//! classes the session store cares about. It relays, it does not decide.

use crate::page::{Listener, ListenerId, PageEvent, PageEventKind};
use crate::ports::EventTarget;
use std::sync::Arc;
use tracing::debug;

/// Page events that count as user interaction.
pub const ACTIVITY_EVENTS: [PageEventKind; 6] = [
    PageEventKind::PointerDown,
    PageEventKind::PointerMove,
    PageEventKind::KeyPress,
    PageEventKind::Scroll,
    PageEventKind::TouchStart,
    PageEventKind::Click,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    Activity,
    Visibility { hidden: bool },
    Focus { focused: bool },
}

pub type MonitorSink = Arc<dyn Fn(MonitorEvent) + Send + Sync>;

pub struct ActivityMonitor {
    target: Arc<dyn EventTarget>,
    listeners: Vec<ListenerId>,
}

impl ActivityMonitor {
    pub fn new(target: Arc<dyn EventTarget>) -> Self {
        Self {
            target,
            listeners: Vec::new(),
        }
    }

    /// Registers listeners that forward into `sink`. Any previous registration
    /// is torn down first, so attaching twice never doubles the signals.
    pub fn attach(&mut self, sink: MonitorSink) {
        self.detach();

        for kind in ACTIVITY_EVENTS {
            let sink = Arc::clone(&sink);
            self.listen(kind, Arc::new(move |_| sink(MonitorEvent::Activity)));
        }

        let visibility_sink = Arc::clone(&sink);
        self.listen(
            PageEventKind::VisibilityChange,
            Arc::new(move |event| {
                if let PageEvent::VisibilityChange { hidden } = event {
                    visibility_sink(MonitorEvent::Visibility { hidden: *hidden });
                }
            }),
        );

        let focus_sink = Arc::clone(&sink);
        self.listen(
            PageEventKind::Focus,
            Arc::new(move |_| focus_sink(MonitorEvent::Focus { focused: true })),
        );
        self.listen(
            PageEventKind::Blur,
            Arc::new(move |_| sink(MonitorEvent::Focus { focused: false })),
        );

        debug!("Activity monitor attached {} listeners", self.listeners.len());
    }

    /// Removes every listener this monitor registered.
    pub fn detach(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        for id in self.listeners.drain(..) {
            self.target.remove_listener(id);
        }
        debug!("Activity monitor detached");
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn listen(&mut self, kind: PageEventKind, listener: Listener) {
        let id = self.target.add_listener(kind, listener);
        self.listeners.push(id);
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        self.detach();
    }
}
