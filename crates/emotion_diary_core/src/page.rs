//! crates/emotion_diary_core/src/page.rs
//!
//! Page events and an in-process event hub standing in for the document and
//! window targets. A browser binding forwards its DOM events into `dispatch`.

use crate::ports::EventTarget;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageEventKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    VisibilityChange,
    Focus,
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
    VisibilityChange { hidden: bool },
    Focus,
    Blur,
}

impl PageEvent {
    pub fn kind(&self) -> PageEventKind {
        match self {
            PageEvent::PointerDown => PageEventKind::PointerDown,
            PageEvent::PointerMove => PageEventKind::PointerMove,
            PageEvent::KeyPress => PageEventKind::KeyPress,
            PageEvent::Scroll => PageEventKind::Scroll,
            PageEvent::TouchStart => PageEventKind::TouchStart,
            PageEvent::Click => PageEventKind::Click,
            PageEvent::VisibilityChange { .. } => PageEventKind::VisibilityChange,
            PageEvent::Focus => PageEventKind::Focus,
            PageEvent::Blur => PageEventKind::Blur,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&PageEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, PageEventKind, Listener)>,
}

/// The event hub. Listeners run outside the registry lock, so a listener may
/// add or remove listeners (including itself) while being dispatched.
#[derive(Default)]
pub struct PageEvents {
    registry: Mutex<Registry>,
    hidden: AtomicBool,
}

impl PageEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every listener registered for its kind and returns
    /// how many were invoked. Visibility changes update `is_hidden` first.
    pub fn dispatch(&self, event: PageEvent) -> usize {
        if let PageEvent::VisibilityChange { hidden } = event {
            self.hidden.store(hidden, Ordering::SeqCst);
        }

        let kind = event.kind();
        let targets: Vec<Listener> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();

        for listener in &targets {
            listener(&event);
        }
        targets.len()
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }
}

impl EventTarget for PageEvents {
    fn add_listener(&self, kind: PageEventKind, listener: Listener) -> ListenerId {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.push((id, kind, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.listeners.len();
        registry.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        registry.listeners.len() != before
    }

    fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter(hits: &Arc<AtomicUsize>) -> Listener {
        let hits = Arc::clone(hits);
        Arc::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let page = PageEvents::new();
        let hits = Arc::new(AtomicUsize::new(0));
        page.add_listener(PageEventKind::Click, counter(&hits));

        assert_eq!(page.dispatch(PageEvent::KeyPress), 0);
        assert_eq!(page.dispatch(PageEvent::Click), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_is_not_called() {
        let page = PageEvents::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = page.add_listener(PageEventKind::Scroll, counter(&hits));

        assert!(page.remove_listener(id));
        assert!(!page.remove_listener(id));
        page.dispatch(PageEvent::Scroll);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(page.listener_count(), 0);
    }

    #[test]
    fn visibility_change_updates_hidden_flag() {
        let page = PageEvents::new();
        assert!(!page.is_hidden());
        page.dispatch(PageEvent::VisibilityChange { hidden: true });
        assert!(page.is_hidden());
        page.dispatch(PageEvent::VisibilityChange { hidden: false });
        assert!(!page.is_hidden());
    }
}
