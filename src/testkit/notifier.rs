//! Notifier doubles.

use parking_lot::Mutex;

use crate::port::{Event, Notifier, UserResolutionEvent};

/// Keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Per-user resolution notices, in emission order.
    pub fn user_notices(&self) -> Vec<UserResolutionEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Event::UserResolved(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}
