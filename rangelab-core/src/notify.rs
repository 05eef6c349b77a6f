//! Keyed listener registry for fan-out of update notifications.
use std::rc::Rc;

use crate::record::ResourceRecord;
use crate::topic::Topic;

/// Callback invoked with the topic and the records that changed.
pub type UpdateListener = dyn Fn(Topic, &[ResourceRecord]);

/// Registry of named listeners, notified synchronously in registration order.
///
/// Re-registering a key replaces the callback in place, keeping the key's
/// original position; removal and re-addition moves it to the end.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Vec<(String, Rc<UpdateListener>)>,
}

impl ListenerRegistry {
    pub fn add(&mut self, key: &str, listener: Rc<UpdateListener>) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = listener,
            None => self.entries.push((key.to_string(), listener)),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    /// Clone out the callbacks so they can be invoked after any state borrow
    /// is released; a listener may re-enter the engine's getters.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<UpdateListener>> {
        self.entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
