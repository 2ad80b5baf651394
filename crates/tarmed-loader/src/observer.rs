//! Change notification.
//!
//! Each observable entity owns one [`Subject`]; observers live exactly as long
//! as the entity (or until they unsubscribe). There is no global registry.

use std::fmt;

/// Handle returned by [`Subject::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// A list of callbacks notified on every change.
pub struct Subject<E> {
    observers: Vec<(ObserverId, Callback<E>)>,
    next_id: u64,
}

impl<E> Default for Subject<E> {
    fn default() -> Self {
        Self {
            observers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> fmt::Debug for Subject<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<E> Subject<E> {
    /// Creates a subject without observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback.
    pub fn subscribe<F>(&mut self, callback: F) -> ObserverId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    /// Calls every callback in registration order.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.observers {
            callback(event);
        }
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns true if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
