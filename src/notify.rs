//! Change notification channels
//!
//! Every observable object owns a [`Notifier`]. Subscribers receive events
//! in emission order over an unbounded channel; dropped receivers are pruned
//! on the next emit.

use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Observable field of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParameterField {
    Supported,
    Modifiable,
    OverlayImage,
    Minimum,
    Maximum,
    Value,
    Options,
    SelectedOption,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterChange {
    pub parameter: String,
    pub field: ParameterField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RegistryEvent {
    /// The visible collection was replaced as a whole.
    CollectionChanged { count: usize },
}

pub struct Notifier<E> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<E>>>,
}

impl<E: Clone> Notifier<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, event: E) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: Clone> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

/// Drains everything currently queued on `rx`.
pub fn drain<E>(rx: &mut mpsc::UnboundedReceiver<E>) -> Vec<E> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();
        notifier.emit(1);
        notifier.emit(2);
        notifier.emit(3);
        assert_eq!(drain(&mut rx), vec![1, 2, 3]);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let notifier = Notifier::new();
        let rx = notifier.subscribe();
        let mut kept = notifier.subscribe();
        drop(rx);
        notifier.emit("x");
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(drain(&mut kept), vec!["x"]);
    }
}
