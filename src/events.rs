//! Score event fan-out.
//!
//! The front-end builds one [`EventPublisher`] per session and hands it to
//! the engine, which publishes a [`ScoreEvent`] whenever a collision earns
//! points. Listeners run synchronously, in registration order.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreEvent {
    pub points: u32,
}

impl ScoreEvent {
    pub fn new(points: u32) -> Self {
        Self { points }
    }
}

pub struct EventPublisher<E> {
    listeners: Vec<Box<dyn FnMut(&E)>>,
}

impl<E> EventPublisher<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn publish(&mut self, event: &E) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventPublisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
