// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications emitted by the animation module.
//!
//! A [`Signal`] invokes its subscribers immediately and also queues the event
//! so a frame-driven view can drain it with [`Signal::take_events`].

use crate::anim_item::NodeAnimId;
use compositor_graph::NodeId;

/// Maximum queued events before the oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

type Callback<E> = Box<dyn FnMut(&E)>;

/// One-way notification channel
pub struct Signal<E> {
    subscribers: Vec<Callback<E>>,
    queue: Vec<E>,
}

impl<E: Clone> Signal<E> {
    /// Create a signal with no subscriber
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            queue: Vec::new(),
        }
    }

    /// Register a callback, invoked on every emit in subscription order
    pub fn subscribe(&mut self, callback: impl FnMut(&E) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    /// Invoke subscribers and queue the event
    pub fn emit(&mut self, event: E) {
        for callback in &mut self.subscribers {
            callback(&event);
        }
        if self.queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = self.queue.len() / 2;
            tracing::warn!("Event queue full ({} events), evicting oldest {}", self.queue.len(), evict_count);
            self.queue.drain(0..evict_count);
        }
        self.queue.push(event);
    }

    /// Get queued events and clear them
    pub fn take_events(&mut self) -> Vec<E> {
        std::mem::take(&mut self.queue)
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<E: Clone> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscribers.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

/// Notification consumed by the views
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationModuleEvent {
    /// A node entered the animation model
    NodeAdded {
        /// Animation entry
        anim: NodeAnimId,
        /// Graph node
        node: NodeId,
    },
    /// A node is about to leave the animation model
    NodeAboutToBeRemoved {
        /// Animation entry
        anim: NodeAnimId,
        /// Graph node
        node: NodeId,
    },
    /// The selection changed
    SelectionChanged {
        /// Whether the views should propagate the change to child items
        recurse: bool,
    },
    /// Curves, knob values or frame ranges changed
    ModelChanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_calls_subscribers_and_queues() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::new();
        let sink = Rc::clone(&seen);
        signal.subscribe(move |e: &AnimationModuleEvent| sink.borrow_mut().push(e.clone()));

        signal.emit(AnimationModuleEvent::ModelChanged);
        signal.emit(AnimationModuleEvent::SelectionChanged { recurse: true });

        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(signal.pending(), 2);
        let drained = signal.take_events();
        assert_eq!(drained[1], AnimationModuleEvent::SelectionChanged { recurse: true });
        assert_eq!(signal.pending(), 0);
    }

    #[test]
    fn test_queue_eviction() {
        let mut signal = Signal::new();
        for _ in 0..MAX_QUEUE_SIZE + 1 {
            signal.emit(AnimationModuleEvent::ModelChanged);
        }
        assert_eq!(signal.pending(), MAX_QUEUE_SIZE / 2 + 1);
    }
}
