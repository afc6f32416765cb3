//! Subscriber capability set and registry.
//!
//! A subscriber implements only the event slots it cares about; every
//! slot defaults to a no-op. Dispatch calls the matching slot and then
//! the [`RunSubscriber::on_event`] catch-all, synchronously, before the
//! next event is processed, so callbacks never run concurrently for one
//! run, so subscriber state needs no locking of its own.

use parking_lot::Mutex;
use runwire_core::RunEvent;
use serde_json::Value;
use std::sync::Arc;

/// Caller-supplied set of per-event-kind callbacks.
///
/// Ownership of subscriber state belongs to whoever registered it; the
/// client only borrows it for the duration of each callback.
#[allow(unused_variables)]
pub trait RunSubscriber: Send {
    /// Called for every event, after the specific slot.
    fn on_event(&mut self, event: &RunEvent) {}

    /// A run has started.
    fn on_run_started(&mut self, thread_id: &str, run_id: &str) {}

    /// A run has finished successfully.
    fn on_run_finished(&mut self, result: Option<&Value>) {}

    /// A run has failed. Also invoked for synthesized transport errors.
    fn on_run_error(&mut self, message: &str, code: Option<&str>) {}

    /// A named step has started.
    fn on_step_started(&mut self, step_name: &str) {}

    /// A named step has finished.
    fn on_step_finished(&mut self, step_name: &str) {}

    /// A framed message has opened.
    fn on_text_message_start(&mut self, message_id: &str, role: Option<&str>) {}

    /// A content delta arrived for a framed message.
    fn on_text_message_content(&mut self, message_id: &str, delta: &str) {}

    /// A standalone chunk arrived.
    fn on_text_message_chunk(&mut self, message_id: &str, delta: &str) {}

    /// A framed message has closed.
    fn on_text_message_end(&mut self, message_id: &str) {}

    /// An application-specific event arrived.
    fn on_custom(&mut self, name: &str, value: &Value) {}

    /// An event of a kind this build does not recognize arrived.
    fn on_raw(&mut self, data: &Value) {}
}

/// Invoke the slot matching `event` on one subscriber, then the catch-all.
fn dispatch_to(subscriber: &mut dyn RunSubscriber, event: &RunEvent) {
    match event {
        RunEvent::RunStarted {
            thread_id, run_id, ..
        } => subscriber.on_run_started(thread_id, run_id),
        RunEvent::RunFinished { result, .. } => subscriber.on_run_finished(result.as_ref()),
        RunEvent::RunError { message, code, .. } => {
            subscriber.on_run_error(message, code.as_deref())
        }
        RunEvent::StepStarted { step_name, .. } => subscriber.on_step_started(step_name),
        RunEvent::StepFinished { step_name, .. } => subscriber.on_step_finished(step_name),
        RunEvent::TextMessageStart {
            message_id, role, ..
        } => subscriber.on_text_message_start(message_id, role.as_deref()),
        RunEvent::TextMessageContent {
            message_id, delta, ..
        } => subscriber.on_text_message_content(message_id, delta),
        RunEvent::TextMessageChunk {
            message_id, delta, ..
        } => subscriber.on_text_message_chunk(message_id, delta),
        RunEvent::TextMessageEnd { message_id, .. } => {
            subscriber.on_text_message_end(message_id)
        }
        RunEvent::Custom { name, value, .. } => subscriber.on_custom(name, value),
        RunEvent::Raw { data, .. } => subscriber.on_raw(data),
    }
    subscriber.on_event(event);
}

struct Registry {
    next_id: u64,
    entries: Vec<(u64, Box<dyn RunSubscriber>)>,
}

/// Registry of subscribers sharing one event feed.
///
/// Subscribers registered after a run has started receive events from
/// that point forward only; there is no replay.
pub struct SubscriberSet {
    inner: Mutex<Registry>,
}

impl SubscriberSet {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Register a subscriber, returning its registration id.
    ///
    /// Most callers want [`SubscriberSet::subscribe`] instead, which wraps
    /// the id in an unsubscribing handle.
    pub fn register(&self, subscriber: Box<dyn RunSubscriber>) -> u64 {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, subscriber));
        id
    }

    /// Register a subscriber on a shared set; the returned handle
    /// deregisters it.
    pub fn subscribe(set: &Arc<Self>, subscriber: Box<dyn RunSubscriber>) -> Subscription {
        let id = set.register(subscriber);
        Subscription {
            id,
            set: Arc::clone(set),
        }
    }

    /// Deregister a subscriber by registration id.
    pub fn remove(&self, id: u64) {
        self.inner.lock().entries.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Fan one event out to every registered subscriber, in registration
    /// order.
    pub fn dispatch(&self, event: &RunEvent) {
        let mut registry = self.inner.lock();
        for (_, subscriber) in registry.entries.iter_mut() {
            dispatch_to(subscriber.as_mut(), event);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Check if no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`SubscriberSet::subscribe`].
pub struct Subscription {
    id: u64,
    set: Arc<SubscriberSet>,
}

impl Subscription {
    /// Deregister the subscriber this handle refers to.
    pub fn unsubscribe(self) {
        self.set.remove(self.id);
    }
}
