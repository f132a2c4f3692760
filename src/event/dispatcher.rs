// ABOUTME: Synchronous publish/subscribe bus for lifecycle events.
// ABOUTME: Listeners run in descending priority order; ties keep registration order.

use super::Event;
use crate::task::{Task, TaskError};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

struct Listener {
    priority: i32,
    task: Arc<dyn Task>,
}

/// Priority-ordered event bus.
///
/// Registration happens once at startup (`&mut self`); dispatch is `&self`
/// so listeners may dispatch nested sub-events before returning. Within one
/// `dispatch` call each listener completes, including any nested dispatches
/// it performs, before the next listener starts.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<String, Vec<Listener>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("events", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the task for every event named by its subscriptions.
    pub fn register_task(&mut self, task: Arc<dyn Task>) {
        for subscription in task.subscribed_events() {
            self.subscribe(subscription.event, Arc::clone(&task), subscription.priority);
        }
    }

    /// Subscribes a task to one event with the given priority.
    pub fn subscribe(&mut self, event_name: impl Into<String>, task: Arc<dyn Task>, priority: i32) {
        let listeners = self.listeners.entry(event_name.into()).or_default();
        listeners.push(Listener { priority, task });
        // Stable sort: equal priorities keep their registration order.
        listeners.sort_by_key(|listener| Reverse(listener.priority));
    }

    /// Number of listeners registered for an event.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .get(event_name)
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }

    /// Invokes every listener subscribed to `event_name` in descending
    /// priority order, passing this dispatcher so listeners can dispatch
    /// sub-events.
    ///
    /// A listener stopping propagation halts the remaining listeners for
    /// this call only.
    ///
    /// # Errors
    ///
    /// The first listener error halts propagation immediately and is
    /// returned to the caller; the dispatcher itself raises nothing.
    pub async fn dispatch(
        &self,
        event_name: &str,
        event: &mut Event,
    ) -> Result<(), TaskError> {
        let Some(listeners) = self.listeners.get(event_name) else {
            return Ok(());
        };
        let snapshot: Vec<Arc<dyn Task>> = listeners
            .iter()
            .map(|listener| Arc::clone(&listener.task))
            .collect();

        for task in snapshot {
            if event.is_propagation_stopped() {
                break;
            }
            task.on_event(event, event_name, self).await?;
        }
        Ok(())
    }
}
