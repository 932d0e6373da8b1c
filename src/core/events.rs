//! Publish/subscribe channels for units and containers.
//!
//! Every [`Unit`] and [`Container`] owns an [`EventChannel`]. Listeners are
//! keyed by event name and called synchronously, in registration order, on the
//! emitting thread. A listener that panics is caught and logged; the operation
//! that emitted the event carries on as if nothing happened.
//!
//! Unit events are mirrored onto the unit's container (if any) wrapped in
//! [`ContainerEvent::Unit`], under the same event name. Sibling and demolish
//! notifications stay on the member's own channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::Payload;
use crate::core::container::Container;
use crate::core::program::Program;
use crate::core::unit::Unit;

/// Anything that can travel through an [`EventChannel`].
pub trait Event: Send + Sync + 'static {
    /// The name listeners subscribe to.
    fn name(&self) -> &'static str;
}

/// A boxed event listener.
pub type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned by [`EventChannel::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription<E> {
    id: ListenerId,
    /// `None` subscribes to every event.
    event: Option<String>,
    listener: Listener<E>,
}

/// A multi-subscriber channel keyed by event name.
pub struct EventChannel<E> {
    subscriptions: RwLock<Vec<Subscription<E>>>,
    next_id: AtomicU64,
}

impl<E: Event> EventChannel<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Subscribes `listener` to events named `event`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(Some(event.into()), Arc::new(listener))
    }

    /// Subscribes `listener` to every event on this channel.
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe(None, Arc::new(listener))
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of listeners that would receive an event named `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.matches(event))
            .count()
    }

    /// Delivers `event` to every matching listener and returns how many ran
    /// to completion.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe,
    /// unsubscribe or emit from inside the callback.
    pub fn emit(&self, event: &E) -> usize {
        let name = event.name();
        let listeners: Vec<Listener<E>> = self
            .subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.matches(name))
            .map(|s| Arc::clone(&s.listener))
            .collect();

        let mut delivered = 0;
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    log::error!("Listener for event '{}' panicked: {}", name, reason);
                }
            }
        }
        delivered
    }

    fn subscribe(&self, event: Option<String>, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                event,
                listener,
            });
        id
    }
}

impl<E: Event> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Subscription<E> {
    fn matches(&self, name: &str) -> bool {
        self.event.as_deref().is_none_or(|e| e == name)
    }
}

/// Events a [`Unit`] emits on its own channel.
#[derive(Debug, Clone)]
pub enum UnitEvent {
    /// A run is about to execute its first action.
    RunStarted { program: String, payload: Payload },
    RunFinished { program: String, result: Payload },
    RunFailed { program: String, error: String },
    ProgramRegistered { program: Arc<Program> },
    ProgramDeregistered { program: Arc<Program> },
    /// Another unit is joining the container this unit belongs to.
    SiblingAdded { sibling: Unit, container: Container },
    /// Another unit is leaving the container this unit belongs to.
    SiblingRemoved { sibling: Unit, container: Container },
    /// The container holding this unit is being demolished.
    Demolished { container: Container },
}

impl UnitEvent {
    pub const RUN_STARTED: &'static str = "run-started";
    pub const RUN_FINISHED: &'static str = "run-finished";
    pub const RUN_FAILED: &'static str = "run-failed";
    pub const PROGRAM_REGISTERED: &'static str = "program-registered";
    pub const PROGRAM_DEREGISTERED: &'static str = "program-deregistered";
    pub const SIBLING_ADDED: &'static str = "sibling-added";
    pub const SIBLING_REMOVED: &'static str = "sibling-removed";
    pub const DEMOLISHED: &'static str = "demolished";
}

impl Event for UnitEvent {
    fn name(&self) -> &'static str {
        match self {
            UnitEvent::RunStarted { .. } => Self::RUN_STARTED,
            UnitEvent::RunFinished { .. } => Self::RUN_FINISHED,
            UnitEvent::RunFailed { .. } => Self::RUN_FAILED,
            UnitEvent::ProgramRegistered { .. } => Self::PROGRAM_REGISTERED,
            UnitEvent::ProgramDeregistered { .. } => Self::PROGRAM_DEREGISTERED,
            UnitEvent::SiblingAdded { .. } => Self::SIBLING_ADDED,
            UnitEvent::SiblingRemoved { .. } => Self::SIBLING_REMOVED,
            UnitEvent::Demolished { .. } => Self::DEMOLISHED,
        }
    }
}

/// Events a [`Container`] emits on its own channel.
#[derive(Debug, Clone)]
pub enum ContainerEvent {
    /// A member's event, mirrored with the member attached.
    Unit { unit: Unit, event: UnitEvent },
    Added { unit: Unit },
    Removed { unit: Unit },
    Demolished,
}

impl ContainerEvent {
    pub const ADD: &'static str = "add";
    pub const REMOVE: &'static str = "remove";
    pub const DEMOLISH: &'static str = "demolish";

    /// The unit this event is about, if any.
    pub fn unit(&self) -> Option<&Unit> {
        match self {
            ContainerEvent::Unit { unit, .. }
            | ContainerEvent::Added { unit }
            | ContainerEvent::Removed { unit } => Some(unit),
            ContainerEvent::Demolished => None,
        }
    }
}

impl Event for ContainerEvent {
    fn name(&self) -> &'static str {
        match self {
            ContainerEvent::Unit { event, .. } => event.name(),
            ContainerEvent::Added { .. } => Self::ADD,
            ContainerEvent::Removed { .. } => Self::REMOVE,
            ContainerEvent::Demolished => Self::DEMOLISH,
        }
    }
}
