use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use uuid::Uuid;

use crate::capability::{Capabilities, Intelligence, KeyValueStore, QueryStore};
use crate::core::Payload;
use crate::core::container::{Container, ContainerInner};
use crate::core::engine;
use crate::core::error::{Error, Result};
use crate::core::events::{ContainerEvent, EventChannel, ListenerId, UnitEvent};
use crate::core::program::Program;
use crate::core::registry::ProgramRegistry;

/// Process-unique identity of a [`Unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(Uuid);

impl UnitId {
    pub fn new() -> Self {
        UnitId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An execution node holding named programs and optional capabilities.
///
/// `Unit` is a handle: clones share the same registry, event channel and
/// container membership. Equality is by [`UnitId`].
///
/// Events raised by [`register`](Unit::register),
/// [`deregister`](Unit::deregister) and [`run`](Unit::run) fire on the
/// unit's own channel first and are then mirrored onto its container, if it
/// has one.
#[derive(Clone)]
pub struct Unit {
    inner: Arc<UnitInner>,
}

struct UnitInner {
    id: UnitId,
    name: String,
    registry: ProgramRegistry,
    /// Only written by container operations.
    container: RwLock<Option<Weak<ContainerInner>>>,
    capabilities: Capabilities,
    events: EventChannel<UnitEvent>,
}

/// Builder for [`Unit`].
#[derive(Debug, Default)]
pub struct UnitBuilder {
    name: Option<String>,
    capabilities: Capabilities,
}

impl UnitBuilder {
    /// Defaults to the unit's id when not set.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn intelligence(mut self, intelligence: Arc<dyn Intelligence>) -> Self {
        self.capabilities.intelligence = Some(intelligence);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.capabilities.store = Some(store);
        self
    }

    pub fn database(mut self, database: Arc<dyn QueryStore>) -> Self {
        self.capabilities.database = Some(database);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn build(self) -> Unit {
        let id = UnitId::new();
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| id.to_string());

        log::debug!("[{}] Unit created ({})", name, id);
        Unit {
            inner: Arc::new(UnitInner {
                id,
                name,
                registry: ProgramRegistry::new(),
                container: RwLock::new(None),
                capabilities: self.capabilities,
                events: EventChannel::new(),
            }),
        }
    }
}

impl Unit {
    /// An anonymous unit with no capabilities.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    pub fn builder() -> UnitBuilder {
        UnitBuilder::default()
    }

    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.inner.capabilities
    }

    pub fn intelligence(&self) -> Option<&Arc<dyn Intelligence>> {
        self.inner.capabilities.intelligence.as_ref()
    }

    pub fn store(&self) -> Option<&Arc<dyn KeyValueStore>> {
        self.inner.capabilities.store.as_ref()
    }

    pub fn database(&self) -> Option<&Arc<dyn QueryStore>> {
        self.inner.capabilities.database.as_ref()
    }

    pub fn events(&self) -> &EventChannel<UnitEvent> {
        &self.inner.events
    }

    /// Shorthand for `self.events().on(event, listener)`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&UnitEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(event, listener)
    }

    /// The container currently holding this unit.
    pub fn container(&self) -> Option<Container> {
        self.inner
            .container
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Container::from_inner)
    }

    /// Registers `program` and returns the name it was stored under.
    pub fn register(&self, program: Program) -> Result<String> {
        let program = self.inner.registry.insert(program)?;
        let name = program.name.clone();

        log::info!("[{}] Program added: {}", self.name(), name);
        self.emit(UnitEvent::ProgramRegistered { program });
        Ok(name)
    }

    /// Removes a program. Runs already in flight keep their copy.
    pub fn deregister(&self, name: &str) -> Result<Arc<Program>> {
        let program = self.inner.registry.remove(name)?;

        log::info!("[{}] Program removed: {}", self.name(), name);
        self.emit(UnitEvent::ProgramDeregistered {
            program: Arc::clone(&program),
        });
        Ok(program)
    }

    pub fn program(&self, name: &str) -> Option<Arc<Program>> {
        self.inner.registry.get(name)
    }

    pub fn has_program(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    pub fn program_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Runs the program registered as `name` on `payload`.
    ///
    /// `run-started` fires before the first action. Each action's result
    /// becomes the next action's input and the last result is returned. The
    /// first failing action aborts the run with [`Error::ProgramExecution`].
    pub async fn run(&self, name: &str, payload: Payload) -> Result<Payload> {
        let program = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| Error::ProgramNotFound(name.to_string()))?;

        self.emit(UnitEvent::RunStarted {
            program: program.name.clone(),
            payload: payload.clone(),
        });
        log::info!("[{}] Running program {}", self.name(), name);

        match engine::execute(&program, payload, self).await {
            Ok(result) => {
                self.emit(UnitEvent::RunFinished {
                    program: program.name.clone(),
                    result: result.clone(),
                });
                Ok(result)
            }
            Err(err) => {
                log::warn!("[{}] {}", self.name(), err);
                self.emit(UnitEvent::RunFailed {
                    program: program.name.clone(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Emits on this unit, then mirrors onto the container if there is one.
    pub(crate) fn emit(&self, event: UnitEvent) {
        self.inner.events.emit(&event);
        if let Some(container) = self.container() {
            container.events().emit(&ContainerEvent::Unit {
                unit: self.clone(),
                event,
            });
        }
    }

    /// Emits on this unit only.
    pub(crate) fn notify(&self, event: UnitEvent) {
        self.inner.events.emit(&event);
    }

    /// Points this unit at `container` unless a live container already
    /// holds it, in which case that container is returned and nothing changes.
    pub(crate) fn claim(&self, container: &Container) -> Option<Container> {
        let mut slot = self
            .inner
            .container
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = slot.as_ref().and_then(Weak::upgrade) {
            return Some(Container::from_inner(current));
        }
        *slot = Some(container.downgrade());
        None
    }

    pub(crate) fn set_container(&self, container: Option<&Container>) {
        *self
            .inner
            .container
            .write()
            .unwrap_or_else(PoisonError::into_inner) = container.map(Container::downgrade);
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Unit {}

impl std::hash::Hash for Unit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("programs", &self.program_names())
            .field("capabilities", &self.inner.capabilities)
            .finish()
    }
}
