use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::core::events::{ContainerEvent, EventChannel, ListenerId, UnitEvent};
use crate::core::unit::{Unit, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(Uuid);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An ordered group of [`Unit`]s with unique ids and names.
///
/// The container is the composition root: it mirrors every member's run and
/// registry events on its own channel (see [`ContainerEvent::Unit`]) and tells
/// members when siblings join or leave.
///
/// Members only hold a weak reference back to their container, so dropping
/// the last `Container` handle detaches them.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    id: ContainerId,
    name: String,
    membership: RwLock<Membership>,
    events: EventChannel<ContainerEvent>,
}

#[derive(Default)]
struct Membership {
    units: Vec<Unit>,
    /// Reserved by an `add` whose sibling notifications are still running.
    joining: Vec<Unit>,
    /// Reserved by a `remove` whose sibling notifications are still running.
    leaving: Vec<UnitId>,
}

impl Container {
    pub fn new() -> Self {
        let id = ContainerId(Uuid::new_v4());
        Self::create(id, id.to_string())
    }

    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            return Self::new();
        }
        Self::create(ContainerId(Uuid::new_v4()), name)
    }

    /// A container holding `units`, added in order through [`Container::add`].
    pub fn with_units(
        name: impl Into<String>,
        units: impl IntoIterator<Item = Unit>,
    ) -> Result<Self> {
        let container = Self::named(name);
        for unit in units {
            container.add(&unit)?;
        }
        Ok(container)
    }

    fn create(id: ContainerId, name: String) -> Self {
        log::debug!("[{}] Container created ({})", name, id);
        Container {
            inner: Arc::new(ContainerInner {
                id,
                name,
                membership: RwLock::new(Membership::default()),
                events: EventChannel::new(),
            }),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn events(&self) -> &EventChannel<ContainerEvent> {
        &self.inner.events
    }

    /// Shorthand for `self.events().on(event, listener)`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&ContainerEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(event, listener)
    }

    /// Adds `unit` as the last member.
    ///
    /// Existing members receive `sibling-added` before the unit is appended,
    /// so their listeners still see the old membership. The container's `add`
    /// event fires last.
    ///
    /// The unit's id and name are reserved before any listener runs, so a
    /// conflicting `add` made meanwhile (from a listener or another thread)
    /// fails with [`Error::DuplicateMember`].
    pub fn add(&self, unit: &Unit) -> Result<()> {
        let siblings = {
            let mut membership = self.membership_mut();
            if membership
                .units
                .iter()
                .chain(&membership.joining)
                .any(|m| m.id() == unit.id() || m.name() == unit.name())
            {
                return Err(Error::DuplicateMember {
                    id: unit.id(),
                    name: unit.name().to_string(),
                    container: self.name().to_string(),
                });
            }
            if let Some(other) = unit.claim(self) {
                return Err(Error::MemberOfAnotherContainer {
                    id: unit.id(),
                    name: unit.name().to_string(),
                    container: other.name().to_string(),
                });
            }
            membership.joining.push(unit.clone());
            membership.units.clone()
        };

        for sibling in &siblings {
            sibling.notify(UnitEvent::SiblingAdded {
                sibling: unit.clone(),
                container: self.clone(),
            });
        }
        {
            let mut membership = self.membership_mut();
            membership.joining.retain(|m| m.id() != unit.id());
            membership.units.push(unit.clone());
        }

        self.inner.events.emit(&ContainerEvent::Added { unit: unit.clone() });
        log::debug!("[{}] Added unit: {}", self.name(), unit.name());
        Ok(())
    }

    /// Removes `unit`.
    ///
    /// The unit is detached first, then the remaining members receive
    /// `sibling-removed` while the unit is still listed. The container's
    /// `remove` event fires after it is gone. A unit already being removed
    /// counts as absent.
    pub fn remove(&self, unit: &Unit) -> Result<()> {
        let siblings: Vec<Unit> = {
            let mut membership = self.membership_mut();
            if membership.leaving.contains(&unit.id())
                || !membership.units.iter().any(|m| m.id() == unit.id())
            {
                return Err(Error::MemberNotFound {
                    id: unit.id(),
                    name: unit.name().to_string(),
                    container: self.name().to_string(),
                });
            }
            membership.leaving.push(unit.id());
            membership
                .units
                .iter()
                .filter(|m| m.id() != unit.id())
                .cloned()
                .collect()
        };

        unit.set_container(None);
        for sibling in &siblings {
            sibling.notify(UnitEvent::SiblingRemoved {
                sibling: unit.clone(),
                container: self.clone(),
            });
        }
        {
            let mut membership = self.membership_mut();
            membership.units.retain(|m| m.id() != unit.id());
            membership.leaving.retain(|id| *id != unit.id());
        }

        self.inner.events.emit(&ContainerEvent::Removed { unit: unit.clone() });
        log::debug!("[{}] Removed unit: {}", self.name(), unit.name());
        Ok(())
    }

    pub fn get(&self, id: UnitId) -> Option<Unit> {
        self.membership().units.iter().find(|m| m.id() == id).cloned()
    }

    pub fn get_by_name(&self, name: &str) -> Option<Unit> {
        self.membership().units.iter().find(|m| m.name() == name).cloned()
    }

    pub fn contains(&self, unit: &Unit) -> bool {
        self.membership().units.iter().any(|m| m.id() == unit.id())
    }

    /// A snapshot of the members, in insertion order.
    pub fn units(&self) -> Vec<Unit> {
        self.membership().units.clone()
    }

    pub fn len(&self) -> usize {
        self.membership().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.membership().units.is_empty()
    }

    /// Detaches every member and empties the container.
    ///
    /// Each member gets `demolished` on its own channel (not mirrored back
    /// here). The units themselves are left intact.
    pub fn demolish(&self) {
        for unit in self.units() {
            unit.notify(UnitEvent::Demolished {
                container: self.clone(),
            });
            unit.set_container(None);
        }

        // Units added by a listener during the loop are detached too.
        let stragglers = std::mem::take(&mut self.membership_mut().units);
        for unit in stragglers {
            unit.set_container(None);
        }

        self.inner.events.emit(&ContainerEvent::Demolished);
        log::debug!("[{}] Demolished container", self.name());
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Container { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerInner> {
        Arc::downgrade(&self.inner)
    }

    fn membership(&self) -> RwLockReadGuard<'_, Membership> {
        self.inner
            .membership
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn membership_mut(&self) -> RwLockWriteGuard<'_, Membership> {
        self.inner
            .membership
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<String> = self
            .membership()
            .units
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("members", &members)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_add_and_get() {
        let container = Container::named("site");
        let unit = Unit::named("a");

        container.add(&unit).unwrap();

        assert_eq!(container.len(), 1);
        assert_eq!(container.get(unit.id()), Some(unit.clone()));
        assert_eq!(container.get_by_name("a"), Some(unit.clone()));
        assert_eq!(unit.container(), Some(container.clone()));
        assert!(container.get(Unit::new().id()).is_none());
    }

    #[test]
    fn test_add_rejects_duplicate_id_and_name() {
        let container = Container::new();
        let first = Unit::named("twin");
        container.add(&first).unwrap();

        let same_name = Unit::named("twin");
        assert!(matches!(
            container.add(&same_name),
            Err(Error::DuplicateMember { .. })
        ));
        assert!(matches!(
            container.add(&first),
            Err(Error::DuplicateMember { .. })
        ));
        assert_eq!(container.len(), 1);
        assert!(same_name.container().is_none());
    }

    #[test]
    fn test_add_rejects_member_of_another_container() {
        let first = Container::named("first");
        let second = Container::named("second");
        let unit = Unit::named("u");
        first.add(&unit).unwrap();

        match second.add(&unit) {
            Err(Error::MemberOfAnotherContainer { container, .. }) => {
                assert_eq!(container, "first")
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(second.is_empty());
        assert_eq!(unit.container(), Some(first));
    }

    #[test]
    fn test_siblings_see_membership_before_join() {
        let container = Container::new();
        let existing = Unit::named("existing");
        container.add(&existing).unwrap();

        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);
        existing.on(UnitEvent::SIBLING_ADDED, move |e| {
            if let UnitEvent::SiblingAdded { sibling, container } = e {
                *sink.lock().unwrap() = Some((
                    sibling.name().to_string(),
                    container.len(),
                    sibling.container().is_some(),
                ));
            }
        });

        container.add(&Unit::named("newcomer")).unwrap();

        assert_eq!(
            *observed.lock().unwrap(),
            Some(("newcomer".to_string(), 1, true))
        );
        assert_eq!(container.len(), 2);
    }

    #[test]
    fn test_remaining_siblings_see_membership_before_removal() {
        let leaving = Unit::named("leaving");
        let staying = Unit::named("staying");
        let container = Container::with_units("site", [leaving.clone(), staying.clone()]).unwrap();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        staying.on(UnitEvent::SIBLING_REMOVED, move |e| {
            if let UnitEvent::SiblingRemoved { sibling, container } = e {
                sink.lock().unwrap().push((
                    sibling.name().to_string(),
                    container.len(),
                    sibling.container().is_none(),
                ));
            }
        });
        let self_notified = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&self_notified);
        leaving.on(UnitEvent::SIBLING_REMOVED, move |_| *flag.lock().unwrap() = true);

        container.remove(&leaving).unwrap();

        assert_eq!(
            *observed.lock().unwrap(),
            vec![("leaving".to_string(), 2, true)]
        );
        assert!(!*self_notified.lock().unwrap());
        assert_eq!(container.units(), vec![staying]);
        assert!(leaving.container().is_none());
    }

    #[test]
    fn test_remove_missing_member() {
        let container = Container::new();
        container.add(&Unit::named("a")).unwrap();

        assert!(matches!(
            container.remove(&Unit::named("a")),
            Err(Error::MemberNotFound { .. })
        ));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_container_events_order() {
        let container = Container::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        container
            .events()
            .on_any(move |e| sink.lock().unwrap().push(crate::core::events::Event::name(e)));

        let unit = Unit::named("u");
        container.add(&unit).unwrap();
        container.remove(&unit).unwrap();
        container.demolish();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ContainerEvent::ADD,
                ContainerEvent::REMOVE,
                ContainerEvent::DEMOLISH
            ]
        );
    }

    #[test]
    fn test_demolish_detaches_in_order() {
        let units: Vec<Unit> = ["a", "b", "c"].into_iter().map(Unit::named).collect();
        let container = Container::with_units("site", units.clone()).unwrap();

        let order = Arc::new(Mutex::new(Vec::new()));
        for unit in &units {
            let order = Arc::clone(&order);
            let name = unit.name().to_string();
            unit.on(UnitEvent::DEMOLISHED, move |_| order.lock().unwrap().push(name.clone()));
        }
        let mirrored = Arc::new(Mutex::new(0));
        let count = Arc::clone(&mirrored);
        container.on(UnitEvent::DEMOLISHED, move |_| *count.lock().unwrap() += 1);

        container.demolish();

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(*mirrored.lock().unwrap(), 0);
        assert!(container.is_empty());
        assert!(units.iter().all(|u| u.container().is_none()));
    }

    #[test]
    fn test_dropping_container_detaches_members() {
        let unit = Unit::named("orphan");
        {
            let container = Container::new();
            container.add(&unit).unwrap();
            assert!(unit.container().is_some());
        }
        assert!(unit.container().is_none());
    }

    #[test]
    fn test_empty_name_falls_back_to_id() {
        let container = Container::named("");
        assert_eq!(container.name(), container.id().to_string());
    }
}
