//! Units composed into containers: membership rules and event mirroring.

use cairn::prelude::*;
use cairn::Error;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn echo_unit(name: &str) -> Unit {
    let unit = Unit::named(name);
    unit.register(Program::new("echo").step(Step::new("echo").action(Action::sync(
        "echo",
        |p, _| Ok(p),
    ))))
    .unwrap();
    unit
}

fn collect(container: &Container, event: &'static str) -> Arc<Mutex<Vec<ContainerEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    container.on(event, move |e| sink.lock().unwrap().push(e.clone()));
    seen
}

#[test]
fn test_same_name_is_rejected_after_first_add() {
    let container = Container::named("site");
    let first = Unit::named("worker");
    let second = Unit::named("worker");
    assert_ne!(first.id(), second.id());

    container.add(&first).unwrap();
    assert!(matches!(
        container.add(&second),
        Err(Error::DuplicateMember { .. })
    ));
    assert_eq!(container.len(), 1);
    assert_eq!(container.units(), vec![first]);
}

#[tokio::test]
async fn test_run_is_mirrored_exactly_once() {
    let container = Container::named("site");
    let unit = echo_unit("runner");
    let bystander = echo_unit("bystander");
    container.add(&unit).unwrap();
    container.add(&bystander).unwrap();

    let started = collect(&container, UnitEvent::RUN_STARTED);
    unit.run("echo", json!({ "n": 1 })).await.unwrap();

    let started = started.lock().unwrap();
    assert_eq!(started.len(), 1);
    match &started[0] {
        ContainerEvent::Unit {
            unit: source,
            event: UnitEvent::RunStarted { program, payload },
        } => {
            assert_eq!(source, &unit);
            assert_eq!(source.name(), "runner");
            assert_eq!(program, "echo");
            assert_eq!(payload, &json!({ "n": 1 }));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_unit_event_fires_locally_before_mirror() {
    let container = Container::new();
    let unit = echo_unit("u");
    container.add(&unit).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let local = Arc::clone(&order);
    unit.on(UnitEvent::RUN_STARTED, move |_| local.lock().unwrap().push("unit"));
    let mirrored = Arc::clone(&order);
    container.on(UnitEvent::RUN_STARTED, move |_| {
        mirrored.lock().unwrap().push("container")
    });

    unit.run("echo", json!(null)).await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["unit", "container"]);
}

#[tokio::test]
async fn test_registry_and_failure_events_are_mirrored() {
    let container = Container::new();
    let unit = Unit::named("u");
    container.add(&unit).unwrap();

    let registered = collect(&container, UnitEvent::PROGRAM_REGISTERED);
    let deregistered = collect(&container, UnitEvent::PROGRAM_DEREGISTERED);
    let failed = collect(&container, UnitEvent::RUN_FAILED);

    unit.register(Program::new("boom").step(
        Step::new("s").action(Action::sync("fail", |_, _| Err("kaboom".into()))),
    ))
    .unwrap();
    unit.run("boom", json!(null)).await.unwrap_err();
    unit.deregister("boom").unwrap();

    assert_eq!(registered.lock().unwrap().len(), 1);
    assert_eq!(deregistered.lock().unwrap().len(), 1);
    match &failed.lock().unwrap()[0] {
        ContainerEvent::Unit {
            event: UnitEvent::RunFailed { error, .. },
            ..
        } => assert!(error.contains("kaboom")),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_no_mirroring_outside_a_container() {
    let container = Container::new();
    let unit = echo_unit("u");
    let started = collect(&container, UnitEvent::RUN_STARTED);

    unit.run("echo", json!(1)).await.unwrap();
    container.add(&unit).unwrap();
    container.remove(&unit).unwrap();
    unit.run("echo", json!(2)).await.unwrap();

    assert!(started.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_panicking_container_listener_does_not_break_run() {
    let container = Container::new();
    let unit = echo_unit("u");
    container.add(&unit).unwrap();
    container.on(UnitEvent::RUN_STARTED, |_| panic!("observer crashed"));

    assert_eq!(unit.run("echo", json!("ok")).await.unwrap(), json!("ok"));
}

#[test]
fn test_sibling_notifications() {
    let container = Container::new();
    let a = Unit::named("a");
    let b = Unit::named("b");
    container.add(&a).unwrap();

    let joined = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&joined);
    a.on(UnitEvent::SIBLING_ADDED, move |e| {
        if let UnitEvent::SiblingAdded { sibling, .. } = e {
            sink.lock().unwrap().push(sibling.name().to_string());
        }
    });
    let left = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&left);
    a.on(UnitEvent::SIBLING_REMOVED, move |e| {
        if let UnitEvent::SiblingRemoved { sibling, .. } = e {
            sink.lock().unwrap().push(sibling.name().to_string());
        }
    });
    let mirrored_siblings = collect(&container, UnitEvent::SIBLING_ADDED);

    container.add(&b).unwrap();
    container.remove(&b).unwrap();

    assert_eq!(*joined.lock().unwrap(), vec!["b"]);
    assert_eq!(*left.lock().unwrap(), vec!["b"]);
    assert!(mirrored_siblings.lock().unwrap().is_empty());
}

#[test]
fn test_demolish_zero_one_and_many() {
    for size in [0usize, 1, 5] {
        let units: Vec<Unit> = (0..size).map(|i| Unit::named(format!("unit-{i}"))).collect();
        let container = Container::with_units("site", units.clone()).unwrap();
        assert_eq!(container.len(), size);

        let demolished = collect(&container, ContainerEvent::DEMOLISH);
        container.demolish();

        assert!(container.is_empty(), "size={size}");
        assert!(units.iter().all(|u| u.container().is_none()), "size={size}");
        assert_eq!(demolished.lock().unwrap().len(), 1);
    }
}

#[test]
fn test_units_can_join_a_new_container_after_demolish() {
    let unit = Unit::named("nomad");
    let old = Container::with_units("old", [unit.clone()]).unwrap();
    old.demolish();

    let new = Container::named("new");
    new.add(&unit).unwrap();
    assert_eq!(unit.container(), Some(new));
}

#[test]
fn test_get_by_id() {
    let a = Unit::named("a");
    let b = Unit::named("b");
    let container = Container::with_units("site", [a.clone(), b.clone()]).unwrap();

    assert_eq!(container.get(b.id()).map(|u| u.name().to_string()), Some("b".to_string()));
    assert!(container.get(Unit::new().id()).is_none());

    container.remove(&b).unwrap();
    assert!(container.get(b.id()).is_none());
    assert!(container.contains(&a));
}

#[test]
fn test_listener_cannot_sneak_in_a_duplicate_name() {
    let container = Container::named("site");
    let existing = Unit::named("existing");
    container.add(&existing).unwrap();

    let inner = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&inner);
    existing.on(UnitEvent::SIBLING_ADDED, move |e| {
        if let UnitEvent::SiblingAdded { sibling, container } = e {
            if sibling.name() == "dup" {
                let clash = Unit::named("dup");
                let result = container.add(&clash);
                *sink.lock().unwrap() = Some((result, clash));
            }
        }
    });

    container.add(&Unit::named("dup")).unwrap();

    let (result, clash) = inner.lock().unwrap().take().unwrap();
    assert!(matches!(result, Err(Error::DuplicateMember { .. })));
    assert!(clash.container().is_none());
    let names: Vec<String> = container.units().iter().map(|u| u.name().to_string()).collect();
    assert_eq!(names, vec!["existing", "dup"]);
}

#[test]
fn test_concurrent_adds_of_the_same_name_admit_one() {
    for _ in 0..20 {
        let container = Container::named("site");
        let existing = Unit::named("existing");
        container.add(&existing).unwrap();
        existing.on(UnitEvent::SIBLING_ADDED, |_| {
            std::thread::sleep(std::time::Duration::from_millis(2))
        });

        let barrier = &std::sync::Barrier::new(2);
        let container = &container;
        let results: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(move || {
                        let unit = Unit::named("dup");
                        barrier.wait();
                        container.add(&unit).is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(container.len(), 2);
        assert_eq!(
            container.units().iter().filter(|u| u.name() == "dup").count(),
            1
        );
    }
}

#[test]
fn test_concurrent_adds_to_two_containers_admit_one() {
    for _ in 0..20 {
        let unit = Unit::named("shared");
        let left = Container::named("left");
        let right = Container::named("right");

        let barrier = std::sync::Barrier::new(2);
        let (l, r) = std::thread::scope(|s| {
            let l = s.spawn(|| {
                barrier.wait();
                left.add(&unit).is_ok()
            });
            let r = s.spawn(|| {
                barrier.wait();
                right.add(&unit).is_ok()
            });
            (l.join().unwrap(), r.join().unwrap())
        });

        assert!(l ^ r);
        assert_eq!(left.len() + right.len(), 1);
        let owner = if l { left } else { right };
        assert_eq!(unit.container(), Some(owner));
    }
}

#[test]
fn test_listener_cannot_remove_a_unit_twice() {
    let leaving = Unit::named("leaving");
    let staying = Unit::named("staying");
    let container = Container::with_units("site", [leaving.clone(), staying.clone()]).unwrap();

    let inner = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&inner);
    staying.on(UnitEvent::SIBLING_REMOVED, move |e| {
        if let UnitEvent::SiblingRemoved { sibling, container } = e {
            *sink.lock().unwrap() = Some(container.remove(sibling));
        }
    });
    let removed = collect(&container, ContainerEvent::REMOVE);

    container.remove(&leaving).unwrap();

    assert!(matches!(
        inner.lock().unwrap().take(),
        Some(Err(Error::MemberNotFound { .. }))
    ));
    assert_eq!(removed.lock().unwrap().len(), 1);
    assert_eq!(container.units(), vec![staying]);
}
