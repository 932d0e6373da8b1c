//! A complete example composing several units into one container.
//!
//! This example demonstrates:
//! - Registering multi-step programs on a unit
//! - Giving a unit capabilities (a stand-in AI and an in-memory store)
//! - Watching every member's runs from the container's channel
//! - Sibling notifications and demolishing the container

use std::sync::Arc;

use cairn::capability::{CustomIntelligence, MemoryStore};
use cairn::prelude::*;
use cairn::programs;
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========================================================================
    // A unit that answers questions through its intelligence capability
    // ========================================================================

    let oracle = programs::qa_unit(
        "oracle",
        Arc::new(CustomIntelligence::new(|question| async move {
            Ok(format!("You asked: '{question}'. The answer is 42."))
        })),
    )?;

    // ========================================================================
    // A unit that keeps a tally in its key/value store
    // ========================================================================

    let counter = Unit::builder()
        .name("counter")
        .store(Arc::new(MemoryStore::new()))
        .build();

    counter.register(
        Program::new("tally")
            .description("Count how many times a word was seen")
            .step(
                Step::new("Normalize").action(Action::sync("lowercase", |payload, _| {
                    Ok(json!(payload.as_str().unwrap_or_default().to_lowercase()))
                })),
            )
            .step(
                Step::new("Store").action(Action::new(
                    "increment",
                    |word: Payload, unit: Unit| async move {
                        let store = unit.store().ok_or("counter has no store")?;
                        let key = word.as_str().unwrap_or_default().to_string();
                        let seen = store
                            .get(&key)
                            .await?
                            .and_then(|v| v.as_u64())
                            .unwrap_or_default()
                            + 1;
                        store.set(&key, json!(seen)).await?;
                        Ok(json!({ "word": key, "seen": seen }))
                    },
                )),
            ),
    )?;

    // ========================================================================
    // Compose them and watch the traffic
    // ========================================================================

    let workshop = Container::named("workshop");
    workshop.on(UnitEvent::RUN_STARTED, |event| {
        if let ContainerEvent::Unit {
            unit,
            event: UnitEvent::RunStarted { program, .. },
        } = event
        {
            println!("[workshop] {} started '{}'", unit.name(), program);
        }
    });
    workshop.on(ContainerEvent::ADD, |event| {
        if let Some(unit) = event.unit() {
            println!("[workshop] {} joined", unit.name());
        }
    });
    oracle.on(UnitEvent::SIBLING_ADDED, |event| {
        if let UnitEvent::SiblingAdded { sibling, .. } = event {
            println!("[oracle] say hello to {}", sibling.name());
        }
    });
    counter.on(UnitEvent::DEMOLISHED, |_| println!("[counter] container demolished"));

    workshop.add(&oracle)?;
    workshop.add(&counter)?;

    let answer = oracle
        .run(programs::QA, json!({ "question": "What is the meaning of life?" }))
        .await?;
    println!("{}", answer["text"]);

    for word in ["Rust", "rust", "Cairn"] {
        let tally = counter.run("tally", json!(word)).await?;
        println!("{tally}");
    }

    workshop.demolish();
    println!(
        "members left: {}, oracle attached: {}",
        workshop.len(),
        oracle.container().is_some()
    );

    Ok(())
}
