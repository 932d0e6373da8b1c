//! # Cairn
//!
//! A composable unit-of-behavior runtime.
//!
//! A [`Unit`] holds a private registry of named [`Program`]s. A program is an
//! ordered list of [`Step`]s, each an ordered list of [`Action`]s; running it
//! folds a JSON [`Payload`] through every action in turn. Units can be grouped
//! into a [`Container`], which keeps their ids and names unique and mirrors
//! their events so observers can watch a whole group from one place.
//!
//! ## Features
//!
//! - **Sequential Pipelines**: Each action's output is the next action's input, first failure stops the run
//! - **Two-tier Events**: Units emit on their own channel and are mirrored onto their container
//! - **Typed Capabilities**: Optional AI and storage slots that actions reach through their unit
//! - **Optional LLM Integration**: An OpenAI-compatible client behind the `llm` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cairn::prelude::*;
//! use serde_json::json;
//!
//! # async fn demo() -> cairn::Result<()> {
//! let unit = Unit::named("calculator");
//! unit.register(
//!     Program::new("inc-then-double")
//!         .step(Step::new("inc").action(Action::sync("inc", |x, _| {
//!             Ok(json!(x.as_i64().unwrap_or_default() + 1))
//!         })))
//!         .step(Step::new("double").action(Action::sync("double", |x, _| {
//!             Ok(json!(x.as_i64().unwrap_or_default() * 2))
//!         }))),
//! )?;
//!
//! let container = Container::named("workshop");
//! container.on("run-started", |event| {
//!     if let Some(unit) = event.unit() {
//!         println!("{} started a run", unit.name());
//!     }
//! });
//! container.add(&unit)?;
//!
//! assert_eq!(unit.run("inc-then-double", json!(3)).await?, json!(8));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`capability`]: Capability contracts and bundled providers
//! - [`programs`]: Ready-made programs
//! - [`prelude`]: Commonly used types and traits (import with `use cairn::prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

pub use crate::core::Payload;
pub use crate::core::container::{Container, ContainerId};
pub use crate::core::error::{ActionError, Error, Result};
pub use crate::core::events::{
    ContainerEvent, Event, EventChannel, Listener, ListenerId, UnitEvent,
};
pub use crate::core::program::{Action, ActionMethod, Program, Step};
pub use crate::core::registry::ProgramRegistry;
pub use crate::core::unit::{Unit, UnitBuilder, UnitId};

// ============================================================================
// Capabilities and Stock Programs
// ============================================================================

pub mod capability;
pub mod programs;

pub use capability::{
    Answer, Capabilities, CapabilityError, ChatMessage, CustomIntelligence, FunctionCall,
    FunctionDefinition, Functions, ImageResult, ImageSize, Intelligence, KeyValueStore,
    MemoryStore, QueryStore,
};

#[cfg(feature = "llm")]
pub use capability::openai::{OpenAi, OpenAiConfig};

// ============================================================================
// Prelude Module - Convenient Bulk Imports
// ============================================================================

/// Imports everything needed to define programs and compose units.
///
/// # Example
/// ```rust
/// use cairn::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        Action,
        ActionError,
        ActionMethod,
        // Capabilities
        Capabilities,
        CapabilityError,
        // Composition
        Container,
        ContainerEvent,
        Event,
        Intelligence,
        KeyValueStore,
        Payload,
        Program,
        QueryStore,
        Step,
        // Core
        Unit,
        UnitEvent,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
