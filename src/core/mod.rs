pub mod container;
pub(crate) mod engine;
pub mod error;
pub mod events;
pub mod program;
pub mod registry;
pub mod unit;

/// The value threaded through a program run. The engine never inspects it.
pub type Payload = serde_json::Value;
