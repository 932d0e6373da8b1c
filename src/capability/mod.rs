//! Optional services a [`Unit`](crate::Unit) can hold.
//!
//! A unit never calls its capabilities itself; actions reach them through the
//! unit they receive. Each slot is typed and may be empty:
//! - [`Intelligence`] for language-model access ([`CustomIntelligence`], or
//!   [`OpenAi`](openai::OpenAi) with the `llm` feature, which can also call
//!   [`Functions`])
//! - [`KeyValueStore`] for simple key/value data ([`MemoryStore`])
//! - [`QueryStore`] for query-based databases

pub mod error;
pub mod functions;
pub mod intelligence;
#[cfg(feature = "llm")]
pub mod openai;
pub mod storage;

use std::fmt;
use std::sync::Arc;

pub use error::CapabilityError;
pub use functions::{FunctionCall, FunctionDefinition, Functions};
pub use intelligence::{
    Answer, ChatMessage, CustomIntelligence, GeneratedImage, ImageResult, ImageSize, Intelligence,
};
pub use storage::{KeyValueStore, MemoryStore, QueryStore};

/// The capability slots of a unit. All empty by default.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub intelligence: Option<Arc<dyn Intelligence>>,
    pub store: Option<Arc<dyn KeyValueStore>>,
    pub database: Option<Arc<dyn QueryStore>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intelligence(mut self, intelligence: Arc<dyn Intelligence>) -> Self {
        self.intelligence = Some(intelligence);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_database(mut self, database: Arc<dyn QueryStore>) -> Self {
        self.database = Some(database);
        self
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("intelligence", &self.intelligence.is_some())
            .field("store", &self.store.is_some())
            .field("database", &self.database.is_some())
            .finish()
    }
}
