//! Function calling: schemas a model may choose to call, and the handlers
//! that run when it does.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::error::CapabilityError;
use crate::core::Payload;

/// A function the model may call. `parameters` is a JSON Schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Payload,
}

impl FunctionDefinition {
    pub fn new(name: impl Into<String>, parameters: Payload) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A call requested by the model. `arguments` is the raw JSON text the model
/// produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

type FunctionFuture = Pin<Box<dyn Future<Output = Result<Payload, CapabilityError>> + Send>>;
type FunctionHandler = Arc<dyn Fn(Payload) -> FunctionFuture + Send + Sync>;

/// Function definitions together with their handlers.
#[derive(Clone, Default)]
pub struct Functions {
    definitions: Vec<FunctionDefinition>,
    handlers: HashMap<String, FunctionHandler>,
}

impl Functions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a function. A later definition with the same name replaces the
    /// earlier one.
    pub fn function<F, Fut>(mut self, definition: FunctionDefinition, handler: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, CapabilityError>> + Send + 'static,
    {
        let handler: FunctionHandler =
            Arc::new(move |arguments: Payload| -> FunctionFuture { Box::pin(handler(arguments)) });
        self.handlers.insert(definition.name.clone(), handler);
        self.definitions.retain(|d| d.name != definition.name);
        self.definitions.push(definition);
        self
    }

    pub fn definitions(&self) -> &[FunctionDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Runs the handler named by `call` with its arguments parsed as JSON.
    /// Empty arguments are passed as `{}`.
    pub async fn dispatch(&self, call: &FunctionCall) -> Result<Payload, CapabilityError> {
        let handler = self.handlers.get(&call.name).ok_or_else(|| {
            CapabilityError::InvalidResponse(format!("Invalid function call: '{}'", call.name))
        })?;

        let arguments = if call.arguments.trim().is_empty() {
            Payload::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments)?
        };

        log::debug!("Dispatching function call: {}", call.name);
        handler(arguments).await
    }
}

impl fmt::Debug for Functions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.definitions.iter().map(|d| d.name.as_str()).collect();
        f.debug_struct("Functions").field("names", &names).finish()
    }
}
