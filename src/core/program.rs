use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Payload;
use crate::core::error::ActionError;
use crate::core::unit::Unit;

/// A named pipeline of [`Step`]s, registered on a [`Unit`].
///
/// Leave the name empty to have the registry assign a fresh identifier.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<Step>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    /// A program whose name is assigned at registration.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Total number of actions across all steps.
    pub fn action_count(&self) -> usize {
        self.steps.iter().map(|s| s.actions.len()).sum()
    }

    /// Every action in execution order, with its step and action indices.
    pub fn actions(&self) -> impl Iterator<Item = (usize, usize, &Step, &Action)> + '_ {
        self.steps.iter().enumerate().flat_map(|(step_index, step)| {
            step.actions
                .iter()
                .enumerate()
                .map(move |(action_index, action)| (step_index, action_index, step, action))
        })
    }
}

/// An ordered group of actions. The name and description are informational.
#[derive(Debug, Clone, Default)]
pub struct Step {
    pub name: Option<String>,
    pub description: Option<String>,
    pub actions: Vec<Action>,
}

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Step {
            name: Some(name.into()),
            description: None,
            actions: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// A single transformation `payload -> payload'` with access to the owning unit.
#[derive(Clone)]
pub struct Action {
    pub name: Option<String>,
    pub description: Option<String>,
    pub method: Arc<dyn ActionMethod>,
}

impl Action {
    /// Builds an action from an async closure.
    ///
    /// ```rust
    /// use cairn::prelude::*;
    /// use serde_json::json;
    ///
    /// let double = Action::new("double", |payload: Payload, _unit: Unit| async move {
    ///     Ok(json!(payload.as_i64().unwrap_or_default() * 2))
    /// });
    /// ```
    pub fn new<F, Fut>(name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Payload, Unit) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, ActionError>> + Send + 'static,
    {
        Self::from_method(name, AsyncFnMethod {
            method,
            _future: PhantomData,
        })
    }

    /// Builds an action from a synchronous closure.
    pub fn sync<F>(name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Payload, &Unit) -> Result<Payload, ActionError> + Send + Sync + 'static,
    {
        Self::from_method(name, SyncFnMethod(method))
    }

    /// Builds an action from any [`ActionMethod`] implementation.
    pub fn from_method<M: ActionMethod>(name: impl Into<String>, method: M) -> Self {
        Action {
            name: Some(name.into()),
            description: None,
            method: Arc::new(method),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// The work an [`Action`] performs.
///
/// Implement this directly for stateful actions; closures are wrapped by
/// [`Action::new`] and [`Action::sync`].
#[async_trait]
pub trait ActionMethod: Send + Sync + 'static {
    async fn call(&self, payload: Payload, unit: &Unit) -> Result<Payload, ActionError>;
}

struct AsyncFnMethod<F, Fut> {
    method: F,
    _future: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> ActionMethod for AsyncFnMethod<F, Fut>
where
    F: Fn(Payload, Unit) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, ActionError>> + Send + 'static,
{
    async fn call(&self, payload: Payload, unit: &Unit) -> Result<Payload, ActionError> {
        (self.method)(payload, unit.clone()).await
    }
}

struct SyncFnMethod<F>(F);

#[async_trait]
impl<F> ActionMethod for SyncFnMethod<F>
where
    F: Fn(Payload, &Unit) -> Result<Payload, ActionError> + Send + Sync + 'static,
{
    async fn call(&self, payload: Payload, unit: &Unit) -> Result<Payload, ActionError> {
        (self.0)(payload, unit)
    }
}
