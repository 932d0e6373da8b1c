//! Question answering through the unit's [`Intelligence`](crate::capability::Intelligence).
//!
//! Input: `{ "question": ..., "context": [ChatMessage]? }`. A non-string
//! question is sent as its JSON text. Output: the [`Answer`] as JSON.

use std::sync::Arc;

use crate::capability::{Answer, CapabilityError, ChatMessage, Intelligence};
use crate::core::Payload;
use crate::core::error::Result;
use crate::core::program::{Action, Program, Step};
use crate::core::unit::Unit;

/// Name the QA program is registered under.
pub const QA: &str = "qa";

/// The question-answering program.
pub fn qa() -> Program {
    Program::new(QA)
        .description("Return an answer to a question")
        .step(
            Step::new("Get Answer")
                .description("Get the answer to the question")
                .action(
                    Action::new("Get Answer", |payload: Payload, unit: Unit| async move {
                        let ai = unit.intelligence().ok_or_else(|| {
                            CapabilityError::NotConfigured("AI not configured".to_string())
                        })?;

                        let question = match payload.get("question") {
                            Some(Payload::String(q)) => q.clone(),
                            Some(other) => other.to_string(),
                            None => String::new(),
                        };
                        let context: Option<Vec<ChatMessage>> = payload
                            .get("context")
                            .map(|c| serde_json::from_value(c.clone()))
                            .transpose()?;

                        let answer: Answer = ai.ask(&question, context).await?;
                        Ok(serde_json::to_value(answer)?)
                    })
                    .description("Get the answer to the question"),
                ),
        )
}

/// A unit with `intelligence` attached and the [`qa`] program registered.
pub fn qa_unit(name: impl Into<String>, intelligence: Arc<dyn Intelligence>) -> Result<Unit> {
    let unit = Unit::builder().name(name).intelligence(intelligence).build();
    unit.register(qa())?;
    Ok(unit)
}
