//! Ready-made programs for common unit roles.

pub mod qa;

pub use qa::{QA, qa, qa_unit};
