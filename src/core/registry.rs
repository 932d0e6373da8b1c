use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::error::{Error, Result};
use crate::core::program::Program;

/// Name-indexed program storage owned by a single unit.
///
/// Programs are frozen behind an `Arc` on insertion, so a run that already
/// looked one up is unaffected by later removals.
#[derive(Default)]
pub struct ProgramRegistry {
    programs: RwLock<HashMap<String, Arc<Program>>>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `program`, naming it with a fresh UUID if its name is empty.
    pub fn insert(&self, mut program: Program) -> Result<Arc<Program>> {
        if program.name.is_empty() {
            program.name = uuid::Uuid::new_v4().to_string();
        }

        let mut programs = self.programs.write().unwrap_or_else(PoisonError::into_inner);
        if programs.contains_key(&program.name) {
            return Err(Error::DuplicateProgram(program.name));
        }

        let program = Arc::new(program);
        programs.insert(program.name.clone(), Arc::clone(&program));
        Ok(program)
    }

    pub fn remove(&self, name: &str) -> Result<Arc<Program>> {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| Error::ProgramNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Program>> {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.programs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
