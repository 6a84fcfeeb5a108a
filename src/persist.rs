//! Compact JSON snapshots of the logic state.
//!
//! A snapshot holds the external claims, the goals, and, for each
//! completed goal, the indices of its claims within the claim array. On
//! reload the engine adds claims first, then goals, then restores each
//! completed goal's claim list by index. Only completed goals carry an
//! annotation: an in-flight goal is re-derived, not restored.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::term::{Claim, Literal};

/// Saved annotation of a completed goal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAnnotation {
    pub completed: bool,
    /// Indices into [`SavedState::claims`].
    pub claims: Vec<usize>,
}

/// A goal with its (optional) completed annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGoal {
    pub literal: Literal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<SavedAnnotation>,
}

/// The persisted logic state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedState {
    pub claims: Vec<Claim>,
    pub goals: Vec<SavedGoal>,
}

/// Write a snapshot as compact JSON.
pub fn write(path: &Path, state: &SavedState) -> Result<(), EngineError> {
    let json = serde_json::to_string(state).map_err(|e| EngineError::Serialization {
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| EngineError::StateFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read a snapshot back.
pub fn read(path: &Path) -> Result<SavedState, EngineError> {
    let json = std::fs::read_to_string(path).map_err(|e| EngineError::StateFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&json).map_err(|e| EngineError::Serialization {
        message: e.to_string(),
    })
}
