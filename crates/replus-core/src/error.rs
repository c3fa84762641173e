use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::types::{EntityKind, Scope};

/// Which unique constraint a storage write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    /// The case-folded name within its scope.
    Name,
    /// The globally unique slug.
    Slug,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Name => write!(f, "name"),
            UniqueField::Slug => write!(f, "slug"),
        }
    }
}

/// Errors reported by a [`crate::WorkoutRepository`] implementation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueField),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Validation messages keyed by form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field errors holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Errors surfaced by [`crate::WorkoutService`].
#[derive(Error, Debug)]
pub enum WorkoutError {
    #[error("{kind} with name '{name}' already exists")]
    DuplicateName {
        kind: EntityKind,
        name: String,
        scope: Scope,
    },

    #[error("{0} not found")]
    NotFound(EntityKind),

    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl WorkoutError {
    /// Per-field messages for errors the user can fix by editing the form.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            WorkoutError::DuplicateName { kind, name, .. } => Some(FieldErrors::single(
                "name",
                format!("{} with this name already exists: {}", kind, name),
            )),
            WorkoutError::Validation(errors) => Some(errors.clone()),
            _ => None,
        }
    }
}
