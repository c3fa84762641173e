use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three kinds of owned records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Session,
    Exercise,
    Line,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Session => "Session",
            EntityKind::Exercise => "Exercise",
            EntityKind::Line => "Line",
        };
        write!(f, "{}", name)
    }
}

/// Fields over which a name must be unique.
///
/// Sessions are scoped by owner alone; exercises by owner and parent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub owner: UserId,
    pub session_id: Option<i64>,
}

/// A named workout session, e.g. "Push Day".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub owner: UserId,
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An exercise performed within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub session_id: Option<i64>,
    pub owner: UserId,
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One logged set: a weight lifted for a number of reps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: i64,
    pub weight: Decimal,
    pub reps: i32,
    pub timestamp: DateTime<Utc>,
    pub slug: String,
    pub exercise_id: i64,
    pub owner: UserId,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {} reps at {}",
            self.weight,
            self.reps,
            self.timestamp.format("%Y-%m-%d %H:%M")
        )
    }
}

/// A session that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub name: String,
    pub slug: String,
    pub owner: UserId,
}

/// An exercise that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseDraft {
    pub name: String,
    pub slug: String,
    pub session_id: Option<i64>,
    pub owner: UserId,
}

/// A line that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    pub weight: Decimal,
    pub reps: i32,
    pub timestamp: DateTime<Utc>,
    pub slug: String,
    pub exercise_id: i64,
    pub owner: UserId,
}

/// Raw submission for creating or renaming a session or exercise.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameForm {
    #[serde(default)]
    pub name: String,
}

impl NameForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raw submission for logging a line. Values are kept as text until validated.
#[derive(Debug, Clone, Default)]
pub struct LineForm {
    pub weight: String,
    pub reps: String,
}

impl LineForm {
    pub fn new(weight: impl Into<String>, reps: impl Into<String>) -> Self {
        Self {
            weight: weight.into(),
            reps: reps.into(),
        }
    }
}
