use crate::error::StoreError;
use crate::types::{
    EntityKind, Exercise, ExerciseDraft, Line, LineDraft, Session, SessionDraft, UserId,
};

/// Scope in which a case-folded name must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope<'a> {
    Session {
        owner: UserId,
        folded_name: &'a str,
    },
    Exercise {
        owner: UserId,
        session_id: Option<i64>,
        folded_name: &'a str,
    },
}

/// Storage operations the workout workflows rely on.
///
/// Every read is filtered by owner. Implementations must:
/// - enforce the name and slug unique constraints themselves and report a
///   violation as [`StoreError::UniqueViolation`];
/// - cascade deletes from sessions to exercises to lines.
pub trait WorkoutRepository: Send + Sync {
    fn sessions_of(&self, owner: UserId) -> Result<Vec<Session>, StoreError>;

    fn find_session(&self, owner: UserId, slug: &str) -> Result<Option<Session>, StoreError>;

    /// Every exercise the user owns, across sessions.
    fn exercises_of(&self, owner: UserId) -> Result<Vec<Exercise>, StoreError>;

    fn exercises_in_session(
        &self,
        owner: UserId,
        session_id: i64,
    ) -> Result<Vec<Exercise>, StoreError>;

    fn find_exercise(
        &self,
        owner: UserId,
        session_id: i64,
        slug: &str,
    ) -> Result<Option<Exercise>, StoreError>;

    /// Every line the user owns, across exercises.
    fn lines_of(&self, owner: UserId) -> Result<Vec<Line>, StoreError>;

    fn lines_of_exercise(&self, owner: UserId, exercise_id: i64)
        -> Result<Vec<Line>, StoreError>;

    fn find_line(
        &self,
        owner: UserId,
        exercise_id: i64,
        slug: &str,
    ) -> Result<Option<Line>, StoreError>;

    fn name_taken(&self, scope: NameScope<'_>) -> Result<bool, StoreError>;

    /// Whether any row of `kind` other than `except_id` already uses `slug`.
    fn slug_taken(
        &self,
        kind: EntityKind,
        slug: &str,
        except_id: Option<i64>,
    ) -> Result<bool, StoreError>;

    fn insert_session(&self, draft: &SessionDraft) -> Result<Session, StoreError>;

    fn update_session(&self, session: &Session) -> Result<(), StoreError>;

    /// Returns false when no matching row was deleted.
    fn delete_session(&self, owner: UserId, id: i64) -> Result<bool, StoreError>;

    fn insert_exercise(&self, draft: &ExerciseDraft) -> Result<Exercise, StoreError>;

    fn update_exercise(&self, exercise: &Exercise) -> Result<(), StoreError>;

    fn delete_exercise(&self, owner: UserId, id: i64) -> Result<bool, StoreError>;

    fn insert_line(&self, draft: &LineDraft) -> Result<Line, StoreError>;

    fn delete_line(&self, owner: UserId, id: i64) -> Result<bool, StoreError>;
}
