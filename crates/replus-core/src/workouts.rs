//! Query facade and save pipeline for sessions, exercises and lines.

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::error::{StoreError, UniqueField, WorkoutError};
use crate::repository::{NameScope, WorkoutRepository};
use crate::slug::{derive_slug, line_seed, matches_base, unique_slug};
use crate::stats::{ExerciseStats, UserStats};
use crate::types::{
    EntityKind, Exercise, ExerciseDraft, Line, LineDraft, LineForm, NameForm, Scope, Session,
    SessionDraft, UserId,
};
use crate::validate::{clean_line, clean_name, fold_name};

/// How many times a commit is retried after losing a race for a slug.
const MAX_SLUG_ATTEMPTS: usize = 3;

type Result<T> = std::result::Result<T, WorkoutError>;

/// Ownership-scoped access to a user's workouts.
///
/// Cheap to clone; clones share the same repository.
pub struct WorkoutService<R> {
    repo: Arc<R>,
}

impl<R> Clone for WorkoutService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: WorkoutRepository> WorkoutService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }

    /// Build a service over a repository that is shared with other code.
    pub fn from_shared(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn sessions_of(&self, user: UserId) -> Result<Vec<Session>> {
        Ok(self.repo.sessions_of(user)?)
    }

    pub fn session(&self, user: UserId, session_slug: &str) -> Result<Session> {
        self.repo
            .find_session(user, session_slug)?
            .ok_or(WorkoutError::NotFound(EntityKind::Session))
    }

    pub fn exercises_of_session(&self, user: UserId, session_slug: &str) -> Result<Vec<Exercise>> {
        let session = self.session(user, session_slug)?;
        Ok(self.repo.exercises_in_session(user, session.id)?)
    }

    /// Resolve an exercise through its session, both owned by `user`.
    pub fn exercise(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
    ) -> Result<Exercise> {
        let session = self.session(user, session_slug)?;
        self.repo
            .find_exercise(user, session.id, exercise_slug)?
            .ok_or(WorkoutError::NotFound(EntityKind::Exercise))
    }

    pub fn lines_of_exercise(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
    ) -> Result<Vec<Line>> {
        let exercise = self.exercise(user, session_slug, exercise_slug)?;
        Ok(self.repo.lines_of_exercise(user, exercise.id)?)
    }

    pub fn exercises_of_user(&self, user: UserId) -> Result<Vec<Exercise>> {
        Ok(self.repo.exercises_of(user)?)
    }

    pub fn lines_of_user(&self, user: UserId) -> Result<Vec<Line>> {
        Ok(self.repo.lines_of(user)?)
    }

    pub fn exercise_stats(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
    ) -> Result<ExerciseStats> {
        let exercise = self.exercise(user, session_slug, exercise_slug)?;
        let lines = self.repo.lines_of_exercise(user, exercise.id)?;
        Ok(ExerciseStats::compute(exercise, &lines))
    }

    pub fn user_stats(&self, user: UserId) -> Result<UserStats> {
        let sessions = self.repo.sessions_of(user)?;
        let exercises = self.repo.exercises_of(user)?;
        let lines = self.repo.lines_of(user)?;
        Ok(UserStats::compute(&sessions, exercises, lines))
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn create_session(&self, user: UserId, form: &NameForm) -> Result<Session> {
        let name = clean_name(&form.name).map_err(WorkoutError::Validation)?;
        let scope = Scope {
            owner: user,
            session_id: None,
        };

        let folded = fold_name(&name);
        self.ensure_unique_name(
            EntityKind::Session,
            &name,
            scope,
            NameScope::Session {
                owner: user,
                folded_name: &folded,
            },
        )?;

        let session = self.commit(
            EntityKind::Session,
            &name,
            None,
            None,
            Some((name.as_str(), scope)),
            |slug| {
                self.repo.insert_session(&SessionDraft {
                    name: name.clone(),
                    slug,
                    owner: user,
                })
            },
        )?;

        info!(user = %user, slug = %session.slug, "Created session");
        Ok(session)
    }

    /// Rename a session. The slug follows the new name.
    pub fn rename_session(
        &self,
        user: UserId,
        session_slug: &str,
        form: &NameForm,
    ) -> Result<Session> {
        let name = clean_name(&form.name).map_err(WorkoutError::Validation)?;
        let current = self.session(user, session_slug)?;
        let scope = Scope {
            owner: user,
            session_id: None,
        };

        let session = self.commit(
            EntityKind::Session,
            &name,
            Some(current.slug.as_str()),
            Some(current.id),
            Some((name.as_str(), scope)),
            |slug| {
                let updated = Session {
                    name: name.clone(),
                    slug,
                    ..current.clone()
                };
                self.repo.update_session(&updated).map(|_| updated)
            },
        )?;

        info!(user = %user, from = %current.slug, to = %session.slug, "Renamed session");
        Ok(session)
    }

    /// Delete a session together with its exercises and their lines.
    pub fn delete_session(&self, user: UserId, session_slug: &str) -> Result<()> {
        let session = self.session(user, session_slug)?;
        if !self.repo.delete_session(user, session.id)? {
            return Err(WorkoutError::NotFound(EntityKind::Session));
        }

        info!(user = %user, slug = %session.slug, "Deleted session");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------

    pub fn create_exercise(
        &self,
        user: UserId,
        session_slug: &str,
        form: &NameForm,
    ) -> Result<Exercise> {
        let name = clean_name(&form.name).map_err(WorkoutError::Validation)?;
        let session = self.session(user, session_slug)?;
        let scope = Scope {
            owner: user,
            session_id: Some(session.id),
        };

        let folded = fold_name(&name);
        self.ensure_unique_name(
            EntityKind::Exercise,
            &name,
            scope,
            NameScope::Exercise {
                owner: user,
                session_id: Some(session.id),
                folded_name: &folded,
            },
        )?;

        let exercise = self.commit(
            EntityKind::Exercise,
            &name,
            None,
            None,
            Some((name.as_str(), scope)),
            |slug| {
                self.repo.insert_exercise(&ExerciseDraft {
                    name: name.clone(),
                    slug,
                    session_id: Some(session.id),
                    owner: user,
                })
            },
        )?;

        info!(user = %user, session = %session.slug, slug = %exercise.slug, "Created exercise");
        Ok(exercise)
    }

    pub fn rename_exercise(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
        form: &NameForm,
    ) -> Result<Exercise> {
        let name = clean_name(&form.name).map_err(WorkoutError::Validation)?;
        let current = self.exercise(user, session_slug, exercise_slug)?;
        let scope = Scope {
            owner: user,
            session_id: current.session_id,
        };

        let exercise = self.commit(
            EntityKind::Exercise,
            &name,
            Some(current.slug.as_str()),
            Some(current.id),
            Some((name.as_str(), scope)),
            |slug| {
                let updated = Exercise {
                    name: name.clone(),
                    slug,
                    ..current.clone()
                };
                self.repo.update_exercise(&updated).map(|_| updated)
            },
        )?;

        info!(user = %user, from = %current.slug, to = %exercise.slug, "Renamed exercise");
        Ok(exercise)
    }

    /// Delete an exercise and its lines. The parent session is untouched.
    pub fn delete_exercise(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
    ) -> Result<()> {
        let exercise = self.exercise(user, session_slug, exercise_slug)?;
        if !self.repo.delete_exercise(user, exercise.id)? {
            return Err(WorkoutError::NotFound(EntityKind::Exercise));
        }

        info!(user = %user, slug = %exercise.slug, "Deleted exercise");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lines
    // ------------------------------------------------------------------

    /// Record a set against an exercise. The timestamp is taken now.
    pub fn log_line(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
        form: &LineForm,
    ) -> Result<Line> {
        let (weight, reps) = clean_line(form).map_err(WorkoutError::Validation)?;
        let exercise = self.exercise(user, session_slug, exercise_slug)?;

        // Stored timestamps keep microseconds.
        let timestamp = Utc::now().trunc_subsecs(6);
        let seed = line_seed(&exercise.name, &timestamp);

        let line = self.commit(EntityKind::Line, &seed, None, None, None, |slug| {
            self.repo.insert_line(&LineDraft {
                weight,
                reps,
                timestamp,
                slug,
                exercise_id: exercise.id,
                owner: user,
            })
        })?;

        info!(user = %user, exercise = %exercise.slug, slug = %line.slug, "Logged line");
        Ok(line)
    }

    pub fn delete_line(
        &self,
        user: UserId,
        session_slug: &str,
        exercise_slug: &str,
        line_slug: &str,
    ) -> Result<()> {
        let exercise = self.exercise(user, session_slug, exercise_slug)?;
        let line = self
            .repo
            .find_line(user, exercise.id, line_slug)?
            .ok_or(WorkoutError::NotFound(EntityKind::Line))?;

        if !self.repo.delete_line(user, line.id)? {
            return Err(WorkoutError::NotFound(EntityKind::Line));
        }

        info!(user = %user, slug = %line.slug, "Deleted line");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pipeline steps
    // ------------------------------------------------------------------

    /// Fast-path duplicate check. The storage constraint stays authoritative.
    fn ensure_unique_name(
        &self,
        kind: EntityKind,
        name: &str,
        scope: Scope,
        name_scope: NameScope<'_>,
    ) -> Result<()> {
        if self.repo.name_taken(name_scope)? {
            debug!(owner = %scope.owner, kind = %kind, name, "Rejected duplicate name");
            return Err(WorkoutError::DuplicateName {
                kind,
                name: name.to_string(),
                scope,
            });
        }
        Ok(())
    }

    /// Keep `current` if it still belongs to `seed`, otherwise find a free slug.
    fn assign_slug(
        &self,
        kind: EntityKind,
        seed: &str,
        current: Option<&str>,
        except_id: Option<i64>,
    ) -> Result<String> {
        let base = derive_slug(seed);
        if let Some(current) = current {
            if matches_base(current, &base) {
                return Ok(current.to_string());
            }
        }

        Ok(unique_slug(&base, |candidate| {
            self.repo.slug_taken(kind, candidate, except_id)
        })?)
    }

    /// Derive a slug and run `write`, translating storage conflicts.
    ///
    /// A name conflict becomes [`WorkoutError::DuplicateName`]; a slug conflict
    /// re-derives the slug and retries.
    fn commit<T>(
        &self,
        kind: EntityKind,
        seed: &str,
        current_slug: Option<&str>,
        except_id: Option<i64>,
        named: Option<(&str, Scope)>,
        mut write: impl FnMut(String) -> std::result::Result<T, StoreError>,
    ) -> Result<T> {
        let mut slug = self.assign_slug(kind, seed, current_slug, except_id)?;
        let mut attempt = 1;

        loop {
            match write(slug.clone()) {
                Ok(value) => return Ok(value),
                Err(StoreError::UniqueViolation(UniqueField::Slug))
                    if attempt < MAX_SLUG_ATTEMPTS =>
                {
                    warn!(kind = %kind, slug = %slug, attempt, "Slug taken at commit, retrying");
                    attempt += 1;
                    slug = self.assign_slug(kind, seed, None, except_id)?;
                }
                Err(StoreError::UniqueViolation(UniqueField::Name)) => {
                    let Some((name, scope)) = named else {
                        return Err(StoreError::UniqueViolation(UniqueField::Name).into());
                    };
                    warn!(owner = %scope.owner, kind = %kind, name, "Storage rejected duplicate name");
                    return Err(WorkoutError::DuplicateName {
                        kind,
                        name: name.to_string(),
                        scope,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Repository whose inserts fail a fixed number of times.
    #[derive(Default)]
    struct FlakyRepo {
        failures: Mutex<Vec<StoreError>>,
        sessions: Mutex<Vec<Session>>,
    }

    impl FlakyRepo {
        fn failing_with(failures: Vec<StoreError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                ..Default::default()
            }
        }
    }

    impl WorkoutRepository for FlakyRepo {
        fn sessions_of(&self, owner: UserId) -> std::result::Result<Vec<Session>, StoreError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions.iter().filter(|s| s.owner == owner).cloned().collect())
        }

        fn find_session(
            &self,
            owner: UserId,
            slug: &str,
        ) -> std::result::Result<Option<Session>, StoreError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions
                .iter()
                .find(|s| s.owner == owner && s.slug == slug)
                .cloned())
        }

        fn exercises_of(&self, _: UserId) -> std::result::Result<Vec<Exercise>, StoreError> {
            Ok(Vec::new())
        }

        fn exercises_in_session(
            &self,
            _: UserId,
            _: i64,
        ) -> std::result::Result<Vec<Exercise>, StoreError> {
            Ok(Vec::new())
        }

        fn find_exercise(
            &self,
            _: UserId,
            _: i64,
            _: &str,
        ) -> std::result::Result<Option<Exercise>, StoreError> {
            Ok(None)
        }

        fn lines_of(&self, _: UserId) -> std::result::Result<Vec<Line>, StoreError> {
            Ok(Vec::new())
        }

        fn lines_of_exercise(
            &self,
            _: UserId,
            _: i64,
        ) -> std::result::Result<Vec<Line>, StoreError> {
            Ok(Vec::new())
        }

        fn find_line(
            &self,
            _: UserId,
            _: i64,
            _: &str,
        ) -> std::result::Result<Option<Line>, StoreError> {
            Ok(None)
        }

        fn name_taken(&self, _: NameScope<'_>) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }

        fn slug_taken(
            &self,
            _: EntityKind,
            slug: &str,
            _: Option<i64>,
        ) -> std::result::Result<bool, StoreError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions.iter().any(|s| s.slug == slug))
        }

        fn insert_session(&self, draft: &SessionDraft) -> std::result::Result<Session, StoreError> {
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }

            let mut sessions = self.sessions.lock().unwrap();
            let session = Session {
                id: sessions.len() as i64 + 1,
                name: draft.name.clone(),
                slug: draft.slug.clone(),
                owner: draft.owner,
            };
            sessions.push(session.clone());
            Ok(session)
        }

        fn update_session(&self, _: &Session) -> std::result::Result<(), StoreError> {
            Ok(())
        }

        fn delete_session(&self, _: UserId, _: i64) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }

        fn insert_exercise(
            &self,
            _: &ExerciseDraft,
        ) -> std::result::Result<Exercise, StoreError> {
            Err(StoreError::backend(std::io::Error::other("not supported")))
        }

        fn update_exercise(&self, _: &Exercise) -> std::result::Result<(), StoreError> {
            Ok(())
        }

        fn delete_exercise(&self, _: UserId, _: i64) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }

        fn insert_line(&self, _: &LineDraft) -> std::result::Result<Line, StoreError> {
            Err(StoreError::backend(std::io::Error::other("not supported")))
        }

        fn delete_line(&self, _: UserId, _: i64) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }
    }

    fn slug_conflict() -> StoreError {
        StoreError::UniqueViolation(UniqueField::Slug)
    }

    #[test]
    fn test_commit_retries_lost_slug_race() {
        let svc = WorkoutService::new(FlakyRepo::failing_with(vec![slug_conflict()]));

        let session = svc
            .create_session(UserId(1), &NameForm::new("Push"))
            .unwrap();
        assert_eq!(session.slug, "push");
    }

    #[test]
    fn test_commit_gives_up_after_bounded_retries() {
        let failures = (0..MAX_SLUG_ATTEMPTS).map(|_| slug_conflict()).collect();
        let svc = WorkoutService::new(FlakyRepo::failing_with(failures));

        let err = svc
            .create_session(UserId(1), &NameForm::new("Push"))
            .unwrap_err();
        assert!(matches!(
            err,
            WorkoutError::Store(StoreError::UniqueViolation(UniqueField::Slug))
        ));
    }

    #[test]
    fn test_storage_name_conflict_is_duplicate_name() {
        let svc = WorkoutService::new(FlakyRepo::failing_with(vec![
            StoreError::UniqueViolation(UniqueField::Name),
        ]));

        let err = svc
            .create_session(UserId(7), &NameForm::new("Push"))
            .unwrap_err();
        match err {
            WorkoutError::DuplicateName { kind, name, scope } => {
                assert_eq!(kind, EntityKind::Session);
                assert_eq!(name, "Push");
                assert_eq!(scope.owner, UserId(7));
            }
            other => panic!("expected DuplicateName, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_runs_before_storage() {
        let svc = WorkoutService::new(FlakyRepo::default());

        let err = svc
            .create_session(UserId(1), &NameForm::new(""))
            .unwrap_err();
        assert!(matches!(err, WorkoutError::Validation(_)));
        assert!(svc.sessions_of(UserId(1)).unwrap().is_empty());
    }
}
