//! SQLite implementation of the workout repository.

use chrono::{DateTime, SecondsFormat, Utc};
use replus_core::validate::fold_name;
use replus_core::{
    EntityKind, Exercise, ExerciseDraft, Line, LineDraft, NameScope, Session, SessionDraft,
    StoreError, UniqueField, UserId, WorkoutRepository,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::users::is_unique_violation;
use crate::Database;

const SESSION_COLUMNS: &str = "id, name, slug, user_id";
const EXERCISE_COLUMNS: &str = "id, name, slug, session_id, user_id";
const LINE_COLUMNS: &str = "id, weight, reps, timestamp, slug, exercise_id, user_id";

/// Timestamps are stored as fixed-width RFC 3339 in UTC so they sort as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(row: &Row, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Translate a rusqlite error, singling out unique constraint failures.
fn store_err(err: rusqlite::Error) -> StoreError {
    if is_unique_violation(&err) {
        let on_slug = matches!(
            &err,
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains(".slug")
        );
        let field = if on_slug {
            UniqueField::Slug
        } else {
            UniqueField::Name
        };
        return StoreError::UniqueViolation(field);
    }
    StoreError::backend(err)
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Session => "sessions",
        EntityKind::Exercise => "exercises",
        EntityKind::Line => "lines",
    }
}

fn query_all<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row) -> Result<T, rusqlite::Error>,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(store_err)?;
    let rows = stmt.query_map(params, map).map_err(store_err)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(store_err)?);
    }

    Ok(records)
}

fn query_one<T, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row) -> Result<T, rusqlite::Error>,
) -> Result<Option<T>, StoreError> {
    conn.query_row(sql, params, map)
        .optional()
        .map_err(store_err)
}

fn exists<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<bool, StoreError> {
    conn.query_row(sql, params, |row| row.get::<_, bool>(0))
        .map_err(store_err)
}

fn row_to_session(row: &Row) -> Result<Session, rusqlite::Error> {
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        owner: UserId(row.get(3)?),
    })
}

fn row_to_exercise(row: &Row) -> Result<Exercise, rusqlite::Error> {
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        session_id: row.get(3)?,
        owner: UserId(row.get(4)?),
    })
}

fn row_to_line(row: &Row) -> Result<Line, rusqlite::Error> {
    let weight: String = row.get(1)?;
    let weight = Decimal::from_str(&weight)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Line {
        id: row.get(0)?,
        weight,
        reps: row.get(2)?,
        timestamp: parse_timestamp(row, 3)?,
        slug: row.get(4)?,
        exercise_id: row.get(5)?,
        owner: UserId(row.get(6)?),
    })
}

impl WorkoutRepository for Database {
    fn sessions_of(&self, owner: UserId) -> Result<Vec<Session>, StoreError> {
        let conn = self.lock();
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM sessions WHERE user_id = ?1 ORDER BY id",
                SESSION_COLUMNS
            ),
            params![owner.0],
            row_to_session,
        )
    }

    fn find_session(&self, owner: UserId, slug: &str) -> Result<Option<Session>, StoreError> {
        let conn = self.lock();
        query_one(
            &conn,
            &format!(
                "SELECT {} FROM sessions WHERE user_id = ?1 AND slug = ?2",
                SESSION_COLUMNS
            ),
            params![owner.0, slug],
            row_to_session,
        )
    }

    fn exercises_of(&self, owner: UserId) -> Result<Vec<Exercise>, StoreError> {
        let conn = self.lock();
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM exercises WHERE user_id = ?1 ORDER BY id",
                EXERCISE_COLUMNS
            ),
            params![owner.0],
            row_to_exercise,
        )
    }

    fn exercises_in_session(
        &self,
        owner: UserId,
        session_id: i64,
    ) -> Result<Vec<Exercise>, StoreError> {
        let conn = self.lock();
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM exercises WHERE user_id = ?1 AND session_id = ?2 ORDER BY id",
                EXERCISE_COLUMNS
            ),
            params![owner.0, session_id],
            row_to_exercise,
        )
    }

    fn find_exercise(
        &self,
        owner: UserId,
        session_id: i64,
        slug: &str,
    ) -> Result<Option<Exercise>, StoreError> {
        let conn = self.lock();
        query_one(
            &conn,
            &format!(
                "SELECT {} FROM exercises WHERE user_id = ?1 AND session_id = ?2 AND slug = ?3",
                EXERCISE_COLUMNS
            ),
            params![owner.0, session_id, slug],
            row_to_exercise,
        )
    }

    fn lines_of(&self, owner: UserId) -> Result<Vec<Line>, StoreError> {
        let conn = self.lock();
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM lines WHERE user_id = ?1 ORDER BY id",
                LINE_COLUMNS
            ),
            params![owner.0],
            row_to_line,
        )
    }

    fn lines_of_exercise(
        &self,
        owner: UserId,
        exercise_id: i64,
    ) -> Result<Vec<Line>, StoreError> {
        let conn = self.lock();
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM lines WHERE user_id = ?1 AND exercise_id = ?2 ORDER BY id",
                LINE_COLUMNS
            ),
            params![owner.0, exercise_id],
            row_to_line,
        )
    }

    fn find_line(
        &self,
        owner: UserId,
        exercise_id: i64,
        slug: &str,
    ) -> Result<Option<Line>, StoreError> {
        let conn = self.lock();
        query_one(
            &conn,
            &format!(
                "SELECT {} FROM lines WHERE user_id = ?1 AND exercise_id = ?2 AND slug = ?3",
                LINE_COLUMNS
            ),
            params![owner.0, exercise_id, slug],
            row_to_line,
        )
    }

    fn name_taken(&self, scope: NameScope<'_>) -> Result<bool, StoreError> {
        let conn = self.lock();
        match scope {
            NameScope::Session { owner, folded_name } => exists(
                &conn,
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE user_id = ?1 AND name_folded = ?2)",
                params![owner.0, folded_name],
            ),
            NameScope::Exercise {
                owner,
                session_id,
                folded_name,
            } => exists(
                &conn,
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM exercises
                    WHERE user_id = ?1
                      AND IFNULL(session_id, 0) = IFNULL(?2, 0)
                      AND name_folded = ?3
                )
                "#,
                params![owner.0, session_id, folded_name],
            ),
        }
    }

    fn slug_taken(
        &self,
        kind: EntityKind,
        slug: &str,
        except_id: Option<i64>,
    ) -> Result<bool, StoreError> {
        let conn = self.lock();
        exists(
            &conn,
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE slug = ?1 AND (?2 IS NULL OR id != ?2))",
                table(kind)
            ),
            params![slug, except_id],
        )
    }

    fn insert_session(&self, draft: &SessionDraft) -> Result<Session, StoreError> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sessions (name, name_folded, slug, user_id) VALUES (?1, ?2, ?3, ?4)",
            params![draft.name, fold_name(&draft.name), draft.slug, draft.owner.0],
        )
        .map_err(store_err)?;

        Ok(Session {
            id: conn.last_insert_rowid(),
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            owner: draft.owner,
        })
    }

    fn update_session(&self, session: &Session) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE sessions SET name = ?1, name_folded = ?2, slug = ?3 WHERE id = ?4 AND user_id = ?5",
            params![
                session.name,
                fold_name(&session.name),
                session.slug,
                session.id,
                session.owner.0
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn delete_session(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
                params![id, owner.0],
            )
            .map_err(store_err)?;
        Ok(rows > 0)
    }

    fn insert_exercise(&self, draft: &ExerciseDraft) -> Result<Exercise, StoreError> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO exercises (name, name_folded, slug, session_id, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                draft.name,
                fold_name(&draft.name),
                draft.slug,
                draft.session_id,
                draft.owner.0
            ],
        )
        .map_err(store_err)?;

        Ok(Exercise {
            id: conn.last_insert_rowid(),
            name: draft.name.clone(),
            slug: draft.slug.clone(),
            session_id: draft.session_id,
            owner: draft.owner,
        })
    }

    fn update_exercise(&self, exercise: &Exercise) -> Result<(), StoreError> {
        let conn = self.lock();
        conn.execute(
            "UPDATE exercises SET name = ?1, name_folded = ?2, slug = ?3 WHERE id = ?4 AND user_id = ?5",
            params![
                exercise.name,
                fold_name(&exercise.name),
                exercise.slug,
                exercise.id,
                exercise.owner.0
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    fn delete_exercise(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM exercises WHERE id = ?1 AND user_id = ?2",
                params![id, owner.0],
            )
            .map_err(store_err)?;
        Ok(rows > 0)
    }

    fn insert_line(&self, draft: &LineDraft) -> Result<Line, StoreError> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO lines (weight, reps, timestamp, slug, exercise_id, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                draft.weight.to_string(),
                draft.reps,
                format_timestamp(&draft.timestamp),
                draft.slug,
                draft.exercise_id,
                draft.owner.0
            ],
        )
        .map_err(store_err)?;

        Ok(Line {
            id: conn.last_insert_rowid(),
            weight: draft.weight,
            reps: draft.reps,
            timestamp: draft.timestamp,
            slug: draft.slug.clone(),
            exercise_id: draft.exercise_id,
            owner: draft.owner,
        })
    }

    fn delete_line(&self, owner: UserId, id: i64) -> Result<bool, StoreError> {
        let conn = self.lock();
        let rows = conn
            .execute(
                "DELETE FROM lines WHERE id = ?1 AND user_id = ?2",
                params![id, owner.0],
            )
            .map_err(store_err)?;
        Ok(rows > 0)
    }
}
