//! Accounts and bearer tokens.

use chrono::{DateTime, Utc};
use replus_core::UserId;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::MutexGuard;

use crate::workouts::{format_timestamp, parse_timestamp};

/// A stored account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    /// PHC-format password hash.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Whether `err` is a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// User store with a borrowed connection.
pub struct Users<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Users<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert a new account. Fails with a unique violation if the username exists.
    pub fn create(
        &self,
        username: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, format_timestamp(&now)],
        )?;

        Ok(UserRecord {
            id: UserId(self.conn.last_insert_rowid()),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
                params![username],
                Self::row_to_record,
            )
            .optional()
    }

    /// Delete an account and, through cascades, everything it owns.
    pub fn delete(&self, id: UserId) -> Result<bool, rusqlite::Error> {
        let rows = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id.0])?;
        Ok(rows > 0)
    }

    pub fn issue_token(
        &self,
        user: UserId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user.0, format_timestamp(&now)],
        )?;
        Ok(())
    }

    /// Look up the account behind a token, with the time the token was issued.
    pub fn token_owner(
        &self,
        token: &str,
    ) -> Result<Option<(UserRecord, DateTime<Utc>)>, rusqlite::Error> {
        self.conn
            .query_row(
                r#"
                SELECT u.id, u.username, u.password_hash, u.created_at, t.created_at
                FROM auth_tokens t
                JOIN users u ON u.id = t.user_id
                WHERE t.token = ?1
                "#,
                params![token],
                |row| {
                    let user = Self::row_to_record(row)?;
                    let issued_at = parse_timestamp(row, 4)?;
                    Ok((user, issued_at))
                },
            )
            .optional()
    }

    pub fn revoke_token(&self, token: &str) -> Result<bool, rusqlite::Error> {
        let rows = self
            .conn
            .execute("DELETE FROM auth_tokens WHERE token = ?1", params![token])?;
        Ok(rows > 0)
    }

    /// Drop tokens issued before `cutoff`. Returns how many were removed.
    pub fn purge_tokens_before(&self, cutoff: DateTime<Utc>) -> Result<usize, rusqlite::Error> {
        // RFC 3339 strings in UTC sort chronologically.
        self.conn.execute(
            "DELETE FROM auth_tokens WHERE created_at < ?1",
            params![format_timestamp(&cutoff)],
        )
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<UserRecord, rusqlite::Error> {
        Ok(UserRecord {
            id: UserId(row.get(0)?),
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: parse_timestamp(row, 3)?,
        })
    }
}
