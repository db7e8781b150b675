use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{format_datetime, parse_datetime},
    models::User,
    Database,
};
use crate::timer::UserName;

fn row_to_user(row: &Row) -> Result<User> {
    let created_at: String = row.get("created_at")?;

    Ok(User {
        id: row.get("id")?,
        name: row.get("username")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Returns the user with this exact name, creating it on first use.
    pub async fn resolve_or_create_user(
        &self,
        name: &UserName,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let name = name.as_str().to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO users (username, created_at) VALUES (?1, ?2)
                 ON CONFLICT(username) DO NOTHING",
                params![name, format_datetime(&now)],
            )
            .context("failed to insert user")?;

            let user = conn
                .query_row(
                    "SELECT id, username, created_at FROM users WHERE username = ?1",
                    params![name],
                    |row| Ok(row_to_user(row)),
                )
                .with_context(|| format!("user '{name}' missing after insert"))??;
            Ok(user)
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
            )?;
            let user = stmt
                .query_row(params![user_id], |row| Ok(row_to_user(row)))
                .optional()?
                .transpose()?;
            Ok(user)
        })
        .await
    }

    /// Removes the user and, through the foreign key, all of their timers.
    pub async fn delete_user(&self, user_id: i64) -> Result<usize> {
        self.execute(move |conn| {
            let changed = conn
                .execute("DELETE FROM users WHERE id = ?1", params![user_id])
                .context("failed to delete user")?;
            Ok(changed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[tokio::test]
    async fn resolving_twice_returns_the_same_user() {
        let db = Database::in_memory().unwrap();
        let name = UserName::parse("alice").unwrap();

        let first = db.resolve_or_create_user(&name, at(0)).await.unwrap();
        let second = db.resolve_or_create_user(&name, at(5_000)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.created_at, at(0));
        assert_eq!(db.get_user(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let db = Database::in_memory().unwrap();
        let lower = db
            .resolve_or_create_user(&UserName::parse("bob").unwrap(), at(0))
            .await
            .unwrap();
        let upper = db
            .resolve_or_create_user(&UserName::parse("Bob").unwrap(), at(0))
            .await
            .unwrap();
        assert_ne!(lower.id, upper.id);
    }

    #[tokio::test]
    async fn unknown_user_is_absent() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_user(99).await.unwrap(), None);
        assert_eq!(db.delete_user(99).await.unwrap(), 0);
    }
}
