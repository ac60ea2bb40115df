//! # User Repository
//!
//! Database operations for users. Only [`UserRepository::find_credentials_by_username`]
//! is meant for credential checks; everything handed to clients should be
//! converted with `User::profile()`.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockroom_core::{NewUser, User, UserChanges, UserRole};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user whose password was already hashed by `NewUser::create`.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - Username or email taken
    pub async fn insert(&self, user: &NewUser) -> DbResult<User> {
        debug!(username = %user.username, role = %user.role, "Inserting user");

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_user_error(e, &user.username, &user.email))?;

        Ok(User {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    /// Looks up a user, hash included, for login.
    pub async fn find_credentials_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))
                .bind(username.trim())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(User::from))
    }

    /// All users, sorted by role then username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY role, username"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Applies validated changes. The hash column changes only when
    /// `changes.password_hash` is set.
    pub async fn update(&self, id: &str, changes: &UserChanges) -> DbResult<User> {
        debug!(id = %id, rehash = changes.password_hash.is_some(), "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = COALESCE(?2, username),
                email = COALESCE(?3, email),
                password_hash = COALESCE(?4, password_hash),
                role = COALESCE(?5, role),
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.email)
        .bind(&changes.password_hash)
        .bind(changes.role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            duplicate_user_error(
                e,
                changes.username.as_deref().unwrap_or_default(),
                changes.email.as_deref().unwrap_or_default(),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Removes a user.
    ///
    /// Fails with `ForeignKeyViolation` while products or sales reference
    /// the account.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn duplicate_user_error(err: sqlx::Error, username: &str, email: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } => {
            let value = if field == "email" { email } else { username };
            DbError::duplicate(field, value)
        }
        other => other,
    }
}
