//! User account queries.

use eksporyuk_types::user::{Role, UserView};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{constraint_or, enum_col, new_id, ts_col, DbError, Result};

/// A full user row, including password material.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: u64,
}

impl UserRow {
    /// The credential-free view handed to clients.
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Fields needed to create a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub role: Role,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
}

const COLUMNS: &str = "id, email, name, role, password_hash, password_salt, created_at";

pub(crate) fn map_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: enum_col(row, 3)?,
        password_hash: row.get(4)?,
        password_salt: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

/// Insert a user. Fails with [`DbError::Constraint`] if the email is taken.
pub fn insert(conn: &Connection, user: &NewUser<'_>, now: u64) -> Result<UserRow> {
    let id = new_id();
    conn.execute(
        "INSERT INTO users (id, email, name, role, password_hash, password_salt, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            id,
            user.email,
            user.name,
            user.role.as_str(),
            user.password_hash,
            user.password_salt,
            now as i64,
        ],
    )
    .map_err(|e| constraint_or(e, "email already registered"))?;
    get(conn, &id)
}

/// Get a user by id.
pub fn get(conn: &Connection, id: &str) -> Result<UserRow> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("user {id}")))
}

/// Find a user by email (case-insensitive).
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
            [email],
            map_row,
        )
        .optional()?)
}

/// Change a user's role.
pub fn set_role(conn: &Connection, id: &str, role: Role) -> Result<()> {
    let updated = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        rusqlite::params![role.as_str(), id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("user {id}")));
    }
    Ok(())
}

/// Number of users holding `role`.
pub fn count_with_role(conn: &Connection, role: Role) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        [role.as_str()],
        |row| row.get(0),
    )?)
}
