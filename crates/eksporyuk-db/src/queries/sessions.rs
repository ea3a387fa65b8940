//! Login session queries. Only a hash of the session token is stored.

use rusqlite::{Connection, OptionalExtension};

use super::users::{map_row, UserRow};
use crate::Result;

/// Store a new session.
pub fn insert(
    conn: &Connection,
    token_hash: &str,
    user_id: &str,
    created_at: u64,
    expires_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![token_hash, user_id, created_at as i64, expires_at as i64],
    )?;
    Ok(())
}

/// Resolve an unexpired session to its user.
pub fn find_user(conn: &Connection, token_hash: &str, now: u64) -> Result<Option<UserRow>> {
    Ok(conn
        .query_row(
            "SELECT u.id, u.email, u.name, u.role, u.password_hash, u.password_salt, u.created_at
             FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token_hash = ?1 AND s.expires_at > ?2",
            rusqlite::params![token_hash, now as i64],
            map_row,
        )
        .optional()?)
}

/// Drop a session. Returns whether one existed.
pub fn delete(conn: &Connection, token_hash: &str) -> Result<bool> {
    let removed = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
    Ok(removed > 0)
}

/// Remove all sessions that expired at or before `now`.
pub fn purge_expired(conn: &Connection, now: u64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now as i64])?;
    if removed > 0 {
        tracing::debug!(removed, "purged expired sessions");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users::{self, NewUser};
    use eksporyuk_types::user::Role;

    fn setup() -> (Connection, String) {
        let conn = crate::open_memory().expect("open test db");
        let user = users::insert(
            &conn,
            &NewUser {
                email: "a@example.com",
                name: "A",
                role: Role::Admin,
                password_hash: "h",
                password_salt: "s",
            },
            1,
        )
        .expect("insert user");
        (conn, user.id)
    }

    #[test]
    fn test_session_lookup_respects_expiry() {
        let (conn, user_id) = setup();
        insert(&conn, "tok", &user_id, 100, 200).expect("insert");

        let user = find_user(&conn, "tok", 150).expect("find").expect("active");
        assert_eq!(user.id, user_id);
        assert!(find_user(&conn, "tok", 200).expect("find").is_none());
        assert!(find_user(&conn, "other", 150).expect("find").is_none());
    }

    #[test]
    fn test_delete_and_purge() {
        let (conn, user_id) = setup();
        insert(&conn, "a", &user_id, 100, 200).expect("insert");
        insert(&conn, "b", &user_id, 100, 300).expect("insert");

        assert!(delete(&conn, "a").expect("delete"));
        assert!(!delete(&conn, "a").expect("delete again"));

        assert_eq!(purge_expired(&conn, 300).expect("purge"), 1);
        assert!(find_user(&conn, "b", 150).expect("find").is_none());
    }
}
