//! Wallet & wallet transaction queries.

use eksporyuk_types::wallet::{Wallet, WalletTransaction, WalletTxType};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{enum_col, new_id, ts_col, DbError, Result};

const COLUMNS: &str =
    "id, user_id, balance, balance_pending, total_earnings, total_payout, created_at, updated_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: row.get(0)?,
        user_id: row.get(1)?,
        balance: row.get(2)?,
        balance_pending: row.get(3)?,
        total_earnings: row.get(4)?,
        total_payout: row.get(5)?,
        created_at: ts_col(row, 6)?,
        updated_at: ts_col(row, 7)?,
    })
}

fn map_tx(row: &Row<'_>) -> rusqlite::Result<WalletTransaction> {
    Ok(WalletTransaction {
        id: row.get(0)?,
        wallet_id: row.get(1)?,
        amount: row.get(2)?,
        tx_type: enum_col(row, 3)?,
        description: row.get(4)?,
        reference: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

/// Find the wallet owned by a user.
pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Option<Wallet>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM wallets WHERE user_id = ?1"),
            [user_id],
            map_row,
        )
        .optional()?)
}

/// Get a wallet by id.
pub fn get(conn: &Connection, id: &str) -> Result<Wallet> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM wallets WHERE id = ?1"),
        [id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("wallet {id}")))
}

/// Return the user's wallet, creating an empty one first if needed.
pub fn ensure(conn: &Connection, user_id: &str, now: u64) -> Result<Wallet> {
    conn.execute(
        "INSERT OR IGNORE INTO wallets (id, user_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        rusqlite::params![new_id(), user_id, now as i64],
    )?;
    find_by_user(conn, user_id)?.ok_or_else(|| DbError::NotFound(format!("wallet of {user_id}")))
}

/// Persist balances and totals of an existing wallet.
pub fn update(conn: &Connection, wallet: &Wallet) -> Result<()> {
    let updated = conn.execute(
        "UPDATE wallets
         SET balance = ?1, balance_pending = ?2, total_earnings = ?3, total_payout = ?4,
             updated_at = ?5
         WHERE id = ?6",
        rusqlite::params![
            wallet.balance,
            wallet.balance_pending,
            wallet.total_earnings,
            wallet.total_payout,
            wallet.updated_at as i64,
            wallet.id,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("wallet {}", wallet.id)));
    }
    Ok(())
}

/// Append a wallet movement.
pub fn insert_transaction(
    conn: &Connection,
    wallet_id: &str,
    amount: i64,
    tx_type: WalletTxType,
    description: &str,
    reference: Option<&str>,
    now: u64,
) -> Result<WalletTransaction> {
    let tx = WalletTransaction {
        id: new_id(),
        wallet_id: wallet_id.to_string(),
        amount,
        tx_type,
        description: description.to_string(),
        reference: reference.map(str::to_string),
        created_at: now,
    };
    conn.execute(
        "INSERT INTO wallet_transactions
             (id, wallet_id, amount, type, description, reference, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            tx.id,
            tx.wallet_id,
            tx.amount,
            tx.tx_type.as_str(),
            tx.description,
            tx.reference,
            now as i64,
        ],
    )?;
    Ok(tx)
}

/// Most recent wallet movements, newest first.
pub fn recent_transactions(
    conn: &Connection,
    wallet_id: &str,
    limit: u32,
) -> Result<Vec<WalletTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, wallet_id, amount, type, description, reference, created_at
         FROM wallet_transactions WHERE wallet_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![wallet_id, limit], map_tx)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::users;
    use eksporyuk_types::user::Role;

    fn setup() -> (Connection, String) {
        let conn = crate::open_memory().expect("open test db");
        let user = users::insert(
            &conn,
            &users::NewUser {
                email: "w@example.com",
                name: "W",
                role: Role::Affiliate,
                password_hash: "h",
                password_salt: "s",
            },
            1,
        )
        .expect("user");
        (conn, user.id)
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let (conn, user_id) = setup();
        let first = ensure(&conn, &user_id, 10).expect("ensure");
        let second = ensure(&conn, &user_id, 20).expect("ensure again");
        assert_eq!(first.id, second.id);
        assert_eq!(second.created_at, 10);
        assert_eq!(second.balance, 0);
    }

    #[test]
    fn test_update_and_history() {
        let (conn, user_id) = setup();
        let mut wallet = ensure(&conn, &user_id, 10).expect("ensure");
        wallet.balance = 1_000;
        wallet.total_earnings = 1_000;
        update(&conn, &wallet).expect("update");
        insert_transaction(&conn, &wallet.id, 1_000, WalletTxType::Commission, "c", Some("T1"), 11)
            .expect("tx");
        insert_transaction(&conn, &wallet.id, -400, WalletTxType::Payout, "p", None, 12)
            .expect("tx");

        assert_eq!(get(&conn, &wallet.id).expect("get").balance, 1_000);
        let history = recent_transactions(&conn, &wallet.id, 10).expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].tx_type, WalletTxType::Payout);
        assert_eq!(history[0].amount, -400);
        assert_eq!(history[1].reference.as_deref(), Some("T1"));
    }

    #[test]
    fn test_negative_balance_rejected_by_schema() {
        let (conn, user_id) = setup();
        let mut wallet = ensure(&conn, &user_id, 10).expect("ensure");
        wallet.balance = -5;
        assert!(update(&conn, &wallet).is_err());
    }
}
