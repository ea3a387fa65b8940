//! Affiliate conversion (commission) queries.

use eksporyuk_types::affiliate::{AffiliateConversion, ConversionStats, DailyTotal, PaidFilter};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{constraint_or, enum_col, opt_ts_col, ts_col, Result};

const COLUMNS: &str = "id, transaction_id, affiliate_id, commission_amount, commission_rate,
     commission_type, paid_out, paid_out_at, created_at";

fn map_row(row: &Row<'_>) -> rusqlite::Result<AffiliateConversion> {
    Ok(AffiliateConversion {
        id: row.get(0)?,
        transaction_id: row.get(1)?,
        affiliate_id: row.get(2)?,
        commission_amount: row.get(3)?,
        commission_rate: row.get(4)?,
        commission_type: enum_col(row, 5)?,
        paid_out: row.get(6)?,
        paid_out_at: opt_ts_col(row, 7)?,
        created_at: ts_col(row, 8)?,
    })
}

/// Which conversions to list.
#[derive(Debug, Clone, Default)]
pub struct ConversionFilter {
    pub affiliate_id: Option<String>,
    pub paid: PaidFilter,
    /// Only conversions created at or after this time.
    pub since: Option<u64>,
    /// Only conversions created before this time.
    pub until: Option<u64>,
    /// Case-insensitive substring of the sale id, or of the affiliate's
    /// code, email or name.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl ConversionFilter {
    /// `LIKE` pattern for [`Self::search`], with wildcards escaped.
    fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let mut pattern = String::with_capacity(term.len() + 2);
        pattern.push('%');
        for c in term.chars() {
            if matches!(c, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('%');
        Some(pattern)
    }
}

const FILTER: &str = "(?1 IS NULL OR affiliate_id = ?1)
     AND (?2 IS NULL OR paid_out = ?2)
     AND (?3 IS NULL OR created_at >= ?3)
     AND (?4 IS NULL OR created_at < ?4)
     AND (?5 IS NULL
          OR transaction_id LIKE ?5 ESCAPE '\\'
          OR affiliate_id IN (
              SELECT p.id FROM affiliate_profiles p JOIN users u ON u.id = p.user_id
              WHERE p.affiliate_code LIKE ?5 ESCAPE '\\'
                 OR u.email LIKE ?5 ESCAPE '\\'
                 OR u.name LIKE ?5 ESCAPE '\\'))";

/// Record a conversion. A second conversion for the same sale fails with
/// [`crate::DbError::Constraint`].
pub fn insert(conn: &Connection, conversion: &AffiliateConversion) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO affiliate_conversions ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
        ),
        rusqlite::params![
            conversion.id,
            conversion.transaction_id,
            conversion.affiliate_id,
            conversion.commission_amount,
            conversion.commission_rate,
            conversion.commission_type.as_str(),
            conversion.paid_out,
            conversion.paid_out_at.map(|t| t as i64),
            conversion.created_at as i64,
        ],
    )
    .map_err(|e| constraint_or(e, "sale already has a conversion"))?;
    Ok(())
}

/// Find the conversion recorded for a sale.
pub fn find_by_transaction(
    conn: &Connection,
    transaction_id: &str,
) -> Result<Option<AffiliateConversion>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM affiliate_conversions WHERE transaction_id = ?1"),
            [transaction_id],
            map_row,
        )
        .optional()?)
}

/// Conversions matching `filter`, newest first.
pub fn list(conn: &Connection, filter: &ConversionFilter) -> Result<Vec<AffiliateConversion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM affiliate_conversions WHERE {FILTER}
         ORDER BY created_at DESC, rowid DESC LIMIT ?6 OFFSET ?7"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                filter.affiliate_id,
                filter.paid.paid_out(),
                filter.since.map(|t| t as i64),
                filter.until.map(|t| t as i64),
                filter.search_pattern(),
                filter.limit,
                filter.offset,
            ],
            map_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Number of conversions matching `filter` (ignores limit/offset).
pub fn count(conn: &Connection, filter: &ConversionFilter) -> Result<i64> {
    Ok(conn.query_row(
        &format!("SELECT COUNT(*) FROM affiliate_conversions WHERE {FILTER}"),
        rusqlite::params![
            filter.affiliate_id,
            filter.paid.paid_out(),
            filter.since.map(|t| t as i64),
            filter.until.map(|t| t as i64),
            filter.search_pattern(),
        ],
        |row| row.get(0),
    )?)
}

/// Paid / unpaid totals, optionally for one affiliate and time window.
/// The paid flag and search term of `filter` are ignored.
pub fn stats(conn: &Connection, filter: &ConversionFilter) -> Result<ConversionStats> {
    Ok(conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(commission_amount), 0),
                COALESCE(SUM(CASE WHEN paid_out = 1 THEN commission_amount END), 0),
                COALESCE(SUM(CASE WHEN paid_out = 0 THEN commission_amount END), 0),
                COALESCE(SUM(paid_out = 1), 0),
                COALESCE(SUM(paid_out = 0), 0)
         FROM affiliate_conversions
         WHERE (?1 IS NULL OR affiliate_id = ?1)
           AND (?2 IS NULL OR created_at >= ?2)
           AND (?3 IS NULL OR created_at < ?3)",
        rusqlite::params![
            filter.affiliate_id,
            filter.since.map(|t| t as i64),
            filter.until.map(|t| t as i64),
        ],
        |row| {
            Ok(ConversionStats {
                total_commissions: row.get(0)?,
                total_amount: row.get(1)?,
                paid_amount: row.get(2)?,
                unpaid_amount: row.get(3)?,
                paid_count: row.get(4)?,
                unpaid_count: row.get(5)?,
            })
        },
    )?)
}

/// Commission booked per UTC day since `since`, oldest day first.
/// Days without conversions are absent.
pub fn daily_totals(
    conn: &Connection,
    affiliate_id: Option<&str>,
    since: u64,
) -> Result<Vec<DailyTotal>> {
    let mut stmt = conn.prepare(
        "SELECT date(created_at, 'unixepoch') AS day,
                COALESCE(SUM(commission_amount), 0),
                COUNT(*)
         FROM affiliate_conversions
         WHERE (?1 IS NULL OR affiliate_id = ?1) AND created_at >= ?2
         GROUP BY day
         ORDER BY day",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![affiliate_id, since as i64], |row| {
            Ok(DailyTotal {
                date: row.get(0)?,
                amount: row.get(1)?,
                count: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The subset of `ids` that exist and are not yet paid out.
pub fn unpaid_by_ids(conn: &Connection, ids: &[String]) -> Result<Vec<AffiliateConversion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM affiliate_conversions WHERE id = ?1 AND paid_out = 0"
    ))?;
    let mut found = Vec::new();
    for id in ids {
        if let Some(conv) = stmt.query_row([id], map_row).optional()? {
            found.push(conv);
        }
    }
    Ok(found)
}

/// Flag conversions as paid. Already-paid rows are left untouched.
/// Returns how many rows changed.
pub fn mark_paid(conn: &Connection, ids: &[String], now: u64) -> Result<usize> {
    let mut stmt = conn.prepare(
        "UPDATE affiliate_conversions SET paid_out = 1, paid_out_at = ?1
         WHERE id = ?2 AND paid_out = 0",
    )?;
    let mut changed = 0;
    for id in ids {
        changed += stmt.execute(rusqlite::params![now as i64, id])?;
    }
    Ok(changed)
}
