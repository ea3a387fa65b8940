//! # eksporyuk-types
//!
//! Shared domain types used across the Eksporyuk workspace.
//!
//! All monetary values are whole Rupiah and all credit values are whole
//! credits, both carried as `i64` so they map directly onto SQLite
//! `INTEGER` columns. Timestamps are Unix epoch seconds.

/// Opaque row identifier (lowercase hex).
pub type Id = String;
pub type UserId = Id;
pub type AffiliateId = Id;
pub type WalletId = Id;

/// Default affiliate commission rate in percent.
pub const DEFAULT_COMMISSION_RATE: i64 = 10;

/// Default minimum withdrawal amount (Rupiah).
pub const DEFAULT_WITHDRAWAL_MIN_AMOUNT: i64 = 50_000;

/// Default flat admin fee charged per withdrawal (Rupiah).
pub const DEFAULT_WITHDRAWAL_ADMIN_FEE: i64 = 5_000;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Error returned when a stored enum string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum using
/// the same upper-case spelling the JSON API and the database use.
macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical upper-case spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err($crate::ParseEnumError {
                        kind: stringify!($ty),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

pub mod affiliate;
pub mod credit;
pub mod payout;
pub mod revenue;
pub mod user;
pub mod wallet;
