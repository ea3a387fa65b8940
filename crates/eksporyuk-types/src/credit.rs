//! Affiliate credit ledger types.
//!
//! Credits are an internal, non-monetary balance spent by affiliate
//! automation features (e.g. one credit per automated email). Each
//! affiliate owns at most one [`CreditAccount`]; every change to it is
//! recorded as an immutable [`CreditTransaction`].

use serde::{Deserialize, Serialize};

use crate::{AffiliateId, Id};

/// Kind of balance change recorded in the credit log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTxType {
    /// Credits purchased or granted.
    Topup,
    /// Credits consumed.
    Deduct,
    /// Previously consumed credits returned.
    Refund,
}

crate::string_enum!(CreditTxType {
    Topup => "TOPUP",
    Deduct => "DEDUCT",
    Refund => "REFUND",
});

/// Status of a credit log row. Postings settle inside their own database
/// transaction, so every stored row is `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreditTxStatus {
    Completed,
}

crate::string_enum!(CreditTxStatus {
    Completed => "COMPLETED",
});

/// What caused a credit posting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    /// Self-service purchase of a credit package.
    Package,
    /// Manual adjustment by an admin.
    Admin,
}

crate::string_enum!(ReferenceType {
    Package => "PACKAGE",
    Admin => "ADMIN",
});

/// Per-affiliate credit balance and lifetime totals.
///
/// Invariant: `balance == total_top_up + total_refund - total_used` and
/// `balance >= 0`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditAccount {
    pub id: Id,
    pub affiliate_id: AffiliateId,
    pub balance: i64,
    pub total_top_up: i64,
    pub total_used: i64,
    pub total_refund: i64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl CreditAccount {
    /// Whether the lifetime totals reconcile with the balance.
    pub fn is_balanced(&self) -> bool {
        self.balance >= 0 && self.balance == self.total_top_up + self.total_refund - self.total_used
    }
}

/// Immutable record of a single credit balance change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub id: Id,
    pub credit_id: Id,
    pub affiliate_id: AffiliateId,
    #[serde(rename = "type")]
    pub tx_type: CreditTxType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    pub status: CreditTxStatus,
    pub created_at: u64,
}

/// A purchasable bundle of credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackage {
    pub name: &'static str,
    pub credits: i64,
    /// Price in Rupiah.
    pub price: i64,
}

/// The credit package catalogue, cheapest first.
pub const CREDIT_PACKAGES: [CreditPackage; 5] = [
    CreditPackage { name: "Starter", credits: 70, price: 50_000 },
    CreditPackage { name: "Basic", credits: 150, price: 100_000 },
    CreditPackage { name: "Professional", credits: 400, price: 250_000 },
    CreditPackage { name: "Business", credits: 900, price: 500_000 },
    CreditPackage { name: "Enterprise", credits: 2_000, price: 1_000_000 },
];

/// Look up a package by name, case-insensitively.
pub fn find_package(name: &str) -> Option<&'static CreditPackage> {
    CREDIT_PACKAGES
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Aggregate figures across all credit accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditStats {
    pub total_balance: i64,
    pub total_top_up: i64,
    pub total_used: i64,
    pub total_affiliates: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_package_case_insensitive() {
        let pkg = find_package("basic").expect("basic exists");
        assert_eq!(pkg.credits, 150);
        assert_eq!(pkg.price, 100_000);
        assert!(find_package("platinum").is_none());
    }

    #[test]
    fn test_packages_get_cheaper_per_credit() {
        for pair in CREDIT_PACKAGES.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            // price/credits strictly decreasing, compared without division
            assert!(b.price * a.credits < a.price * b.credits, "{} vs {}", a.name, b.name);
        }
    }

    #[test]
    fn test_transaction_type_serializes_as_type() {
        let tx = CreditTransaction {
            id: "t1".into(),
            credit_id: "c1".into(),
            affiliate_id: "a1".into(),
            tx_type: CreditTxType::Topup,
            amount: 100,
            balance_before: 0,
            balance_after: 100,
            description: None,
            reference_type: Some(ReferenceType::Admin),
            reference_id: None,
            status: CreditTxStatus::Completed,
            created_at: 1,
        };
        let json = serde_json::to_value(&tx).expect("serialize");
        assert_eq!(json["type"], "TOPUP");
        assert_eq!(json["balanceAfter"], 100);
        assert_eq!(json["referenceType"], "ADMIN");
    }

    #[test]
    fn test_is_balanced() {
        let mut account = CreditAccount {
            id: "c1".into(),
            affiliate_id: "a1".into(),
            balance: 70,
            total_top_up: 100,
            total_used: 40,
            total_refund: 10,
            created_at: 0,
            updated_at: 0,
        };
        assert!(account.is_balanced());
        account.balance = 71;
        assert!(!account.is_balanced());
    }
}
