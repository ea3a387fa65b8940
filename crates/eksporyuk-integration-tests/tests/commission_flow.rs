//! Integration test: money flow from a sale to a withdrawal.
//!
//! Exercises the complete commission lifecycle:
//! 1. Book sales with and without a referring affiliate
//! 2. Verify every rupiah of each sale is accounted for
//! 3. Approve, adjust and reject the platform's pending shares
//! 4. Pay commissions out of the affiliate wallet
//! 5. Request, approve and reject withdrawals
//! 6. Verify the wallet summaries at the end

use eksporyuk_db::queries::{affiliates, revenue as revenue_q, users, wallets};
use eksporyuk_ledger::commission::{self, Recipients, Sale, DEFAULT_SPLIT};
use eksporyuk_ledger::{payout, revenue, wallet, LedgerError};
use eksporyuk_types::affiliate::CommissionType;
use eksporyuk_types::payout::PayoutStatus;
use eksporyuk_types::revenue::{PendingRevenueStatus, RevenueShareType};
use eksporyuk_types::user::Role;
use eksporyuk_types::wallet::WalletTxType;

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

fn make_user(conn: &rusqlite::Connection, email: &str, role: Role) -> String {
    users::insert(
        conn,
        &users::NewUser {
            email,
            name: email,
            role,
            password_hash: "hash",
            password_salt: "salt",
        },
        BASE_TIME,
    )
    .expect("user insertion should succeed")
    .id
}

fn sale(
    id: &str,
    amount: i64,
    affiliate_id: Option<&str>,
    kind: CommissionType,
    rate: Option<i64>,
) -> Sale {
    Sale {
        transaction_id: id.to_string(),
        amount,
        affiliate_id: affiliate_id.map(str::to_string),
        commission_rate: rate,
        commission_type: kind,
    }
}

#[test]
fn sale_to_withdrawal() {
    let mut conn = eksporyuk_db::open_memory().expect("open DB");

    // =========================================================
    // Setup: three platform recipients and one affiliate (10%)
    // =========================================================
    let recipients = Recipients {
        admin_user_id: make_user(&conn, "admin@eksporyuk.id", Role::Admin),
        founder_user_id: make_user(&conn, "founder@eksporyuk.id", Role::Admin),
        cofounder_user_id: make_user(&conn, "cofounder@eksporyuk.id", Role::Admin),
    };
    let affiliate_user = make_user(&conn, "rina@x.id", Role::Affiliate);
    let affiliate = affiliates::insert(&conn, &affiliate_user, "RINA", 10, BASE_TIME)
        .expect("affiliate insertion should succeed");

    // =========================================================
    // Step 1: book three sales
    // =========================================================
    let sales = [
        sale("INV-001", 1_500_000, Some(&affiliate.id), CommissionType::Percentage, None),
        sale("INV-002", 299_999, Some(&affiliate.id), CommissionType::Flat, Some(50_000)),
        sale("INV-003", 777_777, None, CommissionType::Percentage, None),
    ];
    let mut affiliate_total = 0;
    for (i, s) in sales.iter().enumerate() {
        let at = BASE_TIME + i as u64;
        let outcome = commission::record_sale(&mut conn, s, &recipients, &DEFAULT_SPLIT, at)
            .expect("sale should be recorded");

        // Step 2: every rupiah accounted for.
        let pending: i64 = outcome.pending_revenue.iter().map(|r| r.amount).sum();
        let commission = outcome.conversion.as_ref().map_or(0, |c| c.commission_amount);
        assert_eq!(pending + commission, s.amount, "sale {}", s.transaction_id);
        assert_eq!(outcome.breakdown.distributed(), s.amount);
        affiliate_total += commission;
    }
    assert_eq!(affiliate_total, 150_000 + 50_000);

    let err =
        commission::record_sale(&mut conn, &sales[0], &recipients, &DEFAULT_SPLIT, BASE_TIME + 10)
            .expect_err("a sale is booked once");
    assert!(matches!(err, LedgerError::Conflict(_)));

    let aff_wallet = wallets::find_by_user(&conn, &affiliate_user)
        .expect("find")
        .expect("affiliate wallet");
    assert_eq!(aff_wallet.balance, 200_000);
    let profile = affiliates::get(&conn, &affiliate.id).expect("profile");
    assert_eq!(profile.total_conversions, 2);
    assert_eq!(profile.total_earnings, 200_000);

    // =========================================================
    // Step 3: settle the platform shares of INV-001
    // =========================================================
    let shares = revenue_q::for_transaction(&conn, "INV-001").expect("shares");
    assert_eq!(shares.len(), 3);
    let find = |t: RevenueShareType| {
        shares
            .iter()
            .find(|r| r.share_type == t)
            .expect("share exists")
            .clone()
    };
    let admin_fee = find(RevenueShareType::AdminFee);
    let founder = find(RevenueShareType::FounderShare);
    let cofounder = find(RevenueShareType::CofounderShare);
    // 1 500 000 - 150 000 = 1 350 000; 15% = 202 500; rest 1 147 500 → 688 500 / 459 000
    assert_eq!(admin_fee.amount, 202_500);
    assert_eq!(founder.amount, 688_500);
    assert_eq!(cofounder.amount, 459_000);

    let admin_id = recipients.admin_user_id.clone();
    revenue::approve(&mut conn, &admin_fee.id, &admin_id, None, None, BASE_TIME + 20)
        .expect("approve");
    let adjusted = revenue::approve(
        &mut conn,
        &founder.id,
        &recipients.admin_user_id,
        Some(600_000),
        Some("partial refund to buyer"),
        BASE_TIME + 21,
    )
    .expect("approve adjusted");
    assert_eq!(adjusted.status, PendingRevenueStatus::Adjusted);
    revenue::reject(&mut conn, &cofounder.id, &admin_id, "chargeback", BASE_TIME + 22)
        .expect("reject");

    let founder_summary = wallet::summary(&conn, &recipients.founder_user_id).expect("summary");
    assert_eq!(founder_summary.balance, 600_000);
    let inv3_founder: i64 = revenue_q::for_transaction(&conn, "INV-003")
        .expect("shares")
        .iter()
        .chain(revenue_q::for_transaction(&conn, "INV-002").expect("shares").iter())
        .filter(|r| r.share_type == RevenueShareType::FounderShare)
        .map(|r| r.amount)
        .sum();
    assert_eq!(founder_summary.balance_pending, inv3_founder);

    // =========================================================
    // Step 4: pay the INV-001 commission out of the wallet
    // =========================================================
    let conv = eksporyuk_db::queries::conversions::find_by_transaction(&conn, "INV-001")
        .expect("find")
        .expect("conversion");
    let report = commission::mark_paid(
        &mut conn,
        &[conv.id.clone()],
        &recipients.admin_user_id,
        Some("transfer 2024-05"),
        BASE_TIME + 30,
    )
    .expect("mark paid");
    assert_eq!(report.total_paid, 150_000);
    assert!(report.failed.is_empty());

    // =========================================================
    // Step 5: withdrawals
    // =========================================================
    let first = payout::request(&mut conn, &affiliate_user, 50_000, None, BASE_TIME + 40)
        .expect("request within balance");
    let err = payout::request(&mut conn, &affiliate_user, 50_000, None, BASE_TIME + 41)
        .expect_err("held amount is no longer available");
    assert!(matches!(err, LedgerError::InsufficientBalance { available: 0, .. }));

    payout::reject(&mut conn, &first.id, &recipients.admin_user_id, "wrong bank", BASE_TIME + 42)
        .expect("reject");
    let second = payout::request(&mut conn, &affiliate_user, 50_000, None, BASE_TIME + 43)
        .expect("request after refund");
    let approved = payout::approve(&mut conn, &second.id, &recipients.admin_user_id, BASE_TIME + 44)
        .expect("approve");
    assert_eq!(approved.status, PayoutStatus::Approved);
    let err = payout::reject(&mut conn, &second.id, &admin_id, "late", BASE_TIME + 45)
        .expect_err("processed once");
    assert!(matches!(err, LedgerError::Conflict(_)));

    // =========================================================
    // Step 6: final affiliate wallet
    // =========================================================
    let summary = wallet::summary(&conn, &affiliate_user).expect("summary");
    assert_eq!(summary.balance, 0);
    assert_eq!(summary.total_earnings, 200_000);
    assert_eq!(summary.total_payout, 150_000 + 50_000);
    assert_eq!(summary.payouts.len(), 2);
    let kinds: Vec<WalletTxType> = summary.transactions.iter().map(|t| t.tx_type).collect();
    assert_eq!(
        kinds,
        vec![
            WalletTxType::Payout,
            WalletTxType::Refund,
            WalletTxType::Payout,
            WalletTxType::Payout,
            WalletTxType::Commission,
            WalletTxType::Commission,
        ]
    );
    let net: i64 = summary.transactions.iter().map(|t| t.amount).sum();
    assert_eq!(net, summary.balance);
}

#[test]
fn split_rounding_never_loses_money() {
    for amount in [1, 2, 3, 99, 100, 101, 333_333, 1_000_001] {
        for rate in [0, 1, 7, 10, 33, 50, 99, 100] {
            let b = commission::calculate(amount, rate, CommissionType::Percentage, &DEFAULT_SPLIT)
                .expect("calculate");
            assert_eq!(b.distributed(), amount, "amount {amount} rate {rate}");
            assert!(b.admin_fee >= 0 && b.founder_share >= 0 && b.cofounder_share >= 0);
        }
    }
}
