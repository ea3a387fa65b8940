//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Users & sessions
-- ============================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    password_salt TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('ADMIN', 'AFFILIATE', 'MEMBER')),
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

-- ============================================================
-- Affiliates
-- ============================================================

CREATE TABLE IF NOT EXISTS affiliate_profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
    affiliate_code TEXT NOT NULL UNIQUE,
    commission_rate INTEGER NOT NULL DEFAULT 10 CHECK (commission_rate >= 0),
    total_earnings INTEGER NOT NULL DEFAULT 0,
    total_conversions INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- ============================================================
-- Credit ledger
-- ============================================================

CREATE TABLE IF NOT EXISTS affiliate_credits (
    id TEXT PRIMARY KEY,
    affiliate_id TEXT NOT NULL UNIQUE REFERENCES affiliate_profiles(id),
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    total_top_up INTEGER NOT NULL DEFAULT 0,
    total_used INTEGER NOT NULL DEFAULT 0,
    total_refund INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS affiliate_credit_transactions (
    id TEXT PRIMARY KEY,
    credit_id TEXT NOT NULL REFERENCES affiliate_credits(id),
    affiliate_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('TOPUP', 'DEDUCT', 'REFUND')),
    amount INTEGER NOT NULL CHECK (amount > 0),
    balance_before INTEGER NOT NULL CHECK (balance_before >= 0),
    balance_after INTEGER NOT NULL CHECK (balance_after >= 0),
    description TEXT,
    reference_type TEXT CHECK (reference_type IN ('PACKAGE', 'ADMIN')),
    reference_id TEXT,
    status TEXT NOT NULL DEFAULT 'COMPLETED' CHECK (status = 'COMPLETED'),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_credit_tx_affiliate
    ON affiliate_credit_transactions(affiliate_id, created_at);

CREATE TRIGGER IF NOT EXISTS credit_tx_no_update
BEFORE UPDATE ON affiliate_credit_transactions
BEGIN
    SELECT RAISE(ABORT, 'credit transactions are immutable');
END;

CREATE TRIGGER IF NOT EXISTS credit_tx_no_delete
BEFORE DELETE ON affiliate_credit_transactions
BEGIN
    SELECT RAISE(ABORT, 'credit transactions are immutable');
END;

-- ============================================================
-- Wallets, commissions, revenue shares, payouts
-- ============================================================

CREATE TABLE IF NOT EXISTS wallets (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
    balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    balance_pending INTEGER NOT NULL DEFAULT 0 CHECK (balance_pending >= 0),
    total_earnings INTEGER NOT NULL DEFAULT 0,
    total_payout INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS wallet_transactions (
    id TEXT PRIMARY KEY,
    wallet_id TEXT NOT NULL REFERENCES wallets(id),
    amount INTEGER NOT NULL,
    type TEXT NOT NULL,
    description TEXT NOT NULL,
    reference TEXT,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_wallet_tx_wallet ON wallet_transactions(wallet_id, created_at);

CREATE TABLE IF NOT EXISTS affiliate_conversions (
    id TEXT PRIMARY KEY,
    transaction_id TEXT NOT NULL UNIQUE,
    affiliate_id TEXT NOT NULL REFERENCES affiliate_profiles(id),
    commission_amount INTEGER NOT NULL CHECK (commission_amount >= 0),
    commission_rate INTEGER NOT NULL,
    commission_type TEXT NOT NULL CHECK (commission_type IN ('PERCENTAGE', 'FLAT')),
    paid_out INTEGER NOT NULL DEFAULT 0,
    paid_out_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversions_affiliate ON affiliate_conversions(affiliate_id);
CREATE INDEX IF NOT EXISTS idx_conversions_paid ON affiliate_conversions(paid_out);

CREATE TABLE IF NOT EXISTS pending_revenue (
    id TEXT PRIMARY KEY,
    wallet_id TEXT NOT NULL REFERENCES wallets(id),
    transaction_id TEXT NOT NULL,
    amount INTEGER NOT NULL CHECK (amount > 0),
    type TEXT NOT NULL CHECK (type IN ('ADMIN_FEE', 'FOUNDER_SHARE', 'COFOUNDER_SHARE')),
    percentage INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING',
    adjusted_amount INTEGER,
    note TEXT,
    approved_by TEXT,
    approved_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_revenue_status ON pending_revenue(status);

CREATE TABLE IF NOT EXISTS payouts (
    id TEXT PRIMARY KEY,
    wallet_id TEXT NOT NULL REFERENCES wallets(id),
    amount INTEGER NOT NULL CHECK (amount > 0),
    admin_fee INTEGER NOT NULL DEFAULT 0,
    net_amount INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'PENDING' CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
    notes TEXT,
    rejected_reason TEXT,
    processed_by TEXT,
    processed_at INTEGER,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payouts_wallet ON payouts(wallet_id);
CREATE INDEX IF NOT EXISTS idx_payouts_status ON payouts(status);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
