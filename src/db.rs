use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    bank_name TEXT NOT NULL,
    account_number TEXT,
    account_holder TEXT,
    current_balance TEXT,
    balance_source TEXT NOT NULL DEFAULT 'unknown',
    balance_confidence TEXT NOT NULL DEFAULT 'low',
    last_balance_update_at TEXT,
    account_type TEXT NOT NULL DEFAULT 'bank',
    created_from_sms INTEGER NOT NULL DEFAULT 1,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_identity
    ON accounts(user_id, bank_name, account_number)
    WHERE account_number IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_accounts_user_bank ON accounts(user_id, bank_name);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    amount TEXT NOT NULL,
    original_amount TEXT NOT NULL,
    net_amount TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'unknown',
    merchant TEXT NOT NULL DEFAULT 'UNKNOWN',
    receiver_name TEXT,
    sender_name TEXT,
    bank_name TEXT NOT NULL,
    account_number TEXT,
    raw_message TEXT NOT NULL,
    dedup_hash TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL DEFAULT 'sms',
    transaction_time TEXT NOT NULL,
    received_time TEXT NOT NULL,
    time_confidence TEXT NOT NULL DEFAULT 'estimated',
    category TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    notes TEXT,
    is_refund_of INTEGER REFERENCES transactions(id),
    refund_linked_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_txn_refund_once
    ON transactions(is_refund_of)
    WHERE is_refund_of IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_txn_user_time ON transactions(user_id, transaction_time);
CREATE INDEX IF NOT EXISTS idx_txn_user_type ON transactions(user_id, type);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    parent_category TEXT NOT NULL DEFAULT 'Other',
    keywords TEXT NOT NULL DEFAULT '[]',
    merchant_patterns TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, name)
);

CREATE TABLE IF NOT EXISTS api_keys (
    api_key TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
