use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::error::{PaisaError, Result};
use crate::models::{
    Account, AccountType, BalanceSource, CategoryRule, Confidence, TimeConfidence, Transaction,
    TxnType,
};

// ---------------------------------------------------------------------------
// Column helpers: decimals and timestamps live in SQLite as text
// ---------------------------------------------------------------------------

pub fn to_sql_decimal(d: &Decimal) -> String {
    d.normalize().to_string()
}

pub fn to_sql_ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn dec_col(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn dec_col_opt(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        s.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn ts_col_opt(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn list_col(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn list_json(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

const ACCOUNT_COLS: &str = "id, user_id, bank_name, account_number, account_holder, \
     current_balance, balance_source, balance_confidence, last_balance_update_at, \
     account_type, created_from_sms, is_active, created_at, updated_at";

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bank_name: row.get(2)?,
        account_number: row.get(3)?,
        account_holder: row.get(4)?,
        current_balance: dec_col_opt(row, 5)?,
        balance_source: BalanceSource::parse(&row.get::<_, String>(6)?),
        balance_confidence: Confidence::parse(&row.get::<_, String>(7)?),
        last_balance_update_at: ts_col_opt(row, 8)?,
        account_type: AccountType::parse(&row.get::<_, String>(9)?),
        created_from_sms: row.get(10)?,
        is_active: row.get(11)?,
        created_at: ts_col(row, 12)?,
        updated_at: ts_col(row, 13)?,
    })
}

pub struct NewAccount<'a> {
    pub user_id: &'a str,
    pub bank_name: &'a str,
    pub account_number: Option<&'a str>,
    pub account_holder: Option<&'a str>,
    pub account_type: AccountType,
    pub created_from_sms: bool,
}

pub fn create_account(conn: &Connection, new: &NewAccount) -> Result<Account> {
    let now = to_sql_ts(&Utc::now());
    conn.execute(
        "INSERT INTO accounts (user_id, bank_name, account_number, account_holder, \
         account_type, created_from_sms, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        rusqlite::params![
            new.user_id,
            new.bank_name,
            new.account_number,
            new.account_holder,
            new.account_type.as_str(),
            new.created_from_sms,
            now,
        ],
    )?;
    get_account(conn, conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id = ?1"),
        [id],
        account_from_row,
    )
    .optional()?
    .ok_or(PaisaError::NotFound("account"))
}

pub fn find_account_by_number(
    conn: &Connection,
    user_id: &str,
    bank_name: &str,
    account_number: &str,
) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLS} FROM accounts \
                 WHERE user_id = ?1 AND bank_name = ?2 AND account_number = ?3 AND is_active = 1"
            ),
            rusqlite::params![user_id, bank_name, account_number],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn find_account_by_holder(
    conn: &Connection,
    user_id: &str,
    bank_name: &str,
    account_holder: &str,
) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLS} FROM accounts \
                 WHERE user_id = ?1 AND bank_name = ?2 AND account_holder = ?3 AND is_active = 1"
            ),
            rusqlite::params![user_id, bank_name, account_holder],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

/// The most recently balance-updated (falling back to most recently
/// created) SMS-created account for (user, bank).
pub fn latest_sms_account(
    conn: &Connection,
    user_id: &str,
    bank_name: &str,
) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLS} FROM accounts \
                 WHERE user_id = ?1 AND bank_name = ?2 AND created_from_sms = 1 AND is_active = 1 \
                 ORDER BY last_balance_update_at IS NULL, last_balance_update_at DESC, created_at DESC \
                 LIMIT 1"
            ),
            rusqlite::params![user_id, bank_name],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn find_cash_account(conn: &Connection, user_id: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!(
                "SELECT {ACCOUNT_COLS} FROM accounts \
                 WHERE user_id = ?1 AND account_type = 'cash' AND is_active = 1 LIMIT 1"
            ),
            [user_id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

/// Fill in identity fields the account lacks; existing values are never
/// overwritten.
pub fn backfill_account_identity(
    conn: &Connection,
    id: i64,
    account_number: Option<&str>,
    account_holder: Option<&str>,
) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET account_number = COALESCE(account_number, ?2), \
         account_holder = COALESCE(account_holder, ?3), updated_at = ?4 WHERE id = ?1",
        rusqlite::params![id, account_number, account_holder, to_sql_ts(&Utc::now())],
    )?;
    Ok(())
}

pub fn set_account_type(conn: &Connection, id: i64, account_type: AccountType) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET account_type = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id, account_type.as_str(), to_sql_ts(&Utc::now())],
    )?;
    Ok(())
}

pub fn update_account_balance(
    conn: &Connection,
    id: i64,
    balance: &Decimal,
    source: BalanceSource,
    confidence: Confidence,
    at: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET current_balance = ?2, balance_source = ?3, \
         balance_confidence = ?4, last_balance_update_at = ?5, updated_at = ?5 WHERE id = ?1",
        rusqlite::params![
            id,
            to_sql_decimal(balance),
            source.as_str(),
            confidence.as_str(),
            to_sql_ts(at),
        ],
    )?;
    Ok(())
}

pub fn set_balance_confidence(conn: &Connection, id: i64, confidence: Confidence) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET balance_confidence = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id, confidence.as_str(), to_sql_ts(&Utc::now())],
    )?;
    Ok(())
}

pub fn list_accounts(conn: &Connection, user_id: &str, include_inactive: bool) -> Result<Vec<Account>> {
    let sql = if include_inactive {
        format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE user_id = ?1 ORDER BY created_at")
    } else {
        format!(
            "SELECT {ACCOUNT_COLS} FROM accounts WHERE user_id = ?1 AND is_active = 1 ORDER BY created_at"
        )
    };
    let mut stmt = conn.prepare(&sql)?;
    let accounts = stmt
        .query_map([user_id], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

/// Accounts are never hard-deleted, only deactivated.
pub fn deactivate_account(conn: &Connection, user_id: &str, id: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE accounts SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id, to_sql_ts(&Utc::now())],
    )?;
    if changed == 0 {
        return Err(PaisaError::NotFound("account"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

const TXN_COLS: &str = "id, user_id, account_id, amount, original_amount, net_amount, type, \
     merchant, receiver_name, sender_name, bank_name, account_number, raw_message, dedup_hash, \
     source, transaction_time, received_time, time_confidence, category, tags, notes, \
     is_refund_of, refund_linked_at, created_at, updated_at";

fn txn_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: dec_col(row, 3)?,
        original_amount: dec_col(row, 4)?,
        net_amount: dec_col(row, 5)?,
        txn_type: TxnType::parse(&row.get::<_, String>(6)?),
        merchant: row.get(7)?,
        receiver_name: row.get(8)?,
        sender_name: row.get(9)?,
        bank_name: row.get(10)?,
        account_number: row.get(11)?,
        raw_message: row.get(12)?,
        dedup_hash: row.get(13)?,
        source: row.get(14)?,
        transaction_time: ts_col(row, 15)?,
        received_time: ts_col(row, 16)?,
        time_confidence: TimeConfidence::parse(&row.get::<_, String>(17)?),
        category: row.get(18)?,
        tags: list_col(row, 19)?,
        notes: row.get(20)?,
        is_refund_of: row.get(21)?,
        refund_linked_at: ts_col_opt(row, 22)?,
        created_at: ts_col(row, 23)?,
        updated_at: ts_col(row, 24)?,
    })
}

pub struct NewTransaction<'a> {
    pub user_id: &'a str,
    pub account_id: i64,
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub net_amount: Decimal,
    pub txn_type: TxnType,
    pub merchant: &'a str,
    pub receiver_name: Option<&'a str>,
    pub sender_name: Option<&'a str>,
    pub bank_name: &'a str,
    pub account_number: Option<&'a str>,
    pub raw_message: &'a str,
    pub dedup_hash: &'a str,
    pub source: &'a str,
    pub transaction_time: DateTime<Utc>,
    pub received_time: DateTime<Utc>,
    pub time_confidence: TimeConfidence,
    pub notes: Option<&'a str>,
}

pub fn insert_transaction(conn: &Connection, new: &NewTransaction) -> Result<i64> {
    let now = to_sql_ts(&Utc::now());
    conn.execute(
        "INSERT INTO transactions (user_id, account_id, amount, original_amount, net_amount, \
         type, merchant, receiver_name, sender_name, bank_name, account_number, raw_message, \
         dedup_hash, source, transaction_time, received_time, time_confidence, notes, \
         created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
        rusqlite::params![
            new.user_id,
            new.account_id,
            to_sql_decimal(&new.amount),
            to_sql_decimal(&new.original_amount),
            to_sql_decimal(&new.net_amount),
            new.txn_type.as_str(),
            new.merchant,
            new.receiver_name,
            new.sender_name,
            new.bank_name,
            new.account_number,
            new.raw_message,
            new.dedup_hash,
            new.source,
            to_sql_ts(&new.transaction_time),
            to_sql_ts(&new.received_time),
            new.time_confidence.as_str(),
            new.notes,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_transaction(conn: &Connection, user_id: &str, id: i64) -> Result<Option<Transaction>> {
    let txn = conn
        .query_row(
            &format!("SELECT {TXN_COLS} FROM transactions WHERE id = ?1 AND user_id = ?2"),
            rusqlite::params![id, user_id],
            txn_from_row,
        )
        .optional()?;
    Ok(txn)
}

pub fn find_by_dedup_hash(
    conn: &Connection,
    user_id: &str,
    dedup_hash: &str,
) -> Result<Option<Transaction>> {
    let txn = conn
        .query_row(
            &format!("SELECT {TXN_COLS} FROM transactions WHERE dedup_hash = ?1 AND user_id = ?2"),
            rusqlite::params![dedup_hash, user_id],
            txn_from_row,
        )
        .optional()?;
    Ok(txn)
}

pub fn list_transactions(conn: &Connection, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLS} FROM transactions WHERE user_id = ?1 \
         ORDER BY transaction_time DESC, id DESC LIMIT ?2"
    ))?;
    let txns = stmt
        .query_map(rusqlite::params![user_id, limit as i64], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(txns)
}

// Category, tags and notes are the only fields mutable after creation.

pub fn set_transaction_category(
    conn: &Connection,
    user_id: &str,
    id: i64,
    category: Option<&str>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions SET category = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id, category, to_sql_ts(&Utc::now())],
    )?;
    if changed == 0 {
        return Err(PaisaError::NotFound("transaction"));
    }
    Ok(())
}

pub fn set_transaction_tags(conn: &Connection, user_id: &str, id: i64, tags: &[String]) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions SET tags = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id, list_json(tags), to_sql_ts(&Utc::now())],
    )?;
    if changed == 0 {
        return Err(PaisaError::NotFound("transaction"));
    }
    Ok(())
}

pub fn set_transaction_notes(
    conn: &Connection,
    user_id: &str,
    id: i64,
    notes: Option<&str>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions SET notes = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id, notes, to_sql_ts(&Utc::now())],
    )?;
    if changed == 0 {
        return Err(PaisaError::NotFound("transaction"));
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, user_id: &str, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        rusqlite::params![id, user_id],
    )?;
    if changed == 0 {
        return Err(PaisaError::NotFound("transaction"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Refund queries
// ---------------------------------------------------------------------------

/// The credit linked as this debit's refund, if any.
pub fn refund_of(conn: &Connection, original_id: i64) -> Result<Option<Transaction>> {
    let txn = conn
        .query_row(
            &format!("SELECT {TXN_COLS} FROM transactions WHERE is_refund_of = ?1"),
            [original_id],
            txn_from_row,
        )
        .optional()?;
    Ok(txn)
}

/// Unlinked credits of exactly `amount` inside the refund window,
/// earliest first.
pub fn refund_candidates(
    conn: &Connection,
    user_id: &str,
    amount: &Decimal,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLS} FROM transactions \
         WHERE user_id = ?1 AND type = 'credit' AND amount = ?2 \
         AND transaction_time >= ?3 AND transaction_time <= ?4 \
         AND is_refund_of IS NULL \
         ORDER BY transaction_time ASC, id ASC"
    ))?;
    let txns = stmt
        .query_map(
            rusqlite::params![user_id, to_sql_decimal(amount), to_sql_ts(from), to_sql_ts(to)],
            txn_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(txns)
}

/// Debits that are neither refunds themselves nor linked to one, in a
/// fixed deterministic order.
pub fn unlinked_debits(conn: &Connection, user_id: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLS} FROM transactions t \
         WHERE t.user_id = ?1 AND t.type = 'debit' AND t.is_refund_of IS NULL \
         AND NOT EXISTS (SELECT 1 FROM transactions r WHERE r.is_refund_of = t.id) \
         ORDER BY t.transaction_time ASC, t.id ASC"
    ))?;
    let txns = stmt
        .query_map([user_id], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(txns)
}

pub fn set_refund_link(
    conn: &Connection,
    refund_id: i64,
    original_id: i64,
    at: &DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET is_refund_of = ?2, refund_linked_at = ?3, updated_at = ?3 \
         WHERE id = ?1",
        rusqlite::params![refund_id, original_id, to_sql_ts(at)],
    )?;
    Ok(())
}

pub fn clear_refund_link(conn: &Connection, refund_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET is_refund_of = NULL, refund_linked_at = NULL, updated_at = ?2 \
         WHERE id = ?1",
        rusqlite::params![refund_id, to_sql_ts(&Utc::now())],
    )?;
    Ok(())
}

/// Per-debit (amount, linked refund amount) rows for net-spend math.
pub fn debit_refund_rows(
    conn: &Connection,
    user_id: &str,
    from: &DateTime<Utc>,
    to: &DateTime<Utc>,
) -> Result<Vec<(Decimal, Option<Decimal>)>> {
    let mut stmt = conn.prepare(
        "SELECT t.amount, r.amount FROM transactions t \
         LEFT JOIN transactions r ON r.is_refund_of = t.id \
         WHERE t.user_id = ?1 AND t.type = 'debit' AND t.is_refund_of IS NULL \
         AND t.transaction_time >= ?2 AND t.transaction_time <= ?3",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![user_id, to_sql_ts(from), to_sql_ts(to)], |row| {
            Ok((dec_col(row, 0)?, dec_col_opt(row, 1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// All (original, refund) pairs for a user.
pub fn refund_pairs(conn: &Connection, user_id: &str) -> Result<Vec<(Transaction, Transaction)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TXN_COLS} FROM transactions \
         WHERE user_id = ?1 AND is_refund_of IS NOT NULL ORDER BY refund_linked_at ASC, id ASC"
    ))?;
    let refunds = stmt
        .query_map([user_id], txn_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut pairs = Vec::with_capacity(refunds.len());
    for refund in refunds {
        let original_id = refund.is_refund_of.ok_or(PaisaError::NotFound("transaction"))?;
        if let Some(original) = get_transaction(conn, user_id, original_id)? {
            pairs.push((original, refund));
        }
    }
    Ok(pairs)
}

// ---------------------------------------------------------------------------
// Category rules
// ---------------------------------------------------------------------------

fn rule_from_row(row: &Row) -> rusqlite::Result<CategoryRule> {
    Ok(CategoryRule {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        parent_category: row.get(3)?,
        keywords: list_col(row, 4)?,
        merchant_patterns: list_col(row, 5)?,
        is_active: row.get(6)?,
    })
}

pub fn insert_rule(
    conn: &Connection,
    user_id: &str,
    name: &str,
    parent_category: &str,
    keywords: &[String],
    merchant_patterns: &[String],
) -> Result<()> {
    conn.execute(
        "INSERT INTO categories (user_id, name, parent_category, keywords, merchant_patterns, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT (user_id, name) DO UPDATE SET \
         parent_category = excluded.parent_category, keywords = excluded.keywords, \
         merchant_patterns = excluded.merchant_patterns, is_active = 1",
        rusqlite::params![
            user_id,
            name,
            parent_category,
            list_json(keywords),
            list_json(merchant_patterns),
            to_sql_ts(&Utc::now()),
        ],
    )?;
    Ok(())
}

pub fn user_rules(conn: &Connection, user_id: &str) -> Result<Vec<CategoryRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, parent_category, keywords, merchant_patterns, is_active \
         FROM categories WHERE user_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rules = stmt
        .query_map([user_id], rule_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rules)
}

/// Transactions still carrying no category or the default placeholder.
pub fn uncategorized_transactions(
    conn: &Connection,
    user_id: &str,
    limit: usize,
) -> Result<Vec<(i64, String)>> {
    let mut stmt = conn.prepare(
        "SELECT id, merchant FROM transactions \
         WHERE user_id = ?1 AND (category IS NULL OR category = 'Other') \
         ORDER BY id LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![user_id, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
