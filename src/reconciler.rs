use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{Account, BalanceSource, Confidence, TxnType};
use crate::store;

/// Outcome of arbitrating competing balance signals for one ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceDecision {
    /// The message stated the balance outright. Always wins.
    SmsStated(Decimal),
    /// Signed delta applied to a known prior balance.
    Calculated(Decimal),
    /// No usable signal. The balance stays as it was.
    Unchanged,
}

/// Pick at most one rule, evaluated in priority order.
///
/// A calculated adjustment needs both a non-null baseline and a known
/// transaction type; an account with no known balance stays unknown
/// until an SMS-stated value arrives.
pub fn decide(
    account: &Account,
    balance_from_sms: Option<&Decimal>,
    txn_type: TxnType,
    amount: &Decimal,
) -> BalanceDecision {
    if let Some(stated) = balance_from_sms {
        return BalanceDecision::SmsStated(*stated);
    }
    match account.current_balance {
        Some(current) if txn_type != TxnType::Unknown => {
            let next = if txn_type.is_outflow() { current - amount } else { current + amount };
            BalanceDecision::Calculated(next)
        }
        _ => BalanceDecision::Unchanged,
    }
}

pub fn apply(
    conn: &Connection,
    account_id: i64,
    decision: &BalanceDecision,
    at: &DateTime<Utc>,
) -> Result<()> {
    match decision {
        BalanceDecision::SmsStated(balance) => store::update_account_balance(
            conn,
            account_id,
            balance,
            BalanceSource::Sms,
            Confidence::High,
            at,
        ),
        BalanceDecision::Calculated(balance) => store::update_account_balance(
            conn,
            account_id,
            balance,
            BalanceSource::Calculated,
            Confidence::Medium,
            at,
        ),
        BalanceDecision::Unchanged => store::set_balance_confidence(conn, account_id, Confidence::Low),
    }
}
