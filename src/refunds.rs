use chrono::{Duration, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{PaisaError, Result};
use crate::models::{Transaction, TxnType};
use crate::store;

/// Credits are considered as refunds for up to a week after the debit.
const REFUND_WINDOW_DAYS: i64 = 7;

pub struct AutoLinkReport {
    pub linked: usize,
    pub total_checked: usize,
}

pub struct NetSpend {
    pub total_debits: Decimal,
    pub total_refunded: Decimal,
    pub net_spend: Decimal,
    pub refund_count: usize,
}

fn get_owned(conn: &Connection, user_id: &str, id: i64) -> Result<Transaction> {
    store::get_transaction(conn, user_id, id)?.ok_or(PaisaError::NotFound("transaction"))
}

/// Unlinked credits of the same amount within the refund window after
/// a debit, earliest first.
pub fn potential_refunds(conn: &Connection, user_id: &str, original_id: i64) -> Result<Vec<Transaction>> {
    let original = get_owned(conn, user_id, original_id)?;
    if original.txn_type != TxnType::Debit {
        return Err(PaisaError::Conflict("original transaction must be a debit".to_string()));
    }
    let until = original.transaction_time + Duration::days(REFUND_WINDOW_DAYS);
    store::refund_candidates(conn, user_id, &original.amount, &original.transaction_time, &until)
}

/// Link a credit as the refund of a debit. All checks pass before any
/// mutation happens; a failed link changes nothing.
pub fn link_refund(conn: &Connection, user_id: &str, original_id: i64, refund_id: i64) -> Result<()> {
    let original = get_owned(conn, user_id, original_id)?;
    let refund = get_owned(conn, user_id, refund_id)?;

    if original.txn_type != TxnType::Debit {
        return Err(PaisaError::Conflict("original transaction must be a debit".to_string()));
    }
    if refund.txn_type != TxnType::Credit {
        return Err(PaisaError::Conflict("refund transaction must be a credit".to_string()));
    }
    if original.amount != refund.amount {
        return Err(PaisaError::Conflict(
            "refund amount must match original transaction".to_string(),
        ));
    }
    if refund.is_refund_of.is_some() {
        return Err(PaisaError::Conflict("refund transaction is already linked".to_string()));
    }
    if store::refund_of(conn, original_id)?.is_some() {
        return Err(PaisaError::Conflict(
            "original transaction already has a linked refund".to_string(),
        ));
    }

    store::set_refund_link(conn, refund_id, original_id, &Utc::now())
}

pub fn unlink_refund(conn: &Connection, user_id: &str, original_id: i64) -> Result<()> {
    get_owned(conn, user_id, original_id)?;
    let refund = store::refund_of(conn, original_id)?.ok_or_else(|| {
        PaisaError::Conflict("original transaction has no linked refund".to_string())
    })?;
    store::clear_refund_link(conn, refund.id)
}

/// Link the first candidate for every unlinked debit. A link that fails
/// its checks is skipped; the batch carries on.
pub fn auto_link(conn: &Connection, user_id: &str) -> Result<AutoLinkReport> {
    let debits = store::unlinked_debits(conn, user_id)?;
    let total_checked = debits.len();
    let mut linked = 0;

    for debit in debits {
        let until = debit.transaction_time + Duration::days(REFUND_WINDOW_DAYS);
        let candidates =
            store::refund_candidates(conn, user_id, &debit.amount, &debit.transaction_time, &until)?;
        // Candidates come back earliest first; the head is the tie-break
        // winner among equal amounts.
        let Some(candidate) = candidates.into_iter().next() else { continue };
        match link_refund(conn, user_id, debit.id, candidate.id) {
            Ok(()) => linked += 1,
            Err(PaisaError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(AutoLinkReport { linked, total_checked })
}

/// Spend over a window after subtracting linked refunds. Debits that are
/// themselves refunds are excluded from the total.
pub fn net_spend(
    conn: &Connection,
    user_id: &str,
    from: &chrono::DateTime<Utc>,
    to: &chrono::DateTime<Utc>,
) -> Result<NetSpend> {
    let rows = store::debit_refund_rows(conn, user_id, from, to)?;
    let mut total_debits = Decimal::ZERO;
    let mut total_refunded = Decimal::ZERO;
    let mut refund_count = 0;
    for (debit_amount, refund_amount) in rows {
        total_debits += debit_amount;
        if let Some(refunded) = refund_amount {
            total_refunded += refunded;
            refund_count += 1;
        }
    }
    Ok(NetSpend {
        total_debits,
        total_refunded,
        net_spend: total_debits - total_refunded,
        refund_count,
    })
}
