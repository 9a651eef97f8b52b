use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{PaisaError, Result};
use crate::models::{Account, AccountType, TimeConfidence, Transaction, TxnType};
use crate::{fingerprint, parser, reconciler, resolver, store};

pub struct IngestRequest<'a> {
    pub user_id: &'a str,
    pub raw_message: &'a str,
    pub received_at: DateTime<Utc>,
    pub source: &'a str,
}

/// Every ingest resolves to exactly one of these. Rejected parses and
/// replays are ordinary outcomes, not errors.
pub enum IngestOutcome {
    Accepted { transaction: Transaction, account: Account },
    Ignored { reason: &'static str },
    Duplicate { dedup_hash: String, existing_id: i64 },
}

/// Run one message through parse, dedup, account resolution, balance
/// reconciliation and persistence.
///
/// The whole sequence runs in a single database transaction so a
/// failure can never leave a balance updated without its transaction
/// durably stored.
pub fn ingest(conn: &mut Connection, req: &IngestRequest) -> Result<IngestOutcome> {
    if req.user_id.trim().is_empty() {
        return Err(PaisaError::Validation("user_id is required".to_string()));
    }
    if req.raw_message.trim().is_empty() {
        return Err(PaisaError::Validation("raw_message is required".to_string()));
    }

    let parsed = match parser::parse_message(req.raw_message, req.received_at) {
        Some(parsed) => parsed,
        None => return Ok(IngestOutcome::Ignored { reason: "non-transaction message" }),
    };
    let dedup_hash = fingerprint::of_parsed(req.user_id, &parsed);

    let tx = conn.transaction()?;

    if let Some(existing) = store::find_by_dedup_hash(&tx, req.user_id, &dedup_hash)? {
        return Ok(IngestOutcome::Duplicate { dedup_hash, existing_id: existing.id });
    }

    let resolution = resolver::resolve_account(&tx, req.user_id, &parsed)?;
    let decision = reconciler::decide(
        &resolution.account,
        parsed.balance_from_sms.as_ref(),
        parsed.txn_type,
        &parsed.amount,
    );

    let insert = store::insert_transaction(
        &tx,
        &store::NewTransaction {
            user_id: req.user_id,
            account_id: resolution.account.id,
            amount: parsed.amount,
            original_amount: parsed.original_amount,
            net_amount: parsed.net_amount,
            txn_type: parsed.txn_type,
            merchant: &parsed.merchant,
            receiver_name: parsed.receiver_name.as_deref(),
            sender_name: parsed.sender_name.as_deref(),
            bank_name: &parsed.bank_name,
            account_number: parsed.account_number.as_deref(),
            raw_message: req.raw_message,
            dedup_hash: &dedup_hash,
            source: req.source,
            transaction_time: parsed.transaction_time,
            received_time: req.received_at,
            time_confidence: parsed.time_confidence,
            notes: None,
        },
    );
    let transaction_id = match insert {
        Ok(id) => id,
        // The unique index is the backstop when a replay races past the
        // pre-check. Dropping the open transaction rolls back any
        // account created on this path.
        Err(PaisaError::Db(rusqlite::Error::SqliteFailure(e, _)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let existing = store::find_by_dedup_hash(&tx, req.user_id, &dedup_hash)?
                .ok_or(PaisaError::NotFound("transaction"))?;
            return Ok(IngestOutcome::Duplicate { dedup_hash, existing_id: existing.id });
        }
        Err(e) => return Err(e),
    };

    reconciler::apply(&tx, resolution.account.id, &decision, &parsed.transaction_time)?;

    let account = store::get_account(&tx, resolution.account.id)?;
    let transaction = store::get_transaction(&tx, req.user_id, transaction_id)?
        .ok_or(PaisaError::NotFound("transaction"))?;
    tx.commit()?;

    Ok(IngestOutcome::Accepted { transaction, account })
}

/// Record a cash expense entered by hand. Bypasses the parser but
/// reuses fingerprinting, the synthetic cash account and the calculated
/// balance rule with the type treated as a debit.
pub fn record_cash_entry(
    conn: &mut Connection,
    user_id: &str,
    amount: Decimal,
    merchant: Option<&str>,
    notes: Option<&str>,
    transaction_time: Option<DateTime<Utc>>,
) -> Result<(Transaction, Account)> {
    if amount <= Decimal::ZERO {
        return Err(PaisaError::Validation("amount must be positive".to_string()));
    }

    let now = Utc::now();
    let tx = conn.transaction()?;

    let account = match store::find_cash_account(&tx, user_id)? {
        Some(account) => account,
        None => store::create_account(
            &tx,
            &store::NewAccount {
                user_id,
                bank_name: "CASH",
                account_number: None,
                account_holder: None,
                account_type: AccountType::Cash,
                created_from_sms: false,
            },
        )?,
    };

    let when = transaction_time.unwrap_or(now);
    let time_confidence = if transaction_time.is_some() {
        TimeConfidence::Exact
    } else {
        TimeConfidence::Estimated
    };
    let decision = reconciler::decide(&account, None, TxnType::Debit, &amount);
    let raw_message = format!("manual_entry:{}:{}", user_id, store::to_sql_ts(&now));
    let dedup_hash = fingerprint::random_fingerprint();

    let transaction_id = store::insert_transaction(
        &tx,
        &store::NewTransaction {
            user_id,
            account_id: account.id,
            amount,
            original_amount: amount,
            net_amount: amount,
            txn_type: TxnType::Cash,
            merchant: merchant.unwrap_or("Cash Spend"),
            receiver_name: None,
            sender_name: None,
            bank_name: "CASH",
            account_number: None,
            raw_message: &raw_message,
            dedup_hash: &dedup_hash,
            source: "manual",
            transaction_time: when,
            received_time: now,
            time_confidence,
            notes,
        },
    )?;
    reconciler::apply(&tx, account.id, &decision, &when)?;

    let account = store::get_account(&tx, account.id)?;
    let transaction = store::get_transaction(&tx, user_id, transaction_id)?
        .ok_or(PaisaError::NotFound("transaction"))?;
    tx.commit()?;

    Ok((transaction, account))
}
