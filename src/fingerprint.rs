use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::models::{ParsedTransaction, TxnType};

/// Deterministic identity digest over the ordered tuple
/// (user, bank, amount, type, merchant, transaction time).
///
/// Two genuinely distinct transactions sharing all six fields to the
/// minute collapse to one fingerprint and the later one is dropped as a
/// duplicate. That coarseness is deliberate: redelivered messages with
/// different formatting must still dedup, so raw message content stays
/// out of the digest.
pub fn fingerprint(
    user_id: &str,
    bank_name: &str,
    amount: &Decimal,
    txn_type: TxnType,
    merchant: &str,
    transaction_time: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        user_id,
        bank_name,
        &amount.normalize().to_string(),
        txn_type.as_str(),
        merchant,
        &transaction_time.to_rfc3339_opts(SecondsFormat::Secs, true),
    ] {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hex::encode(hasher.finalize())
}

pub fn of_parsed(user_id: &str, parsed: &ParsedTransaction) -> String {
    fingerprint(
        user_id,
        &parsed.bank_name,
        &parsed.amount,
        parsed.txn_type,
        &parsed.merchant,
        &parsed.transaction_time,
    )
}

/// Manual entries have no deterministic SMS content to digest; a random
/// identity keeps the unique constraint satisfied without ever colliding.
pub fn random_fingerprint() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
