use chrono::Utc;
use colored::Colorize;

use crate::error::Result;
use crate::fmt::rupees;
use crate::ingest::{ingest, IngestOutcome, IngestRequest};

pub fn run(
    db: Option<&str>,
    user: Option<&str>,
    message: &str,
    api_key: Option<&str>,
    received_at: Option<&str>,
    source: &str,
) -> Result<()> {
    let mut conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, api_key, user)?;
    let received = match received_at {
        Some(value) => super::parse_ts(value)?,
        None => Utc::now(),
    };

    let outcome = ingest(
        &mut conn,
        &IngestRequest { user_id: &user_id, raw_message: message, received_at: received, source },
    )?;

    match outcome {
        IngestOutcome::Accepted { transaction, account } => {
            println!("{} transaction #{}", "Accepted".green().bold(), transaction.id);
            println!(
                "  {} {} | {} ({})",
                transaction.txn_type.as_str(),
                rupees(&transaction.amount),
                transaction.merchant,
                transaction.bank_name
            );
            let balance = account
                .current_balance
                .map(|b| rupees(&b))
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "  Account #{} [{}] balance: {} ({})",
                account.id,
                account.account_type.as_str(),
                balance,
                account.balance_source.as_str()
            );
        }
        IngestOutcome::Ignored { reason } => {
            println!("{}: {reason}", "Ignored".yellow());
        }
        IngestOutcome::Duplicate { dedup_hash, existing_id } => {
            println!(
                "{}: already stored as transaction #{existing_id} (fingerprint {})",
                "Duplicate".yellow(),
                &dedup_hash[..12]
            );
        }
    }
    Ok(())
}
