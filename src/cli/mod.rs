pub mod accounts;
pub mod apikeys;
pub mod cash;
pub mod categorize;
pub mod ingest;
pub mod init;
pub mod refunds;
pub mod rules;
pub mod status;
pub mod transactions;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::auth::{ApiKeyTable, CredentialResolver};
use crate::db::{get_connection, init_db};
use crate::error::{PaisaError, Result};
use crate::settings;

#[derive(Parser)]
#[command(name = "paisa", about = "SMS-driven expense tracker for Indian bank notifications.")]
pub struct Cli {
    /// Path to the database file (default: from settings)
    #[arg(long, global = true)]
    pub db: Option<String>,
    /// User to act as (default: from settings)
    #[arg(long, global = true)]
    pub user: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up paisa: choose a data directory and initialize the database.
    Init {
        /// Path for paisa data (default: ~/.paisa)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Ingest one raw bank SMS.
    Ingest {
        /// Raw message text
        message: String,
        /// API key identifying the sending device
        #[arg(long = "api-key")]
        api_key: Option<String>,
        /// Receipt timestamp, RFC 3339 (default: now)
        #[arg(long = "received-at")]
        received_at: Option<String>,
        /// Source label stored with the transaction
        #[arg(long, default_value = "sms")]
        source: String,
    },
    /// Record a cash expense by hand.
    Cash {
        /// Amount spent
        amount: String,
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Transaction timestamp, RFC 3339 (default: now)
        #[arg(long)]
        time: Option<String>,
        #[arg(long = "api-key")]
        api_key: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Browse and annotate transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Find, link and report on refunds.
    Refunds {
        #[command(subcommand)]
        command: RefundsCommands,
    },
    /// Assign categories to transactions that have none.
    Categorize {
        /// Maximum number of transactions to process
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Manage categorization rules.
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },
    /// Manage API keys for ingesting devices.
    Apikeys {
        #[command(subcommand)]
        command: ApikeysCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List accounts.
    List {
        /// Include deactivated accounts
        #[arg(long)]
        all: bool,
    },
    /// Deactivate an account. Accounts are never deleted.
    Deactivate { id: i64 },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List recent transactions.
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Set a transaction's category.
    SetCategory { id: i64, category: String },
    /// Set or clear a transaction's notes.
    SetNotes { id: i64, notes: Option<String> },
    /// Replace a transaction's tags.
    Tag { id: i64, tags: Vec<String> },
    /// Delete a transaction.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum RefundsCommands {
    /// Show refund candidates for a debit.
    Candidates { id: i64 },
    /// Link a credit as the refund of a debit.
    Link { original: i64, refund: i64 },
    /// Remove a debit's refund link.
    Unlink { original: i64 },
    /// Link the first candidate for every unlinked debit.
    Auto,
    /// List linked refund pairs.
    Pairs,
    /// Net spend over a date range after subtracting refunds.
    NetSpend {
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// End date, YYYY-MM-DD (inclusive)
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Add or replace a categorization rule.
    Add {
        /// Rule name, unique per user
        name: String,
        /// Category assigned on match
        #[arg(long)]
        category: String,
        /// Comma-separated merchant keywords
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
        /// Comma-separated merchant regex patterns
        #[arg(long, value_delimiter = ',')]
        patterns: Vec<String>,
    },
    /// List categorization rules.
    List,
}

#[derive(Subcommand)]
pub enum ApikeysCommands {
    /// Bind an API key to a user.
    Add {
        key: String,
        #[arg(long = "user-id")]
        user_id: String,
    },
}

pub(crate) fn open_db(db: Option<&str>) -> Result<Connection> {
    let path = match db {
        Some(p) => PathBuf::from(p),
        None => settings::db_path(),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Who is acting: an API key outranks --user, which outranks the
/// default from settings.
pub(crate) fn resolve_user(
    conn: &Connection,
    api_key: Option<&str>,
    user: Option<&str>,
) -> Result<String> {
    if let Some(key) = api_key {
        return ApiKeyTable::new(conn).resolve(key);
    }
    if let Some(user) = user {
        return Ok(user.to_string());
    }
    let default = settings::load_settings().default_user_id;
    if default.is_empty() {
        return Err(PaisaError::Validation(
            "no user given: pass --user or --api-key, or set --user during init".to_string(),
        ));
    }
    Ok(default)
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            PaisaError::Validation(format!("invalid timestamp: {value} (expected RFC 3339)"))
        })
}

pub(crate) fn parse_day_start(value: &str) -> Result<DateTime<Utc>> {
    let date: NaiveDate = value
        .parse()
        .map_err(|_| PaisaError::Validation(format!("invalid date: {value} (expected YYYY-MM-DD)")))?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub(crate) fn parse_day_end(value: &str) -> Result<DateTime<Utc>> {
    Ok(parse_day_start(value)? + chrono::Duration::days(1) - chrono::Duration::seconds(1))
}

pub(crate) fn parse_amount(value: &str) -> Result<Decimal> {
    value
        .parse()
        .map_err(|_| PaisaError::Validation(format!("invalid amount: {value}")))
}
