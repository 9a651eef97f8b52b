use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Transaction kind, as classified from SMS keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnType {
    Debit,
    Credit,
    Atm,
    Cash,
    Unknown,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Atm => "atm",
            Self::Cash => "cash",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "debit" => Self::Debit,
            "credit" => Self::Credit,
            "atm" => Self::Atm,
            "cash" => Self::Cash,
            _ => Self::Unknown,
        }
    }

    /// Debits, ATM withdrawals and cash spends all reduce a balance.
    pub fn is_outflow(&self) -> bool {
        matches!(self, Self::Debit | Self::Atm | Self::Cash)
    }
}

/// Provenance of an account's current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceSource {
    Sms,
    Calculated,
    Unknown,
}

impl BalanceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Calculated => "calculated",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "sms" => Self::Sms,
            "calculated" => Self::Calculated,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Whether the transaction time came out of the message text or fell
/// back to the ingestion-received timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeConfidence {
    Exact,
    Estimated,
}

impl TimeConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Estimated => "estimated",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "exact" => Self::Exact,
            _ => Self::Estimated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    Bank,
    Cash,
    Wallet,
    CreditCard,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::Cash => "cash",
            Self::Wallet => "wallet",
            Self::CreditCard => "credit_card",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cash" => Self::Cash,
            "wallet" => Self::Wallet,
            "credit_card" => Self::CreditCard,
            _ => Self::Bank,
        }
    }
}

/// Transient output of the SMS parser. Drives one account/transaction
/// mutation and is then discarded.
#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub net_amount: Decimal,
    pub txn_type: TxnType,
    pub merchant: String,
    pub bank_name: String,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub receiver_name: Option<String>,
    pub sender_name: Option<String>,
    /// Authoritative when present: an explicit balance stated in the SMS.
    pub balance_from_sms: Option<Decimal>,
    pub transaction_time: DateTime<Utc>,
    pub time_confidence: TimeConfidence,
    pub is_card_payment: bool,
    pub parsing_confidence: Confidence,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    pub bank_name: String,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,
    pub current_balance: Option<Decimal>,
    pub balance_source: BalanceSource,
    pub balance_confidence: Confidence,
    pub last_balance_update_at: Option<DateTime<Utc>>,
    pub account_type: AccountType,
    pub created_from_sms: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub amount: Decimal,
    pub original_amount: Decimal,
    pub net_amount: Decimal,
    pub txn_type: TxnType,
    pub merchant: String,
    pub receiver_name: Option<String>,
    pub sender_name: Option<String>,
    pub bank_name: String,
    pub account_number: Option<String>,
    pub raw_message: String,
    pub dedup_hash: String,
    pub source: String,
    pub transaction_time: DateTime<Utc>,
    pub received_time: DateTime<Utc>,
    pub time_confidence: TimeConfidence,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Back reference set on a credit that has been linked as a refund.
    pub is_refund_of: Option<i64>,
    pub refund_linked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user-defined categorization rule: keywords and merchant regex
/// patterns mapping to a parent category.
#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub parent_category: String,
    pub keywords: Vec<String>,
    pub merchant_patterns: Vec<String>,
    pub is_active: bool,
}
