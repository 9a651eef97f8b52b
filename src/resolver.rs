use rusqlite::Connection;

use crate::error::Result;
use crate::models::{Account, AccountType, ParsedTransaction};
use crate::store;

/// Result of resolving a parse to an owning account.
pub struct Resolution {
    pub account: Account,
    pub created: bool,
}

// ---------------------------------------------------------------------------
// Matcher strategies, tried in order until one succeeds
// ---------------------------------------------------------------------------

fn by_account_number(
    conn: &Connection,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<Option<Account>> {
    match parsed.account_number.as_deref() {
        Some(number) => store::find_account_by_number(conn, user_id, &parsed.bank_name, number),
        None => Ok(None),
    }
}

fn by_account_holder(
    conn: &Connection,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<Option<Account>> {
    match parsed.account_holder.as_deref() {
        Some(holder) => store::find_account_by_holder(conn, user_id, &parsed.bank_name, holder),
        None => Ok(None),
    }
}

fn by_recent_sms_account(
    conn: &Connection,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<Option<Account>> {
    store::latest_sms_account(conn, user_id, &parsed.bank_name)
}

/// Typing for accounts created lazily from a parse. The card flag wins;
/// wallet providers are recognized by name; everything else is a bank.
fn infer_account_type(parsed: &ParsedTransaction) -> AccountType {
    if parsed.is_card_payment {
        return AccountType::CreditCard;
    }
    let bank = parsed.bank_name.to_uppercase();
    if bank == "CASH" {
        return AccountType::Cash;
    }
    const WALLET_PROVIDERS: [&str; 4] = ["PAYTM", "PHONEPE", "MOBIKWIK", "WALLET"];
    if WALLET_PROVIDERS.iter().any(|w| bank.contains(w)) {
        return AccountType::Wallet;
    }
    AccountType::Bank
}

/// Find or create the account a parsed message belongs to.
///
/// Matchers run in strict order: account number, then holder name, then
/// the most recently active SMS-created account for the bank. A miss on
/// all three creates a new account. Any match opportunistically
/// backfills identity fields the account lacks and upgrades the type to
/// credit_card when the parse newly signals a card payment.
pub fn resolve_account(
    conn: &Connection,
    user_id: &str,
    parsed: &ParsedTransaction,
) -> Result<Resolution> {
    let matchers = [by_account_number, by_account_holder, by_recent_sms_account];
    for matcher in matchers {
        if let Some(account) = matcher(conn, user_id, parsed)? {
            let account = enrich_matched(conn, account, parsed)?;
            return Ok(Resolution { account, created: false });
        }
    }

    let account = store::create_account(
        conn,
        &store::NewAccount {
            user_id,
            bank_name: &parsed.bank_name,
            account_number: parsed.account_number.as_deref(),
            account_holder: parsed.account_holder.as_deref(),
            account_type: infer_account_type(parsed),
            created_from_sms: true,
        },
    )?;
    Ok(Resolution { account, created: true })
}

fn enrich_matched(
    conn: &Connection,
    account: Account,
    parsed: &ParsedTransaction,
) -> Result<Account> {
    let needs_number = account.account_number.is_none() && parsed.account_number.is_some();
    let needs_holder = account.account_holder.is_none() && parsed.account_holder.is_some();
    let needs_retype = parsed.is_card_payment && account.account_type != AccountType::CreditCard;

    if needs_number || needs_holder {
        store::backfill_account_identity(
            conn,
            account.id,
            parsed.account_number.as_deref(),
            parsed.account_holder.as_deref(),
        )?;
    }
    if needs_retype {
        store::set_account_type(conn, account.id, AccountType::CreditCard)?;
    }
    if needs_number || needs_holder || needs_retype {
        return store::get_account(conn, account.id);
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{Confidence, TimeConfidence, TxnType};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn parsed(bank: &str) -> ParsedTransaction {
        ParsedTransaction {
            amount: Decimal::from(500),
            original_amount: Decimal::from(500),
            net_amount: Decimal::from(500),
            txn_type: TxnType::Debit,
            merchant: "Swiggy".to_string(),
            bank_name: bank.to_string(),
            account_number: None,
            account_holder: None,
            receiver_name: None,
            sender_name: None,
            balance_from_sms: None,
            transaction_time: Utc.with_ymd_and_hms(2025, 1, 5, 13, 44, 0).unwrap(),
            time_confidence: TimeConfidence::Exact,
            is_card_payment: false,
            parsing_confidence: Confidence::High,
        }
    }

    #[test]
    fn test_miss_creates_account() {
        let (_dir, conn) = test_db();
        let mut p = parsed("HDFC");
        p.account_number = Some("1234".to_string());
        let res = resolve_account(&conn, "u1", &p).unwrap();
        assert!(res.created);
        assert_eq!(res.account.bank_name, "HDFC");
        assert_eq!(res.account.account_number.as_deref(), Some("1234"));
        assert_eq!(res.account.account_type, AccountType::Bank);
        assert!(res.account.created_from_sms);
    }

    #[test]
    fn test_match_by_account_number() {
        let (_dir, conn) = test_db();
        let mut p = parsed("HDFC");
        p.account_number = Some("1234".to_string());
        let first = resolve_account(&conn, "u1", &p).unwrap();
        let second = resolve_account(&conn, "u1", &p).unwrap();
        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
    }

    #[test]
    fn test_match_by_holder_when_number_absent() {
        let (_dir, conn) = test_db();
        let mut p = parsed("HDFC");
        p.account_number = Some("1234".to_string());
        p.account_holder = Some("Ravi".to_string());
        let first = resolve_account(&conn, "u1", &p).unwrap();

        let mut p2 = parsed("HDFC");
        p2.account_holder = Some("Ravi".to_string());
        let second = resolve_account(&conn, "u1", &p2).unwrap();
        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
    }

    #[test]
    fn test_fallback_to_recent_sms_account() {
        let (_dir, conn) = test_db();
        let first = resolve_account(&conn, "u1", &parsed("HDFC")).unwrap();
        let second = resolve_account(&conn, "u1", &parsed("HDFC")).unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
    }

    #[test]
    fn test_different_bank_never_matches() {
        let (_dir, conn) = test_db();
        let first = resolve_account(&conn, "u1", &parsed("HDFC")).unwrap();
        let second = resolve_account(&conn, "u1", &parsed("ICICI")).unwrap();
        assert!(second.created);
        assert_ne!(second.account.id, first.account.id);
    }

    #[test]
    fn test_backfill_on_match() {
        let (_dir, conn) = test_db();
        resolve_account(&conn, "u1", &parsed("HDFC")).unwrap();
        let mut p = parsed("HDFC");
        p.account_number = Some("1234".to_string());
        let res = resolve_account(&conn, "u1", &p).unwrap();
        assert!(!res.created);
        assert_eq!(res.account.account_number.as_deref(), Some("1234"));
    }

    #[test]
    fn test_card_flag_retypes_matched_account() {
        let (_dir, conn) = test_db();
        let first = resolve_account(&conn, "u1", &parsed("HDFC")).unwrap();
        assert_eq!(first.account.account_type, AccountType::Bank);
        let mut p = parsed("HDFC");
        p.is_card_payment = true;
        let second = resolve_account(&conn, "u1", &p).unwrap();
        assert_eq!(second.account.id, first.account.id);
        assert_eq!(second.account.account_type, AccountType::CreditCard);
    }

    #[test]
    fn test_wallet_and_card_typing_on_create() {
        let (_dir, conn) = test_db();
        let res = resolve_account(&conn, "u1", &parsed("PAYTM")).unwrap();
        assert_eq!(res.account.account_type, AccountType::Wallet);
        let mut p = parsed("SBI");
        p.is_card_payment = true;
        let res = resolve_account(&conn, "u1", &p).unwrap();
        assert_eq!(res.account.account_type, AccountType::CreditCard);
    }
}
