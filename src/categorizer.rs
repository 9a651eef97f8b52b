use regex::Regex;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::CategoryRule;
use crate::store;

/// Fallback keyword table, consulted after user rules.
const BUILTIN_MAPPINGS: &[(&str, &[&str])] = &[
    ("Groceries", &["bigbasket", "amazon fresh", "instamart", "blinkit", "grofers", "fresh", "grocery"]),
    ("Dining", &["zomato", "swiggy", "dunkin", "mcd", "kfc", "burger", "pizza", "restaurant", "cafe", "coffee"]),
    ("Entertainment", &["netflix", "prime", "hotstar", "gaming", "movie", "theatre", "cinema"]),
    ("Transport", &["uber", "ola", "fuel", "petrol", "metro", "bus", "railway", "parking"]),
    ("Shopping", &["amazon", "flipkart", "myntra", "snapdeal", "ajio", "mall", "store"]),
    ("Health", &["pharmacy", "medical", "hospital", "doctor", "clinic", "lab", "health"]),
    ("Utilities", &["electricity", "water", "gas", "phone", "internet", "bill"]),
    ("Travel", &["booking", "makemytrip", "goibibo", "hotel", "flight"]),
];

const DEFAULT_CATEGORY: &str = "Other";

fn rule_matches(rule: &CategoryRule, merchant_lower: &str) -> bool {
    if rule.keywords.iter().any(|k| merchant_lower.contains(&k.to_lowercase())) {
        return true;
    }
    rule.merchant_patterns.iter().any(|p| {
        Regex::new(&format!("(?i){p}")).map(|re| re.is_match(merchant_lower)).unwrap_or(false)
    })
}

/// Category for a merchant name: user rules first, then the builtin
/// table, else "Other".
pub fn categorize_merchant(rules: &[CategoryRule], merchant: &str) -> String {
    let merchant_lower = merchant.to_lowercase();
    if merchant_lower.is_empty() {
        return DEFAULT_CATEGORY.to_string();
    }
    for rule in rules {
        if rule_matches(rule, &merchant_lower) {
            return rule.parent_category.clone();
        }
    }
    for (category, keywords) in BUILTIN_MAPPINGS {
        if keywords.iter().any(|k| merchant_lower.contains(k)) {
            return (*category).to_string();
        }
    }
    DEFAULT_CATEGORY.to_string()
}

pub struct CategorizeReport {
    pub updated: usize,
    pub total: usize,
}

/// Categorize up to `limit` transactions still missing a category or
/// carrying the default placeholder. Safe to re-run; already
/// categorized rows never come back from the query.
pub fn categorize_transactions(conn: &Connection, user_id: &str, limit: usize) -> Result<CategorizeReport> {
    let rules = store::user_rules(conn, user_id)?;
    let pending = store::uncategorized_transactions(conn, user_id, limit)?;
    let total = pending.len();

    let mut updated = 0;
    for (id, merchant) in pending {
        let category = categorize_merchant(&rules, &merchant);
        store::set_transaction_category(conn, user_id, id, Some(&category))?;
        updated += 1;
    }
    Ok(CategorizeReport { updated, total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::{AccountType, TimeConfidence, TxnType};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn rule(parent: &str, keywords: &[&str], patterns: &[&str]) -> CategoryRule {
        CategoryRule {
            id: 1,
            user_id: "u1".to_string(),
            name: parent.to_lowercase(),
            parent_category: parent.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            merchant_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            is_active: true,
        }
    }

    fn seed_txn(conn: &Connection, merchant: &str, hash: &str) -> i64 {
        let account = store::create_account(
            conn,
            &store::NewAccount {
                user_id: "u1",
                bank_name: "HDFC",
                account_number: None,
                account_holder: None,
                account_type: AccountType::Bank,
                created_from_sms: true,
            },
        )
        .unwrap();
        let at = Utc.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
        store::insert_transaction(
            conn,
            &store::NewTransaction {
                user_id: "u1",
                account_id: account.id,
                amount: Decimal::from(100),
                original_amount: Decimal::from(100),
                net_amount: Decimal::from(100),
                txn_type: TxnType::Debit,
                merchant,
                receiver_name: None,
                sender_name: None,
                bank_name: "HDFC",
                account_number: None,
                raw_message: "raw",
                dedup_hash: hash,
                source: "sms",
                transaction_time: at,
                received_time: at,
                time_confidence: TimeConfidence::Exact,
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_table() {
        assert_eq!(categorize_merchant(&[], "Swiggy"), "Dining");
        assert_eq!(categorize_merchant(&[], "BigBasket Instamart"), "Groceries");
        assert_eq!(categorize_merchant(&[], "Uber India"), "Transport");
        assert_eq!(categorize_merchant(&[], "Some Unknown Shop"), "Other");
        assert_eq!(categorize_merchant(&[], ""), "Other");
    }

    #[test]
    fn test_user_rules_win_over_builtins() {
        let rules = [rule("Work Meals", &["swiggy"], &[])];
        assert_eq!(categorize_merchant(&rules, "Swiggy"), "Work Meals");
        assert_eq!(categorize_merchant(&rules, "Zomato"), "Dining");
    }

    #[test]
    fn test_pattern_rules_are_case_insensitive() {
        let rules = [rule("Subscriptions", &[], &["^net.*ix$"])];
        assert_eq!(categorize_merchant(&rules, "NETFLIX"), "Subscriptions");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rules = [rule("Broken", &[], &["("])];
        assert_eq!(categorize_merchant(&rules, "Swiggy"), "Dining");
    }

    #[test]
    fn test_batch_categorization_is_idempotent() {
        let (_dir, conn) = test_db();
        let id = seed_txn(&conn, "Swiggy", "h1");
        seed_txn(&conn, "Mystery Shop", "h2");

        let report = categorize_transactions(&conn, "u1", 100).unwrap();
        assert_eq!(report.updated, 2);
        let txn = store::get_transaction(&conn, "u1", id).unwrap().unwrap();
        assert_eq!(txn.category.as_deref(), Some("Dining"));

        // "Other" placeholders stay eligible, categorized rows do not.
        let report = categorize_transactions(&conn, "u1", 100).unwrap();
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_batch_respects_limit() {
        let (_dir, conn) = test_db();
        seed_txn(&conn, "Swiggy", "h1");
        seed_txn(&conn, "Zomato", "h2");
        seed_txn(&conn, "Uber", "h3");
        let report = categorize_transactions(&conn, "u1", 2).unwrap();
        assert_eq!(report.updated, 2);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn test_stored_rules_apply_in_batch() {
        let (_dir, conn) = test_db();
        store::insert_rule(&conn, "u1", "work meals", "Work Meals", &["swiggy".to_string()], &[])
            .unwrap();
        let id = seed_txn(&conn, "Swiggy", "h1");
        categorize_transactions(&conn, "u1", 100).unwrap();
        let txn = store::get_transaction(&conn, "u1", id).unwrap().unwrap();
        assert_eq!(txn.category.as_deref(), Some("Work Meals"));
    }
}
