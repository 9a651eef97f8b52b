use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{Confidence, ParsedTransaction, TimeConfidence, TxnType};

// Amount: Rs. 500, Rs 500.00, ₹500, INR 500, with optional thousands
// separators and up to two decimal places.
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\brs\.?|\binr|\u{20b9})\s*(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .unwrap()
});

static DEBIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:debited|debit|sent|withdrawn|paid|spent|purchase|payment to|card payment)\b")
        .unwrap()
});

static CREDIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:credited|credit|received|deposited|refund|refunded)\b").unwrap()
});

static ATM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:atm|withdrawal|cash withdrawal)\b").unwrap());

static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:credit card|card ending|card no|card\s*\d{4}|visa|mastercard|amex|rupay|card|cc)\b")
        .unwrap()
});

// Fixed vocabulary of known bank name variants.
static BANK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(HDFC|ICICI|SBI|State Bank of India|Axis|YES|Kotak|RBL|IndusInd|IDBI|PNB|BOI|Bank of India|Union Bank|Canara|BOB|Bank)\b",
    )
    .unwrap()
});

// "Available balance: Rs. 10,450", "Avl bal Rs 10,450", "remaining ₹500"
static BALANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:available balance|avl\.?\s*bal(?:ance)?|avail(?:able)?\s*bal(?:ance)?|balance|bal|remaining)\b[.:\s]*(?:of\s+)?(?:rs\.?|inr|\u{20b9})\s*(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)",
    )
    .unwrap()
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\s*([AaPp][Mm])?\b").unwrap());

// Account number reference: "a/c XX1234", "acct no. 5678"
static ACCOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:a/c|acct|account)\s*(?:no\.?\s*)?[x*]*(\d{2,6})\b").unwrap()
});

static RECEIVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bto\s+([A-Za-z][A-Za-z ]*?)(?:[.,]|\s+at\b|\s+on\b|\s+a/c|$)").unwrap()
});

static SENDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfrom\s+([A-Za-z][A-Za-z ]*?)(?:[.,]|\s+at\b|\s+on\b|\s+a/c|$)").unwrap()
});

static HOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\baccount\s+holder[:\s]+([A-Za-z][A-Za-z ]*?)(?:[.,]|\s+a/c|$)").unwrap()
});

// Merchant span anchors and delimiters. The span after an anchor runs up
// to the next preposition, time token, currency token, punctuation, or a
// character outside the merchant alphabet.
static MERCHANT_ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:at|from|to|via)\s+").unwrap());

static MERCHANT_DELIM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:on|at|via|txn|type|ref|inr|rs)\b|\s+\d{1,2}:|\u{20b9}|[.,]|[^A-Za-z0-9&.'()/:#\s-]")
        .unwrap()
});

static STOPWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:on|at|type|txn|ref|refunded|is|via|by|using|a|the|for)\b").unwrap()
});

static UPI_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._-]+@[A-Za-z]{2,}").unwrap());

static LONG_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5,}\b").unwrap());

static EDGE_TRIM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^A-Za-z0-9]+|[^A-Za-z0-9]+$").unwrap());

static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());

const MAX_AMOUNT: i64 = 100_000_000;

/// Parse a raw SMS into a structured transaction, or `None` when the text
/// is not a transaction notification.
///
/// The only hard gate is the currency-marked amount: text without one, or
/// with an amount outside (0, 1e8], is rejected. Every other field
/// degrades to a default instead of rejecting.
pub fn parse_message(text: &str, received_at: DateTime<Utc>) -> Option<ParsedTransaction> {
    let amount = extract_amount(text)?;
    if amount <= Decimal::ZERO || amount > Decimal::from(MAX_AMOUNT) {
        return None;
    }

    let txn_type = extract_type(text);
    let bank_name = extract_bank(text);
    let merchant = extract_merchant(text, &bank_name).unwrap_or_else(|| "UNKNOWN".to_string());
    let balance_from_sms = extract_balance(text);
    let (transaction_time, time_confidence) = extract_time(text, received_at);

    let parsing_confidence = if merchant != "UNKNOWN" && txn_type != TxnType::Unknown {
        Confidence::High
    } else if merchant != "UNKNOWN" || txn_type != TxnType::Unknown {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    Some(ParsedTransaction {
        amount,
        original_amount: amount,
        net_amount: amount,
        txn_type,
        merchant,
        bank_name,
        account_number: capture(&ACCOUNT_RE, text),
        account_holder: capture(&HOLDER_RE, text),
        receiver_name: capture(&RECEIVER_RE, text),
        sender_name: capture(&SENDER_RE, text),
        balance_from_sms,
        transaction_time,
        time_confidence,
        is_card_payment: CARD_RE.is_match(text),
        parsing_confidence,
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_amount(text: &str) -> Option<Decimal> {
    let cap = AMOUNT_RE.captures(text)?;
    parse_decimal(cap.get(1)?.as_str())
}

fn extract_type(text: &str) -> TxnType {
    if DEBIT_RE.is_match(text) {
        TxnType::Debit
    } else if CREDIT_RE.is_match(text) {
        TxnType::Credit
    } else if ATM_RE.is_match(text) {
        TxnType::Atm
    } else {
        TxnType::Unknown
    }
}

fn extract_bank(text: &str) -> String {
    BANK_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

fn extract_balance(text: &str) -> Option<Decimal> {
    let cap = BALANCE_RE.captures(text)?;
    parse_decimal(cap.get(1)?.as_str())
}

/// Merchant: the span after the first at/to/via/from anchor that survives
/// cleanup. Spans that are account references ("HDFC a/c XX1234") or just
/// the bank name are skipped so the next anchor gets a chance.
fn extract_merchant(text: &str, bank_name: &str) -> Option<String> {
    for anchor in MERCHANT_ANCHOR_RE.find_iter(text) {
        let tail = &text[anchor.end()..];
        let end = MERCHANT_DELIM_RE.find(tail).map_or(tail.len(), |m| m.start());
        let span = &tail[..end];
        if ACCOUNT_RE.is_match(span) {
            continue;
        }
        let cleaned = clean_merchant(span);
        if cleaned.is_empty() || cleaned.to_uppercase() == bank_name {
            continue;
        }
        return Some(cleaned);
    }
    None
}

fn clean_merchant(span: &str) -> String {
    let s = STOPWORD_RE.replace_all(span, "");
    let s = UPI_ID_RE.replace_all(&s, "");
    let s = LONG_DIGITS_RE.replace_all(&s, "");
    let s = EDGE_TRIM_RE.replace_all(&s, "");
    SPACE_RE.replace_all(&s, " ").trim().to_string()
}

/// An explicit HH:MM[AM/PM] token combined with the received calendar
/// date yields an exact timestamp; otherwise fall back to `received_at`.
fn extract_time(text: &str, received_at: DateTime<Utc>) -> (DateTime<Utc>, TimeConfidence) {
    if let Some(cap) = TIME_RE.captures(text) {
        let hours: u32 = cap[1].parse().unwrap_or(0);
        let minutes: u32 = cap[2].parse().unwrap_or(0);
        let period = cap.get(3).map(|m| m.as_str().to_uppercase());

        let hours = match period.as_deref() {
            Some("PM") if hours != 12 => hours + 12,
            Some("AM") if hours == 12 => 0,
            _ => hours,
        };

        if let Some(ndt) = received_at.date_naive().and_hms_opt(hours, minutes, 0) {
            return (ndt.and_utc(), TimeConfidence::Exact);
        }
    }
    (received_at, TimeConfidence::Estimated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 5, 8, 30, 0).unwrap()
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_full_hdfc_debit_message() {
        let text = "Rs. 500 debited from HDFC a/c XX1234 at Swiggy on 05-01 01:44 PM. Avl bal Rs 10,450";
        let p = parse_message(text, received()).unwrap();
        assert_eq!(p.amount, d("500"));
        assert_eq!(p.txn_type, TxnType::Debit);
        assert_eq!(p.bank_name, "HDFC");
        assert_eq!(p.merchant, "Swiggy");
        assert_eq!(p.account_number.as_deref(), Some("1234"));
        assert_eq!(p.balance_from_sms, Some(d("10450")));
        assert_eq!(p.time_confidence, TimeConfidence::Exact);
        assert_eq!(p.transaction_time, Utc.with_ymd_and_hms(2025, 1, 5, 13, 44, 0).unwrap());
        assert_eq!(p.parsing_confidence, Confidence::High);
        assert!(!p.is_card_payment);
    }

    #[test]
    fn test_rejects_text_without_currency_marker() {
        assert!(parse_message("Your OTP is 123456. Do not share it.", received()).is_none());
        assert!(parse_message("500 debited from account at Swiggy", received()).is_none());
        assert!(parse_message("", received()).is_none());
    }

    #[test]
    fn test_rejects_zero_and_oversized_amounts() {
        assert!(parse_message("Rs 0 debited from HDFC", received()).is_none());
        assert!(parse_message("INR 999,999,999 credited to your account", received()).is_none());
        assert!(parse_message("Rs 100,000,001 credited", received()).is_none());
        // Exactly at the cap is still accepted.
        assert!(parse_message("Rs 100,000,000 credited", received()).is_some());
    }

    #[test]
    fn test_amount_formats() {
        assert_eq!(parse_message("Rs. 500 debited", received()).unwrap().amount, d("500"));
        assert_eq!(
            parse_message("Rs 1,234.56 paid at Store", received()).unwrap().amount,
            d("1234.56")
        );
        assert_eq!(parse_message("\u{20b9}99 spent on card", received()).unwrap().amount, d("99"));
        assert_eq!(parse_message("INR 42.5 received", received()).unwrap().amount, d("42.5"));
    }

    #[test]
    fn test_type_priority_debit_over_credit() {
        // Debit keyword set is tested first, so it wins when both appear.
        let p = parse_message("Rs 100 debited and credited back", received()).unwrap();
        assert_eq!(p.txn_type, TxnType::Debit);
    }

    #[test]
    fn test_credit_and_atm_types() {
        let p = parse_message("Rs 900 credited to your a/c XX88", received()).unwrap();
        assert_eq!(p.txn_type, TxnType::Credit);
        let p = parse_message("Rs 2000 ATM cash at HDFC ATM", received()).unwrap();
        assert_eq!(p.txn_type, TxnType::Atm);
    }

    #[test]
    fn test_unknown_type_still_accepted() {
        let p = parse_message("Rs 450 towards your bill", received()).unwrap();
        assert_eq!(p.txn_type, TxnType::Unknown);
    }

    #[test]
    fn test_unknown_bank() {
        let p = parse_message("Rs 450 debited at Swiggy", received()).unwrap();
        assert_eq!(p.bank_name, "UNKNOWN");
    }

    #[test]
    fn test_merchant_skips_account_reference_span() {
        // "from HDFC a/c XX1234" must not be mistaken for the merchant.
        let text = "Rs. 500 debited from HDFC a/c XX1234 at Swiggy on 05-01";
        let p = parse_message(text, received()).unwrap();
        assert_eq!(p.merchant, "Swiggy");
    }

    #[test]
    fn test_merchant_strips_upi_id_and_references() {
        let p = parse_message("Rs 320 paid to merchant@okaxis via UPI ref 918273645190", received()).unwrap();
        // The span is cut at the '@', so the VPA domain and the long
        // numeric reference never reach the merchant field.
        assert_eq!(p.merchant, "merchant");
        assert!(!p.merchant.contains("918273645190"));
    }

    #[test]
    fn test_merchant_never_empty_after_cleanup() {
        let p = parse_message("Rs 500 paid at 9182736451", received()).unwrap();
        assert_eq!(p.merchant, "UNKNOWN");
    }

    #[test]
    fn test_merchant_collapses_whitespace() {
        let p = parse_message("Rs 150 spent at Cafe   Coffee   Day, Mumbai", received()).unwrap();
        assert_eq!(p.merchant, "Cafe Coffee Day");
    }

    #[test]
    fn test_balance_variants() {
        let cases = [
            ("Rs 10 debited. Available balance: Rs. 5,000", "5000"),
            ("Rs 10 debited. Avl bal Rs 900.50", "900.50"),
            ("Rs 10 debited. Balance Rs 100", "100"),
            ("Rs 10 debited. remaining \u{20b9}42", "42"),
        ];
        for (text, expected) in cases {
            let p = parse_message(text, received()).unwrap();
            assert_eq!(p.balance_from_sms, Some(d(expected)), "failed: {text}");
        }
    }

    #[test]
    fn test_no_balance_is_none() {
        let p = parse_message("Rs 10 debited at Store", received()).unwrap();
        assert_eq!(p.balance_from_sms, None);
    }

    #[test]
    fn test_time_am_pm_conversion() {
        let p = parse_message("Rs 10 debited at Store on 12:05 AM", received()).unwrap();
        assert_eq!(p.transaction_time, Utc.with_ymd_and_hms(2025, 1, 5, 0, 5, 0).unwrap());
        let p = parse_message("Rs 10 debited at Store on 12:30 PM", received()).unwrap();
        assert_eq!(p.transaction_time, Utc.with_ymd_and_hms(2025, 1, 5, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_missing_time_falls_back_to_received() {
        let p = parse_message("Rs 10 debited at Store", received()).unwrap();
        assert_eq!(p.transaction_time, received());
        assert_eq!(p.time_confidence, TimeConfidence::Estimated);
    }

    #[test]
    fn test_invalid_time_token_falls_back() {
        let p = parse_message("Rs 10 debited at Store on 29:99", received()).unwrap();
        assert_eq!(p.time_confidence, TimeConfidence::Estimated);
    }

    #[test]
    fn test_receiver_and_sender_names() {
        let p = parse_message("Rs 500 sent to John Doe, UPI", received()).unwrap();
        assert_eq!(p.receiver_name.as_deref(), Some("John Doe"));
        let p = parse_message("Rs 500 received from Jane Smith. Ref 123", received()).unwrap();
        assert_eq!(p.sender_name.as_deref(), Some("Jane Smith"));
    }

    #[test]
    fn test_account_holder() {
        let p = parse_message("Rs 500 debited. Account holder: Ravi Kumar.", received()).unwrap();
        assert_eq!(p.account_holder.as_deref(), Some("Ravi Kumar"));
    }

    #[test]
    fn test_card_flag() {
        let p = parse_message("Rs 500 spent on HDFC credit card at Amazon", received()).unwrap();
        assert!(p.is_card_payment);
        let p = parse_message("Rs 500 debited at Amazon", received()).unwrap();
        assert!(!p.is_card_payment);
    }

    #[test]
    fn test_confidence_levels() {
        // merchant + type → high
        let p = parse_message("Rs 10 debited at Store", received()).unwrap();
        assert_eq!(p.parsing_confidence, Confidence::High);
        // only type → medium
        let p = parse_message("Rs 10 debited", received()).unwrap();
        assert_eq!(p.parsing_confidence, Confidence::Medium);
        // neither → low
        let p = parse_message("Rs 10 balance update", received()).unwrap();
        assert_eq!(p.parsing_confidence, Confidence::Low);
    }

    #[test]
    fn test_amount_fields_mirror_each_other() {
        let p = parse_message("Rs 75.50 debited at Store", received()).unwrap();
        assert_eq!(p.amount, p.original_amount);
        assert_eq!(p.amount, p.net_amount);
    }
}
