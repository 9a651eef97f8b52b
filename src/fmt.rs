use rust_decimal::Decimal;

/// Format an amount as rupees with Indian digit grouping: ₹1,23,456.78
pub fn rupees(val: &Decimal) -> String {
    let negative = val.is_sign_negative();
    let abs = val.abs();
    let fixed = format!("{:.2}", abs);
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    // Indian grouping: rightmost group of three, then groups of two.
    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i == 3 || (i > 3 && (i - 3) % 2 == 0) {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-\u{20b9}{grouped}.{dec_part}")
    } else {
        format!("\u{20b9}{grouped}.{dec_part}")
    }
}
