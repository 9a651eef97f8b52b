use crate::error::Result;
use crate::fmt::rupees;
use crate::ingest::record_cash_entry;

pub fn run(
    db: Option<&str>,
    user: Option<&str>,
    amount: &str,
    merchant: Option<&str>,
    notes: Option<&str>,
    time: Option<&str>,
    api_key: Option<&str>,
) -> Result<()> {
    let mut conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, api_key, user)?;
    let amount = super::parse_amount(amount)?;
    let when = time.map(super::parse_ts).transpose()?;

    let (transaction, account) = record_cash_entry(&mut conn, &user_id, amount, merchant, notes, when)?;
    println!(
        "Recorded cash spend #{}: {} | {}",
        transaction.id,
        rupees(&transaction.amount),
        transaction.merchant
    );
    if let Some(balance) = account.current_balance {
        println!("Cash balance: {}", rupees(&balance));
    }
    Ok(())
}
