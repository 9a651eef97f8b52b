use crate::categorizer::categorize_transactions;
use crate::error::Result;

pub fn run(db: Option<&str>, user: Option<&str>, limit: usize) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let report = categorize_transactions(&conn, &user_id, limit)?;
    println!("Categorized {} of {} pending transactions", report.updated, report.total);
    Ok(())
}
