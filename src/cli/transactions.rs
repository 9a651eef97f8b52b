use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::rupees;
use crate::store;

pub fn list(db: Option<&str>, user: Option<&str>, limit: usize) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let transactions = store::list_transactions(&conn, &user_id, limit)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Time", "Type", "Amount", "Merchant", "Bank", "Category", "Refund of"]);
    for txn in transactions {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(txn.transaction_time.format("%Y-%m-%d %H:%M")),
            Cell::new(txn.txn_type.as_str()),
            Cell::new(rupees(&txn.amount)),
            Cell::new(&txn.merchant),
            Cell::new(&txn.bank_name),
            Cell::new(txn.category.unwrap_or_default()),
            Cell::new(txn.is_refund_of.map(|id| format!("#{id}")).unwrap_or_default()),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

pub fn set_category(db: Option<&str>, user: Option<&str>, id: i64, category: &str) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::set_transaction_category(&conn, &user_id, id, Some(category))?;
    println!("Transaction #{id} categorized as {category}");
    Ok(())
}

pub fn set_notes(db: Option<&str>, user: Option<&str>, id: i64, notes: Option<&str>) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::set_transaction_notes(&conn, &user_id, id, notes)?;
    match notes {
        Some(_) => println!("Updated notes on transaction #{id}"),
        None => println!("Cleared notes on transaction #{id}"),
    }
    Ok(())
}

pub fn tag(db: Option<&str>, user: Option<&str>, id: i64, tags: &[String]) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::set_transaction_tags(&conn, &user_id, id, tags)?;
    println!("Tagged transaction #{id}: {}", tags.join(", "));
    Ok(())
}

pub fn delete(db: Option<&str>, user: Option<&str>, id: i64) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::delete_transaction(&conn, &user_id, id)?;
    println!("Deleted transaction #{id}");
    Ok(())
}
