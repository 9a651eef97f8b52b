use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::rupees;
use crate::store;

pub fn list(db: Option<&str>, user: Option<&str>, all: bool) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let accounts = store::list_accounts(&conn, &user_id, all)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Bank", "Number", "Holder", "Type", "Balance", "Source", "Confidence", "Active",
    ]);
    for account in accounts {
        let balance = account
            .current_balance
            .map(|b| rupees(&b))
            .unwrap_or_else(|| "unknown".to_string());
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(&account.bank_name),
            Cell::new(account.account_number.unwrap_or_default()),
            Cell::new(account.account_holder.unwrap_or_default()),
            Cell::new(account.account_type.as_str()),
            Cell::new(balance),
            Cell::new(account.balance_source.as_str()),
            Cell::new(account.balance_confidence.as_str()),
            Cell::new(if account.is_active { "yes" } else { "no" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn deactivate(db: Option<&str>, user: Option<&str>, id: i64) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::deactivate_account(&conn, &user_id, id)?;
    println!("Deactivated account #{id}");
    Ok(())
}
