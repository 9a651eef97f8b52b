use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::rupees;
use crate::models::Transaction;
use crate::{refunds, store};

fn candidate_table(transactions: &[Transaction]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Time", "Amount", "Merchant", "Bank"]);
    for txn in transactions {
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(txn.transaction_time.format("%Y-%m-%d %H:%M")),
            Cell::new(rupees(&txn.amount)),
            Cell::new(&txn.merchant),
            Cell::new(&txn.bank_name),
        ]);
    }
    table
}

pub fn candidates(db: Option<&str>, user: Option<&str>, id: i64) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let found = refunds::potential_refunds(&conn, &user_id, id)?;
    if found.is_empty() {
        println!("No refund candidates for transaction #{id}");
    } else {
        println!("Refund candidates for transaction #{id}\n{}", candidate_table(&found));
    }
    Ok(())
}

pub fn link(db: Option<&str>, user: Option<&str>, original: i64, refund: i64) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    refunds::link_refund(&conn, &user_id, original, refund)?;
    println!("{} refund #{refund} to transaction #{original}", "Linked".green());
    Ok(())
}

pub fn unlink(db: Option<&str>, user: Option<&str>, original: i64) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    refunds::unlink_refund(&conn, &user_id, original)?;
    println!("Unlinked refund from transaction #{original}");
    Ok(())
}

pub fn auto(db: Option<&str>, user: Option<&str>) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let report = refunds::auto_link(&conn, &user_id)?;
    println!("Linked {} of {} unlinked debits", report.linked, report.total_checked);
    Ok(())
}

pub fn pairs(db: Option<&str>, user: Option<&str>) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let pairs = store::refund_pairs(&conn, &user_id)?;
    if pairs.is_empty() {
        println!("No linked refunds");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Original", "Merchant", "Amount", "Refund", "Refunded at"]);
    for (original, refund) in pairs {
        table.add_row(vec![
            Cell::new(format!("#{}", original.id)),
            Cell::new(&original.merchant),
            Cell::new(rupees(&original.amount)),
            Cell::new(format!("#{}", refund.id)),
            Cell::new(refund.transaction_time.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("Refund pairs\n{table}");
    Ok(())
}

pub fn net_spend(db: Option<&str>, user: Option<&str>, from: &str, to: &str) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let from = super::parse_day_start(from)?;
    let to = super::parse_day_end(to)?;
    let report = refunds::net_spend(&conn, &user_id, &from, &to)?;

    println!("Total debits:    {}", rupees(&report.total_debits));
    println!(
        "Total refunded:  {} ({} refunds)",
        rupees(&report.total_refunded),
        report.refund_count
    );
    println!("Net spend:       {}", rupees(&report.net_spend).bold());
    Ok(())
}
