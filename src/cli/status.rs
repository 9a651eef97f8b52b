use std::path::PathBuf;

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run(db: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let db_path = match db {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(&settings.data_dir).join("paisa.db"),
    };

    println!(
        "Default user: {}",
        if settings.default_user_id.is_empty() { "(not set)" } else { &settings.default_user_id }
    );
    println!("Data dir:     {}", settings.data_dir);
    println!("Database:     {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let refunds: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE is_refund_of IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let rules: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;
        let keys: i64 = conn.query_row("SELECT count(*) FROM api_keys", [], |r| r.get(0))?;

        println!();
        println!("Accounts:      {accounts}");
        println!("Transactions:  {transactions}");
        println!("Refund links:  {refunds}");
        println!("Rules:         {rules}");
        println!("API keys:      {keys}");
    } else {
        println!();
        println!("Database not found. Run `paisa init` to set up.");
    }
    Ok(())
}
