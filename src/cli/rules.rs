use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::store;

pub fn add(
    db: Option<&str>,
    user: Option<&str>,
    name: &str,
    category: &str,
    keywords: &[String],
    patterns: &[String],
) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    store::insert_rule(&conn, &user_id, name, category, keywords, patterns)?;
    println!("Added rule: {name} -> {category}");
    Ok(())
}

pub fn list(db: Option<&str>, user: Option<&str>) -> Result<()> {
    let conn = super::open_db(db)?;
    let user_id = super::resolve_user(&conn, None, user)?;
    let rules = store::user_rules(&conn, &user_id)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Category", "Keywords", "Patterns"]);
    for rule in rules {
        table.add_row(vec![
            Cell::new(rule.id),
            Cell::new(&rule.name),
            Cell::new(&rule.parent_category),
            Cell::new(rule.keywords.join(", ")),
            Cell::new(rule.merchant_patterns.join(", ")),
        ]);
    }
    println!("Rules\n{table}");
    Ok(())
}
