use crate::auth::add_api_key;
use crate::error::Result;

pub fn add(db: Option<&str>, key: &str, user_id: &str) -> Result<()> {
    let conn = super::open_db(db)?;
    add_api_key(&conn, key, user_id)?;
    println!("API key bound to user {user_id}");
    Ok(())
}
