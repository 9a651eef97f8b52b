use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn run(data_dir: Option<String>, default_user: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(user) = default_user {
        settings.default_user_id = user;
    }

    let dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("paisa.db");
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized database at {}", db_path.display());
    if settings.default_user_id.is_empty() {
        println!("No default user set. Pass --user on commands or re-run init with --user.");
    } else {
        println!("Default user: {}", settings.default_user_id);
    }
    Ok(())
}
