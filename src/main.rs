mod auth;
mod categorizer;
mod cli;
mod db;
mod error;
mod fingerprint;
mod fmt;
mod ingest;
mod models;
mod parser;
mod reconciler;
mod refunds;
mod resolver;
mod settings;
mod store;

use clap::Parser;

use cli::{
    AccountsCommands, ApikeysCommands, Cli, Commands, RefundsCommands, RulesCommands,
    TransactionsCommands,
};

fn main() {
    let cli = Cli::parse();
    let db = cli.db.as_deref();
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Init { ref data_dir } => {
            cli::init::run(data_dir.clone(), cli.user.clone())
        }
        Commands::Ingest { ref message, ref api_key, ref received_at, ref source } => {
            cli::ingest::run(db, user, message, api_key.as_deref(), received_at.as_deref(), source)
        }
        Commands::Cash { ref amount, ref merchant, ref notes, ref time, ref api_key } => cli::cash::run(
            db,
            user,
            amount,
            merchant.as_deref(),
            notes.as_deref(),
            time.as_deref(),
            api_key.as_deref(),
        ),
        Commands::Accounts { ref command } => match command {
            AccountsCommands::List { all } => cli::accounts::list(db, user, *all),
            AccountsCommands::Deactivate { id } => cli::accounts::deactivate(db, user, *id),
        },
        Commands::Transactions { ref command } => match command {
            TransactionsCommands::List { limit } => cli::transactions::list(db, user, *limit),
            TransactionsCommands::SetCategory { id, category } => {
                cli::transactions::set_category(db, user, *id, category)
            }
            TransactionsCommands::SetNotes { id, notes } => {
                cli::transactions::set_notes(db, user, *id, notes.as_deref())
            }
            TransactionsCommands::Tag { id, tags } => cli::transactions::tag(db, user, *id, tags),
            TransactionsCommands::Delete { id } => cli::transactions::delete(db, user, *id),
        },
        Commands::Refunds { ref command } => match command {
            RefundsCommands::Candidates { id } => cli::refunds::candidates(db, user, *id),
            RefundsCommands::Link { original, refund } => {
                cli::refunds::link(db, user, *original, *refund)
            }
            RefundsCommands::Unlink { original } => cli::refunds::unlink(db, user, *original),
            RefundsCommands::Auto => cli::refunds::auto(db, user),
            RefundsCommands::Pairs => cli::refunds::pairs(db, user),
            RefundsCommands::NetSpend { from, to } => cli::refunds::net_spend(db, user, from, to),
        },
        Commands::Categorize { limit } => cli::categorize::run(db, user, limit),
        Commands::Rules { ref command } => match command {
            RulesCommands::Add { name, category, keywords, patterns } => {
                cli::rules::add(db, user, name, category, keywords, patterns)
            }
            RulesCommands::List => cli::rules::list(db, user),
        },
        Commands::Apikeys { ref command } => match command {
            ApikeysCommands::Add { key, user_id } => cli::apikeys::add(db, key, user_id),
        },
        Commands::Status => cli::status::run(db),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
