use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const SAMPLE: &str =
    "Rs. 500 debited from HDFC a/c XX1234 at Swiggy on 05-01 01:44 PM. Avl bal Rs 10,450";

fn paisa(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("paisa").expect("binary builds");
    cmd.arg("--db").arg(db).arg("--user").arg("u1");
    cmd
}

#[test]
fn ingest_then_redeliver_reports_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args(["ingest", SAMPLE, "--received-at", "2025-01-05T14:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accepted"))
        .stdout(predicate::str::contains("Swiggy"))
        .stdout(predicate::str::contains("10,450"));

    paisa(&db)
        .args(["ingest", SAMPLE, "--received-at", "2025-01-05T14:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Duplicate"));

    paisa(&db)
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Swiggy").count(1));
}

#[test]
fn promotional_message_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args(["ingest", "Get 50% off on your next pizza order!"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ignored: non-transaction message"));
}

#[test]
fn cash_entry_and_account_listing() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args(["cash", "150", "--merchant", "Chai stall"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded cash spend"))
        .stdout(predicate::str::contains("Chai stall"));

    paisa(&db)
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CASH"))
        .stdout(predicate::str::contains("cash"));
}

#[test]
fn refund_auto_link_and_net_spend() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args([
            "ingest",
            "Rs. 500 debited from HDFC a/c XX1234 at Myntra",
            "--received-at",
            "2025-01-05T10:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accepted"));

    paisa(&db)
        .args([
            "ingest",
            "Rs. 500 credited to HDFC a/c XX1234 from Myntra",
            "--received-at",
            "2025-01-07T10:00:00Z",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accepted"));

    paisa(&db)
        .args(["refunds", "candidates", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Refund candidates"));

    paisa(&db)
        .args(["refunds", "auto"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Linked 1 of 1"));

    paisa(&db)
        .args(["refunds", "pairs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1"))
        .stdout(predicate::str::contains("#2"));

    paisa(&db)
        .args(["refunds", "net-spend", "--from", "2025-01-01", "--to", "2025-01-31"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Net spend"))
        .stdout(predicate::str::contains("0.00"));
}

#[test]
fn categorize_assigns_builtin_category() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args(["ingest", SAMPLE])
        .assert()
        .success();

    paisa(&db)
        .args(["categorize"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Categorized 1 of 1"));

    paisa(&db)
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dining"));
}

#[test]
fn api_key_resolves_the_ingesting_user() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db)
        .args(["apikeys", "add", "secret123", "--user-id", "phone_user"])
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("paisa").unwrap();
    cmd.arg("--db")
        .arg(&db)
        .args(["ingest", SAMPLE, "--api-key", "secret123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Accepted"));

    // The transaction belongs to the key's user, not anyone else.
    let mut other = Command::cargo_bin("paisa").unwrap();
    other
        .arg("--db")
        .arg(&db)
        .args(["--user", "phone_user", "transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Swiggy"));
}

#[test]
fn unknown_api_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    let mut cmd = Command::cargo_bin("paisa").unwrap();
    cmd.arg("--db")
        .arg(&db)
        .args(["ingest", SAMPLE, "--api-key", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unauthorized"));
}

#[test]
fn metadata_edits_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("paisa.db");

    paisa(&db).args(["ingest", SAMPLE]).assert().success();

    paisa(&db)
        .args(["transactions", "set-category", "1", "Dining"])
        .assert()
        .success()
        .stdout(predicate::str::contains("categorized as Dining"));

    paisa(&db)
        .args(["transactions", "tag", "1", "work", "lunch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work, lunch"));

    paisa(&db)
        .args(["transactions", "set-notes", "99", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
