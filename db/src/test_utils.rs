//! Shared test utilities for database and integration tests.
//!
//! This module provides common helpers for setting up in-memory databases
//! with fixture data.

use crate::Database;

/// Create an empty in-memory database.
///
/// Used to verify operations fail gracefully when no schema exists.
pub fn setup_empty_db() -> Database {
    Database::open_in_memory().expect("Failed to open in-memory database")
}

/// Create an in-memory database with an `items (id, label, weight)` table.
///
/// This is the standard setup for statement and cursor tests: open an
/// in-memory database, create the table, return it ready for inserts.
pub fn setup_items_db() -> Database {
    let db = setup_empty_db();
    db.execute("CREATE TABLE items (id, label, weight)")
        .expect("Failed to create items table");
    db
}

/// Create an `items` database pre-populated with the given rows.
pub fn seeded_items_db(rows: &[(i64, &str, f64)]) -> Database {
    let db = setup_items_db();
    let insert = db
        .prepare("INSERT INTO items (id, label, weight) VALUES (?, ?, ?)")
        .expect("Failed to prepare insert");
    for (id, label, weight) in rows {
        insert.bind(1, *id).expect("Failed to bind id");
        insert.bind(2, *label).expect("Failed to bind label");
        insert.bind(3, *weight).expect("Failed to bind weight");
        insert.execute().expect("Failed to insert row");
        insert.reset().expect("Failed to reset insert");
    }
    insert.close();
    db
}
