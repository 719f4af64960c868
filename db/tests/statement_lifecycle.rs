#![cfg(feature = "backend-memory")]

//! Integration tests for the statement lifecycle.
//!
//! These tests verify end-to-end behavior across the database, statement
//! and cursor layers: binding, stepping, resetting, shared statement
//! lifetime, and the open/closed state guards.

use std::path::Path;
use std::sync::Arc;

use stepsql::engine::{Engine, MemoryEngine};
use stepsql::{Database, Error};
use tempfile::tempdir;

// ==================== Bind and Read Tests ====================

#[test]
fn test_named_and_positional_binds_round_trip() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id, value)")
        .expect("Failed to create table");

    let insert = db
        .prepare("INSERT INTO samples (id, value) VALUES (:id, ?)")
        .expect("Failed to prepare insert");
    insert.bind_named(":id", 1).expect("Failed to bind :id");
    insert.bind(2, "test value").expect("Failed to bind value");
    insert.execute().expect("Failed to run insert");
    insert.close();

    let select = db
        .prepare("SELECT id, value FROM samples")
        .expect("Failed to prepare select");
    let rows = select.execute().expect("Failed to run select");
    assert!(rows.can_read());
    assert_eq!(rows.read_int(0).expect("Failed to read id"), 1);
    assert_eq!(
        rows.read_text(1).expect("Failed to read value"),
        "test value"
    );
}

#[test]
fn test_reset_and_rebind_reuses_the_statement() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id, value)")
        .expect("Failed to create table");

    let insert = db
        .prepare("INSERT INTO samples (id, value) VALUES (:id, ?)")
        .expect("Failed to prepare insert");

    insert.bind_named(":id", 1).expect("Failed to bind :id");
    insert.bind(2, "a").expect("Failed to bind value");
    insert.execute().expect("Failed to insert first row");

    // The name still resolves to its slot after the rewind.
    insert.reset().expect("Failed to reset statement");
    insert.bind_named(":id", 2).expect("Failed to rebind :id");
    insert.bind(2, "b").expect("Failed to rebind value");
    insert.execute().expect("Failed to insert second row");
    insert.close();

    let mut rows = db
        .prepare("SELECT id, value FROM samples")
        .expect("Failed to prepare select")
        .execute()
        .expect("Failed to run select");

    assert_eq!(rows.read_int(0).unwrap(), 1);
    assert_eq!(rows.read_text(1).unwrap(), "a");
    assert!(rows.next().expect("Failed to advance"));
    assert_eq!(rows.read_int(0).unwrap(), 2);
    assert_eq!(rows.read_text(1).unwrap(), "b");
    assert!(!rows.next().expect("Failed to advance past the end"));
    assert!(!rows.can_read());
}

#[test]
fn test_unknown_named_parameter_is_rejected() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id)")
        .expect("Failed to create table");

    let insert = db
        .prepare("INSERT INTO samples (id) VALUES (:id)")
        .expect("Failed to prepare insert");
    let err = insert.bind_named(":missing", 1).unwrap_err();
    assert!(matches!(
        err,
        Error::NoSuchParameter { name } if name == ":missing"
    ));
}

// ==================== Lifetime Tests ====================

#[test]
fn test_result_set_keeps_the_statement_alive() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id)")
        .expect("Failed to create table");
    db.execute("INSERT INTO samples (id) VALUES (7)")
        .expect("Failed to insert");

    let rows = {
        let select = db
            .prepare("SELECT id FROM samples")
            .expect("Failed to prepare select");
        select.execute().expect("Failed to run select")
        // The statement handle goes out of scope here.
    };

    assert!(rows.can_read());
    assert_eq!(rows.read_int(0).expect("Failed to read id"), 7);
}

#[test]
fn test_database_drop_releases_statements() {
    let engine = Arc::new(MemoryEngine::new());
    {
        let db = Database::open(Arc::clone(&engine) as Arc<dyn Engine>, Path::new("first"))
            .expect("Failed to open database");
        db.execute("CREATE TABLE samples (id)")
            .expect("Failed to create table");
        let _stmt = db
            .prepare("SELECT id FROM samples")
            .expect("Failed to prepare select");
        // The statement drops first and finalizes its handle, so the
        // database's own drop can disconnect cleanly.
    }

    // The engine accepts a fresh connection afterwards.
    let db = Database::open(engine, Path::new("second")).expect("Failed to reopen");
    assert!(db.is_open());
}

// ==================== State Guard Tests ====================

#[test]
fn test_double_open_leaves_the_first_connection_usable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db = Database::open(
        Arc::new(MemoryEngine::new()),
        dir.path().join("samples.db"),
    )
    .expect("Failed to open database");

    let err = db.connect(dir.path().join("other.db")).unwrap_err();
    assert!(matches!(err, Error::AlreadyOpen { .. }));

    db.execute("CREATE TABLE samples (id)")
        .expect("First connection should still work");
}

#[test]
fn test_closed_statement_rejects_every_operation() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id)")
        .expect("Failed to create table");

    let stmt = db
        .prepare("SELECT id FROM samples")
        .expect("Failed to prepare select");
    stmt.close();
    stmt.close(); // Second close is a no-op.

    assert!(matches!(stmt.bind(1, 1), Err(Error::NotOpen { .. })));
    assert!(matches!(stmt.execute(), Err(Error::NotOpen { .. })));
    assert!(matches!(stmt.reset(), Err(Error::NotOpen { .. })));
    assert!(matches!(stmt.read_int(0), Err(Error::NotOpen { .. })));
}

#[test]
fn test_read_without_a_row_is_an_error() {
    let db = Database::open_in_memory().expect("Failed to open database");
    db.execute("CREATE TABLE samples (id)")
        .expect("Failed to create table");

    let rows = db
        .prepare("SELECT id FROM samples")
        .expect("Failed to prepare select")
        .execute()
        .expect("Failed to run select");

    assert!(!rows.can_read());
    assert!(matches!(rows.read_int(0), Err(Error::NoRow)));
}
