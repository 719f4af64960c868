//! Database connection management.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{ConnectionHandle, Engine, EngineError, StatementHandle};
use crate::error::{Error, Result};
use crate::openable::Openable;
use crate::statement::Statement;

/// An open (or openable) connection to one storage file.
///
/// The database is the root resource: it owns the engine connection handle
/// exclusively and releases it exactly once, either through [`close`]
/// (which may fail and leave the connection open) or on drop, where close
/// failures are logged and swallowed since nothing can be done with them
/// at teardown time. `Database` is deliberately not `Clone`: duplicating the
/// connection handle would break single-release.
///
/// Statements are created through [`prepare`]; the engine refuses to close
/// a connection while compiled statements on it remain unfinalized, so
/// close statement handles before closing the database.
///
/// [`close`]: Database::close
/// [`prepare`]: Database::prepare
///
/// # Examples
///
/// ```
/// use stepsql::Database;
///
/// # fn main() -> stepsql::Result<()> {
/// let db = Database::open_in_memory()?;
/// db.execute("CREATE TABLE users (id, name)")?;
///
/// let insert = db.prepare("INSERT INTO users (id, name) VALUES (:id, ?)")?;
/// insert.bind_named(":id", 1)?;
/// insert.bind(2, "alice")?;
/// insert.execute()?;
/// insert.close();
///
/// let select = db.prepare("SELECT id, name FROM users")?;
/// let rows = select.execute()?;
/// assert!(rows.can_read());
/// assert_eq!(rows.read_text(1)?, "alice");
/// # Ok(())
/// # }
/// ```
pub struct Database {
    engine: Arc<dyn Engine>,
    state: Mutex<DatabaseState>,
}

struct DatabaseState {
    openable: Openable,
    handle: Option<ConnectionHandle>,
}

impl DatabaseState {
    fn require_handle(&self) -> Result<ConnectionHandle> {
        self.openable.require_open()?;
        self.handle.ok_or(Error::NotOpen {
            resource: "Database",
        })
    }
}

impl Database {
    /// Creates a closed database over the given engine. Call
    /// [`connect`](Self::connect) before using it.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            state: Mutex::new(DatabaseState {
                openable: Openable::new("Database", false),
                handle: None,
            }),
        }
    }

    /// Creates a database and opens `path` immediately. The file does not
    /// need to exist; the engine creates it.
    pub fn open(engine: Arc<dyn Engine>, path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(engine);
        db.connect(path)?;
        Ok(db)
    }

    /// Opens an in-memory database over the built-in engine backend.
    #[cfg(feature = "backend-memory")]
    pub fn open_in_memory() -> Result<Self> {
        Self::open(
            Arc::new(crate::engine::MemoryEngine::new()),
            Path::new(":memory:"),
        )
    }

    /// Whether a connection is currently open.
    pub fn is_open(&self) -> bool {
        self.state.lock().openable.is_open()
    }

    /// Opens a connection to `path`.
    ///
    /// Fails with an invalid-state error if a connection is already open
    /// (the existing connection is left untouched), with an allocation
    /// error if the engine cannot allocate a connection object, and with
    /// an engine error (code + message) if the engine allocated but could
    /// not open. In that last case the engine has already released
    /// whatever it allocated.
    pub fn connect(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut state = self.state.lock();
        state.openable.require_closed()?;
        let handle = self
            .engine
            .connect(path.as_ref())
            .map_err(|e| Error::from_engine(e, "connection"))?;
        state.handle = Some(handle);
        state.openable.set_open(true);
        Ok(())
    }

    /// Closes the connection. A no-op when already closed.
    ///
    /// If the engine refuses to close (for example because compiled
    /// statements are still outstanding), the error is surfaced and the
    /// database stays open and usable.
    pub fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        let Some(handle) = state.handle else {
            return Ok(());
        };
        self.engine
            .disconnect(handle)
            .map_err(|e| Error::from_engine(e, "disconnect"))?;
        state.handle = None;
        state.openable.set_open(false);
        Ok(())
    }

    /// Executes `sql` as a one-shot statement, discarding any rows.
    ///
    /// Use [`prepare`](Self::prepare) instead when the statement has
    /// parameters to bind or rows worth reading.
    pub fn execute(&self, sql: &str) -> Result<()> {
        let statement = self.prepare(sql)?;
        statement.step()?;
        // The statement is finalized by drop.
        Ok(())
    }

    /// Compiles `sql` into a reusable [`Statement`].
    ///
    /// Fails with an invalid-state error when the database is not open,
    /// an allocation error when the engine cannot produce a statement
    /// handle, and an engine error (code + message) when compilation fails.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let handle = self.compile(sql)?;
        Ok(Statement::new(Arc::clone(&self.engine), handle))
    }

    fn compile(&self, sql: &str) -> Result<StatementHandle> {
        let state = self.state.lock();
        let conn = state.require_handle()?;
        self.engine.compile(conn, sql).map_err(|e| match e {
            EngineError::NoMem => Error::OutOfMemory { what: "statement" },
            other => Error::from_engine(other, "compile"),
        })
    }

    /// Row id assigned by the most recent successful insert on this
    /// connection.
    pub fn last_insert_row_id(&self) -> Result<i64> {
        let state = self.state.lock();
        let conn = state.require_handle()?;
        self.engine
            .last_insert_row_id(conn)
            .map_err(|e| Error::from_engine(e, "last insert row id"))
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.openable.is_open() {
            return;
        }
        if let Some(handle) = state.handle.take() {
            if let Err(err) = self.engine.disconnect(handle) {
                log::warn!("ignoring disconnect failure on drop: {err:?}");
            }
        }
        state.openable.set_open(false);
    }
}
