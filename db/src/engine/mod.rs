//! Engine abstraction layer.
//!
//! The wrapper never talks to storage directly; everything goes through the
//! narrow, synchronous [`Engine`] call surface defined here. The trait is
//! object-safe so `Database` and `Statement` can hold an `Arc<dyn Engine>`,
//! and handles are opaque copyable ids so no engine internals leak into the
//! wrapper types.

use std::path::Path;

/// Opaque id for one open connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u64);

/// Opaque id for one compiled statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatementHandle(pub u64);

/// Outcome of advancing statement execution by one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A result row is available for reading.
    Row,
    /// Execution finished; no more rows.
    Done,
}

/// Non-success statuses an engine call can report.
///
/// This mirrors the fixed status vocabulary of embedded engines: a bad
/// bind index, an allocation failure, and a catch-all carrying the
/// engine-specific numeric code plus a human-readable message. The success
/// statuses (OK / ROW / DONE) are the `Ok` sides of the trait methods.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    /// A positional bind index is outside the statement's parameter count.
    Range,
    /// The engine could not allocate memory for the requested object.
    NoMem,
    /// Any other engine failure.
    Failure { code: i32, message: String },
}

impl EngineError {
    /// Numeric code reported when a range status escapes a non-bind path.
    pub const RANGE_CODE: i32 = 25;

    pub(crate) fn failure(code: i32, message: impl Into<String>) -> Self {
        EngineError::Failure {
            code,
            message: message.into(),
        }
    }
}

/// A scalar value moving across the engine boundary: bound into a
/// statement parameter or read back out of a result column.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// The synchronous call surface the wrapper requires of a storage engine.
///
/// Contract notes, matching typical embedded-engine behavior:
///
/// - `connect` either returns a live handle or an error; a failed connect
///   must release anything it partially allocated before returning.
/// - `disconnect` may refuse (engine error) while compiled statements on
///   the connection remain unfinalized.
/// - `finalize` on an already-finalized or unknown handle is a no-op; the
///   wrapper guards against double-finalize itself, but the engine must
///   tolerate it.
/// - Bind indexes are 1-based; index 0 or anything past the parameter
///   count reports [`EngineError::Range`].
/// - `parameter_index` resolves a named parameter (`:name`) to its
///   positional slot, `None` when the statement has no such parameter.
/// - Column reads perform the engine's own coercions and bounds behavior;
///   the wrapper adds no validation of its own.
pub trait Engine: Send + Sync {
    fn connect(&self, path: &Path) -> Result<ConnectionHandle, EngineError>;
    fn disconnect(&self, conn: ConnectionHandle) -> Result<(), EngineError>;

    fn compile(&self, conn: ConnectionHandle, sql: &str) -> Result<StatementHandle, EngineError>;
    fn finalize(&self, stmt: StatementHandle) -> Result<(), EngineError>;

    fn bind_int(&self, stmt: StatementHandle, index: usize, value: i64)
    -> Result<(), EngineError>;
    fn bind_double(
        &self,
        stmt: StatementHandle,
        index: usize,
        value: f64,
    ) -> Result<(), EngineError>;
    fn bind_text(&self, stmt: StatementHandle, index: usize, value: &str)
    -> Result<(), EngineError>;
    fn bind_null(&self, stmt: StatementHandle, index: usize) -> Result<(), EngineError>;
    fn parameter_index(
        &self,
        stmt: StatementHandle,
        name: &str,
    ) -> Result<Option<usize>, EngineError>;

    fn step(&self, stmt: StatementHandle) -> Result<StepOutcome, EngineError>;
    fn reset(&self, stmt: StatementHandle) -> Result<(), EngineError>;

    fn column_count(&self, stmt: StatementHandle) -> Result<usize, EngineError>;
    fn column_int(&self, stmt: StatementHandle, column: usize) -> Result<i64, EngineError>;
    fn column_double(&self, stmt: StatementHandle, column: usize) -> Result<f64, EngineError>;
    fn column_text(&self, stmt: StatementHandle, column: usize) -> Result<String, EngineError>;

    fn last_insert_row_id(&self, conn: ConnectionHandle) -> Result<i64, EngineError>;
}

#[cfg(feature = "backend-memory")]
pub mod memory;

#[cfg(feature = "backend-memory")]
pub use memory::MemoryEngine;
