//! Prepared statement lifecycle.
//!
//! A `Statement` moves through three states: open without a current row
//! (fresh from `prepare`, after a DONE step, or after a successful reset),
//! open with a current row (the last step reported ROW), and closed
//! (finalized). Binding is legal in any open state; reading requires a
//! current row. The open flag and the row flag are deliberately separate so
//! callers can tell "statement is unusable" from "statement is between rows".

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::{Engine, EngineError, StatementHandle, StepOutcome, Value};
use crate::error::{Error, Result};
use crate::openable::Openable;
use crate::result_set::ResultSet;

/// A compiled, parameterized statement bound to one engine connection.
///
/// `Statement` is a cheap-`Clone` handle: clones alias the same compiled
/// engine statement, which is what lets a [`ResultSet`] keep the statement
/// alive after the caller drops its own handle. The compiled handle is
/// released when the last alias is dropped, or earlier by an explicit
/// [`close`](Statement::close); afterwards every alias reports the
/// statement as not open.
///
/// Obtain instances from [`Database::prepare`](crate::Database::prepare).
#[derive(Clone)]
pub struct Statement {
    inner: Arc<StatementInner>,
}

impl std::fmt::Debug for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("handle", &self.inner.handle)
            .finish_non_exhaustive()
    }
}

struct StatementInner {
    engine: Arc<dyn Engine>,
    handle: StatementHandle,
    state: Mutex<StatementState>,
}

struct StatementState {
    openable: Openable,
    can_read: bool,
}

impl Statement {
    pub(crate) fn new(engine: Arc<dyn Engine>, handle: StatementHandle) -> Self {
        Self {
            inner: Arc::new(StatementInner {
                engine,
                handle,
                state: Mutex::new(StatementState {
                    openable: Openable::new("Statement", true),
                    can_read: false,
                }),
            }),
        }
    }

    /// Whether this statement (and every alias of it) is still open.
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().openable.is_open()
    }

    /// Whether the last step produced a row that can be read.
    pub fn can_read(&self) -> bool {
        self.inner.state.lock().can_read
    }

    /// Binds a value to the 1-based positional parameter `index`.
    ///
    /// Legal in any open state; bound values survive [`reset`](Self::reset).
    /// Fails with an invalid-state error on a closed statement, an
    /// out-of-range error when the engine rejects the index, an allocation
    /// error when the engine cannot store the value, and an engine error
    /// otherwise.
    pub fn bind(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let state = self.inner.state.lock();
        state.openable.require_open()?;
        self.bind_value(index, value.into())
    }

    /// Binds a value to a named parameter such as `:id`.
    ///
    /// The name is resolved to its positional slot by the engine first;
    /// an unknown name fails with an invalid-argument error and leaves the
    /// statement untouched.
    pub fn bind_named(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let state = self.inner.state.lock();
        state.openable.require_open()?;
        let index = self
            .inner
            .engine
            .parameter_index(self.inner.handle, name)
            .map_err(|e| Error::from_engine(e, "parameter lookup"))?
            .ok_or_else(|| Error::NoSuchParameter {
                name: name.to_string(),
            })?;
        self.bind_value(index, value.into())
    }

    fn bind_value(&self, index: usize, value: Value) -> Result<()> {
        let engine = &self.inner.engine;
        let handle = self.inner.handle;
        let result = match &value {
            Value::Integer(i) => engine.bind_int(handle, index, *i),
            Value::Real(f) => engine.bind_double(handle, index, *f),
            Value::Text(s) => engine.bind_text(handle, index, s),
            Value::Null => engine.bind_null(handle, index),
        };
        result.map_err(|e| match e {
            EngineError::Range => Error::IndexOutOfRange { index },
            EngineError::NoMem => Error::OutOfMemory { what: "bound value" },
            EngineError::Failure { code, message } => Error::Engine { code, message },
        })
    }

    /// Runs exactly one step and returns a [`ResultSet`] over this
    /// statement. Advance further rows through [`ResultSet::next`].
    pub fn execute(&self) -> Result<ResultSet> {
        self.step()?;
        Ok(ResultSet::new(self.clone()))
    }

    /// Advances execution by one engine step.
    ///
    /// ROW leaves a readable current row and returns `true`; DONE clears it
    /// and returns `false`; an engine error is surfaced with its code and
    /// leaves the state unchanged.
    pub(crate) fn step(&self) -> Result<bool> {
        let mut state = self.inner.state.lock();
        state.openable.require_open()?;
        let outcome = self
            .inner
            .engine
            .step(self.inner.handle)
            .map_err(|e| Error::from_engine(e, "step"))?;
        state.can_read = outcome == StepOutcome::Row;
        Ok(state.can_read)
    }

    /// Rewinds execution so the statement can run again; bindings are kept.
    ///
    /// Returns whether the engine reported success. On engine-reported
    /// failure no error is raised and the row flag is left as-is, so
    /// callers must check the return value. Only a closed statement raises.
    pub fn reset(&self) -> Result<bool> {
        let mut state = self.inner.state.lock();
        state.openable.require_open()?;
        match self.inner.engine.reset(self.inner.handle) {
            Ok(()) => {
                state.can_read = false;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Finalizes the compiled statement. Safe to call from any state and
    /// any number of times; engine errors during finalization are ignored
    /// (their cause was already surfaced by the failing operation).
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        close_locked(&self.inner, &mut state);
    }

    /// Number of result columns in the current row.
    pub fn column_count(&self) -> Result<usize> {
        let state = self.inner.state.lock();
        require_readable(&state)?;
        self.inner
            .engine
            .column_count(self.inner.handle)
            .map_err(|e| Error::from_engine(e, "column count"))
    }

    /// Reads the current row's column `column` as an integer.
    pub fn read_int(&self, column: usize) -> Result<i64> {
        let state = self.inner.state.lock();
        require_readable(&state)?;
        self.inner
            .engine
            .column_int(self.inner.handle, column)
            .map_err(|e| Error::from_engine(e, "column read"))
    }

    /// Reads the current row's column `column` as a double.
    pub fn read_double(&self, column: usize) -> Result<f64> {
        let state = self.inner.state.lock();
        require_readable(&state)?;
        self.inner
            .engine
            .column_double(self.inner.handle, column)
            .map_err(|e| Error::from_engine(e, "column read"))
    }

    /// Reads the current row's column `column` as text.
    pub fn read_text(&self, column: usize) -> Result<String> {
        let state = self.inner.state.lock();
        require_readable(&state)?;
        self.inner
            .engine
            .column_text(self.inner.handle, column)
            .map_err(|e| Error::from_engine(e, "column read"))
    }
}

fn require_readable(state: &StatementState) -> Result<()> {
    state.openable.require_open()?;
    if state.can_read { Ok(()) } else { Err(Error::NoRow) }
}

fn close_locked(inner: &StatementInner, state: &mut StatementState) {
    if !state.openable.is_open() {
        return;
    }
    if let Err(err) = inner.engine.finalize(inner.handle) {
        log::debug!("ignoring finalize failure for statement: {err:?}");
    }
    state.openable.set_open(false);
    state.can_read = false;
}

impl Drop for StatementInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.openable.is_open() {
            if let Err(err) = self.engine.finalize(self.handle) {
                log::debug!("ignoring finalize failure on drop: {err:?}");
            }
            state.openable.set_open(false);
        }
    }
}
