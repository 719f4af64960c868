//! Resource-safe statement execution over embedded SQL engines.
//!
//! The crate wraps an opaque [`engine::Engine`] behind three guarded
//! resources: a [`Database`] owning the connection, [`Statement`]s
//! compiled on it, and [`ResultSet`] cursors over their rows. Every
//! operation checks that its resource is open and returns a typed
//! [`Error`] instead of touching a released handle, and each underlying
//! engine object is released exactly once no matter how many wrappers
//! alias it.
//!
//! ```
//! use stepsql::Database;
//!
//! # fn main() -> stepsql::Result<()> {
//! let db = Database::open_in_memory()?;
//! db.execute("CREATE TABLE events (id, label)")?;
//!
//! let insert = db.prepare("INSERT INTO events (id, label) VALUES (:id, ?)")?;
//! insert.bind_named(":id", 1)?;
//! insert.bind(2, "started")?;
//! insert.execute()?;
//! insert.close();
//!
//! let mut rows = db.prepare("SELECT id, label FROM events")?.execute()?;
//! while rows.can_read() {
//!     println!("{} {}", rows.read_int(0)?, rows.read_text(1)?);
//!     rows.next()?;
//! }
//! # Ok(())
//! # }
//! ```

mod database;
pub mod engine;
mod error;
mod openable;
mod result_set;
mod statement;

#[cfg(all(any(test, feature = "test-utils"), feature = "backend-memory"))]
pub mod test_utils;

pub use database::Database;
pub use engine::Value;
pub use error::{Error, Result};
pub use result_set::ResultSet;
pub use statement::Statement;
