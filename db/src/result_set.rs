//! Result cursor over a statement's rows.

use crate::error::Result;
use crate::statement::Statement;

/// A cursor over the rows of an executed [`Statement`].
///
/// The result set holds no engine resources and caches no row data of its
/// own; every read passes through to the shared statement, whose current
/// row the cursor represents. Because it holds a cloned statement handle,
/// the statement stays alive for as long as the result set does, even if
/// the caller drops its own statement handle. It needs no explicit close.
///
/// Obtain instances from [`Statement::execute`].
#[derive(Debug)]
pub struct ResultSet {
    statement: Statement,
}

impl ResultSet {
    pub(crate) fn new(statement: Statement) -> Self {
        Self { statement }
    }

    /// Whether a current row is available to read.
    pub fn can_read(&self) -> bool {
        self.statement.can_read()
    }

    /// Number of columns in the current row.
    pub fn column_count(&self) -> Result<usize> {
        self.statement.column_count()
    }

    /// Steps to the next row. Returns `true` when a new row is readable,
    /// `false` when the rows are exhausted.
    pub fn next(&mut self) -> Result<bool> {
        self.statement.step()
    }

    /// Reads column `column` of the current row as an integer.
    pub fn read_int(&self, column: usize) -> Result<i64> {
        self.statement.read_int(column)
    }

    /// Reads column `column` of the current row as a double.
    pub fn read_double(&self, column: usize) -> Result<f64> {
        self.statement.read_double(column)
    }

    /// Reads column `column` of the current row as text.
    pub fn read_text(&self, column: usize) -> Result<String> {
        self.statement.read_text(column)
    }
}

#[cfg(all(test, feature = "backend-memory"))]
mod tests {
    use rstest::rstest;

    use crate::Database;
    use crate::error::Error;

    #[rstest]
    fn cursor_walks_rows_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id, value)").unwrap();
        db.execute("INSERT INTO t (id, value) VALUES (1, 'a')")
            .unwrap();
        db.execute("INSERT INTO t (id, value) VALUES (2, 'b')")
            .unwrap();

        let stmt = db.prepare("SELECT id, value FROM t").unwrap();
        let mut rows = stmt.execute().unwrap();

        assert!(rows.can_read());
        assert_eq!(rows.column_count().unwrap(), 2);
        assert_eq!(rows.read_int(0).unwrap(), 1);
        assert_eq!(rows.read_text(1).unwrap(), "a");

        assert!(rows.next().unwrap());
        assert_eq!(rows.read_int(0).unwrap(), 2);
        assert_eq!(rows.read_text(1).unwrap(), "b");

        assert!(!rows.next().unwrap());
        assert!(!rows.can_read());
    }

    #[rstest]
    fn cursor_keeps_the_statement_alive() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id)").unwrap();
        db.execute("INSERT INTO t (id) VALUES (7)").unwrap();

        let rows = {
            let stmt = db.prepare("SELECT id FROM t").unwrap();
            stmt.execute().unwrap()
            // The caller's statement handle is dropped here.
        };

        assert!(rows.can_read());
        assert_eq!(rows.read_int(0).unwrap(), 7);
    }

    #[rstest]
    fn explicit_statement_close_invalidates_the_cursor() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id)").unwrap();
        db.execute("INSERT INTO t (id) VALUES (1)").unwrap();

        let stmt = db.prepare("SELECT id FROM t").unwrap();
        let mut rows = stmt.execute().unwrap();
        stmt.close();

        assert!(matches!(rows.next(), Err(Error::NotOpen { .. })));
        assert!(matches!(rows.read_int(0), Err(Error::NotOpen { .. })));
    }

    #[rstest]
    fn empty_result_reads_fail_with_no_row() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE t (id)").unwrap();

        let stmt = db.prepare("SELECT id FROM t").unwrap();
        let rows = stmt.execute().unwrap();
        assert!(!rows.can_read());
        assert!(matches!(rows.read_int(0), Err(Error::NoRow)));
    }
}
