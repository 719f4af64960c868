//! Output formatting for query results.

use stepsql::{Result, ResultSet};

/// Render every remaining row of the cursor as a tab-separated line.
///
/// Column values are read through the engine's text coercion, so integers
/// and reals print the way the engine renders them.
pub fn render_rows(rows: &mut ResultSet) -> Result<String> {
    let mut out = String::new();
    while rows.can_read() {
        let columns = rows.column_count()?;
        let mut fields = Vec::with_capacity(columns);
        for column in 0..columns {
            fields.push(rows.read_text(column)?);
        }
        out.push_str(&fields.join("\t"));
        out.push('\n');
        rows.next()?;
    }
    if out.is_empty() {
        out.push_str("(no rows)\n");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use stepsql::test_utils::seeded_items_db;

    use super::*;

    #[rstest]
    fn rows_render_one_line_each() {
        let db = seeded_items_db(&[(1, "a", 0.5), (2, "b", 1.5)]);
        let mut rows = db
            .prepare("SELECT id, label FROM items")
            .unwrap()
            .execute()
            .unwrap();
        let out = render_rows(&mut rows).unwrap();
        assert_eq!(out, "1\ta\n2\tb\n");
    }

    #[rstest]
    fn empty_results_render_a_placeholder() {
        let db = seeded_items_db(&[]);
        let mut rows = db
            .prepare("SELECT id FROM items")
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(render_rows(&mut rows).unwrap(), "(no rows)\n");
    }
}
