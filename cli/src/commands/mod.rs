//! Command definitions and execution.

use std::error::Error;

use clap::{Args, Subcommand};
use stepsql::Database;

use crate::output;

/// Trait implemented by every subcommand.
pub trait CommandRunner {
    fn run(self, db: &Database) -> Result<String, Box<dyn Error>>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one or more statements, discarding any rows
    Exec(ExecCmd),
    /// Run setup statements, then a query, and print its rows
    Query(QueryCmd),
}

impl CommandRunner for Command {
    fn run(self, db: &Database) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Exec(cmd) => cmd.run(db),
            Command::Query(cmd) => cmd.run(db),
        }
    }
}

/// Execute statements without reading rows
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  stepsql exec 'CREATE TABLE users (id, name)'
  stepsql exec 'CREATE TABLE users (id, name)' \\
               \"INSERT INTO users (id, name) VALUES (1, 'alice')\"
")]
pub struct ExecCmd {
    /// Statements to execute, in order
    #[arg(required = true)]
    pub statements: Vec<String>,
}

impl CommandRunner for ExecCmd {
    fn run(self, db: &Database) -> Result<String, Box<dyn Error>> {
        for sql in &self.statements {
            log::debug!("executing: {sql}");
            db.execute(sql)?;
        }
        Ok(format!("ok ({} statements)\n", self.statements.len()))
    }
}

/// Run a query and print its rows
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  stepsql query --setup 'CREATE TABLE users (id, name)' \\
                --setup \"INSERT INTO users (id, name) VALUES (1, 'alice')\" \\
                'SELECT id, name FROM users'
")]
pub struct QueryCmd {
    /// Statements executed before the query (repeatable)
    #[arg(long = "setup")]
    pub setup: Vec<String>,

    /// The query whose rows are printed
    pub sql: String,
}

impl CommandRunner for QueryCmd {
    fn run(self, db: &Database) -> Result<String, Box<dyn Error>> {
        for sql in &self.setup {
            log::debug!("executing setup: {sql}");
            db.execute(sql)?;
        }
        let mut rows = db.prepare(&self.sql)?.execute()?;
        Ok(output::render_rows(&mut rows)?)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use rstest::rstest;

    use super::*;
    use crate::cli::Args as CliArgs;

    #[rstest]
    fn exec_requires_at_least_one_statement() {
        let result = CliArgs::try_parse_from(["stepsql", "exec"]);
        assert!(result.is_err());
    }

    #[rstest]
    fn exec_collects_statements_in_order() {
        let args =
            CliArgs::try_parse_from(["stepsql", "exec", "CREATE TABLE t (id)", "DROP TABLE t"])
                .unwrap();
        match args.command {
            Command::Exec(cmd) => {
                assert_eq!(cmd.statements, vec!["CREATE TABLE t (id)", "DROP TABLE t"]);
            }
            other => panic!("expected exec, got {other:?}"),
        }
    }

    #[rstest]
    fn query_accepts_repeated_setup_flags() {
        let args = CliArgs::try_parse_from([
            "stepsql",
            "query",
            "--setup",
            "CREATE TABLE t (id)",
            "--setup",
            "INSERT INTO t (id) VALUES (1)",
            "SELECT id FROM t",
        ])
        .unwrap();
        match args.command {
            Command::Query(cmd) => {
                assert_eq!(cmd.setup.len(), 2);
                assert_eq!(cmd.sql, "SELECT id FROM t");
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[rstest]
    fn database_flag_is_global() {
        let args = CliArgs::try_parse_from([
            "stepsql",
            "query",
            "SELECT id FROM t",
            "--database",
            "scratch.db",
        ])
        .unwrap();
        assert_eq!(args.database.unwrap().to_str().unwrap(), "scratch.db");
    }

    #[rstest]
    fn exec_runs_statements_against_the_database() {
        let db = stepsql::test_utils::setup_empty_db();
        let cmd = ExecCmd {
            statements: vec![
                "CREATE TABLE t (id)".into(),
                "INSERT INTO t (id) VALUES (1)".into(),
            ],
        };
        let out = cmd.run(&db).unwrap();
        assert_eq!(out, "ok (2 statements)\n");
        assert_eq!(db.last_insert_row_id().unwrap(), 1);
    }

    #[rstest]
    fn query_prints_rows() {
        let db = stepsql::test_utils::setup_empty_db();
        let cmd = QueryCmd {
            setup: vec![
                "CREATE TABLE t (id, name)".into(),
                "INSERT INTO t (id, name) VALUES (1, 'alice')".into(),
            ],
            sql: "SELECT id, name FROM t".into(),
        };
        let out = cmd.run(&db).unwrap();
        assert_eq!(out, "1\talice\n");
    }
}
