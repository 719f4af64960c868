//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure. Individual command
//! definitions are in the `commands` module.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use stepsql::engine::MemoryEngine;
use stepsql::Database;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path label for the database
    ///
    /// The in-memory engine treats the path as a label only; nothing is
    /// written to disk. Defaults to ":memory:".
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Open a database over the in-memory engine.
pub fn open_database(path: Option<&Path>) -> stepsql::Result<Database> {
    let path = path.unwrap_or(Path::new(":memory:"));
    Database::open(Arc::new(MemoryEngine::new()), path)
}
