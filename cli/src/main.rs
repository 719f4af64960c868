use clap::Parser;

mod cli;
mod commands;
pub mod output;

use cli::Args;
use commands::CommandRunner;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let db = cli::open_database(args.database.as_deref())?;
    let output = args.command.run(&db)?;
    print!("{}", output);
    Ok(())
}
