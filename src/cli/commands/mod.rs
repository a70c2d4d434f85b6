//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - run() function to execute the command

use clap::Subcommand;

pub mod policy;
pub mod query;
pub mod serve;

use crate::app::AppContext;
use crate::error::Result;

pub async fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Serve(args) => serve::run(ctx, args).await,
        Commands::Query(args) => query::run(ctx, args).await,
        Commands::Policy(args) => policy::run(ctx, args),
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP query surface
    Serve(serve::ServeArgs),

    /// Run one query from the terminal
    Query(query::QueryArgs),

    /// Show or validate the retrieval policy
    Policy(policy::PolicyArgs),
}
