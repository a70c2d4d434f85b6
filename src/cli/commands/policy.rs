//! robot-rag policy - Show or validate the retrieval policy

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::app::{AppContext, policy_path};
use crate::cli::Cli;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::config::Config;
use crate::error::Result;
use crate::search::RetrievalPolicy;

#[derive(Args, Debug)]
pub struct PolicyArgs {
    #[command(subcommand)]
    pub command: PolicyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Print the effective policy as YAML
    Show,

    /// Check a policy file and report every problem
    Validate {
        /// Policy file to check
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct ValidationReport {
    path: PathBuf,
    valid: bool,
}

pub fn run(ctx: &AppContext, args: &PolicyArgs) -> Result<()> {
    match &args.command {
        PolicyCommand::Show => show(&ctx.policy, ctx.robot_mode),
        PolicyCommand::Validate { path } => validate(path, ctx.robot_mode),
    }
}

/// Policy commands never touch the search services, so they run without
/// building an [`AppContext`].
pub fn run_without_context(cli: &Cli, args: &PolicyArgs) -> Result<()> {
    match &args.command {
        PolicyCommand::Show => {
            let cwd = std::env::current_dir()?;
            let config = Config::load(cli.config.as_deref(), &cwd)?;
            let policy =
                RetrievalPolicy::load(policy_path(cli.policy.as_deref(), &config).as_deref())?;
            show(&policy, cli.robot)
        }
        PolicyCommand::Validate { path } => validate(path, cli.robot),
    }
}

fn show(policy: &RetrievalPolicy, robot: bool) -> Result<()> {
    if robot {
        return emit_robot(&robot_ok(policy));
    }
    print!("{}", policy.to_yaml()?);
    Ok(())
}

fn validate(path: &Path, robot: bool) -> Result<()> {
    RetrievalPolicy::load(Some(path))?;
    if robot {
        return emit_robot(&robot_ok(ValidationReport {
            path: path.to_path_buf(),
            valid: true,
        }));
    }
    let mut layout = HumanLayout::new();
    layout.kv("Policy", &path.display().to_string());
    layout.kv("Valid", "yes");
    emit_human(&layout);
    Ok(())
}
