use std::path::PathBuf;

use clap::Parser;

use robot_rag::cli::commands::policy::PolicyCommand;
use robot_rag::cli::{Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["robot-rag"];
    argv.extend_from_slice(args);
    Cli::parse_from(argv)
}

#[test]
fn parse_query_with_filters() {
    let cli = parse(&[
        "query",
        "how do I swap the battery",
        "--robot-model",
        "S50",
        "--audience-level",
        "technician",
        "--no-answer",
    ]);
    match cli.command {
        Commands::Query(args) => {
            assert_eq!(args.text, "how do I swap the battery");
            assert_eq!(args.robot_model.as_deref(), Some("S50"));
            assert_eq!(args.audience_level.as_deref(), Some("technician"));
            assert!(args.no_answer);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_serve_bind_override() {
    let cli = parse(&["--config", "svc.toml", "serve", "--bind", "0.0.0.0:9000"]);
    assert_eq!(cli.config, Some(PathBuf::from("svc.toml")));
    match cli.command {
        Commands::Serve(args) => assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_policy_validate() {
    let cli = parse(&["policy", "validate", "policy.yaml", "--robot", "-q"]);
    assert!(cli.robot);
    assert!(cli.quiet);
    match cli.command {
        Commands::Policy(args) => match args.command {
            PolicyCommand::Validate { path } => assert_eq!(path, PathBuf::from("policy.yaml")),
            other @ PolicyCommand::Show => panic!("unexpected policy command: {other:?}"),
        },
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn query_text_is_required() {
    assert!(Cli::try_parse_from(["robot-rag", "query"]).is_err());
}
