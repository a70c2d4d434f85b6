//! robot-rag serve - Run the HTTP query surface

use clap::Args;
use tokio::net::TcpListener;

use crate::app::AppContext;
use crate::error::{RagError, Result};
use crate::server;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides `server.bind`)
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn run(ctx: &AppContext, args: &ServeArgs) -> Result<()> {
    let bind = args.bind.as_deref().unwrap_or(&ctx.config.server.bind);
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| RagError::Config(format!("bind {bind}: {err}")))?;
    server::serve(ctx.clone(), listener).await
}
