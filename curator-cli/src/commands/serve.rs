use anyhow::Context;
use clap::Args;

use super::RepoArgs;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    /// Address to bind (default: server.bind from the config)
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn run(args: ServeArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let bind = args
        .bind
        .unwrap_or_else(|| service.config().server.bind.clone());
    curator_http::serve(service, &bind)
        .await
        .with_context(|| format!("HTTP server error on {bind}"))
}
