use clap::Args;
use tracing::info;

use super::RepoArgs;

#[derive(Args, Debug)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    /// Commit id to restore
    pub commit: String,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
}

pub async fn run(args: RollbackArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    info!(commit = %args.commit, "Rolling back working tree");
    let restored = service.rollback(&args.commit).await?;
    println!("Working tree restored to {}", restored.reference);
    if restored.reload_required {
        println!("Open review sessions hold stale graphs and must reload.");
    }
    Ok(())
}

pub async fn reset(args: ResetArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    info!("Resetting working tree to the mainline");
    let restored = service.reset_to_latest().await?;
    println!("Working tree reset to {}", restored.reference);
    Ok(())
}
