use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use curator_core::graph::parse_dot;
use curator_core::slot::ReviewSlot;
use curator_core::types::Graph;

use super::{BatchArgs, RepoArgs};

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub target: BatchArgs,
    /// Commit comment
    #[arg(long, short = 'm')]
    pub message: String,
    /// DOT file to publish instead of the batch's stored candidate
    #[arg(long)]
    pub candidate: Option<PathBuf>,
}

pub async fn run(args: PublishArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let batch = args.target.batch_ref()?;

    let candidate: Graph = match &args.candidate {
        Some(path) => {
            info!(path = %path.display(), "Publishing candidate from file");
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read candidate {}", path.display()))?;
            parse_dot(&text).with_context(|| format!("Cannot parse candidate {}", path.display()))?
        }
        None => {
            info!(batch = %batch, "Publishing stored candidate");
            ReviewSlot::open(service.workspace(), &batch)?.publishable()?
        }
    };

    let receipt = service.publish(&batch, &candidate, &args.message).await?;
    println!(
        "Published {batch} as {} ({} files)",
        receipt.commit_id,
        receipt.staged.len()
    );
    Ok(())
}
