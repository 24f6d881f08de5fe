use clap::Args;
use tracing::info;

use super::{BatchArgs, RepoArgs};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub target: BatchArgs,
}

pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let batch = args.target.batch_ref()?;
    info!(batch = %batch, "Running candidate generation");
    let outcome = service.generate_candidate(&batch).await?;
    if !outcome.stdout.trim().is_empty() {
        print!("{}", outcome.stdout);
    }
    let has_candidate = service.workspace().read_candidate(&batch)?.is_some();
    println!(
        "Generated candidate for {batch} in {:.1}s{}",
        outcome.duration.as_secs_f64(),
        if has_candidate { "" } else { " (no candidate file written)" },
    );
    Ok(())
}
