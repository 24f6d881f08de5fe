use clap::Args;

use super::RepoArgs;

#[derive(Args, Debug)]
pub struct LogArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    /// Maximum number of versions to show
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: LogArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let mut commits = service.list_versions().await?;
    if let Some(limit) = args.limit {
        commits.truncate(limit);
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }

    if commits.is_empty() {
        println!("No versions recorded yet.");
    }
    for commit in &commits {
        let short = &commit.id[..commit.id.len().min(12)];
        println!(
            "{short}  {}  {:<20} {}",
            commit.timestamp.format("%Y-%m-%d %H:%M"),
            commit.author,
            commit.message.lines().next().unwrap_or_default(),
        );
    }
    Ok(())
}
