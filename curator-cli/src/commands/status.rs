use clap::Args;

use curator_core::metadata::BatchMetadata;

use super::RepoArgs;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    /// Only show this project
    #[arg(long)]
    pub project: Option<String>,
}

pub fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let projects = service.list_projects()?;

    println!("Curator status for {}", service.workspace().root().display());
    if projects.is_empty() {
        println!();
        println!("  No projects under {}", service.workspace().projects_root().display());
        return Ok(());
    }

    for project in &projects {
        if args.project.as_deref().is_some_and(|p| p != project.id) {
            continue;
        }
        println!();
        if project.metadata.product_name.is_empty() {
            println!("  {}", project.id);
        } else {
            println!("  {} ({})", project.id, project.metadata.product_name);
        }
        let batches = service.list_batches(&project.id)?;
        if batches.is_empty() {
            println!("    (no batches)");
        }
        for batch in &batches {
            println!(
                "    {:<20} {:<10} {:<12} {:<8} {}",
                batch.id,
                if batch.has_candidate { "candidate" } else { "-" },
                review_summary(&batch.metadata),
                if batch.metadata.is_published { "published" } else { "draft" },
                batch.metadata.title,
            );
        }
    }
    Ok(())
}

fn review_summary(meta: &BatchMetadata) -> String {
    let flags = meta.is_reviewed.as_slice();
    if flags.is_empty() {
        return "unreviewed".into();
    }
    let done = flags.iter().filter(|f| **f).count();
    format!("reviewed {done}/{}", flags.len())
}
