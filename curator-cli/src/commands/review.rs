use clap::Args;

use super::{BatchArgs, RepoArgs};

#[derive(Args, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub target: BatchArgs,
    /// Reviewing party, starting at 1
    pub party: usize,
}

pub fn run(args: &ReviewArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let batch = args.target.batch_ref()?;
    let metadata = service.update_review_status(&batch, args.party)?;
    let flags = metadata.is_reviewed.as_slice();
    let marks: Vec<&str> = flags.iter().map(|f| if *f { "x" } else { " " }).collect();
    println!("{batch}: [{}]", marks.join("]["));
    if metadata.is_reviewed.is_complete() {
        println!("All parties have reviewed this batch.");
    }
    Ok(())
}
