use clap::Args;

use super::{BatchArgs, RepoArgs};

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
    #[command(flatten)]
    pub target: BatchArgs,
    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub fn run(args: &DiffArgs) -> anyhow::Result<()> {
    let service = args.repo.open()?;
    let batch = args.target.batch_ref()?;
    let cmp = service.compare(&batch)?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&cmp)?);
        return Ok(());
    }

    println!("Candidate vs base for {batch}");
    if cmp.is_identical() {
        println!("  identical");
        return Ok(());
    }
    print_ids("+ node", &cmp.added_nodes);
    print_ids("- node", &cmp.removed_nodes);
    print_ids("~ node", &cmp.changed_nodes);
    print_ids("+ edge", &cmp.added_edges);
    print_ids("- edge", &cmp.removed_edges);
    print_ids("~ edge", &cmp.changed_edges);
    Ok(())
}

fn print_ids(prefix: &str, ids: &[String]) {
    for id in ids {
        println!("  {prefix} {id}");
    }
}
