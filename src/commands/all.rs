use anyhow::Result;
use tracing::info;

use crate::cli::AuditArgs;
use crate::commands::{evaluate_args, integrity, leaves, lines};

pub fn run(args: AuditArgs) -> Result<()> {
    let run = evaluate_args(&args)?;
    let outcome = &run.outcome;

    if args.dry_run {
        info!(
            empty_leaves = outcome.leaves.counts.empty_leaves,
            mismatched_lines = outcome.lines.counts.mismatched_lines,
            non_consecutive = outcome.integrity.counts.non_consecutive,
            "audit dry-run complete"
        );
        return Ok(());
    }

    let mut written = leaves::write_reports(&args.out_dir, &run)?;
    written.extend(lines::write_reports(&args.out_dir, &run)?);
    written.extend(integrity::write_reports(&args.out_dir, &run)?);

    info!(
        reports = written.len(),
        out_dir = %args.out_dir.display(),
        "audit completed"
    );
    Ok(())
}
