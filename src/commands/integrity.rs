use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::AuditArgs;
use crate::commands::{AuditRun, evaluate_args, write_report};
use crate::integrity::IntegrityCounts;

pub const JSON_REPORT: &str = "outline_integrity.json";

pub fn run(args: AuditArgs) -> Result<()> {
    let run = evaluate_args(&args)?;
    let counts = &run.outcome.integrity.counts;

    if args.dry_run {
        log_findings(counts);
        info!(nodes = counts.nodes, "integrity dry-run complete");
        return Ok(());
    }

    write_reports(&args.out_dir, &run)?;
    log_findings(counts);
    info!(nodes = counts.nodes, "integrity check completed");
    Ok(())
}

pub fn write_reports(out_dir: &Path, run: &AuditRun) -> Result<Vec<PathBuf>> {
    let manifest = run.manifest("outline_integrity", &run.outcome.integrity);
    Ok(vec![write_report(out_dir, JSON_REPORT, &manifest)?])
}

fn log_findings(counts: &IntegrityCounts) {
    let findings = counts.branch_with_verses
        + counts.duplicate_path
        + counts.missing_from_table
        + counts.missing_from_tree
        + counts.path_disagreement
        + counts.non_consecutive;

    if findings == 0 {
        info!("outline integrity checks found nothing to report");
        return;
    }

    warn!(
        branch_with_verses = counts.branch_with_verses,
        duplicate_path = counts.duplicate_path,
        missing_from_table = counts.missing_from_table,
        missing_from_tree = counts.missing_from_tree,
        path_disagreement = counts.path_disagreement,
        non_consecutive = counts.non_consecutive,
        "outline integrity findings"
    );
}
