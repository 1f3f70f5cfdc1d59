pub mod all;
pub mod integrity;
pub mod leaves;
pub mod lines;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::AuditArgs;
use crate::engine::{AuditOutcome, evaluate};
use crate::model::{
    AuditSettings, OutlineDocument, REPORT_MANIFEST_VERSION, ReportManifest, SourceDigest,
};
use crate::util::{now_utc_string, source_digest, write_json_pretty, write_text};

pub struct AuditInputs {
    pub outline: OutlineDocument,
    pub transcript: String,
    pub sources: Vec<SourceDigest>,
}

pub fn load_inputs(outline_path: &Path, transcript_path: &Path) -> Result<AuditInputs> {
    let outline_raw = fs::read(outline_path)
        .with_context(|| format!("failed to read outline {}", outline_path.display()))?;
    let outline = OutlineDocument::from_json_slice(&outline_raw)
        .with_context(|| format!("failed to parse outline json {}", outline_path.display()))?;

    let transcript_raw = fs::read(transcript_path)
        .with_context(|| format!("failed to read transcript {}", transcript_path.display()))?;
    let sources = vec![
        source_digest(outline_path, &outline_raw),
        source_digest(transcript_path, &transcript_raw),
    ];
    let transcript = String::from_utf8(transcript_raw).with_context(|| {
        format!(
            "transcript is not valid UTF-8: {}",
            transcript_path.display()
        )
    })?;

    info!(
        outline = %outline_path.display(),
        transcript = %transcript_path.display(),
        sections = outline.sections.len(),
        canonical_keys = outline.verse_to_path.len(),
        "loaded audit inputs"
    );

    Ok(AuditInputs {
        outline,
        transcript,
        sources,
    })
}

pub struct AuditRun {
    pub inputs: AuditInputs,
    pub outcome: AuditOutcome,
    pub generated_at: String,
    pub settings: AuditSettings,
}

pub fn evaluate_args(args: &AuditArgs) -> Result<AuditRun> {
    let inputs = load_inputs(&args.outline_path, &args.transcript_path)?;
    let settings = args.settings();
    let outcome = evaluate(&inputs.outline, &inputs.transcript, &settings)?;

    Ok(AuditRun {
        inputs,
        outcome,
        generated_at: now_utc_string(),
        settings,
    })
}

impl AuditRun {
    pub fn manifest<T: Serialize>(&self, report: &'static str, body: T) -> ReportManifest<'_, T> {
        ReportManifest {
            manifest_version: REPORT_MANIFEST_VERSION,
            report,
            generated_at: &self.generated_at,
            sources: &self.inputs.sources,
            settings: &self.settings,
            body,
        }
    }
}

pub fn write_report<T: Serialize>(out_dir: &Path, filename: &str, value: &T) -> Result<PathBuf> {
    let path = out_dir.join(filename);
    write_json_pretty(&path, value)?;
    info!(path = %path.display(), "wrote report");
    Ok(path)
}

pub fn write_markdown(out_dir: &Path, filename: &str, text: &str) -> Result<PathBuf> {
    let path = out_dir.join(filename);
    write_text(&path, text)?;
    info!(path = %path.display(), "wrote report");
    Ok(path)
}
