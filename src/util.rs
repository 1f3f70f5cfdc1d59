use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::SourceDigest;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn sha256_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

pub fn source_digest(path: &Path, data: &[u8]) -> SourceDigest {
    SourceDigest {
        path: path.display().to_string(),
        sha256: sha256_bytes(data),
    }
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    write_bytes(path, &data, "json")
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    write_bytes(path, text.as_bytes(), "text")
}

fn write_bytes(path: &Path, data: &[u8], kind: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let mut file = File::create(path)
        .with_context(|| format!("failed to create {kind} file: {}", path.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write {kind} file: {}", path.display()))?;
    if !data.ends_with(b"\n") {
        file.write_all(b"\n")
            .with_context(|| format!("failed to finalize {kind} file: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("verse-audit-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        assert_eq!(
            sha256_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn text_writer_creates_parent_directories() {
        let dir = scratch_dir("text");
        let path = dir.join("nested").join("report.md");
        write_text(&path, "# Report").expect("text should be written");

        let written = fs::read_to_string(&path).expect("text should be readable");
        assert_eq!(written, "# Report\n");

        fs::remove_dir_all(&dir).expect("scratch dir should be removed");
    }

    #[test]
    fn json_output_ends_with_newline() {
        let dir = scratch_dir("json");
        let path = dir.join("report.json");
        write_json_pretty(&path, &serde_json::json!({ "ok": true }))
            .expect("json should be written");

        let written = fs::read_to_string(&path).expect("json should be readable");
        assert!(written.ends_with("}\n"));

        fs::remove_dir_all(&dir).expect("scratch dir should be removed");
    }
}
