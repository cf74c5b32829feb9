use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::models::Transcript;

/// Extension every transcript file must carry
pub const TRANSCRIPT_EXTENSION: &str = "txt";

/// Read a UTF-8 `.txt` transcript
pub fn read_transcript(path: &Path) -> Result<Transcript> {
    if !path.exists() {
        bail!("Transcript not found: {:?}", path);
    }
    if !is_transcript_file(path) {
        bail!("Only .{} transcripts are supported: {:?}", TRANSCRIPT_EXTENSION, path);
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {:?}", path))?;
    debug!("Read {} bytes from {:?}", text.len(), path);

    Ok(Transcript::new(text))
}

/// List the transcripts in `dir`, sorted by file name
pub fn list_transcripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to list directory: {:?}", dir))?;

    let mut transcripts = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {:?}", dir))?
            .path();
        if path.is_file() && is_transcript_file(&path) {
            transcripts.push(path);
        }
    }

    transcripts.sort();
    Ok(transcripts)
}

/// Resolve a 1-based position in the [`list_transcripts`] listing of `dir`
pub fn pick_transcript(dir: &Path, number: usize) -> Result<PathBuf> {
    let transcripts = list_transcripts(dir)?;
    if transcripts.is_empty() {
        bail!("No transcripts found in {:?}", dir);
    }

    number
        .checked_sub(1)
        .and_then(|index| transcripts.get(index))
        .cloned()
        .with_context(|| {
            format!(
                "Transcript number {} is out of range, {:?} holds {}",
                number,
                dir,
                transcripts.len()
            )
        })
}

fn is_transcript_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TRANSCRIPT_EXTENSION))
}
