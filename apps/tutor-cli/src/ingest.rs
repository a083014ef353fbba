use anyhow::Context;
use std::fs;
use std::path::Path;

use tutor_core::types::META_SOURCE;
use tutor_core::DocumentChunk;

/// Read one chunk per line: `{"content": "...", "metadata": {"source": "...", "subject": "..."}}`.
///
/// Blank lines are ignored. Chunks without a `source` are attributed to the
/// JSONL file itself.
pub fn read_chunks(path: &Path) -> anyhow::Result<Vec<DocumentChunk>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let fallback_source = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut chunks = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut chunk: DocumentChunk = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid chunk record", path.display(), n + 1))?;
        chunk.metadata.entry(META_SOURCE.to_string()).or_insert_with(|| fallback_source.clone());
        chunks.push(chunk);
    }
    Ok(chunks)
}
