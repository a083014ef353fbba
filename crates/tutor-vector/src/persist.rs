//! On-disk artifacts: `vectors.bin`, `chunks.json` and `manifest.json`.
//!
//! `vectors.bin` layout: `b"TVEC"`, `u32` format version, `u32` dim,
//! `u64` count, then `count * dim` little-endian `f32`. Every file is written
//! to a temp file in the target directory and renamed into place; the
//! manifest goes last and carries a blake3 checksum of `vectors.bin`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use tutor_core::error::{Error, Result};
use tutor_core::DocumentChunk;

use crate::ivf::IvfParams;

pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.json";
pub const MANIFEST_FILE: &str = "manifest.json";

const MAGIC: &[u8; 4] = b"TVEC";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub dimension: usize,
    pub count: usize,
    pub documents: usize,
    pub embeddings_model: String,
    pub index_type: String,
    #[serde(default)]
    pub ivf: Option<IvfParams>,
    pub last_updated: DateTime<Utc>,
    pub vectors_blake3: String,
}

/// Everything read back by [`load`], already cross-checked.
#[derive(Debug)]
pub struct Artifacts {
    pub manifest: Manifest,
    pub vectors: Vec<f32>,
    pub chunks: Vec<DocumentChunk>,
}

pub fn encode_vectors(dim: usize, vectors: &[f32]) -> Vec<u8> {
    let count = if dim == 0 { 0 } else { vectors.len() / dim };
    let mut out = Vec::with_capacity(HEADER_LEN + vectors.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(dim as u32).to_le_bytes());
    out.extend_from_slice(&(count as u64).to_le_bytes());
    for x in vectors {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

/// Parse `vectors.bin`, returning `(dim, count, values)`.
pub fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(Error::Persistence(format!("{VECTORS_FILE}: bad header")));
    }
    let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    let version = word(4);
    if version != FORMAT_VERSION {
        return Err(Error::Persistence(format!("{VECTORS_FILE}: unsupported version {version}")));
    }
    let dim = word(8) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&bytes[12..20]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or_else(|| Error::Persistence(format!("{VECTORS_FILE}: size overflow")))?;
    if bytes.len() != expected {
        return Err(Error::Persistence(format!(
            "{VECTORS_FILE}: expected {expected} bytes for {count}x{dim}, found {}",
            bytes.len()
        )));
    }
    let values = bytes[HEADER_LEN..]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((dim, count, values))
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(&path).map_err(|e| Error::io(&path, e.error))?;
    Ok(())
}

fn read(dir: &Path, name: &str) -> Result<Vec<u8>> {
    let path = dir.join(name);
    fs::read(&path).map_err(|e| Error::io(path, e))
}

/// Write all three artifacts. `manifest.vectors_blake3` is filled in here.
pub fn save(dir: &Path, mut manifest: Manifest, vectors: &[f32], chunks: &[DocumentChunk]) -> Result<Manifest> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    let bin = encode_vectors(manifest.dimension, vectors);
    manifest.vectors_blake3 = blake3::hash(&bin).to_hex().to_string();
    let chunks_json =
        serde_json::to_vec(chunks).map_err(|e| Error::Persistence(format!("{CHUNKS_FILE}: {e}")))?;
    let manifest_json =
        serde_json::to_vec_pretty(&manifest).map_err(|e| Error::Persistence(format!("{MANIFEST_FILE}: {e}")))?;

    write_atomic(dir, VECTORS_FILE, &bin)?;
    write_atomic(dir, CHUNKS_FILE, &chunks_json)?;
    write_atomic(dir, MANIFEST_FILE, &manifest_json)?;

    tracing::info!(
        dir = %dir.display(),
        count = manifest.count,
        dim = manifest.dimension,
        checksum = %manifest.vectors_blake3,
        "saved index artifacts"
    );
    Ok(manifest)
}

/// Read and cross-check all three artifacts. Nothing is returned unless
/// header, checksum, counts and dimensions agree.
pub fn load(dir: &Path) -> Result<Artifacts> {
    let manifest: Manifest = serde_json::from_slice(&read(dir, MANIFEST_FILE)?)
        .map_err(|e| Error::Persistence(format!("{MANIFEST_FILE}: {e}")))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::Persistence(format!(
            "{MANIFEST_FILE}: unsupported version {}",
            manifest.format_version
        )));
    }

    let bin = read(dir, VECTORS_FILE)?;
    let checksum = blake3::hash(&bin).to_hex().to_string();
    if checksum != manifest.vectors_blake3 {
        return Err(Error::Persistence(format!("{VECTORS_FILE}: checksum mismatch")));
    }
    let (dim, count, vectors) = decode_vectors(&bin)?;
    if dim != manifest.dimension || count != manifest.count {
        return Err(Error::Persistence(format!(
            "{VECTORS_FILE} holds {count}x{dim}, manifest says {}x{}",
            manifest.count, manifest.dimension
        )));
    }

    let chunks: Vec<DocumentChunk> = serde_json::from_slice(&read(dir, CHUNKS_FILE)?)
        .map_err(|e| Error::Persistence(format!("{CHUNKS_FILE}: {e}")))?;
    if chunks.len() != count {
        return Err(Error::Persistence(format!(
            "{CHUNKS_FILE} holds {} records, manifest says {count}",
            chunks.len()
        )));
    }

    tracing::debug!(dir = %dir.display(), count, dim, "loaded index artifacts");
    Ok(Artifacts { manifest, vectors, chunks })
}
