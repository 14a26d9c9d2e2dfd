//! Read-only chunk store.
//!
//! Loads pre-processed chunk records from JSON files produced by an
//! external preprocessing step. The store is append-only during
//! [`ChunkStore::load`] and immutable afterwards, so it can be shared
//! across concurrent queries without locking.
//!
//! Two record schemas are accepted, matching the two formats the
//! preprocessing pipeline has emitted over time:
//!
//! ```json
//! { "text": "...", "source": "fundamentals.pdf" }
//! { "id": 7, "content": "...", "metadata": { "source": "fundamentals.pdf" } }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::Chunk;

/// Paragraphs shorter than this are noise from PDF extraction (page
/// numbers, running headers) and are skipped at load.
const MIN_CHUNK_CHARS: usize = 20;

/// An immutable, in-memory collection of chunks loaded once per process.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<Chunk>,
}

/// A raw chunk record in either of the two accepted JSON schemas.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawChunk {
    Flat {
        text: String,
        source: String,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        embedding: Option<Vec<f32>>,
    },
    Nested {
        id: i64,
        content: String,
        metadata: RawMetadata,
        #[serde(default)]
        embedding: Option<Vec<f32>>,
    },
}

#[derive(Deserialize)]
struct RawMetadata {
    source: String,
    #[serde(default)]
    page: Option<u32>,
}

impl ChunkStore {
    /// An empty store, used as the degraded fallback when loading fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load chunks from one or more JSON files.
    ///
    /// Fails if any file is unreadable or is not a JSON array of chunk
    /// records in an accepted schema. Callers that want the degraded
    /// empty-context behavior handle the error and fall back to
    /// [`ChunkStore::empty`].
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut chunks = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read chunk file: {}", path.display()))?;
            let raw = parse_chunks(&content)
                .with_context(|| format!("Failed to parse chunk file: {}", path.display()))?;
            chunks.extend(raw);
        }
        // Re-number so ids are unique across files; the Nested schema's own
        // ids only disambiguate within one file.
        for (i, c) in chunks.iter_mut().enumerate() {
            c.id = i as i64;
        }
        Ok(Self { chunks })
    }

    /// All loaded chunks, in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk counts grouped by source, in source order.
    pub fn counts_by_source(&self) -> BTreeMap<&str, usize> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for c in &self.chunks {
            *counts.entry(c.source.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Parse a JSON array of chunk records in either accepted schema.
///
/// Records shorter than [`MIN_CHUNK_CHARS`] are dropped.
pub fn parse_chunks(json: &str) -> Result<Vec<Chunk>> {
    let raw: Vec<RawChunk> = serde_json::from_str(json)?;
    let chunks = raw
        .into_iter()
        .map(|r| match r {
            RawChunk::Flat {
                text,
                source,
                page,
                embedding,
            } => Chunk {
                id: 0,
                text,
                source,
                page,
                embedding,
            },
            RawChunk::Nested {
                id,
                content,
                metadata,
                embedding,
            } => Chunk {
                id,
                text: content,
                source: metadata.source,
                page: metadata.page,
                embedding,
            },
        })
        .filter(|c| c.text.trim().len() >= MIN_CHUNK_CHARS)
        .collect();
    Ok(chunks)
}
