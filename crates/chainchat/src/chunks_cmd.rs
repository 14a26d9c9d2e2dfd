//! Chunk corpus inspection commands.

use anyhow::Result;

use chainchat_core::store::ChunkStore;

use crate::config::Config;

/// Load the configured chunk files and print per-source counts.
///
/// Unlike request-time loading this does not degrade on failure — a
/// broken corpus should be visible when inspecting it.
pub fn run_stats(config: &Config) -> Result<()> {
    let store = ChunkStore::load(&config.chunks.paths)?;

    println!("chunk files: {}", config.chunks.paths.len());
    println!("total chunks: {}", store.len());

    let embedded = store
        .chunks()
        .iter()
        .filter(|c| c.embedding.is_some())
        .count();
    println!("with embeddings: {}", embedded);

    println!("by source:");
    for (source, count) in store.counts_by_source() {
        println!("  {}: {}", source, count);
    }

    Ok(())
}
