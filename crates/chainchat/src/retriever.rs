//! Context retrieval facade over the chunk store and both scoring
//! strategies.
//!
//! The chunk store is loaded lazily on first use with a single-flight
//! guarantee: concurrent first requests trigger exactly one load, and
//! every caller observes the same immutable store. Retrieval failures
//! never abort a request — a failed load degrades to an empty store and a
//! failed query embedding degrades to an empty context, with full detail
//! logged to stderr.

use std::sync::Arc;

use tokio::sync::OnceCell;

use chainchat_core::models::ScoredChunk;
use chainchat_core::rank::{rank_embedding, rank_lexical};
use chainchat_core::store::ChunkStore;

use crate::config::Config;
use crate::embedding;

/// Turns a user query into a ranked set of chunks under the configured
/// strategy and result budget.
pub struct ContextRetriever {
    config: Arc<Config>,
    store: OnceCell<Arc<ChunkStore>>,
}

impl ContextRetriever {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            store: OnceCell::new(),
        }
    }

    /// The shared chunk store, loading it on first call.
    ///
    /// `OnceCell::get_or_init` guarantees exactly one initialization
    /// attempt proceeds; concurrent callers await its result.
    pub async fn store(&self) -> Arc<ChunkStore> {
        self.store
            .get_or_init(|| async {
                match ChunkStore::load(&self.config.chunks.paths) {
                    Ok(store) => {
                        println!(
                            "Loaded {} chunks from {} file(s)",
                            store.len(),
                            self.config.chunks.paths.len()
                        );
                        Arc::new(store)
                    }
                    Err(e) => {
                        eprintln!("Chunk load failed, continuing with empty context: {:#}", e);
                        Arc::new(ChunkStore::empty())
                    }
                }
            })
            .await
            .clone()
    }

    /// Rank chunks against `query`, returning at most `limit` results
    /// (or the configured `retrieval.max_results` when `limit` is None).
    pub async fn retrieve(&self, query: &str, limit: Option<usize>) -> Vec<ScoredChunk> {
        let store = self.store().await;
        let limit = limit.unwrap_or(self.config.retrieval.max_results);

        match self.config.retrieval.strategy.as_str() {
            "embedding" => {
                match embedding::embed_query(&self.config.embedding, query).await {
                    Ok(query_vec) => rank_embedding(&query_vec, store.chunks(), limit),
                    Err(e) => {
                        eprintln!("Query embedding failed, continuing without context: {:#}", e);
                        Vec::new()
                    }
                }
            }
            _ => rank_lexical(query, store.chunks(), limit),
        }
    }
}
