//! Retrieval policy and fallback ladder.
//!
//! The store owns the similarity index; this module owns the policy around
//! it: per-call-site threshold/top-k tuning, scope resolution, and the
//! fallback ladder that keeps answers grounded when semantic search is
//! unavailable:
//!
//! 1. Embed the query and run the scoped similarity search.
//! 2. On embedding/store failure or zero rows, fall back to a paginated
//!    scoped scan truncated to a small prefix.
//! 3. When no scope was supplied at all, optionally resolve to the most
//!    recently created subject. This widens scope and is a usability
//!    affordance, not a security boundary; it is switched off via
//!    [`RetrievalConfig::allow_scope_widening`] wherever isolation matters.

use std::sync::Arc;

use thiserror::Error;

use crate::config::RetrievalConfig;
use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::store::{StoreClient, StoreError, Subject};

/// Threshold and result-count tuning for one retrieval call site.
#[derive(Clone, Copy, Debug)]
pub struct RetrievalTuning {
    /// Minimum similarity score for a chunk to count as relevant.
    pub threshold: f32,
    /// Maximum number of ranked chunks returned.
    pub top_k: usize,
}

/// Conversational chat: permissive threshold, moderate breadth.
pub const CHAT_TUNING: RetrievalTuning = RetrievalTuning {
    threshold: 0.15,
    top_k: 10,
};

/// Unit summaries and fixed-mark answers.
pub const PREP_TUNING: RetrievalTuning = RetrievalTuning {
    threshold: 0.2,
    top_k: 10,
};

/// Exam-paper synthesis: stricter threshold, wider context.
pub const EXAM_TUNING: RetrievalTuning = RetrievalTuning {
    threshold: 0.2,
    top_k: 15,
};

#[derive(Debug, Error)]
enum SemanticFailure {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("query embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Scope-aware retrieval front end shared by all query paths.
pub struct Retriever {
    store: Arc<StoreClient>,
    embedder: Arc<dyn EmbeddingClient>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Build a retriever over injected collaborators.
    pub fn new(
        store: Arc<StoreClient>,
        embedder: Arc<dyn EmbeddingClient>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Character budget available for prompt context blocks.
    pub fn context_char_budget(&self) -> usize {
        self.config.context_char_budget
    }

    /// Resolve the subject scope for a request.
    ///
    /// An explicit id wins when it exists. Without one (or when the id is
    /// unknown), the latest-created subject is used if scope widening is
    /// allowed; otherwise the request proceeds unscoped.
    pub async fn resolve_subject(
        &self,
        explicit: Option<&str>,
    ) -> Result<Option<Subject>, StoreError> {
        if let Some(id) = explicit {
            if let Some(subject) = self.store.subject_by_id(id).await? {
                return Ok(Some(subject));
            }
            tracing::debug!(subject = id, "Requested subject not found");
        }

        if self.config.allow_scope_widening {
            let latest = self.store.latest_subject().await?;
            if let Some(subject) = &latest {
                tracing::debug!(subject = %subject.id, "Resolved scope to latest subject");
            }
            return Ok(latest);
        }

        Ok(None)
    }

    /// Retrieve context chunk contents for a query within a subject scope.
    ///
    /// Semantic failures and empty results both drop to the non-semantic
    /// fallback; only a store failure on the fallback itself propagates. An
    /// empty subject yields an empty result, not an error.
    pub async fn retrieve(
        &self,
        query: &str,
        subject_id: &str,
        tuning: RetrievalTuning,
    ) -> Result<Vec<String>, StoreError> {
        match self.semantic(query, subject_id, tuning).await {
            Ok(chunks) if !chunks.is_empty() => return Ok(chunks),
            Ok(_) => {
                tracing::debug!(subject = subject_id, "Semantic search returned no rows");
            }
            Err(error) => {
                tracing::warn!(
                    subject = subject_id,
                    error = %error,
                    "Semantic search failed; falling back to scoped scan"
                );
            }
        }

        let rows = self
            .store
            .fetch_chunks(subject_id, self.config.fallback_page_size)
            .await?;
        Ok(rows
            .into_iter()
            .take(self.config.fallback_context_chunks)
            .map(|row| row.content)
            .collect())
    }

    /// Broad unranked context used by the study-plan generator.
    pub async fn plan_context(&self, subject_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = self
            .store
            .chunk_page(subject_id, 0, self.config.plan_context_chunks)
            .await?;
        Ok(rows.into_iter().map(|row| row.content).collect())
    }

    async fn semantic(
        &self,
        query: &str,
        subject_id: &str,
        tuning: RetrievalTuning,
    ) -> Result<Vec<String>, SemanticFailure> {
        let vector = self.embedder.embed(query).await?;

        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(SemanticFailure::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let scored = self
            .store
            .match_chunks(&vector, tuning.threshold, tuning.top_k, subject_id)
            .await?;
        Ok(scored.into_iter().map(|chunk| chunk.content).collect())
    }
}
