//! Shared types used by the store client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Store responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from the store.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// A subject groups documents and chunks into one retrieval scope.
#[derive(Debug, Clone, Deserialize)]
pub struct Subject {
    /// Subject identifier used as the scope filter on every read.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Creation timestamp, used only to resolve the latest subject.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Document row persisted once per upload; immutable after creation.
#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    /// Client-generated identifier.
    pub id: String,
    /// Owning subject scope.
    pub subject_id: String,
    /// Original filename of the upload.
    pub filename: String,
    /// Normalized full text of the document.
    pub full_text: String,
}

/// Chunk payload; constructed only after its embedding succeeded, so a chunk
/// without an embedding is never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct NewChunk {
    /// Owning subject scope.
    pub subject_id: String,
    /// Owning document.
    pub document_id: String,
    /// Bounded-length chunk text.
    pub content: String,
    /// Embedding vector matching the configured dimensionality.
    pub embedding: Vec<f32>,
}

/// Chunk row fetched by the non-semantic fallback scan.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkRow {
    /// Stored chunk text.
    pub content: String,
}

/// Similarity-ranked chunk returned by the semantic search RPC, ordered
/// descending by similarity.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredChunk {
    /// Stored chunk text.
    pub content: String,
    /// Similarity score computed by the store.
    pub similarity: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PrepRow {
    pub(crate) content: String,
}
