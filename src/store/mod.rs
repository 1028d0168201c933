//! Persistence store integration.
//!
//! The store is an external collaborator reached over a PostgREST-style REST
//! dialect: filtered selects for scoped reads, an RPC for similarity search,
//! and offset/limit pagination for full scans. Cramkit owns no schema; it
//! only writes documents, chunks, and cached unit preps, and reads them back
//! scoped by subject.

mod client;
mod types;

pub use client::StoreClient;
pub use types::{
    ChunkRow, NewChunk, NewDocument, ScoredChunk, StoreError, Subject,
};
