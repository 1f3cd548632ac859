//! RAG query backend: retrieval-augmented answers over a managed knowledge
//! base, with expiring per-conversation history and upload-triggered
//! re-indexing. All heavy lifting (vector search, model inference, durable
//! storage) is delegated to remote managed services; this crate owns the
//! orchestration, failure handling and prompt composition between them.

pub mod config;
pub mod core;
pub mod generation;
pub mod history;
pub mod ingestion;
pub mod logging;
pub mod pipeline;
pub mod remote;
pub mod retrieval;
pub mod server;
pub mod state;
