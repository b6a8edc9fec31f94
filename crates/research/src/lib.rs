//! Model lineage research producer
//!
//! Proposes candidate lineage edges by reading papers with a local model:
//! - arXiv link handling and PDF download
//! - PDF text extraction
//! - Prompt construction and tolerant response parsing
//! - Batch processing with bounded concurrency

pub mod arxiv;
pub mod errors;
pub mod fetch;
pub mod pdf;
pub mod processor;
pub mod producer;
pub mod prompt;
pub mod response;

pub use errors::ResearchError;
pub use processor::{PaperFailure, ResearchProcessor, ResearchReport};
pub use producer::{
    ArxivTextSource, CandidateProducer, LlmProducer, PaperExtraction, PaperSource, PaperTextSource,
};
