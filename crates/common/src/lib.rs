//! Model Lineage Common Library
//!
//! Shared code for the lineage workspace including:
//! - Graph data model (nodes, edge candidates, documents)
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability
//! - Text-generation client abstraction

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use llm::TextGenerator;
pub use models::{EdgeCandidate, GraphDocument, LinksDocument, Node};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed calendar format of node publication dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default local text-generation model
pub const DEFAULT_LLM_MODEL: &str = "gemma2:27b";
