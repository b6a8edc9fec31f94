//! Configuration management for lineage services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! Every section carries defaults so the binaries run with no files present.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Locations of the graph documents
    #[serde(default)]
    pub data: DataConfig,

    /// Edge filter policy
    #[serde(default)]
    pub filter: FilterConfig,

    /// Text-generation service configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Research producer configuration
    #[serde(default)]
    pub research: ResearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the visualization front-end
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum traversal depth accepted by the lineage endpoint
    #[serde(default = "default_max_depth")]
    pub max_traversal_depth: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Trusted graph document (`{"nodes": [...], "links": [...]}`)
    #[serde(default = "default_graph_path")]
    pub graph_path: PathBuf,

    /// Raw candidate edges produced by the research step
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,

    /// Filtered edges written by the filter command
    #[serde(default = "default_filtered_links_path")]
    pub filtered_links_path: PathBuf,

    /// Missing-identifier report written by the filter command
    #[serde(default = "default_missing_ids_path")]
    pub missing_ids_path: PathBuf,

    /// Node document the research step reads papers from
    #[serde(default = "default_research_nodes_path")]
    pub research_nodes_path: PathBuf,

    /// Summaries written by the research step
    #[serde(default = "default_summaries_path")]
    pub summaries_path: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Exit non-zero when the missing-identifier report is not empty
    #[serde(default)]
    pub fail_on_missing: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider: ollama, mock
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Base URL of the generation service
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResearchConfig {
    /// Papers processed at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Paper text budget per prompt, in characters
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// PDF download timeout in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Maximum retries for a PDF download
    #[serde(default = "default_download_retries")]
    pub download_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 3000 }
fn default_static_dir() -> PathBuf { PathBuf::from("public") }
fn default_request_timeout() -> u64 { 30 }
fn default_max_depth() -> usize { 6 }
fn default_graph_path() -> PathBuf { PathBuf::from("data/graph.json") }
fn default_sources_path() -> PathBuf { PathBuf::from("sources.json") }
fn default_filtered_links_path() -> PathBuf { PathBuf::from("sources2.json") }
fn default_missing_ids_path() -> PathBuf { PathBuf::from("missing_ids.txt") }
fn default_research_nodes_path() -> PathBuf { PathBuf::from("data/missing.json") }
fn default_summaries_path() -> PathBuf { PathBuf::from("summaries.txt") }
fn default_llm_provider() -> String { "ollama".to_string() }
fn default_llm_base_url() -> String { "http://localhost:11434".to_string() }
fn default_llm_model() -> String { crate::DEFAULT_LLM_MODEL.to_string() }
fn default_llm_timeout() -> u64 { 600 }
fn default_llm_retries() -> u32 { 2 }
fn default_concurrency() -> usize { 2 }
fn default_max_prompt_chars() -> usize { 48_000 }
fn default_download_timeout() -> u64 { 60 }
fn default_download_retries() -> u32 { 3 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            request_timeout_secs: default_request_timeout(),
            max_traversal_depth: default_max_depth(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            graph_path: default_graph_path(),
            sources_path: default_sources_path(),
            filtered_links_path: default_filtered_links_path(),
            missing_ids_path: default_missing_ids_path(),
            research_nodes_path: default_research_nodes_path(),
            summaries_path: default_summaries_path(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_prompt_chars: default_max_prompt_chars(),
            download_timeout_secs: default_download_timeout(),
            download_retries: default_download_retries(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Plain PORT wins, as hosting platforms set it
            .set_override_option("server.port", std::env::var("PORT").ok())?

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get download timeout as Duration
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.research.download_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.llm.model, "gemma2:27b");
        assert_eq!(config.data.graph_path, PathBuf::from("data/graph.json"));
        assert!(!config.filter.fail_on_missing);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[filter]\nfail_on_missing = true\n\n[llm]\nmodel = \"llama3:8b\"").unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert!(config.filter.fail_on_missing);
        assert_eq!(config.llm.model, "llama3:8b");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.research.concurrency, 2);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.download_timeout(), Duration::from_secs(60));
    }
}
