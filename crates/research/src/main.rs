//! Lineage Research Command
//!
//! Reads the nodes in `data.research_nodes_path`, runs every arXiv paper
//! through the local model, and writes:
//! - `data.summaries_path`: one summary per paper
//! - `data.sources_path`: proposed edges, input for `filter-links`

use lineage_common::{config::AppConfig, llm, metrics, VERSION};
use lineage_graph::io;
use lineage_research::{
    fetch::PaperFetcher, ArxivTextSource, LlmProducer, PaperSource, ResearchError,
    ResearchProcessor,
};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    metrics::init_tracing(&config.observability);

    info!("Starting lineage research v{}", VERSION);

    if let Err(e) = run(&config).await {
        error!(error = %e, "Research run failed");
        return Err(e.into());
    }

    Ok(())
}

async fn run(config: &AppConfig) -> Result<(), ResearchError> {
    let data = &config.data;
    let graph = io::load_graph(&data.research_nodes_path)?;

    let known_ids: Vec<String> = graph
        .nodes
        .iter()
        .filter(|node| !node.id.is_empty())
        .map(|node| node.id.clone())
        .collect();
    let papers: Vec<PaperSource> = graph.nodes.iter().filter_map(PaperSource::from_node).collect();

    if papers.is_empty() {
        warn!(path = %data.research_nodes_path.display(), "No arXiv links found");
        return Ok(());
    }

    info!(
        papers = papers.len(),
        known_ids = known_ids.len(),
        model = %config.llm.model,
        "Researching papers"
    );

    let generator = llm::create_generator(&config.llm)?;
    let fetcher = PaperFetcher::new(config.download_timeout(), config.research.download_retries)?;
    let producer = LlmProducer::new(
        Arc::new(ArxivTextSource::new(fetcher)),
        generator,
        known_ids,
        config.research.max_prompt_chars,
    );

    let report = ResearchProcessor::new(Arc::new(producer), config.research.concurrency)
        .run(papers)
        .await;

    report.write_summaries(&data.summaries_path)?;
    report.write_sources(&data.sources_path)?;

    info!(
        summaries = report.summaries.len(),
        path = %data.summaries_path.display(),
        "Summaries written"
    );
    info!(
        candidates = report.candidates.len(),
        path = %data.sources_path.display(),
        "Candidate links written"
    );

    if !report.missing_nodes.is_empty() {
        warn!(ids = ?report.missing_nodes, "Papers introduce models that are not nodes yet");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_run_without_arxiv_links() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data.research_nodes_path = dir.path().join("nodes.json");
        config.data.summaries_path = dir.path().join("summaries.txt");
        config.data.sources_path = dir.path().join("sources.json");
        // Never contacted: nothing to research
        config.llm.base_url = "http://127.0.0.1:9".to_string();

        fs::write(
            &config.data.research_nodes_path,
            r#"{"nodes": [
                {"id": "gpt", "date": "2018-06-11", "link": "https://openai.com/research/gpt"},
                {"id": "bert", "date": "2018-10-11"}
            ]}"#,
        )
        .unwrap();

        run(&config).await.unwrap();
        assert!(!config.data.summaries_path.exists());
        assert!(!config.data.sources_path.exists());
    }

    #[tokio::test]
    async fn test_run_missing_nodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.data.research_nodes_path = dir.path().join("absent.json");

        assert!(run(&config).await.is_err());
    }
}
