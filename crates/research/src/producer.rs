//! Candidate producers
//!
//! A [`CandidateProducer`] turns one paper into a summary plus proposed
//! lineage edges. The output is untrusted: everything it yields goes through
//! the edge filter before it reaches the graph.

use crate::arxiv;
use crate::errors::ResearchError;
use crate::fetch::PaperFetcher;
use crate::pdf;
use crate::prompt;
use crate::response;
use async_trait::async_trait;
use lineage_common::llm::TextGenerator;
use lineage_common::models::{EdgeCandidate, Node};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A paper to research
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSource {
    /// Node the paper belongs to, when known
    pub id: Option<String>,
    pub url: String,
}

impl PaperSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
        }
    }

    /// Paper for a node with an arXiv link
    pub fn from_node(node: &Node) -> Option<Self> {
        let link = node.link().filter(|link| arxiv::is_arxiv_link(link))?;
        Some(Self {
            id: Some(node.id.clone()).filter(|id| !id.is_empty()),
            url: link.to_string(),
        })
    }
}

/// What one paper yielded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperExtraction {
    /// Raw summary answer
    pub summary: String,

    /// `(model id, summary)` pairs, when the answer was well-formed
    pub summaries: Vec<(String, String)>,

    pub candidates: Vec<EdgeCandidate>,

    /// Ids the paper introduces that are not yet nodes
    pub missing_nodes: Vec<String>,
}

#[async_trait]
pub trait CandidateProducer: Send + Sync {
    async fn produce(&self, paper: &PaperSource) -> Result<PaperExtraction, ResearchError>;
}

/// Supplies the text of a paper, one string per page
#[async_trait]
pub trait PaperTextSource: Send + Sync {
    async fn pages(&self, url: &str) -> Result<Vec<String>, ResearchError>;
}

/// Downloads the arXiv PDF and extracts its text
pub struct ArxivTextSource {
    fetcher: PaperFetcher,
}

impl ArxivTextSource {
    pub fn new(fetcher: PaperFetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl PaperTextSource for ArxivTextSource {
    async fn pages(&self, url: &str) -> Result<Vec<String>, ResearchError> {
        let pdf_url = arxiv::pdf_url(url)?;
        let bytes = self.fetcher.fetch(&pdf_url).await?;

        // PDF parsing is CPU-bound
        tokio::task::spawn_blocking(move || pdf::extract_pages(&bytes))
            .await
            .map_err(|e| ResearchError::PdfParse {
                message: format!("Extraction task failed: {}", e),
            })?
    }
}

/// Producer backed by a text-generation model
pub struct LlmProducer {
    text_source: Arc<dyn PaperTextSource>,
    generator: Arc<dyn TextGenerator>,
    known_ids: Vec<String>,
    max_prompt_chars: usize,
}

impl LlmProducer {
    pub fn new(
        text_source: Arc<dyn PaperTextSource>,
        generator: Arc<dyn TextGenerator>,
        known_ids: Vec<String>,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            text_source,
            generator,
            known_ids,
            max_prompt_chars,
        }
    }
}

#[async_trait]
impl CandidateProducer for LlmProducer {
    #[instrument(skip(self), fields(url = %paper.url, model = self.generator.model_name()))]
    async fn produce(&self, paper: &PaperSource) -> Result<PaperExtraction, ResearchError> {
        let pages = self.text_source.pages(&paper.url).await?;
        let text = prompt::fit_context(&pages, self.max_prompt_chars);
        debug!(pages = pages.len(), chars = text.len(), "Paper text ready");

        let summary = self
            .generator
            .generate(&prompt::summary_prompt(&text, &self.known_ids))
            .await?;

        let summaries = response::parse_summary(&summary).unwrap_or_else(|e| {
            warn!(error = %e, "Summary answer is not the requested JSON");
            Vec::new()
        });

        let answer = self
            .generator
            .generate(&prompt::sources_prompt(&text, &self.known_ids))
            .await?;
        let proposals = response::parse_proposals(&answer)?;

        Ok(PaperExtraction {
            summary,
            summaries,
            candidates: proposals.candidates,
            missing_nodes: proposals.missing_nodes,
        })
    }
}
