//! Research batch processor
//!
//! Runs a producer over every paper with bounded concurrency and gathers the
//! results. A failing paper is recorded and never stops the batch.

use crate::errors::ResearchError;
use crate::producer::{CandidateProducer, PaperExtraction, PaperSource};
use futures::stream::{self, StreamExt};
use lineage_common::metrics;
use lineage_common::models::EdgeCandidate;
use lineage_graph::io;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// A paper that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperFailure {
    pub url: String,
    pub reason: String,
}

/// Everything one batch produced
#[derive(Debug, Clone, Default)]
pub struct ResearchReport {
    /// One entry per paper, in input order; failures read
    /// `Failed to process <url>: <reason>`
    pub summaries: Vec<String>,

    /// Candidates from every successful paper, in input order
    pub candidates: Vec<EdgeCandidate>,

    /// New model ids flagged by the papers, first occurrence order
    pub missing_nodes: Vec<String>,

    pub failures: Vec<PaperFailure>,
}

impl ResearchReport {
    fn absorb(&mut self, paper: &PaperSource, result: Result<PaperExtraction, ResearchError>) {
        match result {
            Ok(extraction) => {
                self.summaries.push(extraction.summary);
                self.candidates.extend(extraction.candidates);
                for id in extraction.missing_nodes {
                    if !self.missing_nodes.contains(&id) {
                        self.missing_nodes.push(id);
                    }
                }
            }
            Err(e) => {
                let reason = e.to_string();
                self.summaries.push(format!("Failed to process {}: {}", paper.url, reason));
                self.failures.push(PaperFailure {
                    url: paper.url.clone(),
                    reason,
                });
            }
        }
    }

    /// Papers that produced an extraction
    pub fn succeeded(&self) -> usize {
        self.summaries.len() - self.failures.len()
    }

    /// Write one whitespace-collapsed summary per line
    pub fn write_summaries(&self, path: &Path) -> Result<(), ResearchError> {
        let body: String = self
            .summaries
            .iter()
            .map(|s| format!("{}\n", s.split_whitespace().collect::<Vec<_>>().join(" ")))
            .collect();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::write(path, body).map_err(|e| io_error(path, e))
    }

    /// Write the candidates as a links document for the filter command
    pub fn write_sources(&self, path: &Path) -> Result<(), ResearchError> {
        io::write_links(path, &self.candidates)?;
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ResearchError {
    ResearchError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Drives a producer over a batch of papers
pub struct ResearchProcessor {
    producer: Arc<dyn CandidateProducer>,
    concurrency: usize,
}

impl ResearchProcessor {
    pub fn new(producer: Arc<dyn CandidateProducer>, concurrency: usize) -> Self {
        Self {
            producer,
            concurrency: concurrency.max(1),
        }
    }

    /// Process every paper; results keep the input order
    #[instrument(skip_all, fields(papers = papers.len(), concurrency = self.concurrency))]
    pub async fn run(&self, papers: Vec<PaperSource>) -> ResearchReport {
        type Outcome = (PaperSource, Result<PaperExtraction, ResearchError>);
        let results: Vec<Outcome> = stream::iter(papers)
            .map(|paper| {
                let producer = self.producer.clone();
                async move {
                    info!(url = %paper.url, "Processing paper");
                    let result = producer.produce(&paper).await;
                    (paper, result)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut report = ResearchReport::default();
        for (paper, result) in results {
            metrics::record_paper(result.is_ok());
            if let Err(e) = &result {
                error!(url = %paper.url, error = %e, "Failed to process paper");
            }
            report.absorb(&paper, result);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failures.len(),
            candidates = report.candidates.len(),
            missing_nodes = report.missing_nodes.len(),
            "Research batch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::tests::StaticTextSource;
    use crate::producer::LlmProducer;
    use lineage_common::llm::MockGenerator;

    fn processor(generator: MockGenerator) -> ResearchProcessor {
        let text_source = Arc::new(StaticTextSource::new(&[
            ("https://arxiv.org/abs/1810.04805", "paper: BERT"),
            ("https://arxiv.org/abs/1907.11692", "paper: RoBERTa"),
        ]));
        let producer = LlmProducer::new(
            text_source,
            Arc::new(generator),
            vec!["transformer".into()],
            10_000,
        );
        ResearchProcessor::new(Arc::new(producer), 2)
    }

    fn generator() -> MockGenerator {
        // The BERT answer carries a raw newline inside the JSON string
        MockGenerator::new("{}")
            .respond_when(
                "paper: BERT\n\nId list",
                "{\"bert\": \"Bidirectional   encoder.\nLarge.\"}",
            )
            .respond_when("paper: RoBERTa\n\nId list", r#"{"roberta": "Optimized BERT."}"#)
    }

    #[tokio::test]
    async fn test_collects_candidates_from_every_paper() {
        // Both prompts carry the paper text; source rules key on the
        // instruction after the id list
        let generator = MockGenerator::new("{}")
            .respond_when(
                "paper: BERT\n\nId list:\n[\"transformer\"]\n\nUsing",
                r#"{"source": "transformer", "target": "bert"}"#,
            )
            .respond_when(
                "paper: RoBERTa\n\nId list:\n[\"transformer\"]\n\nUsing",
                r#"[{"source": "bert", "target": "roberta"}, {"Missing node": "roberta"}]"#,
            )
            .respond_when("paper: BERT", r#"{"bert": "Bidirectional encoder."}"#)
            .respond_when("paper: RoBERTa", r#"{"roberta": "Optimized BERT."}"#);

        let report = processor(generator)
            .run(vec![
                PaperSource::new("https://arxiv.org/abs/1810.04805"),
                PaperSource::new("https://arxiv.org/abs/1907.11692"),
            ])
            .await;

        assert_eq!(
            report.candidates,
            vec![
                EdgeCandidate::new("transformer", "bert"),
                EdgeCandidate::new("bert", "roberta"),
            ]
        );
        assert_eq!(report.missing_nodes, vec!["roberta".to_string()]);
        assert_eq!(report.summaries.len(), 2);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let report = processor(generator())
            .run(vec![
                PaperSource::new("https://arxiv.org/abs/0000.00000"),
                PaperSource::new("https://arxiv.org/abs/1810.04805"),
            ])
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.succeeded(), 1);
        assert!(report.summaries[0]
            .starts_with("Failed to process https://arxiv.org/abs/0000.00000: "));
        assert!(report.summaries[1].contains("bert"));
    }

    #[tokio::test]
    async fn test_write_outputs() {
        let report = processor(generator())
            .run(vec![PaperSource::new("https://arxiv.org/abs/1810.04805")])
            .await;

        let dir = tempfile::tempdir().unwrap();
        let summaries = dir.path().join("summaries.txt");
        let sources = dir.path().join("sources.json");
        report.write_summaries(&summaries).unwrap();
        report.write_sources(&sources).unwrap();

        assert_eq!(
            fs::read_to_string(&summaries).unwrap(),
            "{\"bert\": \"Bidirectional encoder. Large.\"}\n"
        );
        // The sources answer parsed, but held no source/target pairs
        let written = lineage_graph::io::load_candidates(&sources).unwrap();
        assert!(written.candidates.is_empty());
        assert_eq!(written.malformed, 0);
    }
}
