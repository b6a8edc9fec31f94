//! arXiv link handling

use crate::errors::ResearchError;

/// PDF location for an arXiv link.
///
/// `https://arxiv.org/abs/1810.04805` becomes
/// `https://arxiv.org/pdf/1810.04805.pdf`. Links already ending in `.pdf`
/// are used as is.
pub fn pdf_url(link: &str) -> Result<String, ResearchError> {
    if link.contains("abs") {
        Ok(format!("{}.pdf", link.replace("abs", "pdf")))
    } else if link.ends_with(".pdf") {
        Ok(link.to_string())
    } else {
        Err(ResearchError::InvalidArxivUrl {
            url: link.to_string(),
        })
    }
}

/// Whether a node link points at arXiv
pub fn is_arxiv_link(link: &str) -> bool {
    link.contains("arxiv.org")
}
