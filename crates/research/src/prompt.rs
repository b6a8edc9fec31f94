//! Prompt construction for the generation service
//!
//! Both prompts carry the paper text and the list of known model ids, then
//! ask for a JSON-only answer in a fixed shape.

use crate::response::MISSING_NODE_KEY;
use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

/// Join page texts and cut them down to `max_chars`.
///
/// Over-long text is cut at the end of the first semantic chunk that fits,
/// so the prompt never ends mid-sentence.
pub fn fit_context(pages: &[String], max_chars: usize) -> String {
    let text = pages.join("\n\n");
    if text.chars().count() <= max_chars {
        return text;
    }

    let splitter = TextSplitter::new(ChunkConfig::new(max_chars.max(1)));
    let fitted = splitter.chunks(&text).next().unwrap_or_default().to_string();

    debug!(
        original_chars = text.chars().count(),
        fitted_chars = fitted.chars().count(),
        "Paper text truncated to fit prompt"
    );
    fitted
}

fn id_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("\"{}\"", id)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Prompt asking for a short description of the paper's model
pub fn summary_prompt(text: &str, ids: &[String]) -> String {
    format!(
        "Paper content:\n{text}\n\n\
         Id list:\n{ids}\n\n\
         Write a short description of the model introduced in this paper for a general \
         audience, going over important model architecture and details about how big the \
         model is or areas where it excels. Keep the tone objective and non-promotional, \
         and use your knowledge of transformers. Only include the summary in your response.\n\
         Respond in the following format:\n\
         {{\"<insert model id>\": \"<insert summary>\"}}\n\
         Only include JSON in your response.",
        text = text,
        ids = id_list(ids),
    )
}

/// Prompt asking for the models the paper cites as direct influences
pub fn sources_prompt(text: &str, ids: &[String]) -> String {
    format!(
        "Paper content:\n{text}\n\n\
         Id list:\n{ids}\n\n\
         Using information from the Method or Architecture sections of the provided LLM \
         paper, generate a list of source LLMs that are directly and clearly cited as \
         sources of inspiration for the paper. Provide your output in the following JSON \
         format:\n\
         {{\"source\": \"<source_llm_id>\", \"target\": \"<llm_id>\"}}\n\
         where source_llm_id was cited as an influence on llm_id. Use ids from the id list. \
         If the paper's own model is not in the id list, create a new id for it and note it:\n\
         {{\"{marker}\": \"<new_llm_id>\"}}\n\
         Only include JSON in your response.",
        text = text,
        ids = id_list(ids),
        marker = MISSING_NODE_KEY,
    )
}
