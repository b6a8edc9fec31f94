//! Lineage Filter Command
//!
//! Validates the candidate edges proposed by the research step against the
//! trusted graph:
//! - Reads `data.graph_path` (nodes) and `data.sources_path` (candidates)
//! - Writes the cleaned edges to `data.filtered_links_path`
//! - Writes unknown/undated ids to `data.missing_ids_path`
//!
//! With `filter.fail_on_missing` set, a non-empty missing report fails the run.

use lineage_common::{config::AppConfig, metrics, AppError, VERSION};
use lineage_graph::{io, filter_edges, NodeIndex};
use tracing::{error, info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    metrics::init_tracing(&config.observability);

    info!("Starting lineage filter v{}", VERSION);

    if let Err(e) = run(&config) {
        error!(error = %e, "Filter run failed");
        return Err(e.into());
    }

    Ok(())
}

fn run(config: &AppConfig) -> Result<(), AppError> {
    let data = &config.data;

    let graph = io::load_graph(&data.graph_path)?;
    let load = io::load_candidates(&data.sources_path)?;

    if load.malformed > 0 {
        warn!(
            malformed = load.malformed,
            path = %data.sources_path.display(),
            "Some candidate links were skipped"
        );
    }

    let index = NodeIndex::build(&graph.nodes);
    let outcome = filter_edges(&index, &load.candidates);

    metrics::record_filter_pass(
        outcome.stats.accepted,
        outcome.stats.rejected,
        outcome.missing_ids.len(),
    );

    io::write_links(&data.filtered_links_path, &outcome.accepted)?;
    io::write_missing_ids(&data.missing_ids_path, &outcome.missing_ids)?;

    let rejected = &outcome.stats.rejected;
    info!(
        nodes = graph.nodes.len(),
        dated = index.dates().len(),
        candidates = outcome.stats.candidates,
        accepted = outcome.stats.accepted,
        unknown_reference = rejected.unknown_reference,
        undated_reference = rejected.undated_reference,
        temporal_violation = rejected.temporal_violation,
        duplicate = rejected.duplicate,
        missing_ids = outcome.missing_ids.len(),
        output = %data.filtered_links_path.display(),
        "Filtering complete"
    );

    if !outcome.is_clean() {
        warn!(
            path = %data.missing_ids_path.display(),
            count = outcome.missing_ids.len(),
            "Candidates reference unknown or undated nodes"
        );

        if config.filter.fail_on_missing {
            return Err(AppError::MissingReferences {
                ids: outcome.missing_ids.into_iter().collect(),
            });
        }
    }

    Ok(())
}
