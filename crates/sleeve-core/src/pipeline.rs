//! End-to-end correlation: parse → backfill → catalog → group → graph.

use tracing::{info, instrument};

use crate::backfill::backfill;
use crate::catalog::VersionCatalog;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::event::{Event, parse_events};
use crate::graph::CausalGraph;
use crate::group::{GroupError, ReconcileGroups, group_events};

/// Everything one run produces.
#[derive(Debug)]
pub struct Correlation {
    /// Backfilled events, in input order.
    pub events: Vec<Event>,
    pub groups: ReconcileGroups,
    pub catalog: VersionCatalog,
    pub graph: CausalGraph,
    /// Diagnostics from every stage, in stage order.
    pub diagnostics: Diagnostics,
    /// Event and version lines that were skipped as unusable.
    pub skipped_events: usize,
    pub skipped_versions: usize,
}

/// Run the full pipeline over event and version lines.
///
/// # Errors
///
/// Returns [`GroupError`] when a reconcile cycle violates its invariants.
/// No graph is built in that case.
#[instrument(skip_all)]
pub fn correlate<'a, E, V>(
    event_lines: E,
    version_lines: V,
    config: &Config,
) -> Result<Correlation, GroupError>
where
    E: IntoIterator<Item = &'a str>,
    V: IntoIterator<Item = &'a str>,
{
    let mut diagnostics = Diagnostics::new();

    let parsed = parse_events(event_lines, &config.labels);
    diagnostics.absorb(parsed.diagnostics);

    let filled = backfill(parsed.events);
    diagnostics.absorb(filled.diagnostics);

    let loaded = VersionCatalog::from_lines(version_lines, config);
    diagnostics.absorb(loaded.diagnostics);

    let groups = group_events(&filled.events)?;

    let built = CausalGraph::build(&groups, &loaded.catalog, config);
    diagnostics.absorb(built.diagnostics);

    info!(
        events = filled.events.len(),
        cycles = groups.len(),
        nodes = built.graph.node_count(),
        edges = built.graph.edge_count(),
        diagnostics = diagnostics.len(),
        "correlation finished"
    );

    Ok(Correlation {
        events: filled.events,
        groups,
        catalog: loaded.catalog,
        graph: built.graph,
        diagnostics,
        skipped_events: parsed.skipped,
        skipped_versions: loaded.skipped,
    })
}
