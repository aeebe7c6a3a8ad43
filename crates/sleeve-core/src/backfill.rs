//! Completion of write events from the reads that produced them.
//!
//! The instrumented client stamps each write with the causal id of the
//! object state it was derived from, but logs the write before the
//! object's kind, uid and resource version are known. The read that
//! observed that state carries the same causal id and the full identity,
//! so the write's missing fields are copied from it.
//!
//! # Rules
//!
//! - The index maps causal id to read event; when several reads share an
//!   id, the last one in input order wins (it reflects the freshest
//!   observation of that change).
//! - Only writes that are still eligible (see
//!   [`Event::is_backfill_eligible`]) are touched, and only their empty
//!   fields are filled. Running backfill twice is a no-op.
//! - A write with no matching read becomes an orphan: kept, flagged, and
//!   later excluded from graph edges.
//! - Writes without a causal id are left as they are; the parser already
//!   reported them.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::causal::CausalId;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ErrorCode;
use crate::event::Event;

/// Result of a backfill pass.
#[derive(Debug, Clone, Default)]
pub struct BackfillOutcome {
    /// The batch, same length and order as the input.
    pub events: Vec<Event>,
    /// Writes completed in this pass.
    pub completed: usize,
    /// Writes left without a matching read in this pass.
    pub orphaned: usize,
    pub diagnostics: Diagnostics,
}

/// Index of read events by causal id, last read wins.
#[must_use]
pub fn index_reads(events: &[Event]) -> HashMap<&CausalId, &Event> {
    let mut index = HashMap::new();
    for event in events.iter().filter(|e| e.is_read()) {
        if let Some(id) = event.causal_id() {
            index.insert(id, event);
        }
    }
    index
}

/// Complete eligible writes from matching reads.
///
/// Consumes the batch and returns a new one; no event is shared between
/// input and output.
#[instrument(skip_all, fields(events = events.len()))]
pub fn backfill(events: Vec<Event>) -> BackfillOutcome {
    let mut diagnostics = Diagnostics::new();
    let mut completed = 0;
    let mut orphaned = 0;

    let resolved: Vec<Event> = {
        let index = index_reads(&events);
        events
            .iter()
            .map(|event| {
                if !event.is_backfill_eligible() {
                    return event.clone();
                }
                let Some(id) = event.causal_id() else {
                    return event.clone();
                };

                if let Some(read) = index.get(id) {
                    completed += 1;
                    debug!(causal_id = %id, read = %read, "backfilled write");
                    event.completed_from(read)
                } else {
                    orphaned += 1;
                    diagnostics.record(
                        ErrorCode::OrphanWrite,
                        Stage::Backfill,
                        id.to_string(),
                        format!(
                            "{} in reconcile {} by {} has no matching read",
                            event.op_type, event.reconcile_id, event.controller_id
                        ),
                    );
                    event.orphaned()
                }
            })
            .collect()
    };

    debug!(completed, orphaned, "backfill pass finished");
    BackfillOutcome {
        events: resolved,
        completed,
        orphaned,
        diagnostics,
    }
}
