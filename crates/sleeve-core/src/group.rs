//! Partition of a backfilled batch into reconcile cycles.
//!
//! Every event belongs to exactly one cycle (its `reconcile_id`). Within a
//! cycle events are split into the readset and the writeset, each keeping
//! input order. Timestamps are never used for ordering; clocks are not
//! comparable across controllers.
//!
//! A cycle is one control-loop execution of one controller. A cycle whose
//! events name more than one controller means the input conflates
//! unrelated cycles; that is fatal for the whole run.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::ErrorCode;
use crate::event::{Event, OpClass};

/// Cycle-level invariant violations. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupError {
    #[error("reconcile {reconcile_id} spans controllers {}", controllers.join(", "))]
    MixedControllers {
        reconcile_id: String,
        controllers: Vec<String>,
    },

    #[error(
        "reconcile {reconcile_id}: readset ({reads}) and writeset ({writes}) do not partition its {total} events"
    )]
    IncompletePartition {
        reconcile_id: String,
        reads: usize,
        writes: usize,
        total: usize,
    },
}

impl GroupError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::GroupInvariantViolation
    }

    #[must_use]
    pub fn reconcile_id(&self) -> &str {
        match self {
            Self::MixedControllers { reconcile_id, .. }
            | Self::IncompletePartition { reconcile_id, .. } => reconcile_id,
        }
    }
}

/// One reconcile cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileGroup {
    pub reconcile_id: String,
    pub controller_id: String,
    pub readset: Vec<Event>,
    pub writeset: Vec<Event>,
}

impl ReconcileGroup {
    #[must_use]
    pub fn len(&self) -> usize {
        self.readset.len() + self.writeset.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cycle that only read; it contributes no causal edges.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writeset.is_empty()
    }
}

/// Groups keyed by reconcile id, in sorted order.
pub type ReconcileGroups = BTreeMap<String, ReconcileGroup>;

/// Partition `events` by reconcile id and validate each cycle.
///
/// # Errors
///
/// Returns [`GroupError::MixedControllers`] when a cycle has events from
/// more than one controller, and [`GroupError::IncompletePartition`] if a
/// cycle's readset and writeset fail to cover its events exactly.
#[instrument(skip_all, fields(events = events.len()))]
pub fn group_events(events: &[Event]) -> Result<ReconcileGroups, GroupError> {
    let mut by_reconcile: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
    for event in events {
        by_reconcile
            .entry(event.reconcile_id.as_str())
            .or_default()
            .push(event);
    }

    let mut groups = ReconcileGroups::new();
    for (reconcile_id, members) in by_reconcile {
        let group = partition(reconcile_id, &members)?;
        debug!(
            reconcile_id,
            controller = %group.controller_id,
            reads = group.readset.len(),
            writes = group.writeset.len(),
            "grouped reconcile cycle"
        );
        groups.insert(reconcile_id.to_string(), group);
    }
    Ok(groups)
}

fn partition(reconcile_id: &str, members: &[&Event]) -> Result<ReconcileGroup, GroupError> {
    let controllers: BTreeSet<&str> = members.iter().map(|e| e.controller_id.as_str()).collect();
    if controllers.len() > 1 {
        return Err(GroupError::MixedControllers {
            reconcile_id: reconcile_id.to_string(),
            controllers: controllers.into_iter().map(str::to_string).collect(),
        });
    }

    let mut readset = Vec::new();
    let mut writeset = Vec::new();
    for event in members {
        match event.op_type.class() {
            OpClass::Read => readset.push((*event).clone()),
            OpClass::Write => writeset.push((*event).clone()),
        }
    }

    if readset.len() + writeset.len() != members.len() {
        return Err(GroupError::IncompletePartition {
            reconcile_id: reconcile_id.to_string(),
            reads: readset.len(),
            writes: writeset.len(),
            total: members.len(),
        });
    }

    Ok(ReconcileGroup {
        reconcile_id: reconcile_id.to_string(),
        controller_id: controllers
            .into_iter()
            .next()
            .map(str::to_string)
            .unwrap_or_default(),
        readset,
        writeset,
    })
}
