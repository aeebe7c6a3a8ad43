//! Causal identifier resolution.
//!
//! A causal id ties a write to the read whose observed state it was based
//! on. It is carried in labels stamped by the tracing instrumentation:
//!
//! 1. `change-id`, set on every instrumented write;
//! 2. failing that, a root tracing label (`root-event-id`, then
//!    `tracey-uid`), present on objects that were only read so far.
//!
//! Events and version snapshots resolve their id with the same
//! [`resolve_causal_id`] so the two sides always agree on keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LabelConfig;

/// Resolved correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CausalId(String);

impl CausalId {
    /// Wrap a raw id. Empty ids are not valid causal ids.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CausalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Graph and catalog identity of an object at one causal version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CausalKey {
    pub kind: String,
    pub causal_id: CausalId,
}

impl CausalKey {
    #[must_use]
    pub fn new(kind: impl Into<String>, causal_id: CausalId) -> Self {
        Self {
            kind: kind.into(),
            causal_id,
        }
    }
}

impl fmt::Display for CausalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.causal_id)
    }
}

/// Why no causal id could be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// The record carried no labels at all.
    NoLabels,
    /// Labels exist but none of the correlation labels is set.
    NoCorrelationLabel,
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLabels => f.write_str("record has no labels"),
            Self::NoCorrelationLabel => f.write_str("no change-id or root tracing label"),
        }
    }
}

/// Outcome of causal id resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum CausalResolution {
    Resolved(CausalId),
    Unresolved(UnresolvedReason),
}

impl CausalResolution {
    #[must_use]
    pub const fn id(&self) -> Option<&CausalId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved(_) => None,
        }
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Resolve the causal id from a label map whose keys are bare label names
/// (namespace already stripped).
#[must_use]
pub fn resolve_causal_id(labels: &BTreeMap<String, String>, config: &LabelConfig) -> CausalResolution {
    if labels.is_empty() {
        return CausalResolution::Unresolved(UnresolvedReason::NoLabels);
    }

    std::iter::once(&config.change_id)
        .chain(config.root_ids.iter())
        .find_map(|name| labels.get(name).and_then(|v| CausalId::new(v.as_str())))
        .map_or(
            CausalResolution::Unresolved(UnresolvedReason::NoCorrelationLabel),
            CausalResolution::Resolved,
        )
}

/// Strip a `<namespace>/` prefix from a label key.
#[must_use]
pub fn bare_label_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn change_id_wins() {
        let config = LabelConfig::default();
        let res = resolve_causal_id(
            &labels(&[("change-id", "c1"), ("root-event-id", "r1"), ("tracey-uid", "t1")]),
            &config,
        );
        assert_eq!(res.id().map(CausalId::as_str), Some("c1"));
    }

    #[test]
    fn falls_back_to_root_ids_in_order() {
        let config = LabelConfig::default();
        let res = resolve_causal_id(&labels(&[("tracey-uid", "t1"), ("root-event-id", "r1")]), &config);
        assert_eq!(res.id().map(CausalId::as_str), Some("r1"));

        let res = resolve_causal_id(&labels(&[("tracey-uid", "t1")]), &config);
        assert_eq!(res.id().map(CausalId::as_str), Some("t1"));
    }

    #[test]
    fn empty_value_counts_as_absent() {
        let config = LabelConfig::default();
        let res = resolve_causal_id(&labels(&[("change-id", ""), ("tracey-uid", "t1")]), &config);
        assert_eq!(res.id().map(CausalId::as_str), Some("t1"));
    }

    #[test]
    fn unresolved_reasons() {
        let config = LabelConfig::default();
        assert_eq!(
            resolve_causal_id(&BTreeMap::new(), &config),
            CausalResolution::Unresolved(UnresolvedReason::NoLabels)
        );
        assert_eq!(
            resolve_causal_id(&labels(&[("creator-id", "ctrl")]), &config),
            CausalResolution::Unresolved(UnresolvedReason::NoCorrelationLabel)
        );
    }

    #[test]
    fn custom_label_names() {
        let config = LabelConfig {
            change_id: "revision".into(),
            root_ids: vec!["trace".into()],
        };
        let res = resolve_causal_id(&labels(&[("change-id", "ignored"), ("trace", "tr")]), &config);
        assert_eq!(res.id().map(CausalId::as_str), Some("tr"));
    }

    #[test]
    fn bare_label_name_strips_namespace() {
        assert_eq!(bare_label_name("discrete.events/change-id"), "change-id");
        assert_eq!(bare_label_name("tracey-uid"), "tracey-uid");
    }

    #[test]
    fn causal_key_display() {
        let key = CausalKey::new("Pod", CausalId::new("x1").expect("id"));
        assert_eq!(key.to_string(), "Pod/x1");
    }

    #[test]
    fn empty_causal_id_rejected() {
        assert!(CausalId::new("").is_none());
        assert_eq!(CausalId::new("x").map(|id| id.to_string()), Some("x".into()));
    }
}
