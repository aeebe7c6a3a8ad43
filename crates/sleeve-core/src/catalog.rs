//! Object version snapshots keyed by causal identity.
//!
//! The instrumented client logs a snapshot of every object it observes:
//!
//! ```text
//! {"kind": "apps/v1, Kind=Deployment", "object_id": "...", "version": "...",
//!  "value": "{\"metadata\": {\"labels\": {...}, \"annotations\": {...}}, ...}"}
//! ```
//!
//! `value` is itself a serialized document. The catalog decodes it, derives
//! the causal id from `metadata.labels` with the same rule events use, and
//! stores the snapshot under `(kind, causal_id)`. Later snapshots with the
//! same key replace earlier ones.
//!
//! The graph builder uses the catalog to annotate read nodes with the
//! `status.*` annotations the object carried at that version.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::causal::{CausalId, CausalKey, CausalResolution, bare_label_name, resolve_causal_id};
use crate::config::{CatalogConfig, Config};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ErrorCode;

/// Errors for a single snapshot record. Each one skips that record only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid version record: {0}")]
    InvalidRecord(String),

    #[error("invalid embedded object for {kind} {object_id}: {details}")]
    InvalidValue {
        kind: String,
        object_id: String,
        details: String,
    },

    #[error("{kind} {object_id}@{version} has no change-id or root tracing label")]
    MissingCausalLabel {
        kind: String,
        object_id: String,
        version: String,
    },
}

impl CatalogError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRecord(_) | Self::InvalidValue { .. } => ErrorCode::MalformedRecord,
            Self::MissingCausalLabel { .. } => ErrorCode::MissingCausalLabel,
        }
    }
}

/// Outer snapshot record as logged.
#[derive(Debug, Clone, Deserialize)]
struct VersionRecord {
    kind: String,
    #[serde(default)]
    object_id: String,
    #[serde(default)]
    version: String,
    value: Value,
}

/// One decoded object snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub kind: String,
    pub object_id: String,
    pub version: String,
    /// Decoded object document.
    pub value: Value,
    pub causal_id: CausalId,
}

impl Version {
    /// Decode one snapshot line.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the outer record or the embedded
    /// document cannot be decoded, or when no correlation label is present.
    pub fn from_line(line: &str, config: &Config) -> Result<Self, CatalogError> {
        let record: VersionRecord = serde_json::from_str(line.trim())
            .map_err(|e| CatalogError::InvalidRecord(e.to_string()))?;
        Self::from_record(record, config)
    }

    fn from_record(record: VersionRecord, config: &Config) -> Result<Self, CatalogError> {
        let kind = derive_kind(&record.kind, &config.catalog.kind_marker);

        let value = match record.value {
            Value::String(raw) => {
                serde_json::from_str::<Value>(&raw).map_err(|e| CatalogError::InvalidValue {
                    kind: kind.clone(),
                    object_id: record.object_id.clone(),
                    details: e.to_string(),
                })?
            }
            obj @ Value::Object(_) => obj,
            other => {
                return Err(CatalogError::InvalidValue {
                    kind,
                    object_id: record.object_id,
                    details: format!("expected a serialized object, found {other}"),
                });
            }
        };
        if !value.is_object() {
            return Err(CatalogError::InvalidValue {
                kind,
                object_id: record.object_id,
                details: "embedded document is not an object".to_string(),
            });
        }

        let labels = bare_labels(metadata_map(&value, "labels"));
        match resolve_causal_id(&labels, &config.labels) {
            CausalResolution::Resolved(causal_id) => Ok(Self {
                kind,
                object_id: record.object_id,
                version: record.version,
                value,
                causal_id,
            }),
            CausalResolution::Unresolved(_) => Err(CatalogError::MissingCausalLabel {
                kind,
                object_id: record.object_id,
                version: record.version,
            }),
        }
    }

    #[must_use]
    pub fn key(&self) -> CausalKey {
        CausalKey::new(self.kind.clone(), self.causal_id.clone())
    }

    /// `metadata.labels`, with the keys as logged.
    #[must_use]
    pub fn labels(&self) -> Option<&Map<String, Value>> {
        metadata_map(&self.value, "labels")
    }

    /// `metadata.annotations`, with the keys as logged.
    #[must_use]
    pub fn annotations(&self) -> Option<&Map<String, Value>> {
        metadata_map(&self.value, "annotations")
    }
}

/// Extract the usable kind from a logged kind string.
///
/// `"apps/v1, Kind=Deployment"` becomes `"Deployment"`; a kind without the
/// marker is returned trimmed.
#[must_use]
pub fn derive_kind(raw: &str, marker: &str) -> String {
    match raw.find(marker) {
        Some(pos) if !marker.is_empty() => {
            let rest = &raw[pos + marker.len()..];
            rest.split(',').next().unwrap_or_default().trim().to_string()
        }
        _ => raw.trim().to_string(),
    }
}

fn metadata_map<'a>(value: &'a Value, field: &str) -> Option<&'a Map<String, Value>> {
    value.get("metadata")?.get(field)?.as_object()
}

fn bare_labels(labels: Option<&Map<String, Value>>) -> BTreeMap<String, String> {
    labels
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| {
            value
                .as_str()
                .map(|v| (bare_label_name(key).to_string(), v.to_string()))
        })
        .collect()
}

/// Last-write-wins map from `(kind, causal_id)` to [`Version`].
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    versions: BTreeMap<CausalKey, Version>,
    status_prefix: String,
}

/// Result of loading a batch of snapshot lines.
#[derive(Debug, Clone, Default)]
pub struct CatalogBatch {
    pub catalog: VersionCatalog,
    /// Number of non-blank lines that were skipped.
    pub skipped: usize,
    pub diagnostics: Diagnostics,
}

impl VersionCatalog {
    #[must_use]
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            versions: BTreeMap::new(),
            status_prefix: config.status_prefix.clone(),
        }
    }

    /// Load every non-blank snapshot line. Bad records are skipped with a
    /// diagnostic; the catalog is always produced.
    #[instrument(skip_all)]
    pub fn from_lines<'a, I>(lines: I, config: &Config) -> CatalogBatch
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut batch = CatalogBatch {
            catalog: Self::new(&config.catalog),
            ..CatalogBatch::default()
        };

        for (idx, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match Version::from_line(line, config) {
                Ok(version) => {
                    batch.catalog.insert(version, &mut batch.diagnostics);
                }
                Err(err) => {
                    batch.skipped += 1;
                    batch.diagnostics.record(
                        err.code(),
                        Stage::Catalog,
                        format!("line {}", idx + 1),
                        err.to_string(),
                    );
                }
            }
        }

        debug!(
            versions = batch.catalog.len(),
            skipped = batch.skipped,
            "loaded version catalog"
        );
        batch
    }

    /// Insert a snapshot, replacing any earlier one with the same key.
    ///
    /// Returns the replaced snapshot. A replacement that points at a
    /// different object or resource version records a `CatalogConflict`.
    pub fn insert(&mut self, version: Version, diagnostics: &mut Diagnostics) -> Option<Version> {
        let key = version.key();
        let replaced = self.versions.insert(key.clone(), version);

        if let Some(old) = &replaced {
            let current = &self.versions[&key];
            if old.object_id != current.object_id || old.version != current.version {
                diagnostics.record(
                    ErrorCode::CatalogConflict,
                    Stage::Catalog,
                    key.to_string(),
                    format!(
                        "{}@{} replaced by {}@{}",
                        old.object_id, old.version, current.object_id, current.version
                    ),
                );
            } else {
                debug!(%key, "duplicate snapshot replaced");
            }
        }
        replaced
    }

    #[must_use]
    pub fn get(&self, kind: &str, causal_id: &CausalId) -> Option<&Version> {
        self.versions.get(&CausalKey::new(kind, causal_id.clone()))
    }

    /// Annotations of `version` whose key starts with the status prefix.
    /// The prefix is kept in the returned keys.
    #[must_use]
    pub fn status_conditions(&self, version: &Version) -> BTreeMap<String, String> {
        version
            .annotations()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.starts_with(&self.status_prefix))
            .map(|(key, value)| {
                let text = value
                    .as_str()
                    .map_or_else(|| value.to_string(), ToString::to_string);
                (key.clone(), text)
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Snapshots in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&CausalKey, &Version)> {
        self.versions.iter()
    }
}
