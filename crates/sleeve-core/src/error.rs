use std::fmt;

use serde::{Serialize, Serializer};

/// Machine-readable codes for every diagnostic and fatal error the
/// correlation pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorCode {
    MalformedRecord,
    MissingCausalIdentity,
    MissingCausalLabel,
    OrphanWrite,
    CatalogMiss,
    CatalogConflict,
    GroupInvariantViolation,
    ConfigParseError,
}

impl ErrorCode {
    /// Every code in table order.
    pub const ALL: [Self; 8] = [
        Self::MalformedRecord,
        Self::MissingCausalIdentity,
        Self::MissingCausalLabel,
        Self::OrphanWrite,
        Self::CatalogMiss,
        Self::CatalogConflict,
        Self::GroupInvariantViolation,
        Self::ConfigParseError,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MalformedRecord => "E1001",
            Self::MissingCausalIdentity => "E1002",
            Self::MissingCausalLabel => "E1003",
            Self::OrphanWrite => "E2001",
            Self::CatalogMiss => "E2002",
            Self::CatalogConflict => "E2003",
            Self::GroupInvariantViolation => "E3001",
            Self::ConfigParseError => "E4001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedRecord => "Malformed record",
            Self::MissingCausalIdentity => "Event has no causal identity",
            Self::MissingCausalLabel => "Version snapshot has no correlation label",
            Self::OrphanWrite => "Write has no matching read",
            Self::CatalogMiss => "No version snapshot for read",
            Self::CatalogConflict => "Version snapshot replaced by a different object",
            Self::GroupInvariantViolation => "Reconcile cycle invariant violated",
            Self::ConfigParseError => "Config file parse error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MalformedRecord => Some(
                "Check that the line is a single JSON object with timestamp, reconcile_id, \
                 controller_id and op_type.",
            ),
            Self::MissingCausalIdentity => {
                Some("Make sure the instrumented client stamps change-id labels on writes.")
            }
            Self::MissingCausalLabel => {
                Some("Snapshots taken before labeling carry no change-id; they are skipped.")
            }
            Self::OrphanWrite => Some(
                "The read that produced this write was not captured; widen the log window.",
            ),
            Self::CatalogMiss | Self::CatalogConflict => None,
            Self::GroupInvariantViolation => Some(
                "The input conflates unrelated reconcile cycles; check that reconcile ids are \
                 unique per controller.",
            ),
            Self::ConfigParseError => Some("Fix syntax in .sleeve/config.toml and retry."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ErrorCode::ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::OrphanWrite.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn table_covers_exactly_the_pipeline_codes() {
        let codes: Vec<_> = ErrorCode::ALL.into_iter().map(ErrorCode::code).collect();
        assert_eq!(
            codes,
            ["E1001", "E1002", "E1003", "E2001", "E2002", "E2003", "E3001", "E4001"]
        );
    }

    #[test]
    fn serializes_as_code_string() {
        let json = serde_json::to_string(&ErrorCode::CatalogMiss).expect("serialize");
        assert_eq!(json, "\"E2002\"");
    }
}
