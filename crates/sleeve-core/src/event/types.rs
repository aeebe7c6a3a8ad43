//! Operation type enum covering the six client operations a controller
//! performs against the API server.
//!
//! The string representation is the upper-case verb used by the
//! instrumented client in its `op_type` log field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Client operation recorded in a controller-operation log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpType {
    Get,
    List,
    Create,
    Patch,
    Update,
    Delete,
}

/// Read/write classification of an [`OpType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpClass {
    Read,
    Write,
}

/// Error returned when parsing an unknown operation string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOpType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown op_type '{}': expected one of GET, LIST, CREATE, PATCH, UPDATE, DELETE",
            self.raw
        )
    }
}

impl std::error::Error for UnknownOpType {}

impl OpType {
    /// All known operations, reads first.
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::List,
        Self::Create,
        Self::Patch,
        Self::Update,
        Self::Delete,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::List => "LIST",
            Self::Create => "CREATE",
            Self::Patch => "PATCH",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    #[must_use]
    pub const fn class(self) -> OpClass {
        match self {
            Self::Get | Self::List => OpClass::Read,
            Self::Create | Self::Patch | Self::Update | Self::Delete => OpClass::Write,
        }
    }

    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self.class(), OpClass::Read)
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self.class(), OpClass::Write)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = UnknownOpType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "LIST" => Ok(Self::List),
            "CREATE" => Ok(Self::Create),
            "PATCH" => Ok(Self::Patch),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnknownOpType { raw: s.to_string() }),
        }
    }
}

// Serialize as the upper-case verb.
impl Serialize for OpType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OpType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
