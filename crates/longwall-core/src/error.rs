//! Error taxonomy and structured warnings shared by every pipeline stage.
//!
//! Components surface their own errors unchanged; the façade is the only
//! layer that attaches session context. Non-fatal diagnostics are collected
//! as [`Warning`] values on the stage results, never logged as free text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Fewer than 3 vertices, or a vertex with non-finite coordinates.
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("no boreholes supplied")]
    NoBoreholes,

    /// Every supplied borehole is missing the fields this stage requires.
    #[error("no valid borehole: {0}")]
    NoValidBorehole(String),

    /// The borehole carries layers but none of them is a coal horizon.
    #[error("no coal horizon in borehole {borehole}")]
    NoCoalFound { borehole: String },

    /// A named seam was requested but no coal layer matches it.
    #[error("coal seam {requested:?} not found in borehole {borehole}; available: {available:?}")]
    CoalSeamNotFound {
        borehole: String,
        requested: String,
        available: Vec<String>,
    },

    /// The boundary's bounding box has zero area.
    #[error("degenerate boundary: bounding box has zero area")]
    DegenerateBoundary,

    /// A pipeline stage was invoked before its prerequisite stage.
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    #[error("unknown score mode {0:?}")]
    InvalidMode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("wall-clock budget exceeded")]
    Timeout,
}

impl Error {
    /// Stable machine-readable kind, for the `{kind, message}` interface shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidBoundary(_) => "InvalidBoundary",
            Error::NoBoreholes => "NoBoreholes",
            Error::NoValidBorehole(_) => "NoValidBorehole",
            Error::NoCoalFound { .. } => "NoCoalFound",
            Error::CoalSeamNotFound { .. } => "CoalSeamNotFound",
            Error::DegenerateBoundary => "DegenerateBoundary",
            Error::DependencyMissing(_) => "DependencyMissing",
            Error::InvalidMode(_) => "InvalidMode",
            Error::Cancelled => "Cancelled",
            Error::Timeout => "Timeout",
        }
    }
}

/// A non-fatal diagnostic accumulated into stage results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable machine-readable code, e.g. `"few-boreholes"`.
    pub code: String,
    pub message: String,
}

impl Warning {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant_name() {
        assert_eq!(Error::NoBoreholes.kind(), "NoBoreholes");
        assert_eq!(Error::Timeout.kind(), "Timeout");
        let e = Error::CoalSeamNotFound {
            borehole: "B1".into(),
            requested: "M9".into(),
            available: vec!["M3".into()],
        };
        assert_eq!(e.kind(), "CoalSeamNotFound");
    }

    #[test]
    fn display_carries_context() {
        let e = Error::DependencyMissing("geology model not built".into());
        assert!(e.to_string().contains("geology model"));
    }
}
