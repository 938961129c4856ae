//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid policies, unknown or empty catalog entries, densities without mass,
//! mismatched buffer extents, and generic errors.
//!
//! Retry exhaustion during placement is not an error; it is logged and reported
//! through [`crate::artefact::PlacementReport`].
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown artefact type '{category}'/'{}'", .subcategory.as_deref().unwrap_or("-"))]
    UnknownArtefactType {
        category: String,
        subcategory: Option<String>,
    },

    #[error("artefact type '{category}'/'{}' has no patches", .subcategory.as_deref().unwrap_or("-"))]
    EmptyCatalog {
        category: String,
        subcategory: Option<String>,
    },

    #[error("density has no positive mass")]
    DegenerateDensity,

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("no artefact matches the requested classes")]
    NoMatchingArtefact,

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
