//! Error types for scour solver operations.

use thiserror::Error;

/// Result type alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a solve.
///
/// Per-element and per-node conditions (degenerate triangles, unclassified boundary
/// nodes, pier nodes without a usable neighbor) are not errors; they are counted in
/// the mesh and solve diagnostics instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The mesh could not be built (too few surviving nodes or no triangles).
    #[error("mesh construction error: {0}")]
    MeshConstruction(String),

    /// The sparse factorization failed or produced a non-finite solution.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// Linear solver misuse (shape mismatches).
    #[error("solver error: {0}")]
    Solver(String),

    /// Physically or numerically invalid input parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Problem configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed legacy VTK input.
    #[error("VTK format error: {0}")]
    Vtk(String),

    /// I/O errors (VTK export, config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
