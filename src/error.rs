use thiserror::Error;

/// Construction-time errors, always surfaced to the caller (spec §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("duplicate name `{0}`")]
    DuplicateName(String),
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("topology is frozen: `initialize_adj_matrix` has already run")]
    TopologyFrozen,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("link `{link}` cell count {count} exceeds configured cap {cap}")]
    Overflow {
        link: String,
        count: usize,
        cap: usize,
    },
}

/// Non-fatal runtime conditions. These never abort the run; they accumulate
/// on `World::diagnostics` and are also emitted via `tracing::warn!`.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// DUO could not find any path from `origin` to `destination`.
    Unreachable { origin: usize, destination: usize },
    /// A demand record generates zero platoons over its whole window.
    ZeroDemand { origin: usize, destination: usize },
}

pub type Result<T> = std::result::Result<T, SimError>;
