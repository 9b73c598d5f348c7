use std::fmt;

/// Library-wide error type.
///
/// All errors are surfaced synchronously to the caller of the top-level
/// driver; nothing is silently recovered inside the core.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed mesh file: unknown element code, truncated section or
    /// inconsistent counts.
    MeshFormat(String),
    /// Invalid configuration: missing required field or out-of-range
    /// model parameters.
    ConfigInvalid(String),
    /// An engine invariant on derived table sizes was violated.
    ShapeMismatch { expected: usize, found: usize },
    /// Pure-Neumann problem whose net boundary flux does not vanish.
    UnsolvableNeumann { residual: f64 },
    /// A solver was invoked without a mesh proxy.
    NullProxy,
    /// The linear solver failed to produce a solution.
    SolverFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeshFormat(msg) => write!(f, "malformed mesh: {}", msg),
            Self::ConfigInvalid(msg) => write!(f, "invalid configuration: {}", msg),
            Self::ShapeMismatch { expected, found } => {
                write!(
                    f,
                    "quadrature shift table size mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Self::UnsolvableNeumann { residual } => {
                write!(
                    f,
                    "the problem is unsolvable: net boundary flux {} does not vanish",
                    residual
                )
            }
            Self::NullProxy => write!(f, "solver invoked without a mesh proxy"),
            Self::SolverFailed(msg) => write!(f, "linear solver failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;
