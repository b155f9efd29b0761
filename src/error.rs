//! Error types for quadrature construction.
//!
//! None of these are retried internally: each one names malformed input or
//! a numerically unrecoverable configuration, and carries the dimension,
//! order and distribution kind needed to correct it.

use thiserror::Error;

use crate::distributions::DistributionError;

/// Result type alias using [`QuadratureError`].
pub type Result<T> = std::result::Result<T, QuadratureError>;

/// Errors raised while building recurrence tables and quadrature rules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuadratureError {
    /// A polynomial order was negative or cannot be honoured.
    #[error("invalid order {order}{}: {reason}", fmt_dimension(*.dimension))]
    InvalidOrder {
        /// Dimension the order belongs to, when known
        dimension: Option<usize>,
        /// The offending order
        order: i64,
        /// Why it was rejected
        reason: String,
    },

    /// Number of distributions and number of orders disagree.
    #[error("dimension mismatch: {expected} distributions but {got} orders")]
    DimensionMismatch {
        /// Number of distributions supplied
        expected: usize,
        /// Length of the multi-index supplied
        got: usize,
    },

    /// The discretized measure cannot support the requested recurrence.
    #[error(
        "degenerate recurrence for {kind} distribution{} at order {order}: {reason}",
        fmt_dimension(*.dimension)
    )]
    DegenerateRecurrence {
        /// Dimension the table was requested for, when known
        dimension: Option<usize>,
        /// Recurrence order at which the procedure broke down
        order: usize,
        /// Distribution kind
        kind: &'static str,
        /// What went wrong
        reason: String,
    },

    /// Neither closed-form coefficients nor a usable discretization exist.
    #[error("unsupported {kind} distribution{}: no closed-form recurrence and no finite discretization", fmt_dimension(*.dimension))]
    UnsupportedDistribution {
        /// Dimension of the offending distribution, when known
        dimension: Option<usize>,
        /// Distribution kind
        kind: &'static str,
    },

    /// The tridiagonal QL iteration hit its iteration limit.
    #[error("Jacobi eigensolver did not converge for order {order}{}", fmt_dimension(*.dimension))]
    EigensolverDidNotConverge {
        /// Dimension the rule was requested for, when known
        dimension: Option<usize>,
        /// Requested rule order
        order: usize,
    },

    /// A configuration value or constructor argument is out of range.
    #[error("invalid configuration '{parameter}': {message}")]
    InvalidConfiguration {
        /// Name of the parameter
        parameter: &'static str,
        /// Description of the constraint that was violated
        message: String,
    },

    /// Distribution parameters were rejected at construction.
    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

impl QuadratureError {
    /// Attaches a dimension index to errors raised without one.
    ///
    /// Errors that already name a dimension are returned unchanged.
    pub fn in_dimension(self, dim: usize) -> Self {
        match self {
            Self::InvalidOrder {
                dimension: None,
                order,
                reason,
            } => Self::InvalidOrder {
                dimension: Some(dim),
                order,
                reason,
            },
            Self::DegenerateRecurrence {
                dimension: None,
                order,
                kind,
                reason,
            } => Self::DegenerateRecurrence {
                dimension: Some(dim),
                order,
                kind,
                reason,
            },
            Self::UnsupportedDistribution {
                dimension: None,
                kind,
            } => Self::UnsupportedDistribution {
                dimension: Some(dim),
                kind,
            },
            Self::EigensolverDidNotConverge {
                dimension: None,
                order,
            } => Self::EigensolverDidNotConverge {
                dimension: Some(dim),
                order,
            },
            other => other,
        }
    }

    /// Dimension index carried by the error, if any.
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Self::InvalidOrder { dimension, .. }
            | Self::DegenerateRecurrence { dimension, .. }
            | Self::UnsupportedDistribution { dimension, .. }
            | Self::EigensolverDidNotConverge { dimension, .. } => *dimension,
            _ => None,
        }
    }
}

fn fmt_dimension(dimension: Option<usize>) -> String {
    match dimension {
        Some(d) => format!(" in dimension {d}"),
        None => String::new(),
    }
}
