//! Sparse grid configuration.
//!
//! Every numeric knob of the assembler lives here. Fields deserialize with
//! serde defaults, so a config file only needs to name the level.

use serde::{Deserialize, Serialize};

use crate::error::{QuadratureError, Result};
use crate::recurrence::DEFAULT_RESOLUTION;

/// Mapping from a per-dimension level `l` to a univariate Gauss order.
///
/// Both rules yield odd point counts (`order + 1`), so every level
/// contains the centre node of a symmetric measure and coincident
/// points across levels can be merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthRule {
    /// `order = 2l` (`2l + 1` points)
    #[default]
    Linear,
    /// `order = 2^(l+1) − 2` (`2^(l+1) − 1` points)
    Exponential,
}

impl GrowthRule {
    /// Univariate order for level `level`.
    ///
    /// # Errors
    /// [`QuadratureError::InvalidOrder`] if the order overflows `usize`.
    pub fn order(self, level: usize) -> Result<usize> {
        let overflow = || QuadratureError::InvalidOrder {
            dimension: None,
            order: i64::try_from(level).unwrap_or(i64::MAX),
            reason: format!("{self:?} growth overflows at level {level}"),
        };
        match self {
            Self::Linear => level.checked_mul(2).ok_or_else(overflow),
            Self::Exponential => {
                if level >= usize::BITS as usize - 1 {
                    return Err(overflow());
                }
                Ok((1usize << (level + 1)) - 2)
            }
        }
    }
}

/// Parameters for [`assemble`](crate::assembler::assemble).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseGridConfig {
    /// Smolyak level; level indices satisfy `|l| ≤ level`
    #[serde(default = "default_level")]
    pub level: usize,

    /// Level-to-order mapping
    #[serde(default)]
    pub growth_rule: GrowthRule,

    /// Midpoint cells used when a density must be discretized
    #[serde(default = "default_resolution")]
    pub discretization_resolution: usize,

    /// Coordinate quantum below which points are merged
    #[serde(default = "default_merge_tolerance")]
    pub merge_tolerance: f64,

    /// Relative weight below which merged points are dropped
    #[serde(default = "default_weight_prune_threshold")]
    pub weight_prune_threshold: f64,
}

fn default_level() -> usize {
    2
}

fn default_resolution() -> usize {
    DEFAULT_RESOLUTION
}

fn default_merge_tolerance() -> f64 {
    1e-8
}

fn default_weight_prune_threshold() -> f64 {
    1e-13
}

impl Default for SparseGridConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            growth_rule: GrowthRule::default(),
            discretization_resolution: default_resolution(),
            merge_tolerance: default_merge_tolerance(),
            weight_prune_threshold: default_weight_prune_threshold(),
        }
    }
}

impl SparseGridConfig {
    pub fn new(level: usize, growth_rule: GrowthRule) -> Self {
        Self {
            level,
            growth_rule,
            ..Self::default()
        }
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.discretization_resolution = resolution;
        self
    }

    pub fn with_merge_tolerance(mut self, tolerance: f64) -> Self {
        self.merge_tolerance = tolerance;
        self
    }

    pub fn with_prune_threshold(mut self, threshold: f64) -> Self {
        self.weight_prune_threshold = threshold;
        self
    }

    /// Checks every field against its admissible range.
    ///
    /// # Errors
    /// [`QuadratureError::InvalidConfiguration`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.discretization_resolution < 2 {
            return Err(QuadratureError::InvalidConfiguration {
                parameter: "discretization_resolution",
                message: format!("must be at least 2, got {}", self.discretization_resolution),
            });
        }
        if !(self.merge_tolerance.is_finite() && self.merge_tolerance > 0.0) {
            return Err(QuadratureError::InvalidConfiguration {
                parameter: "merge_tolerance",
                message: format!("must be positive and finite, got {}", self.merge_tolerance),
            });
        }
        if !(0.0..1.0).contains(&self.weight_prune_threshold) {
            return Err(QuadratureError::InvalidConfiguration {
                parameter: "weight_prune_threshold",
                message: format!("must lie in [0, 1), got {}", self.weight_prune_threshold),
            });
        }
        Ok(())
    }
}
