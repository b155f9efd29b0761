//! Sparse grid assembly by the combination technique.
//!
//! # Pipeline
//!
//! 1. Enumerate the Smolyak indices for the configured level.
//! 2. Compute one recurrence table per dimension at the highest order any
//!    index needs, and cache the Gauss rules of every lower order.
//! 3. Build and scale each tensor grid in parallel. Results are collected
//!    in index order, so scheduling never affects the output.
//! 4. Concatenate, merge coincident points, and prune negligible weights
//!    on a single thread.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::SparseGridConfig;
use crate::distributions::Distribution;
use crate::error::Result;
use crate::rule::QuadratureRule;
use crate::sparse::{self, MultiIndex, SparseIndex};
use crate::tensor::UnivariateRules;

/// Tolerance for the post-assembly weight-sum check.
const NORMALIZATION_TOLERANCE: f64 = 1e-8;

/// Assembles the sparse grid quadrature rule for `distributions`.
///
/// The returned rule integrates polynomials of total degree up to
/// `2·level` exactly under the linear growth rule, and is normalized
/// when every input is a probability distribution.
///
/// # Errors
/// Any configuration, recurrence or eigensolver error, tagged with the
/// offending dimension where one applies.
///
/// # Examples
/// ```
/// use u_cubature::assembler::assemble;
/// use u_cubature::config::{GrowthRule, SparseGridConfig};
/// use u_cubature::distributions::{Distribution, Uniform};
/// let dists: Vec<Box<dyn Distribution>> = vec![
///     Box::new(Uniform::new(-1.0, 1.0).unwrap()),
///     Box::new(Uniform::new(-1.0, 1.0).unwrap()),
/// ];
/// let rule = assemble(&dists, &SparseGridConfig::new(1, GrowthRule::Linear)).unwrap();
/// assert_eq!(rule.len(), 5);
/// assert!(rule.is_normalized(1e-12));
/// ```
pub fn assemble(
    distributions: &[Box<dyn Distribution>],
    config: &SparseGridConfig,
) -> Result<QuadratureRule> {
    config.validate()?;
    let indices = sparse::generate(config.level, config.growth_rule, distributions.len())?;
    let rules = UnivariateRules::prepare(
        distributions,
        &max_orders(&indices, distributions.len()),
        config.discretization_resolution,
    )?;

    let raw = combine(&rules, &indices)?;
    let merged = raw.merge_duplicates(config.merge_tolerance);
    let rule = merged.prune(config.weight_prune_threshold);

    debug!(
        dimensions = distributions.len(),
        level = config.level,
        tensor_grids = indices.len(),
        raw_points = raw.len(),
        merged_points = merged.len(),
        points = rule.len(),
        total_weight = rule.total_weight(),
        "assembled sparse grid"
    );
    if !rule.is_normalized(NORMALIZATION_TOLERANCE) {
        warn!(
            total_weight = rule.total_weight(),
            "sparse grid weights do not sum to one"
        );
    }
    Ok(rule)
}

/// Signed concatenation of every tensor grid, before merging.
///
/// Grids are built in parallel and concatenated in index order.
pub fn combine(rules: &UnivariateRules, indices: &[SparseIndex]) -> Result<QuadratureRule> {
    let grids = indices
        .par_iter()
        .map(|index| {
            rules
                .tensor_grid(&index.multi_index)
                .map(|grid| grid.scaled(index.coefficient as f64))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(QuadratureRule::concat(grids))
}

/// Componentwise maximum order over `indices`.
fn max_orders(indices: &[SparseIndex], dimensions: usize) -> MultiIndex {
    indices
        .iter()
        .fold(MultiIndex::zeros(dimensions), |acc, index| {
            acc.componentwise_max(&index.multi_index)
        })
}
