//! Three-term recurrence coefficients by the discretized Stieltjes procedure.
//!
//! The monic orthogonal polynomials of a measure μ satisfy
//!
//! ```text
//! π₋₁(x) = 0,  π₀(x) = 1
//! πₖ₊₁(x) = (x − αₖ) πₖ(x) − βₖ πₖ₋₁(x)
//! ```
//!
//! with `αₖ = ⟨x πₖ, πₖ⟩ / ⟨πₖ, πₖ⟩`, `βₖ = ⟨πₖ, πₖ⟩ / ⟨πₖ₋₁, πₖ₋₁⟩` and
//! `β₀ = ⟨1, 1⟩` (the total mass). When μ is only known through samples or a
//! density, the inner products are replaced by sums over a discrete measure
//! `{(xᵢ, wᵢ)}` and the polynomials are evaluated at the abscissas directly.
//!
//! Reference: Gautschi (2004), *Orthogonal Polynomials: Computation and
//! Approximation*, §2.2.3.

use rayon::prelude::*;
use tracing::trace;

use crate::error::{QuadratureError, Result};
use crate::stats::kahan_sum;

/// Default number of midpoint cells used to discretize a density.
pub const DEFAULT_RESOLUTION: usize = 8000;

/// A discrete measure: abscissas with non-negative weights.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretizedDensity {
    abscissas: Vec<f64>,
    weights: Vec<f64>,
    kind: &'static str,
}

impl DiscretizedDensity {
    /// Builds a discrete measure from parallel abscissa and weight vectors.
    ///
    /// # Errors
    /// [`QuadratureError::DegenerateRecurrence`] if the lengths differ, the
    /// measure is empty, or any value is non-finite or a weight is negative.
    pub fn new(abscissas: Vec<f64>, weights: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| QuadratureError::DegenerateRecurrence {
            dimension: None,
            order: 0,
            kind: "discretized",
            reason,
        };
        if abscissas.len() != weights.len() {
            return Err(invalid(format!(
                "{} abscissas but {} weights",
                abscissas.len(),
                weights.len()
            )));
        }
        if abscissas.is_empty() {
            return Err(invalid("empty measure".into()));
        }
        if let Some(x) = abscissas.iter().find(|x| !x.is_finite()) {
            return Err(invalid(format!("non-finite abscissa {x}")));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(invalid(format!("weight {w} is negative or non-finite")));
        }
        Ok(Self {
            abscissas,
            weights,
            kind: "discretized",
        })
    }

    /// Samples `pdf` at the midpoints of `resolution` equal cells on
    /// `[lower, upper]`, weighting each by its cell width.
    ///
    /// Midpoints keep the quadrature error of every inner product at
    /// O(h²) and never evaluate the density on a support edge.
    ///
    /// # Errors
    /// [`QuadratureError::InvalidConfiguration`] for a zero resolution or a
    /// non-finite or empty interval; see [`DiscretizedDensity::new`] for
    /// invalid density values.
    pub fn from_pdf<F>(pdf: F, lower: f64, upper: f64, resolution: usize) -> Result<Self>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        if resolution == 0 {
            return Err(QuadratureError::InvalidConfiguration {
                parameter: "discretization_resolution",
                message: "must be at least 1".into(),
            });
        }
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(QuadratureError::InvalidConfiguration {
                parameter: "bounds",
                message: format!("need finite lower < upper, got [{lower}, {upper}]"),
            });
        }
        let h = (upper - lower) / resolution as f64;
        let abscissas: Vec<f64> = (0..resolution)
            .map(|i| lower + (i as f64 + 0.5) * h)
            .collect();
        let weights: Vec<f64> = abscissas.par_iter().map(|&x| pdf(x) * h).collect();
        Self::new(abscissas, weights)
    }

    /// Treats each sample as an atom of mass `1/n`.
    pub fn from_samples(samples: &[f64]) -> Result<Self> {
        let n = samples.len().max(1) as f64;
        Self::new(samples.to_vec(), vec![1.0 / n; samples.len()]).map(|d| d.with_kind("sampled"))
    }

    /// Tags the measure with the distribution kind reported in errors.
    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    pub fn abscissas(&self) -> &[f64] {
        &self.abscissas
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.abscissas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abscissas.is_empty()
    }
}

/// Recurrence coefficients `α₀..=αₙ`, `β₀..=βₙ` of a measure.
///
/// `β₀` is the total mass; every `βₖ` is non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceTable {
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl RecurrenceTable {
    /// # Errors
    /// [`QuadratureError::DegenerateRecurrence`] unless both vectors are
    /// non-empty, of equal length and finite with `βₖ ≥ 0`.
    pub fn new(alpha: Vec<f64>, beta: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| QuadratureError::DegenerateRecurrence {
            dimension: None,
            order: alpha.len().saturating_sub(1),
            kind: "tabulated",
            reason,
        };
        if alpha.is_empty() || alpha.len() != beta.len() {
            return Err(invalid(format!(
                "need equal non-empty lengths, got {} alphas and {} betas",
                alpha.len(),
                beta.len()
            )));
        }
        if alpha.iter().any(|a| !a.is_finite()) {
            return Err(invalid("non-finite alpha".into()));
        }
        if beta.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return Err(invalid("beta must be finite and non-negative".into()));
        }
        Ok(Self { alpha, beta })
    }

    /// Highest order `n` covered by the table.
    pub fn order(&self) -> usize {
        self.alpha.len() - 1
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// Total mass of the measure (`β₀`).
    pub fn total_mass(&self) -> f64 {
        self.beta[0]
    }

    /// Leading sub-table up to `order`, or `None` if it is not covered.
    ///
    /// Coefficients of order `k` do not depend on the requested maximum,
    /// so a table computed once at the highest order serves every lower one.
    pub fn truncated(&self, order: usize) -> Option<Self> {
        if order > self.order() {
            return None;
        }
        Some(Self {
            alpha: self.alpha[..=order].to_vec(),
            beta: self.beta[..=order].to_vec(),
        })
    }
}

/// Runs the Stieltjes procedure on `density` up to `order`.
///
/// Weights are normalized to unit mass and zero-weight abscissas dropped
/// before iterating. All inner products use compensated summation, so the
/// result is bit-for-bit reproducible for identical input.
///
/// # Errors
/// [`QuadratureError::DegenerateRecurrence`] when the total mass is zero,
/// when the support has no more than `k` points at order `k`, or when
/// `⟨πₖ, πₖ⟩` underflows.
///
/// # Examples
/// ```
/// use u_cubature::recurrence::{compute_recurrence, DiscretizedDensity};
/// let density = DiscretizedDensity::from_pdf(|_| 0.5, -1.0, 1.0, 8000).unwrap();
/// let table = compute_recurrence(&density, 2).unwrap();
/// assert!((table.beta()[1] - 1.0 / 3.0).abs() < 1e-6);
/// ```
pub fn compute_recurrence(density: &DiscretizedDensity, order: usize) -> Result<RecurrenceTable> {
    let kind = density.kind;
    let degenerate = |k: usize, reason: String| QuadratureError::DegenerateRecurrence {
        dimension: None,
        order: k,
        kind,
        reason,
    };

    let total = kahan_sum(density.weights.iter().copied());
    if !(total > 0.0 && total.is_finite()) {
        return Err(degenerate(0, format!("total mass {total} is not positive")));
    }

    let (x, w): (Vec<f64>, Vec<f64>) = density
        .abscissas
        .iter()
        .zip(&density.weights)
        .filter(|&(_, &w)| w != 0.0)
        .map(|(&x, &w)| (x, w / total))
        .unzip();
    let n = x.len();

    let mut alpha = Vec::with_capacity(order + 1);
    let mut beta = Vec::with_capacity(order + 1);
    let mass = kahan_sum(w.iter().copied());
    alpha.push(kahan_sum(x.iter().zip(&w).map(|(&xi, &wi)| xi * wi)) / mass);
    beta.push(mass);

    // πₖ₋₁ and πₖ evaluated at every abscissa
    let mut p_prev = vec![0.0; n];
    let mut p_curr = vec![1.0; n];
    let mut norm_prev = mass;

    for k in 1..=order {
        if n <= k {
            return Err(degenerate(
                k,
                format!("support has {n} points, order {k} needs more than {k}"),
            ));
        }
        let (a, b) = (alpha[k - 1], beta[k - 1]);
        let p_next: Vec<f64> = x
            .iter()
            .zip(&p_curr)
            .zip(&p_prev)
            .map(|((&xi, &pc), &pp)| (xi - a) * pc - b * pp)
            .collect();

        let norm = kahan_sum(w.iter().zip(&p_next).map(|(&wi, &pi)| wi * pi * pi));
        if !norm.is_finite() || norm <= f64::MIN_POSITIVE {
            return Err(degenerate(k, format!("squared norm {norm} underflowed")));
        }
        let moment = kahan_sum(
            x.iter()
                .zip(&w)
                .zip(&p_next)
                .map(|((&xi, &wi), &pi)| xi * wi * pi * pi),
        );

        alpha.push(moment / norm);
        beta.push(norm / norm_prev);
        norm_prev = norm;
        p_prev = std::mem::replace(&mut p_curr, p_next);
    }

    trace!(kind, order, support = n, "computed recurrence table");
    RecurrenceTable::new(alpha, beta).map_err(|_| {
        degenerate(order, "recurrence coefficients are not finite".into())
    })
}
