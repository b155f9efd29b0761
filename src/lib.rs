//! # u-cubature
//!
//! Gaussian quadrature and Smolyak sparse grids for polynomial chaos.
//!
//! This crate turns a list of independent univariate input distributions
//! into a multivariate quadrature rule: points and weights that integrate
//! polynomial expansions of a model exactly up to a target degree.
//!
//! ## Modules
//!
//! - [`distributions`] — Input distributions and their recurrence strategy
//! - [`empirical`] — Sample-based distributions via Gaussian KDE
//! - [`recurrence`] — Discretized Stieltjes procedure
//! - [`jacobi`] — Gauss rules from recurrence tables (Golub–Welsch)
//! - [`tensor`] — Full tensor-product grids
//! - [`sparse`] — Smolyak index sets
//! - [`assembler`] — Sparse grid assembly, merging and pruning
//! - [`rule`] — The multivariate rule type
//! - [`config`] — Assembler configuration
//! - [`stats`] — Compensated summation and streaming moments
//! - [`special`] — Normal PDF, CDF and quantile
//! - [`random`] — Seeded random number generation
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: compensated summation in every inner
//!   product, QL iteration on the Jacobi matrix
//! - **Deterministic output**: parallel stages collect in index order and
//!   merging is single-threaded
//! - **Property-based testing**: exactness and weight invariants verified
//!   via proptest
//!
//! ## Example
//!
//! ```
//! use u_cubature::assembler::assemble;
//! use u_cubature::config::{GrowthRule, SparseGridConfig};
//! use u_cubature::distributions::{Distribution, Normal, Uniform};
//!
//! let inputs: Vec<Box<dyn Distribution>> = vec![
//!     Box::new(Uniform::new(-1.0, 1.0).unwrap()),
//!     Box::new(Normal::new(0.0, 1.0).unwrap()),
//! ];
//! let rule = assemble(&inputs, &SparseGridConfig::new(2, GrowthRule::Linear)).unwrap();
//! // E[x² y²] = 1/3 · 1
//! let m = rule.integrate(|p| p[0] * p[0] * p[1] * p[1]);
//! assert!((m - 1.0 / 3.0).abs() < 1e-10);
//! ```

pub mod assembler;
pub mod config;
pub mod distributions;
pub mod empirical;
pub mod error;
pub mod jacobi;
pub mod random;
pub mod recurrence;
pub mod rule;
pub mod sparse;
pub mod special;
pub mod stats;
pub mod tensor;

pub use error::{QuadratureError, Result};
