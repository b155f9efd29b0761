//! Summation and moment accumulation with numerical stability guarantees.
//!
//! # Algorithms
//!
//! - **Summation**: Neumaier compensated summation, used for every
//!   weight total and inner product in the recurrence engine.
//! - **Moments**: Welford's online algorithm extended to third and fourth
//!   central moments, used to describe empirical samples.
//!   Reference: Welford (1962), "Note on a Method for Calculating
//!   Corrected Sums of Squares and Products", *Technometrics* 4(3).

// ---------------------------------------------------------------------------
// Compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// This is an improved variant of Kahan summation that also handles the
/// case where the addend is larger in magnitude than the running sum.
/// The result depends only on the order of `values`, never on
/// scheduling, so it is safe to use in deterministic reductions.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *Zeitschrift für Angewandte
/// Mathematik und Mechanik* 54(1), pp. 39–51.
///
/// # Examples
/// ```
/// use u_cubature::stats::kahan_sum;
/// let total = kahan_sum([1.0, 1e100, 1.0, -1e100]);
/// assert_eq!(total, 2.0);
/// ```
pub fn kahan_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut acc = NeumaierSum::new();
    for x in values {
        acc.add(x);
    }
    acc.total()
}

/// Running Neumaier sum.
///
/// Used where contributions arrive one at a time, e.g. when merging
/// coincident quadrature points.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NeumaierSum {
    sum: f64,
    c: f64,
}

impl NeumaierSum {
    pub fn new() -> Self {
        Self { sum: 0.0, c: 0.0 }
    }

    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.c += (self.sum - t) + x;
        } else {
            self.c += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.c
    }
}

// ---------------------------------------------------------------------------
// Welford online accumulator
// ---------------------------------------------------------------------------

/// Streaming accumulator for mean, variance, skewness, and kurtosis.
///
/// Maintains central moment sums M₂, M₃, M₄ incrementally. The update
/// order (M₄ → M₃ → M₂) preserves correctness since each uses the
/// *previous* values of lower moments.
///
/// References:
/// - Welford (1962), *Technometrics* 4(3), pp. 419–420.
/// - Pébay (2008), "Formulas for Robust, One-Pass Parallel Computation
///   of Covariances and Arbitrary-Order Statistical Moments",
///   Sandia Report SAND2008-6212.
///
/// # Examples
/// ```
/// use u_cubature::stats::WelfordAccumulator;
/// let mut acc = WelfordAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x);
/// }
/// assert!((acc.mean().unwrap() - 5.0).abs() < 1e-15);
/// assert!((acc.population_variance().unwrap() - 4.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct WelfordAccumulator {
    count: u64,
    mean_acc: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl WelfordAccumulator {
    /// Creates a new empty accumulator.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean_acc: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
        }
    }

    /// Feeds a new sample into the accumulator.
    ///
    /// The first sample only initializes the mean, which avoids
    /// intermediate overflow when `delta²` would exceed `f64::MAX`.
    pub fn update(&mut self, value: f64) {
        let n1 = self.count;
        self.count += 1;

        if n1 == 0 {
            self.mean_acc = value;
            return;
        }

        let n = self.count as f64;
        let delta = value - self.mean_acc;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1 as f64;

        // Update M₄, then M₃, then M₂; each reads the previous lower moments.
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.mean_acc += delta_n;
    }

    /// Returns the number of samples seen so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the running mean, or `None` if no samples have been added.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean_acc)
        }
    }

    /// Sample variance (n − 1 denominator), `None` below 2 samples.
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Population variance (n denominator), `None` when empty.
    pub fn population_variance(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.m2 / self.count as f64)
        }
    }

    pub fn sample_std_dev(&self) -> Option<f64> {
        self.sample_variance().map(f64::sqrt)
    }

    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }

    /// Biased sample skewness g₁ = √n · M₃ / M₂^(3/2).
    ///
    /// This is the moment estimator without small-sample correction
    /// (`scipy.stats.skew` with `bias=True`). Returns `None` if fewer
    /// than 2 samples have been added or the variance is zero.
    pub fn skewness(&self) -> Option<f64> {
        if self.count < 2 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        Some(n.sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Biased excess kurtosis g₂ = n · M₄ / M₂² − 3.
    ///
    /// Returns 0 for a normal distribution, positive for heavy tails.
    /// Returns `None` if fewer than 2 samples have been added or the
    /// variance is zero.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.count < 2 || self.m2 == 0.0 {
            return None;
        }
        let n = self.count as f64;
        Some(n * self.m4 / (self.m2 * self.m2) - 3.0)
    }
}

impl Default for WelfordAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
