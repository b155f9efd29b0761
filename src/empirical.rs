//! Sample-based distributions.
//!
//! An [`EmpiricalDistribution`] smooths its samples with a Gaussian kernel
//! density estimate and is treated like any bounded distribution: its
//! recurrence comes from discretizing the KDE on a finite window around
//! the sample mean.

use std::sync::OnceLock;

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::distributions::{Distribution, DistributionError, Moments};
use crate::special::{standard_normal_cdf, standard_normal_pdf};
use crate::stats::WelfordAccumulator;

/// Half-width of the support window, in units of √σ around the mean.
const BOUNDS_SPREAD: f64 = 5.0;

/// Gaussian kernel density estimate with Scott's bandwidth.
///
/// `h = s · n^(−1/5)` with `s` the sample standard deviation (n − 1).
///
/// Reference: Scott (1992), *Multivariate Density Estimation*, §6.3.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKde {
    data: Vec<f64>,
    bandwidth: f64,
}

impl GaussianKde {
    /// # Errors
    /// Returns `Err` for fewer than two samples, non-finite samples, or
    /// samples without spread.
    pub fn new(data: Vec<f64>) -> Result<Self, DistributionError> {
        if data.len() < 2 {
            return Err(DistributionError::InvalidParameters(format!(
                "KDE needs at least 2 samples, got {}",
                data.len()
            )));
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(DistributionError::InvalidParameters(
                "KDE samples must be finite".into(),
            ));
        }
        let mut acc = WelfordAccumulator::new();
        for &x in &data {
            acc.update(x);
        }
        let std_dev = acc.sample_std_dev().unwrap_or(0.0);
        if std_dev <= 0.0 {
            return Err(DistributionError::InvalidParameters(
                "KDE samples have zero variance".into(),
            ));
        }
        let bandwidth = std_dev * (data.len() as f64).powf(-0.2);
        Ok(Self { data, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// `(1/n) Σ φ((x − xᵢ)/h) / h`
    pub fn pdf(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let sum: f64 = self
            .data
            .iter()
            .map(|&xi| standard_normal_pdf((x - xi) / h))
            .sum();
        sum / (self.data.len() as f64 * h)
    }

    /// `(1/n) Σ Φ((x − xᵢ)/h)`
    pub fn cdf(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let sum: f64 = self
            .data
            .iter()
            .map(|&xi| standard_normal_cdf((x - xi) / h))
            .sum();
        sum / self.data.len() as f64
    }

    /// Evaluates the density at many points in parallel, preserving order.
    pub fn evaluate(&self, points: &[f64]) -> Vec<f64> {
        points.par_iter().map(|&x| self.pdf(x)).collect()
    }
}

/// Distribution known only through samples.
#[derive(Debug)]
pub struct EmpiricalDistribution {
    kde: GaussianKde,
    sorted: Vec<f64>,
    moments: Moments,
    bounds: (f64, f64),
    cdf_table: OnceLock<Vec<f64>>,
}

impl EmpiricalDistribution {
    /// Fits a KDE to `samples`.
    ///
    /// The support window is `mean ± 5·√σ` with `σ` the population
    /// standard deviation.
    ///
    /// # Errors
    /// Same conditions as [`GaussianKde::new`].
    pub fn new(samples: Vec<f64>) -> Result<Self, DistributionError> {
        let kde = GaussianKde::new(samples)?;
        let mut acc = WelfordAccumulator::new();
        for &x in kde.data() {
            acc.update(x);
        }
        let mean = acc.mean().unwrap_or(0.0);
        let variance = acc.population_variance().unwrap_or(0.0);
        let moments = Moments {
            mean,
            variance,
            skewness: acc.skewness().unwrap_or(f64::NAN),
            kurtosis: acc.kurtosis().unwrap_or(f64::NAN),
        };
        let half_width = BOUNDS_SPREAD * variance.sqrt().sqrt();
        let mut sorted = kde.data().to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(Self {
            kde,
            sorted,
            moments,
            bounds: (mean - half_width, mean + half_width),
            cdf_table: OnceLock::new(),
        })
    }

    pub fn kde(&self) -> &GaussianKde {
        &self.kde
    }

    /// Normalized CDF over the sorted samples, by trapezoidal integration
    /// of the KDE. Built on first use.
    fn cdf_table(&self) -> &[f64] {
        self.cdf_table.get_or_init(|| {
            let density = self.kde.evaluate(&self.sorted);
            let mut table = Vec::with_capacity(self.sorted.len());
            let mut acc = 0.0;
            table.push(acc);
            for i in 1..self.sorted.len() {
                acc += 0.5 * (density[i] + density[i - 1]) * (self.sorted[i] - self.sorted[i - 1]);
                table.push(acc);
            }
            if acc > 0.0 {
                for c in &mut table {
                    *c /= acc;
                }
            }
            table
        })
    }
}

impl Distribution for EmpiricalDistribution {
    fn name(&self) -> &'static str {
        "empirical"
    }

    fn bounds(&self) -> (f64, f64) {
        self.bounds
    }

    fn moments(&self) -> Moments {
        self.moments
    }

    fn pdf(&self, x: f64) -> f64 {
        self.kde.pdf(x)
    }

    /// Closed-form KDE CDF, `(1/n) Σ Φ((x − xᵢ)/h)`.
    ///
    /// [`quantile`](Distribution::quantile) does not invert this function
    /// exactly; see there.
    fn cdf(&self, x: f64) -> f64 {
        self.kde.cdf(x)
    }

    /// Interpolates the tabulated CDF between the bracketing samples.
    ///
    /// The table integrates the KDE by trapezoids over the sorted samples
    /// and is renormalized to reach 1 at the largest sample. It therefore
    /// ignores the kernel mass outside the sample range, so
    /// `cdf(quantile(p))` only approximates `p`, with the largest gaps in
    /// the tails. `p` beyond the last tabulated value maps onto the final
    /// bracket, so the result always lies within the sample range.
    fn quantile(&self, p: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&p) {
            return None;
        }
        let table = self.cdf_table();
        let xs = &self.sorted;
        let n = xs.len();
        let i = table
            .partition_point(|&c| c <= p)
            .saturating_sub(1)
            .min(n - 2);
        let (c0, c1) = (table[i], table[i + 1]);
        if c1 > c0 {
            let t = ((p - c0) / (c1 - c0)).clamp(0.0, 1.0);
            Some(xs[i] * (1.0 - t) + xs[i + 1] * t)
        } else {
            Some(xs[i])
        }
    }

    /// Smoothed bootstrap: a resampled datum plus kernel noise.
    fn sample(&self, n: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let data = self.kde.data();
        let h = self.kde.bandwidth();
        (0..n)
            .map(|_| {
                let idx = rng.random_range(0..data.len());
                data[idx] + h * rng.sample::<f64, _>(StandardNormal)
            })
            .collect()
    }

    fn pdf_many(&self, points: &[f64]) -> Vec<f64> {
        self.kde.evaluate(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;
    use crate::recurrence::DEFAULT_RESOLUTION;

    fn normal_samples(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = create_rng(seed);
        (0..n).map(|_| rng.sample(StandardNormal)).collect()
    }

    #[test]
    fn test_kde_rejects_bad_input() {
        assert!(GaussianKde::new(vec![1.0]).is_err());
        assert!(GaussianKde::new(vec![1.0, 1.0, 1.0]).is_err());
        assert!(GaussianKde::new(vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_scott_bandwidth() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let kde = GaussianKde::new(data).unwrap();
        let expected = 2.5_f64.sqrt() * 5.0_f64.powf(-0.2);
        assert!((kde.bandwidth() - expected).abs() < 1e-14);
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let kde = GaussianKde::new(normal_samples(500, 3)).unwrap();
        let h = 0.01;
        let grid: Vec<f64> = (0..2000).map(|i| -10.0 + (i as f64 + 0.5) * h).collect();
        let mass: f64 = kde.evaluate(&grid).iter().sum::<f64>() * h;
        assert!((mass - 1.0).abs() < 1e-6, "mass {mass}");
        assert!((kde.cdf(10.0) - 1.0).abs() < 1e-7);
    }

    #[test]
    fn test_parallel_evaluation_matches_serial() {
        let kde = GaussianKde::new(normal_samples(200, 9)).unwrap();
        let points: Vec<f64> = (0..100).map(|i| -3.0 + 0.06 * i as f64).collect();
        let serial: Vec<f64> = points.iter().map(|&x| kde.pdf(x)).collect();
        assert_eq!(kde.evaluate(&points), serial);
    }

    #[test]
    fn test_moments_and_bounds() {
        let samples = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let dist = EmpiricalDistribution::new(samples).unwrap();
        let m = dist.moments();
        assert!((m.mean - 5.0).abs() < 1e-14);
        assert!((m.variance - 4.0).abs() < 1e-12);
        // mean ± 5·√σ with σ = 2
        let half = 5.0 * 2.0_f64.sqrt();
        let (lo, hi) = dist.bounds();
        assert!((lo - (5.0 - half)).abs() < 1e-12);
        assert!((hi - (5.0 + half)).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_edges() {
        let dist = EmpiricalDistribution::new(normal_samples(300, 17)).unwrap();
        let xs = &dist.sorted;
        assert_eq!(dist.quantile(0.0), Some(xs[0]));
        assert_eq!(dist.quantile(1.0), Some(xs[xs.len() - 1]));
        assert_eq!(dist.quantile(-0.01), None);
        assert_eq!(dist.quantile(1.01), None);
    }

    #[test]
    fn test_quantile_monotone_and_median() {
        let dist = EmpiricalDistribution::new(normal_samples(2000, 23)).unwrap();
        let qs: Vec<f64> = (1..100)
            .filter_map(|i| dist.quantile(i as f64 / 100.0))
            .collect();
        assert_eq!(qs.len(), 99);
        assert!(qs.windows(2).all(|w| w[0] <= w[1]));
        assert!(dist.quantile(0.5).unwrap().abs() < 0.15);
    }

    #[test]
    fn test_quantile_approximately_inverts_cdf() {
        let dist = EmpiricalDistribution::new(normal_samples(2000, 41)).unwrap();
        for i in 1..20 {
            let p = i as f64 / 20.0;
            let q = dist.quantile(p).unwrap();
            let roundtrip = dist.cdf(q);
            assert!((roundtrip - p).abs() < 0.02, "p {p}: cdf(quantile) = {roundtrip}");
        }
        // tails are clamped to the sample range instead of following the kernel
        let xs = &dist.sorted;
        assert_eq!(dist.quantile(1.0), Some(xs[xs.len() - 1]));
        assert!(dist.cdf(xs[xs.len() - 1]) < 1.0);
        assert!(dist.cdf(xs[0]) > 0.0);
    }

    #[test]
    fn test_duplicate_samples_do_not_break_quantile() {
        let dist = EmpiricalDistribution::new(vec![0.0, 1.0, 1.0, 1.0, 2.0]).unwrap();
        for i in 0..=20 {
            let q = dist.quantile(i as f64 / 20.0).unwrap();
            assert!((0.0..=2.0).contains(&q));
        }
    }

    #[test]
    fn test_smoothed_bootstrap() {
        let dist = EmpiricalDistribution::new(normal_samples(1000, 5)).unwrap();
        let mut rng = create_rng(77);
        let draws = dist.sample(5000, &mut rng);
        assert_eq!(draws.len(), 5000);
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - dist.moments().mean).abs() < 0.1);
    }

    #[test]
    fn test_hermite_recurrence_from_samples() {
        let dist = EmpiricalDistribution::new(normal_samples(4000, 2718)).unwrap();
        let table = dist.recurrence_table(3, DEFAULT_RESOLUTION).unwrap();
        assert!((table.beta()[0] - 1.0).abs() < 1e-12);
        for k in 0..=3 {
            assert!(table.alpha()[k].abs() < 0.2, "alpha[{k}] = {}", table.alpha()[k]);
        }
        for k in 1..=3 {
            let rel = (table.beta()[k] - k as f64).abs() / k as f64;
            assert!(rel < 0.15, "beta[{k}] = {}", table.beta()[k]);
        }
    }
}
