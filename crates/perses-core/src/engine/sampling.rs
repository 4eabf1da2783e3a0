use rand::distributions::{WeightedError, WeightedIndex};
use rand::prelude::*;
use rand_distr::Normal;
use std::f64::consts::TAU;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input distribution is empty, cannot perform sampling")]
    EmptyDistribution,
    #[error("Invalid Gaussian width {0}: must be positive and finite")]
    InvalidWidth(f64),
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: WeightedError,
    },
}

/// A normal distribution over a bond length or bond angle, derived from a harmonic term
/// `U = k/2 (x - x0)^2` at inverse temperature `beta`: mean `x0`, width `1/sqrt(beta k)`.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicGaussian {
    normal: Normal<f64>,
    mean: f64,
    sigma: f64,
}

impl HarmonicGaussian {
    pub fn from_harmonic(x0: f64, k: f64, beta: f64) -> Result<Self, SamplingError> {
        let sigma = 1.0 / (beta * k).sqrt();
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(SamplingError::InvalidWidth(sigma));
        }
        let normal = Normal::new(x0, sigma).map_err(|_| SamplingError::InvalidWidth(sigma))?;
        Ok(Self {
            normal,
            mean: x0,
            sigma,
        })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn sample(&self, rng: &mut (impl Rng + ?Sized)) -> f64 {
        self.normal.sample(rng)
    }

    /// Normalised log density, `-(x - x0)^2 / (2 sigma^2) - ln(sqrt(2 pi) sigma)`.
    pub fn log_density(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.sigma;
        -0.5 * z * z - (TAU.sqrt() * self.sigma).ln()
    }
}

/// `ln(sum(exp(values)))`, stable for large magnitudes; `-inf` if every value is `-inf`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|&v| (v - max).exp()).sum::<f64>().ln()
}

/// Draws an index with probability `exp(logp[i])`.
#[instrument(level = "trace", skip_all, fields(n = logp.len()))]
pub fn sample_log_probabilities(
    logp: &[f64],
    rng: &mut (impl Rng + ?Sized),
) -> Result<usize, SamplingError> {
    if logp.is_empty() {
        return Err(SamplingError::EmptyDistribution);
    }
    let weights: Vec<f64> = logp.iter().map(|&l| l.exp()).collect();
    let dist = WeightedIndex::new(&weights)?;
    Ok(dist.sample(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn harmonic_gaussian_width_follows_force_constant() {
        let gaussian = HarmonicGaussian::from_harmonic(0.15, 400.0, 1.0).unwrap();
        assert!((gaussian.sigma() - 0.05).abs() < TOLERANCE);
        assert_eq!(gaussian.mean(), 0.15);
    }

    #[test]
    fn harmonic_gaussian_rejects_non_positive_force_constants() {
        assert!(HarmonicGaussian::from_harmonic(0.15, 0.0, 1.0).is_err());
        assert!(HarmonicGaussian::from_harmonic(0.15, -5.0, 1.0).is_err());
    }

    #[test]
    fn log_density_matches_normal_pdf() {
        let gaussian = HarmonicGaussian::from_harmonic(1.0, 4.0, 1.0).unwrap();
        let sigma: f64 = 0.5;
        let x = 1.3;
        let expected = (-(x - 1.0f64).powi(2) / (2.0 * sigma * sigma)).exp()
            / (sigma * (2.0 * std::f64::consts::PI).sqrt());
        assert!((gaussian.log_density(x) - expected.ln()).abs() < TOLERANCE);
    }

    #[test]
    fn samples_concentrate_around_the_mean() {
        let gaussian = HarmonicGaussian::from_harmonic(0.1526, 259408.0, 0.4).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let n = 2000;
        let mean = (0..n).map(|_| gaussian.sample(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 0.1526).abs() < 5.0 * gaussian.sigma() / (n as f64).sqrt());
    }

    #[test]
    fn log_sum_exp_handles_large_and_infinite_values() {
        assert!((log_sum_exp(&[1000.0, 1000.0]) - (1000.0 + 2f64.ln())).abs() < TOLERANCE);
        assert!((log_sum_exp(&[0.0, f64::NEG_INFINITY]) - 0.0).abs() < TOLERANCE);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY; 3]), f64::NEG_INFINITY);
    }

    #[test]
    fn sample_log_probabilities_never_picks_impossible_entries() {
        let logp = [f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY];
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(sample_log_probabilities(&logp, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn sample_log_probabilities_rejects_empty_and_all_zero_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            sample_log_probabilities(&[], &mut rng),
            Err(SamplingError::EmptyDistribution)
        ));
        assert!(matches!(
            sample_log_probabilities(&[f64::NEG_INFINITY], &mut rng),
            Err(SamplingError::DistributionError { .. })
        ));
    }
}
