use super::error::EngineError;
use super::growth::GrowthSystem;
use super::order::Torsion;
use super::sampling::{log_sum_exp, sample_log_probabilities};
use crate::core::utils::geometry::{torsion_grid, torsion_scan};
use nalgebra::Point3;
use rand::Rng;
use std::f64::consts::{PI, TAU};
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Everything needed to score the torsion of one atom at one growth stage.
#[derive(Debug, Clone, Copy)]
pub struct TorsionQuery<'a> {
    pub growth: &'a GrowthSystem,
    /// Current positions of the system being grown; only atoms present at `stage` are read.
    pub positions: &'a [Point3<f64>],
    pub torsion: Torsion,
    pub stage: usize,
    /// Bond length in nm.
    pub r: f64,
    /// Bond angle in radians.
    pub theta: f64,
    pub beta: f64,
}

/// A normalised discrete distribution over `n` torsion bins.
#[derive(Debug, Clone, PartialEq)]
pub struct TorsionPmf {
    phis: Vec<f64>,
    logp: Vec<f64>,
    candidates: Vec<Point3<f64>>,
}

impl TorsionPmf {
    /// Bin centres, `-pi + i * 2pi / n`.
    pub fn phis(&self) -> &[f64] {
        &self.phis
    }

    /// Log probability of each bin; sums to one in probability space.
    pub fn logp(&self) -> &[f64] {
        &self.logp
    }

    /// Position of the atom at each bin centre.
    pub fn candidates(&self) -> &[Point3<f64>] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.phis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phis.is_empty()
    }

    pub fn bin_width(&self) -> f64 {
        TAU / self.phis.len() as f64
    }

    /// Index of the bin whose centre is closest to `phi` on the circle.
    pub fn nearest_bin(&self, phi: f64) -> usize {
        let n = self.phis.len() as i64;
        let offset = ((phi + PI) / self.bin_width()).round() as i64;
        offset.rem_euclid(n) as usize
    }

    /// Log density of a continuous torsion within its bin, `logp[bin] - ln(2pi / n)`.
    pub fn log_density(&self, phi: f64) -> f64 {
        self.logp[self.nearest_bin(phi)] - self.bin_width().ln()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionSample {
    /// Proposed torsion in `(-pi, pi]`.
    pub phi: f64,
    pub logp: f64,
}

/// Discretizes the torsion of a growing atom and turns the Boltzmann weights of the
/// resulting positions into a piecewise-uniform proposal density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionScanner {
    n_divisions: usize,
}

impl TorsionScanner {
    pub fn new(n_divisions: usize) -> Self {
        Self { n_divisions }
    }

    pub fn n_divisions(&self) -> usize {
        self.n_divisions
    }

    /// Evaluates `logp_i = -beta U_i - ln Z` at every bin centre.
    ///
    /// Bins whose energy is NaN get zero probability. Energies are atom-local, which shifts
    /// every bin by the same amount and leaves the normalised distribution unchanged.
    #[instrument(level = "trace", skip_all, fields(atom = query.torsion.atom, stage = query.stage))]
    pub fn log_pmf(&self, query: &TorsionQuery<'_>) -> Result<TorsionPmf, EngineError> {
        let TorsionQuery {
            growth,
            positions,
            torsion,
            stage,
            r,
            theta,
            beta,
        } = *query;

        let phis = torsion_grid(self.n_divisions);
        let candidates = torsion_scan(
            &positions[torsion.bond_atom],
            &positions[torsion.angle_atom],
            &positions[torsion.torsion_atom],
            r,
            theta,
            &phis,
        );

        #[cfg(not(feature = "parallel"))]
        let iterator = candidates.iter();
        #[cfg(feature = "parallel")]
        let iterator = candidates.par_iter();

        let logq: Vec<f64> = iterator
            .map(|xyz| {
                -beta
                    * growth
                        .atom_energy_with_override(positions, stage, torsion.atom, xyz)
                        .total()
            })
            .collect();

        if logq.iter().all(|v| v.is_nan()) {
            return Err(EngineError::AllTorsionEnergiesNaN {
                atom: torsion.atom,
                n_divisions: self.n_divisions,
            });
        }
        let logq: Vec<f64> = logq
            .into_iter()
            .map(|v| if v.is_nan() { f64::NEG_INFINITY } else { v })
            .collect();
        let log_z = log_sum_exp(&logq);
        trace!(log_z, "Torsion partition function evaluated.");
        if !log_z.is_finite() {
            return Err(EngineError::DegenerateTorsionPmf {
                atom: torsion.atom,
                log_z,
            });
        }

        Ok(TorsionPmf {
            phis,
            logp: logq.into_iter().map(|v| v - log_z).collect(),
            candidates,
        })
    }

    /// Draws a torsion: a bin from the PMF, then a uniform offset within the bin.
    pub fn propose(
        &self,
        query: &TorsionQuery<'_>,
        rng: &mut (impl Rng + ?Sized),
    ) -> Result<(TorsionSample, TorsionPmf), EngineError> {
        let pmf = self.log_pmf(query)?;
        let bin = sample_log_probabilities(pmf.logp(), rng)?;
        let half_width = 0.5 * pmf.bin_width();
        let phi = wrap_angle(pmf.phis()[bin] + rng.gen_range(-half_width..half_width));
        let logp = pmf.logp()[bin] - pmf.bin_width().ln();
        Ok((TorsionSample { phi, logp }, pmf))
    }

    /// Log density of an existing torsion `phi` under the PMF of `query`.
    pub fn logp(
        &self,
        query: &TorsionQuery<'_>,
        phi: f64,
    ) -> Result<(f64, TorsionPmf), EngineError> {
        let pmf = self.log_pmf(query)?;
        Ok((pmf.log_density(phi), pmf))
    }
}

/// Maps an angle into `(-pi, pi]`.
fn wrap_angle(phi: f64) -> f64 {
    let wrapped = (phi + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
