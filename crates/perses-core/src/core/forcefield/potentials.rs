/// Coulomb prefactor `1/(4 pi eps0)` in kJ nm/(mol e^2).
pub const ONE_4PI_EPS0: f64 = 138.935456;

#[inline]
pub fn harmonic(x: f64, x0: f64, k: f64) -> f64 {
    let delta = x - x0;
    0.5 * k * delta * delta
}

#[inline]
pub fn periodic_torsion(phi: f64, periodicity: u32, phase: f64, k: f64) -> f64 {
    k * (1.0 + (periodicity as f64 * phi - phase).cos())
}

/// `4 eps ((sigma/r)^12 - (sigma/r)^6)`; a vanishing well depth contributes nothing
/// even at zero distance.
#[inline]
pub fn lennard_jones(dist: f64, sigma: f64, epsilon: f64) -> f64 {
    if epsilon == 0.0 {
        return 0.0;
    }
    let x = (sigma / dist).powi(6);
    4.0 * epsilon * x * (x - 1.0)
}

#[inline]
pub fn coulomb(dist: f64, charge_product: f64) -> f64 {
    if charge_product == 0.0 {
        return 0.0;
    }
    ONE_4PI_EPS0 * charge_product / dist
}

/// Lorentz-Berthelot combination of two particles' sigma and epsilon.
#[inline]
pub fn combine_lorentz_berthelot(
    sigma1: f64,
    epsilon1: f64,
    sigma2: f64,
    epsilon2: f64,
) -> (f64, f64) {
    (0.5 * (sigma1 + sigma2), (epsilon1 * epsilon2).sqrt())
}
