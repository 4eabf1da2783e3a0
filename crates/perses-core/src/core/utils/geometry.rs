use nalgebra::{Point3, Vector3};
use std::f64::consts::{PI, TAU};

/// Orthonormal frame used to place an atom relative to its bond, angle and torsion partners.
///
/// `axis` points from the angle atom to the bond atom; `normal` is perpendicular to the
/// plane of the angle, bond and torsion atoms; `in_plane` completes the right-handed frame.
#[derive(Debug, Clone, Copy)]
struct PlacementFrame {
    origin: Point3<f64>,
    axis: Vector3<f64>,
    in_plane: Vector3<f64>,
    normal: Vector3<f64>,
}

impl PlacementFrame {
    fn new(bond: &Point3<f64>, angle: &Point3<f64>, torsion: &Point3<f64>) -> Self {
        let axis = (bond - angle).normalize();
        let normal = (angle - torsion).cross(&axis).normalize();
        let in_plane = normal.cross(&axis);
        Self {
            origin: *bond,
            axis,
            in_plane,
            normal,
        }
    }

    #[inline]
    fn place(&self, r: f64, theta: f64, phi: f64) -> Point3<f64> {
        let (sin_theta, cos_theta) = theta.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        self.origin
            + self.axis * (-r * cos_theta)
            + self.in_plane * (r * sin_theta * cos_phi)
            + self.normal * (r * sin_theta * sin_phi)
    }
}

/// Places an atom from internal coordinates.
///
/// The returned position `x` satisfies `|x - bond| = r`, `angle(x, bond, angle) = theta` and
/// `dihedral(x, bond, angle, torsion) = phi`.
///
/// # Return
///
/// The Cartesian position together with the absolute Jacobian determinant `|r^2 sin(theta)|`
/// of the spherical-to-Cartesian change of variables.
pub fn internal_to_cartesian(
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
    r: f64,
    theta: f64,
    phi: f64,
) -> (Point3<f64>, f64) {
    let frame = PlacementFrame::new(bond, angle, torsion);
    (frame.place(r, theta, phi), jacobian(r, theta))
}

/// Reads the internal coordinates `(r, theta, phi)` of `atom` relative to its partners.
///
/// # Return
///
/// The internal coordinates together with the absolute Jacobian determinant `|r^2 sin(theta)|`.
pub fn cartesian_to_internal(
    atom: &Point3<f64>,
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
) -> ((f64, f64, f64), f64) {
    let r = (atom - bond).norm();
    let theta = bond_angle(atom, bond, angle);
    let phi = dihedral(atom, bond, angle, torsion);
    ((r, theta, phi), jacobian(r, theta))
}

#[inline]
fn jacobian(r: f64, theta: f64) -> f64 {
    (r * r * theta.sin()).abs()
}

/// Angle `a - b - c` at vertex `b`, in `[0, pi]`.
pub fn bond_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let u = a - b;
    let v = c - b;
    u.cross(&v).norm().atan2(u.dot(&v))
}

/// Dihedral angle `p0 - p1 - p2 - p3` in `(-pi, pi]`, IUPAC sign convention.
pub fn dihedral(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>, p3: &Point3<f64>) -> f64 {
    let b1 = p1 - p0;
    let b2 = p2 - p1;
    let b3 = p3 - p2;
    let n2 = b2.cross(&b3);
    let y = b2.norm() * b1.dot(&n2);
    let x = b1.cross(&b2).dot(&n2);
    let phi = y.atan2(x);
    if phi <= -PI { phi + TAU } else { phi }
}

/// Positions of an atom for each torsion angle in `phis`, at fixed `r` and `theta`.
pub fn torsion_scan(
    bond: &Point3<f64>,
    angle: &Point3<f64>,
    torsion: &Point3<f64>,
    r: f64,
    theta: f64,
    phis: &[f64],
) -> Vec<Point3<f64>> {
    let frame = PlacementFrame::new(bond, angle, torsion);
    phis.iter().map(|&phi| frame.place(r, theta, phi)).collect()
}

/// `n` evenly spaced torsion bin centres `-pi + i * 2pi / n`.
pub fn torsion_grid(n: usize) -> Vec<f64> {
    let width = TAU / n as f64;
    (0..n).map(|i| -PI + i as f64 * width).collect()
}
