//! # Force Field Module
//!
//! Parameters and energy functions for the terms that shape a geometry proposal.
//!
//! ## Overview
//!
//! Proposals only need a small slice of a full molecular mechanics force field:
//!
//! - **Valence terms** - harmonic bonds, harmonic angles and periodic torsions, which both
//!   define the Gaussian bond/angle proposal distributions and the torsion energy profile
//! - **Constraints** - fixed bond lengths used in place of stiff harmonic bonds
//! - **Nonbonded terms** - Lennard-Jones sterics and Coulomb electrostatics, optionally used
//!   to steer torsion choices away from clashes
//!
//! Every quantity is expressed in md units (nm, kJ/mol, radians, elementary charge), and every
//! energy expression follows the OpenMM convention (`k/2 (x - x0)^2` for harmonic terms).
//!
//! ## Key Components
//!
//! - [`params`] - Parameter records and lookups for one system
//! - [`term`] - Energy decomposition into bond, angle, torsion, sterics and electrostatics

pub mod params;
pub(crate) mod potentials;
pub mod term;
