//! # perses Core Library
//!
//! Geometry proposals for reversible-jump Monte Carlo moves in expanded ensemble
//! simulations of chemical and mutational space.
//!
//! When a simulation jumps between two chemical states (a ligand transformation or a
//! point mutation), atoms that exist only in the destination state need positions, and
//! the acceptance criterion needs the exact log-probability of having proposed them.
//! This library grows those atoms one at a time in internal coordinates, drawing bond
//! lengths and angles from their harmonic distributions and torsions from a discretized
//! Boltzmann distribution of the valence (and optionally steric) energy.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MolecularSystem`, `TopologyProposal`),
//!   force field parameters and potentials, coordinate transforms, and file I/O.
//!
//! - **[`engine`]: The Logic Core.** Proposal ordering, the growth energy system, torsion
//!   distributions and the `FFAllAngleGeometryEngine` that ties them into forward proposals
//!   and reverse log-probability evaluations.
//!
//! - **[`workflows`]: The Public API.** A complete propose-and-evaluate round trip, suitable
//!   for computing the geometry contribution to an RJMC acceptance probability.

pub mod core;
pub mod engine;
pub mod workflows;
