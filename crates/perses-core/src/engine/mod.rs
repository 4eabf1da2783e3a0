//! # Engine Module
//!
//! This module implements the geometry proposal engine: the machinery that places atoms
//! appearing in a topology change and scores how likely that placement was.
//!
//! ## Overview
//!
//! A reversible-jump move between two chemical states needs positions for every atom that
//! exists only in the destination state, and the acceptance criterion needs the exact
//! log-probability of those positions in both directions. The engine grows unique atoms
//! one at a time from already-positioned neighbours, sampling each atom's bond length,
//! bond angle and torsion, and accumulates the log-probability of every choice along the way.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Temperature, torsion resolution, sterics and debug output
//! - **Proposal Order** ([`order`]) - Which atom is grown when, and from which torsion
//! - **Growth System** ([`growth`]) - Stage-aware energy of a partially grown system
//! - **Torsion Distributions** ([`torsion`]) - Discretized Boltzmann distributions over torsions
//! - **Geometry Engines** ([`geometry_engine`]) - Forward proposals and reverse evaluations
//! - **Sampling** ([`sampling`]) - Gaussian bond/angle distributions and weighted draws
//! - **Progress Monitoring** ([`progress`]) - Phase reporting for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! ## Key Capabilities
//!
//! - **Exact proposal probabilities** including the Jacobian of the internal coordinate
//!   transform and the choice of growth torsion
//! - **Parallel torsion scans** over all bins when the `parallel` feature is enabled
//! - **Optional sterics** so that proposals avoid clashes with the environment
//! - **Stage-by-stage PDB trails** and PMF recording for inspecting individual proposals

pub mod config;
pub mod error;
pub mod geometry_engine;
pub mod growth;
pub mod order;
pub mod progress;
pub mod sampling;
pub mod torsion;
