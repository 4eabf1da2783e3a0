//! # Core Module
//!
//! Fundamental building blocks shared by every proposal: molecular topology, force field
//! parameters, coordinate geometry and file formats.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, elements, bonds, systems and topology proposals
//! - **Energy Terms** ([`forcefield`]) - Valence and nonbonded parameters and their potentials
//! - **Coordinates** ([`utils`]) - Internal/Cartesian transforms and torsion scans
//! - **File I/O** ([`io`]) - TOML system and proposal files, PDB and CSV output

pub mod forcefield;
pub mod io;
pub mod models;
pub mod utils;
