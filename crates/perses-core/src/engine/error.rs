use thiserror::Error;

use super::config::ConfigError;
use super::order::OrderError;
use super::sampling::SamplingError;
use crate::core::io::pdb::PdbError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to determine proposal order: {0}")]
    Order(#[from] OrderError),

    #[error(
        "Atoms {atom} and {bond_atom} are bonded but have neither a harmonic bond nor a constraint"
    )]
    MissingBondLength { atom: usize, bond_atom: usize },

    #[error("Atoms {atom}-{bond_atom}-{angle_atom} do not share a harmonic angle term")]
    MissingAngle {
        atom: usize,
        bond_atom: usize,
        angle_atom: usize,
    },

    #[error("Non-positive force constant {k} in the {term} term used to place atom {atom}")]
    InvalidForceConstant {
        term: &'static str,
        atom: usize,
        k: f64,
    },

    #[error("All {n_divisions} torsion energies in the torsion PMF of atom {atom} are NaN")]
    AllTorsionEnergiesNaN { atom: usize, n_divisions: usize },

    #[error("Torsion PMF of atom {atom} cannot be normalised: log partition function is {log_z}")]
    DegenerateTorsionPmf { atom: usize, log_z: f64 },

    #[error("Expected {expected} {which} positions, found {found}")]
    PositionCount {
        which: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid inverse temperature {0}: beta must be positive and finite")]
    InvalidBeta(f64),

    #[error("Sampling failed: {source}")]
    Sampling {
        #[from]
        source: SamplingError,
    },

    #[error("Failed to write stage output '{path}': {source}")]
    StageOutput { path: String, source: PdbError },
}
