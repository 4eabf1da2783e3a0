//! Provides input/output functionality for the files a geometry proposal consumes and produces.
//!
//! Systems (topology, force field terms and optional coordinates) are stored as TOML
//! documents, proposals reference two system files plus an atom map, and structures are
//! exported as PDB for visual inspection. Recorded torsion PMFs are exported as CSV.

pub mod pdb;
pub mod pmf;
pub mod proposal_file;
pub mod system_file;
pub mod traits;
