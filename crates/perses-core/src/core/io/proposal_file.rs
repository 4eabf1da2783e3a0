use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::system_file::{SystemFile, SystemFileError};
use crate::core::io::traits::MolecularFile;
use crate::core::models::proposal::{ProposalError, TopologyProposal};
use nalgebra::Point3;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposalFileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load system file '{path}': {source}")]
    System {
        path: String,
        source: SystemFileError,
    },
    #[error("Failed to load PDB file '{path}': {source}")]
    Pdb { path: String, source: PdbError },
    #[error("New atom {new} appears more than once in the atom map")]
    DuplicateMapEntry { new: usize },
    #[error("Invalid topology proposal: {0}")]
    Proposal(#[from] ProposalError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ProposalDocument {
    old_system: PathBuf,
    new_system: PathBuf,
    #[serde(default)]
    atom_map: Vec<[usize; 2]>,
    #[serde(default)]
    old_positions: Option<PathBuf>,
}

/// A topology proposal together with the coordinates of the old system, if known.
#[derive(Debug, Clone)]
pub struct LoadedProposal {
    pub proposal: TopologyProposal,
    /// Old-system coordinates in nm, taken from `old-positions` if given,
    /// otherwise from the old system file.
    pub old_positions: Option<Vec<Point3<f64>>>,
}

/// Loads a proposal file.
///
/// ```toml
/// old-system = "propanol.toml"
/// new-system = "butane.toml"
/// old-positions = "propanol.pdb"   # optional
/// atom-map = [[0, 0], [1, 1]]       # [new, old] pairs
/// ```
///
/// Relative paths are resolved against the directory containing the proposal file.
pub fn load(path: &Path) -> Result<LoadedProposal, ProposalFileError> {
    let display = |p: &Path| p.to_string_lossy().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| ProposalFileError::Io {
        path: display(path),
        source: e,
    })?;
    let document: ProposalDocument =
        toml::from_str(&content).map_err(|e| ProposalFileError::Toml {
            path: display(path),
            source: e,
        })?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let resolve = |p: &Path| -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base.join(p)
        }
    };

    let old_path = resolve(&document.old_system);
    let (old_system, old_data) =
        SystemFile::read_from_path(&old_path).map_err(|e| ProposalFileError::System {
            path: display(&old_path),
            source: e,
        })?;
    let new_path = resolve(&document.new_system);
    let (new_system, new_data) =
        SystemFile::read_from_path(&new_path).map_err(|e| ProposalFileError::System {
            path: display(&new_path),
            source: e,
        })?;

    let old_positions = match &document.old_positions {
        Some(pdb) => {
            let pdb_path = resolve(pdb);
            let (_, metadata) =
                PdbFile::read_from_path(&pdb_path).map_err(|e| ProposalFileError::Pdb {
                    path: display(&pdb_path),
                    source: e,
                })?;
            Some(metadata.positions)
        }
        None => old_data.positions,
    };

    let mut new_to_old = BTreeMap::new();
    for [new, old] in document.atom_map {
        if new_to_old.insert(new, old).is_some() {
            return Err(ProposalFileError::DuplicateMapEntry { new });
        }
    }

    let proposal = TopologyProposal::new(
        old_system,
        old_data.forcefield,
        new_system,
        new_data.forcefield,
        new_to_old,
    )?;

    Ok(LoadedProposal {
        proposal,
        old_positions,
    })
}
