use crate::core::forcefield::params::{
    ConstraintParam, ForcefieldParams, HarmonicAngleParam, HarmonicBondParam, NonbondedParams,
    ParamError, PeriodicTorsionParam,
};
use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Everything a system file carries besides the topology itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemData {
    pub forcefield: ForcefieldParams,
    /// Coordinates in nm, one per atom, if the file provides them.
    pub positions: Option<Vec<Point3<f64>>>,
}

#[derive(Debug, Error)]
pub enum SystemFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Atom {atom} has unknown element '{symbol}'")]
    UnknownElement { atom: usize, symbol: String },
    #[error("Bond between atoms {} and {} is invalid", atoms[0], atoms[1])]
    InvalidBond { atoms: [usize; 2] },
    #[error("Expected {expected} positions (one per atom), found {found}")]
    PositionCount { expected: usize, found: usize },
    #[error("Invalid force field: {0}")]
    Forcefield(#[from] ParamError),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AtomRecord {
    name: String,
    element: String,
    #[serde(default = "default_residue_name")]
    residue_name: String,
    #[serde(default = "default_residue_number")]
    residue_number: isize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mass: Option<f64>,
}

fn default_residue_name() -> String {
    "MOL".to_string()
}

fn default_residue_number() -> isize {
    1
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SystemDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    bonds: Vec<[usize; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    positions: Option<Vec<[f64; 3]>>,
    atoms: Vec<AtomRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    harmonic_bonds: Vec<HarmonicBondParam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    harmonic_angles: Vec<HarmonicAngleParam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    periodic_torsions: Vec<PeriodicTorsionParam>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<ConstraintParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonbonded: Option<NonbondedParams>,
}

impl SystemDocument {
    fn into_system(self) -> Result<(MolecularSystem, SystemData), SystemFileError> {
        let mut system = MolecularSystem::new();
        for (index, record) in self.atoms.into_iter().enumerate() {
            let element: Element =
                record
                    .element
                    .parse()
                    .map_err(|_| SystemFileError::UnknownElement {
                        atom: index,
                        symbol: record.element.clone(),
                    })?;
            let mut atom = Atom::new(
                &record.name,
                element,
                &record.residue_name,
                record.residue_number,
            );
            if let Some(mass) = record.mass {
                atom = atom.with_mass(mass);
            }
            system.add_atom(atom);
        }

        let topology_bonds = self
            .bonds
            .iter()
            .copied()
            .chain(self.harmonic_bonds.iter().map(|b| b.atoms))
            .chain(self.constraints.iter().map(|c| c.atoms));
        for atoms in topology_bonds {
            system
                .add_bond(atoms[0], atoms[1], BondOrder::Single)
                .ok_or(SystemFileError::InvalidBond { atoms })?;
        }

        let forcefield = ForcefieldParams {
            harmonic_bonds: self.harmonic_bonds,
            harmonic_angles: self.harmonic_angles,
            periodic_torsions: self.periodic_torsions,
            constraints: self.constraints,
            nonbonded: self.nonbonded,
        };
        forcefield.validate(system.atom_count())?;

        let positions = match self.positions {
            Some(raw) if raw.len() != system.atom_count() => {
                return Err(SystemFileError::PositionCount {
                    expected: system.atom_count(),
                    found: raw.len(),
                });
            }
            Some(raw) => Some(raw.into_iter().map(Point3::from).collect()),
            None => None,
        };

        Ok((
            system,
            SystemData {
                forcefield,
                positions,
            },
        ))
    }
}

/// TOML system description: atoms, topology, force field terms and optional coordinates.
///
/// Topology bonds are the union of the explicit `bonds` list, the harmonic bonds and
/// the constraints.
pub struct SystemFile;

impl MolecularFile for SystemFile {
    type Metadata = SystemData;
    type Error = SystemFileError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let document: SystemDocument = toml::from_str(&content)?;
        document.into_system()
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        if let Some(positions) = &metadata.positions
            && positions.len() != system.atom_count()
        {
            return Err(SystemFileError::PositionCount {
                expected: system.atom_count(),
                found: positions.len(),
            });
        }

        let forcefield = &metadata.forcefield;
        let document = SystemDocument {
            bonds: system
                .bonds()
                .iter()
                .map(|bond| [bond.atom1, bond.atom2])
                .collect(),
            positions: metadata
                .positions
                .as_ref()
                .map(|positions| positions.iter().map(|p| [p.x, p.y, p.z]).collect()),
            atoms: system
                .atoms_iter()
                .map(|(_, atom)| AtomRecord {
                    name: atom.name.clone(),
                    element: atom.element.symbol().to_string(),
                    residue_name: atom.residue_name.clone(),
                    residue_number: atom.residue_number,
                    mass: (atom.mass != atom.element.mass()).then_some(atom.mass),
                })
                .collect(),
            harmonic_bonds: forcefield.harmonic_bonds.clone(),
            harmonic_angles: forcefield.harmonic_angles.clone(),
            periodic_torsions: forcefield.periodic_torsions.clone(),
            constraints: forcefield.constraints.clone(),
            nonbonded: forcefield.nonbonded.clone(),
        };

        let content = toml::to_string(&document)?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }
}
