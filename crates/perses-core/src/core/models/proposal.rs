use super::system::MolecularSystem;
use crate::core::forcefield::params::{ForcefieldParams, ParamError};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ProposalError {
    #[error("Atom map entry {new} -> {old} is out of range ({n_new} new atoms, {n_old} old atoms)")]
    MapOutOfRange {
        new: usize,
        old: usize,
        n_new: usize,
        n_old: usize,
    },
    #[error("Old atom {old} is mapped from both new atoms {first} and {second}")]
    NonInjectiveMap {
        old: usize,
        first: usize,
        second: usize,
    },
    #[error("Invalid {which} system force field: {source}")]
    Forcefield {
        which: &'static str,
        #[source]
        source: ParamError,
    },
}

/// A proposed change of chemical identity: the old and new systems with their force fields,
/// plus the atom map identifying which new atoms correspond to which old atoms.
///
/// The set of unique atoms on each side is derived once on construction and kept sorted.
#[derive(Debug, Clone)]
pub struct TopologyProposal {
    old_system: MolecularSystem,
    old_forcefield: ForcefieldParams,
    new_system: MolecularSystem,
    new_forcefield: ForcefieldParams,
    new_to_old: BTreeMap<usize, usize>,
    old_to_new: BTreeMap<usize, usize>,
    unique_new_atoms: Vec<usize>,
    unique_old_atoms: Vec<usize>,
}

impl TopologyProposal {
    pub fn new(
        old_system: MolecularSystem,
        old_forcefield: ForcefieldParams,
        new_system: MolecularSystem,
        new_forcefield: ForcefieldParams,
        new_to_old: BTreeMap<usize, usize>,
    ) -> Result<Self, ProposalError> {
        let n_new = new_system.atom_count();
        let n_old = old_system.atom_count();

        old_forcefield
            .validate(n_old)
            .map_err(|source| ProposalError::Forcefield {
                which: "old",
                source,
            })?;
        new_forcefield
            .validate(n_new)
            .map_err(|source| ProposalError::Forcefield {
                which: "new",
                source,
            })?;

        let mut old_to_new = BTreeMap::new();
        for (&new, &old) in &new_to_old {
            if new >= n_new || old >= n_old {
                return Err(ProposalError::MapOutOfRange {
                    new,
                    old,
                    n_new,
                    n_old,
                });
            }
            if let Some(&first) = old_to_new.get(&old) {
                return Err(ProposalError::NonInjectiveMap {
                    old,
                    first,
                    second: new,
                });
            }
            old_to_new.insert(old, new);
        }

        let unique_new_atoms = (0..n_new)
            .filter(|atom| !new_to_old.contains_key(atom))
            .collect();
        let unique_old_atoms = (0..n_old)
            .filter(|atom| !old_to_new.contains_key(atom))
            .collect();

        Ok(Self {
            old_system,
            old_forcefield,
            new_system,
            new_forcefield,
            new_to_old,
            old_to_new,
            unique_new_atoms,
            unique_old_atoms,
        })
    }

    pub fn old_system(&self) -> &MolecularSystem {
        &self.old_system
    }

    pub fn new_system(&self) -> &MolecularSystem {
        &self.new_system
    }

    pub fn old_forcefield(&self) -> &ForcefieldParams {
        &self.old_forcefield
    }

    pub fn new_forcefield(&self) -> &ForcefieldParams {
        &self.new_forcefield
    }

    pub fn new_to_old(&self) -> &BTreeMap<usize, usize> {
        &self.new_to_old
    }

    pub fn old_to_new(&self) -> &BTreeMap<usize, usize> {
        &self.old_to_new
    }

    /// New-system atoms without a counterpart in the old system, ascending.
    pub fn unique_new_atoms(&self) -> &[usize] {
        &self.unique_new_atoms
    }

    /// Old-system atoms without a counterpart in the new system, ascending.
    pub fn unique_old_atoms(&self) -> &[usize] {
        &self.unique_old_atoms
    }

    pub fn n_atoms_new(&self) -> usize {
        self.new_system.atom_count()
    }

    pub fn n_atoms_old(&self) -> usize {
        self.old_system.atom_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::HarmonicBondParam;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;

    fn system_of(elements: &[Element]) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        for (i, &element) in elements.iter().enumerate() {
            system.add_atom(Atom::new(&format!("A{i}"), element, "MOL", 1));
        }
        system
    }

    fn ethane_to_ethanol_map() -> BTreeMap<usize, usize> {
        BTreeMap::from([(0, 0), (1, 1), (2, 2)])
    }

    #[test]
    fn new_derives_unique_atoms_and_reverse_map() {
        let old = system_of(&[
            Element::CARBON,
            Element::CARBON,
            Element::HYDROGEN,
            Element::HYDROGEN,
        ]);
        let new = system_of(&[
            Element::CARBON,
            Element::CARBON,
            Element::HYDROGEN,
            Element::OXYGEN,
            Element::HYDROGEN,
        ]);
        let proposal = TopologyProposal::new(
            old,
            ForcefieldParams::default(),
            new,
            ForcefieldParams::default(),
            ethane_to_ethanol_map(),
        )
        .unwrap();

        assert_eq!(proposal.unique_new_atoms(), &[3, 4]);
        assert_eq!(proposal.unique_old_atoms(), &[3]);
        assert_eq!(proposal.old_to_new().get(&2), Some(&2));
        assert_eq!(proposal.n_atoms_new(), 5);
        assert_eq!(proposal.n_atoms_old(), 4);
    }

    #[test]
    fn new_rejects_out_of_range_map_entries() {
        let err = TopologyProposal::new(
            system_of(&[Element::CARBON]),
            ForcefieldParams::default(),
            system_of(&[Element::CARBON, Element::CARBON]),
            ForcefieldParams::default(),
            BTreeMap::from([(1, 3)]),
        )
        .unwrap_err();
        assert!(matches!(err, ProposalError::MapOutOfRange { new: 1, old: 3, .. }));
    }

    #[test]
    fn new_rejects_non_injective_map() {
        let err = TopologyProposal::new(
            system_of(&[Element::CARBON, Element::CARBON]),
            ForcefieldParams::default(),
            system_of(&[Element::CARBON, Element::CARBON]),
            ForcefieldParams::default(),
            BTreeMap::from([(0, 1), (1, 1)]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ProposalError::NonInjectiveMap {
                old: 1,
                first: 0,
                second: 1
            }
        );
    }

    #[test]
    fn new_rejects_forcefield_referencing_missing_atoms() {
        let forcefield = ForcefieldParams {
            harmonic_bonds: vec![HarmonicBondParam {
                atoms: [0, 4],
                length: 0.15,
                k: 1000.0,
            }],
            ..Default::default()
        };
        let err = TopologyProposal::new(
            system_of(&[Element::CARBON, Element::CARBON]),
            ForcefieldParams::default(),
            system_of(&[Element::CARBON, Element::CARBON]),
            forcefield,
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ProposalError::Forcefield { which: "new", .. }));
    }

    #[test]
    fn empty_map_makes_every_atom_unique() {
        let proposal = TopologyProposal::new(
            system_of(&[Element::CARBON]),
            ForcefieldParams::default(),
            system_of(&[Element::CARBON, Element::HYDROGEN]),
            ForcefieldParams::default(),
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(proposal.unique_new_atoms(), &[0, 1]);
        assert_eq!(proposal.unique_old_atoms(), &[0]);
    }
}
