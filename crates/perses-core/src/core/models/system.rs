use super::atom::Atom;
use super::topology::{Bond, BondOrder};

/// Represents a molecule (or a whole solvated complex) as an ordered list of atoms and bonds.
///
/// The position of an atom in the list is its topology index; coordinate arrays,
/// force field terms and atom maps all refer to atoms by this index.
/// A bond adjacency cache is kept in sync with the bond list for fast neighbor queries.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    /// Cached adjacency list, indexed by atom index.
    bond_adjacency: Vec<Vec<usize>>,
}

impl MolecularSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an atom by its topology index.
    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Returns an iterator over all atoms, paired with their topology index.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.atoms.iter().enumerate()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Appends an atom and returns its topology index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.bond_adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Adds a bond between two atoms.
    ///
    /// Adding an existing bond (in either direction) succeeds without creating a duplicate.
    ///
    /// # Return
    ///
    /// Returns `None` if either atom does not exist or both indices are the same atom.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) -> Option<()> {
        if atom1 >= self.atoms.len() || atom2 >= self.atoms.len() || atom1 == atom2 {
            return None;
        }

        if self.bond_adjacency[atom1].contains(&atom2) {
            return Some(());
        }

        self.bonds.push(Bond::new(atom1, atom2, order));
        self.bond_adjacency[atom1].push(atom2);
        self.bond_adjacency[atom2].push(atom1);
        Some(())
    }

    /// Retrieves the bonded neighbors of an atom, in the order the bonds were added.
    pub fn bonded_neighbors(&self, atom: usize) -> Option<&[usize]> {
        self.bond_adjacency.get(atom).map(|v| v.as_slice())
    }

    pub fn are_bonded(&self, atom1: usize, atom2: usize) -> bool {
        self.bond_adjacency
            .get(atom1)
            .is_some_and(|neighbors| neighbors.contains(&atom2))
    }

    /// Finds the first atom with the given name in the given residue.
    pub fn find_atom_by_name(&self, residue_number: isize, name: &str) -> Option<usize> {
        self.atoms
            .iter()
            .position(|atom| atom.residue_number == residue_number && atom.name == name)
    }
}
