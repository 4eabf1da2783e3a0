use crate::core::models::proposal::TopologyProposal;
use crate::core::models::system::MolecularSystem;
use rand::Rng;
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Grow the unique new atoms of the new system.
    Forward,
    /// Grow the unique old atoms of the old system.
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topological torsion `atom - bond_atom - angle_atom - torsion_atom` used to place `atom`
/// from its three already-positioned partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Torsion {
    pub atom: usize,
    pub bond_atom: usize,
    pub angle_atom: usize,
    pub torsion_atom: usize,
}

impl Torsion {
    pub fn new(atom: usize, bond_atom: usize, angle_atom: usize, torsion_atom: usize) -> Self {
        Self {
            atom,
            bond_atom,
            angle_atom,
            torsion_atom,
        }
    }

    pub fn atoms(&self) -> [usize; 4] {
        [self.atom, self.bond_atom, self.angle_atom, self.torsion_atom]
    }
}

impl fmt::Display for Torsion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.atom, self.bond_atom, self.angle_atom, self.torsion_atom
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("Atoms {remaining:?} remain to be placed, but none has a positioned bonded partner")]
    NoEligibleAtoms { remaining: Vec<usize> },
    #[error("No topological torsion with positioned atoms found for placing atom {atom}")]
    NoTorsion { atom: usize },
}

/// The sequence in which unique atoms are grown, each paired with the torsion that places it.
///
/// Heavy atoms are placed before hydrogens. Within each group, atoms are grown in rounds:
/// every atom that has a positioned bonded partner at the start of a round is placed during
/// that round, in ascending index order, and atoms placed earlier in the round already count
/// as positioned when torsions are enumerated for later ones. The torsion for each atom is
/// chosen uniformly among its topological torsions, and `logp_choice` accumulates the log
/// probability of these choices.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalOrder {
    direction: Direction,
    steps: Vec<Torsion>,
    logp_choice: f64,
}

impl ProposalOrder {
    #[instrument(level = "debug", skip_all, fields(direction = %direction))]
    pub fn determine(
        proposal: &TopologyProposal,
        direction: Direction,
        rng: &mut (impl Rng + ?Sized),
    ) -> Result<Self, OrderError> {
        let (system, unique_atoms, core_atoms): (&MolecularSystem, &[usize], Vec<usize>) =
            match direction {
                Direction::Forward => (
                    proposal.new_system(),
                    proposal.unique_new_atoms(),
                    proposal.new_to_old().keys().copied().collect(),
                ),
                Direction::Reverse => (
                    proposal.old_system(),
                    proposal.unique_old_atoms(),
                    proposal.old_to_new().keys().copied().collect(),
                ),
            };

        let mut positioned = vec![false; system.atom_count()];
        for atom in core_atoms {
            positioned[atom] = true;
        }

        let (heavy_atoms, hydrogens): (Vec<usize>, Vec<usize>) = unique_atoms
            .iter()
            .copied()
            .partition(|&i| !system.atom(i).is_some_and(|atom| atom.is_hydrogen()));

        let mut order = Self {
            direction,
            steps: Vec::with_capacity(unique_atoms.len()),
            logp_choice: 0.0,
        };
        order.place_group(system, heavy_atoms, &mut positioned, rng)?;
        order.place_group(system, hydrogens, &mut positioned, rng)?;

        debug!(
            n_atoms = order.steps.len(),
            logp_choice = order.logp_choice,
            "Proposal order determined."
        );
        Ok(order)
    }

    fn place_group(
        &mut self,
        system: &MolecularSystem,
        mut remaining: Vec<usize>,
        positioned: &mut [bool],
        rng: &mut (impl Rng + ?Sized),
    ) -> Result<(), OrderError> {
        while !remaining.is_empty() {
            let eligible: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&atom| {
                    system
                        .bonded_neighbors(atom)
                        .is_some_and(|neighbors| neighbors.iter().any(|&n| positioned[n]))
                })
                .collect();
            if eligible.is_empty() {
                return Err(OrderError::NoEligibleAtoms { remaining });
            }
            trace!(?eligible, "Placing eligible atoms.");

            for atom in eligible {
                let candidates = topological_torsions(system, positioned, atom);
                if candidates.is_empty() {
                    return Err(OrderError::NoTorsion { atom });
                }
                let chosen = candidates[rng.gen_range(0..candidates.len())];
                self.logp_choice -= (candidates.len() as f64).ln();
                self.steps.push(chosen);
                positioned[atom] = true;
            }
            remaining.retain(|&atom| !positioned[atom]);
        }
        Ok(())
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The chosen torsions, in growth order; `steps()[k].atom` has growth index `k + 1`.
    pub fn steps(&self) -> &[Torsion] {
        &self.steps
    }

    pub fn logp_choice(&self) -> f64 {
        self.logp_choice
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().map(|torsion| torsion.atom)
    }

    /// Growth index of every atom of a system with `n_atoms` atoms: the 1-based position
    /// of the atom in this order, or 0 for atoms that are not grown.
    pub fn growth_indices(&self, n_atoms: usize) -> Vec<usize> {
        let mut indices = vec![0; n_atoms];
        for (k, torsion) in self.steps.iter().enumerate() {
            if let Some(slot) = indices.get_mut(torsion.atom) {
                *slot = k + 1;
            }
        }
        indices
    }
}

/// Enumerates the torsions `(atom, a2, a3, a4)` along bonds in which `a2`, `a3` and `a4`
/// are positioned and all four atoms are distinct.
fn topological_torsions(
    system: &MolecularSystem,
    positioned: &[bool],
    atom: usize,
) -> Vec<Torsion> {
    let neighbors = |i: usize| system.bonded_neighbors(i).unwrap_or(&[]);
    let mut torsions = Vec::new();
    for &a2 in neighbors(atom) {
        if !positioned[a2] {
            continue;
        }
        for &a3 in neighbors(a2) {
            if !positioned[a3] || a3 == atom || a3 == a2 {
                continue;
            }
            for &a4 in neighbors(a3) {
                if !positioned[a4] || a4 == atom || a4 == a2 || a4 == a3 {
                    continue;
                }
                torsions.push(Torsion::new(atom, a2, a3, a4));
            }
        }
    }
    torsions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::ForcefieldParams;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;

    fn build_system(elements: &[Element], bonds: &[(usize, usize)]) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        for (i, &element) in elements.iter().enumerate() {
            system.add_atom(Atom::new(&format!("{}{}", element.symbol(), i), element, "MOL", 1));
        }
        for &(a, b) in bonds {
            system.add_bond(a, b, BondOrder::Single).unwrap();
        }
        system
    }

    fn proposal(
        old: MolecularSystem,
        new: MolecularSystem,
        map: &[(usize, usize)],
    ) -> TopologyProposal {
        TopologyProposal::new(
            old,
            ForcefieldParams::default(),
            new,
            ForcefieldParams::default(),
            map.iter().copied().collect::<BTreeMap<_, _>>(),
        )
        .unwrap()
    }

    const C: Element = Element::CARBON;
    const H: Element = Element::HYDROGEN;

    fn propane() -> MolecularSystem {
        build_system(&[C, C, C], &[(0, 1), (1, 2)])
    }

    #[test]
    fn chain_is_grown_over_successive_rounds() {
        let new = build_system(&[C, C, C, C, C], &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let proposal = proposal(propane(), new, &[(0, 0), (1, 1), (2, 2)]);
        let order =
            ProposalOrder::determine(&proposal, Direction::Forward, &mut StdRng::seed_from_u64(0))
                .unwrap();

        assert_eq!(
            order.steps(),
            &[Torsion::new(3, 2, 1, 0), Torsion::new(4, 3, 2, 1)]
        );
        assert_eq!(order.logp_choice(), 0.0);
        assert_eq!(order.growth_indices(5), vec![0, 0, 0, 1, 2]);
    }

    #[test]
    fn torsion_choice_is_uniform_over_candidates() {
        // Isobutane core with a new carbon on a methyl group.
        let old = build_system(&[C, C, C, C], &[(0, 1), (1, 2), (1, 3)]);
        let new = build_system(&[C, C, C, C, C], &[(0, 1), (1, 2), (1, 3), (0, 4)]);
        let proposal = proposal(old, new, &[(0, 0), (1, 1), (2, 2), (3, 3)]);

        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            let order = ProposalOrder::determine(&proposal, Direction::Forward, &mut rng).unwrap();
            assert!((order.logp_choice() + 2f64.ln()).abs() < 1e-12);
            seen.insert(order.steps()[0]);
        }
        assert_eq!(
            seen,
            [Torsion::new(4, 0, 1, 2), Torsion::new(4, 0, 1, 3)]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn hydrogens_are_placed_after_heavy_atoms() {
        let new = build_system(&[C, C, C, H, C], &[(0, 1), (1, 2), (2, 3), (2, 4)]);
        let proposal = proposal(propane(), new, &[(0, 0), (1, 1), (2, 2)]);
        let order =
            ProposalOrder::determine(&proposal, Direction::Forward, &mut StdRng::seed_from_u64(3))
                .unwrap();
        assert_eq!(order.atoms().collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(order.growth_indices(5), vec![0, 0, 0, 2, 1]);
    }

    #[test]
    fn atoms_placed_earlier_in_a_round_enable_later_torsions() {
        // Atoms 3 and 4 are both bonded to core atom 2 and become eligible together;
        // atom 4 is also bonded to 3, so once 3 is placed it gains the torsion 4-3-2-1.
        let new = build_system(&[C, C, C, C, C], &[(0, 1), (1, 2), (2, 3), (2, 4), (3, 4)]);
        let proposal = proposal(propane(), new, &[(0, 0), (1, 1), (2, 2)]);
        let order =
            ProposalOrder::determine(&proposal, Direction::Forward, &mut StdRng::seed_from_u64(5))
                .unwrap();
        assert_eq!(order.atoms().collect::<Vec<_>>(), vec![3, 4]);
        assert!((order.logp_choice() + 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn reverse_direction_grows_unique_old_atoms() {
        let old = build_system(&[C, C, C, H], &[(0, 1), (1, 2), (2, 3)]);
        let new = propane();
        let proposal = proposal(old, new, &[(0, 0), (1, 1), (2, 2)]);
        let mut rng = StdRng::seed_from_u64(0);

        let forward = ProposalOrder::determine(&proposal, Direction::Forward, &mut rng).unwrap();
        assert!(forward.is_empty());
        assert_eq!(forward.logp_choice(), 0.0);

        let reverse = ProposalOrder::determine(&proposal, Direction::Reverse, &mut rng).unwrap();
        assert_eq!(reverse.direction(), Direction::Reverse);
        assert_eq!(reverse.steps(), &[Torsion::new(3, 2, 1, 0)]);
    }

    #[test]
    fn disconnected_atoms_are_reported() {
        let new = build_system(&[C, C, C, C], &[(0, 1), (1, 2)]);
        let proposal = proposal(propane(), new, &[(0, 0), (1, 1), (2, 2)]);
        let err =
            ProposalOrder::determine(&proposal, Direction::Forward, &mut StdRng::seed_from_u64(0))
                .unwrap_err();
        assert_eq!(err, OrderError::NoEligibleAtoms { remaining: vec![3] });
    }

    #[test]
    fn atoms_without_torsion_are_reported() {
        let old = build_system(&[C, C], &[(0, 1)]);
        let new = build_system(&[C, C, C], &[(0, 1), (1, 2)]);
        let proposal = proposal(old, new, &[(0, 0), (1, 1)]);
        let err =
            ProposalOrder::determine(&proposal, Direction::Forward, &mut StdRng::seed_from_u64(0))
                .unwrap_err();
        assert_eq!(err, OrderError::NoTorsion { atom: 2 });
    }

    #[test]
    fn direction_and_torsion_display() {
        assert_eq!(Direction::Reverse.to_string(), "reverse");
        assert_eq!(Torsion::new(4, 3, 2, 1).to_string(), "4-3-2-1");
        assert_eq!(Torsion::new(4, 3, 2, 1).atoms(), [4, 3, 2, 1]);
    }
}
