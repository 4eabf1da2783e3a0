use crate::core::forcefield::params::{
    ForcefieldParams, HarmonicAngleParam, HarmonicBondParam, NonbondedException, NonbondedParticle,
    PeriodicTorsionParam,
};
use crate::core::forcefield::potentials;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::utils::geometry::{bond_angle, dihedral};
use nalgebra::Point3;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// A force field term tagged with the growth stage from which it is active.
#[derive(Debug, Clone, Copy)]
struct Staged<T> {
    term: T,
    growth_index: usize,
}

#[derive(Debug, Clone, Default)]
struct TermSet {
    bonds: Vec<Staged<HarmonicBondParam>>,
    angles: Vec<Staged<HarmonicAngleParam>>,
    torsions: Vec<Staged<PeriodicTorsionParam>>,
    /// Nonzero exceptions, evaluated without cutoff.
    pairs: Vec<Staged<NonbondedException>>,
}

impl TermSet {
    fn energy<P: Fn(usize) -> Point3<f64>>(&self, stage: usize, pos: &P) -> EnergyTerm {
        let mut energy = EnergyTerm::default();
        for Staged { term, .. } in self.bonds.iter().filter(|s| s.growth_index <= stage) {
            let [a, b] = term.atoms;
            energy.bond += potentials::harmonic((pos(a) - pos(b)).norm(), term.length, term.k);
        }
        for Staged { term, .. } in self.angles.iter().filter(|s| s.growth_index <= stage) {
            let [a, b, c] = term.atoms;
            let theta = bond_angle(&pos(a), &pos(b), &pos(c));
            energy.angle += potentials::harmonic(theta, term.angle, term.k);
        }
        for Staged { term, .. } in self.torsions.iter().filter(|s| s.growth_index <= stage) {
            let [a, b, c, d] = term.atoms;
            let phi = dihedral(&pos(a), &pos(b), &pos(c), &pos(d));
            energy.torsion +=
                potentials::periodic_torsion(phi, term.periodicity, term.phase, term.k);
        }
        for Staged { term, .. } in self.pairs.iter().filter(|s| s.growth_index <= stage) {
            let [a, b] = term.atoms;
            let r = (pos(a) - pos(b)).norm();
            energy.sterics += potentials::lennard_jones(r, term.sigma, term.epsilon);
            energy.electrostatics += potentials::coulomb(r, term.charge_product);
        }
        energy
    }
}

#[derive(Debug, Clone)]
struct Sterics {
    particles: Vec<NonbondedParticle>,
    exclusions: HashSet<(usize, usize)>,
    cutoff: f64,
}

impl Sterics {
    #[inline]
    fn is_excluded(&self, a: usize, b: usize) -> bool {
        self.exclusions.contains(&(a.min(b), a.max(b)))
    }

    fn add_pair<P: Fn(usize) -> Point3<f64>>(
        &self,
        energy: &mut EnergyTerm,
        a: usize,
        b: usize,
        pos: &P,
    ) {
        if self.is_excluded(a, b) {
            return;
        }
        let r = (pos(a) - pos(b)).norm();
        if r >= self.cutoff {
            return;
        }
        let (pa, pb) = (&self.particles[a], &self.particles[b]);
        let (sigma, epsilon) =
            potentials::combine_lorentz_berthelot(pa.sigma, pa.epsilon, pb.sigma, pb.epsilon);
        energy.sterics += potentials::lennard_jones(r, sigma, epsilon);
        energy.electrostatics += potentials::coulomb(r, pa.charge * pb.charge);
    }
}

/// The energy model of a system whose unique atoms are grown one at a time.
///
/// Every atom carries a growth index: its 1-based position in the proposal order, or 0 for
/// atoms that are already positioned. A term's growth index is the largest index among its
/// atoms, and the term contributes to the energy at every stage at or beyond that index.
/// Terms among positioned atoms only have index 0 and are dropped.
///
/// With sterics enabled, grown atoms also interact with every atom present at the current
/// stage through Lennard-Jones and Coulomb terms within a plain distance cutoff. All
/// nonbonded exceptions exclude their pair from this interaction; exceptions with a nonzero
/// charge product or well depth are evaluated explicitly instead, without cutoff.
///
/// # Panics
///
/// Energy methods index `positions` by atom and panic if it is shorter than the system.
#[derive(Debug, Clone)]
pub struct GrowthSystem {
    growth_indices: Vec<usize>,
    grown_atoms: Vec<usize>,
    terms: TermSet,
    atom_terms: Vec<TermSet>,
    sterics: Option<Sterics>,
}

impl GrowthSystem {
    /// # Arguments
    ///
    /// * `forcefield` - Parameters of the system being grown.
    /// * `growth_indices` - Growth index of every atom of that system.
    /// * `sterics_cutoff` - `Some(cutoff)` in nm to include nonbonded interactions.
    #[instrument(level = "debug", skip_all, fields(n_atoms = growth_indices.len()))]
    pub fn new(
        forcefield: &ForcefieldParams,
        growth_indices: Vec<usize>,
        sterics_cutoff: Option<f64>,
    ) -> Self {
        let n_atoms = growth_indices.len();
        let stage_of = |atoms: &[usize]| {
            atoms
                .iter()
                .map(|&a| growth_indices.get(a).copied().unwrap_or(0))
                .max()
                .unwrap_or(0)
        };
        let grown = |atoms: &[usize]| -> Vec<usize> {
            let mut involved: Vec<usize> = atoms
                .iter()
                .copied()
                .filter(|&a| growth_indices.get(a).is_some_and(|&g| g > 0))
                .collect();
            involved.sort_unstable();
            involved.dedup();
            involved
        };

        let mut terms = TermSet::default();
        let mut atom_terms = vec![TermSet::default(); n_atoms];

        for bond in &forcefield.harmonic_bonds {
            let growth_index = stage_of(&bond.atoms);
            if growth_index == 0 {
                continue;
            }
            let staged = Staged {
                term: *bond,
                growth_index,
            };
            terms.bonds.push(staged);
            for atom in grown(&bond.atoms) {
                atom_terms[atom].bonds.push(staged);
            }
        }
        for angle in &forcefield.harmonic_angles {
            let growth_index = stage_of(&angle.atoms);
            if growth_index == 0 {
                continue;
            }
            let staged = Staged {
                term: *angle,
                growth_index,
            };
            terms.angles.push(staged);
            for atom in grown(&angle.atoms) {
                atom_terms[atom].angles.push(staged);
            }
        }
        for torsion in &forcefield.periodic_torsions {
            let growth_index = stage_of(&torsion.atoms);
            if growth_index == 0 {
                continue;
            }
            let staged = Staged {
                term: *torsion,
                growth_index,
            };
            terms.torsions.push(staged);
            for atom in grown(&torsion.atoms) {
                atom_terms[atom].torsions.push(staged);
            }
        }

        let sterics = match (sterics_cutoff, &forcefield.nonbonded) {
            (Some(cutoff), Some(nonbonded)) => {
                let mut exclusions = HashSet::with_capacity(nonbonded.exceptions.len());
                for exception in &nonbonded.exceptions {
                    let [a, b] = exception.atoms;
                    exclusions.insert((a.min(b), a.max(b)));
                    let growth_index = stage_of(&exception.atoms);
                    if growth_index == 0 || !exception.is_nonzero() {
                        continue;
                    }
                    let staged = Staged {
                        term: *exception,
                        growth_index,
                    };
                    terms.pairs.push(staged);
                    for atom in grown(&exception.atoms) {
                        atom_terms[atom].pairs.push(staged);
                    }
                }
                Some(Sterics {
                    particles: nonbonded.particles.clone(),
                    exclusions,
                    cutoff,
                })
            }
            _ => None,
        };

        let mut grown_atoms: Vec<usize> =
            (0..n_atoms).filter(|&a| growth_indices[a] > 0).collect();
        grown_atoms.sort_by_key(|&a| growth_indices[a]);

        debug!(
            bonds = terms.bonds.len(),
            angles = terms.angles.len(),
            torsions = terms.torsions.len(),
            exceptions = terms.pairs.len(),
            sterics = sterics.is_some(),
            "Growth system assembled."
        );

        Self {
            growth_indices,
            grown_atoms,
            terms,
            atom_terms,
            sterics,
        }
    }

    pub fn n_atoms(&self) -> usize {
        self.growth_indices.len()
    }

    pub fn growth_index(&self, atom: usize) -> usize {
        self.growth_indices.get(atom).copied().unwrap_or(0)
    }

    pub fn uses_sterics(&self) -> bool {
        self.sterics.is_some()
    }

    /// Energy of every term active at `stage`.
    pub fn energy(&self, positions: &[Point3<f64>], stage: usize) -> EnergyTerm {
        self.total_energy(stage, &|i| positions[i])
    }

    /// Energy of every term active at `stage`, with `atom` moved to `position`.
    pub fn energy_with_override(
        &self,
        positions: &[Point3<f64>],
        stage: usize,
        atom: usize,
        position: &Point3<f64>,
    ) -> EnergyTerm {
        let moved = *position;
        self.total_energy(stage, &|i| if i == atom { moved } else { positions[i] })
    }

    /// Energy of the terms active at `stage` that involve `atom`, with `atom` moved to
    /// `position`.
    ///
    /// Differs from [`energy_with_override`](Self::energy_with_override) by a constant that
    /// does not depend on `position`.
    pub fn atom_energy_with_override(
        &self,
        positions: &[Point3<f64>],
        stage: usize,
        atom: usize,
        position: &Point3<f64>,
    ) -> EnergyTerm {
        let growth_index = self.growth_index(atom);
        if growth_index == 0 || growth_index > stage {
            return EnergyTerm::default();
        }
        let moved = *position;
        let pos = |i: usize| if i == atom { moved } else { positions[i] };

        let mut energy = self.atom_terms[atom].energy(stage, &pos);
        if let Some(sterics) = &self.sterics {
            for other in 0..self.n_atoms() {
                if other != atom && self.growth_indices[other] <= stage {
                    sterics.add_pair(&mut energy, atom, other, &pos);
                }
            }
        }
        energy
    }

    fn total_energy<P: Fn(usize) -> Point3<f64>>(&self, stage: usize, pos: &P) -> EnergyTerm {
        let mut energy = self.terms.energy(stage, pos);
        let Some(sterics) = &self.sterics else {
            return energy;
        };
        for &atom in &self.grown_atoms {
            let growth_index = self.growth_indices[atom];
            if growth_index > stage {
                break;
            }
            for (other, &other_index) in self.growth_indices.iter().enumerate() {
                // Pairs of grown atoms are counted from the later of the two.
                if other_index == 0 || other_index < growth_index {
                    sterics.add_pair(&mut energy, atom, other, pos);
                }
            }
        }
        energy
    }
}
