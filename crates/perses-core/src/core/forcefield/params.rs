use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `U = k/2 (r - length)^2`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HarmonicBondParam {
    pub atoms: [usize; 2],
    /// Equilibrium length in nm.
    pub length: f64,
    /// Force constant in kJ/(mol nm^2).
    pub k: f64,
}

/// `U = k/2 (theta - angle)^2`, with `atoms[1]` at the vertex.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HarmonicAngleParam {
    pub atoms: [usize; 3],
    /// Equilibrium angle in radians.
    pub angle: f64,
    /// Force constant in kJ/(mol rad^2).
    pub k: f64,
}

/// `U = k (1 + cos(periodicity * phi - phase))`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PeriodicTorsionParam {
    pub atoms: [usize; 4],
    pub periodicity: u32,
    /// Phase in radians.
    pub phase: f64,
    /// Barrier height in kJ/mol.
    pub k: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConstraintParam {
    pub atoms: [usize; 2],
    /// Fixed distance in nm.
    pub distance: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NonbondedMethod {
    #[default]
    NoCutoff,
    CutoffNonPeriodic,
    CutoffPeriodic,
    Ewald,
    Pme,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NonbondedParticle {
    /// Partial charge in elementary charges.
    pub charge: f64,
    /// Lennard-Jones sigma in nm.
    pub sigma: f64,
    /// Lennard-Jones well depth in kJ/mol.
    pub epsilon: f64,
}

/// A pair whose nonbonded interaction is replaced by explicit parameters
/// (1-4 pairs) or removed entirely (zero charge product and epsilon).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NonbondedException {
    pub atoms: [usize; 2],
    pub charge_product: f64,
    pub sigma: f64,
    pub epsilon: f64,
}

impl NonbondedException {
    pub fn is_nonzero(&self) -> bool {
        self.charge_product != 0.0 || self.epsilon != 0.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct NonbondedParams {
    #[serde(default)]
    pub method: NonbondedMethod,
    pub particles: Vec<NonbondedParticle>,
    #[serde(default)]
    pub exceptions: Vec<NonbondedException>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("{term} term references atom {atom}, but the system only has {n_atoms} atoms")]
    AtomOutOfRange {
        term: &'static str,
        atom: usize,
        n_atoms: usize,
    },
    #[error("Nonbonded block defines {found} particles, but the system has {expected} atoms")]
    ParticleCountMismatch { expected: usize, found: usize },
}

/// All force field terms of a single system.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForcefieldParams {
    pub harmonic_bonds: Vec<HarmonicBondParam>,
    pub harmonic_angles: Vec<HarmonicAngleParam>,
    pub periodic_torsions: Vec<PeriodicTorsionParam>,
    pub constraints: Vec<ConstraintParam>,
    pub nonbonded: Option<NonbondedParams>,
}

impl ForcefieldParams {
    /// Finds the harmonic bond between two atoms, in either orientation.
    pub fn harmonic_bond_between(&self, atom1: usize, atom2: usize) -> Option<&HarmonicBondParam> {
        self.harmonic_bonds
            .iter()
            .find(|b| same_pair(b.atoms, atom1, atom2))
    }

    /// Finds the harmonic angle `end1 - vertex - end2`, with the two ends in either order.
    pub fn harmonic_angle(
        &self,
        end1: usize,
        vertex: usize,
        end2: usize,
    ) -> Option<&HarmonicAngleParam> {
        self.harmonic_angles.iter().find(|a| {
            a.atoms[1] == vertex
                && ((a.atoms[0] == end1 && a.atoms[2] == end2)
                    || (a.atoms[0] == end2 && a.atoms[2] == end1))
        })
    }

    /// Finds the constraint between two atoms, in either orientation.
    ///
    /// If several constraints match, the last one wins.
    pub fn constraint_between(&self, atom1: usize, atom2: usize) -> Option<&ConstraintParam> {
        self.constraints
            .iter()
            .rev()
            .find(|c| same_pair(c.atoms, atom1, atom2))
    }

    /// Checks that every term only references atoms of a system with `n_atoms` atoms.
    pub fn validate(&self, n_atoms: usize) -> Result<(), ParamError> {
        let check = |term: &'static str, atoms: &[usize]| -> Result<(), ParamError> {
            match atoms.iter().find(|&&atom| atom >= n_atoms) {
                Some(&atom) => Err(ParamError::AtomOutOfRange {
                    term,
                    atom,
                    n_atoms,
                }),
                None => Ok(()),
            }
        };

        for bond in &self.harmonic_bonds {
            check("harmonic bond", &bond.atoms)?;
        }
        for angle in &self.harmonic_angles {
            check("harmonic angle", &angle.atoms)?;
        }
        for torsion in &self.periodic_torsions {
            check("periodic torsion", &torsion.atoms)?;
        }
        for constraint in &self.constraints {
            check("constraint", &constraint.atoms)?;
        }
        if let Some(nonbonded) = &self.nonbonded {
            if nonbonded.particles.len() != n_atoms {
                return Err(ParamError::ParticleCountMismatch {
                    expected: n_atoms,
                    found: nonbonded.particles.len(),
                });
            }
            for exception in &nonbonded.exceptions {
                check("nonbonded exception", &exception.atoms)?;
            }
        }
        Ok(())
    }
}

#[inline]
fn same_pair(pair: [usize; 2], atom1: usize, atom2: usize) -> bool {
    (pair[0] == atom1 && pair[1] == atom2) || (pair[0] == atom2 && pair[1] == atom1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propane_like() -> ForcefieldParams {
        ForcefieldParams {
            harmonic_bonds: vec![
                HarmonicBondParam {
                    atoms: [0, 1],
                    length: 0.1526,
                    k: 259408.0,
                },
                HarmonicBondParam {
                    atoms: [1, 2],
                    length: 0.1526,
                    k: 259408.0,
                },
            ],
            harmonic_angles: vec![HarmonicAngleParam {
                atoms: [0, 1, 2],
                angle: 1.911,
                k: 334.72,
            }],
            periodic_torsions: vec![],
            constraints: vec![
                ConstraintParam {
                    atoms: [2, 3],
                    distance: 0.1,
                },
                ConstraintParam {
                    atoms: [3, 2],
                    distance: 0.109,
                },
            ],
            nonbonded: None,
        }
    }

    #[test]
    fn harmonic_bond_lookup_ignores_orientation() {
        let ff = propane_like();
        assert_eq!(ff.harmonic_bond_between(1, 0).unwrap().atoms, [0, 1]);
        assert_eq!(ff.harmonic_bond_between(2, 1).unwrap().atoms, [1, 2]);
        assert!(ff.harmonic_bond_between(0, 2).is_none());
    }

    #[test]
    fn harmonic_angle_lookup_requires_matching_vertex() {
        let ff = propane_like();
        assert!(ff.harmonic_angle(0, 1, 2).is_some());
        assert!(ff.harmonic_angle(2, 1, 0).is_some());
        assert!(ff.harmonic_angle(1, 0, 2).is_none());
    }

    #[test]
    fn constraint_lookup_returns_last_match() {
        let ff = propane_like();
        assert_eq!(ff.constraint_between(2, 3).unwrap().distance, 0.109);
        assert!(ff.constraint_between(0, 1).is_none());
    }

    #[test]
    fn validate_reports_out_of_range_atoms() {
        let ff = propane_like();
        assert!(ff.validate(4).is_ok());
        assert_eq!(
            ff.validate(3),
            Err(ParamError::AtomOutOfRange {
                term: "constraint",
                atom: 3,
                n_atoms: 3
            })
        );
    }

    #[test]
    fn validate_checks_particle_count() {
        let mut ff = propane_like();
        ff.nonbonded = Some(NonbondedParams {
            method: NonbondedMethod::NoCutoff,
            particles: vec![
                NonbondedParticle {
                    charge: 0.0,
                    sigma: 0.3,
                    epsilon: 0.4
                };
                3
            ],
            exceptions: vec![],
        });
        assert_eq!(
            ff.validate(4),
            Err(ParamError::ParticleCountMismatch {
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn nonbonded_method_deserializes_from_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            method: NonbondedMethod,
        }
        let parsed: Wrapper = toml::from_str(r#"method = "cutoff-periodic""#).unwrap();
        assert_eq!(parsed.method, NonbondedMethod::CutoffPeriodic);
        assert_eq!(NonbondedMethod::default(), NonbondedMethod::NoCutoff);
    }

    #[test]
    fn exception_is_nonzero_when_either_parameter_is_set() {
        let mut exception = NonbondedException {
            atoms: [0, 3],
            charge_product: 0.0,
            sigma: 0.3,
            epsilon: 0.0,
        };
        assert!(!exception.is_nonzero());
        exception.epsilon = 0.1;
        assert!(exception.is_nonzero());
    }
}
