use std::ops::{Add, AddAssign};

/// Energy of a (partially grown) system, split by interaction type. All values in kJ/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub bond: f64,
    pub angle: f64,
    pub torsion: f64,
    pub sterics: f64,
    pub electrostatics: f64,
}

impl EnergyTerm {
    pub fn new(bond: f64, angle: f64, torsion: f64, sterics: f64, electrostatics: f64) -> Self {
        Self {
            bond,
            angle,
            torsion,
            sterics,
            electrostatics,
        }
    }

    #[inline]
    pub fn valence(&self) -> f64 {
        self.bond + self.angle + self.torsion
    }

    #[inline]
    pub fn nonbonded(&self) -> f64 {
        self.sterics + self.electrostatics
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.valence() + self.nonbonded()
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            bond: self.bond + rhs.bond,
            angle: self.angle + rhs.angle,
            torsion: self.torsion + rhs.torsion,
            sterics: self.sterics + rhs.sterics,
            electrostatics: self.electrostatics + rhs.electrostatics,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.bond += rhs.bond;
        self.angle += rhs.angle;
        self.torsion += rhs.torsion;
        self.sterics += rhs.sterics;
        self.electrostatics += rhs.electrostatics;
    }
}
