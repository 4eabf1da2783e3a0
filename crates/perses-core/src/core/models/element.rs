use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
struct ElementData {
    atomic_number: u8,
    symbol: &'static str,
    mass: f64,
}

// Standard atomic weights in daltons, keyed by upper-case symbol.
static ELEMENTS: Map<&'static str, ElementData> = phf_map! {
    "H" => ElementData { atomic_number: 1, symbol: "H", mass: 1.008 },
    "HE" => ElementData { atomic_number: 2, symbol: "He", mass: 4.0026 },
    "LI" => ElementData { atomic_number: 3, symbol: "Li", mass: 6.94 },
    "B" => ElementData { atomic_number: 5, symbol: "B", mass: 10.81 },
    "C" => ElementData { atomic_number: 6, symbol: "C", mass: 12.011 },
    "N" => ElementData { atomic_number: 7, symbol: "N", mass: 14.007 },
    "O" => ElementData { atomic_number: 8, symbol: "O", mass: 15.999 },
    "F" => ElementData { atomic_number: 9, symbol: "F", mass: 18.998 },
    "NE" => ElementData { atomic_number: 10, symbol: "Ne", mass: 20.180 },
    "NA" => ElementData { atomic_number: 11, symbol: "Na", mass: 22.990 },
    "MG" => ElementData { atomic_number: 12, symbol: "Mg", mass: 24.305 },
    "SI" => ElementData { atomic_number: 14, symbol: "Si", mass: 28.085 },
    "P" => ElementData { atomic_number: 15, symbol: "P", mass: 30.974 },
    "S" => ElementData { atomic_number: 16, symbol: "S", mass: 32.06 },
    "CL" => ElementData { atomic_number: 17, symbol: "Cl", mass: 35.45 },
    "AR" => ElementData { atomic_number: 18, symbol: "Ar", mass: 39.948 },
    "K" => ElementData { atomic_number: 19, symbol: "K", mass: 39.098 },
    "CA" => ElementData { atomic_number: 20, symbol: "Ca", mass: 40.078 },
    "ZN" => ElementData { atomic_number: 30, symbol: "Zn", mass: 65.38 },
    "BR" => ElementData { atomic_number: 35, symbol: "Br", mass: 79.904 },
    "I" => ElementData { atomic_number: 53, symbol: "I", mass: 126.90 },
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol: '{0}'")]
pub struct ParseElementError(pub String);

/// A chemical element, identified by its atomic number.
///
/// Only the elements commonly found in biomolecular and small-molecule force fields
/// are known; this is enough to distinguish hydrogens (grown last) from heavy atoms
/// and to supply default particle masses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    atomic_number: u8,
    symbol: &'static str,
    mass: f64,
}

impl Element {
    pub const HYDROGEN: Element = Element {
        atomic_number: 1,
        symbol: "H",
        mass: 1.008,
    };
    pub const CARBON: Element = Element {
        atomic_number: 6,
        symbol: "C",
        mass: 12.011,
    };
    pub const NITROGEN: Element = Element {
        atomic_number: 7,
        symbol: "N",
        mass: 14.007,
    };
    pub const OXYGEN: Element = Element {
        atomic_number: 8,
        symbol: "O",
        mass: 15.999,
    };

    pub fn atomic_number(&self) -> u8 {
        self.atomic_number
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Standard atomic weight in daltons.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        self.atomic_number == 1
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_uppercase();
        ELEMENTS
            .get(key.as_str())
            .map(|data| Element {
                atomic_number: data.atomic_number,
                symbol: data.symbol,
                mass: data.mass,
            })
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
