//! # Core Models Module
//!
//! Data structures describing the molecules on either side of a chemical-state jump.
//!
//! - [`element`] - Periodic table lookups (symbol, atomic number, standard mass)
//! - [`atom`] - Individual atoms with residue context
//! - [`topology`] - Bond connectivity
//! - [`system`] - A complete molecule: ordered atoms plus bonds
//! - [`proposal`] - A pair of systems and the atom map that relates them
//!
//! ```
//! use perses::core::models::atom::Atom;
//! use perses::core::models::element::Element;
//! use perses::core::models::system::MolecularSystem;
//! use perses::core::models::topology::BondOrder;
//!
//! let mut system = MolecularSystem::new();
//! let c1 = system.add_atom(Atom::new("C1", Element::CARBON, "MOL", 1));
//! let c2 = system.add_atom(Atom::new("C2", Element::CARBON, "MOL", 1));
//! assert_eq!(system.add_bond(c1, c2, BondOrder::Single), Some(()));
//! assert!(system.are_bonded(c1, c2));
//! assert_eq!(system.add_bond(c1, c1, BondOrder::Single), None);
//! ```

pub mod atom;
pub mod element;
pub mod proposal;
pub mod system;
pub mod topology;
