use super::element::Element;

/// An atom of a molecular system.
///
/// Positions live in separate coordinate arrays indexed by topology index; the atom
/// only carries identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "H12").
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// The name of the parent residue (e.g., "ALA", "MOL").
    pub residue_name: String,
    /// The sequence number of the parent residue.
    pub residue_number: isize,
    /// Particle mass in daltons.
    pub mass: f64,
}

impl Atom {
    /// Creates a new `Atom` whose mass is the element's standard atomic weight.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `element` - The chemical element.
    /// * `residue_name` - The name of the residue this atom belongs to.
    /// * `residue_number` - The sequence number of that residue.
    pub fn new(name: &str, element: Element, residue_name: &str, residue_number: isize) -> Self {
        Self {
            name: name.to_string(),
            element,
            residue_name: residue_name.to_string(),
            residue_number,
            mass: element.mass(),
        }
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    #[inline]
    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}
