use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, Write};
use thiserror::Error;

const NM_TO_ANGSTROM: f64 = 10.0;
const MAX_FREE_ENERGY: f64 = 999.99;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    /// Coordinates in nm, one per atom.
    pub positions: Vec<Point3<f64>>,
    pub remarks: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Cannot determine element from '{0}'")]
    UnknownElement(String),
    #[error("Line is too short for an ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
    #[error("CONECT record references unknown atom serial {0}")]
    UnknownSerial(usize),
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_int<T: std::str::FromStr>(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<T, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Falls back to the leading letters of the atom name when the element columns are blank.
fn infer_element(symbol_field: &str, name: &str) -> Option<Element> {
    if !symbol_field.is_empty() {
        return symbol_field.parse().ok();
    }
    let letters: String = name
        .chars()
        .skip_while(|c| c.is_ascii_digit())
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    letters
        .get(..2)
        .and_then(|two| two.parse().ok())
        .filter(|_| letters.len() == 2)
        .or_else(|| letters.get(..1).and_then(|one| one.parse().ok()))
}

fn format_atom_name(name: &str, element_symbol: &str) -> String {
    if name.len() < 4 && element_symbol.len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

#[allow(clippy::too_many_arguments)]
fn write_atom_record(
    writer: &mut impl Write,
    serial: usize,
    name: &str,
    residue_name: &str,
    residue_number: isize,
    position: &Point3<f64>,
    occupancy: f64,
    b_factor: f64,
    element_symbol: &str,
) -> io::Result<()> {
    let xyz = position.coords * NM_TO_ANGSTROM;
    writeln!(
        writer,
        "HETATM{:>5} {}{:1}{:>3} {:1}{:>4}{:1}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        serial % 100_000,
        format_atom_name(name, element_symbol),
        ' ',
        residue_name,
        'A',
        residue_number % 10_000,
        ' ',
        xyz.x,
        xyz.y,
        xyz.z,
        occupancy,
        b_factor,
        element_symbol.to_ascii_uppercase()
    )
}

fn write_system_atom(
    writer: &mut impl Write,
    serial: usize,
    atom: &Atom,
    position: &Point3<f64>,
) -> io::Result<()> {
    write_atom_record(
        writer,
        serial,
        &atom.name,
        &atom.residue_name,
        atom.residue_number,
        position,
        1.0,
        0.0,
        atom.element.symbol(),
    )
}

/// Writes a MODEL block containing only `atoms`, in the given order.
///
/// Serial numbers are 1-based topology indices so that models of the same system
/// line up when viewed together.
pub fn write_model(
    writer: &mut impl Write,
    system: &MolecularSystem,
    positions: &[Point3<f64>],
    atoms: &[usize],
    model_number: usize,
) -> Result<(), PdbError> {
    writeln!(writer, "MODEL     {:>4}", model_number)?;
    for &index in atoms {
        let (atom, position) = system
            .atom(index)
            .zip(positions.get(index))
            .ok_or_else(|| PdbError::Inconsistency(format!("Atom index {} not found", index)))?;
        write_system_atom(writer, index + 1, atom, position)?;
    }
    writeln!(writer, "ENDMDL")?;
    Ok(())
}

/// Writes a complete structure (all atoms, bonds as CONECT records).
pub fn write_structure(
    writer: &mut impl Write,
    system: &MolecularSystem,
    positions: &[Point3<f64>],
) -> Result<(), PdbError> {
    PdbFile::write_to(
        system,
        &PdbMetadata {
            positions: positions.to_vec(),
            remarks: Vec::new(),
        },
        writer,
    )
}

/// Writes a torsion PMF as a model of argon pseudo-atoms, one per torsion bin.
///
/// Each pseudo-atom sits at the candidate position of `atom` for that bin, with the bin
/// probability as occupancy and the relative free energy `-ln p` (zero at the most likely
/// bin, capped at 999.99) as B-factor.
pub fn write_pmf_model(
    writer: &mut impl Write,
    atom: usize,
    candidates: &[Point3<f64>],
    logp: &[f64],
) -> Result<(), PdbError> {
    if candidates.len() != logp.len() {
        return Err(PdbError::Inconsistency(format!(
            "{} candidate positions but {} log-probabilities",
            candidates.len(),
            logp.len()
        )));
    }

    let max_logp = logp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    writeln!(writer, "MODEL")?;
    for (i, (xyz, &logp_i)) in candidates.iter().zip(logp).enumerate() {
        let free_energy = (max_logp - logp_i).min(MAX_FREE_ENERGY);
        write_atom_record(
            writer,
            i + 1,
            "Ar",
            "Ar",
            atom as isize + 1,
            xyz,
            logp_i.exp(),
            free_energy,
            "Ar",
        )?;
    }
    writeln!(writer, "TER")?;
    writeln!(writer, "ENDMDL")?;
    Ok(())
}

/// Protein Data Bank format, restricted to ATOM/HETATM and CONECT records of the first model.
pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = PdbMetadata::default();
        let mut serial_to_index: HashMap<usize, usize> = HashMap::new();
        let mut conect: Vec<(usize, usize, usize)> = Vec::new();
        let mut seen_model_end = false;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" if !seen_model_end => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }
                    let serial: usize = parse_int(&line, line_num, 6, 11)?;
                    let name = slice_and_trim(&line, 12, 16);
                    let residue_name = slice_and_trim(&line, 17, 20);
                    let residue_number: isize = parse_int(&line, line_num, 22, 26)?;
                    let x = parse_float(&line, line_num, 30, 38)?;
                    let y = parse_float(&line, line_num, 38, 46)?;
                    let z = parse_float(&line, line_num, 46, 54)?;
                    let element = infer_element(slice_and_trim(&line, 76, 78), name)
                        .ok_or_else(|| PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::UnknownElement(name.to_string()),
                        })?;

                    let index =
                        system.add_atom(Atom::new(name, element, residue_name, residue_number));
                    if serial_to_index.insert(serial, index).is_some() {
                        return Err(PdbError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            serial
                        )));
                    }
                    metadata.positions.push(Point3::new(
                        x / NM_TO_ANGSTROM,
                        y / NM_TO_ANGSTROM,
                        z / NM_TO_ANGSTROM,
                    ));
                }
                "REMARK" => {
                    metadata
                        .remarks
                        .push(line.get(6..).unwrap_or("").trim().to_string());
                }
                "ENDMDL" => seen_model_end = true,
                "CONECT" => {
                    let origin: usize = parse_int(&line, line_num, 6, 11)?;
                    let mut start = 11;
                    while start < line.len() && !slice_and_trim(&line, start, start + 5).is_empty()
                    {
                        let partner: usize = parse_int(&line, line_num, start, start + 5)?;
                        conect.push((line_num, origin, partner));
                        start += 5;
                    }
                }
                _ => {}
            }
        }

        for (line_num, origin, partner) in conect {
            let lookup = |serial: usize| {
                serial_to_index
                    .get(&serial)
                    .copied()
                    .ok_or(PdbError::Parse {
                        line: line_num,
                        kind: PdbParseErrorKind::UnknownSerial(serial),
                    })
            };
            let (a, b) = (lookup(origin)?, lookup(partner)?);
            if a != b {
                system.add_bond(a, b, BondOrder::Single);
            }
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        if metadata.positions.len() != system.atom_count() {
            return Err(PdbError::Inconsistency(format!(
                "System has {} atoms but {} positions were supplied",
                system.atom_count(),
                metadata.positions.len()
            )));
        }

        for remark in &metadata.remarks {
            writeln!(writer, "REMARK {}", remark)?;
        }
        for ((index, atom), position) in system.atoms_iter().zip(&metadata.positions) {
            write_system_atom(writer, index + 1, atom, position)?;
        }

        let mut bond_map: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for bond in system.bonds() {
            bond_map
                .entry(bond.atom1 + 1)
                .or_default()
                .push(bond.atom2 + 1);
            bond_map
                .entry(bond.atom2 + 1)
                .or_default()
                .push(bond.atom1 + 1);
        }
        for (origin, partners) in &bond_map {
            for chunk in partners.chunks(4) {
                write!(writer, "CONECT{:>5}", origin)?;
                for partner in chunk {
                    write!(writer, "{:>5}", partner)?;
                }
                writeln!(writer)?;
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }
}
