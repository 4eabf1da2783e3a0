use super::config::GeometryConfig;
use super::error::EngineError;
use super::growth::GrowthSystem;
use super::order::{Direction, ProposalOrder, Torsion};
use super::progress::{Progress, ProgressReporter};
use super::sampling::HarmonicGaussian;
use super::torsion::{TorsionPmf, TorsionQuery, TorsionScanner};
use crate::core::forcefield::params::ForcefieldParams;
use crate::core::io::pdb::{self, PdbError};
use crate::core::io::pmf::PmfRow;
use crate::core::models::proposal::TopologyProposal;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::geometry::{cartesian_to_internal, internal_to_cartesian};
use nalgebra::Point3;
use rand::RngCore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace};

/// Positions for every atom of the new system, with the log-probability of having
/// proposed the unique new ones.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryProposal {
    pub new_positions: Vec<Point3<f64>>,
    pub logp: f64,
}

/// Proposes positions for atoms that appear in a topology change and evaluates the
/// probability of the reverse proposal.
pub trait GeometryEngine {
    /// Proposes positions for the unique new atoms, keeping core atoms where they are.
    ///
    /// # Arguments
    ///
    /// * `proposal` - The topology change being proposed.
    /// * `current_positions` - Positions of every atom of the old system, in nm.
    /// * `beta` - Inverse temperature in mol/kJ.
    /// * `rng` - Source of randomness for the proposal.
    fn propose(
        &mut self,
        proposal: &TopologyProposal,
        current_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut dyn RngCore,
    ) -> Result<GeometryProposal, EngineError>;

    /// Log-probability that the unique old atoms would be proposed at `old_positions`
    /// by the inverse topology change.
    fn logp_reverse(
        &mut self,
        proposal: &TopologyProposal,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError>;
}

/// A torsion PMF evaluated while growing one atom.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPmf {
    pub direction: Direction,
    pub stage: usize,
    pub torsion: Torsion,
    pub pmf: TorsionPmf,
}

impl RecordedPmf {
    pub fn rows(&self) -> impl Iterator<Item = PmfRow> + '_ {
        self.pmf
            .phis()
            .iter()
            .zip(self.pmf.logp())
            .enumerate()
            .map(|(bin, (&phi, &logp))| PmfRow {
                direction: self.direction.as_str(),
                stage: self.stage,
                atom: self.torsion.atom,
                bin,
                phi,
                logp,
                probability: logp.exp(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GrowthTimings {
    torsion_scan: Duration,
    energy: Duration,
}

/// Grows atoms in internal coordinates using every valence angle and torsion of the force
/// field.
///
/// Bond lengths and angles are drawn from the Gaussian implied by their harmonic terms;
/// torsions are drawn from a discretized Boltzmann distribution over the energy of the
/// partially grown system.
#[derive(Debug)]
pub struct FFAllAngleGeometryEngine {
    config: GeometryConfig,
    scanner: TorsionScanner,
    nproposed: usize,
    timings: GrowthTimings,
    recorded_pmfs: Vec<RecordedPmf>,
}

impl FFAllAngleGeometryEngine {
    pub fn new(config: GeometryConfig) -> Self {
        let scanner = TorsionScanner::new(config.n_torsion_divisions);
        Self {
            config,
            scanner,
            nproposed: 0,
            timings: GrowthTimings::default(),
            recorded_pmfs: Vec::new(),
        }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Number of forward proposals made so far.
    pub fn nproposed(&self) -> usize {
        self.nproposed
    }

    pub fn recorded_pmfs(&self) -> &[RecordedPmf] {
        &self.recorded_pmfs
    }

    pub fn take_recorded_pmfs(&mut self) -> Vec<RecordedPmf> {
        std::mem::take(&mut self.recorded_pmfs)
    }

    /// Runs the growth loop over the unique atoms of one side of `proposal`.
    ///
    /// Forward, `positions` holds the core atoms and receives the proposed atoms. Reverse,
    /// `positions` already holds every atom and is only read.
    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "debug", skip_all, fields(direction = %direction))]
    fn grow(
        &mut self,
        proposal: &TopologyProposal,
        direction: Direction,
        positions: &mut [Point3<f64>],
        other_positions: &[Point3<f64>],
        beta: f64,
        reporter: &ProgressReporter,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError> {
        let started = Instant::now();
        self.timings = GrowthTimings::default();

        let order = ProposalOrder::determine(proposal, direction, rng)?;
        let (system, forcefield, other_system, core_atoms): (_, _, _, Vec<usize>) =
            match direction {
                Direction::Forward => (
                    proposal.new_system(),
                    proposal.new_forcefield(),
                    proposal.old_system(),
                    proposal.new_to_old().keys().copied().collect(),
                ),
                Direction::Reverse => (
                    proposal.old_system(),
                    proposal.old_forcefield(),
                    proposal.new_system(),
                    proposal.old_to_new().keys().copied().collect(),
                ),
            };

        let growth = GrowthSystem::new(
            forcefield,
            order.growth_indices(system.atom_count()),
            self.config
                .use_sterics
                .then_some(self.config.sterics_cutoff),
        );

        let mut stage_output = match &self.config.stage_output {
            Some(output) => Some(StageWriter::open(
                &output.prefix,
                self.nproposed,
                direction,
                (other_system, other_positions),
                (system, &*positions),
                core_atoms,
            )?),
            None => None,
        };

        debug!(n_atoms = order.len(), "Growing unique atoms.");
        reporter.report(Progress::TaskStart {
            total: order.len() as u64,
        });
        let mut logp = order.logp_choice();
        for (k, &torsion) in order.steps().iter().enumerate() {
            let stage = k + 1;
            let Torsion {
                atom,
                bond_atom,
                angle_atom,
                torsion_atom,
            } = torsion;

            let bond = bond_length_distribution(forcefield, atom, bond_atom, beta)?;
            let angle = angle_distribution(forcefield, atom, bond_atom, angle_atom, beta)?;

            let (logp_r, logp_theta, logp_phi, detj, pmf) = match direction {
                Direction::Forward => {
                    let (r, logp_r) = bond.sample(rng);
                    let theta = angle.sample(rng);
                    let query = TorsionQuery {
                        growth: &growth,
                        positions,
                        torsion,
                        stage,
                        r,
                        theta,
                        beta,
                    };
                    let scan_started = Instant::now();
                    let (sample, pmf) = self.scanner.propose(&query, rng)?;
                    self.timings.torsion_scan += scan_started.elapsed();

                    let (xyz, detj) = internal_to_cartesian(
                        &positions[bond_atom],
                        &positions[angle_atom],
                        &positions[torsion_atom],
                        r,
                        theta,
                        sample.phi,
                    );
                    positions[atom] = xyz;
                    (logp_r, angle.log_density(theta), sample.logp, detj, pmf)
                }
                Direction::Reverse => {
                    let ((r, theta, phi), detj) = cartesian_to_internal(
                        &positions[atom],
                        &positions[bond_atom],
                        &positions[angle_atom],
                        &positions[torsion_atom],
                    );
                    let query = TorsionQuery {
                        growth: &growth,
                        positions,
                        torsion,
                        stage,
                        r,
                        theta,
                        beta,
                    };
                    let scan_started = Instant::now();
                    let (logp_phi, pmf) = self.scanner.logp(&query, phi)?;
                    self.timings.torsion_scan += scan_started.elapsed();
                    (
                        bond.log_density(r),
                        angle.log_density(theta),
                        logp_phi,
                        detj,
                        pmf,
                    )
                }
            };

            logp += logp_r + logp_theta + logp_phi + detj.ln();

            let energy_started = Instant::now();
            let energy = growth.energy(positions, stage);
            self.timings.energy += energy_started.elapsed();
            trace!(
                atom,
                %torsion,
                logp_r,
                logp_theta,
                logp_phi,
                log_detj = detj.ln(),
                stage_energy = energy.total(),
                "Atom grown."
            );

            if let Some(writer) = stage_output.as_mut() {
                writer.record_stage(system, positions, atom, stage, &pmf)?;
            }
            if self.config.record_pmfs {
                self.recorded_pmfs.push(RecordedPmf {
                    direction,
                    stage,
                    torsion,
                    pmf,
                });
            }
            reporter.report(Progress::TaskIncrement { amount: 1 });
        }
        reporter.report(Progress::TaskFinish);

        if let Some(writer) = stage_output {
            let final_structure =
                matches!(direction, Direction::Forward).then_some((system, &*positions));
            writer.finish(final_structure)?;
        }

        debug!(
            logp,
            torsion_scan_s = self.timings.torsion_scan.as_secs_f64(),
            energy_s = self.timings.energy.as_secs_f64(),
            total_s = started.elapsed().as_secs_f64(),
            "Growth finished."
        );
        self.timings = GrowthTimings::default();
        Ok(logp)
    }

    /// [`GeometryEngine::propose`], reporting one task increment per grown atom.
    pub fn propose_with_progress(
        &mut self,
        proposal: &TopologyProposal,
        current_positions: &[Point3<f64>],
        beta: f64,
        reporter: &ProgressReporter,
        rng: &mut dyn RngCore,
    ) -> Result<GeometryProposal, EngineError> {
        check_beta(beta)?;
        check_positions("old", current_positions, proposal.n_atoms_old())?;

        let mut new_positions = vec![Point3::origin(); proposal.n_atoms_new()];
        for (&new, &old) in proposal.new_to_old() {
            new_positions[new] = current_positions[old];
        }

        if proposal.unique_new_atoms().is_empty() {
            debug!("No unique new atoms; core positions copied.");
            return Ok(GeometryProposal {
                new_positions,
                logp: 0.0,
            });
        }

        let logp = self.grow(
            proposal,
            Direction::Forward,
            &mut new_positions,
            current_positions,
            beta,
            reporter,
            rng,
        )?;
        self.nproposed += 1;
        Ok(GeometryProposal {
            new_positions,
            logp,
        })
    }

    /// [`GeometryEngine::logp_reverse`], reporting one task increment per scored atom.
    pub fn logp_reverse_with_progress(
        &mut self,
        proposal: &TopologyProposal,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        reporter: &ProgressReporter,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError> {
        check_beta(beta)?;
        check_positions("new", new_positions, proposal.n_atoms_new())?;
        check_positions("old", old_positions, proposal.n_atoms_old())?;

        if proposal.unique_old_atoms().is_empty() {
            return Ok(0.0);
        }

        let mut positions = old_positions.to_vec();
        self.grow(
            proposal,
            Direction::Reverse,
            &mut positions,
            new_positions,
            beta,
            reporter,
            rng,
        )
    }
}

impl GeometryEngine for FFAllAngleGeometryEngine {
    fn propose(
        &mut self,
        proposal: &TopologyProposal,
        current_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut dyn RngCore,
    ) -> Result<GeometryProposal, EngineError> {
        self.propose_with_progress(
            proposal,
            current_positions,
            beta,
            &ProgressReporter::new(),
            rng,
        )
    }

    fn logp_reverse(
        &mut self,
        proposal: &TopologyProposal,
        new_positions: &[Point3<f64>],
        old_positions: &[Point3<f64>],
        beta: f64,
        rng: &mut dyn RngCore,
    ) -> Result<f64, EngineError> {
        self.logp_reverse_with_progress(
            proposal,
            new_positions,
            old_positions,
            beta,
            &ProgressReporter::new(),
            rng,
        )
    }
}

fn check_beta(beta: f64) -> Result<(), EngineError> {
    if beta.is_finite() && beta > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidBeta(beta))
    }
}

fn check_positions(
    which: &'static str,
    positions: &[Point3<f64>],
    expected: usize,
) -> Result<(), EngineError> {
    if positions.len() == expected {
        Ok(())
    } else {
        Err(EngineError::PositionCount {
            which,
            expected,
            found: positions.len(),
        })
    }
}

enum BondLength {
    Harmonic(HarmonicGaussian),
    Constrained(f64),
}

impl BondLength {
    fn sample(&self, rng: &mut dyn RngCore) -> (f64, f64) {
        match self {
            Self::Harmonic(gaussian) => {
                let r = gaussian.sample(rng);
                (r, gaussian.log_density(r))
            }
            Self::Constrained(distance) => (*distance, 0.0),
        }
    }

    fn log_density(&self, r: f64) -> f64 {
        match self {
            Self::Harmonic(gaussian) => gaussian.log_density(r),
            Self::Constrained(_) => 0.0,
        }
    }
}

/// A harmonic bond takes precedence over a constraint between the same atoms.
fn bond_length_distribution(
    forcefield: &ForcefieldParams,
    atom: usize,
    bond_atom: usize,
    beta: f64,
) -> Result<BondLength, EngineError> {
    if let Some(bond) = forcefield.harmonic_bond_between(atom, bond_atom) {
        if bond.k <= 0.0 {
            return Err(EngineError::InvalidForceConstant {
                term: "harmonic bond",
                atom,
                k: bond.k,
            });
        }
        return Ok(BondLength::Harmonic(HarmonicGaussian::from_harmonic(
            bond.length,
            bond.k,
            beta,
        )?));
    }
    forcefield
        .constraint_between(atom, bond_atom)
        .map(|constraint| BondLength::Constrained(constraint.distance))
        .ok_or(EngineError::MissingBondLength { atom, bond_atom })
}

fn angle_distribution(
    forcefield: &ForcefieldParams,
    atom: usize,
    bond_atom: usize,
    angle_atom: usize,
    beta: f64,
) -> Result<HarmonicGaussian, EngineError> {
    let angle = forcefield
        .harmonic_angle(atom, bond_atom, angle_atom)
        .ok_or(EngineError::MissingAngle {
            atom,
            bond_atom,
            angle_atom,
        })?;
    if angle.k <= 0.0 {
        return Err(EngineError::InvalidForceConstant {
            term: "harmonic angle",
            atom,
            k: angle.k,
        });
    }
    Ok(HarmonicGaussian::from_harmonic(angle.angle, angle.k, beta)?)
}

/// Writes the PDB trail of one growth run: the starting structure, one model per stage and
/// the torsion PMF of every grown atom.
struct StageWriter {
    prefix: PathBuf,
    stages: BufWriter<File>,
    pmfs: BufWriter<File>,
    positioned: Vec<usize>,
}

impl StageWriter {
    fn path(prefix: &Path, kind: &str) -> PathBuf {
        let mut name = prefix.as_os_str().to_os_string();
        name.push(format!("-{kind}.pdb"));
        PathBuf::from(name)
    }

    fn create(path: &Path) -> Result<BufWriter<File>, EngineError> {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|e| stage_error(path, e.into()))
    }

    fn open(
        prefix: &Path,
        nproposed: usize,
        direction: Direction,
        initial: (&MolecularSystem, &[Point3<f64>]),
        growing: (&MolecularSystem, &[Point3<f64>]),
        core_atoms: Vec<usize>,
    ) -> Result<Self, EngineError> {
        let mut run_prefix = prefix.as_os_str().to_os_string();
        run_prefix.push(format!("-{nproposed}-{direction}"));
        let prefix = PathBuf::from(run_prefix);

        let initial_path = Self::path(&prefix, "initial");
        let mut initial_file = Self::create(&initial_path)?;
        pdb::write_structure(&mut initial_file, initial.0, initial.1)
            .and_then(|_| initial_file.flush().map_err(PdbError::from))
            .map_err(|e| stage_error(&initial_path, e))?;

        let stages_path = Self::path(&prefix, "stages");
        let mut stages = Self::create(&stages_path)?;
        pdb::write_model(&mut stages, growing.0, growing.1, &core_atoms, 0)
            .map_err(|e| stage_error(&stages_path, e))?;

        let pmfs_path = Self::path(&prefix, "proposal");
        let mut pmfs = Self::create(&pmfs_path)?;
        writeln!(pmfs, "MODEL\nTER\nENDMDL").map_err(|e| stage_error(&pmfs_path, e.into()))?;

        Ok(Self {
            prefix,
            stages,
            pmfs,
            positioned: core_atoms,
        })
    }

    fn record_stage(
        &mut self,
        system: &MolecularSystem,
        positions: &[Point3<f64>],
        atom: usize,
        stage: usize,
        pmf: &TorsionPmf,
    ) -> Result<(), EngineError> {
        self.positioned.push(atom);
        pdb::write_model(&mut self.stages, system, positions, &self.positioned, stage)
            .map_err(|e| stage_error(&Self::path(&self.prefix, "stages"), e))?;
        pdb::write_pmf_model(&mut self.pmfs, atom, pmf.candidates(), pmf.logp())
            .map_err(|e| stage_error(&Self::path(&self.prefix, "proposal"), e))
    }

    fn finish(
        mut self,
        final_structure: Option<(&MolecularSystem, &[Point3<f64>])>,
    ) -> Result<(), EngineError> {
        self.stages
            .flush()
            .map_err(|e| stage_error(&Self::path(&self.prefix, "stages"), e.into()))?;
        self.pmfs
            .flush()
            .map_err(|e| stage_error(&Self::path(&self.prefix, "proposal"), e.into()))?;

        if let Some((system, positions)) = final_structure {
            let final_path = Self::path(&self.prefix, "final");
            let mut file = Self::create(&final_path)?;
            pdb::write_structure(&mut file, system, positions)
                .and_then(|_| file.flush().map_err(PdbError::from))
                .map_err(|e| stage_error(&final_path, e))?;
        }
        Ok(())
    }
}

fn stage_error(path: &Path, source: PdbError) -> EngineError {
    EngineError::StageOutput {
        path: path.display().to_string(),
        source,
    }
}
