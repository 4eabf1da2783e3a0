use crate::core::models::proposal::TopologyProposal;
use crate::engine::config::ProposeConfig;
use crate::engine::error::EngineError;
use crate::engine::geometry_engine::{FFAllAngleGeometryEngine, RecordedPmf};
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Point3;
use rand::RngCore;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct ProposalOutcome {
    /// Positions of every atom of the new system, in nm.
    pub new_positions: Vec<Point3<f64>>,
    /// Log-probability of proposing the unique new atoms.
    pub logp_forward: f64,
    /// Log-probability of proposing the unique old atoms from the new state, if evaluated.
    pub logp_reverse: Option<f64>,
    /// `logp_reverse - logp_forward`, the geometry contribution to the log acceptance ratio.
    pub log_acceptance_correction: Option<f64>,
    /// Torsion PMFs of both directions, when PMF recording is enabled.
    pub torsion_pmfs: Vec<RecordedPmf>,
}

#[instrument(skip_all, name = "propose_workflow")]
pub fn run(
    proposal: &TopologyProposal,
    old_positions: &[Point3<f64>],
    config: &ProposeConfig,
    reporter: &ProgressReporter,
    rng: &mut dyn RngCore,
) -> Result<ProposalOutcome, EngineError> {
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    if old_positions.len() != proposal.n_atoms_old() {
        return Err(EngineError::PositionCount {
            which: "old",
            expected: proposal.n_atoms_old(),
            found: old_positions.len(),
        });
    }
    let beta = config.beta();
    if !(beta.is_finite() && beta > 0.0) {
        return Err(EngineError::InvalidBeta(beta));
    }
    info!(
        n_new = proposal.n_atoms_new(),
        n_old = proposal.n_atoms_old(),
        unique_new = proposal.unique_new_atoms().len(),
        unique_old = proposal.unique_old_atoms().len(),
        temperature = config.temperature,
        "Starting geometry proposal."
    );
    let mut engine = FFAllAngleGeometryEngine::new(config.geometry.clone());
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Forward proposal ===
    reporter.report(Progress::PhaseStart {
        name: "Forward proposal",
    });
    reporter.report(Progress::StatusUpdate {
        text: format!("Growing {} atoms", proposal.unique_new_atoms().len()),
    });
    let forward = engine.propose_with_progress(proposal, old_positions, beta, reporter, rng)?;
    info!(logp = forward.logp, "Forward proposal complete.");
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Reverse evaluation (optional) ===
    let logp_reverse = if config.compute_reverse {
        reporter.report(Progress::PhaseStart {
            name: "Reverse evaluation",
        });
        reporter.report(Progress::StatusUpdate {
            text: format!("Scoring {} atoms", proposal.unique_old_atoms().len()),
        });
        let logp = engine.logp_reverse_with_progress(
            proposal,
            &forward.new_positions,
            old_positions,
            beta,
            reporter,
            rng,
        )?;
        info!(logp, "Reverse evaluation complete.");
        reporter.report(Progress::PhaseFinish);
        Some(logp)
    } else {
        None
    };

    Ok(ProposalOutcome {
        log_acceptance_correction: logp_reverse.map(|reverse| reverse - forward.logp),
        new_positions: forward.new_positions,
        logp_forward: forward.logp,
        logp_reverse,
        torsion_pmfs: engine.take_recorded_pmfs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{ForcefieldParams, HarmonicAngleParam, HarmonicBondParam};
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::system::MolecularSystem;
    use crate::core::models::topology::BondOrder;
    use crate::engine::config::{GeometryConfigBuilder, ProposeConfigBuilder};
    use crate::engine::order::Direction;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Mutex;

    fn chain(n: usize, last: Element) -> (MolecularSystem, ForcefieldParams) {
        let mut system = MolecularSystem::new();
        for i in 0..n {
            let element = if i + 1 == n { last } else { Element::CARBON };
            system.add_atom(Atom::new(&format!("X{}", i + 1), element, "MOL", 1));
        }
        for i in 1..n {
            system.add_bond(i - 1, i, BondOrder::Single).unwrap();
        }
        let forcefield = ForcefieldParams {
            harmonic_bonds: (1..n)
                .map(|i| HarmonicBondParam {
                    atoms: [i - 1, i],
                    length: 0.15,
                    k: 250000.0,
                })
                .collect(),
            harmonic_angles: (2..n)
                .map(|i| HarmonicAngleParam {
                    atoms: [i - 2, i - 1, i],
                    angle: 1.91,
                    k: 500.0,
                })
                .collect(),
            ..Default::default()
        };
        (system, forcefield)
    }

    /// Butanol-like old state and butane-like new state sharing the first three carbons.
    fn mutation() -> TopologyProposal {
        let (old, old_ff) = chain(4, Element::OXYGEN);
        let (new, new_ff) = chain(4, Element::CARBON);
        TopologyProposal::new(
            old,
            old_ff,
            new,
            new_ff,
            [(0, 0), (1, 1), (2, 2)].into_iter().collect(),
        )
        .unwrap()
    }

    fn old_positions() -> Vec<Point3<f64>> {
        vec![
            Point3::new(-0.125, 0.086, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.15, 0.0, 0.0),
            Point3::new(0.2, 0.14, 0.03),
        ]
    }

    fn config(compute_reverse: bool) -> ProposeConfig {
        ProposeConfigBuilder::new()
            .temperature(300.0)
            .compute_reverse(compute_reverse)
            .geometry(
                GeometryConfigBuilder::new()
                    .n_torsion_divisions(36)
                    .record_pmfs(true)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn run_reports_phases_and_combines_both_directions() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::PhaseStart { name } = event {
                phases.lock().unwrap().push(name);
            }
        }));

        let outcome = run(
            &mutation(),
            &old_positions(),
            &config(true),
            &reporter,
            &mut StdRng::seed_from_u64(4),
        )
        .unwrap();
        drop(reporter);

        assert_eq!(
            phases.into_inner().unwrap(),
            vec!["Preparation", "Forward proposal", "Reverse evaluation"]
        );
        let reverse = outcome.logp_reverse.unwrap();
        assert!(outcome.logp_forward.is_finite() && reverse.is_finite());
        assert!(
            (outcome.log_acceptance_correction.unwrap() - (reverse - outcome.logp_forward)).abs()
                < 1e-12
        );
        assert_eq!(outcome.new_positions.len(), 4);
        assert_eq!(&outcome.new_positions[..3], &old_positions()[..3]);

        let directions: Vec<Direction> = outcome
            .torsion_pmfs
            .iter()
            .map(|pmf| pmf.direction)
            .collect();
        assert_eq!(directions, vec![Direction::Forward, Direction::Reverse]);
    }

    #[test]
    fn run_reports_one_task_increment_per_grown_atom() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            let label = match event {
                Progress::TaskStart { total } => format!("start {total}"),
                Progress::TaskIncrement { amount } => format!("inc {amount}"),
                Progress::TaskFinish => "finish".to_string(),
                _ => return,
            };
            events.lock().unwrap().push(label);
        }));

        run(
            &mutation(),
            &old_positions(),
            &config(true),
            &reporter,
            &mut StdRng::seed_from_u64(11),
        )
        .unwrap();
        drop(reporter);

        // One unique atom grown forward, one scored in reverse.
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[..3], ["start 1", "inc 1", "finish"]);
        assert_eq!(events[3..], events[..3]);
    }

    #[test]
    fn run_skips_reverse_evaluation_when_disabled() {
        let outcome = run(
            &mutation(),
            &old_positions(),
            &config(false),
            &ProgressReporter::new(),
            &mut StdRng::seed_from_u64(4),
        )
        .unwrap();
        assert!(outcome.logp_reverse.is_none());
        assert!(outcome.log_acceptance_correction.is_none());
        assert_eq!(outcome.torsion_pmfs.len(), 1);
    }

    #[test]
    fn run_rejects_mismatched_positions() {
        let err = run(
            &mutation(),
            &old_positions()[..3],
            &config(true),
            &ProgressReporter::new(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::PositionCount {
                which: "old",
                expected: 4,
                found: 3
            }
        ));
    }
}
