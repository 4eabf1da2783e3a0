use crate::cli::ProposeArgs;
use crate::config::PartialProposeConfig;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use perses::core::io::pdb::{PdbFile, PdbMetadata};
use perses::core::io::pmf::write_pmf_csv_to_path;
use perses::core::io::proposal_file;
use perses::core::io::traits::MolecularFile;
use perses::engine::progress::ProgressReporter;
use perses::workflows::{self, propose::ProposalOutcome};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(args: ProposeArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialProposeConfig::from_file(path)?,
        None => PartialProposeConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args)?;

    info!("Loading topology proposal from {:?}", &args.input);
    let loaded = proposal_file::load(&args.input)?;
    let old_positions = loaded.old_positions.ok_or_else(|| {
        CliError::Argument(format!(
            "Proposal '{}' has no old positions: set `old-positions` or add `positions` to the old system file.",
            args.input.display()
        ))
    })?;

    let mut rng = match args.seed {
        Some(seed) => {
            info!("Seeding the random number generator with {}.", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting geometry proposal...");
    info!("Invoking the core proposal workflow...");

    let outcome = tokio::task::block_in_place(|| {
        workflows::propose::run(
            &loaded.proposal,
            &old_positions,
            &final_config,
            &reporter,
            &mut rng,
        )
    })?;

    let metadata = PdbMetadata {
        positions: outcome.new_positions.clone(),
        remarks: summary_remarks(&outcome, final_config.temperature),
    };
    PdbFile::write_to_path(loaded.proposal.new_system(), &metadata, &args.output)
        .map_err(|e| CliError::FileParsing {
            path: args.output.clone(),
            source: e.into(),
        })?;
    println!("✓ Proposed structure written to: {}", args.output.display());

    if let Some(csv_path) = &args.pmf_csv {
        let rows = outcome.torsion_pmfs.iter().flat_map(|pmf| pmf.rows());
        write_pmf_csv_to_path(csv_path, rows).map_err(|e| CliError::FileParsing {
            path: csv_path.clone(),
            source: e.into(),
        })?;
        println!(
            "✓ {} torsion PMF(s) written to: {}",
            outcome.torsion_pmfs.len(),
            csv_path.display()
        );
    }

    for line in summary_remarks(&outcome, final_config.temperature) {
        println!("  {}", line);
    }

    Ok(())
}

fn summary_remarks(outcome: &ProposalOutcome, temperature: f64) -> Vec<String> {
    let mut remarks = vec![
        format!("temperature = {:.2} K", temperature),
        format!("logp_forward = {:.6}", outcome.logp_forward),
    ];
    if let Some(reverse) = outcome.logp_reverse {
        remarks.push(format!("logp_reverse = {:.6}", reverse));
    }
    if let Some(correction) = outcome.log_acceptance_correction {
        remarks.push(format!("log_acceptance_correction = {:.6}", correction));
    }
    remarks
}
