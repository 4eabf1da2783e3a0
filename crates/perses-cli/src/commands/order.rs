use crate::cli::OrderArgs;
use crate::error::Result;
use perses::core::io::proposal_file;
use perses::core::models::system::MolecularSystem;
use perses::engine::order::{Direction, ProposalOrder};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

pub async fn run(args: OrderArgs) -> Result<()> {
    info!("Loading topology proposal from {:?}", &args.input);
    let loaded = proposal_file::load(&args.input)?;
    let proposal = &loaded.proposal;

    let direction = if args.reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let order = ProposalOrder::determine(proposal, direction, &mut rng)
        .map_err(perses::engine::error::EngineError::from)?;
    let system = match direction {
        Direction::Forward => proposal.new_system(),
        Direction::Reverse => proposal.old_system(),
    };

    println!(
        "{} growth order ({} atoms, logp_choice = {:.6}):",
        direction,
        order.len(),
        order.logp_choice()
    );
    for line in describe(&order, system) {
        println!("  {}", line);
    }
    Ok(())
}

/// One line per growth stage: stage number, grown atom and the torsion that places it.
fn describe(order: &ProposalOrder, system: &MolecularSystem) -> Vec<String> {
    let name = |index: usize| {
        system
            .atom(index)
            .map_or_else(|| format!("#{}", index), |atom| atom.name.clone())
    };
    order
        .steps()
        .iter()
        .enumerate()
        .map(|(k, torsion)| {
            let names: Vec<String> = torsion.atoms().iter().map(|&i| name(i)).collect();
            format!(
                "{:>3}  {:<6} via {} ({})",
                k + 1,
                name(torsion.atom),
                names.join("-"),
                torsion
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn demo_proposal() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../demos/ethanol-to-propane/proposal.toml")
    }

    #[test]
    fn describes_forward_order_of_demo_proposal() {
        let loaded = proposal_file::load(&demo_proposal()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let order =
            ProposalOrder::determine(&loaded.proposal, Direction::Forward, &mut rng).unwrap();

        assert_eq!(order.logp_choice(), 0.0);
        let lines = describe(&order, loaded.proposal.new_system());
        assert_eq!(
            lines,
            vec![
                "  1  C3     via C3-C2-C1-H11 (3-2-1-0)".to_string(),
                "  2  H31    via H31-C3-C2-C1 (4-3-2-1)".to_string(),
                "  3  H32    via H32-C3-C2-C1 (5-3-2-1)".to_string(),
            ]
        );
    }

    #[test]
    fn describes_reverse_order_with_old_atom_names() {
        let loaded = proposal_file::load(&demo_proposal()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let order =
            ProposalOrder::determine(&loaded.proposal, Direction::Reverse, &mut rng).unwrap();

        let lines = describe(&order, loaded.proposal.old_system());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("O1     via O1-C2-C1-H11"));
        assert!(lines[1].contains("HO     via HO-O1-C2-C1"));
    }
}
