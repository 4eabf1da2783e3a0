use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "perses CLI - Force-field based geometry proposals for alchemical transformations between related molecules.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for the parallel torsion scans.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Propose positions for the new atoms of a topology proposal and score the move.
    Propose(ProposeArgs),
    /// Show the order in which unique atoms would be grown, without placing them.
    Order(OrderArgs),
}

/// Arguments for the `propose` subcommand.
#[derive(Args, Debug)]
pub struct ProposeArgs {
    // --- Core Arguments ---
    /// Path to the topology proposal file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output PDB file with the proposed new structure.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Thermodynamic Overrides ---
    /// Override the temperature in kelvin.
    #[arg(short = 'T', long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Skip the reverse evaluation, overriding the config file.
    #[arg(long)]
    pub no_reverse: bool,

    // --- Geometry Overrides ---
    /// Override `geometry.use-sterics` from the config file.
    #[command(flatten)]
    pub sterics: StericsFlags,

    /// Override the number of torsion bins per scan.
    #[arg(long, value_name = "INT")]
    pub torsion_divisions: Option<usize>,

    /// Override the sterics cutoff in nm.
    #[arg(long, value_name = "NM")]
    pub sterics_cutoff: Option<f64>,

    // --- Output Overrides ---
    /// Write per-stage PDB trajectories with this path prefix.
    #[arg(long, value_name = "PREFIX")]
    pub stage_pdb_prefix: Option<PathBuf>,

    /// Write every torsion PMF evaluated during the proposal to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub pmf_csv: Option<PathBuf>,

    // --- Randomness ---
    /// Seed the random number generator for a reproducible proposal.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S geometry.torsion-divisions=720
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive boolean flags for the growth sterics.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct StericsFlags {
    /// Include Lennard-Jones and Coulomb terms in the torsion scans.
    #[arg(long)]
    pub sterics: bool,
    /// Scan torsions with valence terms only.
    #[arg(long)]
    pub no_sterics: bool,
}

/// Arguments for the `order` subcommand.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Path to the topology proposal file (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Show the order for deleting the unique old atoms instead.
    #[arg(long)]
    pub reverse: bool,

    /// Seed the random torsion choice.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}
