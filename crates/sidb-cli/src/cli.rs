use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "SiDB Simulation Developers",
    version,
    about = "sidb - Charge-distribution simulation, operational domains and critical temperatures of silicon dangling bond layouts.",
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

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the physically valid charge configurations and the ground state of a layout.
    Simulate(SimulateArgs),
    /// Explore the operational domain of a gate over two physical parameters.
    Opdom(OpdomArgs),
    /// Determine the critical temperature of a gate or a plain layout.
    Temperature(TemperatureArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Exhaustive enumeration of every charge configuration
    Exgs,
    /// Randomized local search
    Quicksim,
    /// Exact search with physically motivated pruning
    Quickexact,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Grid,
    Random,
    FloodFill,
    Contour,
}

/// Overrides for the `[physics]` table of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct PhysicsArgs {
    /// Relative permittivity of the surface.
    #[arg(long, value_name = "FLOAT")]
    pub epsilon_r: Option<f64>,

    /// Thomas-Fermi screening length in nm.
    #[arg(long, value_name = "FLOAT")]
    pub lambda_tf: Option<f64>,

    /// (0/-) charge transition level in eV.
    #[arg(long, value_name = "FLOAT", allow_hyphen_values = true)]
    pub mu_minus: Option<f64>,

    /// Number of charge states per site (2 or 3).
    #[arg(long, value_name = "INT")]
    pub base: Option<u8>,
}

/// Overrides for the `[engine]` table of the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Ground-state search algorithm.
    #[arg(short, long, value_enum)]
    pub engine: Option<EngineKind>,

    /// QuickSim: total number of search rounds.
    #[arg(long, value_name = "INT")]
    pub iteration_steps: Option<u64>,

    /// QuickSim: wall-clock limit in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// QuickSim: seed of the random number generators.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the layout description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub physics: PhysicsArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of lowest-energy configurations to print.
    #[arg(short = 'n', long, default_value_t = 5, value_name = "INT")]
    pub show: usize,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S physics.mu-minus=-0.28
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug)]
pub struct OpdomArgs {
    /// Path to the gate description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path of the CSV file the domain is written to.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub physics: PhysicsArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Swept x axis, e.g. 'epsilon-r=1.0:10.0:0.1'.
    #[arg(short = 'x', long, value_name = "PARAM=MIN:MAX:STEP", allow_hyphen_values = true)]
    pub x_axis: Option<String>,

    /// Swept y axis, e.g. 'lambda-tf=1.0:10.0:0.1'.
    #[arg(short = 'y', long, value_name = "PARAM=MIN:MAX:STEP", allow_hyphen_values = true)]
    pub y_axis: Option<String>,

    /// Exploration strategy.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyKind>,

    /// Number of random samples for the sampling-based strategies.
    #[arg(long, value_name = "INT")]
    pub samples: Option<usize>,

    /// Treat BDL wires that do not carry their signal as failures.
    #[arg(long)]
    pub reject_kinks: bool,

    /// Record the critical temperature of every point.
    #[arg(long)]
    pub critical_temperature: bool,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TemperatureArgs {
    /// Path to the layout or gate description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub physics: PhysicsArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Required probability of occupying a correct state.
    #[arg(long, value_name = "FLOAT")]
    pub confidence_level: Option<f64>,

    /// Upper end of the temperature scan in K.
    #[arg(long, value_name = "KELVIN")]
    pub max_temperature: Option<f64>,

    /// Ignore the gate description and treat every excited state as erroneous.
    #[arg(long)]
    pub non_gate_based: bool,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
