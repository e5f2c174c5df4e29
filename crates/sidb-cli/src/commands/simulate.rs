use super::progress_handler;
use crate::cli::SimulateArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use sidbsim::core::io::layout_file::load_layout_file;
use sidbsim::core::models::charge::format_charges;
use sidbsim::core::models::layout::SidbLayout;
use sidbsim::engine::progress::ProgressReporter;
use sidbsim::engine::result::SimulationResult;
use sidbsim::workflows;
use std::fmt;
use tracing::{info, warn};

pub async fn run(args: SimulateArgs, quiet: bool) -> Result<()> {
    let config = PartialConfig::load(args.config.as_deref(), &args.set_values)?;
    let params = config.resolve_parameters(&args.physics)?;
    let engine = config.resolve_engine(&args.engine)?;

    info!("Loading layout from {:?}", &args.input);
    let file = load_layout_file(&args.input)?;

    let progress = progress_handler(quiet);
    let reporter = ProgressReporter::with_callback(progress.get_callback());

    println!(
        "Simulating {} sites with {}...",
        file.layout.num_sites(),
        engine.name()
    );
    let result = tokio::task::block_in_place(|| {
        workflows::simulate::run(&file.layout, &params, &engine, &reporter)
    })?;

    if result.charge_distributions.is_empty() {
        warn!("No physically valid charge configuration was found.");
    }
    print!("{}", render_summary(&file.layout, &result, args.show));
    Ok(())
}

/// Human-readable report of a simulation: statistics, energy levels and the
/// `show` lowest-energy configurations.
pub struct SimulationSummary<'a> {
    pub layout: &'a SidbLayout,
    pub result: &'a SimulationResult,
    pub show: usize,
}

impl fmt::Display for SimulationSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        writeln!(f, "Engine:               {}", result.algorithm_name)?;
        writeln!(
            f,
            "Runtime:              {:.3} s",
            result.runtime.as_secs_f64()
        )?;
        writeln!(f, "Valid configurations: {}", result.num_valid())?;
        if result.stats.timed_out {
            writeln!(f, "Search stopped at the time limit.")?;
        }
        for (name, value) in &result.additional_parameters {
            writeln!(f, "{:<22}{}", format!("{}:", name), value)?;
        }

        let distribution = result.energy_distribution();
        if let Some(&(ground, degeneracy)) = distribution.levels().first() {
            writeln!(
                f,
                "Ground state:         {:.6} eV ({}-fold)",
                ground, degeneracy
            )?;
        }

        if self.show == 0 || result.charge_distributions.is_empty() {
            return Ok(());
        }
        let sites: Vec<String> = (0..self.layout.num_sites())
            .filter_map(|i| self.layout.coord(i))
            .map(|c| c.to_string())
            .collect();
        writeln!(f, "Sites: {}", sites.join(" "))?;
        writeln!(f, "{:>4}  {:>12}  charges", "#", "energy [eV]")?;
        for (rank, surface) in result
            .charge_distributions
            .iter()
            .take(self.show)
            .enumerate()
        {
            writeln!(
                f,
                "{:>4}  {:>12.6}  {}",
                rank + 1,
                surface.system_energy(),
                format_charges(surface.charges())
            )?;
        }
        Ok(())
    }
}

pub fn render_summary(layout: &SidbLayout, result: &SimulationResult, show: usize) -> String {
    SimulationSummary {
        layout,
        result,
        show,
    }
    .to_string()
}
