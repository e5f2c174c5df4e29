use super::progress_handler;
use crate::cli::OpdomArgs;
use crate::config::{DomainSettings, PartialConfig};
use crate::error::{CliError, Result};
use sidbsim::core::io::domain_csv::save_domain_csv;
use sidbsim::core::io::layout_file::load_layout_file;
use sidbsim::core::models::domain::OperationalDomain;
use sidbsim::core::models::gate::GateDesign;
use sidbsim::engine::progress::ProgressReporter;
use sidbsim::workflows::operational_domain::{self, DomainStats};
use tracing::info;

pub async fn run(args: OpdomArgs, quiet: bool) -> Result<()> {
    let config = PartialConfig::load(args.config.as_deref(), &args.set_values)?;
    info!("Merging configuration from file and CLI arguments...");
    let settings = config.merge_domain_args(&args)?;

    let gate = load_gate(&args)?;
    let progress = progress_handler(quiet);
    let reporter = ProgressReporter::with_callback(progress.get_callback());

    println!(
        "Exploring {} x {} with {}...",
        settings.domain.x_axis.parameter,
        settings.domain.y_axis.parameter,
        settings.domain.strategy.name()
    );
    let (domain, stats) = tokio::task::block_in_place(|| explore(&gate, &settings, &reporter))?;

    save_domain_csv(&domain, &args.output)?;
    print!("{}", render_stats(&domain, &stats));
    println!("✓ Operational domain written to: {}", args.output.display());
    Ok(())
}

fn load_gate(args: &OpdomArgs) -> Result<GateDesign> {
    info!("Loading gate description from {:?}", &args.input);
    load_layout_file(&args.input)?.gate.ok_or_else(|| {
        CliError::Argument(format!(
            "'{}' has no [gate] table; an operational domain needs a gate description.",
            args.input.display()
        ))
    })
}

pub fn explore(
    gate: &GateDesign,
    settings: &DomainSettings,
    reporter: &ProgressReporter,
) -> Result<(OperationalDomain, DomainStats)> {
    let explored = match &settings.critical_temperature {
        Some(temperature) => operational_domain::critical_temperature_domain(
            gate,
            &settings.domain,
            temperature,
            reporter,
        ),
        None => {
            operational_domain::gate_domain(gate, &settings.domain, &settings.operational, reporter)
        }
    }?;
    Ok(explored)
}

pub fn render_stats(domain: &OperationalDomain, stats: &DomainStats) -> String {
    let (nx, ny) = domain.grid_size();
    format!(
        "Grid points:            {}\n\
         Evaluated points:       {}\n\
         Operational points:     {}\n\
         Non-operational points: {}\n\
         Simulator invocations:  {}\n\
         Runtime:                {:.3} s\n",
        nx * ny,
        stats.evaluated_points,
        stats.operational_points,
        stats.non_operational_points,
        stats.simulator_invocations,
        stats.runtime.as_secs_f64()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::commands::fixtures::{IDENTITY_GATE, THREE_SITES, write_file};
    use clap::Parser;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> OpdomArgs {
        match Cli::parse_from(args).command {
            Commands::Opdom(args) => args,
            _ => panic!("Expected 'opdom' subcommand"),
        }
    }

    #[test]
    fn grid_search_over_identity_gate_writes_csv() {
        let dir = tempdir().unwrap();
        let input = write_file(&dir, "gate.toml", IDENTITY_GATE);
        let output = dir.path().join("domain.csv");
        let args = parse(&[
            "sidb",
            "opdom",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-x",
            "epsilon-r=5.0:6.0:1.0",
            "-y",
            "mu-minus=-0.45:-0.25:0.1",
            "-e",
            "exgs",
        ]);

        let settings = PartialConfig::default().merge_domain_args(&args).unwrap();
        let gate = load_gate(&args).unwrap();
        let (domain, stats) = explore(&gate, &settings, &ProgressReporter::new()).unwrap();
        save_domain_csv(&domain, &output).unwrap();

        assert_eq!(stats.evaluated_points, 6);
        assert_eq!(stats.operational_points, 3);
        assert_eq!(stats.non_operational_points, 3);

        let csv = std::fs::read_to_string(&output).unwrap();
        assert_eq!(csv.lines().count(), 7);
        assert_eq!(csv.lines().filter(|l| l.contains(",1,")).count(), 3);

        let report = render_stats(&domain, &stats);
        assert!(report.contains("Operational points:     3"));
    }

    #[test]
    fn layout_without_gate_is_rejected() {
        let dir = tempdir().unwrap();
        let input = write_file(&dir, "layout.toml", THREE_SITES);
        let args = parse(&[
            "sidb",
            "opdom",
            "-i",
            input.to_str().unwrap(),
            "-o",
            "unused.csv",
        ]);
        assert!(matches!(load_gate(&args), Err(CliError::Argument(_))));
    }
}
