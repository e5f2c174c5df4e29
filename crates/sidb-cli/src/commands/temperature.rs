use super::progress_handler;
use crate::cli::TemperatureArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use sidbsim::core::io::layout_file::{LayoutFile, load_layout_file};
use sidbsim::core::physics::params::SimulationParameters;
use sidbsim::engine::config::CriticalTemperatureConfig;
use sidbsim::engine::progress::ProgressReporter;
use sidbsim::workflows::temperature::{self, CriticalTemperatureResult};
use tracing::{info, warn};

pub async fn run(args: TemperatureArgs, quiet: bool) -> Result<()> {
    let config = PartialConfig::load(args.config.as_deref(), &args.set_values)?;
    let (params, ct_config) = config.merge_temperature_args(&args)?;

    info!("Loading layout from {:?}", &args.input);
    let file = load_layout_file(&args.input)?;

    let progress = progress_handler(quiet);
    let reporter = ProgressReporter::with_callback(progress.get_callback());

    let result = tokio::task::block_in_place(|| {
        evaluate(&file, args.non_gate_based, &params, &ct_config, &reporter)
    })?;
    print!("{}", render_result(&result));
    Ok(())
}

/// Gate-based evaluation when the file describes a gate, unless disabled.
pub fn evaluate(
    file: &LayoutFile,
    non_gate_based: bool,
    params: &SimulationParameters,
    config: &CriticalTemperatureConfig,
    reporter: &ProgressReporter,
) -> Result<CriticalTemperatureResult> {
    let result = match (&file.gate, non_gate_based) {
        (Some(gate), false) => temperature::gate_based(gate, params, config, reporter),
        (gate, _) => {
            if gate.is_none() && !non_gate_based {
                warn!("No [gate] table found; treating every excited state as erroneous.");
            }
            temperature::non_gate_based(&file.layout, params, config, reporter)
        }
    }?;
    Ok(result)
}

pub fn render_result(result: &CriticalTemperatureResult) -> String {
    let gap = result
        .energy_gap_to_first_erroneous
        .map(|g| format!("{:.6} eV", g))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "Engine:                {}\n\
         Critical temperature:  {:.2} K\n\
         Ground state correct:  {}\n\
         Gap to first error:    {}\n\
         Simulator invocations: {}\n",
        result.algorithm_name,
        result.critical_temperature,
        if result.ground_state_correct { "yes" } else { "no" },
        gap,
        result.simulator_invocations
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::{IDENTITY_GATE, THREE_SITES, write_file};
    use tempfile::tempdir;

    fn load(content: &str) -> LayoutFile {
        let dir = tempdir().unwrap();
        let path = write_file(&dir, "input.toml", content);
        load_layout_file(&path).unwrap()
    }

    #[test]
    fn gate_files_are_evaluated_per_input_pattern() {
        let file = load(IDENTITY_GATE);
        let result = evaluate(
            &file,
            false,
            &SimulationParameters::default(),
            &CriticalTemperatureConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.simulator_invocations, 2);
        assert_eq!(result.critical_temperature, 400.0);
        assert!(render_result(&result).contains("Critical temperature:  400.00 K"));
    }

    #[test]
    fn plain_layouts_fall_back_to_non_gate_based_evaluation() {
        let file = load(THREE_SITES);
        let params = SimulationParameters {
            mu_minus: -0.28,
            ..Default::default()
        };
        let result = evaluate(
            &file,
            false,
            &params,
            &CriticalTemperatureConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(result.simulator_invocations, 1);
        assert!((result.critical_temperature - 94.36).abs() < 0.02);
        assert!(render_result(&result).contains("Gap to first error:    0.0373"));
    }
}
