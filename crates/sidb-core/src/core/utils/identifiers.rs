use crate::core::lattice::Lattice;
use crate::core::models::domain::SweepParameter;
use phf::{Map, phf_map};

static SWEEP_PARAMETER_NAMES: Map<&'static str, SweepParameter> = phf_map! {
    "epsilon_r" => SweepParameter::EpsilonR, "eps_r" => SweepParameter::EpsilonR,
    "er" => SweepParameter::EpsilonR, "epsilonr" => SweepParameter::EpsilonR,
    "lambda_tf" => SweepParameter::LambdaTf, "lambdatf" => SweepParameter::LambdaTf,
    "lambda" => SweepParameter::LambdaTf, "tf" => SweepParameter::LambdaTf,
    "mu_minus" => SweepParameter::MuMinus, "mu_neg" => SweepParameter::MuMinus,
    "mu" => SweepParameter::MuMinus, "muminus" => SweepParameter::MuMinus,
};

static LATTICE_NAMES: Map<&'static str, Lattice> = phf_map! {
    "si_100" => Lattice::Si100, "si100" => Lattice::Si100, "100" => Lattice::Si100,
    "si_111" => Lattice::Si111, "si111" => Lattice::Si111, "111" => Lattice::Si111,
};

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Resolves a sweep parameter from its canonical name or a common alias.
pub fn parse_sweep_parameter(name: &str) -> Option<SweepParameter> {
    SWEEP_PARAMETER_NAMES.get(normalize(name).as_str()).copied()
}

pub fn parse_lattice(name: &str) -> Option<Lattice> {
    LATTICE_NAMES.get(normalize(name).as_str()).copied()
}
