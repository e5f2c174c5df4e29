use sidbsim::core::models::domain::{SweepAxis, SweepParameter};
use sidbsim::core::utils::identifiers::parse_sweep_parameter;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid axis '{0}'. Expected 'PARAM=MIN:MAX:STEP' (e.g., 'epsilon-r=1.0:10.0:0.1').")]
    InvalidAxisFormat(String),

    #[error("Unknown sweep parameter '{0}'. Expected 'epsilon-r', 'lambda-tf' or 'mu-minus'.")]
    UnknownParameter(String),

    #[error("Invalid number '{value}' for '{component}' in axis '{axis}'.")]
    InvalidNumber {
        component: &'static str,
        value: String,
        axis: String,
    },
}

pub fn parse_sweep_parameter_name(name: &str) -> Result<SweepParameter, ParseError> {
    parse_sweep_parameter(name).ok_or_else(|| ParseError::UnknownParameter(name.trim().to_string()))
}

/// Parses `PARAM=MIN:MAX:STEP`. Range checks are left to the domain configuration.
pub fn parse_axis(text: &str) -> Result<SweepAxis, ParseError> {
    let (name, range) = text
        .split_once('=')
        .ok_or_else(|| ParseError::InvalidAxisFormat(text.to_string()))?;
    let parameter = parse_sweep_parameter_name(name)?;

    let parts: Vec<&str> = range.split(':').collect();
    let [min, max, step] = parts.as_slice() else {
        return Err(ParseError::InvalidAxisFormat(text.to_string()));
    };
    let number = |component: &'static str, value: &str| {
        value.trim().parse::<f64>().map_err(|_| ParseError::InvalidNumber {
            component,
            value: value.trim().to_string(),
            axis: text.to_string(),
        })
    };
    Ok(SweepAxis::new(
        parameter,
        number("min", min)?,
        number("max", max)?,
        number("step", step)?,
    ))
}
