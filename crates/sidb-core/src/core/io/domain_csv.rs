use crate::core::models::domain::OperationalDomain;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainExportError {
    #[error("CSV writing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Writes one row per visited point, ordered by step coordinates.
pub fn write_domain_csv<W: Write>(
    domain: &OperationalDomain,
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        domain.x_axis().parameter.name(),
        domain.y_axis().parameter.name(),
        "operational",
        "value",
    ])?;
    for (_, point, record) in domain.iter() {
        let operational = if record.status.is_operational() { "1" } else { "0" };
        let value = record.value.map(format_value).unwrap_or_default();
        csv_writer.write_record([
            format_value(point.x).as_str(),
            format_value(point.y).as_str(),
            operational,
            value.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_domain_csv(domain: &OperationalDomain, path: &Path) -> Result<(), DomainExportError> {
    let origin = path.to_string_lossy().to_string();
    let file = std::fs::File::create(path).map_err(|e| DomainExportError::Io {
        path: origin.clone(),
        source: e,
    })?;
    write_domain_csv(domain, file).map_err(|e| DomainExportError::Csv {
        path: origin,
        source: e,
    })
}

// Sweep values accumulate rounding noise (0.30000000000000004); print them
// at a fixed precision with trailing zeros removed.
fn format_value(value: f64) -> String {
    let text = format!("{:.10}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::domain::{
        DomainRecord, OperationalStatus, StepPoint, SweepAxis, SweepParameter,
    };
    use tempfile::tempdir;

    fn sample_domain() -> OperationalDomain {
        let mut domain = OperationalDomain::new(
            SweepAxis::new(SweepParameter::EpsilonR, 5.0, 6.0, 0.1),
            SweepAxis::new(SweepParameter::LambdaTf, 1.0, 2.0, 0.5),
        );
        domain.record(
            StepPoint::new(3, 1),
            DomainRecord {
                status: OperationalStatus::NonOperational,
                value: None,
            },
        );
        domain.record(
            StepPoint::new(0, 0),
            DomainRecord {
                status: OperationalStatus::Operational,
                value: Some(27.5),
            },
        );
        domain
    }

    #[test]
    fn format_value_trims_rounding_noise() {
        assert_eq!(format_value(0.1 + 0.2), "0.3");
        assert_eq!(format_value(5.0), "5");
        assert_eq!(format_value(-0.32), "-0.32");
        assert_eq!(format_value(-0.0), "0");
    }

    #[test]
    fn write_domain_csv_emits_header_and_sorted_rows() {
        let mut buffer = Vec::new();
        write_domain_csv(&sample_domain(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epsilon_r,lambda_tf,operational,value");
        assert_eq!(lines[1], "5,1,1,27.5");
        assert_eq!(lines[2], "5.3,1.5,0,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn save_domain_csv_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("domain.csv");
        save_domain_csv(&sample_domain(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("epsilon_r,lambda_tf,operational,value"));
    }
}
