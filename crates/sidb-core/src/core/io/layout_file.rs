use crate::core::lattice::Lattice;
use crate::core::models::coord::SiteCoord;
use crate::core::models::gate::{BdlPair, BdlWire, GateDesign, InputPerturbers, TruthTable};
use crate::core::models::layout::{Defect, LayoutError, SidbLayout, SiteRole};
use crate::core::physics::constants::{DEFAULT_EPSILON_R, DEFAULT_LAMBDA_TF};
use crate::core::utils::identifiers::parse_lattice;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawLayoutFile {
    lattice: Option<String>,
    #[serde(default)]
    global_potential: f64,
    #[serde(default)]
    sites: Vec<RawSite>,
    #[serde(default)]
    defects: Vec<RawDefect>,
    #[serde(default)]
    external_potentials: Vec<RawExternalPotential>,
    gate: Option<RawGate>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSite {
    x: i64,
    y: i64,
    #[serde(default)]
    z: u8,
    #[serde(default)]
    role: SiteRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawDefect {
    x: i64,
    y: i64,
    #[serde(default)]
    z: u8,
    charge: i32,
    #[serde(default = "default_epsilon_r")]
    epsilon_r: f64,
    #[serde(default = "default_lambda_tf")]
    lambda_tf: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExternalPotential {
    x: i64,
    y: i64,
    #[serde(default)]
    z: u8,
    potential: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawGate {
    truth_table: Vec<String>,
    #[serde(default)]
    inputs: Vec<RawPerturbers>,
    outputs: Vec<RawPair>,
    #[serde(default)]
    wires: Vec<RawWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPerturbers {
    zero: SiteCoord,
    one: SiteCoord,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPair {
    upper: SiteCoord,
    lower: SiteCoord,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWire {
    signal: String,
    pairs: Vec<RawPair>,
}

fn default_epsilon_r() -> f64 {
    DEFAULT_EPSILON_R
}

fn default_lambda_tf() -> f64 {
    DEFAULT_LAMBDA_TF
}

impl From<RawPair> for BdlPair {
    fn from(raw: RawPair) -> Self {
        BdlPair {
            upper: raw.upper,
            lower: raw.lower,
        }
    }
}

/// Contents of a layout description file.
#[derive(Debug, Clone)]
pub struct LayoutFile {
    pub layout: SidbLayout,
    /// Present when the file carries a `[gate]` table; its body is `layout`.
    pub gate: Option<GateDesign>,
}

pub fn load_layout_file(path: &Path) -> Result<LayoutFile, LayoutError> {
    let origin = path.to_string_lossy().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| LayoutError::Io {
        path: origin.clone(),
        source: e,
    })?;
    parse_layout_file(&content, &origin)
}

/// Parses a layout description. `origin` names the source in error messages.
pub fn parse_layout_file(content: &str, origin: &str) -> Result<LayoutFile, LayoutError> {
    let raw: RawLayoutFile = toml::from_str(content).map_err(|e| LayoutError::Toml {
        path: origin.to_string(),
        source: e,
    })?;

    let lattice = match raw.lattice.as_deref() {
        Some(name) => {
            parse_lattice(name).ok_or_else(|| LayoutError::UnknownLattice(name.to_string()))?
        }
        None => Lattice::default(),
    };
    let mut layout = SidbLayout::new(lattice);
    for site in raw.sites {
        layout.add_site(SiteCoord::new(site.x, site.y, site.z), site.role)?;
    }
    for defect in raw.defects {
        layout.add_defect(Defect::new(
            SiteCoord::new(defect.x, defect.y, defect.z),
            defect.charge,
            defect.epsilon_r,
            defect.lambda_tf,
        ))?;
    }
    for ext in raw.external_potentials {
        layout.set_external_potential(SiteCoord::new(ext.x, ext.y, ext.z), ext.potential)?;
    }
    layout.set_global_potential(raw.global_potential);

    let gate = raw
        .gate
        .map(|gate| build_gate(layout.clone(), gate))
        .transpose()?;

    Ok(LayoutFile { layout, gate })
}

fn build_gate(body: SidbLayout, raw: RawGate) -> Result<GateDesign, LayoutError> {
    let truth_tables = raw
        .truth_table
        .iter()
        .map(|t| TruthTable::from_binary(t))
        .collect::<Result<Vec<_>, _>>()?;
    let inputs = raw
        .inputs
        .into_iter()
        .map(|p| InputPerturbers {
            zero: p.zero,
            one: p.one,
        })
        .collect();
    let outputs = raw.outputs.into_iter().map(BdlPair::from).collect();
    let wires = raw
        .wires
        .into_iter()
        .map(|w| {
            let signal = w.signal.parse().map_err(LayoutError::InvalidGate)?;
            Ok(BdlWire {
                signal,
                pairs: w.pairs.into_iter().map(BdlPair::from).collect(),
            })
        })
        .collect::<Result<Vec<_>, LayoutError>>()?;
    GateDesign::new(body, inputs, outputs, wires, truth_tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::gate::WireSignal;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const WIRE_GATE: &str = r#"
        lattice = "si-100"

        [[sites]]
        x = 0
        y = 0

        [[sites]]
        x = 2
        y = 0
        role = "output"

        [[sites]]
        x = 4
        y = 0
        role = "output"

        [gate]
        truth-table = ["10"]

        [[gate.inputs]]
        zero = { x = -10, y = 0 }
        one = { x = -2, y = 0 }

        [[gate.outputs]]
        upper = { x = 2, y = 0 }
        lower = { x = 4, y = 0 }

        [[gate.wires]]
        signal = "output:0"
        pairs = [{ upper = { x = 2, y = 0 }, lower = { x = 4, y = 0 } }]
    "#;

    #[test]
    fn parse_layout_file_reads_sites_defects_and_potentials() {
        let content = r#"
            lattice = "si-111"
            global-potential = -0.1

            [[sites]]
            x = 1
            y = 2
            z = 1

            [[sites]]
            x = 5
            y = 0

            [[defects]]
            x = 10
            y = 0
            charge = -1
            epsilon-r = 9.7
            lambda-tf = 2.1

            [[external-potentials]]
            x = 5
            y = 0
            potential = 0.05
        "#;
        let file = parse_layout_file(content, "inline").unwrap();
        let layout = &file.layout;
        assert_eq!(layout.lattice(), Lattice::Si111);
        assert_eq!(layout.num_sites(), 2);
        assert_eq!(layout.coord(0), Some(SiteCoord::new(1, 2, 1)));
        assert_eq!(layout.defects().len(), 1);
        assert_eq!(layout.defects()[0].epsilon_r, 9.7);
        assert_eq!(layout.external_potential(SiteCoord::new(5, 0, 0)), 0.05);
        assert_eq!(layout.global_potential(), -0.1);
        assert!(file.gate.is_none());
    }

    #[test]
    fn parse_layout_file_builds_gate_description() {
        let file = parse_layout_file(WIRE_GATE, "inline").unwrap();
        let gate = file.gate.expect("gate table should be parsed");
        assert_eq!(gate.inputs().len(), 1);
        assert_eq!(gate.outputs().len(), 1);
        assert_eq!(gate.wires()[0].signal, WireSignal::Output(0));
        assert_eq!(gate.body().sites_with_role(SiteRole::Output).count(), 2);
    }

    #[test]
    fn defect_screening_defaults_apply_when_omitted() {
        let content = r#"
            [[defects]]
            x = 3
            y = 3
            charge = 1
        "#;
        let file = parse_layout_file(content, "inline").unwrap();
        let defect = file.layout.defects()[0];
        assert_eq!(defect.epsilon_r, DEFAULT_EPSILON_R);
        assert_eq!(defect.lambda_tf, DEFAULT_LAMBDA_TF);
    }

    #[test]
    fn unknown_keys_are_rejected_as_toml_errors() {
        let content = "lattice = \"si-100\"\nfoo = 1\n";
        let result = parse_layout_file(content, "inline");
        assert!(matches!(result, Err(LayoutError::Toml { .. })));
    }

    #[test]
    fn gate_output_referencing_missing_site_is_rejected() {
        let content = r#"
            [[sites]]
            x = 0
            y = 0

            [gate]
            truth-table = ["1"]

            [[gate.outputs]]
            upper = { x = 0, y = 0 }
            lower = { x = 7, y = 0 }
        "#;
        let result = parse_layout_file(content, "inline");
        assert!(matches!(result, Err(LayoutError::UnknownSite(_))));
    }

    #[test]
    fn invalid_wire_signal_is_reported() {
        let content = WIRE_GATE.replace("output:0", "clock:0");
        let result = parse_layout_file(&content, "inline");
        assert!(matches!(result, Err(LayoutError::InvalidGate(_))));
    }

    #[test]
    fn lattice_aliases_are_accepted_and_unknown_names_rejected() {
        let file = parse_layout_file("lattice = \"Si(111)\"\n", "inline");
        assert!(matches!(file, Err(LayoutError::UnknownLattice(_))));
        let file = parse_layout_file("lattice = \"111\"\n", "inline").unwrap();
        assert_eq!(file.layout.lattice(), Lattice::Si111);
        let file = parse_layout_file("", "inline").unwrap();
        assert_eq!(file.layout.lattice(), Lattice::Si100);
    }

    #[test]
    fn load_layout_file_reads_from_disk() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("gate.toml");
        let mut file = File::create(&file_path).unwrap();
        write!(file, "{}", WIRE_GATE).unwrap();

        let loaded = load_layout_file(&file_path).unwrap();
        assert_eq!(loaded.layout.num_sites(), 3);
        assert!(loaded.gate.is_some());
    }

    #[test]
    fn load_layout_file_fails_for_missing_file() {
        let result = load_layout_file(Path::new("non_existent_layout.toml"));
        assert!(matches!(result, Err(LayoutError::Io { .. })));
    }
}
