use super::coord::SiteCoord;
use super::layout::{LayoutError, SidbLayout, SiteRole};
use std::fmt;
use std::str::FromStr;

/// Single-output Boolean function stored as its column of output bits.
///
/// Bit `i` is the output for the input assignment whose variable `j` equals
/// bit `j` of `i`. The textual form lists bits most-significant first, so the
/// identity function reads `"10"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TruthTable {
    num_vars: u32,
    bits: Vec<bool>,
}

impl TruthTable {
    pub fn from_binary(text: &str) -> Result<Self, LayoutError> {
        let invalid = |reason: &str| LayoutError::InvalidTruthTable {
            table: text.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = text.trim();
        if trimmed.is_empty() || !trimmed.len().is_power_of_two() {
            return Err(invalid("length must be a power of two"));
        }
        let bits = trimmed
            .chars()
            .rev()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(invalid("only '0' and '1' are allowed")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            num_vars: bits.len().trailing_zeros(),
            bits,
        })
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn num_bits(&self) -> u64 {
        self.bits.len() as u64
    }

    pub fn bit(&self, assignment: u64) -> bool {
        self.bits[assignment as usize]
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().rev() {
            write!(f, "{}", if *bit { '1' } else { '0' })?;
        }
        Ok(())
    }
}

/// The two alternative perturber positions that drive one primary input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPerturbers {
    pub zero: SiteCoord,
    pub one: SiteCoord,
}

/// Binary-dot logic pair. Logic `1` is encoded as `upper` neutral and `lower`
/// negative, logic `0` as the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdlPair {
    pub upper: SiteCoord,
    pub lower: SiteCoord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireSignal {
    Input(usize),
    Output(usize),
}

impl FromStr for WireSignal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, index) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'input:<n>' or 'output:<n>', got '{}'", s))?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|_| format!("invalid signal index in '{}'", s))?;
        match kind.trim() {
            "input" => Ok(WireSignal::Input(index)),
            "output" => Ok(WireSignal::Output(index)),
            other => Err(format!("unknown signal kind '{}'", other)),
        }
    }
}

/// A chain of BDL pairs that all carry the same signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BdlWire {
    pub signal: WireSignal,
    pub pairs: Vec<BdlPair>,
}

/// A gate-level SiDB design: the layout body, how inputs are applied and
/// where outputs are read, together with the intended Boolean function.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDesign {
    body: SidbLayout,
    inputs: Vec<InputPerturbers>,
    outputs: Vec<BdlPair>,
    wires: Vec<BdlWire>,
    truth_tables: Vec<TruthTable>,
}

impl GateDesign {
    pub fn new(
        body: SidbLayout,
        inputs: Vec<InputPerturbers>,
        outputs: Vec<BdlPair>,
        wires: Vec<BdlWire>,
        truth_tables: Vec<TruthTable>,
    ) -> Result<Self, LayoutError> {
        if truth_tables.is_empty() {
            return Err(LayoutError::InvalidGate(
                "at least one truth table is required".to_string(),
            ));
        }
        if truth_tables.len() != outputs.len() {
            return Err(LayoutError::InvalidGate(format!(
                "{} truth table(s) but {} output pair(s)",
                truth_tables.len(),
                outputs.len()
            )));
        }
        if let Some(tt) = truth_tables
            .iter()
            .find(|tt| tt.num_vars() as usize != inputs.len())
        {
            return Err(LayoutError::InvalidGate(format!(
                "truth table '{}' has {} variable(s) but the gate has {} input(s)",
                tt,
                tt.num_vars(),
                inputs.len()
            )));
        }
        for perturbers in &inputs {
            for coord in [perturbers.zero, perturbers.one] {
                if body.index_of(coord).is_some() {
                    return Err(LayoutError::InvalidGate(format!(
                        "input perturber {} overlaps a body site",
                        coord
                    )));
                }
            }
        }
        let pairs = outputs.iter().chain(wires.iter().flat_map(|w| w.pairs.iter()));
        for pair in pairs {
            for coord in [pair.upper, pair.lower] {
                body.index_of(coord).ok_or(LayoutError::UnknownSite(coord))?;
            }
        }
        for wire in &wires {
            let in_range = match wire.signal {
                WireSignal::Input(i) => i < inputs.len(),
                WireSignal::Output(o) => o < outputs.len(),
            };
            if !in_range {
                return Err(LayoutError::InvalidGate(format!(
                    "wire signal {:?} does not exist",
                    wire.signal
                )));
            }
        }
        Ok(Self {
            body,
            inputs,
            outputs,
            wires,
            truth_tables,
        })
    }

    pub fn body(&self) -> &SidbLayout {
        &self.body
    }

    pub fn inputs(&self) -> &[InputPerturbers] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[BdlPair] {
        &self.outputs
    }

    pub fn wires(&self) -> &[BdlWire] {
        &self.wires
    }

    pub fn truth_tables(&self) -> &[TruthTable] {
        &self.truth_tables
    }

    pub fn num_patterns(&self) -> u64 {
        1u64 << self.inputs.len()
    }

    #[inline]
    pub fn input_bit(pattern: u64, input: usize) -> bool {
        (pattern >> input) & 1 == 1
    }

    /// The layout that is simulated for one input pattern: the body plus one
    /// perturber per input.
    pub fn pattern_layout(&self, pattern: u64) -> Result<SidbLayout, LayoutError> {
        let perturbers = self.inputs.iter().enumerate().map(|(i, p)| {
            let coord = if Self::input_bit(pattern, i) {
                p.one
            } else {
                p.zero
            };
            (coord, SiteRole::Input)
        });
        self.body.with_additional_sites(perturbers)
    }

    pub fn expected_signal(&self, pattern: u64, signal: WireSignal) -> bool {
        match signal {
            WireSignal::Input(i) => Self::input_bit(pattern, i),
            WireSignal::Output(o) => self.truth_tables[o].bit(pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lattice::Lattice;

    fn wire_body() -> SidbLayout {
        SidbLayout::from_coords(Lattice::Si100, [(5, 0, 0), (7, 0, 0)]).unwrap()
    }

    fn identity_design() -> GateDesign {
        GateDesign::new(
            wire_body(),
            vec![InputPerturbers {
                zero: SiteCoord::new(-10, 0, 0),
                one: SiteCoord::new(2, 0, 0),
            }],
            vec![BdlPair {
                upper: SiteCoord::new(5, 0, 0),
                lower: SiteCoord::new(7, 0, 0),
            }],
            vec![],
            vec![TruthTable::from_binary("10").unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn truth_table_parses_most_significant_bit_first() {
        let and = TruthTable::from_binary("1000").unwrap();
        assert_eq!(and.num_vars(), 2);
        assert_eq!(and.num_bits(), 4);
        assert!(and.bit(3));
        assert!(!and.bit(0));
        assert_eq!(and.to_string(), "1000");
    }

    #[test]
    fn truth_table_rejects_invalid_text() {
        assert!(TruthTable::from_binary("101").is_err());
        assert!(TruthTable::from_binary("1x").is_err());
        assert!(TruthTable::from_binary("").is_err());
    }

    #[test]
    fn wire_signal_parses_kind_and_index() {
        assert_eq!("input:1".parse::<WireSignal>(), Ok(WireSignal::Input(1)));
        assert_eq!("output: 0".parse::<WireSignal>(), Ok(WireSignal::Output(0)));
        assert!("clock:0".parse::<WireSignal>().is_err());
        assert!("input".parse::<WireSignal>().is_err());
    }

    #[test]
    fn pattern_layout_adds_selected_perturber() {
        let design = identity_design();
        let zero = design.pattern_layout(0).unwrap();
        let one = design.pattern_layout(1).unwrap();
        assert_eq!(zero.num_sites(), 3);
        assert!(zero.index_of(SiteCoord::new(-10, 0, 0)).is_some());
        assert!(one.index_of(SiteCoord::new(2, 0, 0)).is_some());
        assert_eq!(one.sites_with_role(SiteRole::Input).count(), 1);
    }

    #[test]
    fn expected_signal_reads_inputs_and_truth_table() {
        let design = identity_design();
        assert!(!design.expected_signal(0, WireSignal::Output(0)));
        assert!(design.expected_signal(1, WireSignal::Output(0)));
        assert!(design.expected_signal(1, WireSignal::Input(0)));
    }

    #[test]
    fn new_rejects_output_pair_outside_body() {
        let result = GateDesign::new(
            wire_body(),
            vec![],
            vec![BdlPair {
                upper: SiteCoord::new(5, 0, 0),
                lower: SiteCoord::new(99, 0, 0),
            }],
            vec![],
            vec![TruthTable::from_binary("1").unwrap()],
        );
        assert!(matches!(result, Err(LayoutError::UnknownSite(_))));
    }

    #[test]
    fn new_rejects_mismatched_variable_count() {
        let result = GateDesign::new(
            wire_body(),
            vec![],
            vec![BdlPair {
                upper: SiteCoord::new(5, 0, 0),
                lower: SiteCoord::new(7, 0, 0),
            }],
            vec![],
            vec![TruthTable::from_binary("10").unwrap()],
        );
        assert!(matches!(result, Err(LayoutError::InvalidGate(_))));
    }
}
