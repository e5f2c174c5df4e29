//! Reading layout descriptions and exporting operational domains.
//!
//! Layouts and gate designs are described in TOML (see [`layout_file`]);
//! explored domains are written as CSV tables (see [`domain_csv`]).

pub mod domain_csv;
pub mod layout_file;
