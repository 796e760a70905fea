//! CLI subcommand implementations for the doi-harvest binary.

pub mod doctor;
pub mod fetch_cmd;
pub mod output;
