//! Merge command implementation

use anyhow::Result;
use clap::Args;
use shiori_core::{merge_positions, Position};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{open_output, write_json};
use crate::input::FileReader;
use crate::logging::init_logging;

/// Arguments for the merge command
#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Positions saved on this device (JSON object keyed by book id)
    #[arg(short, long, value_name = "FILE")]
    pub local: PathBuf,

    /// Positions fetched from another device
    #[arg(short, long, value_name = "FILE")]
    pub remote: PathBuf,

    /// Id of this device
    #[arg(short, long, value_name = "ID")]
    pub device: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Do not report conflicts
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl MergeArgs {
    /// Execute the merge command
    pub fn execute(&self) -> Result<()> {
        init_logging(self.verbose, self.quiet);

        let local: BTreeMap<String, Position> = FileReader::read_json(&self.local)?;
        let remote: BTreeMap<String, Position> = FileReader::read_json(&self.remote)?;
        log::info!(
            "merging {} local and {} remote positions",
            local.len(),
            remote.len()
        );

        let (merged, conflicts) = merge_positions(local, remote, &self.device);

        if !self.quiet {
            for conflict in &conflicts {
                eprintln!(
                    "conflict: {} {} local={} remote={} -> {}",
                    conflict.book_id,
                    conflict.field,
                    conflict.local_value,
                    conflict.remote_value,
                    conflict.resolution
                );
            }
        }

        let mut writer = open_output(self.output.as_deref())?;
        write_json(&mut *writer, &merged, true)
    }
}
