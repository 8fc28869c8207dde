use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre;
use gasbench_proxy::suffix::append_suffix;
use tracing::info;

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct SuffixCmd {
    /// Gas value, e.g. `100` (becomes `100M`) or `60M`
    pub value: String,

    /// Payload directory (defaults to the configured one)
    #[clap(long)]
    pub payload_dir: Option<PathBuf>,
}

impl SuffixCmd {
    pub fn run(&self, payload_dir: &Path) -> eyre::Result<()> {
        let renamed = append_suffix(payload_dir, &self.value)?;
        info!(count = renamed.len(), dir = %payload_dir.display(), "Renamed payload files");
        Ok(())
    }
}
