use std::path::Path;

use clap::Parser;
use color_eyre::eyre;
use gasbench_execution::ExecutionClient;
use gasbench_proxy::prepare::{self, DEFAULT_GAS_BUMP_RUNS, PreparationOptions};
use tracing::{info, warn};

use crate::config::{Config, save_config};

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PrepareCmd {
    /// Number of empty gas bump blocks
    #[clap(long, default_value_t = DEFAULT_GAS_BUMP_RUNS)]
    pub runs: usize,

    /// Fee recipient of the funding block
    #[clap(long)]
    pub funding_recipient: String,

    /// Store the funding block hash as `finalized_block` in the configuration file
    #[clap(long)]
    pub update_config: bool,
}

impl PrepareCmd {
    pub async fn run(&self, mut config: Config, config_file: &Path) -> eyre::Result<()> {
        let client = ExecutionClient::new(config.execution_config())?;
        let options = PreparationOptions {
            payload_dir: config.payload_dir.clone(),
            gas_bump_runs: self.runs,
            funding_recipient: self.funding_recipient.clone(),
        };

        let report = prepare::generate(client.engine().as_ref(), &options).await?;
        info!(gas_bump_blocks = report.gas_bump_blocks, requested = self.runs, "Preparation finished");

        let Some(block) = report.funding_block else {
            warn!("No funding block produced; finalized block left unchanged");
            return Ok(());
        };
        println!("{block}");

        if self.update_config {
            config.finalized_block = block.to_string();
            save_config(config_file, &config)?;
            info!(file = %config_file.display(), %block, "Stored finalized block");
        }
        Ok(())
    }
}
