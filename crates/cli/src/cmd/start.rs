use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::eyre;
use gasbench_execution::ExecutionClient;
use gasbench_proxy::StatefulProxy;
use tracing::{info, trace};

use crate::config::Config;

#[derive(Parser, Debug, Clone, Default, PartialEq)]
pub struct StartCmd {
    /// Override the listen address, e.g. 127.0.0.1:8549
    #[clap(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Override the payload output directory
    #[clap(long)]
    pub payload_dir: Option<PathBuf>,
}

impl StartCmd {
    pub fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(dir) = &self.payload_dir {
            config.payload_dir = dir.clone();
        }
    }

    /// Runs the proxy until Ctrl-C.
    pub async fn run(&self, config: Config) -> eyre::Result<()> {
        let options = config.proxy_options()?;
        trace!(?options, "Proxy options");

        let client = ExecutionClient::new(config.execution_config())?;
        let mut proxy = StatefulProxy::new(options, client.engine());

        info!(engine = %config.engine_url, "Proxy is starting...");
        proxy.start().await?;

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");
        proxy.stop().await;
        info!("Proxy has stopped");
        Ok(())
    }
}
