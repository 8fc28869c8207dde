use std::{path::PathBuf, time::Duration};

use clap::Parser;
use color_eyre::eyre;
use gasbench_proxy::control::{ControlDir, DEFAULT_RESUME_POLL, ResumeOutcome, resume};

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ResumeCmd {
    /// Payload directory holding `_control/` (defaults to the configured one)
    #[clap(long)]
    pub payload_dir: Option<PathBuf>,

    /// How long to wait for the proxy to consume the resume signal
    #[clap(long, default_value_t = 300)]
    pub timeout_secs: u64,
}

impl ResumeCmd {
    pub async fn run(&self, payload_dir: PathBuf) -> eyre::Result<()> {
        let control = ControlDir::new(&payload_dir);
        let (request, outcome) =
            resume(&control, Duration::from_secs(self.timeout_secs), DEFAULT_RESUME_POLL).await?;

        if outcome == ResumeOutcome::Acknowledged {
            println!("{} {}", request.token, request.scenario);
        }
        Ok(())
    }
}
