//! Owns every piece of proxy state and the background tasks driving it.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use color_eyre::eyre;
use gasbench_execution::EngineApi;
use tokio::{
    net::TcpListener,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

use crate::{
    artifacts::ArtifactStore,
    batcher::Batcher,
    hooks::InterceptionHooks,
    pause::PauseCoordinator,
    producer::{Producer, ProducerOptions},
    registry::ScenarioRegistry,
    server,
};

#[derive(Debug, Clone)]
pub struct ProxyOptions {
    pub listen_addr: SocketAddr,
    /// The node's plain JSON-RPC endpoint every request is forwarded to.
    pub rpc_direct: Url,
    pub payload_dir: PathBuf,
    pub quiet_period: Duration,
    /// Tick of the quiet-period monitor and the resume watcher.
    pub poll_interval: Duration,
    pub prime_overlay: bool,
    pub overlay_confirmation_scenarios: Vec<String>,
    pub producer: ProducerOptions,
}

pub struct StatefulProxy {
    options: ProxyOptions,
    registry: Arc<ScenarioRegistry>,
    batcher: Arc<Batcher>,
    pause: Arc<PauseCoordinator>,
    producer: Arc<Producer>,
    hooks: Arc<InterceptionHooks>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl StatefulProxy {
    pub fn new(options: ProxyOptions, engine: Arc<dyn EngineApi>) -> Self {
        let cancel = CancellationToken::new();
        let registry = Arc::new(ScenarioRegistry::new(&options.payload_dir));
        let batcher = Arc::new(Batcher::new(options.quiet_period));
        let pause = Arc::new(
            PauseCoordinator::new(
                &options.payload_dir,
                options.prime_overlay,
                options.overlay_confirmation_scenarios.iter().cloned(),
            )
            .with_shutdown(cancel.clone()),
        );
        let producer = Arc::new(Producer::new(
            engine,
            ArtifactStore::new(&options.payload_dir),
            Arc::clone(&registry),
            Arc::clone(&pause),
            options.producer.clone(),
        ));
        let hooks = Arc::new(InterceptionHooks::new(
            Arc::clone(&batcher),
            Arc::clone(&producer),
            Arc::clone(&pause),
        ));

        Self {
            options,
            registry,
            batcher,
            pause,
            producer,
            hooks,
            cancel,
            tasks: Vec::new(),
        }
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<ScenarioRegistry> {
        &self.registry
    }

    pub fn batcher(&self) -> &Arc<Batcher> {
        &self.batcher
    }

    pub fn pause(&self) -> &Arc<PauseCoordinator> {
        &self.pause
    }

    pub fn producer(&self) -> &Arc<Producer> {
        &self.producer
    }

    pub fn hooks(&self) -> &Arc<InterceptionHooks> {
        &self.hooks
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Binds the listener and starts the server plus both background tasks.
    pub async fn start(&mut self) -> eyre::Result<SocketAddr> {
        let listener = TcpListener::bind(self.options.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let app = server::router(Arc::clone(&self.hooks), self.options.rpc_direct.clone())?;

        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = server::serve(listener, app, cancel).await {
                error!("Proxy server failed: {e:#}");
            }
        }));
        self.spawn_background();

        info!(
            address = %local_addr,
            upstream = %self.options.rpc_direct,
            payload_dir = %self.options.payload_dir.display(),
            "Stateful proxy started"
        );
        Ok(local_addr)
    }

    /// Starts the quiet-period monitor and the resume watcher without serving HTTP.
    pub fn spawn_background(&mut self) {
        let poll = self.options.poll_interval;

        let (batcher, producer, pause, cancel) = (
            Arc::clone(&self.batcher),
            Arc::clone(&self.producer),
            Arc::clone(&self.pause),
            self.cancel.clone(),
        );
        self.tasks.push(tokio::spawn(run_quiet_monitor(batcher, producer, pause, poll, cancel)));

        let (pause, cancel) = (Arc::clone(&self.pause), self.cancel.clone());
        self.tasks.push(tokio::spawn(run_resume_watcher(pause, poll, cancel)));
    }

    /// Stops every task and drops whatever is still buffered. Requests held by a pause are
    /// released with an error instead of being forwarded.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("Proxy task failed: {e}");
            }
        }
        self.batcher.discard();
        info!("Stateful proxy stopped");
    }
}

async fn run_quiet_monitor(
    batcher: Arc<Batcher>,
    producer: Arc<Producer>,
    pause: Arc<PauseCoordinator>,
    poll: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                // The node may be mid-swap; whatever is buffered waits for the resume.
                if pause.is_paused() {
                    continue;
                }
                if let Some(batch) = batcher.take_if_quiet(Instant::now()) {
                    debug!(target: "production", scenario = %batch.key, txs = batch.len(), "Quiet period elapsed");
                    producer.produce(batch).await;
                }
            }
        }
    }
}

async fn run_resume_watcher(pause: Arc<PauseCoordinator>, poll: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                pause.poll_resume();
            }
        }
    }
}
