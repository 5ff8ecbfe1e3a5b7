//! The concurrent dispatch engine: startup, the select loop, and shutdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::account::AccountPipes;
use crate::block_details::BlockDetailsPipes;
use crate::datasource::Datasource;
use crate::deletion::DeletionPipes;
use crate::error::PipelineResult;
use crate::identifiers::SourceId;
use crate::instruction::{nest_instructions, InstructionPipes, NestedInstruction};
use crate::transaction::{extract_instructions_with_metadata, extract_transaction_metadata};
use crate::transaction_pipe::TransactionPipes;
use crate::update::{Carrier, Update};

pub const DEFAULT_CHANNEL_BUFFER: usize = 1000;
pub const DEFAULT_METRICS_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// How the engine behaves once a shutdown signal is observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShutdownStrategy {
    /// Keep draining the carrier channel until all sources have wound down
    /// and it closes naturally.
    #[default]
    ProcessPending,
    /// Stop as soon as the signal is observed, leaving buffered updates
    /// undelivered.
    Immediate,
}

/// The assembled engine, ready to `run`. Built via
/// [`crate::builder::PipelineBuilder`].
pub struct Pipeline {
    pub(crate) sources: Vec<(SourceId, Arc<dyn Datasource>)>,
    pub(crate) account_pipes: Vec<Arc<dyn AccountPipes>>,
    pub(crate) instruction_pipes: Vec<Arc<dyn InstructionPipes>>,
    pub(crate) transaction_pipes: Vec<Arc<dyn TransactionPipes>>,
    pub(crate) deletion_pipes: Vec<Arc<dyn DeletionPipes>>,
    pub(crate) block_details_pipes: Vec<Arc<dyn BlockDetailsPipes>>,
    pub(crate) metrics: flowline_metrics::MetricsCollection,
    pub(crate) shutdown_strategy: ShutdownStrategy,
    pub(crate) channel_buffer_size: usize,
    pub(crate) metrics_flush_interval: Duration,
}

impl Pipeline {
    /// Runs the engine until cancelled, signalled, or every source
    /// completes. Returns the terminal cause.
    #[tracing::instrument(skip(self, parent))]
    pub async fn run(&self, parent: CancellationToken) -> PipelineResult<()> {
        self.metrics.initialize().await?;

        let child = parent.child_token();
        let (tx, mut rx) = mpsc::channel::<Carrier>(self.channel_buffer_size);

        let mut handles = Vec::with_capacity(self.sources.len());
        for (source_id, source) in &self.sources {
            let source = source.clone();
            let source_id = source_id.clone();
            let sender = tx.clone();
            let cancellation = child.clone();
            let metrics = self.metrics.clone();
            handles.push(tokio::spawn(async move {
                let id_for_log = source_id.clone();
                if let Err(err) = source.consume(source_id, sender, cancellation, metrics).await {
                    error!(source = %id_for_log, error = %err, "data source terminated with an error");
                }
            }));
        }
        // The engine's own clone must be dropped so the channel can close
        // once every source's clone has also dropped, i.e. once the joiner
        // below observes all of them finished.
        drop(tx);

        tokio::spawn(async move {
            for handle in handles {
                let _ = handle.await;
            }
        });

        let mut ticker = tokio::time::interval(self.metrics_flush_interval);
        ticker.tick().await; // first tick fires immediately; consume it so the cadence starts from `now`.

        let mut signals = OsSignals::install();

        loop {
            tokio::select! {
                _ = parent.cancelled() => {
                    debug!("branch taken: parent context cancelled");
                    self.shutdown("parent context cancelled").await;
                    return Ok(());
                }
                signal = signals.recv() => {
                    info!(signal, "branch taken: received shutdown signal");
                    child.cancel();
                    if self.shutdown_strategy == ShutdownStrategy::Immediate {
                        self.shutdown("immediate shutdown on signal").await;
                        return Ok(());
                    }
                }
                _ = ticker.tick() => {
                    debug!("branch taken: metrics ticker fired");
                    self.metrics.flush().await;
                }
                received = rx.recv() => {
                    match received {
                        Some(carrier) => {
                            debug!(family = carrier.update.family(), "branch taken: carrier received");
                            self.metrics.gauge_set(flowline_metrics::names::UPDATES_QUEUED, rx.len() as f64);
                            self.dispatch(carrier).await;
                        }
                        None => {
                            warn!("branch taken: carrier channel closed");
                            self.shutdown("carrier channel closed").await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, carrier: Carrier) {
        self.metrics.counter_add(flowline_metrics::names::UPDATES_RECEIVED, 1);

        let start = Instant::now();
        let result = self.process(carrier).await;
        let elapsed = start.elapsed();

        self.metrics.histogram_record(flowline_metrics::names::UPDATES_PROCESS_TIME_NANOSECONDS, elapsed.as_nanos() as f64);
        self.metrics.histogram_record(flowline_metrics::names::UPDATES_PROCESS_TIME_MILLISECONDS, elapsed.as_millis() as f64);

        match result {
            Ok(()) => self.metrics.counter_add(flowline_metrics::names::UPDATES_SUCCESSFUL, 1),
            Err(err) => {
                error!(error = %err, "processor failed; abandoning this update");
                self.metrics.counter_add(flowline_metrics::names::UPDATES_FAILED, 1);
            }
        }
        self.metrics.counter_add(flowline_metrics::names::UPDATES_PROCESSED, 1);
    }

    #[tracing::instrument(skip(self, carrier))]
    async fn process(&self, carrier: Carrier) -> PipelineResult<()> {
        match &carrier.update {
            Update::Account(account) => {
                for pipe in &self.account_pipes {
                    pipe.run(&carrier, account).await?;
                }
                self.metrics.counter_add(flowline_metrics::names::ACCOUNT_UPDATES_PROCESSED, 1);
                Ok(())
            }
            Update::Transaction(record) => {
                let metadata = extract_transaction_metadata(record);
                let flat = extract_instructions_with_metadata(record);
                let forest = nest_instructions(flat);

                for node in &forest {
                    self.run_instruction_pipes(&carrier, node).await?;
                }
                for pipe in &self.transaction_pipes {
                    pipe.run(&carrier, &metadata, &forest).await?;
                }
                self.metrics.counter_add(flowline_metrics::names::TRANSACTION_UPDATES_PROCESSED, 1);
                Ok(())
            }
            Update::AccountDeletion(deletion) => {
                for pipe in &self.deletion_pipes {
                    pipe.run(&carrier, deletion).await?;
                }
                self.metrics.counter_add(flowline_metrics::names::ACCOUNT_DELETIONS_PROCESSED, 1);
                Ok(())
            }
            Update::BlockDetails(block) => {
                for pipe in &self.block_details_pipes {
                    pipe.run(&carrier, block).await?;
                }
                self.metrics.counter_add(flowline_metrics::names::BLOCK_DETAILS_PROCESSED, 1);
                Ok(())
            }
        }
    }

    /// Invokes every instruction pipe against `node` (evaluating each pipe's
    /// filters first), then recurses into its children in order. Boxed
    /// because the recursion depth (bounded by `MAX_DEPTH`) would otherwise
    /// make the generated future self-referential.
    fn run_instruction_pipes<'a>(&'a self, carrier: &'a Carrier, node: &'a NestedInstruction) -> BoxFuture<'a, PipelineResult<()>> {
        async move {
            for pipe in &self.instruction_pipes {
                pipe.run(carrier, node).await?;
            }
            for child in &node.children {
                self.run_instruction_pipes(carrier, child).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn shutdown(&self, reason: &str) {
        info!(reason, "shutting down");
        self.metrics.flush().await;
        self.metrics.shutdown().await;
    }
}

/// Thin wrapper over the interrupt/terminate OS signal futures so the
/// dispatch loop's `select!` has one thing to poll regardless of platform.
struct OsSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl OsSignals {
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Self {
                interrupt: signal(SignalKind::interrupt()).expect("failed to install SIGINT handler"),
                terminate: signal(SignalKind::terminate()).expect("failed to install SIGTERM handler"),
            }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    async fn recv(&mut self) -> &'static str {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            }
        }
        #[cfg(not(unix))]
        {
            match tokio::signal::ctrl_c().await {
                Ok(()) => "CTRL_C",
                Err(_) => std::future::pending().await,
            }
        }
    }
}
