use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use flowline_core::datasource::TestDatasource;
use flowline_core::deletion::{AccountDeletion, DeletionDecoder, DeletionPipe, DeletionProcessor};
use flowline_core::identifiers::Pubkey;
use flowline_core::update::Update;
use flowline_core::{PipelineBuilder, ShutdownStrategy};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    ProcessPending,
    Immediate,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_possible_value().expect("no skipped variants").get_name().fmt(f)
    }
}

impl From<Strategy> for ShutdownStrategy {
    fn from(value: Strategy) -> Self {
        match value {
            Strategy::ProcessPending => ShutdownStrategy::ProcessPending,
            Strategy::Immediate => ShutdownStrategy::Immediate,
        }
    }
}

/// Runs a pipeline fed by a synthetic in-memory data source, to exercise the
/// engine end to end without a real ledger connection.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of synthetic account-deletion updates to replay.
    #[arg(long, env, default_value_t = 25)]
    update_count: usize,

    /// Bounded carrier channel capacity.
    #[arg(long, env, default_value_t = flowline_core::pipeline::DEFAULT_CHANNEL_BUFFER)]
    channel_buffer_size: usize,

    /// Seconds between metrics flushes.
    #[arg(long, env, default_value_t = 5)]
    flush_interval_secs: u64,

    /// Shutdown behavior once a signal is observed.
    #[arg(long, env, value_enum, default_value_t = Strategy::ProcessPending)]
    shutdown_strategy: Strategy,

    /// `tracing_subscriber::EnvFilter` directive, e.g. `flowline_core=debug`.
    #[arg(long, env)]
    log_filter: Option<String>,
}

struct PassthroughDecoder;

impl DeletionDecoder for PassthroughDecoder {
    type Output = ();

    fn decode_deletion(&self, _deletion: &AccountDeletion) -> Option<()> {
        Some(())
    }
}

struct DeletionLogger;

#[async_trait::async_trait]
impl DeletionProcessor for DeletionLogger {
    type Input = ();

    async fn process(&self, deletion: AccountDeletion, _decoded: ()) -> flowline_core::PipelineResult<()> {
        tracing::info!(pubkey = %deletion.pubkey, slot = deletion.slot, "observed account deletion");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_filter {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let updates = (0..cli.update_count)
        .map(|slot| Update::AccountDeletion(AccountDeletion { pubkey: Pubkey::new([slot as u8; 32]), slot: slot as u64 }))
        .collect();

    let pipeline = PipelineBuilder::new()
        .source(Some("quickstart".to_string()), Arc::new(TestDatasource { updates }))
        .deletion_pipe(Arc::new(DeletionPipe::new(PassthroughDecoder, DeletionLogger)))
        .metrics(flowline_metrics::MetricsCollection::new(vec![Arc::new(flowline_metrics::FacadeSink)]))
        .metrics_flush_interval(Duration::from_secs(cli.flush_interval_secs))
        .channel_buffer_size(cli.channel_buffer_size)
        .shutdown_strategy(cli.shutdown_strategy.into())
        .build()?;

    pipeline.run(CancellationToken::new()).await?;
    Ok(())
}
