use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use warden_relay::{BridgeConfig, Chain, RelayEngine};

enum Mode {
    /// Run one scan cycle for a single chain and exit.
    Once(Chain),
    /// Scan the given chains continuously until SIGINT/SIGTERM.
    Watch(Vec<Chain>),
}

const USAGE: &str = "usage: warden-relay [--watch] [source|destination]
  warden-relay source           run one scan cycle over the source chain
  warden-relay destination      run one scan cycle over the destination chain
  warden-relay --watch          scan both chains continuously
  warden-relay --watch source   scan one chain continuously";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    // Argument errors must exit before any RPC or file side effects.
    let mode = match parse_args(args.into_iter()) {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = run(mode) {
        eprintln!("Error: {e:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Mode, String> {
    let mut watch = false;
    let mut chain: Option<Chain> = None;

    for arg in args {
        match arg.as_str() {
            "--watch" => watch = true,
            other => match Chain::parse(other) {
                Some(c) if chain.is_none() => chain = Some(c),
                Some(_) => return Err(format!("unexpected extra argument {other:?}")),
                None => return Err(format!("unknown chain {other:?}")),
            },
        }
    }

    match (watch, chain) {
        (false, Some(chain)) => Ok(Mode::Once(chain)),
        (false, None) => Err("missing chain argument".to_string()),
        (true, Some(chain)) => Ok(Mode::Watch(vec![chain])),
        (true, None) => Ok(Mode::Watch(vec![Chain::Source, Chain::Destination])),
    }
}

fn run(mode: Mode) -> eyre::Result<()> {
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(mode))
}

async fn async_main(mode: Mode) -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting warden relay");

    let config = BridgeConfig::load()?;
    tracing::info!(
        source_rpc = %config.source.rpc_url,
        destination_rpc = %config.destination.rpc_url,
        scan_lag = config.relay.scan_lag,
        "Configuration loaded"
    );

    let engine = Arc::new(RelayEngine::from_config(&config)?);

    match mode {
        Mode::Once(chain) => {
            let report = engine.scan(chain).await?;
            println!("[{chain}] {report}");
        }
        Mode::Watch(chains) => {
            watch(engine, chains, config.relay.poll_interval).await;
        }
    }

    tracing::info!("Warden relay stopped");
    Ok(())
}

/// Run a scan loop per chain until a shutdown signal arrives.
async fn watch(engine: Arc<RelayEngine>, chains: Vec<Chain>, interval: Duration) {
    let mut tasks = JoinSet::new();
    let mut shutdown_txs = Vec::new();

    for chain in chains {
        let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
        shutdown_txs.push(shutdown_tx);
        let engine = engine.clone();
        tasks.spawn(scan_loop(engine, chain, interval, shutdown_rx));
    }

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        for tx in shutdown_txs {
            let _ = tx.send(()).await;
        }
    });

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Scan loop task panicked");
        }
    }
}

/// Cycle forever for one chain. A failed cycle is logged and retried on the
/// next tick; the dedup set keeps re-observed events idempotent. An in-flight
/// cycle always runs to completion (it is bounded by per-call RPC timeouts);
/// shutdown is honored between cycles.
async fn scan_loop(
    engine: Arc<RelayEngine>,
    chain: Chain,
    interval: Duration,
    mut shutdown: tokio::sync::mpsc::Receiver<()>,
) {
    tracing::info!(chain = %chain, interval_ms = interval.as_millis() as u64, "Watch loop started");
    loop {
        if let Err(e) = engine.scan(chain).await {
            tracing::error!(chain = %chain, error = %e, "Scan cycle failed");
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.recv() => break,
        }
    }
    tracing::info!(chain = %chain, "Watch loop stopped");
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,warden_relay=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
