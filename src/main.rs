//! KENOBOT: prediction-driven keno betting loop.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! seeds and trains the model, then runs the fetch→predict→bet→render
//! loop until Ctrl+C.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;

use kenobot::config::AppConfig;
use kenobot::display::{LogRenderer, Renderer, TerminalRenderer};
use kenobot::engine::{DecisionLoop, LoopConfig, Pacer};
use kenobot::exchange::http::HttpExchangeClient;
use kenobot::exchange::ExchangeClient;
use kenobot::logging;
use kenobot::predictor::{Predictor, RecencyNet};
use kenobot::strategy::{DecisionPolicy, PolicyConfig};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = if std::path::Path::new(CONFIG_PATH).exists() {
        AppConfig::load(CONFIG_PATH)?
    } else {
        let cfg = AppConfig::default();
        cfg.validate()?;
        cfg
    };

    // The terminal view owns stdout's tty, so logs move to a file while it
    // is on screen.
    let interactive = std::io::stdout().is_terminal();
    let log_file = interactive.then(|| PathBuf::from(&cfg.agent.log_file));
    logging::init(log_file.as_deref())?;

    info!(
        base_url = %cfg.exchange.base_url,
        currency = %cfg.exchange.currency,
        stake = %cfg.strategy.stake,
        threshold = cfg.strategy.confidence_threshold,
        window = cfg.strategy.window_len,
        top_k = cfg.strategy.top_k,
        "KENOBOT starting up"
    );

    // -- Initialise components -------------------------------------------

    let credentials = cfg.credentials()?;
    let exchange = HttpExchangeClient::new(
        &cfg.exchange,
        credentials,
        cfg.strategy.number_pool,
        rng_stream(cfg.agent.seed, 0),
    )?;
    let predictor = RecencyNet::new(cfg.strategy.number_pool, cfg.strategy.window_len, &cfg.model);
    let policy = DecisionPolicy::new(PolicyConfig::from(&cfg.strategy));
    let pacer = Pacer::new(&cfg.pacing, rng_stream(cfg.agent.seed, 1));

    if interactive {
        let renderer = TerminalRenderer::new(&cfg.exchange.currency, cfg.strategy.top_k)?;
        run(exchange, predictor, renderer, policy, pacer, LoopConfig::from(&cfg)).await;
    } else {
        run(exchange, predictor, LogRenderer, policy, pacer, LoopConfig::from(&cfg)).await;
    }

    info!("KENOBOT shut down cleanly.");
    Ok(())
}

/// Bootstrap, then loop until Ctrl+C. The renderer is dropped on return,
/// which restores the terminal.
async fn run<E, P, R>(
    exchange: E,
    predictor: P,
    renderer: R,
    policy: DecisionPolicy,
    pacer: Pacer,
    config: LoopConfig,
) where
    E: ExchangeClient,
    P: Predictor,
    R: Renderer,
{
    let mut engine = DecisionLoop::new(exchange, predictor, renderer, policy, pacer, config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            futures::future::pending::<()>().await;
        }
        info!("Shutdown signal received.");
    };
    tokio::pin!(shutdown);

    let report = tokio::select! {
        report = engine.bootstrap() => report,
        _ = &mut shutdown => return,
    };
    info!(
        trained = report.is_some(),
        history = engine.history().len(),
        "Bootstrap complete"
    );

    info!("Entering main loop. Press Ctrl+C to stop.");
    let cycles = engine.run_until(shutdown).await;
    info!(cycles, balance = %engine.balance(), "Loop finished");
}

/// Independent RNG per consumer; deterministic when a seed is configured.
fn rng_stream(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}
