//! Live polling loop: fetch price and FX, size the position, render.

use anyhow::{Context, Result};
use clap::Args;
use liq_sizer_core::config_loader::{
    DisplayOverrides, FeedsOverrides, MonitorOverrides, PositionOverrides, DEFAULT_CONFIG_PATH,
};
use liq_sizer_core::{
    ConfigLoader, ConfigOverrides, MonitorEvent, MonitorSettings, PriceVenue, RiskMonitor, Side,
    SnapshotFormatter,
};
use liq_sizer_feeds::{fx_source_from_config, price_source_from_config};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Arguments for the watch command. Flags override the config file and
/// `LIQ_` environment variables.
#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Config file path (TOML, or JSON by extension). Missing file is fine.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Price venue: binance or hyperliquid.
    #[arg(long)]
    pub venue: Option<PriceVenue>,

    /// Instrument as BASE/QUOTE, e.g. BTC/USDT.
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Account equity in the quote currency.
    #[arg(long)]
    pub equity: Option<Decimal>,

    /// Leverage multiplier.
    #[arg(short, long)]
    pub leverage: Option<Decimal>,

    /// Entry price. The live price is used when omitted.
    #[arg(long)]
    pub entry: Option<Decimal>,

    /// Position side: long or short.
    #[arg(long)]
    pub side: Option<Side>,

    /// Stop-loss price.
    #[arg(long)]
    pub stop: Option<Decimal>,

    /// Percent of equity to risk at the stop, e.g. 2 for 2%.
    #[arg(long)]
    pub risk: Option<Decimal>,

    /// Refresh interval in seconds.
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Currency money values are converted to for display.
    #[arg(long)]
    pub display_currency: Option<String>,

    /// Currency the equity is denominated in.
    #[arg(long)]
    pub quote_currency: Option<String>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl WatchArgs {
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            monitor: MonitorOverrides {
                refresh_interval_secs: self.interval,
            },
            position: PositionOverrides {
                symbol: self.symbol.clone(),
                side: self.side,
                equity: self.equity,
                leverage: self.leverage,
                entry_price: self.entry,
                stop_loss_price: self.stop,
                risk_percent: self.risk,
            },
            feeds: FeedsOverrides { venue: self.venue },
            display: DisplayOverrides {
                quote_currency: self.quote_currency.clone(),
                display_currency: self.display_currency.clone(),
            },
        }
    }
}

/// Runs the live monitor until Ctrl+C or SIGTERM.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let config = ConfigLoader::load_with_overrides(&args.config, &args.overrides())?;
    let settings = MonitorSettings::from_config(&config)?;

    let price_source =
        price_source_from_config(&config.feeds).context("failed to build price source")?;
    let fx_source = fx_source_from_config(&config.feeds).context("failed to build FX source")?;

    let monitor = RiskMonitor::new(price_source, fx_source, settings);
    let shutdown_token = monitor.cancellation_token();

    print!("{}", SnapshotFormatter::banner(monitor.settings()));

    let (tx, rx) = mpsc::channel(16);
    let renderer = tokio::spawn(render(rx));
    let shutdown = tokio::spawn(await_shutdown(shutdown_token));

    let stats = monitor.run(tx).await;
    shutdown.abort();
    renderer.await.context("renderer task failed")?;

    println!("\nExiting.");
    info!(
        ticks = stats.ticks,
        snapshots = stats.snapshots,
        price_failures = stats.price_failures,
        fx_failures = stats.fx_failures,
        rejections = stats.rejections,
        "Watch finished"
    );
    Ok(())
}

/// Prints events until the monitor drops its sender.
async fn render(mut rx: mpsc::Receiver<MonitorEvent>) {
    while let Some(event) = rx.recv().await {
        print!("{}", render_event(&event));
    }
}

pub(crate) fn render_event(event: &MonitorEvent) -> String {
    match event {
        MonitorEvent::Snapshot(snapshot) => SnapshotFormatter::format(snapshot),
        MonitorEvent::PriceUnavailable { .. } => {
            "[WARN] Could not fetch live price. Retrying…\n".to_string()
        }
        MonitorEvent::Rejected { error, .. } => format!("[ERROR] {error}\n"),
    }
}

#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, stopping monitor"),
        () = terminate => info!("Received SIGTERM, stopping monitor"),
    }

    shutdown_token.cancel();
}
