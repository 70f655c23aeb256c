//! Timer-driven live risk monitor.
//!
//! Each tick fetches the live price and the FX rate concurrently, runs the
//! sizing calculator on one consistent pair, and sends the result to the
//! renderer. The monitor owns a [`CancellationToken`]; cancelling it ends
//! [`RiskMonitor::run`] even while a fetch is in flight.

use crate::config::{AppConfig, PriceVenue, MIN_REFRESH_INTERVAL};
use crate::error::InvalidSymbol;
use crate::sizing::{compute, PositionInputs, Side};
use crate::snapshot::{FxQuote, MonitorEvent, Snapshot};
use crate::symbol::Symbol;
use crate::traits::{FxSource, PriceSource};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Immutable settings for a monitor run, built once at startup.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub symbol: Symbol,
    pub venue: PriceVenue,
    pub side: Side,
    pub equity: Decimal,
    pub leverage: Decimal,
    /// Live price is used as entry when unset
    pub entry_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub risk_percent: Option<Decimal>,
    pub refresh_interval: Duration,
    pub quote_currency: String,
    pub display_currency: String,
}

impl MonitorSettings {
    /// # Errors
    /// Returns an error if the configured symbol is not `BASE/QUOTE`.
    pub fn from_config(config: &AppConfig) -> Result<Self, InvalidSymbol> {
        Ok(Self {
            symbol: Symbol::new(&config.position.symbol)?,
            venue: config.feeds.venue,
            side: config.position.side,
            equity: config.position.equity,
            leverage: config.position.leverage,
            entry_price: config.position.entry_price,
            stop_loss_price: config.position.stop_loss_price,
            risk_percent: config.position.risk_percent,
            refresh_interval: config.monitor.refresh_interval(),
            quote_currency: config.display.quote_currency.to_ascii_uppercase(),
            display_currency: config.display.display_currency.to_ascii_uppercase(),
        })
    }

    /// Calculator inputs for a tick observing `live_price`.
    #[must_use]
    pub fn inputs(&self, live_price: Decimal) -> PositionInputs {
        PositionInputs {
            entry_price: self.entry_price.unwrap_or(live_price),
            equity: self.equity,
            leverage: self.leverage,
            side: self.side,
            stop_loss_price: self.stop_loss_price,
            risk_percent: self.risk_percent,
        }
    }
}

/// Counters for a monitor run.
#[derive(Debug, Clone, Default)]
pub struct MonitorStats {
    pub ticks: u64,
    pub snapshots: u64,
    pub price_failures: u64,
    pub fx_failures: u64,
    pub rejections: u64,
    pub last_tick: Option<DateTime<Utc>>,
}

pub struct RiskMonitor<P, F>
where
    P: PriceSource,
    F: FxSource,
{
    price_source: P,
    fx_source: F,
    settings: MonitorSettings,
    cancel: CancellationToken,
    stats: MonitorStats,
}

impl<P, F> RiskMonitor<P, F>
where
    P: PriceSource,
    F: FxSource,
{
    pub fn new(price_source: P, fx_source: F, settings: MonitorSettings) -> Self {
        Self {
            price_source,
            fx_source,
            settings,
            cancel: CancellationToken::new(),
            stats: MonitorStats::default(),
        }
    }

    /// Token that stops [`Self::run`] when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    #[must_use]
    pub const fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// Runs one poll: fetch, compute, classify.
    pub async fn tick(&mut self) -> MonitorEvent {
        let timestamp = Utc::now();
        self.stats.ticks += 1;
        self.stats.last_tick = Some(timestamp);

        let settings = &self.settings;
        let (price, fx) = tokio::join!(
            self.price_source.fetch_price(&settings.symbol),
            self.fx_source
                .fetch_rate(&settings.quote_currency, &settings.display_currency),
        );

        let live_price = match price {
            Ok(price) => price,
            Err(e) => {
                self.stats.price_failures += 1;
                tracing::warn!(
                    source = self.price_source.name(),
                    symbol = %settings.symbol,
                    error = %e,
                    "Could not fetch live price, retrying next tick"
                );
                return MonitorEvent::PriceUnavailable {
                    timestamp,
                    symbol: settings.symbol.clone(),
                    message: format!("{e:#}"),
                };
            }
        };

        let fx = match fx {
            Ok(rate) => Some(FxQuote {
                base: settings.quote_currency.clone(),
                quote: settings.display_currency.clone(),
                rate,
            }),
            Err(e) => {
                self.stats.fx_failures += 1;
                tracing::warn!(
                    base = %settings.quote_currency,
                    quote = %settings.display_currency,
                    error = %e,
                    "FX rate unavailable, showing quote currency only"
                );
                None
            }
        };

        let inputs = settings.inputs(live_price);
        let outputs = match compute(&inputs) {
            Ok(outputs) => outputs,
            Err(error) => {
                self.stats.rejections += 1;
                tracing::error!(%error, %live_price, "Position inputs rejected");
                return MonitorEvent::Rejected {
                    timestamp,
                    live_price,
                    error,
                };
            }
        };

        let guard = outputs.live_guard(inputs.side, live_price);
        if !guard.is_clear() {
            tracing::warn!(
                %live_price,
                liquidation_price = %outputs.liquidation_price,
                side = %inputs.side,
                "Live price is past the liquidation price, recommending zero units"
            );
        }

        self.stats.snapshots += 1;
        tracing::debug!(
            symbol = %settings.symbol,
            %live_price,
            liquidation_price = %outputs.liquidation_price,
            "Snapshot computed"
        );

        MonitorEvent::Snapshot(Box::new(Snapshot {
            timestamp,
            symbol: settings.symbol.clone(),
            venue: settings.venue,
            side: inputs.side,
            equity: inputs.equity,
            leverage: inputs.leverage,
            live_price,
            entry_price: inputs.entry_price,
            stop_loss_price: inputs.stop_loss_price,
            risk_percent: inputs.risk_percent,
            quote_currency: settings.quote_currency.clone(),
            display_currency: settings.display_currency.clone(),
            fx,
            outputs,
            guard,
        }))
    }

    /// Polls on the refresh interval until cancelled or `tx` is closed.
    ///
    /// The first tick fires immediately. Returns the final statistics.
    pub async fn run(mut self, tx: mpsc::Sender<MonitorEvent>) -> MonitorStats {
        let mut interval =
            tokio::time::interval(self.settings.refresh_interval.max(MIN_REFRESH_INTERVAL));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let cancel = self.cancel.clone();

        tracing::info!(
            symbol = %self.settings.symbol,
            source = self.price_source.name(),
            interval_ms = self.settings.refresh_interval.as_millis() as u64,
            "Risk monitor started"
        );

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let event = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        event = self.tick() => event,
                    };
                    let sent = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        sent = tx.send(event) => sent,
                    };
                    if sent.is_err() {
                        tracing::debug!("Event receiver dropped, stopping monitor");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            ticks = self.stats.ticks,
            snapshots = self.stats.snapshots,
            price_failures = self.stats.price_failures,
            "Risk monitor stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SizingError;
    use crate::sizing::LiveGuard;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replays scripted prices; repeats the last one when exhausted.
    struct ScriptedPrices {
        prices: Mutex<VecDeque<Option<Decimal>>>,
        last: Mutex<Option<Decimal>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedPrices {
        fn new(prices: Vec<Option<Decimal>>) -> Self {
            Self {
                prices: Mutex::new(prices.into()),
                last: Mutex::new(None),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl PriceSource for ScriptedPrices {
        async fn fetch_price(&self, _symbol: &Symbol) -> Result<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.prices.lock().unwrap().pop_front();
            let price = match next {
                Some(price) => {
                    *self.last.lock().unwrap() = price;
                    price
                }
                None => *self.last.lock().unwrap(),
            };
            price.ok_or_else(|| anyhow!("exchange unavailable"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FixedFx(Option<Decimal>);

    #[async_trait]
    impl FxSource for FixedFx {
        async fn fetch_rate(&self, _base: &str, _quote: &str) -> Result<Decimal> {
            self.0.ok_or_else(|| anyhow!("fx down"))
        }
    }

    /// Never resolves, to test cancellation of an in-flight fetch.
    struct HangingPrices;

    #[async_trait]
    impl PriceSource for HangingPrices {
        async fn fetch_price(&self, _symbol: &Symbol) -> Result<Decimal> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn settings() -> MonitorSettings {
        MonitorSettings {
            symbol: Symbol::new("BTC/USDT").unwrap(),
            venue: PriceVenue::Binance,
            side: Side::Long,
            equity: dec!(1000),
            leverage: dec!(10),
            entry_price: Some(dec!(100)),
            stop_loss_price: Some(dec!(95)),
            risk_percent: Some(dec!(2)),
            refresh_interval: Duration::from_secs(2),
            quote_currency: "USD".to_string(),
            display_currency: "EUR".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tick_produces_consistent_snapshot() {
        let mut monitor = RiskMonitor::new(
            ScriptedPrices::new(vec![Some(dec!(98))]),
            FixedFx(Some(dec!(0.9))),
            settings(),
        );

        let MonitorEvent::Snapshot(snapshot) = monitor.tick().await else {
            panic!("expected snapshot");
        };

        assert_eq!(snapshot.live_price, dec!(98));
        assert_eq!(snapshot.entry_price, dec!(100));
        assert_eq!(snapshot.outputs.liquidation_price, dec!(90));
        assert_eq!(snapshot.outputs.recommended_units_by_risk(), Some(dec!(4)));
        assert_eq!(snapshot.fx.as_ref().unwrap().rate, dec!(0.9));
        assert_eq!(snapshot.to_display(dec!(1000)), Some(dec!(900)));
        assert_eq!(snapshot.guard, LiveGuard::Clear);
        assert_eq!(snapshot.effective_recommended_units(), dec!(4));
        assert_eq!(monitor.stats().snapshots, 1);
    }

    #[tokio::test]
    async fn test_live_price_used_as_entry_when_unset() {
        let mut settings = settings();
        settings.entry_price = None;
        settings.stop_loss_price = None;
        let mut monitor =
            RiskMonitor::new(ScriptedPrices::new(vec![Some(dec!(200))]), FixedFx(None), settings);

        let MonitorEvent::Snapshot(snapshot) = monitor.tick().await else {
            panic!("expected snapshot");
        };

        assert_eq!(snapshot.entry_price, dec!(200));
        assert_eq!(snapshot.outputs.margin_per_unit, dec!(20));
        assert!(snapshot.fx.is_none());
        assert_eq!(snapshot.to_display(dec!(1)), None);
        assert_eq!(monitor.stats().fx_failures, 1);
    }

    #[tokio::test]
    async fn test_price_failure_skips_tick() {
        let mut monitor =
            RiskMonitor::new(ScriptedPrices::new(vec![None]), FixedFx(Some(dec!(1))), settings());

        let event = monitor.tick().await;

        assert!(matches!(event, MonitorEvent::PriceUnavailable { .. }));
        assert_eq!(monitor.stats().price_failures, 1);
        assert_eq!(monitor.stats().snapshots, 0);
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_rejected() {
        let mut settings = settings();
        settings.stop_loss_price = Some(dec!(100));
        let mut monitor =
            RiskMonitor::new(ScriptedPrices::new(vec![Some(dec!(99))]), FixedFx(Some(dec!(1))), settings);

        let MonitorEvent::Rejected { error, live_price, .. } = monitor.tick().await else {
            panic!("expected rejection");
        };

        assert!(matches!(error, SizingError::InvalidStopLoss(_)));
        assert_eq!(live_price, dec!(99));
        assert_eq!(monitor.stats().rejections, 1);
    }

    #[tokio::test]
    async fn test_past_liquidation_recommends_zero() {
        let mut monitor = RiskMonitor::new(
            ScriptedPrices::new(vec![Some(dec!(89.5))]),
            FixedFx(Some(dec!(1))),
            settings(),
        );

        let MonitorEvent::Snapshot(snapshot) = monitor.tick().await else {
            panic!("expected snapshot");
        };

        assert_eq!(snapshot.guard, LiveGuard::PastLiquidation);
        assert_eq!(snapshot.outputs.recommended_units(), dec!(4));
        assert_eq!(snapshot.effective_recommended_units(), dec!(0));
        assert_eq!(snapshot.effective_margin_capital(), dec!(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_until_cancelled() {
        let prices = ScriptedPrices::new(vec![Some(dec!(100)), None, Some(dec!(101))]);
        let calls = Arc::clone(&prices.calls);
        let monitor = RiskMonitor::new(prices, FixedFx(Some(dec!(1))), settings());
        let cancel = monitor.cancellation_token();
        let (tx, mut rx) = mpsc::channel(16);

        let handle = tokio::spawn(monitor.run(tx));

        assert!(matches!(rx.recv().await, Some(MonitorEvent::Snapshot(_))));
        assert!(matches!(rx.recv().await, Some(MonitorEvent::PriceUnavailable { .. })));
        assert!(matches!(rx.recv().await, Some(MonitorEvent::Snapshot(_))));

        cancel.cancel();
        let stats = handle.await.unwrap();

        assert!(stats.ticks >= 3);
        assert_eq!(stats.price_failures, 1);
        assert_eq!(calls.load(Ordering::SeqCst) as u64, stats.ticks);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_inflight_fetch() {
        let monitor = RiskMonitor::new(HangingPrices, FixedFx(Some(dec!(1))), settings());
        let cancel = monitor.cancellation_token();
        let (tx, mut rx) = mpsc::channel(1);

        let handle = tokio::spawn(monitor.run(tx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let stats = handle.await.unwrap();
        assert_eq!(stats.ticks, 1);
        assert_eq!(stats.snapshots, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_blocked_send() {
        let monitor = RiskMonitor::new(
            ScriptedPrices::new(vec![Some(dec!(100))]),
            FixedFx(Some(dec!(1))),
            settings(),
        );
        let cancel = monitor.cancellation_token();
        // Capacity 1 and never read: the second send blocks
        let (tx, _rx) = mpsc::channel(1);

        let handle = tokio::spawn(monitor.run(tx));
        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run should stop while blocked on send")
            .unwrap();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.snapshots, 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let monitor = RiskMonitor::new(
            ScriptedPrices::new(vec![Some(dec!(100))]),
            FixedFx(Some(dec!(1))),
            settings(),
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let stats = monitor.run(tx).await;
        assert_eq!(stats.ticks, 1);
    }

    #[test]
    fn test_settings_from_config_uppercases_currencies() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "position": {"symbol": "eth/usdt", "side": "short", "equity": 500, "leverage": 5},
                "display": {"quote_currency": "usd", "display_currency": "gbp"}
            }"#,
        )
        .unwrap();

        let settings = MonitorSettings::from_config(&config).unwrap();
        assert_eq!(settings.symbol.to_string(), "ETH/USDT");
        assert_eq!(settings.display_currency, "GBP");
        assert_eq!(settings.refresh_interval, Duration::from_secs(2));
        assert_eq!(settings.inputs(dec!(3000)).entry_price, dec!(3000));
    }
}
