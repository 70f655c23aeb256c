use liq_sizer_core::config_loader::{FeedsOverrides, PositionOverrides};
use liq_sizer_core::{
    ConfigLoader, ConfigOverrides, LiveGuard, MonitorEvent, MonitorSettings, PriceVenue,
    RiskMonitor, Side, SnapshotFormatter,
};
use liq_sizer_feeds::{fx_source_from_config, price_source_from_config};
use rust_decimal_macros::dec;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_binance(price: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fapi/v1/ticker/price"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "symbol": "BTCUSDT",
            "price": price
        })))
        .mount(&server)
        .await;
    server
}

async fn mock_fx(rate: f64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .and(query_param("base", "USD"))
        .and(query_param("symbols", "EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "rates": {"EUR": rate}
        })))
        .mount(&server)
        .await;
    server
}

fn write_config(binance: &MockServer, fx: &MockServer) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        file,
        r#"
[monitor]
refresh_interval_secs = 0.05

[position]
symbol = "BTC/USDT"
side = "long"
equity = 1000
leverage = 10
stop_loss_price = 95
risk_percent = 2

[feeds]
binance_url = "{}"
fx_url = "{}"

[display]
quote_currency = "USD"
display_currency = "EUR"
"#,
        binance.uri(),
        fx.uri()
    )
    .unwrap();
    file
}

#[tokio::test]
async fn test_watch_pipeline_end_to_end() {
    let binance = mock_binance("100.00").await;
    let fx = mock_fx(0.5).await;
    let file = write_config(&binance, &fx);

    let config = ConfigLoader::load_with_overrides(file.path(), &ConfigOverrides::default())
        .expect("config should load");
    let settings = MonitorSettings::from_config(&config).unwrap();
    assert_eq!(settings.refresh_interval, Duration::from_millis(50));

    let monitor = RiskMonitor::new(
        price_source_from_config(&config.feeds).unwrap(),
        fx_source_from_config(&config.feeds).unwrap(),
        settings,
    );
    let token = monitor.cancellation_token();

    let (tx, mut rx) = mpsc::channel(8);
    let handle = tokio::spawn(monitor.run(tx));

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("monitor should emit within timeout")
        .expect("channel open");

    let MonitorEvent::Snapshot(snapshot) = event else {
        panic!("expected a snapshot, got {event:?}");
    };
    assert_eq!(snapshot.venue, PriceVenue::Binance);
    assert_eq!(snapshot.live_price, dec!(100));
    assert_eq!(snapshot.entry_price, dec!(100));
    assert_eq!(snapshot.outputs.liquidation_price, dec!(90));
    assert_eq!(snapshot.outputs.max_units_by_margin, dec!(100));
    assert_eq!(snapshot.outputs.recommended_units(), dec!(4));
    assert_eq!(snapshot.guard, LiveGuard::Clear);
    assert_eq!(snapshot.fx.as_ref().map(|fx| fx.rate), Some(dec!(0.5)));

    let rendered = SnapshotFormatter::format(&snapshot);
    assert!(rendered.contains("Liquidation Price (approx): 90.00"), "{rendered}");
    assert!(rendered.contains("500.00 EUR"), "{rendered}");

    token.cancel();
    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("monitor should stop after cancel")
        .unwrap();
    assert!(stats.snapshots >= 1);
    assert_eq!(stats.price_failures, 0);
}

#[tokio::test]
async fn test_price_outage_then_flag_overrides() {
    // No ticker mock mounted: every price request 404s
    let binance = MockServer::start().await;
    let fx = mock_fx(0.9).await;
    let file = write_config(&binance, &fx);

    let overrides = ConfigOverrides {
        position: PositionOverrides {
            side: Some(Side::Short),
            stop_loss_price: Some(dec!(105)),
            ..PositionOverrides::default()
        },
        feeds: FeedsOverrides {
            venue: Some(PriceVenue::Binance),
        },
        ..ConfigOverrides::default()
    };
    let config = ConfigLoader::load_with_overrides(file.path(), &overrides).unwrap();
    assert_eq!(config.position.side, Side::Short);

    let settings = MonitorSettings::from_config(&config).unwrap();
    let mut monitor = RiskMonitor::new(
        price_source_from_config(&config.feeds).unwrap(),
        fx_source_from_config(&config.feeds).unwrap(),
        settings,
    );

    let event = monitor.tick().await;
    assert!(
        matches!(event, MonitorEvent::PriceUnavailable { .. }),
        "{event:?}"
    );
    assert_eq!(monitor.stats().price_failures, 1);
}
