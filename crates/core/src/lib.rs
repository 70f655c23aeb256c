pub mod config;
pub mod config_loader;
pub mod error;
pub mod monitor;
pub mod sizing;
pub mod snapshot;
pub mod snapshot_formatter;
pub mod symbol;
pub mod traits;

pub use config::{AppConfig, DisplayConfig, FeedsConfig, MonitorConfig, PositionConfig, PriceVenue};
pub use config_loader::{ConfigLoader, ConfigOverrides};
pub use error::{InvalidSymbol, SizingError};
pub use monitor::{MonitorSettings, MonitorStats, RiskMonitor};
pub use sizing::{compute, LiveGuard, PositionInputs, PositionOutputs, RiskSizing, Side};
pub use snapshot::{FxQuote, MonitorEvent, Snapshot};
pub use snapshot_formatter::SnapshotFormatter;
pub use symbol::Symbol;
pub use traits::{FxSource, PriceSource};
