//! CLI commands for the live liquidation and position sizer.

pub mod calc;
pub mod watch;

pub use calc::{run_calc, CalcArgs};
pub use watch::{run_watch, WatchArgs};
