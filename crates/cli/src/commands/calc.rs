//! One-shot offline sizing from command-line values.

use anyhow::Result;
use clap::Args;
use liq_sizer_core::{compute, PositionInputs, PositionOutputs, SizingError, Side, SnapshotFormatter};
use rust_decimal::Decimal;

/// Arguments for the calc command.
#[derive(Args, Debug, Clone)]
pub struct CalcArgs {
    /// Entry price.
    #[arg(long)]
    pub entry: Decimal,

    /// Account equity.
    #[arg(long)]
    pub equity: Decimal,

    /// Leverage multiplier.
    #[arg(short, long)]
    pub leverage: Decimal,

    /// Position side: long or short.
    #[arg(long, default_value = "long")]
    pub side: Side,

    /// Stop-loss price. Enables risk-based sizing.
    #[arg(long)]
    pub stop: Option<Decimal>,

    /// Percent of equity to risk at the stop.
    #[arg(long, default_value = "2")]
    pub risk: Decimal,
}

impl CalcArgs {
    #[must_use]
    pub fn inputs(&self) -> PositionInputs {
        let inputs = PositionInputs::new(self.entry, self.equity, self.leverage, self.side)
            .with_risk_percent(self.risk);
        match self.stop {
            Some(stop) => inputs.with_stop_loss(stop),
            None => inputs,
        }
    }

    /// # Errors
    /// Returns the calculator's validation error for these inputs.
    pub fn compute(&self) -> Result<(PositionInputs, PositionOutputs), SizingError> {
        let inputs = self.inputs();
        let outputs = compute(&inputs)?;
        Ok((inputs, outputs))
    }
}

/// Prints the sizing for the given values. Validation errors are returned so
/// the process exits non-zero.
pub fn run_calc(args: &CalcArgs) -> Result<()> {
    let (inputs, outputs) = args.compute()?;
    if let Some(risk) = outputs.risk.filter(|r| r.exceeds_margin) {
        tracing::warn!(
            units_by_risk = %risk.units_by_risk,
            max_units_by_margin = %outputs.max_units_by_margin,
            "Risk-based size exceeds available margin, capping"
        );
    }
    print!("{}", SnapshotFormatter::format_outputs(&inputs, &outputs));
    Ok(())
}
