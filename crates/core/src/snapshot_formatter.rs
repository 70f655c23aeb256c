#![allow(clippy::format_push_string)]

use crate::monitor::MonitorSettings;
use crate::sizing::{PositionInputs, PositionOutputs};
use crate::snapshot::Snapshot;
use rust_decimal::{Decimal, RoundingStrategy};

const HEAVY_RULE: &str = "══════════════════════════════════════════════════════════════════════════════════════";
const LIGHT_RULE: &str = "──────────────────────────────────────────────────────────────────────────────────────";

pub struct SnapshotFormatter;

impl SnapshotFormatter {
    /// Startup banner shown once before the first snapshot.
    #[must_use]
    pub fn banner(settings: &MonitorSettings) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("Live Risk & Position Sizer. Press Ctrl+C to exit.\n\n");
        output.push_str(&format!(
            "Venue: {} | Symbol: {} | Side: {}\n",
            settings.venue,
            settings.symbol,
            settings.side.as_str().to_uppercase()
        ));
        let entry = settings
            .entry_price
            .map_or_else(|| "live".to_string(), |p| p.normalize().to_string());
        output.push_str(&format!(
            "Equity: {} {} | Leverage: {}x | Entry: {}\n",
            settings.equity.normalize(),
            settings.quote_currency,
            settings.leverage.normalize(),
            entry
        ));
        if let Some(stop) = settings.stop_loss_price {
            output.push_str(&format!("Stop Loss: {}\n", stop.normalize()));
        }
        output.push('\n');

        output
    }

    /// One live tick.
    #[must_use]
    pub fn format(snapshot: &Snapshot) -> String {
        let outputs = &snapshot.outputs;
        let display = &snapshot.display_currency;
        let mut output = String::new();

        output.push_str(HEAVY_RULE);
        output.push('\n');
        output.push_str(&format!(
            "{}  |  Live: {}   Entry: {}   Side: {}   Lvg: {}x\n",
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            human(snapshot.live_price, 2),
            human(snapshot.entry_price, 2),
            snapshot.side.as_str().to_uppercase(),
            snapshot.leverage.normalize()
        ));

        match (&snapshot.fx, snapshot.to_display(snapshot.equity)) {
            (Some(fx), Some(equity)) => output.push_str(&format!(
                "Equity: {} {}   FX({}->{}): {}\n",
                human(equity, 2),
                display,
                fx.base,
                fx.quote,
                human(fx.rate, 4)
            )),
            _ => output.push_str(&format!(
                "Equity: {} {}   FX({}->{}): unavailable\n",
                human(snapshot.equity, 2),
                snapshot.quote_currency,
                snapshot.quote_currency,
                display
            )),
        }

        output.push_str(LIGHT_RULE);
        output.push('\n');
        output.push_str(&format!(
            "Liquidation Price (approx): {}\n",
            human(outputs.liquidation_price, 2)
        ));
        if !snapshot.guard.is_clear() {
            output.push_str("⚠️  Live price is past liquidation; sizing refused.\n");
        }

        if let (Some(risk), Some(percent)) = (outputs.risk, snapshot.risk_percent) {
            output.push_str(&format!(
                "Per-Unit Risk to Stop: {}\n",
                human(risk.per_unit_loss, 2)
            ));
            output.push_str(&format!(
                "Units by Risk (<= {}% equity): {}\n",
                percent.round_dp(2).normalize(),
                human(risk.units_by_risk, 4)
            ));
            if risk.exceeds_margin {
                output.push_str(&format!(
                    "Margin-Capped Units: {} (risk size exceeds margin)\n",
                    human(risk.margin_capped_units, 4)
                ));
            }
        }

        output.push_str(&format!(
            "Margin per Unit: {}{}\n",
            human(outputs.margin_per_unit, 2),
            converted(snapshot, outputs.margin_per_unit)
        ));
        output.push_str(&format!(
            "Max Units by Margin: {}\n",
            human(outputs.max_units_by_margin, 4)
        ));
        output.push_str(&format!(
            "Recommended Units: {}\n",
            human(snapshot.effective_recommended_units(), 4)
        ));
        output.push_str(&format!(
            "Recommended Margin Capital: {}{}\n",
            human(snapshot.effective_margin_capital(), 2),
            converted(snapshot, snapshot.effective_margin_capital())
        ));
        output.push_str(HEAVY_RULE);
        output.push('\n');

        output
    }

    /// One-shot calculator result, without live data.
    #[must_use]
    pub fn format_outputs(inputs: &PositionInputs, outputs: &PositionOutputs) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Entry: {}   Side: {}   Equity: {}   Lvg: {}x\n",
            human(inputs.entry_price, 2),
            inputs.side.as_str().to_uppercase(),
            human(inputs.equity, 2),
            inputs.leverage.normalize()
        ));
        output.push_str(LIGHT_RULE);
        output.push('\n');
        output.push_str(&format!(
            "Liquidation Price (approx): {}\n",
            human(outputs.liquidation_price, 2)
        ));
        output.push_str(&format!(
            "Margin per Unit: {}\n",
            human(outputs.margin_per_unit, 2)
        ));
        output.push_str(&format!(
            "Max Units by Margin: {}\n",
            human(outputs.max_units_by_margin, 4)
        ));
        if let Some(risk) = outputs.risk {
            output.push_str(&format!("Risk Amount: {}\n", human(risk.risk_amount, 2)));
            output.push_str(&format!(
                "Per-Unit Risk to Stop: {}\n",
                human(risk.per_unit_loss, 2)
            ));
            output.push_str(&format!(
                "Units by Risk: {}\n",
                human(risk.units_by_risk, 4)
            ));
            if risk.exceeds_margin {
                output.push_str(&format!(
                    "Margin-Capped Units: {} (risk size exceeds margin)\n",
                    human(risk.margin_capped_units, 4)
                ));
            }
        }
        output.push_str(&format!(
            "Recommended Units: {}\n",
            human(outputs.recommended_units(), 4)
        ));
        output.push_str(&format!(
            "Recommended Margin Capital: {}\n",
            human(outputs.recommended_margin_capital(), 2)
        ));

        output
    }
}

fn converted(snapshot: &Snapshot, amount: Decimal) -> String {
    match snapshot.to_display(amount) {
        Some(value) if snapshot.display_currency != snapshot.quote_currency => {
            format!("  ({} {})", human(value, 2), snapshot.display_currency)
        }
        _ => String::new(),
    }
}

/// Fixed-precision number with thousands separators: `1234567.891` → `1,234,567.89`.
#[must_use]
pub fn human(value: Decimal, digits: u32) -> String {
    let rounded = format!(
        "{:.*}",
        digits as usize,
        value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
    );
    let (sign, unsigned) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
