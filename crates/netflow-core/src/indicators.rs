//! Money-flow ratio (Chaikin money flow) and volume-spike stop-loss.
//!
//! Both indicators read the trailing window of an oldest-first candle slice
//! and return `None` when the slice is shorter than the window.

use serde::{Deserialize, Serialize};

use crate::{Candle, ValidationError};

pub const DEFAULT_MONEY_FLOW_WINDOW: usize = 20;
pub const DEFAULT_STOP_LOSS_WINDOW: usize = 15;
pub const DEFAULT_SPIKE_MULTIPLIER: f64 = 5.0;
pub const DEFAULT_STOP_LOSS_DISCOUNT: f64 = 0.05;

/// Window sizes and constants shared by both indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub money_flow_window: usize,
    pub stop_loss_window: usize,
    /// A candle is a spike when its volume exceeds `spike_multiplier` times
    /// the previous candle's volume.
    pub spike_multiplier: f64,
    /// Fraction placed below the reference low, `0.05` means 5%.
    pub stop_loss_discount: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            money_flow_window: DEFAULT_MONEY_FLOW_WINDOW,
            stop_loss_window: DEFAULT_STOP_LOSS_WINDOW,
            spike_multiplier: DEFAULT_SPIKE_MULTIPLIER,
            stop_loss_discount: DEFAULT_STOP_LOSS_DISCOUNT,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.money_flow_window == 0 {
            return Err(ValidationError::EmptyWindow {
                name: "money_flow_window",
            });
        }
        if self.stop_loss_window == 0 {
            return Err(ValidationError::EmptyWindow {
                name: "stop_loss_window",
            });
        }
        if !self.spike_multiplier.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "spike_multiplier",
            });
        }
        if !self.stop_loss_discount.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "stop_loss_discount",
            });
        }
        if self.spike_multiplier < 0.0 {
            return Err(ValidationError::NegativeValue {
                field: "spike_multiplier",
            });
        }
        if self.stop_loss_discount < 0.0 {
            return Err(ValidationError::NegativeValue {
                field: "stop_loss_discount",
            });
        }
        Ok(())
    }

    /// Candles needed so both indicators can be computed from one fetch.
    pub fn required_candles(&self) -> usize {
        self.money_flow_window.max(self.stop_loss_window)
    }
}

/// Position of the close within the candle range, in `[-1, 1]`.
/// Degenerate candles (`high == low`) are neutral.
pub fn money_flow_multiplier(candle: &Candle) -> f64 {
    let range = candle.high - candle.low;
    if range == 0.0 {
        return 0.0;
    }
    ((candle.close - candle.low) - (candle.high - candle.close)) / range
}

/// Volume-weighted money-flow ratio over the trailing `window` candles.
pub fn money_flow_ratio(candles: &[Candle], window: usize) -> Option<f64> {
    let tail = trailing(candles, window)?;

    if tail.iter().all(Candle::is_degenerate) {
        return None;
    }

    let (flow_volume, volume) = tail.iter().fold((0.0, 0.0), |(flow, total), candle| {
        (
            flow + money_flow_multiplier(candle) * candle.volume,
            total + candle.volume,
        )
    });
    if volume == 0.0 {
        return None;
    }

    let ratio = flow_volume / volume;
    ratio.is_finite().then_some(ratio)
}

/// Stop-loss price from the trailing `config.stop_loss_window` candles,
/// rounded to 2 decimals.
///
/// The first candle whose volume exceeds `spike_multiplier` times its
/// predecessor's anchors the stop; without a spike the window low is used.
pub fn stop_loss_price(candles: &[Candle], config: &IndicatorConfig) -> Option<f64> {
    let tail = trailing(candles, config.stop_loss_window)?;

    let spike = tail
        .windows(2)
        .find(|pair| pair[1].volume > config.spike_multiplier * pair[0].volume)
        .map(|pair| pair[1].low);

    let anchor = match spike {
        Some(low) => low,
        None => tail.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
    };

    let price = round_dp(anchor * (1.0 - config.stop_loss_discount), 2);
    price.is_finite().then_some(price)
}

/// Both indicators for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub money_flow: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl IndicatorSet {
    pub fn compute(candles: &[Candle], config: &IndicatorConfig) -> Self {
        let money_flow = money_flow_ratio(candles, config.money_flow_window);
        let stop_loss = stop_loss_price(candles, config);

        if candles.len() < config.required_candles() {
            tracing::debug!(
                available = candles.len(),
                required = config.required_candles(),
                "insufficient candles for indicators"
            );
        }

        Self {
            money_flow,
            stop_loss,
        }
    }
}

/// Rounds half away from zero to `places` decimals.
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

fn trailing(candles: &[Candle], window: usize) -> Option<&[Candle]> {
    if window == 0 || candles.len() < window {
        return None;
    }
    Some(&candles[candles.len() - window..])
}
