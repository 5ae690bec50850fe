use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, UtcDateTime, ValidationError};

/// 24h rolling statistics for one futures instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: Symbol,
    pub last_price: f64,
    /// Traded value over the last 24h, denominated in the quote asset.
    pub quote_volume: f64,
}

impl TickerSnapshot {
    pub fn new(symbol: Symbol, last_price: f64, quote_volume: f64) -> Result<Self, ValidationError> {
        validate_non_negative("last_price", last_price)?;
        validate_non_negative("quote_volume", quote_volume)?;

        Ok(Self {
            symbol,
            last_price,
            quote_volume,
        })
    }
}

/// OHLCV candle including the taker-side split of the quote volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Base-asset volume.
    pub volume: f64,
    pub quote_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        quote_volume: f64,
        taker_buy_quote_volume: f64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;
        validate_non_negative("volume", volume)?;
        validate_non_negative("quote_volume", quote_volume)?;
        validate_non_negative("taker_buy_quote_volume", taker_buy_quote_volume)?;

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidCandleBounds);
        }

        if taker_buy_quote_volume > quote_volume {
            return Err(ValidationError::InvalidTakerVolume {
                taker_buy: taker_buy_quote_volume.to_string(),
                quote: quote_volume.to_string(),
            });
        }

        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            quote_volume,
            taker_buy_quote_volume,
        })
    }

    /// A candle with no range carries no directional pressure.
    pub fn is_degenerate(&self) -> bool {
        self.high == self.low
    }
}

/// Ordered (oldest → newest) candles for one symbol and interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: Symbol, interval: Interval, candles: Vec<Candle>) -> Self {
        Self {
            symbol,
            interval,
            candles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
