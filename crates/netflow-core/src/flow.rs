use serde::{Deserialize, Serialize};

use crate::Candle;

pub const DEFAULT_FLOW_CANDLES: usize = 24;

/// Taker-side split of quote volume over a candle window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowSummary {
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub net_inflow: f64,
}

impl FlowSummary {
    /// Buyers lifted more quote volume than sellers hit.
    pub fn is_inflow(&self) -> bool {
        self.buy_volume > self.sell_volume
    }
}

/// Sums taker-buy and total quote volume; `None` for an empty window.
pub fn summarize_flow(candles: &[Candle]) -> Option<FlowSummary> {
    if candles.is_empty() {
        return None;
    }

    let (buy_volume, total_volume) = candles.iter().fold((0.0, 0.0), |(buy, total), candle| {
        (
            buy + candle.taker_buy_quote_volume,
            total + candle.quote_volume,
        )
    });
    let sell_volume = total_volume - buy_volume;

    Some(FlowSummary {
        buy_volume,
        sell_volume,
        net_inflow: buy_volume - sell_volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtcDateTime;

    fn candle(quote_volume: f64, taker_buy: f64) -> Candle {
        Candle::new(
            UtcDateTime::from_unix_millis(1_704_067_200_000).expect("timestamp"),
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
            quote_volume,
            taker_buy,
        )
        .expect("valid candle")
    }

    #[test]
    fn splits_quote_volume_into_buy_and_sell() {
        let candles: Vec<Candle> = (0..24)
            .map(|i| if i < 20 { candle(5.0, 4.5) } else { candle(10.0, 2.5) })
            .collect();

        let flow = summarize_flow(&candles).expect("non-empty");

        assert_eq!(flow.buy_volume, 100.0);
        assert_eq!(flow.sell_volume, 40.0);
        assert_eq!(flow.net_inflow, 60.0);
        assert!(flow.is_inflow());
    }

    #[test]
    fn balanced_flow_is_not_inflow() {
        let flow = summarize_flow(&[candle(10.0, 5.0)]).expect("non-empty");
        assert_eq!(flow.net_inflow, 0.0);
        assert!(!flow.is_inflow());
    }

    #[test]
    fn empty_window_has_no_summary() {
        assert_eq!(summarize_flow(&[]), None);
    }
}
