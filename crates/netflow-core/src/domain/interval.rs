use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Kline interval requested from the futures klines endpoint.
///
/// Flow and indicator windows are both counted in hourly candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1h")]
    OneHour,
}

impl Interval {
    /// Wire name used in the `interval` query parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
