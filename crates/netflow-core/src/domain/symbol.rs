use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 32;
const USDT_QUOTE: &str = "USDT";

/// Normalized exchange instrument identifier (e.g. `BTCUSDT`, `1000PEPEUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol, uppercasing its ASCII letters.
    ///
    /// Exchange ids are taken as listed: they may start with a digit
    /// (`1000SHIBUSDT`), carry a delivery suffix (`BTCUSDT_250328`) or a
    /// non-Latin base (`币安人生USDT`). Only whitespace and control characters
    /// are rejected. Length is counted in characters.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let len = trimmed.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some((index, ch)) = trimmed
            .chars()
            .enumerate()
            .find(|(_, ch)| ch.is_whitespace() || ch.is_control())
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for USDT-margined perpetual contracts.
    ///
    /// Perpetuals are quoted as `<BASE>USDT`; delivery contracts end in a date
    /// suffix and USDC-margined pairs end in `USDC`.
    pub fn is_usdt_perpetual(&self) -> bool {
        self.0.len() > USDT_QUOTE.len() && self.0.ends_with(USDT_QUOTE)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" btcusdt ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "BTCUSDT");
    }

    #[test]
    fn accepts_leading_digit_listings() {
        let parsed = Symbol::parse("1000PEPEUSDT").expect("symbol should parse");
        assert!(parsed.is_usdt_perpetual());
    }

    #[test]
    fn rejects_embedded_whitespace_and_control_chars() {
        let err = Symbol::parse("BTC USDT").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: ' ', index: 3 }));

        let err = Symbol::parse("BTC\u{7}USDT").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { index: 3, .. }));
    }

    #[test]
    fn keeps_non_latin_listings() {
        let parsed = Symbol::parse("币安人生usdt").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "币安人生USDT");
        assert!(parsed.is_usdt_perpetual());
    }

    #[test]
    fn length_is_counted_in_characters() {
        let long = "币".repeat(MAX_SYMBOL_LEN - 4) + "USDT";
        assert!(Symbol::parse(&long).is_ok());

        let too_long = "币".repeat(MAX_SYMBOL_LEN - 3) + "USDT";
        let err = Symbol::parse(&too_long).expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::SymbolTooLong {
                len: MAX_SYMBOL_LEN + 1,
                max: MAX_SYMBOL_LEN
            }
        );
    }

    #[test]
    fn delivery_and_usdc_contracts_are_not_usdt_perpetuals() {
        for raw in ["BTCUSDT_250328", "ETHUSDC", "USDT"] {
            let symbol = Symbol::parse(raw).expect("symbol should parse");
            assert!(!symbol.is_usdt_perpetual(), "{raw} must not qualify");
        }
    }
}
