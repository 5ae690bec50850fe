use std::env;
use std::path::PathBuf;

use netflow_core::adapters::DEFAULT_BASE_URL;
use netflow_core::ReportOffset;

use crate::error::CliError;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_WAREHOUSE_PATH: &str = "netflow.duckdb";
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 20;

/// Settings read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Service-account JSON key for the Sheets surface.
    pub credentials_path: Option<PathBuf>,
    pub spreadsheet_id: Option<String>,
    pub warehouse_path: PathBuf,
    pub binance_url: String,
    /// Offset that row times and monthly sheet names are rendered in.
    pub utc_offset: ReportOffset,
    pub port: u16,
    pub requests_per_second: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CliError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let utc_offset = match var("NETFLOW_UTC_OFFSET") {
            Some(raw) => raw.parse()?,
            None => ReportOffset::UTC,
        };

        Ok(Self {
            credentials_path: var("NETFLOW_CREDENTIALS_PATH").map(PathBuf::from),
            spreadsheet_id: var("NETFLOW_SPREADSHEET_ID"),
            warehouse_path: PathBuf::from(
                var("NETFLOW_WAREHOUSE_PATH").unwrap_or_else(|| DEFAULT_WAREHOUSE_PATH.to_owned()),
            ),
            binance_url: var("NETFLOW_BINANCE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            utc_offset,
            port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
            requests_per_second: parse_or(
                "NETFLOW_REQUESTS_PER_SECOND",
                var("NETFLOW_REQUESTS_PER_SECOND"),
                DEFAULT_REQUESTS_PER_SECOND,
            )?,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, CliError> {
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|_| CliError::Config(format!("{name} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, CliError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).expect("config");

        assert_eq!(config.port, 8080);
        assert_eq!(config.binance_url, "https://fapi.binance.com");
        assert_eq!(config.utc_offset, ReportOffset::UTC);
        assert_eq!(config.warehouse_path, PathBuf::from("netflow.duckdb"));
        assert_eq!(config.requests_per_second, 20);
        assert!(config.credentials_path.is_none());
    }

    #[test]
    fn reads_overrides_and_ignores_blank_values() {
        let config = config(&[
            ("PORT", "9000"),
            ("NETFLOW_UTC_OFFSET", "+08:00"),
            ("NETFLOW_SPREADSHEET_ID", "  sheet-1 "),
            ("NETFLOW_CREDENTIALS_PATH", "   "),
        ])
        .expect("config");

        assert_eq!(config.port, 9000);
        assert_eq!(config.utc_offset.to_string(), "+08:00");
        assert_eq!(config.spreadsheet_id.as_deref(), Some("sheet-1"));
        assert!(config.credentials_path.is_none());
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(matches!(config(&[("PORT", "http")]), Err(CliError::Config(_))));
        assert!(matches!(
            config(&[("NETFLOW_UTC_OFFSET", "Asia/Taipei")]),
            Err(CliError::Validation(_))
        ));
    }
}
