use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::data_source::{CandlesRequest, MarketDataSource, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::throttling::RequestThrottle;
use crate::{Candle, CandleSeries, Symbol, TickerSnapshot, UtcDateTime, ValidationError};

pub const DEFAULT_BASE_URL: &str = "https://fapi.binance.com";

/// Default request budget; the futures API allows 2400 weight/minute per IP.
const DEFAULT_REQUESTS_PER_SECOND: u32 = 20;

/// Binance USDⓈ-M futures adapter (`/fapi/v1/ticker/24hr` and `/fapi/v1/klines`).
#[derive(Clone)]
pub struct BinanceFuturesAdapter {
    base_url: String,
    http_client: Arc<dyn HttpClient>,
    throttle: RequestThrottle,
    timeout_ms: u64,
}

impl Default for BinanceFuturesAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()))
    }
}

impl BinanceFuturesAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            http_client,
            throttle: RequestThrottle::per_second(DEFAULT_REQUESTS_PER_SECOND),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn get(&self, endpoint: &str) -> Result<String, SourceError> {
        self.throttle.acquire().await;

        let request = HttpRequest::get(endpoint).with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.timed_out() {
                SourceError::timeout(format!("binance {error}"))
            } else {
                SourceError::unavailable(format!("binance {error}"))
            }
        })?;

        if response.is_success() {
            return Ok(response.body);
        }

        let detail = serde_json::from_str::<BinanceErrorPayload>(&response.body)
            .map(|payload| format!(": {} (code {})", payload.msg, payload.code))
            .unwrap_or_default();
        let message = format!("binance returned status {}{detail}", response.status);

        Err(match response.status {
            418 | 429 => SourceError::rate_limited(message),
            400..=499 => SourceError::invalid_request(message),
            _ => SourceError::unavailable(message),
        })
    }
}

impl MarketDataSource for BinanceFuturesAdapter {
    fn name(&self) -> &'static str {
        "binance-futures"
    }

    fn tickers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TickerSnapshot>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let endpoint = format!("{}/fapi/v1/ticker/24hr", self.base_url);
            let body = self.get(&endpoint).await?;
            parse_tickers(&body)
        })
    }

    fn candles<'a>(
        &'a self,
        req: CandlesRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CandleSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let endpoint = format!(
                "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
                self.base_url,
                urlencoding::encode(req.symbol.as_str()),
                req.interval,
                req.limit
            );
            let body = self.get(&endpoint).await?;
            let candles = parse_klines(&body)?;

            Ok(CandleSeries::new(req.symbol, req.interval, candles))
        })
    }
}

#[derive(Debug, Deserialize)]
struct BinanceErrorPayload {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerPayload {
    symbol: String,
    last_price: String,
    quote_volume: String,
}

/// One kline row: `[open_time, open, high, low, close, volume, close_time,
/// quote_volume, trades, taker_buy_base_volume, taker_buy_quote_volume, ignore]`.
#[derive(Debug, Deserialize)]
struct KlinePayload(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    serde_json::Value,
);

/// Parses the 24h ticker list. Entries that cannot be normalized are dropped,
/// a body that is not a ticker array is an error.
pub fn parse_tickers(body: &str) -> Result<Vec<TickerSnapshot>, SourceError> {
    let payload: Vec<TickerPayload> = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse binance tickers: {e}")))?;

    let total = payload.len();
    let tickers: Vec<TickerSnapshot> = payload
        .into_iter()
        .filter_map(|raw| match normalize_ticker(&raw) {
            Ok(ticker) => Some(ticker),
            Err(error) => {
                tracing::debug!(symbol = %raw.symbol, %error, "dropping unparseable ticker");
                None
            }
        })
        .collect();

    if tickers.len() < total {
        tracing::debug!(kept = tickers.len(), total, "ticker list normalized");
    }

    Ok(tickers)
}

/// Parses a klines payload into validated candles, oldest first.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>, SourceError> {
    let payload: Vec<KlinePayload> = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse binance klines: {e}")))?;

    payload
        .iter()
        .map(normalize_kline)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SourceError::malformed(format!("invalid binance kline: {e}")))
}

fn normalize_ticker(raw: &TickerPayload) -> Result<TickerSnapshot, ValidationError> {
    TickerSnapshot::new(
        Symbol::parse(&raw.symbol)?,
        parse_decimal("lastPrice", &raw.last_price)?,
        parse_decimal("quoteVolume", &raw.quote_volume)?,
    )
}

fn normalize_kline(raw: &KlinePayload) -> Result<Candle, ValidationError> {
    Candle::new(
        UtcDateTime::from_unix_millis(raw.0)?,
        parse_decimal("open", &raw.1)?,
        parse_decimal("high", &raw.2)?,
        parse_decimal("low", &raw.3)?,
        parse_decimal("close", &raw.4)?,
        parse_decimal("volume", &raw.5)?,
        parse_decimal("quoteVolume", &raw.7)?,
        parse_decimal("takerBuyQuoteVolume", &raw.10)?,
    )
}

fn parse_decimal(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidDecimal {
            field,
            value: value.to_owned(),
        })
}
