use crate::external::market_data::{
    AssetInfo, Bar, MarketDataError, MarketDataProvider, Quote, Trade, TradingSession,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const DATA_BASE_URL: &str = "https://data.alpaca.markets";
const TRADER_BASE_URL: &str = "https://api.alpaca.markets";

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

const CURRENCY: &str = "USD";
const HISTORICAL_LIMIT: &str = "10000";
// SIP covers all exchanges for historical bars; the free-tier latest
// quote/trade endpoints only serve IEX.
const HISTORICAL_FEED: &str = "sip";
const LATEST_FEED: &str = "iex";

pub struct AlpacaProvider {
    client: reqwest::Client,
    api_key: String,
    api_secret: String,
    data_base: String,
    trader_base: String,
}

impl AlpacaProvider {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_secret,
            data_base: DATA_BASE_URL.to_string(),
            trader_base: TRADER_BASE_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, MarketDataError> {
        let api_key = std::env::var("APCA_API_KEY_ID")
            .map_err(|_| MarketDataError::BadResponse("APCA_API_KEY_ID not set".into()))?;
        let api_secret = std::env::var("APCA_API_SECRET_KEY")
            .map_err(|_| MarketDataError::BadResponse("APCA_API_SECRET_KEY not set".into()))?;
        Ok(Self::new(api_key, api_secret))
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(KEY_HEADER, &self.api_key)
            .header(SECRET_HEADER, &self.api_secret)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MarketDataError> {
        let resp = request
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        match resp.status().as_u16() {
            200..=299 => Ok(resp),
            401 | 403 => Err(MarketDataError::Unauthorized),
            429 => Err(MarketDataError::RateLimited),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(MarketDataError::BadResponse(format!(
                    "status {}: {}",
                    status, body
                )))
            }
        }
    }
}

// Bar payloads look like:
// { "bars": { "AAPL": [ {"t":"2024-01-02T20:59:00Z","o":..,"h":..,"l":..,"c":..,"v":..} ] },
//   "next_page_token": null }
#[derive(Debug, Clone, Deserialize)]
struct ApiBar {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

impl From<ApiBar> for Bar {
    fn from(b: ApiBar) -> Self {
        Bar {
            timestamp: b.timestamp,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MultiBarsResponse {
    bars: Option<HashMap<String, Vec<ApiBar>>>,
}

#[derive(Debug, Deserialize)]
struct SingleBarsResponse {
    bars: Option<Vec<ApiBar>>,
}

#[derive(Debug, Deserialize)]
struct ApiQuote {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "bp")]
    bid_price: f64,
    #[serde(rename = "bs")]
    bid_size: f64,
    #[serde(rename = "ap")]
    ask_price: f64,
    #[serde(rename = "as")]
    ask_size: f64,
}

#[derive(Debug, Deserialize)]
struct LatestQuotesResponse {
    quotes: HashMap<String, ApiQuote>,
}

#[derive(Debug, Deserialize)]
struct ApiTrade {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "p")]
    price: f64,
    #[serde(rename = "s")]
    size: f64,
}

#[derive(Debug, Deserialize)]
struct LatestTradesResponse {
    trades: HashMap<String, ApiTrade>,
}

// Calendar entries: [ { "date": "2024-01-02", "open": "09:30", "close": "16:00" } ]
#[derive(Debug, Deserialize)]
struct ApiCalendarDay {
    date: String,
}

#[derive(Debug, Deserialize)]
struct ApiAsset {
    symbol: String,
    name: String,
    exchange: String,
}

#[async_trait]
impl MarketDataProvider for AlpacaProvider {
    async fn minute_bars(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Bar>>, MarketDataError> {
        let url = format!("{}/v2/stocks/bars", self.data_base);
        let resp = self
            .send(self.get(url).query(&[
                ("symbols", symbols.join(",").as_str()),
                ("timeframe", "1Min"),
                ("start", start.to_rfc3339().as_str()),
                ("end", end.to_rfc3339().as_str()),
                ("limit", HISTORICAL_LIMIT),
                ("adjustment", "all"),
                ("feed", HISTORICAL_FEED),
                ("currency", CURRENCY),
                ("sort", "asc"),
            ]))
            .await?;

        let body = resp
            .json::<MultiBarsResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        // A window with no trades comes back as "bars": null.
        let bars = body.bars.unwrap_or_default();
        Ok(bars
            .into_iter()
            .map(|(sym, bars)| (sym, bars.into_iter().map(Bar::from).collect()))
            .collect())
    }

    async fn bars_single(
        &self,
        symbol: &str,
        timeframe: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_base, symbol);
        let resp = self
            .send(self.get(url).query(&[
                ("timeframe", timeframe),
                ("start", start.to_rfc3339().as_str()),
                ("end", end.to_rfc3339().as_str()),
                ("limit", HISTORICAL_LIMIT),
                ("adjustment", "all"),
                ("feed", HISTORICAL_FEED),
                ("currency", CURRENCY),
                ("sort", "asc"),
            ]))
            .await?;

        let body = resp
            .json::<SingleBarsResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(body
            .bars
            .unwrap_or_default()
            .into_iter()
            .map(Bar::from)
            .collect())
    }

    async fn latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        let url = format!("{}/v2/stocks/quotes/latest", self.data_base);
        let resp = self
            .send(self.get(url).query(&[
                ("symbols", symbols.join(",").as_str()),
                ("feed", LATEST_FEED),
                ("currency", CURRENCY),
            ]))
            .await?;

        let body = resp
            .json::<LatestQuotesResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(body
            .quotes
            .into_iter()
            .map(|(sym, q)| {
                (
                    sym,
                    Quote {
                        timestamp: q.timestamp,
                        bid_price: q.bid_price,
                        bid_size: q.bid_size,
                        ask_price: q.ask_price,
                        ask_size: q.ask_size,
                    },
                )
            })
            .collect())
    }

    async fn latest_trades(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Trade>, MarketDataError> {
        let url = format!("{}/v2/stocks/trades/latest", self.data_base);
        let resp = self
            .send(self.get(url).query(&[
                ("symbols", symbols.join(",").as_str()),
                ("feed", LATEST_FEED),
                ("currency", CURRENCY),
            ]))
            .await?;

        let body = resp
            .json::<LatestTradesResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(body
            .trades
            .into_iter()
            .map(|(sym, t)| {
                (
                    sym,
                    Trade {
                        timestamp: t.timestamp,
                        price: t.price,
                        size: t.size,
                    },
                )
            })
            .collect())
    }

    async fn trading_sessions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, MarketDataError> {
        let url = format!("{}/v2/calendar", self.trader_base);
        let resp = self
            .send(self.get(url).query(&[
                ("start", start.format("%Y-%m-%d").to_string().as_str()),
                ("end", end.format("%Y-%m-%d").to_string().as_str()),
                ("date_type", "TRADING"),
            ]))
            .await?;

        let days = resp
            .json::<Vec<ApiCalendarDay>>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        let mut sessions = Vec::with_capacity(days.len());
        for day in days {
            let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
                .map_err(|e| MarketDataError::Parse(format!("calendar date '{}': {}", day.date, e)))?;
            sessions.push(TradingSession { date });
        }
        Ok(sessions)
    }

    async fn asset_info(&self, symbol: &str) -> Result<AssetInfo, MarketDataError> {
        let url = format!("{}/v2/assets/{}", self.trader_base, symbol);
        let resp = self.send(self.get(url)).await?;

        let asset = resp
            .json::<ApiAsset>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(AssetInfo {
            symbol: asset.symbol,
            name: asset.name,
            exchange: asset.exchange,
        })
    }

    async fn check_credentials(
        &self,
        api_key: &str,
        api_secret: &str,
    ) -> Result<bool, MarketDataError> {
        let url = format!("{}/v2/account", self.trader_base);
        let resp = self
            .client
            .get(url)
            .header(KEY_HEADER, api_key)
            .header(SECRET_HEADER, api_secret)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        match resp.status().as_u16() {
            200..=299 => Ok(true),
            401 | 403 => Ok(false),
            429 => Err(MarketDataError::RateLimited),
            status => Err(MarketDataError::BadResponse(format!("status {}", status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn multi_bars_payload_parses() {
        let body = r#"{
            "bars": {
                "AAPL": [
                    {"t": "2024-03-08T20:59:00Z", "o": 170.1, "h": 170.5,
                     "l": 170.0, "c": 170.4, "v": 125000, "n": 900, "vw": 170.3}
                ]
            },
            "next_page_token": null
        }"#;
        let parsed: MultiBarsResponse = serde_json::from_str(body).unwrap();
        let bars = parsed.bars.unwrap();
        let bar = Bar::from(bars["AAPL"][0].clone());
        assert_eq!(
            bar.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 8, 20, 59, 0).unwrap()
        );
        assert_eq!(bar.close, 170.4);
        assert_eq!(bar.volume, 125000.0);
    }

    #[test]
    fn empty_window_comes_back_as_null_bars() {
        let parsed: MultiBarsResponse =
            serde_json::from_str(r#"{"bars": null, "next_page_token": null}"#).unwrap();
        assert!(parsed.bars.is_none());
    }

    #[test]
    fn quote_payload_uses_short_field_names() {
        let body = r#"{
            "quotes": {
                "AAPL": {"t": "2024-03-08T20:59:01Z", "bp": 170.39, "bs": 3,
                         "ap": 170.41, "as": 2, "ax": "V", "bx": "V", "c": ["R"]}
            }
        }"#;
        let parsed: LatestQuotesResponse = serde_json::from_str(body).unwrap();
        let q = &parsed.quotes["AAPL"];
        assert_eq!(q.bid_price, 170.39);
        assert_eq!(q.ask_price, 170.41);
        assert_eq!(q.ask_size, 2.0);
    }

    #[test]
    fn calendar_payload_parses_dates_only() {
        let body = r#"[
            {"date": "2024-03-07", "open": "09:30", "close": "16:00"},
            {"date": "2024-03-08", "open": "09:30", "close": "16:00"}
        ]"#;
        let days: Vec<ApiCalendarDay> = serde_json::from_str(body).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2024-03-07");
    }

    #[test]
    fn asset_payload_keeps_name_and_exchange() {
        let body = r#"{
            "id": "b0b6dd9d-8b9b-48a9-ba46-b9d54906e415",
            "class": "us_equity", "exchange": "NASDAQ", "symbol": "AAPL",
            "name": "Apple Inc. Common Stock", "status": "active",
            "tradable": true
        }"#;
        let asset: ApiAsset = serde_json::from_str(body).unwrap();
        assert_eq!(asset.symbol, "AAPL");
        assert_eq!(asset.exchange, "NASDAQ");
        assert_eq!(asset.name, "Apple Inc. Common Stock");
    }
}
