use std::{borrow::Cow, ops::Deref};

use derive_builder::Builder;
use derive_getters::Getters;
use serde::Deserialize;
use types::{Candle, Interval};

use crate::{
    error::Error,
    rest::{client::Client, endpoint::Endpoint, params::QueryParams, query::Query},
};

/// Chart request for one symbol over `[period1, period2]` (Unix seconds).
#[derive(Debug, Clone, Builder)]
pub struct Chart<'a> {
    symbol: Cow<'a, str>,
    period1: i64,
    period2: i64,
    interval: Interval,
}

impl<'a> Endpoint for Chart<'a> {
    fn endpoint(&self) -> Cow<'static, str> {
        return format!("v8/finance/chart/{}", self.symbol.deref()).into();
    }

    fn params(&self) -> QueryParams {
        let mut params = QueryParams::default();

        params
            .push("period1", self.period1.to_string())
            .push("period2", self.period2.to_string())
            .push("interval", self.interval.to_string())
            .push("includePrePost", "true");
        return params;
    }
}

#[derive(Debug, Getters, Deserialize)]
pub struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Getters, Deserialize)]
pub struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Getters, Deserialize)]
pub struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Getters, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Getters, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Getters, Deserialize)]
pub struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Zips the parallel arrays into candles. Indices without a close are
    /// dropped, missing open/high/low fall back to the close, and the output is
    /// ascending by time with duplicate timestamps removed.
    pub fn into_candles(self) -> Result<Vec<Candle>, Error> {
        if let Some(err) = self.chart.error {
            return Err(Error::Provider {
                status: None,
                message: format!("{}: {}", err.code, err.description),
            });
        }
        let result = match self.chart.result.and_then(|x| x.into_iter().next()) {
            Some(x) => x,
            None => return Ok(Vec::new()),
        };
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let value_at = |values: &Vec<Option<f64>>, idx: usize| values.get(idx).copied().flatten();

        let mut candles: Vec<Candle> = result
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(idx, time)| {
                let close = value_at(&quote.close, idx)?;
                Some(Candle {
                    time: *time,
                    open: value_at(&quote.open, idx).unwrap_or(close),
                    high: value_at(&quote.high, idx).unwrap_or(close),
                    low: value_at(&quote.low, idx).unwrap_or(close),
                    close,
                    volume: value_at(&quote.volume, idx).unwrap_or(0.0),
                })
            })
            .collect();
        candles.sort_by_key(|x| x.time);
        candles.dedup_by_key(|x| x.time);
        return Ok(candles);
    }
}

/// Fetches and normalizes candles. An empty result is `Error::NoData`, which
/// callers treat differently from a failed request.
pub async fn fetch_candles<C: Client + Sync>(
    client: &C,
    symbol: &str,
    interval: Interval,
    start: i64,
    end: i64,
) -> Result<Vec<Candle>, Error> {
    let request = ChartBuilder::default()
        .symbol(Cow::Borrowed(symbol))
        .period1(start)
        .period2(end)
        .interval(interval)
        .build()
        .map_err(|err| anyhow::anyhow!(err))?;
    let response: ChartResponse = request.query(client).await?;
    let candles = response.into_candles()?;

    if candles.is_empty() {
        return Err(Error::NoData {
            symbol: symbol.to_owned(),
            interval,
            start,
            end,
        });
    }
    tracing::debug!("Fetched {} {interval} candles for {symbol}", candles.len());
    return Ok(candles);
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{request, response, StatusCode};
    use std::sync::Mutex;
    use types::Interval;
    use url::Url;

    use super::{fetch_candles, ChartResponse};
    use crate::{error::Error, rest::client::Client};

    struct CannedClient {
        status: StatusCode,
        body: &'static str,
        last_uri: Mutex<Option<String>>,
    }

    impl CannedClient {
        fn new(status: StatusCode, body: &'static str) -> Self {
            return Self {
                status,
                body,
                last_uri: Mutex::new(None),
            };
        }
    }

    #[async_trait]
    impl Client for CannedClient {
        fn url(&self, endpoint: &str) -> Result<Url, Error> {
            return Ok(Url::parse("https://charts.test/")?.join(endpoint)?);
        }

        async fn exec(
            &self,
            request: request::Builder,
            _body: Vec<u8>,
        ) -> Result<response::Response<Bytes>, Error> {
            let uri = request.uri_ref().map(|x| x.to_string());
            *self.last_uri.lock().unwrap() = uri;
            return Ok(response::Builder::new()
                .status(self.status)
                .body(Bytes::from_static(self.body.as_bytes()))?);
        }
    }

    const DESCENDING_WITH_GAP: &str = r#"{"chart":{"result":[{"meta":{"symbol":"ES=F"},
        "timestamp":[400,300,200,100],
        "indicators":{"quote":[{"open":[4.0,null,2.0,1.0],"high":[4.5,null,2.5,1.5],
        "low":[3.5,null,1.5,null],"close":[4.0,null,2.0,1.0],"volume":[10,null,null,30]}]}}],
        "error":null}}"#;

    #[test]
    fn normalizes_and_sorts() {
        let response: ChartResponse = serde_json::from_str(DESCENDING_WITH_GAP).unwrap();
        let candles = response.into_candles().unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(
            candles.iter().map(|x| x.time).collect::<Vec<_>>(),
            vec![100, 200, 400]
        );
        assert_eq!(candles[0].low, 1.0, "missing low falls back to close");
        assert_eq!(candles[1].volume, 0.0);
        assert_eq!(candles[2].high, 4.5);
    }

    #[test]
    fn drops_null_close() {
        let body = r#"{"chart":{"result":[{"timestamp":[1,2,3,4],
            "indicators":{"quote":[{"close":[1,2,null,4]}]}}],"error":null}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let candles = response.into_candles().unwrap();

        assert_eq!(candles.len(), 3);
        assert!(candles.iter().all(|x| x.open == x.close && x.high == x.close));
        assert!(candles.windows(2).all(|x| x[0].time < x[1].time));
    }

    #[test]
    fn provider_error_object() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let err = response.into_candles().expect_err("error object should fail");
        assert!(matches!(err, Error::Provider { status: None, .. }));
    }

    #[tokio::test]
    async fn empty_result_is_no_data() {
        let client = CannedClient::new(
            StatusCode::OK,
            r#"{"chart":{"result":[{"timestamp":[],"indicators":{"quote":[{}]}}],"error":null}}"#,
        );
        let err = fetch_candles(&client, "NQ=F", Interval::FiveMinutes, 10, 20)
            .await
            .expect_err("empty result should be NoData");
        assert!(matches!(err, Error::NoData { interval: Interval::FiveMinutes, .. }));
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error() {
        let client = CannedClient::new(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests");
        let err = fetch_candles(&client, "NQ=F", Interval::OneMinute, 10, 20)
            .await
            .expect_err("429 should fail");
        assert!(matches!(err, Error::Provider { status: Some(429), .. }));
    }

    #[tokio::test]
    async fn builds_query_string() {
        let client = CannedClient::new(StatusCode::OK, DESCENDING_WITH_GAP);
        let candles = fetch_candles(&client, "ES=F", Interval::FifteenMinutes, 1000, 2000)
            .await
            .expect("fetch should succeed");
        assert_eq!(candles.len(), 3);

        let uri = client.last_uri.lock().unwrap().clone().unwrap();
        assert!(uri.starts_with("https://charts.test/v8/finance/chart/ES=F?"));
        assert!(uri.contains("period1=1000"));
        assert!(uri.contains("period2=2000"));
        assert!(uri.contains("interval=15m"));
    }
}
