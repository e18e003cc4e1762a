use types::Interval;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Provider request failed (status {status:?}): {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("No data for {symbol} at {interval} between {start} and {end}")]
    NoData {
        symbol: String,
        interval: Interval,
        start: i64,
        end: i64,
    },

    #[error(transparent)]
    AnyhowError(#[from] anyhow::Error),

    #[error(transparent)]
    UrlError(#[from] url::ParseError),

    #[error(transparent)]
    HttpError(#[from] http::Error),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs may carry credentials, keep them out of the message.
        let status = err.status().map(|x| x.as_u16());
        return Error::Provider {
            status,
            message: err.without_url().to_string(),
        };
    }
}
