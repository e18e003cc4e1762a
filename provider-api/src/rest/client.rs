use bytes::Bytes;

use async_trait::async_trait;
use http::{header::USER_AGENT, request, response, HeaderValue};
use url::Url;

use crate::error::Error;

#[async_trait]
pub trait Client {
    fn url(&self, endpoint: &str) -> Result<Url, Error>;

    async fn exec(
        &self,
        request: request::Builder,
        body: Vec<u8>,
    ) -> Result<response::Response<Bytes>, Error>;
}

#[async_trait]
impl<T: Client + Send + Sync> Client for std::sync::Arc<T> {
    fn url(&self, endpoint: &str) -> Result<Url, Error> {
        return self.as_ref().url(endpoint);
    }

    async fn exec(
        &self,
        request: request::Builder,
        body: Vec<u8>,
    ) -> Result<response::Response<Bytes>, Error> {
        return self.as_ref().exec(request, body).await;
    }
}

pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self, Error> {
        let client = reqwest::Client::new();
        let base_url = Url::parse(base_url)?;

        return Ok(Self { client, base_url });
    }

    async fn send(
        &self,
        request: request::Builder,
        body: Vec<u8>,
    ) -> anyhow::Result<response::Response<Bytes>, Error> {
        let mut http_request = request.body(body)?;
        // The chart endpoint rejects requests without a browser-like agent.
        http_request
            .headers_mut()
            .insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (PipPaper)"));
        let request: reqwest::Request = http_request.try_into()?;
        let resp = self.client.execute(request).await?;
        let mut http_resp = http::response::Response::builder()
            .status(resp.status())
            .version(resp.version());

        if let Some(http_headers) = http_resp.headers_mut() {
            for (key, value) in resp.headers() {
                http_headers.insert(key, value.to_owned());
            }
        }
        return Ok(http_resp.body(resp.bytes().await?)?);
    }
}

#[async_trait]
impl Client for RestClient {
    fn url(&self, endpoint: &str) -> anyhow::Result<Url, Error> {
        let url = self.base_url.join(endpoint)?.to_owned();

        return Ok(url);
    }

    async fn exec(
        &self,
        request: request::Builder,
        body: Vec<u8>,
    ) -> anyhow::Result<response::Response<Bytes>, Error> {
        return self.send(request, body).await;
    }
}
