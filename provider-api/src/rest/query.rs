use anyhow::Context;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

use crate::error::Error;

use super::{client::Client, endpoint::Endpoint};

#[async_trait]
pub trait Query<T, C>
where
    C: Client,
{
    async fn query(&self, client: &C) -> Result<T, Error>;
}

#[async_trait]
impl<E, T, C> Query<T, C> for E
where
    E: Endpoint + Sync,
    T: DeserializeOwned + Send + 'static,
    C: Client + Sync,
{
    async fn query(&self, client: &C) -> Result<T, Error> {
        let mut url = client.url(&self.endpoint())?;
        self.params().add_to_url(&mut url);
        let mut request = http::Request::builder()
            .method(self.method())
            .uri(url.as_str());
        if let Some(content_type) = self.content_type() {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(headers) = request.headers_mut() {
            headers.extend(self.headers()?);
        }
        let response = client.exec(request, self.body()?).await?;

        if !response.status().is_success() {
            return Err(Error::Provider {
                status: Some(response.status().as_u16()),
                message: String::from_utf8_lossy(response.body()).into_owned(),
            });
        }
        let res: T = serde_json::from_slice(response.body())
            .context(format!("Parsing response from {}", self.endpoint()))?;
        return Ok(res);
    }
}
