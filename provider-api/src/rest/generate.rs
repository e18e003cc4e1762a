use std::borrow::Cow;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use derive_builder::Builder;
use derive_getters::Getters;
use http::{HeaderMap, HeaderValue, Method};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    rest::{client::Client, endpoint::Endpoint, query::Query},
};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Builder)]
pub struct GenerateContent<'a> {
    model: Cow<'a, str>,
    api_key: Cow<'a, str>,
    prompt: Cow<'a, str>,
    #[builder(default)]
    image_png: Option<Cow<'a, [u8]>>,
    #[builder(default = "0.4")]
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

impl<'a> Endpoint for GenerateContent<'a> {
    fn method(&self) -> Method {
        return Method::POST;
    }

    fn endpoint(&self) -> Cow<'static, str> {
        return format!("v1beta/models/{}:generateContent", self.model).into();
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let mut api_key = HeaderValue::from_str(&self.api_key).map_err(http::Error::from)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        return Ok(headers);
    }

    fn content_type(&self) -> Option<&'static str> {
        return Some("application/json");
    }

    fn body(&self) -> Result<Vec<u8>, Error> {
        let mut parts = vec![Part::Text {
            text: self.prompt.to_string(),
        }];
        if let Some(image) = self.image_png.as_ref() {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png",
                    data: BASE64_STANDARD.encode(image),
                },
            });
        }
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };
        return Ok(serde_json::to_vec(&request)?);
    }
}

#[derive(Debug, Getters, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Getters, Deserialize)]
pub struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Getters, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Getters, Deserialize)]
pub struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate, parts joined in order.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|x| x.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return None;
        }
        return Some(text);
    }
}

pub async fn generate_text<C: Client + Sync>(
    client: &C,
    model: &str,
    api_key: &str,
    prompt: &str,
    image_png: Option<&[u8]>,
) -> Result<String, Error> {
    let request = GenerateContentBuilder::default()
        .model(Cow::Borrowed(model))
        .api_key(Cow::Borrowed(api_key))
        .prompt(Cow::Borrowed(prompt))
        .image_png(image_png.map(Cow::Borrowed))
        .build()
        .map_err(|err| anyhow::anyhow!(err))?;
    let response: GenerateResponse = request.query(client).await?;

    return response.text().ok_or_else(|| Error::Provider {
        status: None,
        message: format!("{model} returned no text"),
    });
}
