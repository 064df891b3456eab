use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Passage text as returned by a [`VerseSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseText {
    /// Canonical reference echoed back by the service.
    pub reference: String,
    pub text: String,
    pub translation: Option<String>,
}

#[derive(Debug)]
pub enum FetchError {
    Transport(String),
    Status(u16),
    Decode(String),
    MissingText,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(err) => write!(f, "verse request failed: {err}"),
            FetchError::Status(code) => write!(f, "verse service answered with status {code}"),
            FetchError::Decode(err) => write!(f, "verse response could not be decoded: {err}"),
            FetchError::MissingText => write!(f, "verse response had no passage text"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Anything that can turn a reference into passage text.
#[async_trait]
pub trait VerseSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<VerseText, FetchError>;
}

#[derive(Debug, Clone)]
pub struct VerseApiConfig {
    pub base_url: String,
    pub translation: String,
    pub timeout: Duration,
}

impl Default for VerseApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bible-api.com".to_string(),
            translation: "kjv".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Subset of the bible-api.com response body.
#[derive(Debug, Deserialize)]
struct PassageBody {
    reference: Option<String>,
    text: Option<String>,
    translation_name: Option<String>,
    translation_id: Option<String>,
}

impl PassageBody {
    fn into_verse(
        self,
        requested: &str,
        fallback_translation: &str,
    ) -> Result<VerseText, FetchError> {
        let text = self
            .text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(FetchError::MissingText)?;
        let reference = self
            .reference
            .filter(|reference| !reference.trim().is_empty())
            .unwrap_or_else(|| requested.to_string());
        let translation = self
            .translation_name
            .or(self.translation_id)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                (!fallback_translation.is_empty()).then(|| fallback_translation.to_uppercase())
            });
        Ok(VerseText {
            reference,
            text,
            translation,
        })
    }
}

#[cfg(feature = "web")]
pub use client::BibleApiClient;

#[cfg(feature = "web")]
mod client {
    use super::{FetchError, PassageBody, VerseApiConfig, VerseSource, VerseText};
    use async_trait::async_trait;
    use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
    use reqwest::Client;
    use tracing::debug;

    /// [`VerseSource`] backed by a bible-api.com compatible HTTP service.
    #[derive(Clone)]
    pub struct BibleApiClient {
        http: Client,
        base_url: String,
        translation: String,
    }

    impl BibleApiClient {
        pub fn new(config: &VerseApiConfig) -> Result<Self, reqwest::Error> {
            let http = Client::builder().timeout(config.timeout).build()?;
            Ok(Self {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                translation: config.translation.clone(),
            })
        }

        pub fn verse_url(&self, reference: &str) -> String {
            let encoded = utf8_percent_encode(reference.trim(), NON_ALPHANUMERIC);
            let translation = utf8_percent_encode(&self.translation, NON_ALPHANUMERIC);
            format!("{}/{encoded}?translation={translation}", self.base_url)
        }
    }

    #[async_trait]
    impl VerseSource for BibleApiClient {
        async fn fetch(&self, reference: &str) -> Result<VerseText, FetchError> {
            let url = self.verse_url(reference);
            debug!(%url, "Fetching verse text");
            let response = self
                .http
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|err| FetchError::Transport(err.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            let body: PassageBody = response
                .json()
                .await
                .map_err(|err| FetchError::Decode(err.to_string()))?;
            body.into_verse(reference, &self.translation)
        }
    }
}
