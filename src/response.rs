//! Fetch-like response objects.
//!
//! A [`FetchResponse`] is what a stubbed fetch resolves to. The body readers
//! consume the response, so take a [`Clone`] first when the body needs to be
//! read more than once.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Default content type for serialized rule values.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A response produced by the stub instead of the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    status: u16,
    content_type: String,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl FetchResponse {
    /// Create a response with a raw body.
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Serialize a value into a `200 application/json` response.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(200, JSON_CONTENT_TYPE, body))
    }

    /// Plain text response.
    pub fn plain(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, "text/plain", body.into().into_bytes())
    }

    /// Override the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a response header. `Content-Type` replaces the content type.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = value.into();
        } else {
            self.headers.insert(name, value.into());
        }
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the body as JSON.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Read the body as text (lossy UTF-8).
    pub async fn text(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Take the raw body bytes.
    pub async fn bytes(self) -> Vec<u8> {
        self.body
    }
}
