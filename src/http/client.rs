//! reqwest-backed transport
//!
//! The client carries no request timeout of its own. The runner bounds every
//! exchange with the scenario's timeout, which may exceed the run default.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Url;
use std::collections::BTreeMap;

use crate::common::config::Settings;
use crate::common::{Error, Result};

use super::types::{parse_body, HttpRequest, HttpResponse, TransportError};
use super::Transport;

/// HTTP client bound to the base URL of the API under test
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Build a client from resolved settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
        })
    }

    /// Resolve a request path against the base URL
    ///
    /// The path is appended to the base URL's own path rather than replacing
    /// it, so a base of `http://host/api` and a path of `/users` yields
    /// `http://host/api/users`. Trailing slashes in the path are preserved.
    pub fn url_for(&self, request: &HttpRequest) -> std::result::Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = if request.path.starts_with('/') {
            request.path.clone()
        } else {
            format!("/{}", request.path)
        };
        let raw = format!("{}{}", base, path);

        let mut url = Url::parse(&raw).map_err(|e| TransportError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

fn classify(url: &Url, err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        TransportError::Request(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let url = self.url_for(request)?;
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(request.method.into(), url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| classify(&url, e))?;

        let status = response.status().as_u16();
        let headers = normalize_headers(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        tracing::debug!(status, bytes = bytes.len(), "received response");

        let mut normalized = HttpResponse::new(status, parse_body(&bytes));
        normalized.headers = headers;
        Ok(normalized)
    }
}

fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}
