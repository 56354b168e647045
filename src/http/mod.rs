//! HTTP client adapter
//!
//! Issues requests against the configured base URL and normalizes the
//! response. Anything that prevents a response from arriving is reported as
//! a [`TransportError`], never as an HTTP status.

mod client;
mod types;

use async_trait::async_trait;

pub use client::HttpClient;
pub use types::{parse_body, HttpRequest, HttpResponse, Method, TransportError};

/// Something that can complete an HTTP exchange
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}
