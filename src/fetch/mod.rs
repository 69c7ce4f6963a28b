mod basic;
mod client;
mod headers;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use headers::StaticHeaders;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Serialize;
use tracing::debug;

use crate::error::ReportError;

/// POSTs `body` as JSON and returns the raw response bytes.
///
/// # Errors
///
/// [`ReportError::Request`] when no response arrives and
/// [`ReportError::Status`] for a non-success status.
pub async fn post_json<C: HttpClient + ?Sized, B: Serialize + ?Sized>(
    client: &C,
    url: &Url,
    body: &B,
) -> Result<Bytes, ReportError> {
    let mut req = Request::new(Method::POST, url.clone());
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ReportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await?;
    debug!(%url, bytes = bytes.len(), "Report response received");
    Ok(bytes)
}
