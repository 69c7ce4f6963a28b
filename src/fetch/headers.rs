use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, InvalidHeaderValue, ORIGIN, REFERER};

/// An [`HttpClient`] wrapper that adds a fixed set of headers to every request.
///
/// The public ATSPM report API only answers requests that look like they come
/// from its own web front-end, so [`StaticHeaders::browser_like`] sets the
/// `Origin` and `Referer` the website would send. Headers already present on
/// the request are left untouched.
pub struct StaticHeaders<C> {
    pub inner: C,
    pub headers: HeaderMap,
}

impl<C> StaticHeaders<C> {
    /// Sends `Origin: <origin>` and `Referer: <origin>/`.
    pub fn browser_like(inner: C, origin: &str) -> Result<Self, InvalidHeaderValue> {
        let origin = origin.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
        headers.insert(REFERER, HeaderValue::from_str(&format!("{origin}/"))?);
        Ok(Self { inner, headers })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for StaticHeaders<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.execute(req).await
    }
}
