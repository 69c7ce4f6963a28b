use async_trait::async_trait;
use reqwest::{Request, Response};

/// Transport seam: anything able to execute a prepared HTTP request.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
