use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use super::{ReportClient, ReportDocument, ReportQuery};
use crate::config::ClientConfig;
use crate::error::ReportError;
use crate::fetch::{BasicClient, HttpClient, StaticHeaders, post_json};
use crate::timestamp::REQUEST_FORMAT;

const TMC_PATH: &str = "v1/TurningMovementCounts/GetReportData";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TmcPayload<'a> {
    location_identifier: &'a str,
    start: String,
    end: String,
    bin_size: String,
}

impl<'a> From<&'a ReportQuery> for TmcPayload<'a> {
    fn from(query: &'a ReportQuery) -> Self {
        Self {
            location_identifier: &query.location_id,
            start: query.start.format(REQUEST_FORMAT).to_string(),
            end: query.end.format(REQUEST_FORMAT).to_string(),
            bin_size: query.bin_size_minutes.to_string(),
        }
    }
}

/// [`ReportClient`] backed by the ATSPM report API over HTTP.
pub struct AtspmClient<C> {
    http: C,
    endpoint: Url,
}

impl<C: HttpClient> AtspmClient<C> {
    pub fn new(http: C, base_url: &str) -> Result<Self, ReportError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|e| ReportError::InvalidRequest(format!("base url '{base_url}': {e}")))?;
        let endpoint = base
            .join(TMC_PATH)
            .map_err(|e| ReportError::InvalidRequest(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl AtspmClient<StaticHeaders<BasicClient>> {
    /// Builds the production client: timeouts from `config`, browser-like
    /// headers for `config.origin`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ReportError> {
        let basic = BasicClient::new(config.request_timeout)?;
        let http = StaticHeaders::browser_like(basic, &config.origin)
            .map_err(|e| ReportError::InvalidRequest(format!("origin header: {e}")))?;
        Self::new(http, &config.base_url)
    }
}

#[async_trait]
impl<C: HttpClient> ReportClient for AtspmClient<C> {
    #[tracing::instrument(
        skip(self, query),
        fields(location = %query.location_id, date = %query.date())
    )]
    async fn query(&self, query: &ReportQuery) -> Result<ReportDocument, ReportError> {
        let payload = TmcPayload::from(query);
        let bytes = post_json(&self.http, &self.endpoint, &payload).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
