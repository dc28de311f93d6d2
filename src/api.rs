use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::error::ApiError;
use crate::metrics::REQUEST_LATENCY;
use crate::models::{CreateReportRequest, ReportResponse};

// Success classes the callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Success {
    Ok,
    Created,
    Accepted,
    NoContent,
}

impl Success {
    pub fn code(self) -> u16 {
        match self {
            Success::Ok => 200,
            Success::Created => 201,
            Success::Accepted => 202,
            Success::NoContent => 204,
        }
    }
}

/// Maps a response status to a success class or a rejection.
///
/// Statuses outside the documented set become [`ApiError::UnmappedStatus`].
pub fn classify(status: StatusCode) -> Result<Success, ApiError> {
    match status {
        StatusCode::OK => Ok(Success::Ok),
        StatusCode::CREATED => Ok(Success::Created),
        StatusCode::ACCEPTED => Ok(Success::Accepted),
        StatusCode::NO_CONTENT => Ok(Success::NoContent),
        StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
        StatusCode::BAD_REQUEST => Err(ApiError::BadRequest),
        StatusCode::CONFLICT => Err(ApiError::Conflict),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        StatusCode::TOO_MANY_REQUESTS => Err(ApiError::TooManyRequests),
        other => Err(ApiError::UnmappedStatus(other.as_u16())),
    }
}

// The three calls the pipeline makes against the reports service
#[async_trait]
pub trait ReportsApi: Send + Sync {
    async fn create(&self, id: u64) -> Result<Success, ApiError>;

    // None when the service answered with a success status but no result yet
    async fn fetch(&self, id: u64) -> Result<Option<ReportResponse>, ApiError>;

    async fn delete(&self, id: u64) -> Result<Success, ApiError>;
}

// reqwest-backed client with bearer auth on every call
pub struct HttpReportsApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpReportsApi {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn reports_url(&self) -> String {
        format!("{}/reports", self.base_url)
    }

    pub fn report_url(&self, id: u64) -> String {
        format!("{}/reports/{}", self.base_url, id)
    }
}

#[async_trait]
impl ReportsApi for HttpReportsApi {
    async fn create(&self, id: u64) -> Result<Success, ApiError> {
        let _timer = REQUEST_LATENCY.start_timer();
        let body = CreateReportRequest { id: id.to_string() };
        let res = self
            .client
            .post(self.reports_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        classify(res.status())
    }

    async fn fetch(&self, id: u64) -> Result<Option<ReportResponse>, ApiError> {
        let _timer = REQUEST_LATENCY.start_timer();
        let res = self
            .client
            .get(self.report_url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        match classify(res.status())? {
            Success::Ok => {
                let text = res.text().await?;
                let body = serde_json::from_str::<ReportResponse>(&text)
                    .map_err(|e| ApiError::Decode(e.to_string()))?;
                Ok(Some(body))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: u64) -> Result<Success, ApiError> {
        let _timer = REQUEST_LATENCY.start_timer();
        let res = self
            .client
            .delete(self.report_url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        classify(res.status())
    }
}
