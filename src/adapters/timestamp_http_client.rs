//! Timestamp HTTP client adapter.
//! HTTP client adapter for RFC3161 timestamp authority requests.
//! One POST per request; transport failures are reported, never retried.

use crate::domain::constants::{
    DEFAULT_TSA_TIMEOUT_SECS, TIMESTAMP_QUERY_CONTENT_TYPE, TIMESTAMP_REPLY_CONTENT_TYPE,
};
use crate::domain::types::TsaUrl;
use crate::infra::error::{TimestampingError, TimestampingResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::future::Future;
use std::time::Duration;

/// Default `User-Agent` sent to the authority.
pub const DEFAULT_USER_AGENT: &str = concat!("asice-timestamper/", env!("CARGO_PKG_VERSION"));

/// Something that answers DER `TimeStampReq` bytes with DER `TimeStampResp` bytes.
pub trait TimeStampAuthority {
    fn request_timestamp(
        &self,
        request_der: &[u8],
    ) -> impl Future<Output = TimestampingResult<Vec<u8>>> + Send;
}

/// Configuration for timestamp HTTP operations.
#[derive(Debug, Clone)]
pub struct TimestampHttpConfig {
    pub url: TsaUrl,
    pub timeout: Duration,
    pub user_agent: String,
}

impl TimestampHttpConfig {
    #[must_use]
    pub fn new(url: TsaUrl) -> Self {
        Self {
            url,
            timeout: Duration::from_secs(DEFAULT_TSA_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP adapter performing RFC3161 POST exchanges.
#[derive(Debug, Clone)]
pub struct TimestampHttpClient {
    cfg: TimestampHttpConfig,
    http: reqwest::Client,
}

impl TimestampHttpClient {
    /// Create a new client from config.
    pub fn new(cfg: TimestampHttpConfig) -> TimestampingResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.as_str())
            .build()
            .map_err(|e| {
                TimestampingError::ConfigurationError(format!("cannot build HTTP client: {e}"))
            })?;
        Ok(Self { cfg, http })
    }

    #[must_use]
    pub fn url(&self) -> &TsaUrl {
        &self.cfg.url
    }
}

impl TimeStampAuthority for TimestampHttpClient {
    async fn request_timestamp(&self, request_der: &[u8]) -> TimestampingResult<Vec<u8>> {
        let url = &self.cfg.url;
        log::info!("Requesting timestamp from {}", url.authority());
        log::debug!("POST {} ({} bytes)", url, request_der.len());

        let resp = self
            .http
            .post(url.as_str())
            .header(CONTENT_TYPE, TIMESTAMP_QUERY_CONTENT_TYPE)
            .header(ACCEPT, TIMESTAMP_REPLY_CONTENT_TYPE)
            .body(request_der.to_vec())
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("no response within {}s", self.cfg.timeout.as_secs())
                } else {
                    format!("HTTP error: {e}")
                };
                TimestampingError::TsaUnavailable(format!("{}: {reason}", url.authority()))
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TimestampingError::TsaUnavailable(format!(
                "HTTP {status} from {}",
                url.authority()
            )));
        }

        if let Some(content_type) = resp.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !content_type.starts_with(TIMESTAMP_REPLY_CONTENT_TYPE) {
                log::warn!(
                    "{} replied with Content-Type '{content_type}', expected {TIMESTAMP_REPLY_CONTENT_TYPE}",
                    url.authority()
                );
            }
        }

        let bytes = resp.bytes().await.map_err(|e| {
            TimestampingError::TsaUnavailable(format!("reading response body failed: {e}"))
        })?;
        log::debug!("Timestamp response: {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
