//! HTTP 抓取 - 基础设施层
//!
//! 唯一持有 `reqwest::Client` 的抓取组件，对外只暴露 `fetch_text` 能力

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, AppResult, NetworkError};

const USER_AGENT: &str = concat!("arxiv-podcast/", env!("CARGO_PKG_VERSION"));

/// 文本抓取能力
#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// GET 指定 URL，返回响应正文
    async fn fetch_text(&self, url: &str) -> AppResult<String>;
}

/// 基于 reqwest 的抓取实现
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::invalid_config("http_client", e.to_string(), "可用的 HTTP 客户端配置"))?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else if let Some(status) = err.status() {
            NetworkError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            NetworkError::RequestFailed {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> AppResult<String> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| self.map_error(url, e))?;
        debug!("GET {} 完成 ({} 字节)", url, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要访问 arxiv.org"]
    async fn test_fetch_listing_live() {
        let fetcher = HttpFetcher::new(Duration::from_secs(30)).unwrap();
        let body = fetcher
            .fetch_text("https://arxiv.org/list/cs.IR/new")
            .await
            .unwrap();
        assert!(body.contains("/abs/"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch_text("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert!(err.is_retryable());
    }
}
