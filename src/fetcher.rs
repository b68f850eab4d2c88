//! 页面抓取

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// 抓取结果：只暴露状态码和正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: Some(body.into()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self { status, body: None }
    }

    /// 仅 200 视为成功
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.body.is_some()
    }
}

/// 页面来源
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<FetchResponse>;

    /// 释放网络资源，由调度器在停机时调用
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// 基于 reqwest 的抓取器
pub struct HttpFetcher {
    client: Client,
    url: String,
    closed: AtomicBool,
}

impl HttpFetcher {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<FetchResponse> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("HTTP client is closed");
        }

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = response.status().as_u16();
        debug!(url = %self.url, status, "Fetched source page");
        if status != 200 {
            return Ok(FetchResponse::status(status));
        }

        let body = response.text().await.context("Failed to read response body")?;
        Ok(FetchResponse::ok(body))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_response_success() {
        assert!(FetchResponse::ok("<html></html>").is_success());
        assert!(!FetchResponse::status(404).is_success());
        assert!(!FetchResponse::status(200).is_success());
    }

    #[tokio::test]
    async fn test_fetch_after_close_fails() {
        let fetcher = HttpFetcher::new(Client::new(), "http://127.0.0.1:9/notices");
        fetcher.close().await.unwrap();
        let err = fetcher.fetch().await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
