// File: src/client/core.rs
use crate::client::redirect::{RedirectLayer, Redirecting};

use anyhow::{Context, Result};
use http::{Request, Uri, header};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_layer::Layer;

const MAX_REDIRECTS: usize = 5;

type HttpsClient = Client<hyper_rustls::HttpsConnector<HttpConnector>, String>;

/// Where a configured feed locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedLocation {
    Remote(Uri),
    Local(PathBuf),
}

impl FeedLocation {
    /// `file://` URLs and bare paths are local; `webcal://` is fetched over https.
    pub fn parse(url: &str) -> Result<Self> {
        let url = url.trim();
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if !url.contains("://") {
            return Ok(Self::Local(PathBuf::from(url)));
        }

        let rewritten = match url.strip_prefix("webcal://") {
            Some(rest) => format!("https://{}", rest),
            None => url.to_string(),
        };
        let uri: Uri = rewritten
            .parse()
            .with_context(|| format!("Invalid feed URL '{}'", url))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => Ok(Self::Remote(uri)),
            other => anyhow::bail!("Unsupported feed scheme {:?} in '{}'", other, url),
        }
    }
}

/// Downloads iCalendar feeds. One client is built per run and reused for every source.
#[derive(Clone, Debug)]
pub struct FeedClient {
    http: Redirecting<HttpsClient>,
}

impl FeedClient {
    pub fn new() -> Result<Self, String> {
        let mut root_store = rustls::RootCertStore::empty();
        let result = rustls_native_certs::load_native_certs();
        root_store.add_parsable_certificates(result.certs);
        if root_store.is_empty() {
            // Plain-http and local feeds still work; https sources will fail individually.
            log::warn!("No system certificates found; https calendar feeds will fail");
        }

        let tls_config = rustls::ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::aws_lc_rs::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| format!("Failed to init TLS: {}", e))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        let https_connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .build();

        let http_client: HttpsClient = Client::builder(TokioExecutor::new()).build(https_connector);
        Ok(Self {
            http: RedirectLayer::new(MAX_REDIRECTS).layer(http_client),
        })
    }

    /// Fetch a feed body. Remote requests (connect, redirects and body) are bounded by `timeout`.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        match FeedLocation::parse(url)? {
            FeedLocation::Local(path) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read calendar file {}", path.display())),
            FeedLocation::Remote(uri) => tokio::time::timeout(timeout, self.get(uri))
                .await
                .map_err(|_| anyhow::anyhow!("Request timed out after {}s", timeout.as_secs()))?,
        }
    }

    async fn get(&self, uri: Uri) -> Result<String> {
        let request = Request::get(uri.clone())
            .header(
                header::USER_AGENT,
                concat!("lockcal/", env!("CARGO_PKG_VERSION")),
            )
            .header(header::ACCEPT, "text/calendar, */*")
            .body(String::new())?;

        let response = self
            .http
            .clone()
            .oneshot(request)
            .await
            .with_context(|| format!("GET {} failed", uri))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {} returned HTTP {}", uri, status);
        }

        let body = response
            .into_body()
            .collect()
            .await
            .with_context(|| format!("Failed to read body from {}", uri))?
            .to_bytes();
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_location_kinds() {
        assert_eq!(
            FeedLocation::parse("file://tests/data/personal.ics").unwrap(),
            FeedLocation::Local(PathBuf::from("tests/data/personal.ics"))
        );
        assert_eq!(
            FeedLocation::parse("/tmp/cal.ics").unwrap(),
            FeedLocation::Local(PathBuf::from("/tmp/cal.ics"))
        );
        match FeedLocation::parse("webcal://example.com/basic.ics").unwrap() {
            FeedLocation::Remote(uri) => assert_eq!(uri.scheme_str(), Some("https")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(FeedLocation::parse("ftp://example.com/cal.ics").is_err());
    }
}
