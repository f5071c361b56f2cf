//! Blocking HTTP access to the development site.
//!
//! All network traffic goes through the [`Transport`] trait so the page
//! stages can be exercised without a server. The production implementation
//! is [`HttpTransport`], a blocking `reqwest` client. [`PageFetcher`] builds
//! on it to request one language variant of the page.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::types::PageVariant;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} timed out after {}s", .after.as_secs())]
    Timeout { url: String, after: Duration },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} does not resolve to a URL: {source}")]
    Unresolvable {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A response with its body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// One blocking GET per call. Implementations must not retry.
pub trait Transport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError>;

    /// GET `url` and return the body only on HTTP 200.
    fn get_ok(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let response = self.get(url, timeout)?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
    }
}

/// `reqwest` blocking client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Build the client. With `accept_invalid_certs`, self-signed development
    /// certificates are accepted.
    pub fn new(accept_invalid_certs: bool) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let wrap = |source: reqwest::Error| {
            if source.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    after: timeout,
                }
            } else {
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            }
        };
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .map_err(wrap)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(wrap)?;
        debug!(%url, status, bytes = body.len(), "fetched");
        Ok(FetchResponse { status, body })
    }
}

/// Fetches the rendered page for one language.
pub struct PageFetcher<'t, T: Transport + ?Sized> {
    transport: &'t T,
    timeout: Duration,
}

impl<'t, T: Transport + ?Sized> PageFetcher<'t, T> {
    pub fn new(transport: &'t T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Request `variant.url`. Anything but HTTP 200 is an error, and the
    /// caller skips the rest of that language.
    pub fn fetch(&self, variant: &PageVariant) -> Result<String, FetchError> {
        info!(lang = %variant.lang, url = %variant.url, "fetching page");
        self.transport.get_ok(&variant.url, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StubTransport;

    fn variant(lang: &str) -> PageVariant {
        PageVariant::new(&Url::parse("https://dev.test/src/").unwrap(), lang)
    }

    #[test]
    fn fetch_returns_body_on_200() {
        let stub = StubTransport::new().with("https://dev.test/src/?lang=en", 200, "<html>en</html>");
        let fetcher = PageFetcher::new(&stub, Duration::from_secs(5));
        assert_eq!(fetcher.fetch(&variant("en")).unwrap(), "<html>en</html>");
    }

    #[test]
    fn fetch_passes_page_timeout() {
        let stub = StubTransport::new().with("https://dev.test/src/?lang=en", 200, "x");
        PageFetcher::new(&stub, Duration::from_secs(42))
            .fetch(&variant("en"))
            .unwrap();
        assert_eq!(
            stub.requests(),
            vec![(
                "https://dev.test/src/?lang=en".to_string(),
                Duration::from_secs(42)
            )]
        );
    }

    #[test]
    fn non_200_is_an_error() {
        let stub = StubTransport::new().with("https://dev.test/src/?lang=hu", 500, "oops");
        let err = PageFetcher::new(&stub, Duration::from_secs(5))
            .fetch(&variant("hu"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        assert_eq!(err.to_string(), "https://dev.test/src/?lang=hu returned HTTP 500");
    }

    #[test]
    fn redirect_status_is_not_success() {
        assert!(!FetchResponse { status: 204, body: String::new() }.is_success());
        assert!(FetchResponse::ok("").is_success());
    }

    #[test]
    fn transport_errors_propagate() {
        let stub = StubTransport::new().timing_out("https://dev.test/src/?lang=en");
        let err = PageFetcher::new(&stub, Duration::from_secs(3))
            .fetch(&variant("en"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "request to https://dev.test/src/?lang=en timed out after 3s"
        );
    }
}
