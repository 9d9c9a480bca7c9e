//! Async HTTP client shared by all strategies.
//!
//! Thin wrapper over `reqwest` with a browser-like User-Agent, a bounded
//! per-request timeout, a cookie store, and a redirect cap. No retries and
//! no inter-request delay live here: retry policy belongs to the caller, and
//! per-site pacing is out of scope for the core.

use std::time::Duration;

use reqwest::header::REFERER;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::engine::error::ScrapeError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; comicscrape/0.1; +https://github.com/comicscrape)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Async HTTP client with status and transport errors mapped into the
/// `ScrapeError` taxonomy.
#[derive(Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client with default User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    /// Builder for custom User-Agent and/or timeout.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// GET a document and return its body as text.
    pub async fn get_text(&self, url: &Url) -> Result<String, ScrapeError> {
        debug!(%url, "GET");
        let response = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::from_status(status.as_u16(), url.as_str()));
        }
        response
            .text()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))
    }

    /// GET a JSON endpoint and deserialize the body. A body that does not
    /// match `T` is a `ParseFailure` (the endpoint responded, its shape is
    /// wrong).
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, ScrapeError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| ScrapeError::ParseFailure {
            url: url.to_string(),
            reason: format!("JSON shape mismatch: {}", e),
        })
    }

    /// POST form data to a site AJAX endpoint and return the body as text
    /// (typically an HTML fragment).
    pub async fn post_form_text(
        &self,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<String, ScrapeError> {
        debug!(%url, "POST form");
        let response = self
            .inner
            .post(url.clone())
            .form(form)
            .send()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::from_status(status.as_u16(), url.as_str()));
        }
        response
            .text()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))
    }

    /// GET binary data, optionally with a synthetic Referer header. Returns
    /// the bytes and the Content-Type header value if the server sent one.
    ///
    /// Any non-success status is `NotFound`: for image fetches the header
    /// workaround has already been applied and there is no further fallback
    /// at this layer.
    pub async fn get_bytes(
        &self,
        url: &Url,
        referer: Option<&str>,
    ) -> Result<(Vec<u8>, Option<String>), ScrapeError> {
        debug!(%url, referer = referer.unwrap_or("-"), "GET bytes");
        let mut request = self.inner.get(url.clone());
        if let Some(r) = referer {
            request = request.header(REFERER, r);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(';').next().unwrap_or(s).trim().to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))?;
        Ok((bytes.to_vec(), media_type))
    }

    /// GET a URL without following the body; returns the final URL after
    /// redirects and the status. Used by the health harness.
    pub async fn probe(&self, url: &Url) -> Result<(Url, u16), ScrapeError> {
        let response = self
            .inner
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::from_transport(e, url.as_str(), self.timeout))?;
        Ok((response.url().clone(), response.status().as_u16()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for HttpClient with optional User-Agent and timeout.
#[derive(Debug)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpClient {
            inner,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn get_text_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client.get_text(&url(&server, "/page")).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn get_text_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.get_text(&url(&server, "/gone")).await;
        assert!(matches!(
            result,
            Err(ScrapeError::NotFound { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn get_text_500_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/err"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.get_text(&url(&server, "/err")).await;
        assert!(matches!(result, Err(ScrapeError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn get_json_shape_mismatch_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        #[derive(serde::Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            items: Vec<String>,
        }

        let client = HttpClient::new().unwrap();
        let result: Result<Shape, _> = client.get_json(&url(&server, "/api")).await;
        assert!(matches!(result, Err(ScrapeError::ParseFailure { .. })));
    }

    #[tokio::test]
    async fn get_bytes_sends_referer_when_given() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .and(header("referer", "https://example.test/manga/sample/ch-1/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![0xff, 0xd8]),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let (bytes, media_type) = client
            .get_bytes(
                &url(&server, "/img.jpg"),
                Some("https://example.test/manga/sample/ch-1/"),
            )
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xff, 0xd8]);
        assert_eq!(media_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn get_bytes_non_success_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let result = client.get_bytes(&url(&server, "/img.jpg"), None).await;
        assert!(matches!(
            result,
            Err(ScrapeError::NotFound { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_unreachable() {
        // Port 1 on localhost refuses connections.
        let client = HttpClient::builder().timeout_secs(2).build().unwrap();
        let bad = Url::parse("http://127.0.0.1:1/").unwrap();
        let result = client.get_text(&bad).await;
        assert!(matches!(result, Err(ScrapeError::Unreachable { .. })));
    }
}
