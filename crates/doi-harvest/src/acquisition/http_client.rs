//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests. Used by the lookup tier and for
//! fetching document URLs directly. One request per call: the tiered
//! retriever never retries inside a tier.

use crate::error::RetrievalError;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// User agent shared by the HTTP client and the browser, so a URL observed
/// in the browser is fetched under the same identity.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/120.0.0.0 Safari/537.36";

/// A fetched document that passed the content-type check.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: String,
    /// Raw body.
    pub body: Vec<u8>,
}

/// HTTP client for the acquisition layer.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new HTTP client with the shared browser user agent.
    pub fn new(timeout_ms: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// GET `url` and decode a JSON body. Non-2xx statuses are network errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<T, RetrievalError> {
        let resp = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| RetrievalError::network(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RetrievalError::network(url, format!("HTTP {status}")));
        }

        resp.json::<T>()
            .await
            .map_err(|e| RetrievalError::network(url, format!("invalid JSON: {e}")))
    }

    /// GET a document URL and keep the body only if it is declared a PDF.
    /// Only a final `200 OK` with a non-empty body counts.
    ///
    /// `cookie` is sent verbatim as the `Cookie` header; the browser tiers use
    /// it to carry the page session over to the direct fetch.
    pub async fn fetch_document(
        &self,
        url: &str,
        cookie: Option<&str>,
        timeout_ms: u64,
    ) -> Result<FetchedDocument, RetrievalError> {
        let mut builder = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms));
        if let Some(cookie) = cookie {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| RetrievalError::network(url, e))?;

        let status = resp.status();
        let final_url = resp.url().to_string();
        if status != reqwest::StatusCode::OK {
            return Err(RetrievalError::network(url, format!("HTTP {status}")));
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_pdf_content_type(&content_type) {
            let found = if content_type.is_empty() {
                "no content type".to_string()
            } else {
                content_type
            };
            return Err(RetrievalError::ContentMismatch {
                url: url.to_string(),
                found,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RetrievalError::network(url, e))?
            .to_vec();
        if body.is_empty() {
            return Err(RetrievalError::ContentMismatch {
                url: url.to_string(),
                found: "an empty body".to_string(),
            });
        }

        Ok(FetchedDocument {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Whether a `Content-Type` value declares a PDF (`application/pdf`, any
/// parameters, any case).
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_pdf_content_type() {
        assert!(is_pdf_content_type("application/pdf"));
        assert!(is_pdf_content_type("Application/PDF; charset=binary"));
        assert!(!is_pdf_content_type("text/html; charset=utf-8"));
        assert!(!is_pdf_content_type(""));
    }

    #[tokio::test]
    async fn test_fetch_document_accepts_pdf() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/paper.pdf"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.7 body".to_vec(), "application/pdf"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(5_000);
        let doc = client
            .fetch_document(&format!("{}/paper.pdf", server.uri()), None, 5_000)
            .await
            .unwrap();
        assert_eq!(doc.status, 200);
        assert!(doc.body.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_fetch_document_rejects_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/landing"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>paywall</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(5_000);
        let err = client
            .fetch_document(&format!("{}/landing", server.uri()), None, 5_000)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ContentMismatch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_document_non_success_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = HttpClient::new(5_000);
        let err = client
            .fetch_document(&format!("{}/blocked.pdf", server.uri()), None, 5_000)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Network { .. }));
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn test_fetch_document_requires_ok_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/accepted.pdf"))
            .respond_with(ResponseTemplate::new(204).insert_header("content-type", "application/pdf"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/empty.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "application/pdf"))
            .mount(&server)
            .await;

        let client = HttpClient::new(5_000);
        let err = client
            .fetch_document(&format!("{}/accepted.pdf", server.uri()), None, 5_000)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Network { .. }));
        assert!(err.to_string().contains("204"));

        let err = client
            .fetch_document(&format!("{}/empty.pdf", server.uri()), None, 5_000)
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::ContentMismatch { .. }));
    }

    #[tokio::test]
    async fn test_fetch_document_forwards_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gated.pdf"))
            .and(header("cookie", "session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(5_000);
        let doc = client
            .fetch_document(
                &format!("{}/gated.pdf", server.uri()),
                Some("session=abc"),
                5_000,
            )
            .await
            .unwrap();
        assert_eq!(doc.content_type, "application/pdf");
    }
}
