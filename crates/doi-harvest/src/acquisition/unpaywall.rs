//! Unpaywall API client: the open-access lookup service behind tier 1.
//!
//! API endpoint: `https://api.unpaywall.org/v2/{doi}?email={email}`.
//! The e-mail is not a key, only a contact address; without one the tier is
//! skipped rather than sending anonymous traffic.

use super::http_client::HttpClient;
use crate::error::RetrievalError;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Deserialize, Serialize)]
pub struct UnpaywallResponse {
    pub doi: String,
    #[serde(default)]
    pub is_oa: bool,
    pub best_oa_location: Option<OaLocation>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OaLocation {
    pub url: Option<String>,
    pub url_for_pdf: Option<String>,
    pub url_for_landing_page: Option<String>,
    pub host_type: Option<String>,
}

impl UnpaywallResponse {
    /// The direct PDF URL of the best open-access location, if reported.
    pub fn best_pdf_url(&self) -> Option<&str> {
        self.best_oa_location
            .as_ref()
            .and_then(|loc| loc.url_for_pdf.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Client for the lookup service.
#[derive(Clone)]
pub struct UnpaywallClient {
    http: HttpClient,
    base_url: String,
    email: Option<String>,
    timeout_ms: u64,
}

impl UnpaywallClient {
    pub fn new(http: HttpClient, base_url: &str, email: Option<String>, timeout_ms: u64) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            timeout_ms,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.email.is_some()
    }

    /// Query the service for `doi`.
    pub async fn lookup(&self, doi: &str) -> Result<UnpaywallResponse, RetrievalError> {
        let email = self
            .email
            .as_deref()
            .ok_or_else(|| RetrievalError::Skipped("no contact e-mail configured".to_string()))?;
        let url = lookup_url(&self.base_url, doi, email)?;
        tracing::debug!(%url, "querying open-access lookup");
        self.http.get_json(&url, self.timeout_ms).await
    }

    /// Query the service and return the reported direct PDF URL.
    pub async fn find_pdf_url(&self, doi: &str) -> Result<String, RetrievalError> {
        let resp = self.lookup(doi).await?;
        resp.best_pdf_url()
            .map(str::to_string)
            .ok_or_else(|| RetrievalError::Skipped("no open-access PDF reported".to_string()))
    }
}

/// Build the lookup URL. The DOI keeps its `/` as path separators; every
/// segment is percent-encoded.
pub fn lookup_url(base_url: &str, doi: &str, email: &str) -> Result<String, RetrievalError> {
    let mut url = Url::parse(base_url).map_err(|e| RetrievalError::network(base_url, e))?;
    url.path_segments_mut()
        .map_err(|()| RetrievalError::network(base_url, "base URL cannot take a path"))?
        .pop_if_empty()
        .extend(doi.split('/'));
    url.query_pairs_mut().append_pair("email", email);
    Ok(url.to_string())
}
