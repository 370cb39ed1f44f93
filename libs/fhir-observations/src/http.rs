//! HTTP transport for an authenticated patient session

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::models::{Bundle, OPERATION_OUTCOME};
use crate::session::{PatientSession, RequestOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

const FHIR_JSON: &str = "application/fhir+json";

/// Patient-scoped FHIR REST session.
///
/// Relative search URLs are resolved against `base_url` and restricted to
/// the session patient with a `patient` parameter. Result pages are fetched
/// one after another by following `next` links until there is none, the
/// page limit is reached or a link points to a page already fetched.
pub struct HttpSession {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    patient_id: Option<String>,
}

impl HttpSession {
    /// Create a session with the default 30 second timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            access_token: None,
            patient_id: None,
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let mut session =
            Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        session.access_token = config.access_token.clone();
        session.patient_id = config.patient_id.clone();
        Ok(session)
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Restrict every search to this patient
    pub fn with_patient(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.patient_id.as_deref()
    }

    /// Absolute URL of the first page for a relative search URL
    pub fn url_for(&self, query: &str) -> String {
        let mut url = format!("{}/{}", self.base_url, query.trim_start_matches('/'));
        if let Some(patient) = &self.patient_id {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str("patient=");
            url.push_str(&urlencoding::encode(patient));
        }
        url
    }

    async fn fetch_page(&self, url: &str) -> Result<Bundle> {
        let mut request = self.client.get(url).header("Accept", FHIR_JSON);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
                diagnostics: outcome_diagnostics(&body).unwrap_or(body),
            });
        }

        let page: Bundle = response.json().await?;
        Ok(page)
    }
}

#[async_trait]
impl PatientSession for HttpSession {
    async fn request(&self, query: &str, options: &RequestOptions) -> Result<Vec<Bundle>> {
        let mut url = self.url_for(query);
        let mut visited = HashSet::new();
        let mut pages = Vec::new();

        loop {
            tracing::debug!(url = %url, page = pages.len() + 1, "Fetching search page");
            let page = self.fetch_page(&url).await?;
            let next = page.next_link().map(str::to_string);
            pages.push(page);
            visited.insert(url);

            match next {
                Some(_) if options.limit_reached(pages.len() as u32) => {
                    tracing::warn!(
                        page_limit = options.page_limit,
                        "Page limit reached, not following next link"
                    );
                    break;
                }
                Some(next) if visited.contains(&next) => {
                    tracing::warn!(url = %next, "Next link repeats a fetched page, stopping");
                    break;
                }
                Some(next) => url = next,
                None => break,
            }
        }

        Ok(pages)
    }
}

/// Joined `issue.diagnostics` when `body` is an OperationOutcome
fn outcome_diagnostics(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if json.get("resourceType").and_then(Value::as_str) != Some(OPERATION_OUTCOME) {
        return None;
    }

    let messages: Vec<&str> = json
        .get("issue")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|issue| issue.get("diagnostics").and_then(Value::as_str))
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("; "))
    }
}
