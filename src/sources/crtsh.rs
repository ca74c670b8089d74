// src/sources/crtsh.rs
use crate::session::Session;
use crate::sources::Source;
use crate::types::{SourceKind, SubhoundError};
use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CrtShResponse {
    #[serde(default)]
    common_name: Option<String>,
}

/// CRT.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShSource {
    name: String,
    base_url: String,
}

impl CrtShSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            name: "crtsh".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn query_url(&self, domain: &str) -> Result<Url, SubhoundError> {
        Url::parse_with_params(
            &format!("{}/", self.base_url),
            &[("q", format!("%.{}", domain).as_str()), ("output", "json")],
        )
        .map_err(|e| SubhoundError::ConfigError(format!("Invalid crt.sh endpoint: {}", e)))
    }

    fn source_error(&self, message: String) -> SubhoundError {
        SubhoundError::SourceError {
            source_name: self.name.clone(),
            message,
        }
    }
}

#[async_trait]
impl Source for CrtShSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    async fn enumerate(&self, domain: &str, session: &Session) -> Result<Vec<String>, SubhoundError> {
        let url = self.query_url(domain)?;

        let response = session
            .get_with_retry(url.as_str())
            .await
            .map_err(|e| self.source_error(format!("Error fetching subdomains from the web: {}", e)))?;

        if !response.status().is_success() {
            return Err(self.source_error(format!(
                "Error fetching subdomains from the web: {}",
                SubhoundError::HttpStatus(response.status())
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_json(&content_type) {
            return Err(SubhoundError::InvalidContentType(if content_type.is_empty() {
                "<none>".to_string()
            } else {
                content_type
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.source_error(format!("Error fetching subdomains from the web: {}", e)))?;
        if body.is_empty() {
            return Err(SubhoundError::EmptyResponse("crt.sh".to_string()));
        }

        let certificates: Vec<CrtShResponse> = serde_json::from_slice(&body)
            .map_err(|e| self.source_error(format!("Failed to parse JSON: {}", e)))?;

        debug!("crt.sh returned {} certificates for {}", certificates.len(), domain);

        let suffix = format!(".{}", domain.to_lowercase());
        Ok(certificates
            .into_iter()
            .filter_map(|cert| cert.common_name)
            .map(|name| name.trim().to_lowercase())
            .filter(|name| name.ends_with(&suffix))
            .collect())
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
