// src/enrich/ownership.rs
use crate::session::Session;
use crate::types::{Ownership, SubhoundError};
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Default, Deserialize)]
struct IpInfoResponse {
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    company: Option<IpInfoCompany>,
}

#[derive(Debug, Default, Deserialize)]
struct IpInfoCompany {
    #[serde(default)]
    name: Option<String>,
}

/// ipinfo.io organization lookups. `company` is only present on paid plans.
#[derive(Clone)]
pub struct OwnershipClient {
    base_url: String,
}

impl OwnershipClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn lookup(&self, ip: IpAddr, session: &Session) -> Result<Ownership, SubhoundError> {
        let url = format!("{}/{}/json", self.base_url, ip);
        let response: IpInfoResponse = session.get_json(&url).await?;

        Ok(Ownership {
            isp: response.org,
            cloud_service: response.company.and_then(|company| company.name),
        })
    }
}
