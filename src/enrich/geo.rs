// src/enrich/geo.rs
use crate::session::Session;
use crate::types::{Location, SubhoundError};
use serde::Deserialize;
use std::net::IpAddr;

#[derive(Debug, Default, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default, rename = "regionName")]
    region_name: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// ip-api.com geolocation lookups.
#[derive(Clone)]
pub struct GeoClient {
    base_url: String,
}

impl GeoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn locate(&self, ip: IpAddr, session: &Session) -> Result<Location, SubhoundError> {
        let url = format!("{}/{}", self.base_url, ip);
        let response: IpApiResponse = session.get_json(&url).await?;

        Ok(Location {
            country: response.country,
            region: response.region_name,
            city: response.city,
        })
    }
}
