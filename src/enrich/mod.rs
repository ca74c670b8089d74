// src/enrich/mod.rs
use crate::session::Session;
use crate::types::{EndpointConfig, Location, Ownership};
use log::debug;
use std::net::IpAddr;

mod geo;
mod ownership;

pub use geo::GeoClient;
pub use ownership::OwnershipClient;

/// Attaches location and ownership metadata to resolved addresses.
///
/// Both lookups fail softly: any error leaves the fields absent and is only
/// logged at debug level, never reported in the row.
#[derive(Clone)]
pub struct Enricher {
    session: Session,
    geo: GeoClient,
    ownership: OwnershipClient,
}

impl Enricher {
    pub fn new(session: Session, endpoints: &EndpointConfig) -> Self {
        Self {
            session,
            geo: GeoClient::new(&endpoints.geolocation),
            ownership: OwnershipClient::new(&endpoints.ownership),
        }
    }

    pub async fn location(&self, ip: IpAddr) -> Location {
        self.geo.locate(ip, &self.session).await.unwrap_or_else(|e| {
            debug!("Geolocation lookup for {} failed: {}", ip, e);
            Location::default()
        })
    }

    pub async fn ownership(&self, ip: IpAddr) -> Ownership {
        self.ownership.lookup(ip, &self.session).await.unwrap_or_else(|e| {
            debug!("Ownership lookup for {} failed: {}", ip, e);
            Ownership::default()
        })
    }
}
