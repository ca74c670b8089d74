// src/sources/mod.rs
use crate::session::Session;
use crate::types::{Config, SourceKind, SubhoundError};
use async_trait::async_trait;

mod cname;
mod crtsh;

pub use cname::CnameSource;
pub use crtsh::CrtShSource;

/// A subdomain discovery method.
///
/// Implementations return the hostnames they found, or the reason they found
/// nothing. The engine turns an error into a sentinel record tagged with
/// [`Source::kind`].
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> SourceKind;
    async fn enumerate(&self, domain: &str, session: &Session) -> Result<Vec<String>, SubhoundError>;
}

pub fn create_source(name: &str, config: &Config) -> Option<Box<dyn Source>> {
    match name.to_lowercase().as_str() {
        "crtsh" => Some(Box::new(CrtShSource::new(&config.endpoints.crtsh))),
        "cname" => Some(Box::new(CnameSource::new(config))),
        _ => None,
    }
}

/// Web discovery runs before DNS discovery so rows keep that order per domain.
pub fn get_all_sources(config: &Config) -> Vec<Box<dyn Source>> {
    ["crtsh", "cname"]
        .into_iter()
        .filter_map(|name| create_source(name, config))
        .collect()
}
