// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OUTPUT_PREFIX: &str = "Foundsubs.csv";
pub const DEFAULT_REPORTS_DIR: &str = "Reports";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub dns_timeout: Duration,
    pub retries: u32,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub endpoints: EndpointConfig,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            dns_timeout: Duration::from_secs(10),
            retries: 0,
            user_agent: format!("subhound/{}", env!("CARGO_PKG_VERSION")),
            proxy: None,
            endpoints: EndpointConfig::default(),
            resolver: ResolverConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Base URLs of the third-party services queried during discovery and enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub crtsh: String,
    pub geolocation: String,
    pub ownership: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            crtsh: "https://crt.sh".to_string(),
            geolocation: "http://ip-api.com/json".to_string(),
            ownership: "https://ipinfo.io".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub use_system_resolver: bool,
    pub nameservers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            use_system_resolver: true,
            nameservers: vec![
                "8.8.8.8:53".to_string(),
                "1.1.1.1:53".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: String,
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: DEFAULT_REPORTS_DIR.to_string(),
            prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

/// Which discovery method produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Web,
    #[serde(rename = "DNS")]
    Dns,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Web => write!(f, "Web"),
            SourceKind::Dns => write!(f, "DNS"),
        }
    }
}

/// One row of the report.
///
/// Discovery creates records with only `subdomain`, `source` and `error` set;
/// enrichment fills the remaining fields in place. A record without a
/// subdomain is a sentinel carrying a discovery failure in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubdomainRecord {
    pub subdomain: Option<String>,
    pub source: SourceKind,
    pub ip_address: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub isp: Option<String>,
    pub cloud_service: Option<String>,
    pub error: Option<String>,
}

impl SubdomainRecord {
    pub fn discovered(subdomain: impl Into<String>, source: SourceKind) -> Self {
        Self {
            subdomain: Some(subdomain.into()),
            ..Self::empty(source)
        }
    }

    pub fn sentinel(source: SourceKind, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(source)
        }
    }

    fn empty(source: SourceKind) -> Self {
        Self {
            subdomain: None,
            source,
            ip_address: None,
            country: None,
            region: None,
            city: None,
            isp: None,
            cloud_service: None,
            error: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.subdomain.is_none()
    }

    pub fn apply_location(&mut self, location: Location) {
        self.country = location.country;
        self.region = location.region;
        self.city = location.city;
    }

    pub fn apply_ownership(&mut self, ownership: Ownership) {
        self.isp = ownership.isp;
        self.cloud_service = ownership.cloud_service;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub isp: Option<String>,
    pub cloud_service: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub domains: usize,
    pub rows_written: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub discovery_errors: usize,
    pub duration: Duration,
}

/// Why a CNAME discovery query produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsFailure {
    NxDomain,
    NoNameservers,
    NoAnswer,
    Timeout,
    Other(String),
}

impl fmt::Display for DnsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsFailure::NxDomain => write!(f, "The DNS query name does not exist (NXDOMAIN)"),
            DnsFailure::NoNameservers => write!(f, "All nameservers failed to answer the query"),
            DnsFailure::NoAnswer => write!(f, "The DNS response does not contain an answer to the question: CNAME"),
            DnsFailure::Timeout => write!(f, "The resolution lifetime expired"),
            DnsFailure::Other(message) => write!(f, "{}", message),
        }
    }
}

#[derive(Debug, Error)]
pub enum SubhoundError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source error in {source_name}: {message}")]
    SourceError {
        source_name: String,
        message: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Invalid content type in response: {0}")]
    InvalidContentType(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("DNS error for {domain}: {failure}")]
    DnsError { domain: String, failure: DnsFailure },

    #[error("Socket error resolving {host}: {message}")]
    ResolutionError { host: String, message: String },

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
