// src/resolver.rs
use crate::types::{Config, SubhoundError};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig as DnsResolverConfig, ResolverOpts};
use trust_dns_resolver::system_conf::read_system_conf;
use trust_dns_resolver::TokioAsyncResolver;

/// Forward address resolution used during enrichment.
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, SubhoundError>;
}

/// Resolves through the operating system (`getaddrinfo`), preferring IPv4.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    timeout: Duration,
}

impl SystemResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, SubhoundError> {
        let failure = |message: String| SubhoundError::ResolutionError {
            host: host.to_string(),
            message,
        };

        let addrs: Vec<SocketAddr> = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| failure(format!("lookup timed out after {:?}", self.timeout)))?
            .map_err(|e| failure(e.to_string()))?
            .collect();

        addrs
            .iter()
            .map(SocketAddr::ip)
            .find(IpAddr::is_ipv4)
            .or_else(|| addrs.first().map(SocketAddr::ip))
            .ok_or_else(|| failure("no addresses returned".to_string()))
    }
}

/// Builds the resolver used for CNAME discovery. Each query is bounded by the
/// configured DNS timeout and attempted once.
pub fn build_dns_resolver(config: &Config) -> Result<TokioAsyncResolver, SubhoundError> {
    let (resolver_config, mut opts) = if config.resolver.use_system_resolver {
        read_system_conf()
            .map_err(|e| SubhoundError::ConfigError(format!("Failed to read system resolver configuration: {}", e)))?
    } else {
        let mut resolver_config = DnsResolverConfig::new();

        for ns in &config.resolver.nameservers {
            let socket_addr = SocketAddr::from_str(ns)
                .map_err(|e| SubhoundError::ConfigError(format!("Invalid nameserver address {}: {}", ns, e)))?;
            resolver_config.add_name_server(NameServerConfig {
                socket_addr,
                protocol: Protocol::Udp,
                tls_dns_name: None,
                trust_negative_responses: false,
                bind_addr: None,
            });
        }

        (resolver_config, ResolverOpts::default())
    };

    opts.timeout = config.dns_timeout;
    opts.attempts = 1;

    Ok(TokioAsyncResolver::tokio(resolver_config, opts))
}
