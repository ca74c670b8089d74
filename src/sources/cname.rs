// src/sources/cname.rs
use crate::resolver::build_dns_resolver;
use crate::session::Session;
use crate::sources::Source;
use crate::types::{Config, DnsFailure, SourceKind, SubhoundError};
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use trust_dns_resolver::config::{ResolverConfig as DnsResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::error::ProtoErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

/// DNS CNAME records of the target domain itself.
#[derive(Clone)]
pub struct CnameSource {
    name: String,
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl CnameSource {
    pub fn new(config: &Config) -> Self {
        let resolver = build_dns_resolver(config).unwrap_or_else(|e| {
            warn!("{}; falling back to public nameservers", e);
            let mut opts = ResolverOpts::default();
            opts.timeout = config.dns_timeout;
            opts.attempts = 1;
            TokioAsyncResolver::tokio(DnsResolverConfig::default(), opts)
        });
        Self::with_resolver(resolver, config.dns_timeout)
    }

    pub fn with_resolver(resolver: TokioAsyncResolver, timeout: Duration) -> Self {
        Self {
            name: "cname".to_string(),
            resolver,
            timeout,
        }
    }

    fn failure(domain: &str, failure: DnsFailure) -> SubhoundError {
        SubhoundError::DnsError {
            domain: domain.to_string(),
            failure,
        }
    }
}

#[async_trait]
impl Source for CnameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Dns
    }

    async fn enumerate(&self, domain: &str, _session: &Session) -> Result<Vec<String>, SubhoundError> {
        // Absolute name so search domains are never appended.
        let fqdn = format!("{}.", domain.trim_end_matches('.'));

        let lookup = tokio::time::timeout(self.timeout, self.resolver.lookup(fqdn.as_str(), RecordType::CNAME))
            .await
            .map_err(|_| Self::failure(domain, DnsFailure::Timeout))?
            .map_err(|e| Self::failure(domain, classify(e.kind())))?;

        let targets = cname_targets(domain, lookup.iter())?;
        debug!("{} has {} CNAME targets", domain, targets.len());
        Ok(targets)
    }
}

/// CNAME targets without the trailing root dot. An answer carrying no CNAME
/// data counts as no answer.
fn cname_targets<'a, I>(domain: &str, answers: I) -> Result<Vec<String>, SubhoundError>
where
    I: IntoIterator<Item = &'a RData>,
{
    let targets: Vec<String> = answers
        .into_iter()
        .filter_map(|rdata| match rdata {
            RData::CNAME(cname) => Some(cname.0.to_utf8().trim_end_matches('.').to_string()),
            _ => None,
        })
        .collect();

    if targets.is_empty() {
        return Err(CnameSource::failure(domain, DnsFailure::NoAnswer));
    }
    Ok(targets)
}

pub(crate) fn classify(kind: &ResolveErrorKind) -> DnsFailure {
    match kind {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => DnsFailure::NxDomain,
            ResponseCode::NoError => DnsFailure::NoAnswer,
            _ => DnsFailure::NoNameservers,
        },
        ResolveErrorKind::NoConnections => DnsFailure::NoNameservers,
        ResolveErrorKind::Timeout => DnsFailure::Timeout,
        ResolveErrorKind::Proto(e) if matches!(e.kind(), ProtoErrorKind::Timeout) => DnsFailure::Timeout,
        other => DnsFailure::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::net::UdpSocket;
    use trust_dns_resolver::proto::op::Query;
    use trust_dns_resolver::proto::rr::rdata::{A, CNAME};
    use trust_dns_resolver::proto::rr::Name;

    fn no_records(response_code: ResponseCode) -> ResolveErrorKind {
        let name = Name::from_ascii("example.com.").unwrap();
        ResolveErrorKind::NoRecordsFound {
            query: Box::new(Query::query(name, RecordType::CNAME)),
            soa: None,
            negative_ttl: None,
            response_code,
            trusted: true,
        }
    }

    #[test]
    fn test_classify_negative_responses() {
        assert_eq!(classify(&no_records(ResponseCode::NXDomain)), DnsFailure::NxDomain);
        assert_eq!(classify(&no_records(ResponseCode::NoError)), DnsFailure::NoAnswer);
        assert_eq!(classify(&no_records(ResponseCode::ServFail)), DnsFailure::NoNameservers);
        assert_eq!(classify(&no_records(ResponseCode::Refused)), DnsFailure::NoNameservers);
    }

    #[test]
    fn test_failure_messages_name_case_and_domain() {
        let nxdomain = CnameSource::failure("example.com", classify(&no_records(ResponseCode::NXDomain)));
        assert!(nxdomain.to_string().contains("example.com"));
        assert!(nxdomain.to_string().contains("NXDOMAIN"));

        let no_answer = CnameSource::failure("example.com", classify(&no_records(ResponseCode::NoError)));
        assert!(no_answer.to_string().contains("CNAME"));

        let no_servers = CnameSource::failure("example.com", classify(&ResolveErrorKind::NoConnections));
        assert!(no_servers.to_string().contains("nameservers"));

        let timeout = CnameSource::failure("example.com", classify(&ResolveErrorKind::Timeout));
        assert!(timeout.to_string().contains("lifetime expired"));
    }

    #[test]
    fn test_cname_targets_strip_root_dot() {
        let answers = vec![
            RData::CNAME(CNAME(Name::from_ascii("edge.cdn.example.net.").unwrap())),
            RData::A(A(Ipv4Addr::new(192, 0, 2, 1))),
        ];
        let targets = cname_targets("example.com", &answers).unwrap();
        assert_eq!(targets, vec!["edge.cdn.example.net".to_string()]);
    }

    #[test]
    fn test_answer_without_cname_data_is_no_answer() {
        let answers = vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))];
        match cname_targets("example.com", &answers).unwrap_err() {
            SubhoundError::DnsError { domain, failure } => {
                assert_eq!(domain, "example.com");
                assert_eq!(failure, DnsFailure::NoAnswer);
            }
            other => panic!("unexpected error: {other}"),
        }
        let empty: Vec<RData> = Vec::new();
        assert!(cname_targets("example.com", &empty).is_err());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&ResolveErrorKind::Timeout), DnsFailure::Timeout);
        assert_eq!(classify(&ResolveErrorKind::NoConnections), DnsFailure::NoNameservers);
        assert_eq!(
            classify(&ResolveErrorKind::Msg("boom".to_string())),
            DnsFailure::Other("boom".to_string())
        );
    }

    #[tokio::test]
    async fn test_silent_nameserver_yields_error_naming_domain() {
        // Bound but never read from.
        let blackhole = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let mut config = Config::default();
        config.dns_timeout = Duration::from_millis(300);
        config.resolver.use_system_resolver = false;
        config.resolver.nameservers = vec![blackhole.local_addr().unwrap().to_string()];

        let source = CnameSource::new(&config);
        let session = Session::new(&config).unwrap();
        let err = source.enumerate("example.com", &session).await.unwrap_err();

        match &err {
            SubhoundError::DnsError { domain, .. } => assert_eq!(domain, "example.com"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("DNS error for example.com"));
    }
}
