use crate::enrich::Enricher;
use crate::output::ReportWriter;
use crate::resolver::{HostResolver, SystemResolver};
use crate::session::Session;
use crate::sources::{get_all_sources, Source};
use crate::types::{Config, RunStats, SubdomainRecord, SubhoundError};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::io::Write;
use std::time::Instant;

/// Discovery and enrichment pipeline.
///
/// Domains are processed strictly one after another. Each domain's discovery
/// results are deduplicated on their own, enriched, written, and then dropped,
/// so nothing found for one domain is revisited for the next.
pub struct Engine {
    session: Session,
    sources: Vec<Box<dyn Source>>,
    host_resolver: Box<dyn HostResolver>,
    enricher: Enricher,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Self, SubhoundError> {
        let session = Session::new(config)?;
        let sources = get_all_sources(config);
        let enricher = Enricher::new(session.clone(), &config.endpoints);
        let host_resolver = Box::new(SystemResolver::new(config.dns_timeout));

        Ok(Self::with_parts(session, sources, host_resolver, enricher))
    }

    pub fn with_parts(
        session: Session,
        sources: Vec<Box<dyn Source>>,
        host_resolver: Box<dyn HostResolver>,
        enricher: Enricher,
    ) -> Self {
        Self {
            session,
            sources,
            host_resolver,
            enricher,
        }
    }

    /// Runs every domain through discovery and enrichment, writing one row per
    /// discovered record. Only report write failures abort the run.
    pub async fn run<W: Write>(
        &self,
        domains: &[String],
        report: &mut ReportWriter<W>,
        progress: &ProgressBar,
    ) -> Result<RunStats, SubhoundError> {
        info!("Starting enumeration for {} domains", domains.len());
        let start_time = Instant::now();
        let mut stats = RunStats::default();

        for domain in domains {
            progress.set_message(domain.clone());

            let records = self.discover(domain).await;
            for record in records {
                let row = self.enrich(record).await;
                report.write_record(&row)?;
                tally(&mut stats, &row);
            }

            stats.domains += 1;
            progress.inc(1);
        }

        stats.duration = start_time.elapsed();
        Ok(stats)
    }

    /// Queries every source for `domain` and returns the distinct records in
    /// discovery order. A failing source contributes one sentinel record.
    pub async fn discover(&self, domain: &str) -> Vec<SubdomainRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for source in &self.sources {
            let start = Instant::now();
            let found: Vec<SubdomainRecord> = match source.enumerate(domain, &self.session).await {
                Ok(names) => {
                    info!(
                        "{}: Found {} names for {} in {:?}",
                        source.name(),
                        names.len(),
                        domain,
                        start.elapsed()
                    );
                    names
                        .into_iter()
                        .map(|name| SubdomainRecord::discovered(name, source.kind()))
                        .collect()
                }
                Err(e) => {
                    warn!("{}: Failed to enumerate {}: {}", source.name(), domain, e);
                    vec![SubdomainRecord::sentinel(source.kind(), e.to_string())]
                }
            };

            for record in found {
                if seen.insert(record.clone()) {
                    records.push(record);
                }
            }
        }

        records
    }

    /// Resolves the record's hostname and attaches location and ownership data.
    /// Sentinels pass through unchanged.
    pub async fn enrich(&self, mut record: SubdomainRecord) -> SubdomainRecord {
        let Some(host) = record.subdomain.clone() else {
            return record;
        };

        match self.host_resolver.resolve(&host).await {
            Ok(ip) => {
                debug!("{} resolved to {}", host, ip);
                record.ip_address = Some(ip.to_string());
                record.apply_location(self.enricher.location(ip).await);
                record.apply_ownership(self.enricher.ownership(ip).await);
            }
            Err(e) => {
                debug!("{}", e);
                record.error = Some(e.to_string());
            }
        }

        record
    }
}

fn tally(stats: &mut RunStats, row: &SubdomainRecord) {
    stats.rows_written += 1;
    if row.is_sentinel() {
        stats.discovery_errors += 1;
    } else if row.ip_address.is_some() {
        stats.resolved += 1;
    } else {
        stats.unresolved += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CrtShSource;
    use crate::types::{DnsFailure, EndpointConfig, SourceKind};
    use async_trait::async_trait;
    use mockito::Matcher;
    use std::collections::HashMap;
    use std::net::IpAddr;

    struct StubSource {
        kind: SourceKind,
        names: Vec<String>,
        failure: Option<DnsFailure>,
    }

    impl StubSource {
        fn names(kind: SourceKind, names: &[&str]) -> Box<dyn Source> {
            Box::new(Self {
                kind,
                names: names.iter().map(|n| n.to_string()).collect(),
                failure: None,
            })
        }

        fn failing(kind: SourceKind, failure: DnsFailure) -> Box<dyn Source> {
            Box::new(Self {
                kind,
                names: Vec::new(),
                failure: Some(failure),
            })
        }
    }

    #[async_trait]
    impl Source for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn enumerate(&self, domain: &str, _session: &Session) -> Result<Vec<String>, SubhoundError> {
            match &self.failure {
                Some(failure) => Err(SubhoundError::DnsError {
                    domain: domain.to_string(),
                    failure: failure.clone(),
                }),
                None => Ok(self.names.clone()),
            }
        }
    }

    struct StubResolver {
        hosts: HashMap<String, IpAddr>,
    }

    impl StubResolver {
        fn boxed(hosts: &[(&str, [u8; 4])]) -> Box<dyn HostResolver> {
            Box::new(Self {
                hosts: hosts
                    .iter()
                    .map(|(host, ip)| (host.to_string(), IpAddr::from(*ip)))
                    .collect(),
            })
        }
    }

    #[async_trait]
    impl HostResolver for StubResolver {
        async fn resolve(&self, host: &str) -> Result<IpAddr, SubhoundError> {
            self.hosts
                .get(host)
                .copied()
                .ok_or_else(|| SubhoundError::ResolutionError {
                    host: host.to_string(),
                    message: "Name or service not known".to_string(),
                })
        }
    }

    fn session() -> Session {
        Session::new(&Config::default()).unwrap()
    }

    fn endpoints(base: &str) -> EndpointConfig {
        EndpointConfig {
            crtsh: base.to_string(),
            geolocation: format!("{}/json", base),
            ownership: base.to_string(),
        }
    }

    fn engine(sources: Vec<Box<dyn Source>>, resolver: Box<dyn HostResolver>, base: &str) -> Engine {
        let session = session();
        let enricher = Enricher::new(session.clone(), &endpoints(base));
        Engine::with_parts(session, sources, resolver, enricher)
    }

    #[tokio::test]
    async fn test_discover_dedups_identical_records_only() {
        let engine = engine(
            vec![
                StubSource::names(SourceKind::Web, &["www.example.com", "www.example.com", "mail.example.com"]),
                StubSource::names(SourceKind::Dns, &["www.example.com"]),
            ],
            StubResolver::boxed(&[]),
            "http://127.0.0.1:1",
        );

        let records = engine.discover("example.com").await;
        assert_eq!(
            records,
            vec![
                SubdomainRecord::discovered("www.example.com", SourceKind::Web),
                SubdomainRecord::discovered("mail.example.com", SourceKind::Web),
                SubdomainRecord::discovered("www.example.com", SourceKind::Dns),
            ]
        );
    }

    #[tokio::test]
    async fn test_discovery_timeout_yields_one_sentinel() {
        let engine = engine(
            vec![StubSource::failing(SourceKind::Dns, DnsFailure::Timeout)],
            StubResolver::boxed(&[]),
            "http://127.0.0.1:1",
        );

        let records = engine.discover("example.com").await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.subdomain.is_none());
        assert_eq!(record.source, SourceKind::Dns);
        assert!(record.error.as_deref().unwrap().contains("example.com"));
    }

    #[tokio::test]
    async fn test_sentinels_with_different_errors_are_kept() {
        let engine = engine(
            vec![
                StubSource::failing(SourceKind::Dns, DnsFailure::Timeout),
                StubSource::failing(SourceKind::Dns, DnsFailure::NxDomain),
                StubSource::failing(SourceKind::Dns, DnsFailure::NxDomain),
            ],
            StubResolver::boxed(&[]),
            "http://127.0.0.1:1",
        );

        let records = engine.discover("example.com").await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_isolated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/json/192.0.2.10")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"country":"DE","regionName":"Berlin","city":"Berlin"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/192.0.2.10/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"org":"AS3320 Deutsche Telekom AG"}"#)
            .create_async()
            .await;

        let engine = engine(
            vec![StubSource::names(SourceKind::Web, &["ok.example.com", "gone.example.com"])],
            StubResolver::boxed(&[("ok.example.com", [192, 0, 2, 10])]),
            &server.url(),
        );

        let mut report = ReportWriter::from_writer(Vec::new()).unwrap();
        let stats = engine
            .run(&["example.com".to_string()], &mut report, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 1);

        let records = engine.discover("example.com").await;
        let ok = engine.enrich(records[0].clone()).await;
        let gone = engine.enrich(records[1].clone()).await;

        assert_eq!(ok.ip_address.as_deref(), Some("192.0.2.10"));
        assert_eq!(ok.country.as_deref(), Some("DE"));
        assert_eq!(ok.isp.as_deref(), Some("AS3320 Deutsche Telekom AG"));
        assert!(ok.error.is_none());

        assert!(gone.ip_address.is_none());
        assert!(gone.country.is_none());
        let error = gone.error.unwrap();
        assert!(error.contains("gone.example.com"));
        assert!(error.contains("Name or service not known"));
    }

    #[tokio::test]
    async fn test_geolocation_failure_leaves_error_untouched() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/json/192.0.2.20")
            .with_status(503)
            .create_async()
            .await;
        server
            .mock("GET", "/192.0.2.20/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"org":"Example Cloud"}"#)
            .create_async()
            .await;

        let engine = engine(
            vec![],
            StubResolver::boxed(&[("www.example.com", [192, 0, 2, 20])]),
            &server.url(),
        );

        let row = engine
            .enrich(SubdomainRecord::discovered("www.example.com", SourceKind::Web))
            .await;
        assert_eq!(row.ip_address.as_deref(), Some("192.0.2.20"));
        assert!(row.country.is_none() && row.region.is_none() && row.city.is_none());
        assert_eq!(row.isp.as_deref(), Some("Example Cloud"));
        assert!(row.error.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_passes_through_enrichment() {
        let engine = engine(vec![], StubResolver::boxed(&[]), "http://127.0.0.1:1");
        let sentinel = SubdomainRecord::sentinel(SourceKind::Web, "Empty response from crt.sh");
        assert_eq!(engine.enrich(sentinel.clone()).await, sentinel);
    }

    #[tokio::test]
    async fn test_earlier_domains_are_not_reemitted() {
        let engine = engine(
            vec![StubSource::names(SourceKind::Dns, &["alias.cdn.net"])],
            StubResolver::boxed(&[]),
            "http://127.0.0.1:1",
        );

        let domains = vec!["a.com".to_string(), "b.com".to_string(), "c.com".to_string()];
        let mut report = ReportWriter::from_writer(Vec::new()).unwrap();
        let stats = engine.run(&domains, &mut report, &ProgressBar::hidden()).await.unwrap();

        assert_eq!(stats.domains, 3);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(report.rows(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_report() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"common_name":"api.example.com"}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/json/203.0.113.5")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"country":"US","regionName":"CA","city":"SF"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/203.0.113.5/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"org":"Example Cloud"}"#)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("domains.txt");
        std::fs::write(&input, "example.com\n").unwrap();
        let domains = crate::utils::read_domains(&input).unwrap();

        let engine = engine(
            vec![
                Box::new(CrtShSource::new(&server.url())) as Box<dyn Source>,
                StubSource::failing(SourceKind::Dns, DnsFailure::NxDomain),
            ],
            StubResolver::boxed(&[("api.example.com", [203, 0, 113, 5])]),
            &server.url(),
        );

        let reports_dir = tmp.path().join("Reports");
        let (mut report, path) = ReportWriter::create(&reports_dir, "Foundsubs.csv").unwrap();
        let stats = engine.run(&domains, &mut report, &ProgressBar::hidden()).await.unwrap();
        report.finish().unwrap();

        assert_eq!(stats.rows_written, 2);
        assert_eq!(stats.discovery_errors, 1);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), crate::output::HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec!["api.example.com", "Web", "203.0.113.5", "US", "CA", "SF", "Example Cloud", "", ""]
        );
        assert_eq!(&rows[1][0], "");
        assert_eq!(&rows[1][1], "DNS");
        assert!(rows[1][8].contains("NXDOMAIN"));
        assert!(rows[1][8].contains("example.com"));
    }
}
