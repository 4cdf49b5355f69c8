// domain-checker-lib/tests/integration.rs

//! Integration tests for the lookup engine, driven through in-process protocol doubles.

use async_trait::async_trait;
use domain_checker_lib::protocols::{
    BootstrapCategory, BootstrapRegistry, BootstrapSource, EndpointResolver,
};
use domain_checker_lib::{
    default_resolvers, CheckConfig, DnsRecord, DnsRecordType, DomainChecker, Endpoint, ErrorKind,
    LookupClient, LookupError, LookupMethod, LookupOutcome, Protocol, QueryTarget, RawResponse,
    RegistrationStatus,
};
use futures::StreamExt;
use serde_json::json;
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Responder = dyn Fn(&Endpoint, &QueryTarget) -> Result<RawResponse, LookupError> + Send + Sync;
type Delay = dyn Fn(&QueryTarget) -> Duration + Send + Sync;

/// Scripted protocol client that records how it was called.
struct Double {
    protocol: Protocol,
    respond: Box<Responder>,
    delay: Box<Delay>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Double {
    fn new<F>(protocol: Protocol, respond: F) -> Self
    where
        F: Fn(&Endpoint, &QueryTarget) -> Result<RawResponse, LookupError> + Send + Sync + 'static,
    {
        Self {
            protocol,
            respond: Box::new(respond),
            delay: Box::new(|_| Duration::ZERO),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with_delay<D>(mut self, delay: D) -> Self
    where
        D: Fn(&QueryTarget) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    fn failing(protocol: Protocol, error: LookupError) -> Self {
        Self::new(protocol, move |_, _| Err(error.clone()))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LookupClient for Double {
    fn protocol(&self) -> Protocol {
        self.protocol
    }

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        _timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(target);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.respond)(endpoint, target)
    }
}

fn rdap_registered(target: &QueryTarget) -> RawResponse {
    let json = json!({
        "objectClassName": "domain",
        "ldhName": target.to_string().to_uppercase(),
        "status": ["client transfer prohibited"],
        "events": [
            {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
            {"eventAction": "expiration", "eventDate": "2025-08-13T04:00:00Z"}
        ],
        "nameservers": [
            {"objectClassName": "nameserver", "ldhName": "A.IANA-SERVERS.NET"},
            {"objectClassName": "nameserver", "ldhName": "B.IANA-SERVERS.NET"}
        ],
        "entities": [{
            "objectClassName": "entity",
            "roles": ["registrar"],
            "vcardArray": ["vcard", [
                ["version", {}, "text", "4.0"],
                ["fn", {}, "text", "RESERVED-Internet Assigned Numbers Authority"]
            ]]
        }]
    });
    RawResponse::Rdap {
        url: format!("https://rdap.verisign.com/com/v1/domain/{}", target),
        body: json.to_string(),
        json,
    }
}

fn whois_text(text: &str) -> RawResponse {
    RawResponse::Whois {
        server: "whois.verisign-grs.com".to_string(),
        text: text.to_string(),
    }
}

fn a_records(values: &[&str]) -> RawResponse {
    RawResponse::Dns {
        resolver: None,
        records: values
            .iter()
            .map(|v| DnsRecord {
                record_type: DnsRecordType::A,
                name: "example.com".to_string(),
                value: v.to_string(),
                ttl: 300,
            })
            .collect(),
        name_servers: Vec::new(),
    }
}

fn unused(protocol: Protocol) -> Arc<Double> {
    Arc::new(Double::failing(
        protocol,
        LookupError::internal("this client should not be called"),
    ))
}

fn build(
    config: CheckConfig,
    rdap: &Arc<Double>,
    whois: &Arc<Double>,
    dns: &Arc<Double>,
) -> DomainChecker {
    DomainChecker::with_clients(
        config,
        rdap.clone(),
        whois.clone(),
        dns.clone(),
        EndpointResolver::new(false),
    )
    .unwrap()
}

fn fast_config() -> CheckConfig {
    CheckConfig::default()
        .with_timeout(Duration::from_secs(5))
        .with_rate_limit(1000.0)
}

#[tokio::test]
async fn test_auto_falls_back_to_whois_on_unsupported_tld() {
    let rdap = Arc::new(Double::failing(
        Protocol::Rdap,
        LookupError::unsupported_tld("com", "RDAP"),
    ));
    let whois = Arc::new(Double::new(Protocol::Whois, |_, _| {
        Ok(whois_text(
            "Domain Name: EXAMPLE.COM\nRegistrar: Example Registrar, Inc.\nCreation Date: 1995-08-14T04:00:00Z\n",
        ))
    }));
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup_with_method("example.com", LookupMethod::Auto).await;

    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.protocol, Some(Protocol::Whois));
    assert_eq!(outcome.method, LookupMethod::Auto);
    assert_eq!(
        outcome.record.unwrap().registrar.as_deref(),
        Some("Example Registrar, Inc.")
    );
    assert_eq!(rdap.calls(), 1);
    assert_eq!(whois.calls(), 1);
}

#[tokio::test]
async fn test_example_com_registered_via_rdap() {
    let rdap = Arc::new(Double::new(Protocol::Rdap, |endpoint, target| {
        assert_eq!(
            endpoint,
            &Endpoint::rdap("https://rdap.verisign.com/com/v1/")
        );
        Ok(rdap_registered(target))
    }));
    let whois = unused(Protocol::Whois);
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup("example.com").await;

    assert!(outcome.success);
    assert_eq!(outcome.status, RegistrationStatus::Registered);
    assert_eq!(outcome.protocol, Some(Protocol::Rdap));
    let record = outcome.record.unwrap();
    assert_eq!(
        record.registrar.as_deref(),
        Some("RESERVED-Internet Assigned Numbers Authority")
    );
    assert!(record.creation_date.is_some());
    assert!(record.expiration_date.is_some());
    assert_eq!(whois.calls(), 0);
}

#[tokio::test]
async fn test_no_match_whois_answer_is_not_registered() {
    let rdap = Arc::new(Double::failing(
        Protocol::Rdap,
        LookupError::connection("rdap.verisign.com", "connection refused"),
    ));
    let whois = Arc::new(Double::new(Protocol::Whois, |_, _| {
        Ok(whois_text(
            "No match for domain \"NONEXISTENT-XYZ123.COM\".\r\n>>> Last update of whois database: 2024-08-14T07:01:34Z <<<\r\n",
        ))
    }));
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup("nonexistent-xyz123.com").await;

    assert!(outcome.success);
    assert_eq!(outcome.status, RegistrationStatus::NotRegistered);
    assert_eq!(outcome.target, "nonexistent-xyz123.com");
}

#[tokio::test]
async fn test_both_protocols_failing_reports_rdap_kind() {
    let rdap = Arc::new(Double::failing(
        Protocol::Rdap,
        LookupError::connection("rdap.verisign.com", "connection reset"),
    ));
    let whois = Arc::new(Double::failing(
        Protocol::Whois,
        LookupError::protocol("whois.verisign-grs.com", "rate limit exceeded"),
    ));
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup("example.com").await;

    assert!(!outcome.success);
    assert_eq!(outcome.protocol, Some(Protocol::Rdap));
    let error = outcome.error.unwrap();
    assert_eq!(error.kind(), ErrorKind::Connection);
    match error {
        LookupError::Fallback { fallback, .. } => {
            assert_eq!(fallback.kind(), ErrorKind::Protocol)
        }
        other => panic!("expected fallback chain, got {:?}", other),
    }
}

#[tokio::test]
async fn test_explicit_method_never_falls_back() {
    let rdap = Arc::new(Double::failing(
        Protocol::Rdap,
        LookupError::connection("rdap.verisign.com", "connection refused"),
    ));
    let whois = unused(Protocol::Whois);
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup_with_method("example.com", LookupMethod::Rdap).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().kind(), ErrorKind::Connection);
    assert_eq!(whois.calls(), 0);
}

#[tokio::test]
async fn test_timeout_budget_skips_fallback() {
    let rdap = Arc::new(
        Double::new(Protocol::Rdap, |_, target| Ok(rdap_registered(target)))
            .with_delay(|_| Duration::from_secs(5)),
    );
    let whois = unused(Protocol::Whois);
    let config = fast_config().with_timeout(Duration::from_millis(200));
    let checker = build(config, &rdap, &whois, &unused(Protocol::Dns));

    let start = Instant::now();
    let outcome = checker.lookup("example.com").await;

    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!outcome.success);
    assert_eq!(outcome.error.unwrap().kind(), ErrorKind::Timeout);
    assert_eq!(whois.calls(), 0);
}

#[tokio::test]
async fn test_fast_rdap_timeout_still_falls_back() {
    let rdap = Arc::new(Double::failing(
        Protocol::Rdap,
        LookupError::timeout("RDAP connect", Duration::from_millis(10)),
    ));
    let whois = Arc::new(Double::new(Protocol::Whois, |_, _| {
        Ok(whois_text(
            "Domain Name: EXAMPLE.COM\nRegistrar: Example Registrar, Inc.\nCreation Date: 1995-08-14T04:00:00Z\n",
        ))
    }));
    let config = fast_config().with_timeout(Duration::from_secs(30));
    let checker = build(config, &rdap, &whois, &unused(Protocol::Dns));

    let outcome = checker.lookup("example.com").await;

    assert!(outcome.success, "unexpected failure: {:?}", outcome.error);
    assert_eq!(outcome.protocol, Some(Protocol::Whois));
    assert_eq!(rdap.calls(), 1);
    assert_eq!(whois.calls(), 1);
}

#[tokio::test]
async fn test_failures_are_outcomes_not_panics() {
    let rdap = unused(Protocol::Rdap);
    let whois = unused(Protocol::Whois);
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let cases = [
        ("", LookupMethod::Auto, ErrorKind::Validation),
        ("-bad-.com", LookupMethod::Auto, ErrorKind::Validation),
        ("https://example.com", LookupMethod::Auto, ErrorKind::Validation),
        ("example.zz", LookupMethod::Whois, ErrorKind::UnsupportedTld),
        ("example.zz", LookupMethod::Rdap, ErrorKind::UnsupportedTld),
        ("AS15169", LookupMethod::Dig, ErrorKind::Validation),
    ];

    for (input, method, kind) in cases {
        let outcome = checker.lookup_with_method(input, method).await;
        assert!(!outcome.success, "{} unexpectedly succeeded", input);
        assert!(outcome.record.is_none());
        assert_eq!(outcome.target, input);
        assert_eq!(outcome.error.unwrap().kind(), kind, "input {:?}", input);
    }
    assert_eq!(rdap.calls(), 0);
    assert_eq!(whois.calls(), 0);
}

#[tokio::test]
async fn test_batch_preserves_input_order() {
    // Earlier targets take longer, so completion order is reversed.
    let rdap = Arc::new(
        Double::new(Protocol::Rdap, |_, target| Ok(rdap_registered(target))).with_delay(
            |target| {
                let name = target.to_string();
                let index: u64 = name
                    .trim_start_matches("site")
                    .trim_end_matches(".com")
                    .parse()
                    .unwrap_or(0);
                Duration::from_millis(100 - index * 10)
            },
        ),
    );
    let checker = build(
        fast_config(),
        &rdap,
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );

    let mut targets: Vec<String> = (0..8).map(|i| format!("site{}.com", i)).collect();
    targets.insert(3, "not a domain".to_string());

    let batch = checker
        .lookup_batch(&targets, LookupMethod::Rdap)
        .await
        .unwrap();

    assert_eq!(batch.outcomes.len(), targets.len());
    for (outcome, target) in batch.outcomes.iter().zip(&targets) {
        assert_eq!(&outcome.target, target);
    }
    assert!(!batch.outcomes[3].success);
    assert_eq!(batch.total, 9);
    assert_eq!(batch.succeeded, 8);
    assert_eq!(batch.failed, 1);
    assert_eq!(batch.registered, 8);
}

#[tokio::test]
async fn test_batch_never_exceeds_concurrency() {
    let rdap = Arc::new(
        Double::new(Protocol::Rdap, |_, target| Ok(rdap_registered(target)))
            .with_delay(|_| Duration::from_millis(20)),
    );
    let checker = build(
        fast_config().with_concurrency(10),
        &rdap,
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );

    let targets: Vec<String> = (0..50).map(|i| format!("host{}.com", i)).collect();
    let batch = checker
        .lookup_batch(&targets, LookupMethod::Rdap)
        .await
        .unwrap();

    assert_eq!(batch.succeeded, 50);
    assert_eq!(rdap.calls(), 50);
    assert!(rdap.peak() <= 10, "peak in-flight was {}", rdap.peak());
}

#[tokio::test]
async fn test_batch_rate_limit_spacing() {
    let rdap = Arc::new(Double::new(Protocol::Rdap, |_, target| {
        Ok(rdap_registered(target))
    }));
    let checker = build(
        fast_config(),
        &rdap,
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );

    let targets: Vec<String> = (0..5).map(|i| format!("spaced{}.com", i)).collect();
    let start = Instant::now();
    checker
        .lookup_batch_with(&targets, LookupMethod::Rdap, 5, 20.0)
        .await
        .unwrap();

    // Five starts at 20/s: the last one is at least 200 ms after the first.
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_batch_rejects_invalid_limits() {
    let checker = build(
        fast_config(),
        &unused(Protocol::Rdap),
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );
    let targets = vec!["example.com".to_string()];

    let zero = checker
        .lookup_batch_with(&targets, LookupMethod::Auto, 0, 1.0)
        .await;
    assert!(matches!(zero, Err(LookupError::Config { .. })));

    let no_rate = checker
        .lookup_batch_with(&targets, LookupMethod::Auto, 1, 0.0)
        .await;
    assert!(matches!(no_rate, Err(LookupError::Config { .. })));
}

#[tokio::test]
async fn test_stream_yields_every_target() {
    let rdap = Arc::new(Double::new(Protocol::Rdap, |_, target| {
        Ok(rdap_registered(target))
    }));
    let checker = build(
        fast_config(),
        &rdap,
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );

    let targets: Vec<String> = (0..6).map(|i| format!("stream{}.com", i)).collect();
    let outcomes: Vec<LookupOutcome> = checker
        .lookup_stream(&targets, LookupMethod::Rdap)
        .unwrap()
        .collect()
        .await;

    let seen: HashSet<String> = outcomes.iter().map(|o| o.target.clone()).collect();
    let expected: HashSet<String> = targets.into_iter().collect();
    assert_eq!(seen, expected);
    assert!(outcomes.iter().all(|o| o.success));
}

#[tokio::test]
async fn test_lookup_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("targets.txt");
    std::fs::write(&path, "# watch list\nexample.com\n\n  example.net  \n").unwrap();

    let rdap = Arc::new(Double::new(Protocol::Rdap, |_, target| {
        Ok(rdap_registered(target))
    }));
    let checker = build(
        fast_config(),
        &rdap,
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );

    let batch = checker.lookup_file(&path, LookupMethod::Rdap).await.unwrap();
    let targets: Vec<&str> = batch.outcomes.iter().map(|o| o.target.as_str()).collect();
    assert_eq!(targets, vec!["example.com", "example.net"]);

    let missing = checker
        .lookup_file(dir.path().join("nope.txt"), LookupMethod::Rdap)
        .await;
    assert!(matches!(missing, Err(LookupError::Validation { .. })));
}

#[tokio::test]
async fn test_dig_and_reverse_lookup() {
    let dns = Arc::new(Double::new(Protocol::Dns, |endpoint, target| {
        match (endpoint, target) {
            (Endpoint::Dns { record_type, .. }, QueryTarget::Ip(_)) => {
                assert_eq!(*record_type, DnsRecordType::Ptr);
                Ok(RawResponse::Dns {
                    resolver: None,
                    records: vec![DnsRecord {
                        record_type: DnsRecordType::Ptr,
                        name: "8.8.8.8.in-addr.arpa".to_string(),
                        value: "dns.google".to_string(),
                        ttl: 3600,
                    }],
                    name_servers: Vec::new(),
                })
            }
            (Endpoint::Dns { record_type, .. }, _) => {
                assert_eq!(*record_type, DnsRecordType::A);
                Ok(a_records(&["93.184.215.14"]))
            }
            _ => Err(LookupError::internal("unexpected endpoint")),
        }
    }));
    let rdap = unused(Protocol::Rdap);
    let checker = build(fast_config(), &rdap, &unused(Protocol::Whois), &dns);

    let dig = checker.dig("example.com", DnsRecordType::A).await;
    assert!(dig.success);
    assert_eq!(dig.method, LookupMethod::Dig);
    assert_eq!(dig.record.unwrap().dns_records[0].value, "93.184.215.14");

    let reverse = checker.reverse_lookup("8.8.8.8").await;
    assert!(reverse.success);
    assert_eq!(reverse.target, "8.8.8.8");
    assert_eq!(reverse.record.unwrap().dns_records[0].value, "dns.google");

    let not_ip = checker.reverse_lookup("example.com").await;
    assert_eq!(not_ip.error.unwrap().kind(), ErrorKind::Validation);
    assert_eq!(rdap.calls(), 0);
}

#[tokio::test]
async fn test_propagation_majority() {
    let roster = default_resolvers();
    let outliers: Vec<IpAddr> = roster.iter().rev().take(2).map(|r| r.ip).collect();

    let dns = Arc::new(Double::new(Protocol::Dns, move |endpoint, _| {
        match endpoint {
            Endpoint::Dns {
                resolver: Some(ip), ..
            } if outliers.contains(ip) => Ok(a_records(&["203.0.113.9"])),
            Endpoint::Dns {
                resolver: Some(ip), ..
            } if ip.to_string().starts_with('8') => {
                Ok(a_records(&["93.184.215.15", "93.184.215.14"]))
            }
            _ => Ok(a_records(&["93.184.215.14", "93.184.215.15"])),
        }
    }));
    let checker = build(
        fast_config(),
        &unused(Protocol::Rdap),
        &unused(Protocol::Whois),
        &dns,
    );

    let result = checker
        .check_propagation("example.com", DnsRecordType::A)
        .await
        .unwrap();

    assert_eq!(result.total_resolvers, 20);
    assert_eq!(result.successful, 20);
    assert_eq!(result.majority_size, 18);
    assert!((result.propagation_percentage - 90.0).abs() < f64::EPSILON);
    assert!(!result.fully_propagated);
    assert_eq!(
        result.value_sets[0].values,
        vec!["93.184.215.14", "93.184.215.15"]
    );
    assert_eq!(dns.calls(), 20);
}

#[tokio::test]
async fn test_propagation_all_failed() {
    let dns = Arc::new(Double::failing(
        Protocol::Dns,
        LookupError::connection("resolver", "network unreachable"),
    ));
    let checker = build(
        fast_config(),
        &unused(Protocol::Rdap),
        &unused(Protocol::Whois),
        &dns,
    );

    let result = checker
        .check_propagation("example.com", DnsRecordType::A)
        .await
        .unwrap();

    assert_eq!(result.failed, 20);
    assert_eq!(result.successful, 0);
    assert_eq!(result.propagation_percentage, 0.0);
    assert!(!result.fully_propagated);
}

#[tokio::test]
async fn test_propagation_slow_resolver_is_cut_off() {
    let roster = default_resolvers();
    let slow = roster[0].ip;
    let dns = Arc::new(Double::new(Protocol::Dns, |_, _| {
        Ok(a_records(&["93.184.215.14"]))
    }));
    let slow_dns = Arc::new(SlowFor {
        slow,
        inner: dns.clone(),
    });

    let checker = DomainChecker::with_clients(
        fast_config().with_propagation_timeout(Duration::from_millis(200)),
        unused(Protocol::Rdap),
        unused(Protocol::Whois),
        slow_dns,
        EndpointResolver::new(false),
    )
    .unwrap();

    let start = Instant::now();
    let result = checker
        .check_propagation("example.com", DnsRecordType::A)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(result.failed, 1);
    assert_eq!(result.successful, 19);
    assert!(result.fully_propagated);
    assert_eq!(
        result.results[0].outcome.error.as_ref().unwrap().kind(),
        ErrorKind::Timeout
    );
}

/// Hangs for one resolver address, delegates for the rest.
struct SlowFor {
    slow: IpAddr,
    inner: Arc<Double>,
}

#[async_trait]
impl LookupClient for SlowFor {
    fn protocol(&self) -> Protocol {
        Protocol::Dns
    }

    async fn lookup(
        &self,
        endpoint: &Endpoint,
        target: &QueryTarget,
        timeout: Duration,
    ) -> Result<RawResponse, LookupError> {
        if let Endpoint::Dns {
            resolver: Some(ip), ..
        } = endpoint
        {
            if *ip == self.slow {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        }
        self.inner.lookup(endpoint, target, timeout).await
    }
}

#[tokio::test]
async fn test_propagation_rejects_asn() {
    let checker = build(
        fast_config(),
        &unused(Protocol::Rdap),
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );
    let result = checker.check_propagation("AS15169", DnsRecordType::A).await;
    assert!(matches!(result, Err(LookupError::Validation { .. })));
}

#[tokio::test]
async fn test_compare_reports_differences() {
    let rdap = Arc::new(Double::new(Protocol::Rdap, |_, target| {
        Ok(rdap_registered(target))
    }));
    let whois = Arc::new(Double::new(Protocol::Whois, |_, _| {
        Ok(whois_text(
            "Domain Name: EXAMPLE.COM\n\
             Registrar: Some Other Registrar\n\
             Creation Date: 1995-08-14T04:00:00Z\n\
             Registry Expiry Date: 2025-08-13T04:00:00Z\n\
             Name Server: B.IANA-SERVERS.NET\n\
             Name Server: A.IANA-SERVERS.NET\n",
        ))
    }));
    let checker = build(fast_config(), &rdap, &whois, &unused(Protocol::Dns));

    let comparison = checker.compare("example.com").await;

    assert!(comparison.whois.success);
    assert!(comparison.rdap.success);
    assert_eq!(comparison.whois.protocol, Some(Protocol::Whois));
    assert_eq!(comparison.rdap.protocol, Some(Protocol::Rdap));
    let fields: Vec<&str> = comparison
        .differences
        .iter()
        .map(|d| d.field.as_str())
        .collect();
    assert_eq!(fields, vec!["registrar"]);
}

/// Bootstrap source that counts fetches and serves a fixed `.zz` mapping.
struct CountingSource {
    fetches: AtomicUsize,
}

#[async_trait]
impl BootstrapSource for CountingSource {
    async fn fetch(&self, category: BootstrapCategory) -> Result<BootstrapRegistry, LookupError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        BootstrapRegistry::from_json(
            category,
            &json!({"services": [[["zz"], ["https://rdap.nic.zz/"]]]}),
        )
    }
}

#[tokio::test]
async fn test_bootstrap_fetched_once_for_concurrent_lookups() {
    let source = Arc::new(CountingSource {
        fetches: AtomicUsize::new(0),
    });
    let rdap = Arc::new(Double::new(Protocol::Rdap, |endpoint, target| {
        assert_eq!(endpoint, &Endpoint::rdap("https://rdap.nic.zz/"));
        Ok(rdap_registered(target))
    }));

    let checker = DomainChecker::with_clients(
        fast_config(),
        rdap.clone(),
        unused(Protocol::Whois),
        unused(Protocol::Dns),
        EndpointResolver::with_source(source.clone(), true),
    )
    .unwrap();

    let targets: Vec<String> = (0..10).map(|i| format!("name{}.zz", i)).collect();
    let batch = checker
        .lookup_batch_with(&targets, LookupMethod::Rdap, 10, 1000.0)
        .await
        .unwrap();

    assert_eq!(batch.succeeded, 10);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    assert!(checker
        .endpoint_resolver()
        .bootstrap_cache()
        .is_loaded(BootstrapCategory::Dns));
}

#[test]
fn test_invalid_config_is_a_hard_error() {
    let result = DomainChecker::with_clients(
        CheckConfig::default().with_concurrency(0),
        unused(Protocol::Rdap),
        unused(Protocol::Whois),
        unused(Protocol::Dns),
        EndpointResolver::new(false),
    );
    assert!(matches!(result, Err(LookupError::Config { .. })));
}

#[tokio::test]
async fn test_unrepresentable_limits_are_config_errors() {
    for config in [
        CheckConfig::default().with_rate_limit(1e-20),
        CheckConfig::default().with_timeout(Duration::from_secs(u64::MAX)),
    ] {
        let result = DomainChecker::with_clients(
            config,
            unused(Protocol::Rdap),
            unused(Protocol::Whois),
            unused(Protocol::Dns),
            EndpointResolver::new(false),
        );
        assert!(matches!(result, Err(LookupError::Config { .. })));
    }

    let checker = build(
        fast_config(),
        &unused(Protocol::Rdap),
        &unused(Protocol::Whois),
        &unused(Protocol::Dns),
    );
    let targets = vec!["example.com".to_string()];
    let batch = checker
        .lookup_batch_with(&targets, LookupMethod::Auto, 4, 1e-20)
        .await;
    assert!(matches!(batch, Err(LookupError::Config { .. })));
}

// Live network tests. Run with `cargo test -- --ignored`.

#[tokio::test]
#[ignore]
async fn test_live_example_com() {
    let checker = DomainChecker::new().unwrap();
    let outcome = checker.lookup("example.com").await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.status, RegistrationStatus::Registered);
}

#[tokio::test]
#[ignore]
async fn test_live_propagation() {
    let checker = DomainChecker::new().unwrap();
    let result = checker
        .check_propagation("example.com", DnsRecordType::A)
        .await
        .unwrap();
    assert!(result.successful > 0);
}
