//! Lookup orchestration.
//!
//! [`DomainChecker`] owns one client per protocol and the endpoint resolver. It
//! runs single lookups (with RDAP → WHOIS fallback in `auto` mode), ordered and
//! streaming batches through a [`Governor`], DNS propagation checks and
//! WHOIS/RDAP comparisons.

use crate::concurrent::Governor;
use crate::error::LookupError;
use crate::normalize::normalize;
use crate::propagation::{self, default_resolvers};
use crate::protocols::{DnsClient, EndpointResolver, LookupClient, RdapClient, WhoisClient};
use crate::types::{
    BatchResult, CheckConfig, Comparison, DnsRecordType, FieldDifference, LookupMethod,
    LookupOutcome, NormalizedRecord, PropagationResult, Protocol, PublicResolver, QueryTarget,
    RegistrationStatus,
};
use crate::utils::read_targets_file;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Main entry point for lookups.
///
/// Cloning is cheap: clients and the bootstrap cache are shared, so every
/// clone sees the same cached IANA registries.
///
/// # Example
///
/// ```rust,no_run
/// use domain_checker_lib::{DomainChecker, LookupMethod};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let checker = DomainChecker::new()?;
///     let outcome = checker.lookup("example.com").await;
///     println!("{}: {}", outcome.target, outcome.status);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DomainChecker {
    config: CheckConfig,
    rdap: Arc<dyn LookupClient>,
    whois: Arc<dyn LookupClient>,
    dns: Arc<dyn LookupClient>,
    resolver: Arc<EndpointResolver>,
}

impl DomainChecker {
    /// Create a checker with the default configuration.
    pub fn new() -> Result<Self, LookupError> {
        Self::with_config(CheckConfig::default())
    }

    /// Create a checker with a custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use domain_checker_lib::{CheckConfig, DomainChecker};
    /// use std::time::Duration;
    ///
    /// let config = CheckConfig::default()
    ///     .with_concurrency(20)
    ///     .with_timeout(Duration::from_secs(10));
    ///
    /// let checker = DomainChecker::with_config(config).unwrap();
    /// assert_eq!(checker.config().concurrency, 20);
    /// ```
    pub fn with_config(config: CheckConfig) -> Result<Self, LookupError> {
        let resolver = EndpointResolver::new(config.enable_bootstrap)
            .with_dns_resolver(config.dns_resolver);
        Self::with_clients(
            config,
            Arc::new(RdapClient::new()?),
            Arc::new(WhoisClient::new()),
            Arc::new(DnsClient::new()),
            resolver,
        )
    }

    /// Create a checker from explicit protocol clients.
    ///
    /// Used to plug in alternative transports or test doubles.
    pub fn with_clients(
        config: CheckConfig,
        rdap: Arc<dyn LookupClient>,
        whois: Arc<dyn LookupClient>,
        dns: Arc<dyn LookupClient>,
        resolver: EndpointResolver,
    ) -> Result<Self, LookupError> {
        config.validate()?;
        Ok(Self {
            config,
            rdap,
            whois,
            dns,
            resolver: Arc::new(resolver),
        })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    pub fn endpoint_resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Look up one target with the configured default method.
    pub async fn lookup(&self, input: &str) -> LookupOutcome {
        self.lookup_with_method(input, self.config.method).await
    }

    /// Look up one target with an explicit method.
    ///
    /// Never fails: invalid input, unknown servers, network errors and
    /// timeouts all come back as a failed [`LookupOutcome`].
    pub async fn lookup_with_method(&self, input: &str, method: LookupMethod) -> LookupOutcome {
        self.run(input, method, self.config.record_type).await
    }

    /// Query DNS records for a domain (or PTR for an IP address).
    pub async fn dig(&self, input: &str, record_type: DnsRecordType) -> LookupOutcome {
        self.run(input, LookupMethod::Dig, record_type).await
    }

    /// Reverse DNS lookup of an IP address.
    pub async fn reverse_lookup(&self, input: &str) -> LookupOutcome {
        match QueryTarget::parse(input) {
            Ok(QueryTarget::Ip(_)) => self.run(input, LookupMethod::Dig, DnsRecordType::Ptr).await,
            Ok(_) => LookupOutcome::failed(
                input,
                LookupMethod::Dig,
                Some(Protocol::Dns),
                LookupError::validation(input, "reverse lookups need an IP address"),
                Duration::ZERO,
            ),
            Err(error) => LookupOutcome::failed(
                input,
                LookupMethod::Dig,
                None,
                error,
                Duration::ZERO,
            ),
        }
    }

    async fn run(&self, input: &str, method: LookupMethod, record_type: DnsRecordType) -> LookupOutcome {
        let start = Instant::now();
        let target = match QueryTarget::parse(input) {
            Ok(target) => target,
            Err(error) => {
                tracing::debug!(query = input, error = %error, "rejected target");
                return LookupOutcome::failed(input, method, None, error, start.elapsed());
            }
        };

        let Some(deadline) = start.checked_add(self.config.timeout) else {
            let error = LookupError::config(format!(
                "Timeout {:?} is too large",
                self.config.timeout
            ));
            return LookupOutcome::failed(input, method, None, error, start.elapsed());
        };
        let result = match method {
            LookupMethod::Auto => self.auto(&target, deadline).await,
            LookupMethod::Rdap => self
                .attempt(&target, Protocol::Rdap, record_type, deadline)
                .await
                .map_err(|e| (Protocol::Rdap, e)),
            LookupMethod::Whois => self
                .attempt(&target, Protocol::Whois, record_type, deadline)
                .await
                .map_err(|e| (Protocol::Whois, e)),
            LookupMethod::Dig => self
                .attempt(&target, Protocol::Dns, record_type, deadline)
                .await
                .map_err(|e| (Protocol::Dns, e)),
        };

        match result {
            Ok(record) => LookupOutcome::succeeded(input, method, record, start.elapsed()),
            Err((protocol, error)) => {
                tracing::debug!(query = input, method = %method, error = %error, "lookup failed");
                LookupOutcome::failed(input, method, Some(protocol), error, start.elapsed())
            }
        }
    }

    /// RDAP first, WHOIS when RDAP fails and budget remains.
    ///
    /// An RDAP timeout that leaves time on the clock still falls back; only an
    /// exhausted deadline skips WHOIS.
    async fn auto(
        &self,
        target: &QueryTarget,
        deadline: Instant,
    ) -> Result<NormalizedRecord, (Protocol, LookupError)> {
        let primary = match self
            .attempt(target, Protocol::Rdap, self.config.record_type, deadline)
            .await
        {
            Ok(record) => return Ok(record),
            Err(error) => error,
        };

        if !primary.is_fallback_eligible() {
            return Err((Protocol::Rdap, primary));
        }
        if Instant::now() >= deadline {
            return Err((
                Protocol::Rdap,
                LookupError::timeout(
                    format!("lookup of {} (WHOIS fallback skipped)", target),
                    self.config.timeout,
                ),
            ));
        }

        tracing::debug!(query = %target, error = %primary, "RDAP failed, falling back to WHOIS");
        self.attempt(target, Protocol::Whois, self.config.record_type, deadline)
            .await
            .map_err(|fallback| (Protocol::Rdap, LookupError::with_fallback(primary, fallback)))
    }

    /// One protocol exchange, endpoint resolution included, cut off at `deadline`.
    async fn attempt(
        &self,
        target: &QueryTarget,
        protocol: Protocol,
        record_type: DnsRecordType,
        deadline: Instant,
    ) -> Result<NormalizedRecord, LookupError> {
        match tokio::time::timeout_at(deadline, self.exchange(target, protocol, record_type, deadline))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LookupError::timeout(
                format!("{} lookup of {}", protocol, target),
                self.config.timeout,
            )),
        }
    }

    async fn exchange(
        &self,
        target: &QueryTarget,
        protocol: Protocol,
        record_type: DnsRecordType,
        deadline: Instant,
    ) -> Result<NormalizedRecord, LookupError> {
        let endpoint = match protocol {
            Protocol::Dns => self.resolver.resolve_dns(target, record_type)?,
            other => self.resolver.resolve(target, other).await?,
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let raw = self
            .client(protocol)
            .lookup(&endpoint, target, remaining)
            .await?;
        tracing::debug!(query = %target, endpoint = %endpoint, "response received");

        Ok(normalize(target, &raw))
    }

    fn client(&self, protocol: Protocol) -> &dyn LookupClient {
        match protocol {
            Protocol::Rdap => self.rdap.as_ref(),
            Protocol::Whois => self.whois.as_ref(),
            Protocol::Dns => self.dns.as_ref(),
        }
    }

    /// Look up many targets with the configured concurrency and rate limit.
    ///
    /// Outcomes come back in input order.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use domain_checker_lib::{DomainChecker, LookupMethod};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let checker = DomainChecker::new()?;
    ///     let targets = vec!["example.com".to_string(), "example.org".to_string()];
    ///     let batch = checker.lookup_batch(&targets, LookupMethod::Auto).await?;
    ///     println!("{} registered", batch.registered);
    ///     Ok(())
    /// }
    /// ```
    pub async fn lookup_batch(
        &self,
        targets: &[String],
        method: LookupMethod,
    ) -> Result<BatchResult, LookupError> {
        self.lookup_batch_with(targets, method, self.config.concurrency, self.config.rate_limit)
            .await
    }

    /// Look up many targets with explicit limits.
    ///
    /// Each target runs in its own task; a failing or panicking task only
    /// affects its own slot. Aggregates are computed once every task settled.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] for a zero concurrency or an invalid rate.
    pub async fn lookup_batch_with(
        &self,
        targets: &[String],
        method: LookupMethod,
        concurrency: usize,
        rate_limit: f64,
    ) -> Result<BatchResult, LookupError> {
        let governor = Governor::new(concurrency, rate_limit)?;
        let start = Instant::now();
        tracing::debug!(targets = targets.len(), concurrency, rate_limit, "starting batch");

        let mut tasks = FuturesUnordered::new();
        for (index, input) in targets.iter().enumerate() {
            let checker = self.clone();
            let governor = governor.clone();
            let input = input.clone();
            let handle =
                tokio::spawn(async move { checker.governed_lookup(&governor, &input, method).await });
            tasks.push(async move { (index, handle.await) });
        }

        let mut slots: Vec<Option<LookupOutcome>> = vec![None; targets.len()];
        while let Some((index, joined)) = tasks.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(query = %targets[index], error = %e, "lookup task aborted");
                    LookupOutcome::failed(
                        &targets[index],
                        method,
                        None,
                        LookupError::internal(format!("lookup task failed: {}", e)),
                        Duration::ZERO,
                    )
                }
            };
            slots[index] = Some(outcome);
        }

        let outcomes = slots
            .into_iter()
            .zip(targets)
            .map(|(slot, input)| {
                slot.unwrap_or_else(|| {
                    LookupOutcome::failed(
                        input,
                        method,
                        None,
                        LookupError::internal("lookup task produced no outcome"),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        Ok(summarize(outcomes, start.elapsed()))
    }

    /// Look up many targets, yielding outcomes as they complete.
    ///
    /// Same admission control as [`DomainChecker::lookup_batch`], but with no
    /// ordering guarantee and no aggregate.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use domain_checker_lib::{DomainChecker, LookupMethod};
    /// use futures::StreamExt;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let checker = DomainChecker::new()?;
    ///     let targets = vec!["example.com".to_string(), "example.org".to_string()];
    ///     let mut stream = checker.lookup_stream(&targets, LookupMethod::Whois)?;
    ///     while let Some(outcome) = stream.next().await {
    ///         println!("{}: {}", outcome.target, outcome.status);
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn lookup_stream(
        &self,
        targets: &[String],
        method: LookupMethod,
    ) -> Result<Pin<Box<dyn Stream<Item = LookupOutcome> + Send + '_>>, LookupError> {
        let governor = Governor::new(self.config.concurrency, self.config.rate_limit)?;
        let concurrency = self.config.concurrency;

        let stream = futures::stream::iter(targets.to_vec())
            .map(move |input| {
                let governor = governor.clone();
                async move { self.governed_lookup(&governor, &input, method).await }
            })
            .buffer_unordered(concurrency);

        Ok(Box::pin(stream))
    }

    async fn governed_lookup(
        &self,
        governor: &Governor,
        input: &str,
        method: LookupMethod,
    ) -> LookupOutcome {
        let _permit = match governor.acquire(method.is_rate_limited()).await {
            Ok(permit) => permit,
            Err(error) => {
                return LookupOutcome::failed(input, method, None, error, Duration::ZERO);
            }
        };
        self.lookup_with_method(input, method).await
    }

    /// Read targets from a file (one per line) and look them up as a batch.
    pub async fn lookup_file<P: AsRef<Path>>(
        &self,
        path: P,
        method: LookupMethod,
    ) -> Result<BatchResult, LookupError> {
        let targets = read_targets_file(path)?;
        self.lookup_batch(&targets, method).await
    }

    /// Check DNS propagation against the configured roster (or the built-in one).
    pub async fn check_propagation(
        &self,
        input: &str,
        record_type: DnsRecordType,
    ) -> Result<PropagationResult, LookupError> {
        let roster = self.config.resolvers.clone().unwrap_or_else(default_resolvers);
        self.check_propagation_with(input, record_type, &roster, self.config.propagation_timeout)
            .await
    }

    /// Check DNS propagation against an explicit roster and per-resolver timeout.
    ///
    /// # Errors
    ///
    /// Invalid targets, ASNs and an empty roster are rejected up front;
    /// resolver failures end up in the result instead.
    pub async fn check_propagation_with(
        &self,
        input: &str,
        record_type: DnsRecordType,
        roster: &[PublicResolver],
        timeout: Duration,
    ) -> Result<PropagationResult, LookupError> {
        let target = QueryTarget::parse(input)?;
        if let QueryTarget::Asn(_) = target {
            return Err(LookupError::validation(
                input,
                "propagation checks need a domain name or an IP address",
            ));
        }
        if roster.is_empty() {
            return Err(LookupError::config("Resolver roster cannot be empty"));
        }

        let result = propagation::check_propagation(
            self.dns.as_ref(),
            input,
            &target,
            record_type,
            roster,
            timeout,
        )
        .await;

        tracing::debug!(
            query = input,
            percentage = result.propagation_percentage,
            successful = result.successful,
            failed = result.failed,
            "propagation check finished"
        );
        Ok(result)
    }

    /// Run WHOIS and RDAP side by side and report where they disagree.
    pub async fn compare(&self, input: &str) -> Comparison {
        let (whois, rdap) = tokio::join!(
            self.lookup_with_method(input, LookupMethod::Whois),
            self.lookup_with_method(input, LookupMethod::Rdap),
        );

        let differences = match (&whois.record, &rdap.record) {
            (Some(w), Some(r)) => record_differences(w, r),
            _ => Vec::new(),
        };

        Comparison {
            target: input.to_string(),
            whois,
            rdap,
            differences,
        }
    }
}

fn summarize(outcomes: Vec<LookupOutcome>, total_time: Duration) -> BatchResult {
    let total = outcomes.len();
    let succeeded = outcomes.iter().filter(|o| o.success).count();
    let count = |status: RegistrationStatus| outcomes.iter().filter(|o| o.status == status).count();
    let registered = count(RegistrationStatus::Registered);
    let not_registered = count(RegistrationStatus::NotRegistered);
    let possibly_registered = count(RegistrationStatus::PossiblyRegistered);

    let average_time = if total == 0 {
        Duration::ZERO
    } else {
        outcomes.iter().map(|o| o.elapsed).sum::<Duration>() / total as u32
    };

    BatchResult {
        outcomes,
        total,
        succeeded,
        failed: total - succeeded,
        registered,
        not_registered,
        possibly_registered,
        total_time,
        average_time,
    }
}

/// Fields that differ between a WHOIS and an RDAP record.
///
/// Dates are compared by calendar day since WHOIS often omits the time.
pub fn record_differences(whois: &NormalizedRecord, rdap: &NormalizedRecord) -> Vec<FieldDifference> {
    let mut differences = Vec::new();
    let mut check = |field: &str, w: Option<String>, r: Option<String>| {
        if w != r {
            differences.push(FieldDifference {
                field: field.to_string(),
                whois: w,
                rdap: r,
            });
        }
    };

    let registrar = |r: &NormalizedRecord| r.registrar.as_ref().map(|s| s.trim().to_string());
    let (w, r) = (registrar(whois), registrar(rdap));
    if w.as_deref().map(str::to_lowercase) != r.as_deref().map(str::to_lowercase) {
        check("registrar", w, r);
    }

    let day = |d: &Option<DateTime<Utc>>| d.map(|d| d.format("%Y-%m-%d").to_string());
    check("creation_date", day(&whois.creation_date), day(&rdap.creation_date));
    check("expiration_date", day(&whois.expiration_date), day(&rdap.expiration_date));
    check("updated_date", day(&whois.updated_date), day(&rdap.updated_date));

    let servers = |r: &NormalizedRecord| -> Option<String> {
        let set: BTreeSet<String> = r.name_servers.iter().map(|s| s.to_lowercase()).collect();
        if set.is_empty() {
            None
        } else {
            Some(set.into_iter().collect::<Vec<_>>().join(", "))
        }
    };
    check("name_servers", servers(whois), servers(rdap));

    differences
}
