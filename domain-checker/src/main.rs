//! Domain Checker CLI Application
//!
//! A command-line interface for WHOIS, RDAP and DNS lookups, bulk lookups and
//! DNS propagation checks, built on domain-checker-lib.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use domain_checker_lib::propagation::resolvers_by_location;
use domain_checker_lib::{
    default_resolvers, load_env_config, parse_timeout_string, read_targets_file, BatchResult,
    CheckConfig, ConfigManager, DnsRecordType, DomainChecker, LookupError, LookupMethod,
    LookupOutcome,
};
use serde::Serialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Lookups completed, whatever the registration status.
const EXIT_OK: i32 = 0;
/// Invalid arguments or configuration.
const EXIT_ERROR: i32 = 1;
/// At least one lookup failed.
const EXIT_LOOKUP_FAILED: i32 = 2;

/// CLI arguments for domain-checker
#[derive(Parser, Debug)]
#[command(name = "domain-checker")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "WHOIS, RDAP and DNS lookups with bulk mode and DNS propagation checks")]
#[command(
    long_about = "Look up registration data over RDAP with automatic WHOIS fallback, query DNS records,\nrun bulk lookups with rate limiting, and check DNS propagation across public resolvers."
)]
#[command(styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", global = true, help_heading = "Output Format")]
    pub json: bool,

    /// Show detailed progress and library logs
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,

    /// Show timing, protocol details and trace logs
    #[arg(short = 'd', long = "debug", global = true, help_heading = "Configuration")]
    pub debug: bool,

    /// Use a specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up registration data for a domain, IP address or ASN
    Lookup {
        /// Domain, IP address or ASN (e.g. AS15169)
        #[arg(value_name = "TARGET")]
        target: String,

        /// Lookup method: auto, rdap, whois or dig
        #[arg(short = 'm', long = "method", value_name = "METHOD")]
        method: Option<LookupMethod>,

        /// Overall timeout, e.g. 10s or 1m
        #[arg(short = 't', long = "timeout", value_name = "DURATION", value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Record type for the dig method
        #[arg(short = 'r', long = "record", value_name = "TYPE")]
        record_type: Option<DnsRecordType>,

        /// Print the raw server response
        #[arg(long = "raw")]
        raw: bool,

        /// Use only the built-in RDAP server table
        #[arg(long = "no-bootstrap")]
        no_bootstrap: bool,
    },

    /// Look up many targets with bounded concurrency
    Bulk {
        /// Targets to look up
        #[arg(value_name = "TARGETS")]
        targets: Vec<String>,

        /// Read targets from a file (one per line, # for comments)
        #[arg(short = 'f', long = "file", value_name = "FILE")]
        file: Option<PathBuf>,

        /// Max concurrent lookups (1-100)
        #[arg(short = 'c', long = "concurrency", value_name = "N")]
        concurrency: Option<usize>,

        /// WHOIS/RDAP requests per second
        #[arg(long = "rate-limit", value_name = "RATE")]
        rate_limit: Option<f64>,

        /// Lookup method: auto, rdap, whois or dig
        #[arg(short = 'm', long = "method", value_name = "METHOD")]
        method: Option<LookupMethod>,

        /// Per-target timeout, e.g. 10s or 1m
        #[arg(short = 't', long = "timeout", value_name = "DURATION", value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Print results as they complete instead of in input order
        #[arg(long = "stream")]
        stream: bool,

        /// Use only the built-in RDAP server table
        #[arg(long = "no-bootstrap")]
        no_bootstrap: bool,
    },

    /// Query DNS records
    Dig {
        /// Domain name or IP address
        #[arg(value_name = "DOMAIN")]
        domain: String,

        /// Record type (A, AAAA, CNAME, MX, NS, PTR, SOA, TXT, CAA, SRV, ALL)
        #[arg(short = 'r', long = "record", value_name = "TYPE")]
        record_type: Option<DnsRecordType>,

        /// Resolver to ask instead of the system configuration
        #[arg(short = 's', long = "server", value_name = "IP")]
        server: Option<IpAddr>,
    },

    /// Reverse DNS lookup of an IP address
    Reverse {
        #[arg(value_name = "IP")]
        ip: String,
    },

    /// Check how far a DNS change has propagated across public resolvers
    Propagation {
        #[arg(value_name = "DOMAIN")]
        domain: String,

        /// Record type to compare (default A)
        #[arg(short = 'r', long = "record", value_name = "TYPE")]
        record_type: Option<DnsRecordType>,

        /// Per-resolver timeout, e.g. 5s
        #[arg(short = 't', long = "timeout", value_name = "DURATION", value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Only use resolvers in this region (Global, North America, Europe)
        #[arg(long = "location", value_name = "REGION")]
        location: Option<String>,
    },

    /// Compare WHOIS and RDAP answers for a domain
    Compare {
        #[arg(value_name = "DOMAIN")]
        domain: String,
    },
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    match parse_timeout_string(value) {
        Some(timeout) if !timeout.is_zero() => Ok(timeout),
        _ => Err(format!(
            "invalid timeout '{}'. Use a format like '5s', '30s', '2m'",
            value
        )),
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not errors
            let code = if e.use_stderr() { EXIT_ERROR } else { EXIT_OK };
            let _ = e.print();
            process::exit(code);
        }
    };

    init_logging(&cli);

    match run(cli).await {
        Ok(true) => process::exit(EXIT_OK),
        Ok(false) => process::exit(EXIT_LOOKUP_FAILED),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(EXIT_ERROR);
        }
    }
}

/// `RUST_LOG` wins; otherwise --debug, --verbose or warnings only.
fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "domain_checker=trace,domain_checker_lib=trace"
    } else if cli.verbose {
        "domain_checker=debug,domain_checker_lib=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the selected command. `Ok(false)` means some lookup failed.
async fn run(cli: Cli) -> Result<bool, LookupError> {
    let mut config = build_config(&cli)?;

    match &cli.command {
        Command::Lookup {
            target,
            method,
            timeout,
            record_type,
            raw,
            no_bootstrap,
        } => {
            apply_overrides(&mut config, *method, *timeout, *no_bootstrap);
            if let Some(record_type) = record_type {
                config.record_type = *record_type;
            }
            let checker = DomainChecker::with_config(config)?;
            let outcome = checker.lookup(target).await;
            print_outcome_details(&cli, &outcome, *raw)?;
            Ok(outcome.success)
        }

        Command::Bulk {
            targets,
            file,
            concurrency,
            rate_limit,
            method,
            timeout,
            stream,
            no_bootstrap,
        } => {
            apply_overrides(&mut config, *method, *timeout, *no_bootstrap);
            if let Some(concurrency) = concurrency {
                config.concurrency = *concurrency;
            }
            if let Some(rate_limit) = rate_limit {
                config.rate_limit = *rate_limit;
            }

            let mut all_targets = targets.clone();
            if let Some(path) = file {
                all_targets.extend(read_targets_file(path)?);
            }
            if all_targets.is_empty() {
                return Err(LookupError::config(
                    "No targets given. Pass targets as arguments or use --file",
                ));
            }

            let checker = DomainChecker::with_config(config)?;
            if *stream && !cli.json {
                run_streaming_bulk(&cli, &checker, &all_targets).await
            } else {
                run_bulk(&cli, &checker, &all_targets).await
            }
        }

        Command::Dig {
            domain,
            record_type,
            server,
        } => {
            config.dns_resolver = server.or(config.dns_resolver);
            let record_type = record_type.unwrap_or(config.record_type);
            let checker = DomainChecker::with_config(config)?;
            let outcome = checker.dig(domain, record_type).await;
            print_outcome_details(&cli, &outcome, false)?;
            Ok(outcome.success)
        }

        Command::Reverse { ip } => {
            let checker = DomainChecker::with_config(config)?;
            let outcome = checker.reverse_lookup(ip).await;
            print_outcome_details(&cli, &outcome, false)?;
            Ok(outcome.success)
        }

        Command::Propagation {
            domain,
            record_type,
            timeout,
            location,
        } => {
            if let Some(timeout) = timeout {
                config.propagation_timeout = *timeout;
            }
            if let Some(location) = location {
                let roster = config.resolvers.clone().unwrap_or_else(default_resolvers);
                let filtered = resolvers_by_location(&roster, location);
                if filtered.is_empty() {
                    return Err(LookupError::config(format!(
                        "No resolvers in location '{}'",
                        location
                    )));
                }
                config.resolvers = Some(filtered);
            }
            let record_type = record_type.unwrap_or(config.propagation_record_type);

            let checker = DomainChecker::with_config(config)?;
            let spinner = if cli.json {
                None
            } else {
                ui::Spinner::start(format!("Querying resolvers for {}...", domain))
            };
            let result = checker.check_propagation(domain, record_type).await;
            if let Some(s) = spinner {
                s.stop().await;
            }
            let result = result?;

            if cli.json {
                print_json(&result)?;
            } else {
                ui::print_propagation(&result);
            }
            Ok(result.successful > 0)
        }

        Command::Compare { domain } => {
            let checker = DomainChecker::with_config(config)?;
            let comparison = checker.compare(domain).await;
            if cli.json {
                print_json(&comparison)?;
            } else {
                ui::print_comparison(&comparison);
            }
            Ok(comparison.whois.success && comparison.rdap.success)
        }
    }
}

/// Build CheckConfig from config files and the environment.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (applied by the caller)
/// 2. Environment variables (DOMAIN_CHECKER_*)
/// 3. Explicit --config file, or discovered files
///    (./domain-checker.toml > ~/.domain-checker.toml > XDG config)
/// 4. Built-in defaults
fn build_config(cli: &Cli) -> Result<CheckConfig, LookupError> {
    let env_config = load_env_config();
    let manager = ConfigManager::new();

    let file_config = match cli.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };

    let config = env_config.apply_to(file_config.apply_to(CheckConfig::default())?);
    debug!(?config, "effective configuration before command-line overrides");
    Ok(config)
}

fn apply_overrides(
    config: &mut CheckConfig,
    method: Option<LookupMethod>,
    timeout: Option<Duration>,
    no_bootstrap: bool,
) {
    if let Some(method) = method {
        config.method = method;
    }
    if let Some(timeout) = timeout {
        config.timeout = timeout;
    }
    if no_bootstrap {
        config.enable_bootstrap = false;
    }
}

fn print_outcome_details(
    cli: &Cli,
    outcome: &LookupOutcome,
    raw: bool,
) -> Result<(), LookupError> {
    if cli.json {
        print_json(outcome)
    } else {
        ui::print_details(outcome, raw);
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LookupError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Collect every outcome first, then print in input order.
async fn run_bulk(
    cli: &Cli,
    checker: &DomainChecker,
    targets: &[String],
) -> Result<bool, LookupError> {
    let config = checker.config();
    if !cli.json && (cli.verbose || cli.debug) {
        ui::print_header(targets.len(), config.concurrency, config.rate_limit);
    }

    // Spinner::start returns None if stderr isn't a TTY.
    let spinner = if cli.json {
        None
    } else {
        ui::Spinner::start(format!("Looking up {} targets...", targets.len()))
    };

    let batch = checker.lookup_batch(targets, config.method).await;

    if let Some(s) = spinner {
        s.stop().await;
    }
    let batch = batch?;

    if cli.json {
        print_json(&batch)?;
    } else {
        display_text_batch(cli, &batch);
    }

    Ok(batch.failed == 0)
}

fn display_text_batch(cli: &Cli, batch: &BatchResult) {
    for outcome in &batch.outcomes {
        ui::print_outcome(outcome, cli.debug, None);
    }

    println!();
    ui::print_summary(batch);

    let error_stats = ui::ErrorStats::from_outcomes(&batch.outcomes);
    if error_stats.has_errors() {
        println!();
        ui::print_error_summary(&error_stats);
    }
}

/// Print each outcome as soon as it completes.
async fn run_streaming_bulk(
    cli: &Cli,
    checker: &DomainChecker,
    targets: &[String],
) -> Result<bool, LookupError> {
    use futures::StreamExt;

    let config = checker.config();
    ui::print_header(targets.len(), config.concurrency, config.rate_limit);

    let mut stream = checker.lookup_stream(targets, config.method)?;
    let mut error_stats = ui::ErrorStats::default();
    let total = targets.len();
    let mut completed = 0usize;
    let mut failed = 0usize;

    while let Some(outcome) = stream.next().await {
        completed += 1;
        if !outcome.success {
            failed += 1;
        }
        if let Some(error) = &outcome.error {
            error_stats.add_error(&outcome.target, error.kind());
        }
        ui::print_outcome(&outcome, cli.debug, Some((completed, total)));
    }

    if error_stats.has_errors() {
        println!();
        ui::print_error_summary(&error_stats);
    }

    Ok(failed == 0)
}
