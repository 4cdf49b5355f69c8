//! Text output for the domain-checker CLI.
//!
//! Colored result lines, record details, batch and propagation summaries, and
//! the spinner shown while a batch runs. Uses only the `console` crate.

use console::{pad_str, style, Alignment, Term};
use domain_checker_lib::{
    BatchResult, Comparison, Contact, ErrorKind, LookupOutcome, NormalizedRecord,
    PropagationResult, RegistrationStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner, or return `None` when stderr is not a terminal.
    pub fn start(message: String) -> Option<Self> {
        if !Term::stderr().is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let term = Term::stderr();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!("{} {}", style(frame).cyan(), message));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a bulk run.
pub fn print_header(target_count: usize, concurrency: usize, rate_limit: f64) {
    println!(
        "{} {} {}",
        style("domain-checker").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!(
            "· Looking up {} target{}",
            target_count,
            if target_count == 1 { "" } else { "s" }
        ))
        .dim(),
    );
    println!(
        "{}",
        style(format!(
            "Concurrency: {} | Rate limit: {} req/s",
            concurrency, rate_limit
        ))
        .dim()
    );
    println!();
}

// ── Single result line ───────────────────────────────────────────────────────

/// Print one outcome as a colored line.
///
/// If `counter` is Some((current, total)), a progress prefix like `[3/8]` is shown.
pub fn print_outcome(outcome: &LookupOutcome, debug: bool, counter: Option<(usize, usize)>) {
    let padded = pad_str(&outcome.target, 30, Alignment::Left, Some(".."));

    let prefix = match counter {
        Some((cur, total)) => format!("{} ", style(format!("[{}/{}]", cur, total)).dim()),
        None => String::new(),
    };

    let label = status_label(outcome);
    let detail = match (&outcome.record, &outcome.error) {
        (Some(record), _) => format!("  {}", style(format_record_info(record)).dim()),
        (None, Some(_)) => format!("  {}", style(brief_error(outcome)).dim()),
        (None, None) => String::new(),
    };

    println!("  {}{}  {}{}", prefix, style(&padded).white(), label, detail);

    if debug {
        let via = outcome
            .protocol
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "      {} {}ms via {} ({})",
            style("└─").dim(),
            outcome.elapsed.as_millis(),
            via,
            outcome.method,
        );
        if let Some(error) = &outcome.error {
            println!("      {} {}", style("└─").dim(), style(error).dim());
        }
    }
}

fn status_label(outcome: &LookupOutcome) -> String {
    if !outcome.success && outcome.status == RegistrationStatus::PossiblyRegistered {
        return style("FAILED").yellow().bold().to_string();
    }
    match outcome.status {
        RegistrationStatus::Registered => style("REGISTERED").red().bold().to_string(),
        RegistrationStatus::NotRegistered => style("NOT REGISTERED").green().bold().to_string(),
        RegistrationStatus::PossiblyRegistered => {
            style("POSSIBLY REGISTERED").yellow().bold().to_string()
        }
    }
}

// ── Record details ───────────────────────────────────────────────────────────

/// Print every populated field of a single lookup.
pub fn print_details(outcome: &LookupOutcome, show_raw: bool) {
    println!(
        "{} {}  {}",
        style(&outcome.target).bold(),
        status_label(outcome),
        style(format!(
            "{}ms via {}",
            outcome.elapsed.as_millis(),
            outcome
                .protocol
                .map(|p| p.to_string())
                .unwrap_or_else(|| outcome.method.to_string())
        ))
        .dim(),
    );

    if let Some(error) = &outcome.error {
        println!("  {} {}", style("Error:").yellow(), error);
    }

    let Some(record) = &outcome.record else {
        return;
    };

    field("Registrar", record.registrar.as_deref());
    field(
        "Created",
        record.creation_date.map(|d| d.to_rfc3339()).as_deref(),
    );
    field(
        "Expires",
        record.expiration_date.map(|d| d.to_rfc3339()).as_deref(),
    );
    field(
        "Updated",
        record.updated_date.map(|d| d.to_rfc3339()).as_deref(),
    );
    list("Status", &record.status);
    list("Name servers", &record.name_servers);

    for (role, contact) in [
        ("Registrant", &record.registrant),
        ("Admin", &record.admin_contact),
        ("Tech", &record.tech_contact),
    ] {
        if let Some(contact) = contact {
            field(role, Some(format_contact(contact).as_str()));
        }
    }

    if !record.dns_records.is_empty() {
        println!("  {}", style("Records:").cyan());
        for r in &record.dns_records {
            println!(
                "    {:<6} {}  {}",
                r.record_type.to_string(),
                style(format!("{:>6}", r.ttl)).dim(),
                r.value
            );
        }
    }

    if show_raw && !record.raw_data.is_empty() {
        println!();
        println!("{}", style("── Raw response ─────────────────────────────").dim());
        println!("{}", record.raw_data.trim_end());
    }
}

fn field(name: &str, value: Option<&str>) {
    if let Some(value) = value {
        println!("  {} {}", style(format!("{}:", name)).cyan(), value);
    }
}

fn list(name: &str, values: &[String]) {
    if !values.is_empty() {
        field(name, Some(values.join(", ").as_str()));
    }
}

fn format_contact(contact: &Contact) -> String {
    [
        contact.name.as_deref(),
        contact.organization.as_deref(),
        contact.email.as_deref(),
        contact.phone.as_deref(),
        contact.address.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" | ")
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the final summary bar with colored counts.
pub fn print_summary(batch: &BatchResult) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} target{} in {:.1}s  {}  {}  {}  {}  {}  {}  {}  {}",
        style(batch.total).bold(),
        if batch.total == 1 { "" } else { "s" },
        batch.total_time.as_secs_f64(),
        style("|").dim(),
        style(format!("{} registered", batch.registered)).red(),
        style("|").dim(),
        style(format!("{} not registered", batch.not_registered)).green(),
        style("|").dim(),
        style(format!("{} possibly registered", batch.possibly_registered)).yellow(),
        style("|").dim(),
        style(format!("{} failed", batch.failed)).yellow(),
    );
}

// ── Error summary ────────────────────────────────────────────────────────────

/// Failed targets grouped by error category.
#[derive(Debug, Default)]
pub struct ErrorStats {
    pub timeouts: Vec<String>,
    pub network_errors: Vec<String>,
    pub protocol_errors: Vec<String>,
    pub unsupported_errors: Vec<String>,
    pub invalid_targets: Vec<String>,
    pub other_errors: Vec<String>,
}

impl ErrorStats {
    pub fn from_outcomes<'a, I: IntoIterator<Item = &'a LookupOutcome>>(outcomes: I) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            if let Some(error) = &outcome.error {
                stats.add_error(&outcome.target, error.kind());
            }
        }
        stats
    }

    pub fn add_error(&mut self, target: &str, kind: ErrorKind) {
        let bucket = match kind {
            ErrorKind::Timeout => &mut self.timeouts,
            ErrorKind::Connection => &mut self.network_errors,
            ErrorKind::Protocol => &mut self.protocol_errors,
            ErrorKind::UnsupportedTld | ErrorKind::EndpointResolution => {
                &mut self.unsupported_errors
            }
            ErrorKind::Validation => &mut self.invalid_targets,
            // Explicit negative answers are results, not errors.
            ErrorKind::NotFound => return,
            ErrorKind::Config | ErrorKind::Internal => &mut self.other_errors,
        };
        bucket.push(target.to_string());
    }

    pub fn has_errors(&self) -> bool {
        self.categories().iter().any(|(_, targets)| !targets.is_empty())
    }

    fn categories(&self) -> [(&'static str, &Vec<String>); 6] {
        [
            ("timeout", &self.timeouts),
            ("network error", &self.network_errors),
            ("protocol error", &self.protocol_errors),
            ("unsupported TLD", &self.unsupported_errors),
            ("invalid target", &self.invalid_targets),
            ("other error", &self.other_errors),
        ]
    }
}

/// Print a categorized error summary using colors.
pub fn print_error_summary(error_stats: &ErrorStats) {
    if !error_stats.has_errors() {
        return;
    }

    println!("  {}", style("Some targets could not be looked up:").yellow());

    for (label, targets) in error_stats.categories() {
        if targets.is_empty() {
            continue;
        }
        println!(
            "  {} {} {}{}: {}",
            style("•").dim(),
            targets.len(),
            label,
            if targets.len() == 1 { "" } else { "s" },
            format_list(targets, 5),
        );
    }
}

fn format_list(items: &[String], max_show: usize) -> String {
    if items.len() <= max_show {
        items.join(", ")
    } else {
        format!(
            "{}, ... and {} more",
            items[..max_show].join(", "),
            items.len() - max_show
        )
    }
}

// ── Propagation ──────────────────────────────────────────────────────────────

/// Print one line per resolver, then the agreement verdict.
pub fn print_propagation(result: &PropagationResult) {
    println!(
        "{} {} {}",
        style("Propagation of").bold(),
        style(&result.target).bold(),
        style(format!("({})", result.record_type)).dim(),
    );
    println!();

    let majority = result.value_sets.first().map(|group| &group.values);

    for entry in &result.results {
        let name = pad_str(&entry.resolver.name, 30, Alignment::Left, Some(".."));
        let location = pad_str(&entry.resolver.location, 14, Alignment::Left, None);
        let answer = if !entry.answered() {
            style(brief_error(&entry.outcome).to_string()).yellow()
        } else if entry.values.is_empty() {
            style("(no records)".to_string()).dim()
        } else if Some(&entry.values) == majority {
            style(entry.values.join(", ")).green()
        } else {
            style(entry.values.join(", ")).red()
        };
        println!("  {} {} {}", style(&name).white(), style(&location).dim(), answer);
    }

    println!();
    let verdict = if result.fully_propagated {
        style("fully propagated".to_string()).green().bold()
    } else if result.successful == 0 {
        style("no resolver answered".to_string()).yellow().bold()
    } else {
        style("not fully propagated".to_string()).yellow().bold()
    };
    println!(
        "  {:.1}% agreement ({} of {} answering resolvers, {} failed)  {}  {:.1}s",
        result.propagation_percentage,
        result.majority_size,
        result.successful,
        result.failed,
        verdict,
        result.total_time.as_secs_f64(),
    );
}

// ── Compare ──────────────────────────────────────────────────────────────────

pub fn print_comparison(comparison: &Comparison) {
    println!("{}", style("── WHOIS ──────────────────────────────────────").dim());
    print_details(&comparison.whois, false);
    println!();
    println!("{}", style("── RDAP ───────────────────────────────────────").dim());
    print_details(&comparison.rdap, false);
    println!();

    if !(comparison.whois.success && comparison.rdap.success) {
        println!(
            "  {}",
            style("Both protocols must answer to compare fields").yellow()
        );
    } else if comparison.differences.is_empty() {
        println!("  {}", style("WHOIS and RDAP agree").green());
    } else {
        println!("  {}", style("Differences:").yellow().bold());
        for diff in &comparison.differences {
            println!(
                "  {} {}: WHOIS {} / RDAP {}",
                style("•").dim(),
                diff.field,
                diff.whois.as_deref().unwrap_or("-"),
                diff.rdap.as_deref().unwrap_or("-"),
            );
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Registrar and dates in one concise string.
pub fn format_record_info(record: &NormalizedRecord) -> String {
    let mut parts = Vec::new();
    if let Some(registrar) = &record.registrar {
        parts.push(format!("Registrar: {}", registrar));
    }
    if let Some(created) = &record.creation_date {
        parts.push(format!("Created: {}", created.format("%Y-%m-%d")));
    }
    if let Some(expires) = &record.expiration_date {
        parts.push(format!("Expires: {}", expires.format("%Y-%m-%d")));
    }
    if parts.is_empty() && !record.dns_records.is_empty() {
        parts.push(format!("{} DNS records", record.dns_records.len()));
    }
    if parts.is_empty() {
        "No info available".to_string()
    } else {
        parts.join(", ")
    }
}

/// A short reason for a failed outcome.
fn brief_error(outcome: &LookupOutcome) -> &'static str {
    match outcome.error.as_ref().map(|e| e.kind()) {
        Some(ErrorKind::Timeout) => "(timeout)",
        Some(ErrorKind::Connection) => "(network error)",
        Some(ErrorKind::Protocol) => "(protocol error)",
        Some(ErrorKind::UnsupportedTld) | Some(ErrorKind::EndpointResolution) => {
            "(unsupported TLD)"
        }
        Some(ErrorKind::Validation) => "(invalid target)",
        Some(ErrorKind::NotFound) => "(not found)",
        Some(_) => "(error)",
        None => "(unknown status)",
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
