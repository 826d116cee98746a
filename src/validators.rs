/// Email address validation
/// Two layers:
/// 1. Syntax: length limits and an RFC 5322 simplified pattern
/// 2. Domain: the domain publishes MX records (registration only)
///
/// Only NXDOMAIN or an empty MX answer rejects an address. Timeouts and
/// resolver failures are "unknown" and accepted, so registration keeps
/// working while DNS is unhealthy.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use lazy_static::lazy_static;
use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MAX_DOMAIN_LENGTH: usize = 253;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Outcome of resolving an email domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCheck {
    Resolvable,
    /// NXDOMAIN, or the domain publishes no MX
    Unresolvable,
    /// Timeout or resolver failure
    Unknown,
}

/// Normalize and syntactically validate an email address.
///
/// Returns the trimmed, lowercased address.
pub fn parse_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();

    let length = normalized.chars().count();
    if length == 0 || length > MAX_EMAIL_LENGTH {
        return None;
    }

    let (local, domain) = normalized.split_once('@')?;
    if domain.contains('@') {
        return None;
    }
    let local_length = local.chars().count();
    if local_length == 0 || local_length > MAX_LOCAL_PART_LENGTH {
        return None;
    }
    let domain_length = domain.chars().count();
    if domain_length == 0 || domain_length > MAX_DOMAIN_LENGTH {
        return None;
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return None;
    }

    Some(normalized)
}

fn domain_of(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or(email)
}

/// Classify a "no records" answer by its response code
fn classify_no_records(response_code: ResponseCode) -> DomainCheck {
    match response_code {
        // no such domain, or a domain without MX
        ResponseCode::NXDomain | ResponseCode::NoError => DomainCheck::Unresolvable,
        _ => DomainCheck::Unknown,
    }
}

fn classify_error(err: &ResolveError) -> DomainCheck {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => {
            classify_no_records(*response_code)
        }
        _ => DomainCheck::Unknown,
    }
}

fn classify_answer(mx_records: usize) -> DomainCheck {
    if mx_records > 0 {
        DomainCheck::Resolvable
    } else {
        DomainCheck::Unresolvable
    }
}

/// Email validator used by the auth service
#[derive(Clone)]
pub struct EmailValidator {
    /// `None` disables the domain check
    resolver: Option<Arc<TokioAsyncResolver>>,
    dns_timeout: Duration,
}

impl std::fmt::Debug for EmailValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailValidator")
            .field("check_domain", &self.resolver.is_some())
            .field("dns_timeout", &self.dns_timeout)
            .finish()
    }
}

impl EmailValidator {
    /// Build a validator. With `check_domain` the system resolver
    /// configuration is read once here; if it cannot be read the domain
    /// check is skipped.
    pub fn new(check_domain: bool, dns_timeout: Duration) -> Self {
        let resolver = if check_domain {
            match TokioAsyncResolver::tokio_from_system_conf() {
                Ok(resolver) => Some(Arc::new(resolver)),
                Err(e) => {
                    tracing::warn!(error = %e, "No system resolver configuration, email domain check disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            resolver,
            dns_timeout,
        }
    }

    /// A validator that never touches DNS
    pub fn syntax_only() -> Self {
        Self::new(false, Duration::ZERO)
    }

    /// Syntax check only
    pub fn parse(&self, email: &str) -> Option<String> {
        parse_email(email)
    }

    /// Syntax check plus MX lookup. Returns the normalized address unless it
    /// is malformed or its domain definitely cannot receive mail.
    pub async fn validate(&self, email: &str) -> Option<String> {
        let email = parse_email(email)?;
        let resolver = match &self.resolver {
            Some(resolver) => resolver,
            None => return Some(email),
        };

        match self.check_domain(resolver, domain_of(&email)).await {
            DomainCheck::Unresolvable => None,
            DomainCheck::Resolvable => Some(email),
            DomainCheck::Unknown => {
                tracing::warn!(domain = %domain_of(&email), "Email domain check inconclusive, accepting address");
                Some(email)
            }
        }
    }

    async fn check_domain(&self, resolver: &TokioAsyncResolver, domain: &str) -> DomainCheck {
        // fully qualified, so search domains are never appended
        let fqdn = format!("{}.", domain);
        let lookup = resolver.mx_lookup(fqdn.as_str());
        match tokio::time::timeout(self.dns_timeout, lookup).await {
            Ok(Ok(records)) => classify_answer(records.iter().count()),
            Ok(Err(e)) => {
                let check = classify_error(&e);
                tracing::debug!(domain = %domain, error = %e, ?check, "MX lookup failed");
                check
            }
            Err(_) => DomainCheck::Unknown,
        }
    }
}
