//! Normalization of raw constraint values into [`Constraint`] instances
//!
//! Every function in this module is pure: the raw value is trimmed, lowercased (where the kind is
//! case-insensitive), validated and converted into a comparable form or rejected with an
//! [`Error::InvalidConstraint`] naming the rule that was violated.

use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use crate::policy::constraint::*;
use crate::policy::mailbox::parse_rfc2821_mailbox;
use crate::{ConstraintViolation, Error, Result};

fn invalid(kind: ConstraintKind, raw: &str, violation: ConstraintViolation) -> Error {
    Error::InvalidConstraint {
        kind,
        raw: raw.to_string(),
        violation,
    }
}

/// `to_ascii` converts a domain to its ASCII form per UTS 46 with STD3 rules and DNS length
/// checks applied. The result is lowercase.
pub(crate) fn to_ascii(domain: &str) -> Option<String> {
    idna::domain_to_ascii_strict(domain).ok()
}

/// `domain_to_reverse_labels` splits an ASCII domain into labels, top level domain first. None is
/// returned for an empty domain, an empty label (including a trailing period) or a label that
/// contains a character outside the printable ASCII range.
pub fn domain_to_reverse_labels(domain: &str) -> Option<Vec<&str>> {
    if domain.is_empty() {
        return None;
    }
    let labels: Vec<&str> = domain.rsplit('.').collect();
    for label in &labels {
        if label.is_empty() || label.bytes().any(|c| !(33..=126).contains(&c)) {
            return None;
        }
    }
    Some(labels)
}

/// `strip_subdomain_marker` removes a leading `*.` or `.` and indicates whether one was present.
fn strip_subdomain_marker(value: &str) -> (&str, bool) {
    if let Some(rest) = value.strip_prefix("*.") {
        (rest, true)
    } else if let Some(rest) = value.strip_prefix('.') {
        (rest, true)
    } else {
        (value, false)
    }
}

/// `ascii_domain` converts the domain to ASCII then confirms it can be split into labels.
fn ascii_domain(kind: ConstraintKind, raw: &str, domain: &str) -> Result<String> {
    let ascii = match to_ascii(domain) {
        Some(ascii) => ascii,
        None => return Err(invalid(kind, raw, ConstraintViolation::IdnaConversion)),
    };
    if domain_to_reverse_labels(&ascii).is_none() {
        return Err(invalid(kind, raw, ConstraintViolation::UnparseableDomain));
    }
    Ok(ascii)
}

/// `normalize_dns_domain` normalizes a DNS domain constraint. A leading `*.` (or `.`) yields a
/// constraint that matches proper subdomains only.
pub fn normalize_dns_domain(raw: &str) -> Result<Constraint> {
    let kind = ConstraintKind::Dns;
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(invalid(kind, raw, ConstraintViolation::Empty));
    }
    if value.contains("..") {
        return Err(invalid(kind, raw, ConstraintViolation::EmptyLabel));
    }
    if value.starts_with('*') && !value.starts_with("*.") {
        return Err(invalid(kind, raw, ConstraintViolation::IllegalWildcard));
    }
    if matches!(value.rfind('*'), Some(pos) if pos > 0) {
        return Err(invalid(kind, raw, ConstraintViolation::IllegalWildcard));
    }

    let (domain, subdomain_only) = strip_subdomain_marker(&value);
    let domain = ascii_domain(kind, raw, domain)?;
    Ok(Constraint::Domain(DomainConstraint {
        domain,
        subdomain_only,
    }))
}

/// `normalize_email_address` normalizes an email constraint, which is either a full mailbox
/// (`local@domain`) or a domain (`domain` or `@domain`) that covers all mailboxes at the domain and
/// its subdomains. Per RFC 5280 section 7.5, the local part is retained as written while the domain
/// is converted to ASCII.
pub fn normalize_email_address(raw: &str) -> Result<Constraint> {
    let kind = ConstraintKind::Email;
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(invalid(kind, raw, ConstraintViolation::Empty));
    }
    if value.contains('*') {
        return Err(invalid(kind, raw, ConstraintViolation::IllegalWildcard));
    }
    if value.matches('@').count() > 1 {
        return Err(invalid(kind, raw, ConstraintViolation::TooManyAtSigns));
    }

    let value = value.strip_prefix('@').unwrap_or(&value);
    if value.is_empty() {
        return Err(invalid(kind, raw, ConstraintViolation::Empty));
    }
    if value.starts_with('.') {
        return Err(invalid(kind, raw, ConstraintViolation::LeadingPeriod));
    }

    let (local_part, domain) = if value.contains('@') {
        let mailbox = match parse_rfc2821_mailbox(value) {
            Some(mailbox) => mailbox,
            None => return Err(invalid(kind, raw, ConstraintViolation::UnparseableMailbox)),
        };
        (Some(mailbox.local), ascii_domain(kind, raw, &mailbox.domain)?)
    } else {
        (None, ascii_domain(kind, raw, value)?)
    };

    Ok(Constraint::Email(EmailConstraint {
        local_part,
        domain: DomainConstraint {
            domain,
            subdomain_only: false,
        },
    }))
}

/// `normalize_uri_domain` normalizes a constraint on the host portion of URIs. IP literals,
/// bracketed hosts and ports are rejected.
pub fn normalize_uri_domain(raw: &str) -> Result<Constraint> {
    let kind = ConstraintKind::Uri;
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(invalid(kind, raw, ConstraintViolation::Empty));
    }
    if value.contains("..") {
        return Err(invalid(kind, raw, ConstraintViolation::EmptyLabel));
    }

    let (domain, subdomain_only) = strip_subdomain_marker(&value);
    if domain.contains('*') {
        return Err(invalid(kind, raw, ConstraintViolation::IllegalWildcard));
    }
    if domain.contains('[') || domain.contains(']') {
        return Err(invalid(kind, raw, ConstraintViolation::SquareBrackets));
    }
    if domain.matches(':').count() == 1 {
        return Err(invalid(kind, raw, ConstraintViolation::PortNotAllowed));
    }
    if IpAddr::from_str(domain).is_ok() {
        return Err(invalid(kind, raw, ConstraintViolation::IpLiteral));
    }

    let domain = ascii_domain(kind, raw, domain)?;
    Ok(Constraint::UriDomain(DomainConstraint {
        domain,
        subdomain_only,
    }))
}

/// `canonical_network` returns the network with host bits cleared, i.e., 10.1.2.3/8 becomes
/// 10.0.0.0/8.
pub fn canonical_network(network: IpNetwork) -> IpNetwork {
    IpNetwork::new(network.network(), network.prefix()).unwrap_or(network)
}

/// `normalize_ip_range` returns a constraint for an already parsed network.
pub fn normalize_ip_range(network: IpNetwork) -> Constraint {
    Constraint::Network(canonical_network(network))
}

/// `normalize_ip` returns a constraint that matches a single address, i.e., a /32 for IPv4 or a
/// /128 for IPv6.
pub fn normalize_ip(ip: IpAddr) -> Constraint {
    Constraint::Network(IpNetwork::from(ip))
}

/// `normalize_cidr` parses a value that must be in CIDR notation.
pub fn normalize_cidr(raw: &str) -> Result<Constraint> {
    if !raw.contains('/') {
        return Err(invalid(ConstraintKind::Ip, raw, ConstraintViolation::InvalidCidr));
    }
    match IpNetwork::from_str(raw) {
        Ok(network) => Ok(normalize_ip_range(network)),
        Err(_) => Err(invalid(ConstraintKind::Ip, raw, ConstraintViolation::InvalidCidr)),
    }
}

/// `normalize_ip_or_cidr` parses a value that is either in CIDR notation or a bare IP address,
/// which is widened to a host prefix.
pub fn normalize_ip_or_cidr(raw: &str) -> Result<Constraint> {
    if let Ok(ip) = IpAddr::from_str(raw) {
        return Ok(normalize_ip(ip));
    }
    match normalize_cidr(raw) {
        Ok(constraint) => Ok(constraint),
        Err(_) => Err(invalid(
            ConstraintKind::Ip,
            raw,
            ConstraintViolation::InvalidIpOrCidr,
        )),
    }
}

/// `normalize_principal` accepts SSH principals verbatim. Principals have no hierarchical structure
/// and are compared exactly, so no case folding or trimming is applied.
pub fn normalize_principal(raw: &str) -> Result<Constraint> {
    Ok(Constraint::Principal(raw.to_string()))
}

/// `normalize` dispatches to the normalizer for the indicated kind. IP constraints accept either a
/// CIDR or a bare IP address.
pub fn normalize(kind: ConstraintKind, raw: &str) -> Result<Constraint> {
    match kind {
        ConstraintKind::Dns => normalize_dns_domain(raw),
        ConstraintKind::Ip => normalize_ip_or_cidr(raw),
        ConstraintKind::Email => normalize_email_address(raw),
        ConstraintKind::Uri => normalize_uri_domain(raw),
        ConstraintKind::Principal => normalize_principal(raw),
    }
}
