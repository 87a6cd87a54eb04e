//! Per-kind matching of candidate names against normalized constraints
//!
//! Candidate names are parsed from untrusted input into a [`CandidateName`] before any comparison
//! takes place. Parsing is fallible (see [`CandidateError`]) but matching is total: a constraint
//! and candidate of different kinds simply do not match.

use core::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use url::{Host, Url};

use crate::policy::constraint::*;
use crate::policy::mailbox::parse_rfc2821_mailbox;
use crate::policy::normalize::{domain_to_reverse_labels, to_ascii};

/// `CandidateError` describes why a requested identifier could not be turned into a
/// [`CandidateName`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateError {
    /// The identifier is a literal wildcard DNS name and such names are not allowed
    DisallowedWildcard,
    /// The identifier cannot be parsed as a name of its kind
    Malformed(String),
}

impl fmt::Display for CandidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateError::DisallowedWildcard => write!(f, "literal wildcard names are not allowed"),
            CandidateError::Malformed(detail) => write!(f, "{}", detail),
        }
    }
}

/// `CandidateName` is a parsed candidate identifier, ready for comparison. Domain labels are ASCII,
/// lowercase and ordered top level domain first.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CandidateName {
    /// DNS name; a literal wildcard name is held without its `*.` prefix
    Dns(Vec<String>),
    /// IP address as presented
    Ip(IpAddr),
    /// Mailbox with the local part as presented and the labels of the ASCII domain
    Email {
        /// local part of the mailbox, unquoted
        local: String,
        /// reversed labels of the domain of the mailbox
        labels: Vec<String>,
    },
    /// Reversed labels of the host of a URI
    Uri(Vec<String>),
    /// SSH principal
    Principal(String),
}

fn owned_labels(labels: Vec<&str>) -> Vec<String> {
    labels.into_iter().map(|l| l.to_string()).collect()
}

fn ascii_labels(domain: &str) -> Option<Vec<String>> {
    let ascii = to_ascii(domain)?;
    Some(owned_labels(domain_to_reverse_labels(&ascii)?))
}

impl CandidateName {
    /// `parse_dns` parses a requested DNS name. A name that begins with `*.` is refused unless
    /// `allow_literal_wildcard` is true, in which case the prefix is stripped and the remainder is
    /// parsed as an ordinary DNS name.
    pub fn parse_dns(raw: &str, allow_literal_wildcard: bool) -> Result<Self, CandidateError> {
        let domain = match raw.strip_prefix("*.") {
            Some(_) if !allow_literal_wildcard => return Err(CandidateError::DisallowedWildcard),
            Some(rest) => rest,
            None => raw,
        };
        let labels = match ascii_labels(domain) {
            Some(labels) => labels,
            None => {
                return Err(CandidateError::Malformed(format!(
                    "cannot parse DNS name {:?}",
                    raw
                )))
            }
        };
        Ok(CandidateName::Dns(labels))
    }

    /// `parse_ip` parses a requested IP address.
    pub fn parse_ip(raw: &str) -> Result<Self, CandidateError> {
        match IpAddr::from_str(raw) {
            Ok(ip) => Ok(CandidateName::Ip(ip)),
            Err(_) => Err(CandidateError::Malformed(format!(
                "cannot parse IP address {:?}",
                raw
            ))),
        }
    }

    /// `parse_email` parses a requested email address as an RFC 2821 mailbox.
    pub fn parse_email(raw: &str) -> Result<Self, CandidateError> {
        let mailbox = match parse_rfc2821_mailbox(raw) {
            Some(mailbox) => mailbox,
            None => {
                return Err(CandidateError::Malformed(format!(
                    "cannot parse email address {:?}",
                    raw
                )))
            }
        };
        match ascii_labels(&mailbox.domain) {
            Some(labels) => Ok(CandidateName::Email {
                local: mailbox.local,
                labels,
            }),
            None => Err(CandidateError::Malformed(format!(
                "cannot parse domain of email address {:?}",
                raw
            ))),
        }
    }

    /// `parse_uri` parses a requested URI and extracts its host, which must be a domain name.
    pub fn parse_uri(raw: &str) -> Result<Self, CandidateError> {
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                return Err(CandidateError::Malformed(format!(
                    "cannot parse URI {:?}: {}",
                    raw, e
                )))
            }
        };
        let host = match url.host() {
            Some(Host::Domain(host)) if IpAddr::from_str(host).is_err() => host,
            Some(Host::Domain(_)) | Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => {
                return Err(CandidateError::Malformed(format!(
                    "URI {:?} has an IP address host",
                    raw
                )))
            }
            None => {
                return Err(CandidateError::Malformed(format!(
                    "URI {:?} has no host",
                    raw
                )))
            }
        };
        match ascii_labels(host) {
            Some(labels) => Ok(CandidateName::Uri(labels)),
            None => Err(CandidateError::Malformed(format!(
                "cannot parse host of URI {:?}",
                raw
            ))),
        }
    }

    /// `parse_principal` accepts any principal verbatim.
    pub fn parse_principal(raw: &str) -> Result<Self, CandidateError> {
        Ok(CandidateName::Principal(raw.to_string()))
    }

    /// `parse` dispatches to the parser for the indicated kind.
    pub fn parse(
        kind: ConstraintKind,
        raw: &str,
        allow_literal_wildcard: bool,
    ) -> Result<Self, CandidateError> {
        match kind {
            ConstraintKind::Dns => Self::parse_dns(raw, allow_literal_wildcard),
            ConstraintKind::Ip => Self::parse_ip(raw),
            ConstraintKind::Email => Self::parse_email(raw),
            ConstraintKind::Uri => Self::parse_uri(raw),
            ConstraintKind::Principal => Self::parse_principal(raw),
        }
    }

    /// `kind` returns the kind of constraint that governs the candidate.
    pub fn kind(&self) -> ConstraintKind {
        match self {
            CandidateName::Dns(_) => ConstraintKind::Dns,
            CandidateName::Ip(_) => ConstraintKind::Ip,
            CandidateName::Email { .. } => ConstraintKind::Email,
            CandidateName::Uri(_) => ConstraintKind::Uri,
            CandidateName::Principal(_) => ConstraintKind::Principal,
        }
    }
}

/// `domain_matches` compares the reversed labels of a candidate with a domain constraint. The
/// candidate matches when it has more labels than the constraint, or the same number of labels and
/// the constraint is not subdomain only, and every constraint label equals the corresponding
/// candidate label.
fn domain_matches(constraint: &DomainConstraint, candidate: &[String]) -> bool {
    let count = constraint.label_count();
    if candidate.len() < count || (candidate.len() == count && constraint.subdomain_only) {
        return false;
    }

    constraint
        .reverse_labels()
        .zip(candidate.iter())
        .all(|(c, l)| l.eq_ignore_ascii_case(c))
}

/// `network_contains` returns true if the address falls within the network. Networks and addresses
/// of different families never match, except that an IPv4-mapped IPv6 address also matches the
/// IPv4 network containing the address it maps.
fn network_contains(network: &IpNetwork, ip: &IpAddr) -> bool {
    if network.contains(*ip) {
        return true;
    }
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or(false, |v4| network.contains(IpAddr::V4(v4))),
        IpAddr::V4(_) => false,
    }
}

/// `email_matches` applies RFC 5280 section 7.5: a full mailbox constraint requires the same local
/// part and the same domain, a domain constraint matches mailboxes at the domain or any subdomain.
fn email_matches(constraint: &EmailConstraint, local: &str, labels: &[String]) -> bool {
    match &constraint.local_part {
        Some(local_part) => {
            local_part == local
                && labels.len() == constraint.domain.label_count()
                && domain_matches(&constraint.domain, labels)
        }
        None => domain_matches(&constraint.domain, labels),
    }
}

/// `matches` returns true if the candidate satisfies the constraint.
pub fn matches(constraint: &Constraint, candidate: &CandidateName) -> bool {
    match (constraint, candidate) {
        (Constraint::Domain(c), CandidateName::Dns(labels)) => domain_matches(c, labels),
        (Constraint::Network(n), CandidateName::Ip(ip)) => network_contains(n, ip),
        (Constraint::Email(c), CandidateName::Email { local, labels }) => {
            email_matches(c, local, labels)
        }
        (Constraint::UriDomain(c), CandidateName::Uri(labels)) => domain_matches(c, labels),
        (Constraint::Principal(p), CandidateName::Principal(s)) => p == s,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::normalize::*;

    fn dns(raw: &str) -> CandidateName {
        CandidateName::parse_dns(raw, true).unwrap()
    }

    #[test]
    fn domain_matching() {
        let apex = normalize_dns_domain("example.com").unwrap();
        assert!(matches(&apex, &dns("example.com")));
        assert!(matches(&apex, &dns("www.example.com")));
        assert!(matches(&apex, &dns("a.b.EXAMPLE.com")));
        assert!(!matches(&apex, &dns("evil.com")));
        assert!(!matches(&apex, &dns("notexample.com")));
        assert!(!matches(&apex, &dns("com")));

        let subs = normalize_dns_domain("*.example.com").unwrap();
        assert!(!matches(&subs, &dns("example.com")));
        assert!(matches(&subs, &dns("api.example.com")));
        assert!(matches(&subs, &dns("x.api.example.com")));
    }

    #[test]
    fn wildcard_candidates() {
        let wildcard = dns("*.example.com");
        assert_eq!(
            CandidateName::Dns(vec!["com".into(), "example".into()]),
            wildcard
        );
        assert_eq!(dns("example.com"), wildcard);

        // the stripped name is the apex, which a subdomain only constraint never covers
        let subs = normalize_dns_domain("*.example.com").unwrap();
        assert!(!matches(&subs, &wildcard));
        assert!(matches(&normalize_dns_domain("example.com").unwrap(), &wildcard));
        assert!(!matches(
            &normalize_dns_domain("www.example.com").unwrap(),
            &wildcard
        ));
        assert!(matches(
            &normalize_dns_domain("secret.example.com").unwrap(),
            &dns("*.secret.example.com")
        ));

        assert_eq!(
            Err(CandidateError::DisallowedWildcard),
            CandidateName::parse_dns("*.example.com", false)
        );
        assert!(matches!(
            CandidateName::parse_dns("www.*.example.com", true),
            Err(CandidateError::Malformed(_))
        ));
        assert!(matches!(
            CandidateName::parse_dns("*.*.example.com", true),
            Err(CandidateError::Malformed(_))
        ));
    }

    #[test]
    fn network_matching() {
        let net = normalize_cidr("10.0.0.0/8").unwrap();
        let ip = |s: &str| CandidateName::parse_ip(s).unwrap();
        assert!(matches(&net, &ip("10.0.0.0")));
        assert!(matches(&net, &ip("10.255.255.255")));
        assert!(!matches(&net, &ip("11.0.0.0")));
        assert!(!matches(&net, &ip("9.255.255.255")));
        assert!(matches(&net, &ip("::ffff:10.1.2.3")));
        assert!(!matches(&net, &ip("::ffff:11.1.2.3")));
        assert!(!matches(&net, &ip("2001:db8::1")));
        assert_eq!(
            CandidateName::Ip("::ffff:10.1.2.3".parse().unwrap()),
            ip("::ffff:10.1.2.3")
        );

        // mapped addresses stay reachable by the IPv6 mapped range
        let mapped = normalize_cidr("::ffff:0:0/96").unwrap();
        assert!(matches(&mapped, &ip("::ffff:10.1.2.3")));
        assert!(!matches(&mapped, &ip("10.1.2.3")));
        assert!(!matches(&mapped, &ip("2001:db8::1")));

        let v6 = normalize_cidr("2001:db8::/32").unwrap();
        assert!(matches(&v6, &ip("2001:db8:ffff::1")));
        assert!(!matches(&v6, &ip("2001:db9::")));
        assert!(!matches(&v6, &ip("10.0.0.1")));

        let host = normalize_ip_or_cidr("192.168.1.1").unwrap();
        assert!(matches(&host, &ip("192.168.1.1")));
        assert!(!matches(&host, &ip("192.168.1.2")));
        assert!(CandidateName::parse_ip("10.0.0.256").is_err());
    }

    #[test]
    fn email_matching() {
        let domain = normalize_email_address("@example.com").unwrap();
        let mailbox = normalize_email_address("alice@example.com").unwrap();
        let email = |s: &str| CandidateName::parse_email(s).unwrap();

        assert!(matches(&domain, &email("alice@example.com")));
        assert!(matches(&domain, &email("bob@sub.example.com")));
        assert!(!matches(&domain, &email("alice@example.org")));

        assert!(matches(&mailbox, &email("alice@example.com")));
        assert!(matches(&mailbox, &email("alice@EXAMPLE.com")));
        assert!(!matches(&mailbox, &email("Alice@example.com")));
        assert!(!matches(&mailbox, &email("bob@example.com")));
        assert!(!matches(&mailbox, &email("alice@sub.example.com")));

        assert!(CandidateName::parse_email("alice").is_err());
        assert!(CandidateName::parse_email("alice@exa mple.com").is_err());
    }

    #[test]
    fn uri_matching() {
        let c = normalize_uri_domain("example.com").unwrap();
        let uri = |s: &str| CandidateName::parse_uri(s).unwrap();
        assert!(matches(&c, &uri("https://example.com/path")));
        assert!(matches(&c, &uri("https://www.example.com:8443/")));
        assert!(matches(&c, &uri("spiffe://example.com/workload")));
        assert!(!matches(&c, &uri("https://example.org")));

        assert!(CandidateName::parse_uri("https://10.0.0.1/").is_err());
        assert!(CandidateName::parse_uri("https://[2001:db8::1]/").is_err());
        assert!(CandidateName::parse_uri("urn:example:thing").is_err());
        assert!(CandidateName::parse_uri("not a uri").is_err());
    }

    #[test]
    fn principal_and_cross_kind_matching() {
        let p = normalize_principal("root").unwrap();
        assert!(matches(&p, &CandidateName::Principal("root".to_string())));
        assert!(!matches(&p, &CandidateName::Principal("Root".to_string())));
        assert!(!matches(&p, &dns("root")));

        let d = normalize_dns_domain("example.com").unwrap();
        assert!(!matches(&d, &CandidateName::parse_uri("https://example.com").unwrap()));
        assert_eq!(ConstraintKind::Uri, CandidateName::parse_uri("https://a.b").unwrap().kind());
    }
}
