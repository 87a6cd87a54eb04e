//! Structures that hold normalized name constraints

use core::fmt;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// `ConstraintKind` identifies the name form governed by a constraint, and the kind of a candidate
/// identifier presented for evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// DNS names, matched by domain suffix
    Dns,
    /// IP addresses, matched by network containment
    Ip,
    /// RFC 822 email addresses, matched per RFC 5280 section 7.5
    Email,
    /// URIs, matched by the domain suffix of the authority
    Uri,
    /// SSH principals, matched exactly
    Principal,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Dns => write!(f, "DNS"),
            ConstraintKind::Ip => write!(f, "IP"),
            ConstraintKind::Email => write!(f, "email"),
            ConstraintKind::Uri => write!(f, "URI"),
            ConstraintKind::Principal => write!(f, "principal"),
        }
    }
}

/// `DomainConstraint` is an ASCII domain (post IDNA conversion) with an indication of whether the
/// domain itself is matched or only its proper subdomains.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DomainConstraint {
    /// Lowercase ASCII domain without any leading wildcard or period
    pub domain: String,
    /// subdomain_only is true when the constraint was expressed as `*.domain`
    pub subdomain_only: bool,
}

impl DomainConstraint {
    /// `reverse_labels` returns the labels of the domain starting with the top level domain.
    pub fn reverse_labels(&self) -> impl Iterator<Item = &str> {
        self.domain.rsplit('.')
    }

    /// `label_count` returns the number of labels in the domain.
    pub fn label_count(&self) -> usize {
        self.domain.split('.').count()
    }
}

impl fmt::Display for DomainConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subdomain_only {
            write!(f, "*.{}", self.domain)
        } else {
            write!(f, "{}", self.domain)
        }
    }
}

/// `EmailConstraint` either names a full mailbox (local part present) or all mailboxes at a domain
/// and its subdomains (local part absent).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct EmailConstraint {
    /// Case-sensitive local part, present only for full mailbox constraints
    pub local_part: Option<String>,
    /// Domain of the mailbox
    pub domain: DomainConstraint,
}

impl fmt::Display for EmailConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local_part {
            Some(local) if is_dot_atom(local) => write!(f, "{}@{}", local, self.domain),
            Some(local) => {
                write!(f, "\"")?;
                for c in local.chars() {
                    if c == '"' || c == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, "\"@{}", self.domain)
            }
            None => write!(f, "@{}", self.domain),
        }
    }
}

/// `is_dot_atom` returns true if the local part can be written without quoting.
fn is_dot_atom(local: &str) -> bool {
    !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local.chars().all(|c| {
            c.is_ascii_alphanumeric() || c == '.' || "!#$%&'*+-/=?^_`{|}~".contains(c)
        })
}

/// `Constraint` is a normalized constraint of any kind. Values of this type are only produced by the
/// functions in the [`normalize`](crate::policy::normalize) module.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Constraint {
    /// DNS domain constraint
    Domain(DomainConstraint),
    /// IP network constraint; host addresses are represented as /32 or /128 networks
    Network(IpNetwork),
    /// Email constraint
    Email(EmailConstraint),
    /// URI domain constraint
    UriDomain(DomainConstraint),
    /// SSH principal constraint
    Principal(String),
}

impl Constraint {
    /// `kind` returns the name form governed by the constraint.
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Domain(_) => ConstraintKind::Dns,
            Constraint::Network(_) => ConstraintKind::Ip,
            Constraint::Email(_) => ConstraintKind::Email,
            Constraint::UriDomain(_) => ConstraintKind::Uri,
            Constraint::Principal(_) => ConstraintKind::Principal,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Domain(d) => write!(f, "{}", d),
            Constraint::Network(n) => write!(f, "{}", n),
            Constraint::Email(e) => write!(f, "{}", e),
            Constraint::UriDomain(d) => write!(f, "{}", d),
            Constraint::Principal(p) => write!(f, "{}", p),
        }
    }
}

/// The `ConstraintSet` structure holds either the permitted or the excluded constraints of a
/// [`NamePolicyEngine`](crate::NamePolicyEngine), with one ordered list per kind.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct ConstraintSet {
    /// dns_domains governs DNS names (and subject common names inferred to be DNS names)
    pub dns_domains: Vec<Constraint>,
    /// ip_ranges governs IP addresses
    pub ip_ranges: Vec<Constraint>,
    /// email_addresses governs email addresses
    pub email_addresses: Vec<Constraint>,
    /// uri_domains governs URIs
    pub uri_domains: Vec<Constraint>,
    /// principals governs SSH principals
    pub principals: Vec<Constraint>,
}

impl ConstraintSet {
    /// `for_kind` returns the constraints of the indicated kind.
    pub fn for_kind(&self, kind: ConstraintKind) -> &[Constraint] {
        match kind {
            ConstraintKind::Dns => &self.dns_domains,
            ConstraintKind::Ip => &self.ip_ranges,
            ConstraintKind::Email => &self.email_addresses,
            ConstraintKind::Uri => &self.uri_domains,
            ConstraintKind::Principal => &self.principals,
        }
    }

    /// `is_empty` returns true if no constraints of any kind are present.
    pub fn is_empty(&self) -> bool {
        self.dns_domains.is_empty()
            && self.ip_ranges.is_empty()
            && self.email_addresses.is_empty()
            && self.uri_domains.is_empty()
            && self.principals.is_empty()
    }

    /// `len` returns the number of constraints across all kinds.
    pub fn len(&self) -> usize {
        self.dns_domains.len()
            + self.ip_ranges.len()
            + self.email_addresses.len()
            + self.uri_domains.len()
            + self.principals.len()
    }
}

#[test]
fn constraint_display_test() {
    let d = DomainConstraint {
        domain: "example.com".to_string(),
        subdomain_only: true,
    };
    assert_eq!("*.example.com", d.to_string());
    assert_eq!(vec!["com", "example"], d.reverse_labels().collect::<Vec<_>>());
    assert_eq!(2, d.label_count());

    let e = EmailConstraint {
        local_part: Some("a b".to_string()),
        domain: DomainConstraint {
            domain: "example.com".to_string(),
            subdomain_only: false,
        },
    };
    assert_eq!("\"a b\"@example.com", e.to_string());

    let e = EmailConstraint {
        local_part: None,
        domain: DomainConstraint {
            domain: "example.com".to_string(),
            subdomain_only: false,
        },
    };
    assert_eq!("@example.com", e.to_string());
    assert_eq!(ConstraintKind::Email, Constraint::Email(e).kind());
}
