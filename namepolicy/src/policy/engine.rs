//! Configuration of name policy engines
//!
//! A [`NamePolicyEngine`] is assembled by applying a sequence of operations to a
//! [`NamePolicyEngineBuilder`]. Each operation normalizes all of its inputs before touching the
//! builder, so a failing operation leaves the builder as it was. Once built, an engine is never
//! modified; reconfiguration means building a new engine and swapping it in.

use std::net::IpAddr;

use ipnetwork::IpNetwork;

use policyprocmacros::*;

use crate::policy::constraint::*;
use crate::policy::normalize::*;
use crate::util::logging::*;
use crate::Result;

/// `logged` logs a normalization failure at error level and passes the result through.
fn logged(result: Result<Constraint>) -> Result<Constraint> {
    if let Err(e) = &result {
        log_message(&PolicyLogLevels::PolicyError, &format!("{}", e));
    }
    result
}

/// `normalize_all` normalizes every value, stopping at the first failure.
fn normalize_all<S: AsRef<str>>(
    values: &[S],
    normalizer: fn(&str) -> Result<Constraint>,
) -> Result<Vec<Constraint>> {
    let mut normalized = Vec::with_capacity(values.len());
    for value in values {
        normalized.push(logged(normalizer(value.as_ref()))?);
    }
    Ok(normalized)
}

/// `NamePolicyEngineBuilder` accumulates permitted and excluded constraints and the policy flags
/// prior to construction of a [`NamePolicyEngine`].
///
/// ```
/// use namepolicy::NamePolicyEngineBuilder;
///
/// let mut builder = NamePolicyEngineBuilder::default();
/// builder.set_permitted_dns_domains(&["example.com", "*.example.net"]).unwrap();
/// builder.add_excluded_dns_domain("internal.example.com").unwrap();
/// assert!(builder.add_excluded_dns_domain("www..example.com").is_err());
/// let engine = builder.build();
/// assert_eq!(2, engine.permitted().dns_domains.len());
/// assert_eq!(1, engine.excluded().dns_domains.len());
/// ```
#[derive(Clone, Debug, Default)]
pub struct NamePolicyEngineBuilder {
    permitted: ConstraintSet,
    excluded: ConstraintSet,
    verify_subject_common_name: bool,
    allow_literal_wildcard_names: bool,
}

impl NamePolicyEngineBuilder {
    npe_sets_and_adds!(permitted, dns_domains, dns_domain, normalize_dns_domain);
    npe_sets_and_adds!(excluded, dns_domains, dns_domain, normalize_dns_domain);
    npe_sets_and_adds!(permitted, ip_ranges, cidr, normalize_cidr);
    npe_sets_and_adds!(excluded, ip_ranges, cidr, normalize_cidr);
    npe_sets_and_adds!(permitted, ip_ranges, ip_or_cidr, normalize_ip_or_cidr);
    npe_sets_and_adds!(excluded, ip_ranges, ip_or_cidr, normalize_ip_or_cidr);
    npe_sets_and_adds!(permitted, email_addresses, email_address, normalize_email_address);
    npe_sets_and_adds!(excluded, email_addresses, email_address, normalize_email_address);
    npe_sets_and_adds!(permitted, uri_domains, uri_domain, normalize_uri_domain);
    npe_sets_and_adds!(excluded, uri_domains, uri_domain, normalize_uri_domain);
    npe_sets_and_adds!(permitted, principals, principal, normalize_principal);
    npe_sets_and_adds!(excluded, principals, principal, normalize_principal);
}

impl NamePolicyEngineBuilder {
    /// `set_permitted_ip_ranges` replaces the permitted IP ranges with the given networks
    pub fn set_permitted_ip_ranges(&mut self, networks: &[IpNetwork]) {
        self.permitted.ip_ranges = networks.iter().map(|n| normalize_ip_range(*n)).collect();
    }

    /// `add_permitted_ip_ranges` appends the given networks to the permitted IP ranges
    pub fn add_permitted_ip_ranges(&mut self, networks: &[IpNetwork]) {
        self.permitted
            .ip_ranges
            .extend(networks.iter().map(|n| normalize_ip_range(*n)));
    }

    /// `set_excluded_ip_ranges` replaces the excluded IP ranges with the given networks
    pub fn set_excluded_ip_ranges(&mut self, networks: &[IpNetwork]) {
        self.excluded.ip_ranges = networks.iter().map(|n| normalize_ip_range(*n)).collect();
    }

    /// `add_excluded_ip_ranges` appends the given networks to the excluded IP ranges
    pub fn add_excluded_ip_ranges(&mut self, networks: &[IpNetwork]) {
        self.excluded
            .ip_ranges
            .extend(networks.iter().map(|n| normalize_ip_range(*n)));
    }

    /// `set_permitted_ip` replaces the permitted IP ranges with a single host address
    pub fn set_permitted_ip(&mut self, ip: IpAddr) {
        self.permitted.ip_ranges = vec![normalize_ip(ip)];
    }

    /// `add_permitted_ip` appends a single host address to the permitted IP ranges
    pub fn add_permitted_ip(&mut self, ip: IpAddr) {
        self.permitted.ip_ranges.push(normalize_ip(ip));
    }

    /// `set_excluded_ip` replaces the excluded IP ranges with a single host address
    pub fn set_excluded_ip(&mut self, ip: IpAddr) {
        self.excluded.ip_ranges = vec![normalize_ip(ip)];
    }

    /// `add_excluded_ip` appends a single host address to the excluded IP ranges
    pub fn add_excluded_ip(&mut self, ip: IpAddr) {
        self.excluded.ip_ranges.push(normalize_ip(ip));
    }

    /// `with_subject_common_name_verification` causes the subject common name to be evaluated as an
    /// additional identifier.
    pub fn with_subject_common_name_verification(&mut self) -> &mut Self {
        self.verify_subject_common_name = true;
        self
    }

    /// `with_allow_literal_wildcard_names` permits requested DNS names that begin with `*.`.
    pub fn with_allow_literal_wildcard_names(&mut self) -> &mut Self {
        self.allow_literal_wildcard_names = true;
        self
    }

    /// `permitted` returns the permitted constraints accumulated so far.
    pub fn permitted(&self) -> &ConstraintSet {
        &self.permitted
    }

    /// `excluded` returns the excluded constraints accumulated so far.
    pub fn excluded(&self) -> &ConstraintSet {
        &self.excluded
    }

    /// `build` produces an immutable engine from the current state of the builder.
    pub fn build(&self) -> NamePolicyEngine {
        log_message(
            &PolicyLogLevels::PolicyDebug,
            &format!(
                "Built name policy engine with {} permitted and {} excluded constraints",
                self.permitted.len(),
                self.excluded.len()
            ),
        );
        NamePolicyEngine {
            permitted: self.permitted.clone(),
            excluded: self.excluded.clone(),
            verify_subject_common_name: self.verify_subject_common_name,
            allow_literal_wildcard_names: self.allow_literal_wildcard_names,
        }
    }
}

/// `NamePolicyEngine` holds normalized permitted and excluded constraints for each kind of name
/// plus the flags that govern evaluation. The default engine has no constraints and allows every
/// well-formed identifier other than literal wildcard names.
///
/// Engines are immutable and may be shared freely across threads, i.e., via an `Arc`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NamePolicyEngine {
    pub(crate) permitted: ConstraintSet,
    pub(crate) excluded: ConstraintSet,
    pub(crate) verify_subject_common_name: bool,
    pub(crate) allow_literal_wildcard_names: bool,
}

impl NamePolicyEngine {
    /// `builder` returns an empty builder.
    pub fn builder() -> NamePolicyEngineBuilder {
        NamePolicyEngineBuilder::default()
    }

    /// `permitted` returns the permitted constraints.
    pub fn permitted(&self) -> &ConstraintSet {
        &self.permitted
    }

    /// `excluded` returns the excluded constraints.
    pub fn excluded(&self) -> &ConstraintSet {
        &self.excluded
    }

    /// `verify_subject_common_name` returns true if the subject common name is evaluated.
    pub fn verify_subject_common_name(&self) -> bool {
        self.verify_subject_common_name
    }

    /// `allow_literal_wildcard_names` returns true if requested DNS names may begin with `*.`.
    pub fn allow_literal_wildcard_names(&self) -> bool {
        self.allow_literal_wildcard_names
    }

    /// `is_empty` returns true if the engine has no constraints of any kind.
    pub fn is_empty(&self) -> bool {
        self.permitted.is_empty() && self.excluded.is_empty()
    }
}

#[test]
fn builder_operations_test() {
    let mut b = NamePolicyEngineBuilder::default();
    b.set_permitted_dns_domains(&["example.com", "*.example.net"])
        .unwrap();
    b.add_permitted_dns_domain("example.org").unwrap();
    assert_eq!(3, b.permitted().dns_domains.len());
    b.set_permitted_dns_domain("only.example").unwrap();
    assert_eq!(1, b.permitted().dns_domains.len());

    b.set_excluded_cidrs(&["10.0.0.0/8"]).unwrap();
    b.add_excluded_ip_or_cidrs(&["192.168.1.1", "2001:db8::/32"])
        .unwrap();
    b.add_excluded_ip("172.16.0.1".parse().unwrap());
    b.add_excluded_ip_ranges(&["100.64.1.0/10".parse().unwrap()]);
    assert_eq!(
        vec![
            "10.0.0.0/8",
            "192.168.1.1/32",
            "2001:db8::/32",
            "172.16.0.1/32",
            "100.64.0.0/10"
        ],
        b.excluded()
            .ip_ranges
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<String>>()
    );

    b.add_permitted_email_addresses(&["@example.com", "alice@example.org"])
        .unwrap();
    b.add_excluded_uri_domain("*.internal.example.com").unwrap();
    b.set_permitted_principals(&["root", "ops"]).unwrap();
    b.with_subject_common_name_verification()
        .with_allow_literal_wildcard_names();

    let engine = b.build();
    assert_eq!(2, engine.permitted().email_addresses.len());
    assert_eq!(1, engine.excluded().uri_domains.len());
    assert_eq!(2, engine.permitted().principals.len());
    assert!(engine.verify_subject_common_name());
    assert!(engine.allow_literal_wildcard_names());
    assert!(!engine.is_empty());
    assert!(NamePolicyEngine::default().is_empty());
}

#[test]
fn failed_operations_leave_builder_unchanged_test() {
    let mut b = NamePolicyEngine::builder();
    b.set_permitted_dns_domains(&["example.com"]).unwrap();

    assert!(b
        .set_permitted_dns_domains(&["good.example", "bad..example"])
        .is_err());
    assert!(b
        .add_permitted_dns_domains(&["good.example", "*bad.example"])
        .is_err());
    assert!(b.set_permitted_dns_domain("").is_err());
    assert_eq!(
        vec![normalize_dns_domain("example.com").unwrap()],
        b.permitted().dns_domains
    );

    assert!(b.set_excluded_cidrs(&["10.0.0.0/8", "10.0.0.1"]).is_err());
    assert!(b.add_permitted_uri_domains(&["example.com:443"]).is_err());
    assert!(b.add_permitted_email_address("a@b@example.com").is_err());
    assert!(b.excluded().is_empty());
    assert_eq!(1, b.permitted().len());
}

#[test]
fn engine_is_send_and_sync_test() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NamePolicyEngine>();
}
