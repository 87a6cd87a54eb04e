//! Evaluation of requested identifiers against a [`NamePolicyEngine`]
//!
//! For each identifier, in order:
//! 1. an identifier that cannot be parsed as a name of its kind is denied,
//! 2. an identifier that matches any excluded constraint of its kind is denied,
//! 3. when permitted constraints of its kind exist, an identifier that matches none is denied,
//! 4. otherwise the identifier is allowed.
//!
//! A literal wildcard DNS name, when allowed, is matched with its `*.` prefix stripped. A request is
//! allowed only when every identifier is allowed. The first denial ends evaluation.

use core::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::policy::constraint::*;
use crate::policy::engine::NamePolicyEngine;
use crate::policy::matcher::*;
use crate::util::logging::*;

/// `Identifier` is a requested name paired with the kind of constraint that governs it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identifier {
    /// Kind of name
    pub kind: ConstraintKind,
    /// Name as requested
    pub value: String,
}

impl Identifier {
    /// `new` pairs a value with a kind.
    pub fn new(kind: ConstraintKind, value: impl Into<String>) -> Self {
        Identifier {
            kind,
            value: value.into(),
        }
    }

    /// `dns` returns a DNS name identifier.
    pub fn dns(value: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Dns, value)
    }

    /// `ip` returns an IP address identifier.
    pub fn ip(value: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Ip, value)
    }

    /// `email` returns an email address identifier.
    pub fn email(value: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Email, value)
    }

    /// `uri` returns a URI identifier.
    pub fn uri(value: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Uri, value)
    }

    /// `principal` returns an SSH principal identifier.
    pub fn principal(value: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Principal, value)
    }

    /// `from_common_name` infers the kind of a subject common name from its shape: an IP address,
    /// an email address when it contains `@`, otherwise a DNS name.
    pub fn from_common_name(common_name: &str) -> Self {
        let kind = if IpAddr::from_str(common_name).is_ok() {
            ConstraintKind::Ip
        } else if common_name.contains('@') {
            ConstraintKind::Email
        } else {
            ConstraintKind::Dns
        };
        Self::new(kind, common_name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}

/// `DenyReasonCode` is the machine-distinguishable portion of a [`DenyReason`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DenyReasonCode {
    /// excluded-match
    ExcludedMatch,
    /// no-permitted-match
    NoPermittedMatch,
    /// malformed-identifier
    MalformedIdentifier,
    /// disallowed-wildcard
    DisallowedWildcard,
}

impl fmt::Display for DenyReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReasonCode::ExcludedMatch => write!(f, "excluded-match"),
            DenyReasonCode::NoPermittedMatch => write!(f, "no-permitted-match"),
            DenyReasonCode::MalformedIdentifier => write!(f, "malformed-identifier"),
            DenyReasonCode::DisallowedWildcard => write!(f, "disallowed-wildcard"),
        }
    }
}

/// `DenyReason` explains why an identifier was denied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DenyReason {
    /// The identifier matched the excluded constraint, given in canonical form
    ExcludedMatch(String),
    /// Permitted constraints exist for the kind and none matched
    NoPermittedMatch,
    /// The identifier could not be parsed
    MalformedIdentifier(String),
    /// The identifier is a literal wildcard name and such names are not allowed
    DisallowedWildcard,
}

impl DenyReason {
    /// `code` returns the reason code.
    pub fn code(&self) -> DenyReasonCode {
        match self {
            DenyReason::ExcludedMatch(_) => DenyReasonCode::ExcludedMatch,
            DenyReason::NoPermittedMatch => DenyReasonCode::NoPermittedMatch,
            DenyReason::MalformedIdentifier(_) => DenyReasonCode::MalformedIdentifier,
            DenyReason::DisallowedWildcard => DenyReasonCode::DisallowedWildcard,
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::ExcludedMatch(c) => write!(f, "matches excluded constraint {}", c),
            DenyReason::NoPermittedMatch => write!(f, "matches no permitted constraint"),
            DenyReason::MalformedIdentifier(detail) => write!(f, "{}", detail),
            DenyReason::DisallowedWildcard => write!(f, "literal wildcard names are not allowed"),
        }
    }
}

/// `Denial` names the identifier that caused a request to be denied and why.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Denial {
    /// Kind the identifier was evaluated as
    pub kind: ConstraintKind,
    /// Identifier as requested
    pub identifier: String,
    /// Reason for denial
    pub reason: DenyReason,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} ({})",
            self.reason.code(),
            self.kind,
            self.identifier,
            self.reason
        )
    }
}

/// `Verdict` is the outcome of evaluating an identifier or a whole request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Every identifier is authorized
    Allow,
    /// An identifier is not authorized
    Deny(Denial),
}

impl Verdict {
    /// `is_allowed` returns true for [`Verdict::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// `denial` returns the denial, if any.
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny(denial) => Some(denial),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow => write!(f, "ALLOW"),
            Verdict::Deny(denial) => write!(f, "DENY {}", denial),
        }
    }
}

fn deny(identifier: &Identifier, reason: DenyReason) -> Verdict {
    log_message(
        &PolicyLogLevels::PolicyInfo,
        &format!("Denied {}: {}", identifier, reason),
    );
    Verdict::Deny(Denial {
        kind: identifier.kind,
        identifier: identifier.value.clone(),
        reason,
    })
}

/// `evaluate_identifier` decides whether a single identifier is authorized by the engine.
pub fn evaluate_identifier(engine: &NamePolicyEngine, identifier: &Identifier) -> Verdict {
    let candidate = match CandidateName::parse(
        identifier.kind,
        &identifier.value,
        engine.allow_literal_wildcard_names(),
    ) {
        Ok(candidate) => candidate,
        Err(CandidateError::DisallowedWildcard) => {
            return deny(identifier, DenyReason::DisallowedWildcard)
        }
        Err(CandidateError::Malformed(detail)) => {
            return deny(identifier, DenyReason::MalformedIdentifier(detail))
        }
    };

    let excluded = engine.excluded().for_kind(identifier.kind);
    if let Some(constraint) = excluded.iter().find(|c| matches(c, &candidate)) {
        return deny(identifier, DenyReason::ExcludedMatch(constraint.to_string()));
    }

    let permitted = engine.permitted().for_kind(identifier.kind);
    if !permitted.is_empty() && !permitted.iter().any(|c| matches(c, &candidate)) {
        return deny(identifier, DenyReason::NoPermittedMatch);
    }

    Verdict::Allow
}

/// `authorize` evaluates every identifier and, when the engine verifies subject common names and
/// a non-empty common name is given, the common name as well. The first denial is returned.
pub fn authorize(
    engine: &NamePolicyEngine,
    identifiers: &[Identifier],
    subject_common_name: Option<&str>,
) -> Verdict {
    for identifier in identifiers {
        let verdict = evaluate_identifier(engine, identifier);
        if !verdict.is_allowed() {
            return verdict;
        }
    }

    if engine.verify_subject_common_name() {
        if let Some(cn) = subject_common_name.filter(|cn| !cn.is_empty()) {
            let identifier = Identifier::from_common_name(cn);
            log_message(
                &PolicyLogLevels::PolicyDebug,
                &format!("Evaluating subject common name as {}", identifier),
            );
            return evaluate_identifier(engine, &identifier);
        }
    }

    Verdict::Allow
}

/// `authorize_x509_names` evaluates the names requested for an X.509 certificate.
pub fn authorize_x509_names<S: AsRef<str>>(
    engine: &NamePolicyEngine,
    dns_names: &[S],
    ip_addresses: &[IpAddr],
    email_addresses: &[S],
    uris: &[S],
    subject_common_name: Option<&str>,
) -> Verdict {
    let mut identifiers = Vec::with_capacity(
        dns_names.len() + ip_addresses.len() + email_addresses.len() + uris.len(),
    );
    identifiers.extend(dns_names.iter().map(|n| Identifier::dns(n.as_ref())));
    identifiers.extend(ip_addresses.iter().map(|ip| Identifier::ip(ip.to_string())));
    identifiers.extend(email_addresses.iter().map(|e| Identifier::email(e.as_ref())));
    identifiers.extend(uris.iter().map(|u| Identifier::uri(u.as_ref())));
    authorize(engine, &identifiers, subject_common_name)
}

/// `SshCertificateType` distinguishes SSH user certificates from SSH host certificates.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SshCertificateType {
    /// Principals are user names or email addresses
    User,
    /// Principals are host names or IP addresses
    Host,
}

/// `ssh_principal_identifier` classifies an SSH principal. Host principals are IP addresses or DNS
/// names. User principals containing `@` are email addresses, all others are plain principals.
pub fn ssh_principal_identifier(cert_type: SshCertificateType, principal: &str) -> Identifier {
    match cert_type {
        SshCertificateType::Host if IpAddr::from_str(principal).is_ok() => {
            Identifier::ip(principal)
        }
        SshCertificateType::Host => Identifier::dns(principal),
        SshCertificateType::User if principal.contains('@') => Identifier::email(principal),
        SshCertificateType::User => Identifier::principal(principal),
    }
}

/// `authorize_ssh_principals` evaluates the principals requested for an SSH certificate.
pub fn authorize_ssh_principals<S: AsRef<str>>(
    engine: &NamePolicyEngine,
    cert_type: SshCertificateType,
    principals: &[S],
) -> Verdict {
    let identifiers: Vec<Identifier> = principals
        .iter()
        .map(|p| ssh_principal_identifier(cert_type, p.as_ref()))
        .collect();
    authorize(engine, &identifiers, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(v: Verdict) -> Option<DenyReasonCode> {
        v.denial().map(|d| d.reason.code())
    }

    #[test]
    fn common_name_inference() {
        assert_eq!(ConstraintKind::Ip, Identifier::from_common_name("10.0.0.1").kind);
        assert_eq!(ConstraintKind::Ip, Identifier::from_common_name("::1").kind);
        assert_eq!(
            ConstraintKind::Email,
            Identifier::from_common_name("alice@example.com").kind
        );
        assert_eq!(
            ConstraintKind::Dns,
            Identifier::from_common_name("www.example.com").kind
        );
    }

    #[test]
    fn common_name_evaluation() {
        let mut b = NamePolicyEngine::builder();
        b.set_permitted_dns_domain("example.com").unwrap();
        let unverified = b.build();
        b.with_subject_common_name_verification();
        let verified = b.build();

        let ids = [Identifier::dns("www.example.com")];
        assert!(authorize(&unverified, &ids, Some("evil.com")).is_allowed());
        assert_eq!(
            Some(DenyReasonCode::NoPermittedMatch),
            code(authorize(&verified, &ids, Some("evil.com")))
        );
        assert!(authorize(&verified, &ids, Some("api.example.com")).is_allowed());
        assert!(authorize(&verified, &ids, Some("")).is_allowed());
        assert!(authorize(&verified, &ids, None).is_allowed());
        assert_eq!(
            Some(DenyReasonCode::MalformedIdentifier),
            code(authorize(&verified, &ids, Some("Not A Host Name")))
        );
    }

    #[test]
    fn first_denial_is_reported() {
        let mut b = NamePolicyEngine::builder();
        b.set_excluded_dns_domain("evil.com").unwrap();
        let engine = b.build();

        let v = authorize(
            &engine,
            &[
                Identifier::dns("ok.example"),
                Identifier::dns("www.evil.com"),
                Identifier::dns("*.example.com"),
            ],
            None,
        );
        let denial = v.denial().unwrap();
        assert_eq!("www.evil.com", denial.identifier);
        assert_eq!(DenyReason::ExcludedMatch("evil.com".to_string()), denial.reason);
        assert_eq!(
            "DENY excluded-match: DNS www.evil.com (matches excluded constraint evil.com)",
            v.to_string()
        );
    }

    #[test]
    fn ssh_principals() {
        let mut b = NamePolicyEngine::builder();
        b.set_permitted_principals(&["ops"]).unwrap();
        b.set_permitted_email_address("@example.com").unwrap();
        b.set_permitted_dns_domain("hosts.example.com").unwrap();
        let engine = b.build();

        assert!(authorize_ssh_principals(
            &engine,
            SshCertificateType::User,
            &["ops", "alice@example.com"]
        )
        .is_allowed());
        assert_eq!(
            Some(DenyReasonCode::NoPermittedMatch),
            code(authorize_ssh_principals(
                &engine,
                SshCertificateType::User,
                &["root"]
            ))
        );
        assert!(authorize_ssh_principals(
            &engine,
            SshCertificateType::Host,
            &["web1.hosts.example.com", "10.0.0.1"]
        )
        .is_allowed());
        assert_eq!(
            ConstraintKind::Ip,
            ssh_principal_identifier(SshCertificateType::Host, "10.0.0.1").kind
        );
    }
}
