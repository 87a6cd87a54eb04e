//! Error types

use core::fmt;

use crate::policy::constraint::ConstraintKind;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// `ConstraintViolation` identifies the normalization rule that a raw constraint value failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ConstraintViolation {
    /// Empty occurs when a constraint is empty or consists only of white space.
    Empty,
    /// EmptyLabel occurs when a domain-style constraint contains consecutive periods.
    EmptyLabel,
    /// IllegalWildcard occurs when an asterisk appears anywhere other than a leading `*.` (or at
    /// all, for email constraints).
    IllegalWildcard,
    /// TooManyAtSigns occurs when an email constraint contains more than one `@` character.
    TooManyAtSigns,
    /// LeadingPeriod occurs when an email constraint (after removal of a leading `@`) starts with a
    /// period.
    LeadingPeriod,
    /// UnparseableMailbox occurs when an email constraint with a local part is not an RFC 2821
    /// mailbox.
    UnparseableMailbox,
    /// IdnaConversion occurs when a domain cannot be converted to its ASCII form.
    IdnaConversion,
    /// SquareBrackets occurs when a URI domain constraint contains `[` or `]`.
    SquareBrackets,
    /// PortNotAllowed occurs when a URI domain constraint takes the form host:port.
    PortNotAllowed,
    /// IpLiteral occurs when a URI domain constraint is an IP address.
    IpLiteral,
    /// UnparseableDomain occurs when the ASCII form of a domain cannot be split into labels.
    UnparseableDomain,
    /// InvalidCidr occurs when a value presented as a CIDR cannot be parsed as one.
    InvalidCidr,
    /// InvalidIpOrCidr occurs when a value can be parsed as neither an IP address nor a CIDR.
    InvalidIpOrCidr,
}

/// Error type
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// InvalidConstraint occurs when a raw constraint value fails normalization.
    InvalidConstraint {
        /// Kind of constraint that was being configured
        kind: ConstraintKind,
        /// Raw value as presented by the configurer
        raw: String,
        /// Rule that was violated
        violation: ConstraintViolation,
    },
    /// NotFound occurs when a policy record is not present in a store.
    NotFound(String),
    /// AuthorityMismatch occurs when a policy record belongs to a different authority.
    AuthorityMismatch {
        /// Identifier of the policy record
        id: String,
        /// Identifier of the authority that requested the record
        authority_id: String,
    },
    /// Deleted occurs when a policy record has been marked as deleted.
    Deleted(String),
    /// ParseError occurs when settings or a stored record cannot be serialized or deserialized.
    ParseError(String),
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    StdIoError(std::io::ErrorKind),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::StdIoError(err.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::ParseError(err.to_string())
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::Empty => write!(f, "cannot be empty or white space"),
            ConstraintViolation::EmptyLabel => write!(f, "cannot have empty labels"),
            ConstraintViolation::IllegalWildcard => {
                write!(f, "wildcard is only allowed as a leading *. label")
            }
            ConstraintViolation::TooManyAtSigns => write!(f, "contains too many @ characters"),
            ConstraintViolation::LeadingPeriod => write!(f, "cannot start with a period"),
            ConstraintViolation::UnparseableMailbox => {
                write!(f, "cannot be parsed as an RFC 2821 mailbox")
            }
            ConstraintViolation::IdnaConversion => write!(f, "cannot be converted to ASCII"),
            ConstraintViolation::SquareBrackets => write!(f, "contains square brackets"),
            ConstraintViolation::PortNotAllowed => write!(f, "cannot contain a port"),
            ConstraintViolation::IpLiteral => write!(f, "cannot be an IP address"),
            ConstraintViolation::UnparseableDomain => write!(f, "cannot be parsed as a domain"),
            ConstraintViolation::InvalidCidr => write!(f, "cannot be parsed as a CIDR"),
            ConstraintViolation::InvalidIpOrCidr => {
                write!(f, "cannot be parsed as an IP address nor a CIDR")
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConstraint {
                kind,
                raw,
                violation,
            } => write!(f, "{} constraint {:?} {}", kind, raw, violation),
            Error::NotFound(id) => write!(f, "policy {} not found", id),
            Error::AuthorityMismatch { id, authority_id } => write!(
                f,
                "policy {} is not owned by authority {}",
                id, authority_id
            ),
            Error::Deleted(id) => write!(f, "policy {} is deleted", id),
            Error::ParseError(detail) => write!(f, "ParseError: {}", detail),
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

impl std::error::Error for Error {}

#[test]
fn error_test() {
    let e = Error::InvalidConstraint {
        kind: ConstraintKind::Dns,
        raw: "a..b".to_string(),
        violation: ConstraintViolation::EmptyLabel,
    };
    assert_eq!(
        format!("{}", e),
        "DNS constraint \"a..b\" cannot have empty labels"
    );

    let _s = format!("{}", ConstraintViolation::Empty);
    let _s = format!("{}", ConstraintViolation::IllegalWildcard);
    let _s = format!("{}", ConstraintViolation::TooManyAtSigns);
    let _s = format!("{}", ConstraintViolation::LeadingPeriod);
    let _s = format!("{}", ConstraintViolation::UnparseableMailbox);
    let _s = format!("{}", ConstraintViolation::IdnaConversion);
    let _s = format!("{}", ConstraintViolation::SquareBrackets);
    let _s = format!("{}", ConstraintViolation::PortNotAllowed);
    let _s = format!("{}", ConstraintViolation::IpLiteral);
    let _s = format!("{}", ConstraintViolation::UnparseableDomain);
    let _s = format!("{}", ConstraintViolation::InvalidCidr);
    let _s = format!("{}", ConstraintViolation::InvalidIpOrCidr);

    let _s = format!("{}", Error::NotFound("p1".to_string()));
    let _s = format!(
        "{}",
        Error::AuthorityMismatch {
            id: "p1".to_string(),
            authority_id: "a1".to_string()
        }
    );
    let _s = format!("{}", Error::Deleted("p1".to_string()));
    let _s = format!("{}", Error::ParseError("eof".to_string()));
    let _s = format!("{}", Error::StdIoError(std::io::ErrorKind::NotFound));
}
