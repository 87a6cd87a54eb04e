//! Serializable name policy settings
//!
//! Settings carry raw, unvalidated constraint values as an administrator would write them. They are
//! turned into a [`NamePolicyEngine`] by [`NamePolicyEngine::from_settings`], which normalizes every
//! value. [`NamePolicyEngine::to_settings`] performs the reverse using canonical forms.
//!
//! ```json
//! {
//!   "permitted": { "dns_domains": ["example.com"], "ip_ranges": ["10.0.0.0/8"] },
//!   "excluded": { "dns_domains": ["*.internal.example.com"] },
//!   "verify_subject_common_name": true
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::policy::constraint::*;
use crate::policy::engine::*;
use crate::util::file_utils::get_file_as_byte_vec;
use crate::util::logging::*;
use crate::{Error, Result};

/// `ConstraintSettings` contains the raw values for either the permitted or the excluded side of a
/// policy. Absent lists leave the corresponding kind unconstrained.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSettings {
    /// DNS domains, optionally prefixed with `*.`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_domains: Option<Vec<String>>,
    /// IP addresses and CIDRs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_ranges: Option<Vec<String>>,
    /// Mailboxes and mail domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_addresses: Option<Vec<String>>,
    /// URI domains, optionally prefixed with `*.`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_domains: Option<Vec<String>>,
    /// SSH principals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principals: Option<Vec<String>>,
}

/// `NamePolicySettings` is the serializable form of a name policy.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamePolicySettings {
    /// Permitted constraints
    pub permitted: ConstraintSettings,
    /// Excluded constraints
    pub excluded: ConstraintSettings,
    /// Evaluate the subject common name as an additional identifier
    pub verify_subject_common_name: bool,
    /// Permit requested DNS names that begin with `*.`
    pub allow_literal_wildcard_names: bool,
}

impl NamePolicySettings {
    /// `from_json` parses settings from a JSON buffer.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        match serde_json::from_slice(json) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                log_message(
                    &PolicyLogLevels::PolicyError,
                    &format!("Failed to parse name policy settings: {}", e),
                );
                Err(Error::from(e))
            }
        }
    }

    /// `to_json` serializes settings as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `read_settings` accepts a string containing the name of a file that contains JSON data that
/// represents NamePolicySettings. When no file name is given, default settings (no constraints) are
/// returned. A file that cannot be read is an error, since treating a missing policy as an empty
/// one would allow everything.
pub fn read_settings(fname: &Option<String>) -> Result<NamePolicySettings> {
    match fname {
        Some(fname) => {
            let json = match get_file_as_byte_vec(Path::new(fname.as_str())) {
                Ok(json) => json,
                Err(e) => {
                    log_message(
                        &PolicyLogLevels::PolicyError,
                        &format!("Failed to read name policy settings from {}: {}", fname, e),
                    );
                    return Err(e);
                }
            };
            NamePolicySettings::from_json(&json)
        }
        None => Ok(NamePolicySettings::default()),
    }
}

fn to_strings(constraints: &[Constraint]) -> Option<Vec<String>> {
    if constraints.is_empty() {
        None
    } else {
        Some(constraints.iter().map(|c| c.to_string()).collect())
    }
}

fn constraint_set_to_settings(set: &ConstraintSet) -> ConstraintSettings {
    ConstraintSettings {
        dns_domains: to_strings(&set.dns_domains),
        ip_ranges: to_strings(&set.ip_ranges),
        email_addresses: to_strings(&set.email_addresses),
        uri_domains: to_strings(&set.uri_domains),
        principals: to_strings(&set.principals),
    }
}

impl NamePolicyEngineBuilder {
    /// `apply_settings` replaces each list named by the settings and sets any flags the settings
    /// enable. Lists that are absent from the settings are left as they are. The builder is only
    /// updated when every value is valid.
    pub fn apply_settings(&mut self, settings: &NamePolicySettings) -> Result<()> {
        let mut next = self.clone();
        next.apply_each_setting(settings)?;
        *self = next;
        Ok(())
    }

    fn apply_each_setting(&mut self, settings: &NamePolicySettings) -> Result<()> {
        let p = &settings.permitted;
        if let Some(v) = &p.dns_domains {
            self.set_permitted_dns_domains(v)?;
        }
        if let Some(v) = &p.ip_ranges {
            self.set_permitted_ip_or_cidrs(v)?;
        }
        if let Some(v) = &p.email_addresses {
            self.set_permitted_email_addresses(v)?;
        }
        if let Some(v) = &p.uri_domains {
            self.set_permitted_uri_domains(v)?;
        }
        if let Some(v) = &p.principals {
            self.set_permitted_principals(v)?;
        }

        let e = &settings.excluded;
        if let Some(v) = &e.dns_domains {
            self.set_excluded_dns_domains(v)?;
        }
        if let Some(v) = &e.ip_ranges {
            self.set_excluded_ip_or_cidrs(v)?;
        }
        if let Some(v) = &e.email_addresses {
            self.set_excluded_email_addresses(v)?;
        }
        if let Some(v) = &e.uri_domains {
            self.set_excluded_uri_domains(v)?;
        }
        if let Some(v) = &e.principals {
            self.set_excluded_principals(v)?;
        }

        if settings.verify_subject_common_name {
            self.with_subject_common_name_verification();
        }
        if settings.allow_literal_wildcard_names {
            self.with_allow_literal_wildcard_names();
        }
        Ok(())
    }
}

impl NamePolicyEngine {
    /// `from_settings` builds an engine from settings, failing on the first invalid value. Settings
    /// without any constraint are accepted with a warning.
    pub fn from_settings(settings: &NamePolicySettings) -> Result<Self> {
        let mut builder = NamePolicyEngineBuilder::default();
        builder.apply_settings(settings)?;
        let engine = builder.build();
        if engine.is_empty() {
            log_message(
                &PolicyLogLevels::PolicyWarn,
                "Name policy settings contain no constraints; every well-formed identifier is allowed",
            );
        }
        Ok(engine)
    }

    /// `to_settings` exports the canonical form of every constraint along with the flags.
    pub fn to_settings(&self) -> NamePolicySettings {
        NamePolicySettings {
            permitted: constraint_set_to_settings(self.permitted()),
            excluded: constraint_set_to_settings(self.excluded()),
            verify_subject_common_name: self.verify_subject_common_name(),
            allow_literal_wildcard_names: self.allow_literal_wildcard_names(),
        }
    }
}

#[test]
fn settings_round_trip_test() {
    let json = r#"{
        "permitted": {
            "dns_domains": ["Example.COM", "*.example.net"],
            "ip_ranges": ["10.1.2.3/8", "192.168.1.1"],
            "email_addresses": ["@example.com", "Alice@bücher.example"],
            "uri_domains": ["*.example.com"],
            "principals": ["root"]
        },
        "excluded": { "dns_domains": ["internal.example.com"] },
        "allow_literal_wildcard_names": true
    }"#;
    let settings = NamePolicySettings::from_json(json.as_bytes()).unwrap();
    let engine = NamePolicyEngine::from_settings(&settings).unwrap();
    assert!(engine.allow_literal_wildcard_names());
    assert!(!engine.verify_subject_common_name());

    let exported = engine.to_settings();
    assert_eq!(
        Some(vec!["example.com".to_string(), "*.example.net".to_string()]),
        exported.permitted.dns_domains
    );
    assert_eq!(
        Some(vec!["10.0.0.0/8".to_string(), "192.168.1.1/32".to_string()]),
        exported.permitted.ip_ranges
    );
    assert_eq!(
        Some(vec![
            "@example.com".to_string(),
            "alice@xn--bcher-kva.example".to_string()
        ]),
        exported.permitted.email_addresses
    );
    assert_eq!(None, exported.excluded.ip_ranges);

    let again = NamePolicyEngine::from_settings(&exported).unwrap();
    assert_eq!(engine, again);
    assert_eq!(exported, again.to_settings());
}

#[test]
fn settings_errors_test() {
    assert!(matches!(
        NamePolicySettings::from_json(b"{ not json"),
        Err(Error::ParseError(_))
    ));
    assert!(matches!(
        NamePolicySettings::from_json(br#"{"permitted": {"dns_domains": "example.com"}}"#),
        Err(Error::ParseError(_))
    ));

    let settings = NamePolicySettings::from_json(
        br#"{"excluded": {"uri_domains": ["example.com:443"]}}"#,
    )
    .unwrap();
    assert!(matches!(
        NamePolicyEngine::from_settings(&settings),
        Err(Error::InvalidConstraint {
            kind: ConstraintKind::Uri,
            ..
        })
    ));

    assert_eq!(
        NamePolicySettings::default(),
        read_settings(&None).unwrap()
    );
    assert!(NamePolicyEngine::from_settings(&NamePolicySettings::default())
        .unwrap()
        .is_empty());
    assert_eq!(
        Err(Error::StdIoError(std::io::ErrorKind::NotFound)),
        read_settings(&Some("/nonexistent/name-policy.json".to_string()))
    );
}

#[test]
fn apply_settings_is_all_or_nothing_test() {
    let mut b = NamePolicyEngine::builder();
    b.set_permitted_dns_domain("keep.example").unwrap();
    b.set_excluded_principals(&["root"]).unwrap();

    // the DNS list is valid but the IP list that follows it is not
    let settings = NamePolicySettings::from_json(
        br#"{
            "permitted": { "dns_domains": ["new.example"], "ip_ranges": ["bogus"] },
            "verify_subject_common_name": true
        }"#,
    )
    .unwrap();
    assert!(matches!(
        b.apply_settings(&settings),
        Err(Error::InvalidConstraint {
            kind: ConstraintKind::Ip,
            ..
        })
    ));

    let engine = b.build();
    assert!(!engine.verify_subject_common_name());
    let unchanged = engine.to_settings();
    assert_eq!(
        Some(vec!["keep.example".to_string()]),
        unchanged.permitted.dns_domains
    );
    assert_eq!(None, unchanged.permitted.ip_ranges);
    assert_eq!(Some(vec!["root".to_string()]), unchanged.excluded.principals);

    let settings =
        NamePolicySettings::from_json(br#"{"permitted": {"dns_domains": ["new.example"]}}"#)
            .unwrap();
    b.apply_settings(&settings).unwrap();
    let applied = b.build().to_settings();
    assert_eq!(
        Some(vec!["new.example".to_string()]),
        applied.permitted.dns_domains
    );
    assert_eq!(Some(vec!["root".to_string()]), applied.excluded.principals);
}
