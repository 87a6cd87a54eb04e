//! Arguments for the npcheck utility

use clap::Parser;

/// Name Policy Check (npcheck)
#[derive(Parser, Debug, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
pub struct NpcheckArgs {
    /// Full path and filename of JSON file containing name policy settings. When neither this nor
    /// policy_store is given, an empty policy is used.
    #[clap(short, long, help_heading = "POLICY", conflicts_with = "policy_store")]
    pub settings: Option<String>,

    /// Full path and filename of JSON file containing an array of stored policy records. Requires
    /// authority_id and policy_id.
    #[clap(long, help_heading = "POLICY", requires_all = ["authority_id", "policy_id"])]
    pub policy_store: Option<String>,

    /// Identifier of the authority whose policy is read from the policy store
    #[clap(long, help_heading = "POLICY")]
    pub authority_id: Option<String>,

    /// Identifier of the policy record to read from the policy store
    #[clap(long, help_heading = "POLICY")]
    pub policy_id: Option<String>,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,

    /// Print the normalized policy as JSON
    #[clap(long, help_heading = "COMMON OPTIONS")]
    pub list_constraints: bool,

    /// DNS name to evaluate (may be repeated)
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub dns: Vec<String>,

    /// IP address to evaluate (may be repeated)
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub ip: Vec<String>,

    /// Email address to evaluate (may be repeated)
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub email: Vec<String>,

    /// URI to evaluate (may be repeated)
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub uri: Vec<String>,

    /// SSH principal to evaluate (may be repeated)
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub principal: Vec<String>,

    /// Subject common name, evaluated when the policy verifies common names
    #[clap(long, help_heading = "IDENTIFIERS")]
    pub common_name: Option<String>,
}

impl NpcheckArgs {
    /// `has_identifiers` returns true if any identifier or a common name was given.
    pub fn has_identifiers(&self) -> bool {
        !(self.dns.is_empty()
            && self.ip.is_empty()
            && self.email.is_empty()
            && self.uri.is_empty()
            && self.principal.is_empty()
            && self.common_name.is_none())
    }
}
