//! Processing of npcheck options

use log::{debug, error};

use namepolicy::*;

use crate::args::NpcheckArgs;

/// Exit code used when every identifier is allowed
pub const EXIT_ALLOW: i32 = 0;
/// Exit code used when an identifier is denied
pub const EXIT_DENY: i32 = 1;
/// Exit code used when the policy cannot be loaded
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// `load_engine` builds the engine from the settings file or the policy store named in `args`.
fn load_engine(args: &NpcheckArgs) -> Result<NamePolicyEngine> {
    match (&args.policy_store, &args.authority_id, &args.policy_id) {
        (Some(store), Some(authority_id), Some(policy_id)) => {
            debug!("Loading policy {} for {} from {}", policy_id, authority_id, store);
            let db = PolicyDb::new(read_policy_store(store)?, authority_id);
            db.load_engine(policy_id)
        }
        _ => {
            let settings = read_settings(&args.settings)?;
            NamePolicyEngine::from_settings(&settings)
        }
    }
}

fn identifiers(args: &NpcheckArgs) -> Vec<Identifier> {
    let mut ids = vec![];
    ids.extend(args.dns.iter().map(|v| Identifier::dns(v.as_str())));
    ids.extend(args.ip.iter().map(|v| Identifier::ip(v.as_str())));
    ids.extend(args.email.iter().map(|v| Identifier::email(v.as_str())));
    ids.extend(args.uri.iter().map(|v| Identifier::uri(v.as_str())));
    ids.extend(args.principal.iter().map(|v| Identifier::principal(v.as_str())));
    ids
}

/// `options` loads the policy, evaluates the identifiers given on the command line, prints the
/// verdict and returns the exit code.
pub(crate) fn options(args: &NpcheckArgs) -> i32 {
    let engine = match load_engine(args) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to load name policy: {}", e);
            eprintln!("ERROR: {}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    if args.list_constraints {
        match engine.to_settings().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                return EXIT_CONFIG_ERROR;
            }
        }
        if !args.has_identifiers() {
            return EXIT_ALLOW;
        }
    }

    let ids = identifiers(args);
    let verdict = authorize(&engine, &ids, args.common_name.as_deref());
    println!("{}", verdict);
    if verdict.is_allowed() {
        EXIT_ALLOW
    } else {
        EXIT_DENY
    }
}
