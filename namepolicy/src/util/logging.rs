//! Logging support

use log::{log, Level};

/// Enum that describes level associated with a log message
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PolicyLogLevels {
    /// Configuration or store failures
    PolicyError,
    /// Denials
    PolicyInfo,
    /// Policies that are valid but likely not what was intended
    PolicyWarn,
    /// Engine construction and common name inference
    PolicyDebug,
}

impl From<PolicyLogLevels> for Level {
    fn from(level: PolicyLogLevels) -> Self {
        match level {
            PolicyLogLevels::PolicyError => Level::Error,
            PolicyLogLevels::PolicyWarn => Level::Warn,
            PolicyLogLevels::PolicyInfo => Level::Info,
            PolicyLogLevels::PolicyDebug => Level::Debug,
        }
    }
}

/// `log_message` routes a message through the `log` facade at the corresponding level. The npcheck
/// utility backs the facade with log4rs.
pub fn log_message(level: &PolicyLogLevels, message: &str) {
    log!(Level::from(*level), "{}", message);
}

#[test]
fn log_levels_test() {
    assert_eq!(Level::Error, Level::from(PolicyLogLevels::PolicyError));
    assert_eq!(Level::Warn, Level::from(PolicyLogLevels::PolicyWarn));
    assert_eq!(Level::Info, Level::from(PolicyLogLevels::PolicyInfo));
    assert_eq!(Level::Debug, Level::from(PolicyLogLevels::PolicyDebug));
}
