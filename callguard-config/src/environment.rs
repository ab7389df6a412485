use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Environment variable holding the runtime environment name.
const APP_ENVIRONMENT_ENV_NAME: &str = "APP_ENVIRONMENT";

const PROD_ENV_NAME: &str = "prod";
const STAGING_ENV_NAME: &str = "staging";
const DEV_ENV_NAME: &str = "dev";

/// Returned when `APP_ENVIRONMENT` names an environment we do not know about.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "{0} is not a supported environment, use either `{PROD_ENV_NAME}`, `{STAGING_ENV_NAME}` or `{DEV_ENV_NAME}`"
)]
pub struct UnknownEnvironment(pub String);

/// Runtime environment the process is running in.
///
/// Decides where process-wide logs go (colorized console in development,
/// rotated JSON files otherwise) and which configuration file is layered on
/// top of the base one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Staging,
    Dev,
}

impl Environment {
    /// Reads the environment from `APP_ENVIRONMENT`, falling back to
    /// [`Environment::Prod`] when the variable is unset.
    pub fn load() -> Result<Environment, UnknownEnvironment> {
        match std::env::var(APP_ENVIRONMENT_ENV_NAME) {
            Ok(value) => value.parse(),
            Err(_) => Ok(Environment::Prod),
        }
    }

    /// Exports this environment through `APP_ENVIRONMENT`.
    pub fn set(&self) {
        // Only called during process or test setup, before other threads read the variable.
        unsafe { std::env::set_var(APP_ENVIRONMENT_ENV_NAME, self.as_str()) }
    }

    /// Returns the name used in `APP_ENVIRONMENT` and in configuration file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => PROD_ENV_NAME,
            Environment::Staging => STAGING_ENV_NAME,
            Environment::Dev => DEV_ENV_NAME,
        }
    }

    /// Staging counts as production for logging purposes.
    pub fn is_prod(&self) -> bool {
        matches!(self, Environment::Prod | Environment::Staging)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    /// Parses an environment name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            PROD_ENV_NAME => Ok(Environment::Prod),
            STAGING_ENV_NAME => Ok(Environment::Staging),
            DEV_ENV_NAME => Ok(Environment::Dev),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}
