use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::{Environment, UnknownEnvironment};

/// Directory, relative to the working directory, holding the YAML files.
const CONFIGURATION_DIR: &str = "configuration";

/// File loaded for every environment.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix of environment variable overrides, e.g. `APP_LOGGER__LEVEL=debug`.
const ENV_PREFIX: &str = "APP";

const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys: `APP_LOGGER__NAME` sets `logger.name`.
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[from] std::io::Error),

    #[error(transparent)]
    Environment(#[from] UnknownEnvironment),

    #[error("failed to build configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads `T` from `./configuration` for the environment named by `APP_ENVIRONMENT`.
///
/// Sources are layered in order, later ones winning:
/// 1. `configuration/base.yaml` (required)
/// 2. `configuration/{environment}.yaml` (optional)
/// 3. `APP_`-prefixed environment variables, `__` separating nested keys
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let directory = std::env::current_dir()?.join(CONFIGURATION_DIR);
    let environment = Environment::load()?;

    load_config_from(&directory, environment)
}

/// Same as [`load_config`] with an explicit directory and environment.
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let environment_file: PathBuf = directory.join(format!("{environment}.yaml"));

    let overrides = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(config::File::from(directory.join(BASE_CONFIG_FILE)))
        .add_source(config::File::from(environment_file).required(false))
        .add_source(overrides)
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{GuardConfig, LogLevel, ReporterKind};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "callguard-config-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = scratch_dir("layering");
        std::fs::write(
            dir.join("base.yaml"),
            "logger:\n  name: service\n  level: info\nreporter: http\n",
        )
        .unwrap();
        std::fs::write(dir.join("dev.yaml"), "logger:\n  level: debug\n").unwrap();

        let config: GuardConfig = load_config_from(&dir, Environment::Dev).unwrap();

        assert_eq!(config.logger.name, "service");
        assert_eq!(config.logger.level, LogLevel::Debug);
        assert_eq!(config.reporter, ReporterKind::Http);
        assert!(!config.reclaim_memory);
    }

    #[test]
    fn missing_environment_file_is_allowed() {
        let dir = scratch_dir("optional");
        std::fs::write(dir.join("base.yaml"), "reporter: payload\n").unwrap();

        let config: GuardConfig = load_config_from(&dir, Environment::Staging).unwrap();

        assert_eq!(config.reporter, ReporterKind::Payload);
        assert_eq!(config.logger.level, LogLevel::Info);
    }

    #[test]
    fn missing_base_file_is_an_error() {
        let dir = scratch_dir("missing-base");
        let _ = std::fs::remove_file(dir.join("base.yaml"));

        let result = load_config_from::<GuardConfig>(&dir, Environment::Dev);

        assert!(matches!(result, Err(LoadConfigError::Config(_))));
    }
}
