//! Layered configuration loading
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML/YAML/JSON file (`config/otp.*` unless a path is given)
//! 3. `OTP_ENGINE__*` environment variables, `__` separating nesting
//!    (`OTP_ENGINE__OTP__CODE_LENGTH=8`, `OTP_ENGINE__PROVIDERS__ORDER=zalo,twilio`)

use config::{Config, Environment, File};
use std::path::Path;
use tracing::info;

use otp_shared::AppConfig;

use crate::InfrastructureError;

/// Default config file, extension resolved by the `config` crate
const DEFAULT_CONFIG_FILE: &str = "config/otp";

const ENV_PREFIX: &str = "OTP_ENGINE";

/// Load and validate the engine configuration
///
/// An explicit `path` must exist; the default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("providers.order")
                .with_list_parse_key("otp.allowed_regions"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()?;

    info!(
        environment = %config.environment,
        store = ?config.otp.store,
        providers = ?config.providers.order,
        "Loaded OTP engine configuration"
    );
    Ok(config)
}
