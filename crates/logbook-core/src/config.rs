//! Backend API settings.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings for the remote logbook API and user registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the backend, e.g. `https://logbook.example.org/api`.
    pub api_host: String,
    /// Bearer token sent with every backend request.
    pub api_token: String,
    /// Code a new user must type before the bot talks to them.
    pub registration_code: String,
    /// HTTP timeout for backend calls, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl ApiSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading or deserialization fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }
}

/// Layered configuration shared by every settings struct: an optional
/// `config/default` file, overridden by environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a source fails to load.
pub fn build_config() -> Result<Config, ConfigError> {
    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        // Environment::default() auto-converts UPPER_SNAKE_CASE to
        // snake_case; ignore_empty treats empty env vars as unset.
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

#[cfg(test)]
mod tests {
    use super::ApiSettings;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_settings_deserialize_with_default_timeout() {
        let raw = r#"
            api_host = "http://localhost:8000/api"
            api_token = "secret"
            registration_code = "1234"
        "#;
        let settings: ApiSettings = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .expect("config should build")
            .try_deserialize()
            .expect("settings should deserialize");

        assert_eq!(settings.api_host, "http://localhost:8000/api");
        assert_eq!(settings.registration_code, "1234");
        assert_eq!(settings.http_timeout_secs, 30);
    }

    #[test]
    fn test_settings_timeout_override() {
        let raw = r#"
            api_host = "http://localhost:8000/api"
            api_token = "secret"
            registration_code = "1234"
            http_timeout_secs = 5
        "#;
        let settings: ApiSettings = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .expect("config should build")
            .try_deserialize()
            .expect("settings should deserialize");

        assert_eq!(settings.http_timeout_secs, 5);
    }
}
