//! Telegram transport settings.

use config::ConfigError;
use logbook_core::config::ApiSettings;
use serde::Deserialize;
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        logbook_core::config::build_config()?.try_deserialize()
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Backend API settings shared with the engine.
    pub api: Arc<ApiSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(api: ApiSettings, telegram: TelegramSettings) -> Self {
        Self {
            api: Arc::new(api),
            telegram: Arc::new(telegram),
        }
    }
}
